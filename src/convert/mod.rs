//! Notion → SiYuan conversions: column types, attribute values and Markdown.

pub mod markdown;
pub mod types;
pub mod values;

pub use markdown::{blocks_to_markdown, document_markdown, document_path, sanitize_segment};
pub use types::{detect_column, map_notion_type, ColumnType, DetectedColumn, RollupSpec};
pub use values::{attr_name, convert_value, entry_attrs, page_attrs, page_tags, SkippedProperties};
