//! Notion → SiYuan migration toolkit.
//!
//! The pipeline runs in stages, each writing JSON artifacts the next one
//! reads: `analyze` plans the databases, `views` tries to create Attribute
//! Views, `import` copies database entries, `pages` copies standalone pages
//! and `post-process` rewrites the links left pointing at Notion.

pub mod config;
pub mod convert;
pub mod diagnose;
pub mod http;
pub mod migrate;
pub mod models;
pub mod notion;
pub mod postprocess;
pub mod siyuan;
