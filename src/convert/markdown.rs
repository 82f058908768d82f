//! Notion blocks → Markdown accepted by `createDocWithMd`.

use crate::notion::{plain_text, Block, RichText};

const DEFAULT_CALLOUT_ICON: &str = "💡";
const MAX_SEGMENT_LEN: usize = 100;
const FORBIDDEN_PATH_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Rich text with inline annotations and links applied.
pub fn rich_text_to_markdown(rich_text: &[RichText]) -> String {
    let mut out = String::new();
    for text in rich_text {
        let mut content = text.plain_text.clone();
        if content.is_empty() {
            continue;
        }
        let a = &text.annotations;
        if a.bold {
            content = format!("**{}**", content);
        }
        if a.italic {
            content = format!("*{}*", content);
        }
        if a.strikethrough {
            content = format!("~~{}~~", content);
        }
        if a.code {
            content = format!("`{}`", content);
        }
        if let Some(href) = text.href.as_deref().filter(|h| !h.is_empty()) {
            content = format!("[{}]({})", content, href);
        }
        out.push_str(&content);
    }
    out
}

/// Convert a block list to Markdown. Consecutive list items stay on adjacent
/// lines; every other block is separated by a blank line.
pub fn blocks_to_markdown(blocks: &[Block]) -> String {
    render_blocks(blocks, 0)
}

fn render_blocks(blocks: &[Block], depth: usize) -> String {
    let mut out = String::new();
    let mut prev_was_list = false;

    for block in blocks {
        let Some(rendered) = render_block(block, depth) else {
            continue;
        };
        let is_list = is_list_item(&block.kind);
        if !out.is_empty() {
            out.push_str(if is_list && prev_was_list { "\n" } else { "\n\n" });
        }
        out.push_str(&rendered);
        prev_was_list = is_list;
    }

    out
}

fn is_list_item(kind: &str) -> bool {
    matches!(
        kind,
        "bulleted_list_item" | "numbered_list_item" | "to_do" | "toggle"
    )
}

fn render_block(block: &Block, depth: usize) -> Option<String> {
    let indent = "    ".repeat(depth);
    let text = || rich_text_to_markdown(&block.text().rich_text);
    let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };

    let line = match block.kind.as_str() {
        "paragraph" => non_empty(text())?,
        "heading_1" => format!("# {}", non_empty(text())?),
        "heading_2" => format!("## {}", non_empty(text())?),
        "heading_3" => format!("### {}", non_empty(text())?),
        "bulleted_list_item" | "toggle" => format!("- {}", non_empty(text())?),
        "numbered_list_item" => format!("1. {}", non_empty(text())?),
        "to_do" => {
            let checked = block.text().checked.unwrap_or(false);
            format!("- [{}] {}", if checked { "x" } else { " " }, non_empty(text())?)
        }
        "code" => {
            let payload = block.text();
            // Code keeps its raw text; annotations are meaningless inside a fence.
            format!(
                "```{}\n{}\n```",
                payload.language.unwrap_or_default(),
                plain_text(&payload.rich_text)
            )
        }
        "quote" => format!("> {}", non_empty(text())?),
        "divider" => "---".to_string(),
        "callout" => {
            let payload = block.text();
            let body = non_empty(rich_text_to_markdown(&payload.rich_text))?;
            let icon = payload
                .icon
                .and_then(|i| i.emoji)
                .unwrap_or_else(|| DEFAULT_CALLOUT_ICON.to_string());
            format!("> {} **Callout:** {}", icon, body)
        }
        "image" => {
            let link = block.link();
            let url = link_url(&link)?;
            format!("![{}]({})", plain_text(&link.caption), url)
        }
        "bookmark" | "embed" | "link_preview" | "video" | "pdf" | "file" => {
            let link = block.link();
            let url = link_url(&link)?;
            let caption = plain_text(&link.caption);
            let label = if caption.is_empty() { url.clone() } else { caption };
            format!("[{}]({})", label, url)
        }
        "child_page" | "child_database" => format!("**{}**", non_empty(block.child_title())?),
        other => format!("<!-- Notion block type '{}' not converted -->", other),
    };

    let mut rendered = format!("{}{}", indent, line.replace('\n', &format!("\n{}", indent)));
    if !block.children.is_empty() {
        let child_depth = if is_list_item(&block.kind) { depth + 1 } else { depth };
        let children = render_blocks(&block.children, child_depth);
        if !children.is_empty() {
            rendered.push_str(if is_list_item(&block.kind) { "\n" } else { "\n\n" });
            rendered.push_str(&children);
        }
    }
    Some(rendered)
}

fn link_url(link: &crate::notion::LinkBlock) -> Option<String> {
    link.url
        .clone()
        .or_else(|| link.file.as_ref().and_then(|f| f.url.clone()))
        .or_else(|| link.external.as_ref().and_then(|f| f.url.clone()))
        .filter(|u| !u.is_empty())
}

/// Full document Markdown: a title heading followed by the content, if any.
pub fn document_markdown(title: &str, content: &str) -> String {
    if content.is_empty() {
        format!("# {}", title)
    } else {
        format!("# {}\n\n{}", title, content)
    }
}

/// Make a title safe to use as one segment of a SiYuan document path.
pub fn sanitize_segment(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| if FORBIDDEN_PATH_CHARS.contains(&c) { '-' } else { c })
        .take(MAX_SEGMENT_LEN)
        .collect();
    if cleaned.is_empty() {
        crate::notion::UNTITLED.to_string()
    } else {
        cleaned
    }
}

/// Build a `/seg/seg` document path from raw titles.
pub fn document_path(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| format!("/{}", sanitize_segment(s)))
        .collect()
}
