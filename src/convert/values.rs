//! Notion property values → SiYuan block attribute strings.

use crate::notion::{plain_text, Page, PropertyValue};
use crate::siyuan::BlockAttrs;

pub const NOTION_ID_ATTR: &str = "custom-notion-id";
pub const NOTION_DB_ATTR: &str = "custom-notion-db";

/// Render a property value as an attribute string.
///
/// Rollups and formulas are never converted; they are rebuilt by hand in
/// SiYuan. Empty renderings count as absent.
pub fn convert_value(value: &PropertyValue) -> Option<String> {
    let rendered = match value {
        PropertyValue::Title { title } => plain_text(title),
        PropertyValue::RichText { rich_text } => plain_text(rich_text),
        PropertyValue::Number { number } => number.as_ref()?.to_string(),
        PropertyValue::Select { select } | PropertyValue::Status { status: select } => {
            select.as_ref()?.name.clone()
        }
        PropertyValue::MultiSelect { multi_select } => multi_select
            .iter()
            .map(|o| o.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        PropertyValue::Date { date } => {
            let date = date.as_ref()?;
            let start = date.start.clone().unwrap_or_default();
            match date.end.as_deref() {
                Some(end) if !end.is_empty() => format!("{} → {}", start, end),
                _ => start,
            }
        }
        PropertyValue::Checkbox { checkbox } => checkbox.to_string(),
        PropertyValue::Url { url: s }
        | PropertyValue::Email { email: s }
        | PropertyValue::PhoneNumber { phone_number: s }
        | PropertyValue::CreatedTime { created_time: s }
        | PropertyValue::LastEditedTime { last_edited_time: s } => s.clone()?,
        PropertyValue::Relation { relation } => relation
            .iter()
            .map(|r| r.id.as_str())
            .collect::<Vec<_>>()
            .join(","),
        PropertyValue::Files { files } => files
            .iter()
            .filter_map(|f| f.url())
            .collect::<Vec<_>>()
            .join(", "),
        PropertyValue::People { people } => people
            .iter()
            .filter_map(|p| p.name.as_deref())
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        PropertyValue::CreatedBy { created_by: user }
        | PropertyValue::LastEditedBy {
            last_edited_by: user,
        } => user.as_ref()?.name.clone()?,
        PropertyValue::Rollup | PropertyValue::Formula | PropertyValue::Other => return None,
    };

    if rendered.is_empty() {
        None
    } else {
        Some(rendered)
    }
}

/// `custom-` attribute name for a Notion property.
///
/// Lowercased, whitespace becomes `-`, and anything SiYuan would reject in an
/// attribute name is dropped.
pub fn attr_name(property: &str) -> String {
    let mut name = String::from("custom-");
    for c in property.trim().to_lowercase().chars() {
        if c.is_whitespace() {
            name.push('-');
        } else if c.is_alphanumeric() || c == '-' || c == '_' {
            name.push(c);
        }
    }
    name
}

/// Counts of computed properties left out of an entry's attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkippedProperties {
    pub rollups: Vec<String>,
    pub formulas: Vec<String>,
}

/// Convert every property of a page into attributes.
pub fn page_attrs(page: &Page) -> (BlockAttrs, SkippedProperties) {
    let mut attrs = BlockAttrs::new();
    let mut skipped = SkippedProperties::default();

    for (name, value) in page.property_values() {
        match value {
            PropertyValue::Rollup => skipped.rollups.push(name.clone()),
            PropertyValue::Formula => skipped.formulas.push(name.clone()),
            _ => {}
        }
        if let Some(converted) = convert_value(&value) {
            attrs.insert(attr_name(&name), converted);
        }
    }

    (attrs, skipped)
}

/// Attributes for a database entry, tagged with its Notion origin.
pub fn entry_attrs(page: &Page, database_title: &str) -> (BlockAttrs, SkippedProperties) {
    let (mut attrs, skipped) = page_attrs(page);
    attrs.insert(NOTION_ID_ATTR.to_string(), page.id.clone());
    attrs.insert(NOTION_DB_ATTR.to_string(), database_title.to_string());
    (attrs, skipped)
}

/// Distinct multi-select option names of a page, in first-seen order.
pub fn page_tags(page: &Page) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for (_, value) in page.property_values() {
        if let PropertyValue::MultiSelect { multi_select } = value {
            for option in multi_select {
                if !option.name.is_empty() && !tags.contains(&option.name) {
                    tags.push(option.name);
                }
            }
        }
    }
    tags
}
