//! Related-record helpers.
//!
//! Each helper finds its relation on the current scope (or on a record
//! passed as the first argument) by trying a fixed list of key aliases.

use serde_json::Value;

use super::block;
use crate::evaluator::{is_blank, lookup_path, to_display_string};
use crate::sandbox::{HelperCall, HelperEntry, HelperOutput, HelperResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Single,
    List,
}

/// Relation name, key aliases in lookup order, kind.
pub const RELATIONS: &[(&str, &[&str], RelationKind)] = &[
    (
        "parent",
        &["parent", "parentPost", "parent_post", "_parent"],
        RelationKind::Single,
    ),
    (
        "author",
        &["author", "postAuthor", "post_author", "createdBy", "created_by"],
        RelationKind::Single,
    ),
    (
        "category",
        &["category", "primaryCategory", "primary_category", "categories"],
        RelationKind::Single,
    ),
    (
        "children",
        &["children", "childPosts", "child_posts", "_children"],
        RelationKind::List,
    ),
    ("tags", &["tags", "postTags", "post_tags"], RelationKind::List),
    (
        "related",
        &["related", "relatedPosts", "related_posts"],
        RelationKind::List,
    ),
    (
        "comments",
        &["comments", "postComments", "post_comments"],
        RelationKind::List,
    ),
    (
        "reviews",
        &["reviews", "productReviews", "product_reviews"],
        RelationKind::List,
    ),
    (
        "attachments",
        &["attachments", "files", "mediaAttachments", "media_attachments"],
        RelationKind::List,
    ),
];

const LABEL_KEYS: [&str; 4] = ["name", "title", "label", "display_name"];

pub fn entries() -> Vec<HelperEntry> {
    RELATIONS
        .iter()
        .map(|&(name, keys, kind)| {
            block(name, move |call: &mut HelperCall<'_>| match kind {
                RelationKind::Single => single(call, keys),
                RelationKind::List => list(call, keys),
            })
        })
        .collect()
}

/// First non-blank value under any of the aliases.
pub fn find_relation<'v>(record: &'v Value, keys: &[&str]) -> Option<&'v Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !is_blank(value))
}

/// Display label of a related record.
pub fn label(value: &Value) -> String {
    match value {
        Value::Object(map) => LABEL_KEYS
            .iter()
            .find_map(|key| map.get(*key).filter(|v| !is_blank(v)))
            .map(to_display_string)
            .unwrap_or_default(),
        other => to_display_string(other),
    }
}

/// The source record and the positional index where projection arguments
/// start.
fn source<'c>(call: &'c HelperCall<'_>) -> (&'c Value, usize) {
    match call.arg(0) {
        record @ Value::Object(_) => (record, 1),
        _ => (call.this(), 0),
    }
}

fn projection(call: &HelperCall<'_>, index: usize) -> Option<String> {
    call.arg_str(index)
        .map(str::to_string)
        .or_else(|| call.hash_str("field"))
}

fn project(value: &Value, field: Option<&str>) -> Value {
    match field {
        Some(path) => lookup_path(value, path).cloned().unwrap_or(Value::Null),
        None => Value::String(label(value)),
    }
}

fn single(call: &mut HelperCall<'_>, keys: &[&str]) -> HelperResult {
    let (record, index) = source(call);
    let related = find_relation(record, keys)
        .map(|value| match value {
            Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
            other => other.clone(),
        })
        .filter(|value| !is_blank(value));
    let field = projection(call, index);

    if call.is_block() {
        return call.scope_or_inverse(related.as_ref());
    }
    Ok(HelperOutput::Value(match related {
        Some(value) => project(&value, field.as_deref()),
        None => Value::String(String::new()),
    }))
}

fn list(call: &mut HelperCall<'_>, keys: &[&str]) -> HelperResult {
    let (record, index) = source(call);
    let mut items = match find_relation(record, keys) {
        Some(Value::Array(items)) => items.clone(),
        Some(single) => vec![single.clone()],
        None => Vec::new(),
    };
    if let Some(limit) = call.hash_f64("limit").filter(|n| *n >= 0.0) {
        items.truncate(limit as usize);
    }
    let field = projection(call, index);

    if call.hash_bool("count") {
        return Ok(HelperOutput::number(items.len() as f64));
    }
    if call.is_block() {
        return call.iterate(&items);
    }
    let separator = call
        .hash_str("separator")
        .unwrap_or_else(|| ", ".to_string());
    let labels: Vec<String> = items
        .iter()
        .map(|item| to_display_string(&project(item, field.as_deref())))
        .filter(|text| !text.is_empty())
        .collect();
    Ok(HelperOutput::Value(Value::String(labels.join(&separator))))
}
