//! List manipulation helpers.
//!
//! Every helper accepts a missing or non-list argument and treats it as an
//! empty list. Key arguments are dotted paths into each item.

use serde_json::{json, Value};

use super::{block, inline};
use crate::error::HelperError;
use crate::evaluator::{compare, contains, equal, is_truthy, lookup_path, to_display_string};
use crate::sandbox::{item_locals, HelperCall, HelperEntry, HelperOutput, HelperResult};

pub fn entries() -> Vec<HelperEntry> {
    vec![
        inline("join", join),
        inline("count", |call: &mut HelperCall<'_>| {
            let count = match call.arg(0) {
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                Value::String(s) => s.chars().count(),
                Value::Null => 0,
                _ => 1,
            };
            Ok(HelperOutput::from(Value::from(count)))
        }),
        inline("first", |call: &mut HelperCall<'_>| {
            let items = list(call.arg(0));
            Ok(match count_arg(call) {
                Some(n) => Value::Array(items.iter().take(n).cloned().collect()),
                None => items.first().cloned().unwrap_or(Value::Null),
            }
            .into())
        }),
        inline("last", |call: &mut HelperCall<'_>| {
            let items = list(call.arg(0));
            Ok(match count_arg(call) {
                Some(n) => {
                    Value::Array(items[items.len().saturating_sub(n)..].to_vec())
                }
                None => items.last().cloned().unwrap_or(Value::Null),
            }
            .into())
        }),
        inline("at", |call: &mut HelperCall<'_>| {
            let items = list(call.arg(0));
            let index = call.arg_f64(1).unwrap_or(0.0) as i64;
            let resolved = resolve_index(index, items.len()).filter(|i| *i < items.len());
            Ok(resolved
                .map(|i| items[i].clone())
                .unwrap_or(Value::Null)
                .into())
        }),
        inline("slice", slice),
        inline("reverse", |call: &mut HelperCall<'_>| {
            Ok(match call.arg(0) {
                Value::String(s) => Value::String(s.chars().rev().collect()),
                other => Value::Array(list(other).iter().rev().cloned().collect()),
            }
            .into())
        }),
        inline("sort", sort),
        inline("filter", |call: &mut HelperCall<'_>| {
            let (key, expected) = (key_arg(call, 1), call.args().get(2));
            let filtered = list(call.arg(0))
                .iter()
                .filter(|item| matches(item, key.as_deref(), expected))
                .cloned()
                .collect();
            Ok(HelperOutput::Value(Value::Array(filtered)))
        }),
        inline("map", |call: &mut HelperCall<'_>| {
            let key = key_arg(call, 1).unwrap_or_default();
            let mapped = list(call.arg(0))
                .iter()
                .map(|item| lookup_path(item, &key).cloned().unwrap_or(Value::Null))
                .collect();
            Ok(HelperOutput::Value(Value::Array(mapped)))
        }),
        inline("find", |call: &mut HelperCall<'_>| {
            let (key, expected) = (key_arg(call, 1), call.args().get(2));
            let found = list(call.arg(0))
                .iter()
                .find(|item| matches(item, key.as_deref(), expected))
                .cloned();
            Ok(found.unwrap_or(Value::Null).into())
        }),
        inline("includes", |call: &mut HelperCall<'_>| {
            Ok(contains(call.arg(0), call.arg(1)).into())
        }),
        inline("unique", unique),
        block("groupBy", |call: &mut HelperCall<'_>| {
            let key = key_arg(call, 1).unwrap_or_default();
            let buckets = group_by(list(call.arg(0)), &key);
            if !call.is_block() {
                return Ok(HelperOutput::Value(Value::Array(buckets)));
            }
            if buckets.is_empty() {
                return Ok(HelperOutput::safe(call.inverse()?));
            }
            // `{{count}}` would resolve to the helper, so the size is also `@count`
            let mut rendered = String::new();
            for (index, bucket) in buckets.iter().enumerate() {
                let mut locals = item_locals(index, buckets.len());
                locals.push(("count", bucket["count"].clone()));
                rendered.push_str(&call.render_with(bucket, &locals)?);
            }
            Ok(HelperOutput::safe(rendered))
        }),
        block("chunk", |call: &mut HelperCall<'_>| {
            let size = call.arg_f64(1).or_else(|| call.hash_f64("size")).unwrap_or(0.0);
            if size < 1.0 {
                return Err(HelperError::invalid("chunk size must be at least 1"));
            }
            let chunks: Vec<Value> = list(call.arg(0))
                .chunks(size as usize)
                .map(|chunk| Value::Array(chunk.to_vec()))
                .collect();
            if call.is_block() {
                return call.iterate(&chunks);
            }
            Ok(HelperOutput::Value(Value::Array(chunks)))
        }),
        inline("pluck", |call: &mut HelperCall<'_>| {
            let key = key_arg(call, 1).unwrap_or_default();
            let plucked = list(call.arg(0))
                .iter()
                .filter_map(|item| lookup_path(item, &key))
                .filter(|v| !v.is_null())
                .cloned()
                .collect();
            Ok(HelperOutput::Value(Value::Array(plucked)))
        }),
        block("eachWithIndex", |call: &mut HelperCall<'_>| {
            let items = list(call.arg(0)).to_vec();
            if call.is_block() {
                return call.iterate(&items);
            }
            let indexed = items
                .into_iter()
                .enumerate()
                .map(|(index, item)| json!({ "item": item, "index": index }))
                .collect();
            Ok(HelperOutput::Value(Value::Array(indexed)))
        }),
        inline("takeWhile", |call: &mut HelperCall<'_>| {
            let (key, expected) = (key_arg(call, 1), call.args().get(2));
            let taken = list(call.arg(0))
                .iter()
                .take_while(|item| matches(item, key.as_deref(), expected))
                .cloned()
                .collect();
            Ok(HelperOutput::Value(Value::Array(taken)))
        }),
        inline("skipWhile", |call: &mut HelperCall<'_>| {
            let (key, expected) = (key_arg(call, 1), call.args().get(2));
            let rest = list(call.arg(0))
                .iter()
                .skip_while(|item| matches(item, key.as_deref(), expected))
                .cloned()
                .collect();
            Ok(HelperOutput::Value(Value::Array(rest)))
        }),
    ]
}

fn list(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        _ => &[],
    }
}

fn key_arg(call: &HelperCall<'_>, index: usize) -> Option<String> {
    match call.arg(index) {
        Value::Null => call.hash_str("key"),
        other => Some(to_display_string(other)),
    }
}

fn count_arg(call: &HelperCall<'_>) -> Option<usize> {
    call.arg_f64(1)
        .filter(|n| *n >= 0.0)
        .map(|n| n as usize)
}

/// Negative indices count from the end.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        Some(index as usize)
    } else {
        len.checked_sub(index.unsigned_abs() as usize)
    }
}

fn clamp_index(index: i64, len: usize) -> usize {
    resolve_index(index, len).unwrap_or(0).min(len)
}

/// Predicate shared by `filter`, `find`, `takeWhile` and `skipWhile`: with an
/// expected value the keyed field must equal it, otherwise it must be truthy.
fn matches(item: &Value, key: Option<&str>, expected: Option<&Value>) -> bool {
    let actual = match key {
        Some(path) => lookup_path(item, path).unwrap_or(&Value::Null),
        None => item,
    };
    match expected {
        Some(expected) => equal(actual, expected),
        None => is_truthy(actual),
    }
}

fn join(call: &mut HelperCall<'_>) -> HelperResult {
    let separator = call
        .arg_str(1)
        .map(str::to_string)
        .or_else(|| call.hash_str("separator"))
        .or_else(|| call.hash_str("sep"))
        .unwrap_or_else(|| ", ".to_string());
    let field = call.hash_str("field");
    let parts: Vec<String> = list(call.arg(0))
        .iter()
        .map(|item| match field.as_deref() {
            Some(path) => lookup_path(item, path)
                .map(to_display_string)
                .unwrap_or_default(),
            None => to_display_string(item),
        })
        .collect();
    Ok(HelperOutput::from(parts.join(&separator)))
}

fn slice(call: &mut HelperCall<'_>) -> HelperResult {
    let start = call.arg_f64(1).unwrap_or(0.0) as i64;
    let end = call.arg_f64(2).map(|n| n as i64);
    Ok(match call.arg(0) {
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let from = clamp_index(start, chars.len());
            let to = end.map_or(chars.len(), |e| clamp_index(e, chars.len()));
            Value::String(chars[from..to.max(from)].iter().collect())
        }
        other => {
            let items = list(other);
            let from = clamp_index(start, items.len());
            let to = end.map_or(items.len(), |e| clamp_index(e, items.len()));
            Value::Array(items[from..to.max(from)].to_vec())
        }
    }
    .into())
}

fn sort(call: &mut HelperCall<'_>) -> HelperResult {
    let key = match call.arg(1) {
        Value::String(s) => Some(s.clone()),
        _ => call.hash_str("key"),
    };
    let descending = call
        .arg_str(2)
        .map(str::to_string)
        .or_else(|| call.hash_str("order"))
        .is_some_and(|order| order.eq_ignore_ascii_case("desc"));

    let mut items = list(call.arg(0)).to_vec();
    items.sort_by(|a, b| {
        let ordering = match key.as_deref() {
            Some(path) => compare(
                lookup_path(a, path).unwrap_or(&Value::Null),
                lookup_path(b, path).unwrap_or(&Value::Null),
            ),
            None => compare(a, b),
        };
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
    Ok(HelperOutput::Value(Value::Array(items)))
}

fn unique(call: &mut HelperCall<'_>) -> HelperResult {
    let key = key_arg(call, 1);
    let mut seen: Vec<Value> = Vec::new();
    let mut kept = Vec::new();
    for item in list(call.arg(0)) {
        let identity = match key.as_deref() {
            Some(path) => lookup_path(item, path).cloned().unwrap_or(Value::Null),
            None => item.clone(),
        };
        if !seen.iter().any(|s| equal(s, &identity)) {
            seen.push(identity);
            kept.push(item.clone());
        }
    }
    Ok(HelperOutput::Value(Value::Array(kept)))
}

/// Buckets in first-seen order: `{key, items, count}`.
pub fn group_by(items: &[Value], key: &str) -> Vec<Value> {
    let mut buckets: Vec<(Value, Vec<Value>)> = Vec::new();
    for item in items {
        let group = lookup_path(item, key).cloned().unwrap_or(Value::Null);
        match buckets.iter_mut().find(|(k, _)| equal(k, &group)) {
            Some((_, members)) => members.push(item.clone()),
            None => buckets.push((group, vec![item.clone()])),
        }
    }
    buckets
        .into_iter()
        .map(|(key, members)| {
            let count = members.len();
            json!({ "key": key, "items": members, "count": count })
        })
        .collect()
}
