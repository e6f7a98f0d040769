use std::cmp::Ordering;

use serde_json::Value;

use super::type_coercion::{to_display_string, to_f64};

/// Substring, array membership or object key.
pub fn contains(value: &Value, target: &Value) -> bool {
    match (value, target) {
        (Value::String(s), Value::String(t)) => s.contains(t.as_str()),
        (Value::Array(arr), target) => arr.iter().any(|item| equal(item, target)),
        (Value::String(s), Value::Number(n)) => s.contains(&n.to_string()),
        (Value::Object(map), Value::String(key)) => map.contains_key(key),
        _ => false,
    }
}

/// Loose equality: numbers and booleans match their string spellings.
pub fn equal(value: &Value, target: &Value) -> bool {
    if value == target {
        return true;
    }

    match (value, target) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
            match s.trim().parse::<f64>() {
                Ok(parsed) => Some(parsed) == n.as_f64(),
                Err(_) => false,
            }
        }
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            match s.to_lowercase().as_str() {
                "true" => *b,
                "false" => !*b,
                _ => false,
            }
        }
        _ => false,
    }
}

/// Total ordering used by `sort`. Values are ranked by class first:
/// `null`, booleans, numbers (including numeric strings), other strings,
/// then arrays and objects by their display text. Numbers compare with
/// `f64::total_cmp`, so NaN has a fixed place.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (sort_class(a), sort_class(b)) {
        (SortClass::Number(x), SortClass::Number(y)) => x.total_cmp(&y),
        (SortClass::Bool(x), SortClass::Bool(y)) => x.cmp(&y),
        (SortClass::Text(x), SortClass::Text(y)) => x.cmp(y),
        (SortClass::Other, SortClass::Other) => to_display_string(a).cmp(&to_display_string(b)),
        (x, y) => x.rank().cmp(&y.rank()),
    }
}

enum SortClass<'a> {
    Null,
    Bool(bool),
    Number(f64),
    Text(&'a str),
    Other,
}

impl SortClass<'_> {
    fn rank(&self) -> u8 {
        match self {
            SortClass::Null => 0,
            SortClass::Bool(_) => 1,
            SortClass::Number(_) => 2,
            SortClass::Text(_) => 3,
            SortClass::Other => 4,
        }
    }
}

fn sort_class(value: &Value) -> SortClass<'_> {
    match value {
        Value::Null => SortClass::Null,
        Value::Bool(b) => SortClass::Bool(*b),
        Value::Number(_) => to_f64(value).map_or(SortClass::Other, SortClass::Number),
        Value::String(s) => match to_f64(value) {
            Some(n) => SortClass::Number(n),
            None => SortClass::Text(s),
        },
        Value::Array(_) | Value::Object(_) => SortClass::Other,
    }
}
