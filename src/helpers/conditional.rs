//! Comparison and predicate helpers.
//!
//! All of them follow the dual convention: inline they produce a boolean,
//! in block form they render the body or the else-branch.

use std::cmp::Ordering;

use serde_json::Value;

use super::block;
use crate::evaluator::{equal, is_blank, is_truthy, to_f64, type_name};
use crate::sandbox::{HelperCall, HelperEntry, HelperOutput, HelperResult};

pub fn entries() -> Vec<HelperEntry> {
    vec![
        predicate("eq", |call| equal(call.arg(0), call.arg(1))),
        predicate("ne", |call| !equal(call.arg(0), call.arg(1))),
        predicate("gt", |call| ordered(call) == Some(Ordering::Greater)),
        predicate("gte", |call| {
            matches!(ordered(call), Some(Ordering::Greater | Ordering::Equal))
        }),
        predicate("lt", |call| ordered(call) == Some(Ordering::Less)),
        predicate("lte", |call| {
            matches!(ordered(call), Some(Ordering::Less | Ordering::Equal))
        }),
        predicate("in", one_of),
        predicate("notIn", |call| !one_of(call)),
        predicate("and", |call| {
            !call.args().is_empty() && call.args().iter().all(is_truthy)
        }),
        predicate("or", |call| call.args().iter().any(is_truthy)),
        predicate("not", |call| !is_truthy(call.arg(0))),
        predicate("isEmpty", |call| is_blank(call.arg(0))),
        predicate("isNotEmpty", |call| !is_blank(call.arg(0))),
        predicate("isDefined", |call| !call.arg(0).is_null()),
        predicate("isUndefined", |call| call.arg(0).is_null()),
        predicate("isNull", |call| call.arg(0).is_null()),
        predicate("isTruthy", |call| is_truthy(call.arg(0))),
        predicate("isFalsy", |call| !is_truthy(call.arg(0))),
        predicate("even", |call| parity(call.arg(0)) == Some(0)),
        predicate("odd", |call| parity(call.arg(0)) == Some(1)),
        block("typeOf", type_of),
    ]
}

fn predicate(name: &str, test: fn(&HelperCall<'_>) -> bool) -> HelperEntry {
    block(name, move |call: &mut HelperCall<'_>| {
        let condition = test(call);
        call.branch(condition)
    })
}

/// Numeric ordering when both sides are numbers, text ordering when both are
/// strings, nothing otherwise.
fn ordered(call: &HelperCall<'_>) -> Option<Ordering> {
    let (a, b) = (call.arg(0), call.arg(1));
    match (to_f64(a), to_f64(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => match (a, b) {
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            _ => None,
        },
    }
}

/// `in value list` or `in value a b c`.
fn one_of(call: &HelperCall<'_>) -> bool {
    let needle = call.arg(0);
    match call.args().get(1..) {
        Some([Value::Array(items)]) => items.iter().any(|item| equal(item, needle)),
        Some(candidates) => candidates.iter().any(|item| equal(item, needle)),
        None => false,
    }
}

fn parity(value: &Value) -> Option<i64> {
    let n = to_f64(value)?;
    if n.fract() != 0.0 {
        return None;
    }
    Some((n as i64).rem_euclid(2))
}

fn type_of(call: &mut HelperCall<'_>) -> HelperResult {
    let actual = type_name(call.arg(0));
    match call.arg_str(1).map(str::to_string) {
        Some(expected) => call.branch(actual == expected),
        None if call.is_block() => call.branch(true),
        None => Ok(HelperOutput::from(actual)),
    }
}
