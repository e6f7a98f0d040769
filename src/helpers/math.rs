//! Aggregates, arithmetic and the restricted `math` evaluator.

use rand::Rng;
use serde_json::Value;

use super::{block, inline};
use crate::evaluator::{
    evaluate_with, lookup_path, number_value, to_display_string, to_f64, to_f64_or_zero,
};
use crate::sandbox::{HelperCall, HelperEntry, HelperOutput, HelperResult};

/// Text written in place of an expression that failed the allow-list.
pub const INVALID_EXPRESSION: &str = "[Invalid Expression]";

/// Upper bound on the number of items `range` produces.
pub const MAX_RANGE_ITEMS: usize = 10_000;

pub fn entries() -> Vec<HelperEntry> {
    vec![
        inline("sum", |call: &mut HelperCall<'_>| {
            Ok(HelperOutput::number(numbers(call).iter().sum()))
        }),
        inline("avg", |call: &mut HelperCall<'_>| {
            let values = numbers(call);
            if values.is_empty() {
                return Ok(HelperOutput::number(0.0));
            }
            Ok(HelperOutput::number(
                values.iter().sum::<f64>() / values.len() as f64,
            ))
        }),
        inline("min", |call: &mut HelperCall<'_>| {
            let values = numbers(call);
            Ok(HelperOutput::number(
                values.into_iter().reduce(f64::min).unwrap_or(0.0),
            ))
        }),
        inline("max", |call: &mut HelperCall<'_>| {
            let values = numbers(call);
            Ok(HelperOutput::number(
                values.into_iter().reduce(f64::max).unwrap_or(0.0),
            ))
        }),
        inline("add", |call: &mut HelperCall<'_>| binary(call, |a, b| a + b)),
        inline("subtract", |call: &mut HelperCall<'_>| binary(call, |a, b| a - b)),
        inline("multiply", |call: &mut HelperCall<'_>| binary(call, |a, b| a * b)),
        inline("divide", |call: &mut HelperCall<'_>| {
            binary(call, |a, b| if b == 0.0 { 0.0 } else { a / b })
        }),
        inline("mod", |call: &mut HelperCall<'_>| {
            binary(call, |a, b| if b == 0.0 { 0.0 } else { a % b })
        }),
        inline("pow", |call: &mut HelperCall<'_>| binary(call, f64::powf)),
        inline("sqrt", |call: &mut HelperCall<'_>| {
            unary(call, |v| if v < 0.0 { 0.0 } else { v.sqrt() })
        }),
        inline("abs", |call: &mut HelperCall<'_>| unary(call, f64::abs)),
        inline("round", round),
        inline("floor", |call: &mut HelperCall<'_>| unary(call, f64::floor)),
        inline("ceil", |call: &mut HelperCall<'_>| unary(call, f64::ceil)),
        inline("random", random),
        block("range", |call: &mut HelperCall<'_>| {
            let items = range_values(call);
            if call.is_block() {
                return call.iterate(&items);
            }
            Ok(HelperOutput::Value(Value::Array(items)))
        }),
        inline("math", math),
    ]
}

/// Numbers an aggregate works on: `sum list` or `sum field list`. Entries
/// without a numeric value are skipped.
fn numbers(call: &HelperCall<'_>) -> Vec<f64> {
    let (field, list) = match (call.arg(0), call.arg(1)) {
        (field, Value::Array(list)) => (field.as_str().map(str::to_string), list),
        (Value::Array(list), _) => (call.hash_str("field"), list),
        _ => return Vec::new(),
    };

    list.iter()
        .filter_map(|item| match field.as_deref() {
            Some(path) => lookup_path(item, path).and_then(to_f64),
            None => to_f64(item),
        })
        .filter(|n| n.is_finite())
        .collect()
}

fn unary(call: &HelperCall<'_>, op: impl Fn(f64) -> f64) -> HelperResult {
    Ok(HelperOutput::number(op(to_f64_or_zero(call.arg(0)))))
}

fn binary(call: &HelperCall<'_>, op: impl Fn(f64, f64) -> f64) -> HelperResult {
    let result = op(to_f64_or_zero(call.arg(0)), to_f64_or_zero(call.arg(1)));
    Ok(HelperOutput::number(if result.is_finite() { result } else { 0.0 }))
}

fn round(call: &mut HelperCall<'_>) -> HelperResult {
    let value = to_f64_or_zero(call.arg(0));
    let decimals = call
        .arg_f64(1)
        .or_else(|| call.hash_f64("decimals"))
        .unwrap_or(0.0)
        .clamp(0.0, 15.0) as i32;
    let factor = 10f64.powi(decimals);
    Ok(HelperOutput::number((value * factor).round() / factor))
}

fn random(call: &mut HelperCall<'_>) -> HelperResult {
    // non-finite bounds count as missing
    let min = call
        .arg_f64(0)
        .or_else(|| call.hash_f64("min"))
        .filter(|n| n.is_finite())
        .unwrap_or(0.0);
    let max = call
        .arg_f64(1)
        .or_else(|| call.hash_f64("max"))
        .filter(|n| n.is_finite())
        .unwrap_or(1.0);
    if min >= max || !(max - min).is_finite() {
        return Ok(HelperOutput::number(min));
    }
    let mut rng = rand::thread_rng();
    let value = if min.fract() == 0.0 && max.fract() == 0.0 {
        rng.gen_range(min as i64..=max as i64) as f64
    } else {
        rng.gen_range(min..max)
    };
    Ok(HelperOutput::number(value))
}

fn range_values(call: &HelperCall<'_>) -> Vec<Value> {
    let start = to_f64_or_zero(call.arg(0));
    let end = to_f64_or_zero(call.arg(1));
    let step = call
        .arg_f64(2)
        .or_else(|| call.hash_f64("step"))
        .unwrap_or(1.0);
    inclusive_range(start, end, step)
        .into_iter()
        .map(number_value)
        .collect()
}

/// Inclusive numeric range. A zero step or one pointing away from `end`
/// yields nothing.
pub fn inclusive_range(start: f64, end: f64, step: f64) -> Vec<f64> {
    if step == 0.0 || !step.is_finite() || (end - start) * step < 0.0 {
        return Vec::new();
    }
    let mut values = Vec::new();
    let mut current = start;
    while values.len() < MAX_RANGE_ITEMS {
        if (step > 0.0 && current > end) || (step < 0.0 && current < end) {
            break;
        }
        values.push(current);
        current += step;
    }
    values
}

fn math(call: &mut HelperCall<'_>) -> HelperResult {
    let expression = match call.arg(0) {
        Value::String(s) => s.clone(),
        Value::Null => return Ok(HelperOutput::number(0.0)),
        other => to_display_string(other),
    };
    let resolve = |name: &str| {
        call.hash(name)
            .and_then(to_f64)
            .or_else(|| call.lookup(name).and_then(to_f64))
    };
    match evaluate_with(&expression, resolve) {
        Ok(value) => Ok(HelperOutput::number(value)),
        Err(e) if e.is_rejection() => {
            tracing::warn!(expression = %expression, error = %e, "expression rejected");
            Ok(HelperOutput::from(INVALID_EXPRESSION))
        }
        Err(e) => {
            tracing::debug!(expression = %expression, error = %e, "expression evaluated to zero");
            Ok(HelperOutput::number(0.0))
        }
    }
}
