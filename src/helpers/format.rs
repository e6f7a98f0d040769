//! Text, number and date formatting helpers.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde_json::Value;

use super::inline;
use crate::error::HelperError;
use crate::evaluator::{is_truthy, to_display_string, to_f64, to_f64_or_zero};
use crate::sandbox::{HelperCall, HelperEntry, HelperOutput, HelperResult};

pub fn entries() -> Vec<HelperEntry> {
    vec![
        inline("formatCurrency", format_currency),
        inline("formatDate", format_date),
        inline("formatNumber", |call: &mut HelperCall<'_>| {
            let decimals = decimals_arg(call, 1, 0);
            Ok(HelperOutput::from(group_digits(
                to_f64_or_zero(call.arg(0)),
                decimals,
            )))
        }),
        inline("excerpt", |call: &mut HelperCall<'_>| {
            let length = call
                .arg_f64(1)
                .or_else(|| call.hash_f64("length"))
                .unwrap_or(150.0) as usize;
            let suffix = suffix_arg(call, 2);
            Ok(HelperOutput::from(excerpt(
                &to_display_string(call.arg(0)),
                length,
                &suffix,
            )))
        }),
        text("uppercase", |s| s.to_uppercase()),
        text("lowercase", |s| s.to_lowercase()),
        text("capitalize", capitalize),
        text("titleCase", |s| {
            s.split_whitespace()
                .map(capitalize)
                .collect::<Vec<_>>()
                .join(" ")
        }),
        text("camelCase", camel_case),
        text("snakeCase", |s| join_words(s, "_")),
        text("kebabCase", |s| join_words(s, "-")),
        inline("truncate", |call: &mut HelperCall<'_>| {
            let text = to_display_string(call.arg(0));
            let Some(length) = call.arg_f64(1).or_else(|| call.hash_f64("length")) else {
                return Ok(HelperOutput::from(text));
            };
            let suffix = suffix_arg(call, 2);
            Ok(HelperOutput::from(truncate(&text, length as usize, &suffix)))
        }),
        text("stripTags", strip_tags),
        text("urlEncode", |s| urlencoding::encode(s).into_owned()),
        text("urlDecode", |s| {
            urlencoding::decode(s)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| s.to_string())
        }),
        inline("json", |call: &mut HelperCall<'_>| {
            let pretty = call.args().get(1).is_some_and(is_truthy)
                || call.hash_bool("pretty");
            let encoded = if pretty {
                serde_json::to_string_pretty(call.arg(0))
            } else {
                serde_json::to_string(call.arg(0))
            };
            encoded
                .map(HelperOutput::from)
                .map_err(|e| HelperError::failed(e.to_string()))
        }),
        inline("fileSize", |call: &mut HelperCall<'_>| {
            Ok(HelperOutput::from(file_size(to_f64_or_zero(call.arg(0)))))
        }),
        inline("percent", percent),
        text("phone", format_phone),
        inline("pluralize", |call: &mut HelperCall<'_>| {
            let count = to_f64_or_zero(call.arg(0));
            let singular = to_display_string(call.arg(1));
            let plural = call.arg_str(2).map(str::to_string);
            Ok(HelperOutput::from(pluralize(count, &singular, plural.as_deref())))
        }),
        inline("timeAgo", |call: &mut HelperCall<'_>| {
            Ok(match parse_datetime(call.arg(0)) {
                Some(then) => HelperOutput::from(relative_time(then, Utc::now())),
                None => HelperOutput::from(to_display_string(call.arg(0))),
            })
        }),
    ]
}

/// Helper that maps the display text of its first argument.
fn text(name: &str, transform: fn(&str) -> String) -> HelperEntry {
    inline(name, move |call: &mut HelperCall<'_>| {
        Ok(HelperOutput::from(transform(&to_display_string(call.arg(0)))))
    })
}

fn decimals_arg(call: &HelperCall<'_>, index: usize, default: usize) -> usize {
    call.arg_f64(index)
        .or_else(|| call.hash_f64("decimals"))
        .map(|n| n.clamp(0.0, 10.0) as usize)
        .unwrap_or(default)
}

fn suffix_arg(call: &HelperCall<'_>, index: usize) -> String {
    call.arg_str(index)
        .map(str::to_string)
        .or_else(|| call.hash_str("suffix"))
        .unwrap_or_else(|| "...".to_string())
}

// ================================
// Numbers
// ================================

/// Fixed decimals with `,` thousands grouping.
pub fn group_digits(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }

    let is_zero = formatted.chars().all(|c| c == '0' || c == '.');
    if value < 0.0 && !is_zero {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn currency_symbol(code: &str) -> Option<&'static str> {
    match code {
        "KRW" => Some("₩"),
        "USD" => Some("$"),
        "EUR" => Some("€"),
        "JPY" | "CNY" => Some("¥"),
        "GBP" => Some("£"),
        _ => None,
    }
}

fn format_currency(call: &mut HelperCall<'_>) -> HelperResult {
    let code = call
        .arg_str(1)
        .map(str::to_string)
        .or_else(|| call.hash_str("currency"))
        .or_else(|| call.setting("currency").map(to_display_string))
        .unwrap_or_else(|| "KRW".to_string())
        .to_uppercase();
    let value = to_f64_or_zero(call.arg(0));
    Ok(HelperOutput::from(currency(value, &code)))
}

/// `₩25,000`, `$12.50`; unknown codes are written as a prefix.
pub fn currency(value: f64, code: &str) -> String {
    let decimals = if matches!(code, "KRW" | "JPY") { 0 } else { 2 };
    let amount = group_digits(value.abs(), decimals);
    let sign = if value < 0.0 && amount.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match currency_symbol(code) {
        Some(symbol) => format!("{}{}{}", sign, symbol, amount),
        None => format!("{}{} {}", sign, code, amount),
    }
}

pub fn file_size(bytes: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024.0 {
        return format!("{} B", bytes.max(0.0).round() as i64);
    }
    let mut size = bytes;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    let rendered = format!("{:.1}", size);
    let rendered = rendered.strip_suffix(".0").unwrap_or(&rendered);
    format!("{} {}", rendered, UNITS[unit])
}

fn percent(call: &mut HelperCall<'_>) -> HelperResult {
    let value = to_f64_or_zero(call.arg(0));
    let decimals = decimals_arg(call, 1, 0);
    let ratio = match call.hash_f64("total") {
        Some(total) if total == 0.0 => 0.0,
        Some(total) => value / total,
        None => value,
    };
    Ok(HelperOutput::from(format!("{:.*}%", decimals, ratio * 100.0)))
}

/// Korean phone grouping: `02-123-4567`, `010-1234-5678`. Numbers that do
/// not fit a known length are returned unchanged.
pub fn format_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let parts: Option<[usize; 3]> = if digits.starts_with("02") {
        match digits.len() {
            9 => Some([2, 3, 4]),
            10 => Some([2, 4, 4]),
            _ => None,
        }
    } else {
        match digits.len() {
            10 => Some([3, 3, 4]),
            11 => Some([3, 4, 4]),
            _ => None,
        }
    };
    match parts {
        Some([a, b, _]) => format!(
            "{}-{}-{}",
            &digits[..a],
            &digits[a..a + b],
            &digits[a + b..]
        ),
        None => raw.to_string(),
    }
}

pub fn pluralize(count: f64, singular: &str, plural: Option<&str>) -> String {
    if count == 1.0 {
        return singular.to_string();
    }
    match plural {
        Some(plural) => plural.to_string(),
        None => format!("{}s", singular),
    }
}

// ================================
// Text
// ================================

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"))
}

pub fn strip_tags(text: &str) -> String {
    tag_pattern().replace_all(text, "").into_owned()
}

/// Strip markup, collapse whitespace and cut at the last word boundary that
/// fits in `length` characters.
pub fn excerpt(text: &str, length: usize, suffix: &str) -> String {
    let plain = strip_tags(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if plain.chars().count() <= length {
        return plain;
    }
    let cut: String = plain.chars().take(length).collect();
    let cut = match cut.rfind(' ') {
        Some(boundary) if boundary > 0 => &cut[..boundary],
        _ => cut.as_str(),
    };
    format!("{}{}", cut.trim_end(), suffix)
}

pub fn truncate(text: &str, length: usize, suffix: &str) -> String {
    if text.chars().count() <= length {
        return text.to_string();
    }
    let cut: String = text.chars().take(length).collect();
    format!("{}{}", cut, suffix)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Split on separators and lower-to-upper case changes.
fn words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for ch in text.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn join_words(text: &str, separator: &str) -> String {
    words(text)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(separator)
}

fn camel_case(text: &str) -> String {
    words(text)
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let lower = w.to_lowercase();
            if i == 0 {
                lower
            } else {
                capitalize(&lower)
            }
        })
        .collect()
}

// ================================
// Dates
// ================================

/// Dates from RFC 3339 strings, common date/time layouts, compact `Ymd`
/// strings or unix timestamps (seconds, or milliseconds when large).
pub fn parse_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(_) => {
            let n = to_f64(value)?;
            let millis = if n.abs() >= 1e11 { n } else { n * 1000.0 };
            Utc.timestamp_millis_opt(millis as i64).single()
        }
        Value::String(s) => parse_date_str(s.trim()),
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for layout in ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, layout) {
            return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// Substitute `YYYY YY MM DD HH mm ss` tokens.
pub fn format_tokens(date: &DateTime<Utc>, pattern: &str) -> String {
    const TOKENS: [&str; 7] = ["YYYY", "YY", "MM", "DD", "HH", "mm", "ss"];
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;
    'outer: while !rest.is_empty() {
        for token in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(&date.format(chrono_spec(token)).to_string());
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            out.push(ch);
        }
        rest = chars.as_str();
    }
    out
}

fn chrono_spec(token: &str) -> &'static str {
    match token {
        "YYYY" => "%Y",
        "YY" => "%y",
        "MM" => "%m",
        "DD" => "%d",
        "HH" => "%H",
        "mm" => "%M",
        _ => "%S",
    }
}

fn format_date(call: &mut HelperCall<'_>) -> HelperResult {
    let pattern = call
        .arg_str(1)
        .map(str::to_string)
        .or_else(|| call.hash_str("format"))
        .unwrap_or_else(|| "YYYY-MM-DD".to_string());
    let value = call.arg(0);
    let date = match value {
        Value::String(s) if s.eq_ignore_ascii_case("now") => Some(Utc::now()),
        other => parse_datetime(other),
    };
    Ok(HelperOutput::from(match date {
        Some(date) => format_tokens(&date, &pattern),
        None => to_display_string(value),
    }))
}

/// `3 hours ago`, `in 2 days`, `just now`.
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    const UNITS: [(&str, i64); 6] = [
        ("year", 365 * 24 * 3600),
        ("month", 30 * 24 * 3600),
        ("day", 24 * 3600),
        ("hour", 3600),
        ("minute", 60),
        ("second", 1),
    ];
    let delta = (now - then).num_seconds();
    if delta == 0 {
        return "just now".to_string();
    }
    let seconds = delta.abs();
    let (unit, size) = UNITS
        .iter()
        .copied()
        .find(|(_, size)| seconds >= *size)
        .unwrap_or(("second", 1));
    let amount = seconds / size;
    let label = pluralize(amount as f64, unit, None);
    if delta > 0 {
        format!("{} {} ago", amount, label)
    } else {
        format!("in {} {}", amount, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::test_support::{find, value};
    use chrono::Duration;
    use serde_json::json;

    fn fmt(name: &str, args: Vec<Value>) -> Value {
        value(&find(&entries(), name), args)
    }

    #[test]
    fn test_currency() {
        assert_eq!(fmt("formatCurrency", vec![json!(25000)]), json!("₩25,000"));
        assert_eq!(fmt("formatCurrency", vec![json!(12.5), json!("usd")]), json!("$12.50"));
        assert_eq!(currency(-1234567.0, "KRW"), "-₩1,234,567");
        assert_eq!(currency(5.0, "CHF"), "CHF 5.00");
    }

    #[test]
    fn test_currency_default_from_settings() {
        let entry = find(&entries(), "formatCurrency");
        let mut call = HelperCall::new("formatCurrency", vec![json!(3)])
            .with_root(json!({"settings": {"currency": "EUR"}}));
        let out = entry.helper.call(&mut call).unwrap();
        assert_eq!(out.into_value(), json!("€3.00"));
    }

    #[test]
    fn test_number_grouping() {
        assert_eq!(group_digits(1234567.891, 2), "1,234,567.89");
        assert_eq!(group_digits(999.0, 0), "999");
        assert_eq!(group_digits(-1000.0, 0), "-1,000");
        assert_eq!(fmt("formatNumber", vec![json!("1000")]), json!("1,000"));
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(fmt("pluralize", vec![json!(1), json!("item")]), json!("item"));
        assert_eq!(fmt("pluralize", vec![json!(2), json!("item")]), json!("items"));
        assert_eq!(
            fmt("pluralize", vec![json!(5), json!("box"), json!("boxes")]),
            json!("boxes")
        );
        assert_eq!(fmt("pluralize", vec![json!(0), json!("item")]), json!("items"));
    }

    #[test]
    fn test_excerpt_cuts_at_word_boundary() {
        let text = "<p>The quick brown fox</p> jumps";
        assert_eq!(excerpt(text, 12, "..."), "The quick...");
        assert_eq!(excerpt("short", 150, "..."), "short");
        assert_eq!(truncate("abcdef", 3, "…"), "abc…");
    }

    #[test]
    fn test_case_transforms() {
        assert_eq!(fmt("capitalize", vec![json!("hello world")]), json!("Hello world"));
        assert_eq!(fmt("titleCase", vec![json!("hello big world")]), json!("Hello Big World"));
        assert_eq!(fmt("camelCase", vec![json!("hello big_world")]), json!("helloBigWorld"));
        assert_eq!(fmt("snakeCase", vec![json!("helloBigWorld")]), json!("hello_big_world"));
        assert_eq!(fmt("kebabCase", vec![json!("Hello Big World")]), json!("hello-big-world"));
        assert_eq!(fmt("uppercase", vec![json!("abc")]), json!("ABC"));
    }

    #[test]
    fn test_strip_and_url() {
        assert_eq!(fmt("stripTags", vec![json!("<b>bold</b> text")]), json!("bold text"));
        assert_eq!(fmt("urlEncode", vec![json!("a b&c")]), json!("a%20b%26c"));
        assert_eq!(fmt("urlDecode", vec![json!("a%20b")]), json!("a b"));
    }

    #[test]
    fn test_json_serialization() {
        assert_eq!(fmt("json", vec![json!({"a": 1})]), json!("{\"a\":1}"));
        assert_eq!(fmt("json", vec![json!([1]), json!(true)]), json!("[\n  1\n]"));
    }

    #[test]
    fn test_file_size_percent_phone() {
        assert_eq!(file_size(500.0), "500 B");
        assert_eq!(file_size(1536.0), "1.5 KB");
        assert_eq!(file_size(1048576.0), "1 MB");
        assert_eq!(fmt("percent", vec![json!(0.256), json!(1)]), json!("25.6%"));
        assert_eq!(format_phone("01012345678"), "010-1234-5678");
        assert_eq!(format_phone("021234567"), "02-123-4567");
        assert_eq!(format_phone("12345"), "12345");
    }

    #[test]
    fn test_format_date_tokens() {
        assert_eq!(
            fmt("formatDate", vec![json!("2024-03-05T14:07:09Z"), json!("YYYY.MM.DD HH:mm:ss")]),
            json!("2024.03.05 14:07:09")
        );
        assert_eq!(fmt("formatDate", vec![json!("2024-03-05")]), json!("2024-03-05"));
        assert_eq!(fmt("formatDate", vec![json!("not a date")]), json!("not a date"));
    }

    #[test]
    fn test_relative_time() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        assert_eq!(relative_time(now, now), "just now");
        assert_eq!(relative_time(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(relative_time(now - Duration::hours(1), now), "1 hour ago");
        assert_eq!(relative_time(now + Duration::days(2), now), "in 2 days");
        assert_eq!(relative_time(now - Duration::days(400), now), "1 year ago");
    }
}
