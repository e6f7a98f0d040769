//! Custom-field access helpers (`acf*`).
//!
//! Fields are looked up as dotted paths in the current scope first and then
//! in the caller's original data, so `{{acf "price"}}` works both at the top
//! level and inside iteration blocks.

use chrono::Datelike;
use handlebars::html_escape;
use serde_json::Value;

use super::format::parse_datetime;
use super::media::{image_descriptor, media_base, media_url, size_arg};
use super::{block, inline};
use crate::evaluator::{is_blank, is_truthy, lookup_path, to_display_string};
use crate::sandbox::{HelperCall, HelperEntry, HelperOutput, HelperResult};

pub fn entries() -> Vec<HelperEntry> {
    vec![
        inline("acf", get_field),
        inline("field", get_field),
        inline("getField", get_field),
        inline("acfImage", |call: &mut HelperCall<'_>| {
            let size = size_arg(call, 1, "medium");
            let url = field_value(call)
                .and_then(|value| media_url(&media_base(call), value, &size))
                .unwrap_or_default();
            Ok(HelperOutput::from(url))
        }),
        block("acfGallery", gallery),
        block("acfRelation", relation),
        block("acfRepeater", |call: &mut HelperCall<'_>| {
            let rows = field_value(call).map(as_list).unwrap_or_default();
            if call.is_block() {
                return call.iterate(&rows);
            }
            Ok(HelperOutput::Value(Value::Array(rows)))
        }),
        block("acfBoolean", |call: &mut HelperCall<'_>| {
            let flag = field_value(call).is_some_and(is_truthy);
            if call.is_block() {
                return call.branch(flag);
            }
            let (key, index, default) = if flag {
                ("trueText", 1, "Yes")
            } else {
                ("falseText", 2, "No")
            };
            let text = call
                .arg_str(index)
                .map(str::to_string)
                .or_else(|| call.hash_str(key))
                .unwrap_or_else(|| default.to_string());
            Ok(HelperOutput::from(text))
        }),
        inline("acfLink", link),
        inline("acfDate", |call: &mut HelperCall<'_>| {
            let format = call
                .arg_str(1)
                .map(str::to_string)
                .or_else(|| call.hash_str("format"))
                .unwrap_or_else(|| "Y-m-d".to_string());
            let Some(value) = field_value(call) else {
                return Ok(HelperOutput::from(""));
            };
            Ok(HelperOutput::from(match parse_datetime(value) {
                Some(date) => php_date(&date, &format),
                None => to_display_string(value),
            }))
        }),
    ]
}

/// The named field, or `None` when it is missing or blank.
fn field_value<'c>(call: &'c HelperCall<'_>) -> Option<&'c Value> {
    let path = call.arg_str(0)?;
    call.lookup(path)
        .filter(|v| !is_blank(v))
        .or_else(|| lookup_path(call.data(), path).filter(|v| !is_blank(v)))
}

fn get_field(call: &mut HelperCall<'_>) -> HelperResult {
    if let Some(value) = field_value(call) {
        return Ok(HelperOutput::Value(value.clone()));
    }
    let fallback = call
        .args()
        .get(1)
        .cloned()
        .or_else(|| call.hash("default").cloned())
        .unwrap_or_else(|| Value::String(String::new()));
    Ok(HelperOutput::Value(fallback))
}

fn as_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

fn gallery(call: &mut HelperCall<'_>) -> HelperResult {
    let base = media_base(call);
    let size = size_arg(call, 1, "full");
    let images: Vec<Value> = field_value(call)
        .map(as_list)
        .unwrap_or_default()
        .iter()
        .filter_map(|item| image_descriptor(&base, item, &size))
        .collect();
    if call.is_block() {
        return call.iterate(&images);
    }
    let urls = images
        .iter()
        .filter_map(|image| image.get("url").cloned())
        .collect();
    Ok(HelperOutput::Value(Value::Array(urls)))
}

fn relation(call: &mut HelperCall<'_>) -> HelperResult {
    let items = field_value(call).map(as_list).unwrap_or_default();
    if call.is_block() {
        return call.iterate(&items);
    }
    let subfield = call
        .arg_str(1)
        .map(str::to_string)
        .or_else(|| call.hash_str("field"));
    let Some(subfield) = subfield else {
        return Ok(HelperOutput::Value(
            field_value(call).cloned().unwrap_or(Value::Null),
        ));
    };
    let project = |item: &Value| lookup_path(item, &subfield).cloned().unwrap_or(Value::Null);
    Ok(HelperOutput::Value(match field_value(call) {
        Some(Value::Array(list)) => Value::Array(list.iter().map(project).collect()),
        Some(single) => project(single),
        None => Value::Null,
    }))
}

fn link(call: &mut HelperCall<'_>) -> HelperResult {
    let Some(value) = field_value(call) else {
        return Ok(HelperOutput::safe(""));
    };
    let (url, title, target) = match value {
        Value::Object(link) => (
            link.get("url").map(to_display_string).unwrap_or_default(),
            link.get("title").map(to_display_string).unwrap_or_default(),
            link.get("target").map(to_display_string).unwrap_or_default(),
        ),
        other => (to_display_string(other), String::new(), String::new()),
    };
    if url.is_empty() {
        return Ok(HelperOutput::safe(""));
    }
    let text = call
        .arg_str(1)
        .map(str::to_string)
        .or_else(|| call.hash_str("text"))
        .filter(|t| !t.is_empty())
        .or_else(|| Some(title).filter(|t| !t.is_empty()))
        .unwrap_or_else(|| url.clone());

    let mut anchor = format!("<a href=\"{}\"", html_escape(&url));
    if !target.is_empty() {
        anchor.push_str(&format!(" target=\"{}\"", html_escape(&target)));
        if target == "_blank" {
            anchor.push_str(" rel=\"noopener noreferrer\"");
        }
    }
    anchor.push_str(&format!(">{}</a>", html_escape(&text)));
    Ok(HelperOutput::safe(anchor))
}

/// `Y` four-digit year, `y` two-digit year, `m`/`d` zero padded month/day,
/// `n`/`j` unpadded month/day. Other characters are copied.
pub fn php_date<T: Datelike>(date: &T, format: &str) -> String {
    let mut out = String::with_capacity(format.len() + 4);
    for ch in format.chars() {
        match ch {
            'Y' => out.push_str(&format!("{:04}", date.year())),
            'y' => out.push_str(&format!("{:02}", date.year().rem_euclid(100))),
            'm' => out.push_str(&format!("{:02}", date.month())),
            'n' => out.push_str(&date.month().to_string()),
            'd' => out.push_str(&format!("{:02}", date.day())),
            'j' => out.push_str(&date.day().to_string()),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::test_support::{find, TextBlock};
    use serde_json::json;

    fn call_on<'a>(name: &'a str, args: Vec<Value>, this: Value) -> HelperCall<'a> {
        HelperCall::new(name, args)
            .with_this(this.clone())
            .with_root(json!({ "_root": this }))
    }

    fn eval(name: &str, args: Vec<Value>, this: Value) -> HelperOutput {
        let entry = find(&entries(), name);
        let mut call = call_on(name, args, this);
        entry.helper.call(&mut call).unwrap()
    }

    #[test]
    fn test_acf_reads_field_and_fallback() {
        let product = json!({"price": 25000, "empty": ""});
        assert_eq!(
            eval("acf", vec![json!("price")], product.clone()).into_value(),
            json!(25000)
        );
        assert_eq!(
            eval("acf", vec![json!("missing"), json!("default")], product.clone()).into_value(),
            json!("default")
        );
        assert_eq!(
            eval("getField", vec![json!("empty"), json!("n/a")], product.clone()).into_value(),
            json!("n/a")
        );
        assert_eq!(eval("field", vec![json!("nope")], product).into_value(), json!(""));
    }

    #[test]
    fn test_acf_falls_back_to_root_data() {
        let entry = find(&entries(), "acf");
        let mut call = HelperCall::new("acf", vec![json!("site.name")])
            .with_this(json!({"title": "row"}))
            .with_root(json!({"_root": {"site": {"name": "Shop"}}}));
        assert_eq!(entry.helper.call(&mut call).unwrap().into_value(), json!("Shop"));
    }

    #[test]
    fn test_acf_keeps_zero_and_false() {
        let record = json!({"stock": 0, "active": false});
        assert_eq!(eval("acf", vec![json!("stock"), json!(9)], record.clone()).into_value(), json!(0));
        assert_eq!(
            eval("acf", vec![json!("active"), json!(true)], record).into_value(),
            json!(false)
        );
    }

    #[test]
    fn test_acf_image_sizes() {
        let post = json!({"hero": {"url": "/full.jpg", "sizes": {"medium": "/m.jpg"}}, "logo": 12});
        assert_eq!(eval("acfImage", vec![json!("hero")], post.clone()).into_value(), json!("/m.jpg"));
        assert_eq!(
            eval("acfImage", vec![json!("logo"), json!("full")], post).into_value(),
            json!("/media/12")
        );
    }

    #[test]
    fn test_acf_repeater_block() {
        let entry = find(&entries(), "acfRepeater");
        let mut block = TextBlock::default();
        let mut call = call_on("acfRepeater", vec![json!("rows")], json!({"rows": ["a", "b"]}))
            .with_block(&mut block);
        let out = entry.helper.call(&mut call).unwrap();
        assert_eq!(out, HelperOutput::safe("[0:a][1:b]"));

        let mut block = TextBlock::default();
        let mut call =
            call_on("acfRepeater", vec![json!("rows")], json!({})).with_block(&mut block);
        assert_eq!(entry.helper.call(&mut call).unwrap(), HelperOutput::safe("no"));
    }

    #[test]
    fn test_acf_relation_projection() {
        let post = json!({"related": [{"title": "A"}, {"title": "B"}]});
        assert_eq!(
            eval("acfRelation", vec![json!("related"), json!("title")], post).into_value(),
            json!(["A", "B"])
        );
    }

    #[test]
    fn test_acf_boolean_texts() {
        let record = json!({"on": true, "off": false});
        assert_eq!(eval("acfBoolean", vec![json!("on")], record.clone()).into_value(), json!("Yes"));
        assert_eq!(
            eval("acfBoolean", vec![json!("off"), json!("Y"), json!("N")], record).into_value(),
            json!("N")
        );
    }

    #[test]
    fn test_acf_link_markup() {
        let record = json!({
            "cta": {"url": "/buy?a=1&b=2", "title": "Buy <now>", "target": "_blank"},
            "plain": "/about"
        });
        let out = eval("acfLink", vec![json!("cta")], record.clone());
        assert!(out.is_safe());
        assert_eq!(
            out.to_text(),
            "<a href=\"/buy?a&#x3D;1&amp;b&#x3D;2\" target=\"_blank\" rel=\"noopener noreferrer\">Buy &lt;now&gt;</a>"
        );
        assert_eq!(
            eval("acfLink", vec![json!("plain"), json!("About")], record).to_text(),
            "<a href=\"/about\">About</a>"
        );
    }

    #[test]
    fn test_acf_date_tokens() {
        let record = json!({"opened": "20240305", "bad": "someday"});
        assert_eq!(
            eval("acfDate", vec![json!("opened")], record.clone()).into_value(),
            json!("2024-03-05")
        );
        assert_eq!(
            eval("acfDate", vec![json!("opened"), json!("n/j/y")], record.clone()).into_value(),
            json!("3/5/24")
        );
        assert_eq!(eval("acfDate", vec![json!("bad")], record).into_value(), json!("someday"));
    }
}
