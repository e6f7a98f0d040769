//! Media URL and markup helpers.
//!
//! A media reference is either a structured descriptor (`{id, url, sizes,
//! alt, …}`), a plain URL, or a raw id. Raw ids are turned into URLs under
//! the media base URL from `settings.mediaBaseUrl` (default `/media`).

use handlebars::html_escape;
use serde_json::{json, Map, Value};

use super::{block, inline};
use crate::evaluator::{is_blank, lookup_path, to_display_string, to_f64};
use crate::sandbox::{HelperCall, HelperEntry, HelperOutput, HelperResult};

pub const DEFAULT_MEDIA_BASE: &str = "/media";

/// Width ladder used for `srcset`.
pub const SIZE_LADDER: [(&str, u32); 4] = [
    ("small", 480),
    ("medium", 768),
    ("large", 1024),
    ("full", 1920),
];

const MEDIA_KINDS: [(&str, &[&str]); 4] = [
    (
        "thumbnail",
        &[
            "thumbnail",
            "featuredImage",
            "featured_image",
            "featuredMedia",
            "featured_media",
            "image",
        ],
    ),
    ("gallery", &["gallery", "images"]),
    ("video", &["video", "videoUrl", "video_url"]),
    ("audio", &["audio", "audioUrl", "audio_url"]),
];

pub fn entries() -> Vec<HelperEntry> {
    vec![
        inline("media", |call: &mut HelperCall<'_>| {
            let size = size_arg(call, 1, "full");
            let url = media_url(&media_base(call), call.arg(0), &size);
            Ok(HelperOutput::from(url.unwrap_or_default()))
        }),
        inline("srcset", |call: &mut HelperCall<'_>| {
            Ok(HelperOutput::from(srcset(&media_base(call), call.arg(0))))
        }),
        inline("img", img),
        block("gallery", gallery),
        block("hasMedia", |call: &mut HelperCall<'_>| {
            let found = has_media(call);
            call.branch(found)
        }),
    ]
}

pub(crate) fn size_arg(call: &HelperCall<'_>, index: usize, default: &str) -> String {
    call.arg_str(index)
        .map(str::to_string)
        .or_else(|| call.hash_str("size"))
        .unwrap_or_else(|| default.to_string())
}

pub(crate) fn media_base(call: &HelperCall<'_>) -> String {
    call.setting("mediaBaseUrl")
        .or_else(|| call.setting("media_base_url"))
        .map(to_display_string)
        .filter(|base| !base.is_empty())
        .unwrap_or_else(|| DEFAULT_MEDIA_BASE.to_string())
        .trim_end_matches('/')
        .to_string()
}

fn is_id(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()),
        _ => false,
    }
}

fn synthesize(base: &str, id: &Value, size: &str) -> String {
    let id = match to_f64(id) {
        Some(n) if n.fract() == 0.0 => format!("{}", n as i64),
        _ => to_display_string(id),
    };
    if size == "full" {
        format!("{}/{}", base, id)
    } else {
        format!("{}/{}?size={}", base, id, size)
    }
}

fn sized_url(descriptor: &Map<String, Value>, size: &str) -> Option<String> {
    match descriptor.get("sizes")?.get(size)? {
        Value::String(url) if !url.is_empty() => Some(url.clone()),
        Value::Object(entry) => entry.get("url").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Resolve a media reference to a URL.
pub fn media_url(base: &str, value: &Value, size: &str) -> Option<String> {
    match value {
        Value::Object(descriptor) => sized_url(descriptor, size)
            .or_else(|| {
                ["url", "source_url", "src"]
                    .iter()
                    .find_map(|key| descriptor.get(*key).and_then(Value::as_str))
                    .filter(|url| !url.is_empty())
                    .map(str::to_string)
            })
            .or_else(|| {
                descriptor
                    .get("id")
                    .filter(|id| is_id(id))
                    .map(|id| synthesize(base, id, size))
            }),
        v if is_id(v) => Some(synthesize(base, v, size)),
        Value::String(url) if !url.is_empty() => Some(url.clone()),
        _ => None,
    }
}

/// `url 480w, url 768w, …` over the size ladder. Descriptors contribute only
/// the sizes they carry plus their main URL as the full width.
pub fn srcset(base: &str, value: &Value) -> String {
    let candidates: Vec<String> = SIZE_LADDER
        .iter()
        .filter_map(|(size, width)| {
            let url = match value {
                Value::Object(descriptor) if *size != "full" => sized_url(descriptor, size),
                other => media_url(base, other, size),
            }?;
            Some(format!("{} {}w", url, width))
        })
        .collect();
    candidates.join(", ")
}

/// A media item as a block scope: the descriptor with `url` resolved.
pub fn image_descriptor(base: &str, value: &Value, size: &str) -> Option<Value> {
    let url = media_url(base, value, size)?;
    Some(match value {
        Value::Object(descriptor) => {
            let mut descriptor = descriptor.clone();
            descriptor.insert("url".to_string(), Value::String(url));
            Value::Object(descriptor)
        }
        v if is_id(v) => json!({ "id": v, "url": url }),
        _ => json!({ "url": url }),
    })
}

fn alt_text(value: &Value) -> String {
    ["alt", "alt_text", "title"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

fn img(call: &mut HelperCall<'_>) -> HelperResult {
    let base = media_base(call);
    let size = size_arg(call, 1, "full");
    let Some(url) = media_url(&base, call.arg(0), &size) else {
        return Ok(HelperOutput::safe(""));
    };

    let alt = call.hash_str("alt").unwrap_or_else(|| alt_text(call.arg(0)));
    let loading = call.hash_str("loading").unwrap_or_else(|| "lazy".to_string());
    let mut tag = format!("<img src=\"{}\"", html_escape(&url));
    let set = srcset(&base, call.arg(0));
    if !set.is_empty() {
        tag.push_str(&format!(" srcset=\"{}\"", html_escape(&set)));
    }
    tag.push_str(&format!(" alt=\"{}\"", html_escape(&alt)));
    if let Some(class) = call.hash_str("class") {
        tag.push_str(&format!(" class=\"{}\"", html_escape(&class)));
    }
    tag.push_str(&format!(" loading=\"{}\">", html_escape(&loading)));
    Ok(HelperOutput::safe(tag))
}

fn gallery(call: &mut HelperCall<'_>) -> HelperResult {
    let base = media_base(call);
    let size = size_arg(call, 1, "medium");
    let images: Vec<Value> = match call.arg(0) {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| image_descriptor(&base, item, &size))
            .collect(),
        Value::Null => Vec::new(),
        single => image_descriptor(&base, single, &size).into_iter().collect(),
    };

    if call.is_block() {
        return call.iterate(&images);
    }
    if images.is_empty() {
        return Ok(HelperOutput::safe(""));
    }
    let mut markup = String::from("<div class=\"gallery\">");
    for image in &images {
        let url = image.get("url").map(to_display_string).unwrap_or_default();
        markup.push_str(&format!(
            "<img src=\"{}\" alt=\"{}\" loading=\"lazy\">",
            html_escape(&url),
            html_escape(&alt_text(image))
        ));
    }
    markup.push_str("</div>");
    Ok(HelperOutput::safe(markup))
}

/// `hasMedia`, `hasMedia record`, `hasMedia "video"`, `hasMedia record "video"`.
fn has_media(call: &HelperCall<'_>) -> bool {
    let (record, kind) = match (call.arg(0), call.arg(1)) {
        (Value::Object(_), kind) => (call.arg(0), kind.as_str()),
        (Value::String(kind), _) => (call.this(), Some(kind.as_str())),
        _ => (call.this(), None),
    };
    let kind = kind.map(str::to_string).or_else(|| call.hash_str("type"));

    MEDIA_KINDS
        .iter()
        .filter(|(name, _)| kind.as_deref().map_or(true, |k| k == *name))
        .flat_map(|(_, keys)| keys.iter())
        .any(|key| lookup_path(record, key).is_some_and(|v| !is_blank(v)))
}
