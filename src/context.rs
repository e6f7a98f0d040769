//! Render context assembly.
//!
//! The context a template sees is one JSON object: the fields of `data` at
//! the top level, then the `user`, `settings` and `meta` namespaces, then
//! `_root` holding the untouched `data` payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which the original data payload is exposed.
pub const ROOT_KEY: &str = "_root";

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub settings: Option<Value>,
    #[serde(default)]
    pub meta: Option<Value>,
}

impl RenderContext {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user: Value) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Merge into the object templates render against. Namespaces shadow
    /// same-named data fields; a non-object `data` is reachable only as
    /// `data` and `_root`.
    pub fn to_value(&self) -> Value {
        let mut merged = Map::new();
        match &self.data {
            Value::Object(fields) => {
                for (key, value) in fields {
                    merged.insert(key.clone(), value.clone());
                }
            }
            Value::Null => {}
            other => {
                merged.insert("data".to_string(), other.clone());
            }
        }

        for (key, namespace) in [
            ("user", &self.user),
            ("settings", &self.settings),
            ("meta", &self.meta),
        ] {
            if let Some(value) = namespace {
                merged.insert(key.to_string(), value.clone());
            }
        }

        let root = match &self.data {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };
        merged.insert(ROOT_KEY.to_string(), root);
        Value::Object(merged)
    }
}

impl From<Value> for RenderContext {
    fn from(data: Value) -> Self {
        RenderContext::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_order_and_root() {
        let ctx = RenderContext::new(json!({"title": "Post", "settings": "shadowed"}))
            .with_user(json!({"name": "Kim"}))
            .with_settings(json!({"currency": "USD"}));
        let value = ctx.to_value();
        assert_eq!(value["title"], json!("Post"));
        assert_eq!(value["user"]["name"], json!("Kim"));
        assert_eq!(value["settings"]["currency"], json!("USD"));
        assert_eq!(value["_root"]["settings"], json!("shadowed"));
        assert!(value.get("meta").is_none());
    }

    #[test]
    fn test_non_object_data() {
        let value = RenderContext::new(json!([1, 2])).to_value();
        assert_eq!(value["data"], json!([1, 2]));
        assert_eq!(value["_root"], json!([1, 2]));

        let value = RenderContext::default().to_value();
        assert_eq!(value, json!({"_root": {}}));
    }

    #[test]
    fn test_to_value_leaves_context_untouched() {
        let ctx = RenderContext::new(json!({"a": 1})).with_meta(json!({"page": 2}));
        let before = ctx.clone();
        let _ = ctx.to_value();
        assert_eq!(ctx, before);
    }

    #[test]
    fn test_deserialize_shape() {
        let ctx: RenderContext =
            serde_json::from_str(r#"{"data": {"x": 1}, "settings": {"mediaBaseUrl": "/m"}}"#)
                .unwrap();
        assert_eq!(ctx.data, json!({"x": 1}));
        assert!(ctx.user.is_none());
        assert_eq!(ctx.to_value()["settings"]["mediaBaseUrl"], json!("/m"));
    }
}
