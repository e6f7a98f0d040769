use std::sync::Arc;
use std::thread;

use serde_json::json;
use xrender::{
    CompileOptions, EngineError, HelperCall, HelperOutput, HelperResult, RenderConfig,
    RenderContext, RenderEngine, TemplateBuilder,
};

fn ctx(data: serde_json::Value) -> RenderContext {
    RenderContext::new(data)
}

#[test]
fn test_compile_twice_returns_same_template() {
    let engine = RenderEngine::new();
    let options = CompileOptions::default();
    let a = engine.compile("Hello {{name}}", &options).unwrap();
    let b = engine.compile("Hello {{name}}", &options).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(engine.cache_stats().entries, 1);
}

#[test]
fn test_render_with_namespaces() {
    let engine = RenderEngine::new();
    let context = RenderContext::new(json!({"title": "Spring Sale"}))
        .with_user(json!({"name": "Kim"}))
        .with_settings(json!({"siteName": "Shop"}))
        .with_meta(json!({"page": 2}));
    let out = engine.render(
        "{{title}} | {{user.name}} | {{settings.siteName}} | {{meta.page}} | {{_root.title}}",
        &context,
        &CompileOptions::default(),
    );
    assert_eq!(out, "Spring Sale | Kim | Shop | 2 | Spring Sale");
}

#[test]
fn test_render_compile_error_marker() {
    let engine = RenderEngine::new();
    let out = engine.render("before {{#if ok}} never closed", &ctx(json!({})), &CompileOptions::default());
    assert!(out.starts_with("[Template Error: "), "{}", out);
}

#[test]
fn test_strict_mode_missing_field() {
    let engine = RenderEngine::new();
    let lenient = engine.render("[{{missing}}]", &ctx(json!({})), &CompileOptions::default());
    assert_eq!(lenient, "[]");
    let strict = engine.render("[{{missing}}]", &ctx(json!({})), &CompileOptions::strict());
    assert!(strict.starts_with("[Render Error: "), "{}", strict);
}

#[test]
fn test_escaping_policy() {
    let engine = RenderEngine::new();
    let data = ctx(json!({"v": "<b>bold</b>", "link": {"url": "/a", "title": "A"}}));
    assert_eq!(
        engine.render("{{v}}", &data, &CompileOptions::default()),
        "&lt;b&gt;bold&lt;/b&gt;"
    );
    assert_eq!(engine.render("{{{v}}}", &data, &CompileOptions::default()), "<b>bold</b>");
    assert_eq!(engine.render("{{v}}", &data, &CompileOptions::raw()), "<b>bold</b>");
    assert_eq!(
        engine.render("{{uppercase v}}", &data, &CompileOptions::default()),
        "&lt;B&gt;BOLD&lt;/B&gt;"
    );
    assert_eq!(
        engine.render("{{acfLink \"link\"}}", &data, &CompileOptions::default()),
        "<a href=\"/a\">A</a>"
    );
}

#[test]
fn test_render_default_uses_config() {
    let engine = RenderEngine::with_config(RenderConfig {
        no_escape: true,
        ..RenderConfig::default()
    });
    assert_eq!(engine.render_default("{{v}}", &ctx(json!({"v": "<i>"}))), "<i>");
}

#[test]
fn test_helper_registered_after_compile_keeps_cached_template() {
    let engine = RenderEngine::new();
    engine.register_helper("greet", |_: &mut HelperCall<'_>| -> HelperResult {
        Ok(HelperOutput::from("v1"))
    });
    let data = ctx(json!({}));
    assert_eq!(engine.render_default("{{greet}}", &data), "v1");

    engine.register_helper("greet", |_: &mut HelperCall<'_>| -> HelperResult {
        Ok(HelperOutput::from("v2"))
    });
    assert_eq!(engine.render_default("{{greet}}", &data), "v1");
    // a different source compiles against the current registry
    assert_eq!(engine.render_default("{{greet}}!", &data), "v2!");

    engine.clear_cache();
    assert_eq!(engine.render_default("{{greet}}", &data), "v2");
}

#[test]
fn test_partials() {
    let engine = RenderEngine::new();
    engine
        .register_partial("price", "{{formatCurrency price}}")
        .unwrap();
    let out = engine.render(
        "{{#each products}}{{name}}={{> price}};{{/each}}",
        &ctx(json!({"products": [{"name": "a", "price": 1000}, {"name": "b", "price": 25000}]})),
        &CompileOptions::default(),
    );
    assert_eq!(out, "a=₩1,000;b=₩25,000;");

    let err = engine.register_partial("bad", "{{#each}}").unwrap_err();
    assert!(matches!(err, EngineError::Partial { .. }));
}

#[test]
fn test_validate_reports_errors() {
    let engine = RenderEngine::new();
    let ok = engine.validate("{{#each items}}{{this}}{{/each}}");
    assert!(ok.valid);
    assert!(ok.errors.is_empty());

    let bad = engine.validate("{{#each items}}{{this}}");
    assert!(!bad.valid);
    assert_eq!(bad.errors.len(), 1);
}

#[test]
fn test_cache_capacity_bounds_entries() {
    let engine = RenderEngine::with_config(RenderConfig {
        cache_capacity: 3,
        ..RenderConfig::default()
    });
    for i in 0..10 {
        engine.render_default(&format!("template {}", i), &ctx(json!({})));
    }
    let stats = engine.cache_stats();
    assert_eq!(stats.entries, 3);
    assert_eq!(stats.capacity, 3);
    assert_eq!(stats.misses, 10);
}

#[test]
fn test_builder_output_renders() {
    let source = TemplateBuilder::new()
        .add("<ul>")
        .add_block_with("each", "items", "<li>{{this}}</li>")
        .add("</ul>")
        .add_if(true, "{{count items}}")
        .build();
    let engine = RenderEngine::new();
    let out = engine.render_default(&source, &ctx(json!({"items": ["a", "b"]})));
    assert_eq!(out, "<ul><li>a</li><li>b</li></ul>2");
}

#[test]
fn test_shared_across_threads() {
    let engine = Arc::new(RenderEngine::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine.render_default("{{add n 1}}", &RenderContext::new(json!({"n": i})))
            })
        })
        .collect();
    let outputs: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for (i, out) in outputs.iter().enumerate() {
        assert_eq!(out, &(i + 1).to_string());
    }
    assert_eq!(engine.cache_stats().entries, 1);
}

#[tokio::test]
async fn test_render_async_matches_render() {
    let engine = RenderEngine::new();
    let data = ctx(json!({"items": [1, 2, 3]}));
    let sync = engine.render("{{sum items}}", &data, &CompileOptions::default());
    let async_out = engine
        .render_async("{{sum items}}", &data, &CompileOptions::default())
        .await;
    assert_eq!(sync, "6");
    assert_eq!(async_out, sync);
}
