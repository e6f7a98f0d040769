use serde_json::json;
use xrender::{
    CompileOptions, HelperCall, HelperError, HelperOutput, HelperResult, RenderConfig,
    RenderContext, RenderEngine, SafeString,
};

fn render(engine: &RenderEngine, source: &str, data: serde_json::Value) -> String {
    engine.render(source, &RenderContext::new(data), &CompileOptions::default())
}

#[test]
fn test_failing_helper_is_contained() {
    let engine = RenderEngine::new();
    engine.register_helper("broken", |_: &mut HelperCall<'_>| -> HelperResult {
        Err(HelperError::failed("boom"))
    });
    let out = render(&engine, "a {{broken}} b {{title}}", json!({"title": "T"}));
    assert_eq!(out, "a [Helper Error: broken] b T");
}

#[test]
fn test_panicking_helper_is_contained() {
    let engine = RenderEngine::new();
    engine.register_helper("explode", |_: &mut HelperCall<'_>| -> HelperResult {
        panic!("helper exploded")
    });
    let out = render(&engine, "{{explode}}|{{upper}}", json!({"upper": "ok"}));
    assert_eq!(out, "[Helper Error: explode]|ok");
}

#[test]
fn test_failure_in_subexpression_degrades_to_marker() {
    let engine = RenderEngine::new();
    engine.register_helper("broken", |_: &mut HelperCall<'_>| -> HelperResult {
        Err(HelperError::invalid("nope"))
    });
    let out = render(&engine, "{{uppercase (broken 1)}}", json!({}));
    assert_eq!(out, "[HELPER ERROR: BROKEN]");
}

#[test]
fn test_unknown_helper_with_arguments() {
    let engine = RenderEngine::new();
    let out = render(&engine, "x {{doesNotExist 1 2}} y", json!({}));
    assert_eq!(out, "x [Helper Error: doesNotExist] y");
}

#[test]
fn test_safe_string_skips_escaping() {
    let engine = RenderEngine::new();
    engine.register_helper("bold", |call: &mut HelperCall<'_>| -> HelperResult {
        let text = call.arg_str(0).unwrap_or_default();
        Ok(HelperOutput::from(SafeString::new(format!("<b>{}</b>", text))))
    });
    engine.register_helper("plain", |call: &mut HelperCall<'_>| -> HelperResult {
        let text = call.arg_str(0).unwrap_or_default();
        Ok(HelperOutput::from(format!("<b>{}</b>", text)))
    });
    assert_eq!(render(&engine, "{{bold \"x\"}}", json!({})), "<b>x</b>");
    assert_eq!(render(&engine, "{{plain \"x\"}}", json!({})), "&lt;b&gt;x&lt;/b&gt;");
}

#[test]
fn test_block_helper_receives_callbacks() {
    let engine = RenderEngine::new();
    engine.register_block_helper("twice", |call: &mut HelperCall<'_>| -> HelperResult {
        if !call.is_block() {
            return Ok(HelperOutput::from("inline"));
        }
        let body = call.render()?;
        Ok(HelperOutput::safe(format!("{}{}", body, body)))
    });
    assert_eq!(render(&engine, "{{#twice}}ab{{/twice}}", json!({})), "abab");
    assert_eq!(render(&engine, "{{twice}}", json!({})), "inline");
}

#[test]
fn test_block_helper_derived_scope_and_locals() {
    let engine = RenderEngine::new();
    engine.register_block_helper("pairs", |call: &mut HelperCall<'_>| -> HelperResult {
        let mut out = String::new();
        if let Some(map) = call.arg(0).as_object().cloned() {
            for (key, value) in map {
                let scope = json!({ "key": key, "value": value });
                out.push_str(&call.render_with(&scope, &[("marker", json!("*"))])?);
            }
        }
        Ok(HelperOutput::safe(out))
    });
    let out = render(
        &engine,
        "{{#pairs obj}}{{@marker}}{{this.key}}={{this.value}};{{/pairs}}",
        json!({"obj": {"a": 1, "b": 2}}),
    );
    assert_eq!(out, "*a=1;*b=2;");
}

#[test]
fn test_inline_helper_in_block_form_acts_like_with() {
    let engine = RenderEngine::new();
    engine.register_helper("lookupUser", |call: &mut HelperCall<'_>| -> HelperResult {
        Ok(HelperOutput::from(call.root()["users"][0].clone()))
    });
    let data = json!({"users": [{"name": "Kim"}]});
    assert_eq!(
        render(&engine, "{{#lookupUser}}Hi {{name}}{{else}}nobody{{/lookupUser}}", data),
        "Hi Kim"
    );
    assert_eq!(
        render(&engine, "{{#lookupUser}}Hi {{name}}{{else}}nobody{{/lookupUser}}", json!({})),
        "nobody"
    );
}

#[test]
fn test_block_depth_is_bounded() {
    let engine = RenderEngine::with_config(RenderConfig {
        max_block_depth: 2,
        ..RenderConfig::default()
    });
    engine
        .register_partial("node", "{{name}}({{#children}}{{> node}}{{/children}})")
        .unwrap();
    let tree = json!({
        "name": "a",
        "children": [{"name": "b", "children": [{"name": "c", "children": [{"name": "d"}]}]}]
    });
    let out = render(&engine, "{{> node}}", tree);
    assert_eq!(out, "a(b(c([Helper Error: children])))");
}

#[test]
fn test_helper_sees_hash_and_scope_separately() {
    let engine = RenderEngine::new();
    engine.register_helper("describe", |call: &mut HelperCall<'_>| -> HelperResult {
        Ok(HelperOutput::from(format!(
            "args:{} sep:{} this:{}",
            call.args().len(),
            call.hash_str("sep").unwrap_or_default(),
            call.this()["id"]
        )))
    });
    let out = render(
        &engine,
        "{{#each items}}{{describe 1 2 sep=\"|\"}};{{/each}}",
        json!({"items": [{"id": 7}]}),
    );
    assert_eq!(out, "args:2 sep:| this:7;");
}
