use serde_json::{json, Value};
use xrender::{CompileOptions, RenderContext, RenderEngine};

fn render(source: &str, data: Value) -> String {
    RenderEngine::new().render(source, &RenderContext::new(data), &CompileOptions::raw())
}

#[test]
fn test_acf_field_access() {
    assert_eq!(render("{{acf \"price\"}}", json!({"price": 25000})), "25000");
    assert_eq!(render("{{acf \"missing\" \"default\"}}", json!({})), "default");
    assert_eq!(
        render(
            "{{#each products}}{{acf \"name\"}}@{{acf \"site\"}};{{/each}}",
            json!({"site": "shop", "products": [{"name": "a"}, {"name": "b"}]})
        ),
        "a@shop;b@shop;"
    );
}

#[test]
fn test_acf_repeater_block_with_index() {
    let out = render(
        "{{#acfRepeater \"rows\"}}{{@index}}:{{label}}{{#unless @last}},{{/unless}}{{else}}none{{/acfRepeater}}",
        json!({"rows": [{"label": "x"}, {"label": "y"}]}),
    );
    assert_eq!(out, "0:x,1:y");
    assert_eq!(
        render("{{#acfRepeater \"rows\"}}row{{else}}none{{/acfRepeater}}", json!({})),
        "none"
    );
}

#[test]
fn test_relation_helpers() {
    let post = json!({
        "title": "Hello",
        "post_author": {"name": "Kim"},
        "tags": [{"name": "rust"}, {"name": "web"}],
        "comments": []
    });
    assert_eq!(render("{{author}}", post.clone()), "Kim");
    assert_eq!(render("{{#author}}by {{name}}{{/author}}", post.clone()), "by Kim");
    assert_eq!(render("{{tags}}", post.clone()), "rust, web");
    assert_eq!(render("{{tags count=true}}", post.clone()), "2");
    assert_eq!(
        render("{{#tags limit=1}}#{{name}}{{/tags}}", post.clone()),
        "#rust"
    );
    assert_eq!(
        render("{{#comments}}c{{else}}no comments{{/comments}}", post),
        "no comments"
    );
}

#[test]
fn test_media_helpers() {
    let data = json!({"hero": 42, "photos": [{"url": "/a.jpg", "alt": "A"}]});
    let engine = RenderEngine::new();
    let ctx = RenderContext::new(data.clone())
        .with_settings(json!({"mediaBaseUrl": "https://cdn.example.com"}));
    assert_eq!(
        engine.render("{{media hero size=\"small\"}}", &ctx, &CompileOptions::raw()),
        "https://cdn.example.com/42?size=small"
    );
    assert_eq!(render("{{media hero}}", data.clone()), "/media/42");
    assert_eq!(
        render("{{#gallery photos}}[{{url}}|{{alt}}]{{/gallery}}", data.clone()),
        "[/a.jpg|A]"
    );
    assert_eq!(
        render("{{#hasMedia \"thumbnail\"}}yes{{else}}no{{/hasMedia}}", data),
        "no"
    );
}

#[test]
fn test_format_helpers() {
    assert_eq!(render("{{formatCurrency 25000}}", json!({})), "₩25,000");
    assert_eq!(render("{{formatNumber 1234.5 2}}", json!({})), "1,234.50");
    assert_eq!(render("{{pluralize 1 \"item\"}}", json!({})), "item");
    assert_eq!(render("{{pluralize 2 \"item\"}}", json!({})), "items");
    assert_eq!(render("{{pluralize 5 \"box\" \"boxes\"}}", json!({})), "boxes");
    assert_eq!(
        render("{{excerpt body 10}}", json!({"body": "<p>Hello brave new world</p>"})),
        "Hello..."
    );
    assert_eq!(render("{{formatDate d \"DD/MM/YYYY\"}}", json!({"d": "2024-12-25"})), "25/12/2024");
    assert_eq!(render("{{fileSize 1536}}", json!({})), "1.5 KB");
    assert_eq!(render("{{percent 3 total=4}}", json!({})), "75%");
}

#[test]
fn test_conditional_helpers_inline_and_block() {
    assert_eq!(render("{{#eq status \"open\"}}Open{{else}}Closed{{/eq}}", json!({"status": "open"})), "Open");
    assert_eq!(render("{{#gt stock 0}}in stock{{else}}sold out{{/gt}}", json!({"stock": 0})), "sold out");
    assert_eq!(render("{{#if (and a (not b))}}ok{{/if}}", json!({"a": 1, "b": false})), "ok");
    assert_eq!(render("{{eq 1 \"1\"}}", json!({})), "true");
    assert_eq!(render("{{typeOf items}}", json!({"items": []})), "array");
}

#[test]
fn test_collection_helpers() {
    let data = json!({"posts": [
        {"title": "A", "category": "news"},
        {"title": "B", "category": "tech"},
        {"title": "C", "category": "news"}
    ]});
    assert_eq!(
        render(
            "{{#groupBy posts \"category\"}}{{key}}={{this.count}};{{/groupBy}}",
            data.clone()
        ),
        "news=2;tech=1;"
    );
    assert_eq!(
        render(
            "{{#groupBy posts \"category\"}}{{key}}:{{@count}};{{/groupBy}}",
            data.clone()
        ),
        "news:2;tech:1;"
    );
    assert_eq!(
        render("{{#chunk (range 1 5) 2}}[{{join this \"\"}}]{{/chunk}}", json!({})),
        "[12][34][5]"
    );
    assert_eq!(render("{{join (pluck posts \"title\") \"-\"}}", data.clone()), "A-B-C");
    assert_eq!(render("{{#first posts}}{{title}}{{/first}}", data.clone()), "A");
    assert_eq!(
        render("{{#each (sort posts \"title\" \"desc\")}}{{title}}{{/each}}", data),
        "CBA"
    );
}

#[test]
fn test_math_helpers() {
    let products = json!({"products": [{"price": 100}, {"price": 150}, {"price": 200}]});
    assert_eq!(render("{{sum \"price\" products}}", products.clone()), "450");
    assert_eq!(render("{{avg \"price\" products}}", products), "150");
    assert_eq!(render("{{math \"a + b * 2\"}}", json!({"a": 10, "b": 20})), "50");
    assert_eq!(render("{{math \"x * 3\" x=4}}", json!({})), "12");
    assert_eq!(render("{{divide 10 0}}", json!({})), "0");
    assert_eq!(
        render("{{#range 5 1 -1}}{{this}}{{/range}}", json!({})),
        "54321"
    );
    assert_eq!(render("{{formatCurrency (multiply 2 12500)}}", json!({})), "₩25,000");
}

#[test]
fn test_math_rejects_code() {
    assert_eq!(
        render("{{math \"a; this.constructor\"}}", json!({"a": 1})),
        "[Invalid Expression]"
    );
    assert_eq!(render("{{math \"1 / 0\"}}", json!({})), "0");
}

#[test]
fn test_sort_mixed_numbers_and_text() {
    let items: Vec<serde_json::Value> = (0..24)
        .map(|i| match i % 3 {
            0 => json!(i),
            1 => json!(i.to_string()),
            _ => json!(format!("N{}", (b'a' + i as u8) as char)),
        })
        .collect();
    let numbers: Vec<String> = (0..24)
        .filter(|i| i % 3 != 2)
        .map(|i| i.to_string())
        .collect();
    let words: Vec<String> = (0..24)
        .filter(|i| i % 3 == 2)
        .map(|i| format!("N{}", (b'a' + i as u8) as char))
        .collect();
    let expected = format!("{},{},", numbers.join(","), words.join(","));

    let data = json!({ "items": items });
    assert_eq!(
        render("{{#each (sort items)}}{{this}},{{/each}}", data.clone()),
        expected
    );
    assert!(!render("{{sort items}}", data).contains("Helper Error"));
}
