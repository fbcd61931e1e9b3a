//! Browser tests; run with `wasm-pack test --headless --chrome`

use deepseek_popup::markdown::render_markdown;
use deepseek_popup::theme::page_is_dark;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> web_sys::Document {
    web_sys::window().unwrap().document().unwrap()
}

#[wasm_bindgen_test]
fn page_background_drives_dark_mode() {
    let body = document().body().unwrap();

    body.style().set_property("background-color", "rgb(24, 24, 27)").unwrap();
    assert!(page_is_dark());

    body.style().set_property("background-color", "rgb(250, 250, 250)").unwrap();
    assert!(!page_is_dark());

    body.style().remove_property("background-color").unwrap();
}

#[wasm_bindgen_test]
fn transparent_body_falls_back_to_root() {
    let document = document();
    let root: web_sys::HtmlElement = wasm_bindgen::JsCast::dyn_into(document.document_element().unwrap()).unwrap();
    let body = document.body().unwrap();

    body.style().set_property("background-color", "transparent").unwrap();
    root.style().set_property("background-color", "rgb(10, 10, 10)").unwrap();
    assert!(page_is_dark());

    root.style().remove_property("background-color").unwrap();
    body.style().remove_property("background-color").unwrap();
}

#[wasm_bindgen_test]
fn copy_button_carries_raw_code() {
    let html = render_markdown("```rust\nlet a = \"<b>\";\n```");
    let host = document().create_element("div").unwrap();
    host.set_inner_html(&html);

    let button = host.query_selector(".copy-button").unwrap().unwrap();
    assert_eq!(button.get_attribute("data-code").unwrap(), "let a = \"<b>\";");
    assert!(host.query_selector("code.language-rust").unwrap().is_some());
}

#[wasm_bindgen_test]
fn model_html_is_not_injected() {
    let host = document().create_element("div").unwrap();
    host.set_inner_html(&render_markdown("hello <script>alert(1)</script>"));
    assert!(host.query_selector("script").unwrap().is_none());
}
