//! Popup components in a live DOM; run with `wasm-pack test --headless --chrome`

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use deepseek_popup::session::{Answer, AnswerStatus, Turn};
use deepseek_popup::ui::answer::{TurnView, TurnViewProps};
use deepseek_popup::ui::input::{InputBox, InputBoxProps};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{CompositionEvent, Element, HtmlTextAreaElement, InputEvent, KeyboardEvent, KeyboardEventInit};
use yew::Callback;
use yew::platform::time::sleep;

wasm_bindgen_test_configure!(run_in_browser);

fn mount_host() -> Element {
    let document = web_sys::window().unwrap().document().unwrap();
    let host = document.create_element("div").unwrap();
    document.body().unwrap().append_child(&host).unwrap();
    host
}

async fn settle() {
    sleep(Duration::from_millis(20)).await;
}

fn press_enter(textarea: &HtmlTextAreaElement) {
    let init = KeyboardEventInit::new();
    init.set_key("Enter");
    init.set_bubbles(true);
    let event = KeyboardEvent::new_with_keyboard_event_init_dict("keydown", &init).unwrap();
    textarea.dispatch_event(&event).unwrap();
}

#[wasm_bindgen_test]
async fn enter_while_composing_does_not_send() {
    let host = mount_host();

    let sent = Rc::new(RefCell::new(Vec::<String>::new()));
    let props = InputBoxProps {
        generating: false,
        on_send: {
            let sent = sent.clone();
            Callback::from(move |question: String| sent.borrow_mut().push(question))
        },
        on_stop: Callback::noop(),
    };
    let handle = yew::Renderer::<InputBox>::with_root_and_props(host.clone(), props).render();
    settle().await;

    let textarea: HtmlTextAreaElement = host.query_selector("textarea").unwrap().unwrap().dyn_into().unwrap();
    textarea.set_value("hello");
    textarea.dispatch_event(&InputEvent::new("input").unwrap()).unwrap();
    settle().await;

    textarea
        .dispatch_event(&CompositionEvent::new("compositionstart").unwrap())
        .unwrap();
    press_enter(&textarea);
    settle().await;
    assert!(sent.borrow().is_empty());

    textarea
        .dispatch_event(&CompositionEvent::new("compositionend").unwrap())
        .unwrap();
    press_enter(&textarea);
    settle().await;
    assert_eq!(*sent.borrow(), vec!["hello".to_string()]);

    handle.destroy();
    host.remove();
}

#[wasm_bindgen_test]
async fn stopped_answer_offers_regenerate_once_idle() {
    let host = mount_host();
    let turn = Turn {
        id: uuid::Uuid::new_v4(),
        question: Some("What is Rust?".to_string()),
        answer: Answer {
            content: "A systems".to_string(),
            reasoning: String::new(),
            status: AnswerStatus::Cancelled,
        },
    };
    let props = |generating| TurnViewProps {
        turn: turn.clone(),
        is_last: true,
        generating,
        on_regenerate: Callback::noop(),
    };

    let handle = yew::Renderer::<TurnView>::with_root_and_props(host.clone(), props(true)).render();
    settle().await;

    let notice = host.query_selector(".notice").unwrap().unwrap();
    assert_eq!(notice.text_content().unwrap(), "Generation stopped.");

    let regenerate = host.query_selector("button[title='Regenerate']").unwrap().unwrap();
    assert!(regenerate.has_attribute("disabled"));
    assert!(regenerate.class_list().contains("disabled"));
    handle.destroy();

    let handle = yew::Renderer::<TurnView>::with_root_and_props(host.clone(), props(false)).render();
    settle().await;
    let regenerate = host.query_selector("button[title='Regenerate']").unwrap().unwrap();
    assert!(!regenerate.has_attribute("disabled"));

    handle.destroy();
    host.remove();
}
