/// Question box at the bottom of the popup

use log::error;
use wasm_bindgen::prelude::*;
use web_sys::{CompositionEvent, HtmlTextAreaElement};
use yew::prelude::*;

const MIN_HEIGHT_PX: i32 = 44;
const MAX_HEIGHT_PX: i32 = 120;

#[derive(Properties, PartialEq)]
pub struct InputBoxProps {
    pub generating: bool,
    pub on_send: Callback<String>,
    pub on_stop: Callback<()>,
}

fn set_height(textarea: &HtmlTextAreaElement, px: i32) {
    set_height_value(textarea, &format!("{}px", px));
}

fn set_height_value(textarea: &HtmlTextAreaElement, value: &str) {
    if let Err(e) = textarea.style().set_property("height", value) {
        error!("Failed to set textarea height: {:?}", e);
    }
}

/// Grow with the content between the min and max height
fn fit_height(textarea: &HtmlTextAreaElement) {
    if textarea.value().trim().is_empty() {
        set_height(textarea, MIN_HEIGHT_PX);
        return;
    }
    set_height_value(textarea, "auto");
    set_height(textarea, textarea.scroll_height().clamp(MIN_HEIGHT_PX, MAX_HEIGHT_PX));
}

#[function_component(InputBox)]
pub fn input_box(props: &InputBoxProps) -> Html {
    let value = use_state(String::new);
    let composing = use_mut_ref(|| false);
    let textarea_ref = use_node_ref();

    let send = {
        let value = value.clone();
        let textarea_ref = textarea_ref.clone();
        let on_send = props.on_send.clone();
        let generating = props.generating;

        move || {
            let question = value.trim().to_string();
            if generating || question.is_empty() {
                return;
            }
            on_send.emit(question);
            value.set(String::new());
            if let Some(textarea) = textarea_ref.cast::<HtmlTextAreaElement>() {
                textarea.set_value("");
                set_height(&textarea, MIN_HEIGHT_PX);
            }
        }
    };

    let on_input = {
        let value = value.clone();
        let composing = composing.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(textarea) = e.target_dyn_into::<HtmlTextAreaElement>() {
                value.set(textarea.value());
                if !*composing.borrow() {
                    fit_height(&textarea);
                }
            }
        })
    };

    let on_keydown = {
        let composing = composing.clone();
        let send = send.clone();
        Callback::from(move |e: KeyboardEvent| {
            if e.key() != "Enter" || e.shift_key() {
                return;
            }
            // Enter confirms an IME candidate; it must not send
            if *composing.borrow() || e.is_composing() {
                return;
            }
            e.prevent_default();
            send();
        })
    };

    // Track IME composition on the textarea itself
    {
        let composing = composing.clone();
        let textarea_ref = textarea_ref.clone();
        use_effect_with((), move |_| {
            let textarea = textarea_ref.cast::<HtmlTextAreaElement>();

            let on_start = {
                let composing = composing.clone();
                Closure::wrap(Box::new(move |_: CompositionEvent| {
                    *composing.borrow_mut() = true;
                }) as Box<dyn FnMut(CompositionEvent)>)
            };
            let on_end = Closure::wrap(Box::new(move |e: CompositionEvent| {
                *composing.borrow_mut() = false;
                if let Some(textarea) = e.target_dyn_into::<HtmlTextAreaElement>() {
                    fit_height(&textarea);
                }
            }) as Box<dyn FnMut(CompositionEvent)>);

            let listeners = [("compositionstart", on_start), ("compositionend", on_end)];
            if let Some(textarea) = &textarea {
                for (event, listener) in &listeners {
                    if let Err(e) = textarea.add_event_listener_with_callback(event, listener.as_ref().unchecked_ref()) {
                        error!("Failed to listen for {}: {:?}", event, e);
                    }
                }
            }

            move || {
                if let Some(textarea) = &textarea {
                    for (event, listener) in &listeners {
                        if let Err(e) = textarea.remove_event_listener_with_callback(event, listener.as_ref().unchecked_ref()) {
                            error!("Failed to remove {} listener: {:?}", event, e);
                        }
                    }
                }
            }
        });
    }

    let on_send_click = Callback::from(move |_: MouseEvent| send());

    let on_stop_click = {
        let on_stop = props.on_stop.clone();
        Callback::from(move |_: MouseEvent| on_stop.emit(()))
    };

    let placeholder = if props.generating {
        "Answering..."
    } else {
        "Ask a follow-up question..."
    };

    html! {
        <div class="input-container-wrapper">
            <div class="input-container">
                <textarea
                    ref={textarea_ref}
                    class={classes!("expandable-textarea", (!value.trim().is_empty()).then_some("has-content"))}
                    placeholder={placeholder}
                    disabled={props.generating}
                    value={(*value).clone()}
                    oninput={on_input}
                    onkeydown={on_keydown}
                    style={format!("height: {}px; min-height: {}px; max-height: {}px;", MIN_HEIGHT_PX, MIN_HEIGHT_PX, MAX_HEIGHT_PX)}
                />
                if props.generating {
                    <button class="stop-button" title="Stop generating" onclick={on_stop_click}>
                        <svg class="loading-icon active" viewBox="0 0 24 24" fill="none">
                            <rect x="7" y="7" width="10" height="10" rx="1" stroke="currentColor" stroke-width="2" />
                        </svg>
                    </button>
                } else {
                    <button class="send-button" title="Send" onclick={on_send_click}>
                        <svg class="send-icon" viewBox="0 0 24 24" fill="none">
                            <path d="M22 2L11 13" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" />
                            <path d="M22 2L15 22L11 13L2 9L22 2Z" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" />
                        </svg>
                    </button>
                }
            </div>
        </div>
    }
}
