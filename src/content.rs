/// Page-side integration: selection icon, popup mounting, message listener

use std::cell::RefCell;

use log::{debug, error, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, HtmlElement, MouseEvent, Window};
use yew::{AppHandle, Callback};

use crate::chrome;
use crate::layout::{Rect, Viewport, centered_anchor, initial_position};
use crate::messaging::{Request, SelectedTextReply};
use crate::popup_state::PopupGuard;
use crate::ui::popup::{ChatPopup, ChatPopupProps};

const ICON_PATH: &str = "icons/icon24.png";
const ICON_OFFSET_X: f64 = 5.0;
const ICON_OFFSET_Y: f64 = -25.0;

struct MountedPopup {
    handle: AppHandle<ChatPopup>,
    host: Element,
}

struct ContentState {
    guard: PopupGuard,
    selection_enabled: bool,
    icon: Option<Element>,
    popup: Option<MountedPopup>,
}

thread_local! {
    static STATE: RefCell<ContentState> = RefCell::new(ContentState {
        guard: PopupGuard::new(),
        selection_enabled: true,
        icon: None,
        popup: None,
    });
}

fn with_state<R>(f: impl FnOnce(&mut ContentState) -> R) -> R {
    STATE.with(|state| f(&mut state.borrow_mut()))
}

fn now() -> f64 {
    js_sys::Date::now()
}

fn window() -> Result<Window, String> {
    web_sys::window().ok_or_else(|| "No window".to_string())
}

fn document() -> Result<Document, String> {
    window()?.document().ok_or_else(|| "No document".to_string())
}

pub fn start() {
    load_selection_setting();
    register_storage_listener();
    register_message_handler();

    if let Err(e) = register_page_listeners() {
        error!("Failed to attach page listeners: {}", e);
        return;
    }
    info!("Content script ready");
}

fn load_selection_setting() {
    spawn_local(async {
        match chrome::load_settings().await {
            Ok(settings) => with_state(|state| state.selection_enabled = settings.selection_enabled),
            Err(e) => warn!("Using default selection setting: {}", e),
        }
    });
}

fn register_storage_listener() {
    let callback = Closure::wrap(Box::new(move |changes: JsValue| {
        let enabled = js_sys::Reflect::get(&changes, &JsValue::from_str("selectionEnabled"))
            .ok()
            .and_then(|value| value.as_bool());
        if let Some(enabled) = enabled {
            debug!("selectionEnabled -> {}", enabled);
            with_state(|state| state.selection_enabled = enabled);
            if !enabled {
                remove_icon();
            }
        }
    }) as Box<dyn FnMut(JsValue)>);

    chrome::onStorageChanged(callback.as_ref().unchecked_ref());
    callback.forget();
}

fn register_message_handler() {
    let handler = Closure::wrap(Box::new(move |raw: JsValue| -> JsValue {
        let Ok(request) = chrome::from_js::<Request>(raw) else {
            return JsValue::UNDEFINED;
        };

        match request {
            Request::CreatePopup {
                selected_text,
                message,
            } => {
                on_create_popup(selected_text, message);
                JsValue::UNDEFINED
            }
            Request::GetSelectedText => {
                let reply = SelectedTextReply {
                    selected_text: current_selection().map(|(text, _)| text).unwrap_or_default(),
                };
                chrome::to_js(&reply).unwrap_or(JsValue::UNDEFINED)
            }
            _ => JsValue::UNDEFINED,
        }
    }) as Box<dyn FnMut(JsValue) -> JsValue>);

    chrome::onRuntimeMessage(handler.as_ref().unchecked_ref());
    handler.forget();
}

/// Trimmed selection text and its client rect, if anything is selected
fn current_selection() -> Option<(String, Rect)> {
    let selection = window().ok()?.get_selection().ok()??;
    if selection.range_count() == 0 {
        return None;
    }
    let text = String::from(selection.to_string()).trim().to_string();
    let bounds = selection.get_range_at(0).ok()?.get_bounding_client_rect();
    Some((
        text,
        Rect {
            left: bounds.left(),
            top: bounds.top(),
            width: bounds.width(),
            height: bounds.height(),
        },
    ))
}

fn clear_selection() {
    if let Ok(Some(selection)) = window().and_then(|w| w.get_selection().map_err(|e| format!("{:?}", e))) {
        if let Err(e) = selection.remove_all_ranges() {
            warn!("Failed to clear selection: {:?}", e);
        }
    }
}

fn viewport() -> Result<Viewport, String> {
    let window = window()?;
    let dimension = |value: Result<JsValue, JsValue>| value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    Ok(Viewport {
        width: dimension(window.inner_width()),
        height: dimension(window.inner_height()),
        scroll_x: window.scroll_x().unwrap_or(0.0),
        scroll_y: window.scroll_y().unwrap_or(0.0),
    })
}

/// Prefer the live selection, then the text sent along, then the greeting
fn on_create_popup(selected_text: Option<String>, message: String) {
    let live = current_selection().filter(|(text, _)| !text.is_empty());
    let sent = selected_text.filter(|text| !text.trim().is_empty());

    let result = viewport().and_then(|viewport| match (live, sent) {
        (Some((text, rect)), _) => open_popup(text, rect, true, &viewport),
        (None, Some(text)) => {
            let rect = current_selection().map(|(_, rect)| rect).unwrap_or_else(|| centered_anchor(&viewport));
            open_popup(text, rect, true, &viewport)
        }
        (None, None) => open_popup(message, centered_anchor(&viewport), false, &viewport),
    });

    if let Err(e) = result {
        error!("Failed to open popup: {}", e);
    }
}

fn open_popup(text: String, anchor: Rect, show_question: bool, viewport: &Viewport) -> Result<(), String> {
    if !with_state(|state| state.guard.try_begin_create(now())) {
        debug!("Popup creation already in progress");
        return Ok(());
    }

    close_popup();

    let document = document()?;
    let body = document.body().ok_or_else(|| "No body".to_string())?;
    let host = document
        .create_element("div")
        .map_err(|e| format!("Failed to create popup host: {:?}", e))?;
    host.set_class_name("ai-popup-host");
    body.append_child(&host)
        .map_err(|e| format!("Failed to attach popup: {:?}", e))?;

    let props = ChatPopupProps {
        initial_text: text,
        show_question,
        position: initial_position(&anchor, viewport),
        on_close: Callback::from(|_: ()| {
            // Unmount after the click that triggered it has finished
            spawn_local(async { close_popup() });
        }),
    };
    let handle = yew::Renderer::<ChatPopup>::with_root_and_props(host.clone(), props).render();

    with_state(|state| {
        state.popup = Some(MountedPopup { handle, host });
        state.guard.set_visible(true);
    });
    Ok(())
}

fn close_popup() {
    let Some(popup) = with_state(|state| {
        state.guard.set_visible(false);
        state.popup.take()
    }) else {
        return;
    };
    popup.handle.destroy();
    popup.host.remove();
}

fn remove_icon() {
    if let Some(icon) = with_state(|state| state.icon.take()) {
        icon.remove();
    }
}

fn show_icon(x: f64, y: f64, text: String, anchor: Rect) -> Result<(), String> {
    let document = document()?;
    let body = document.body().ok_or_else(|| "No body".to_string())?;
    let icon: HtmlElement = document
        .create_element("img")
        .map_err(|e| format!("Failed to create icon: {:?}", e))?
        .dyn_into()
        .map_err(|e| format!("Icon is not an element: {:?}", e))?;

    icon.set_class_name("ai-selection-icon");
    icon.set_attribute("src", &chrome::runtimeUrl(ICON_PATH))
        .map_err(|e| format!("Failed to set icon source: {:?}", e))?;
    icon.set_attribute(
        "style",
        &format!(
            "position: fixed; left: {}px; top: {}px; width: 30px; height: 30px; \
             padding: 4px; cursor: pointer; z-index: 2147483646; user-select: none;",
            x, y
        ),
    )
    .map_err(|e| format!("Failed to style icon: {:?}", e))?;

    let on_mousedown = Closure::wrap(Box::new(move |e: MouseEvent| {
        e.stop_propagation();
        e.prevent_default();

        with_state(|state| state.guard.begin_icon_click(now()));
        remove_icon();
        clear_selection();

        let result = viewport().and_then(|viewport| open_popup(text.clone(), anchor, true, &viewport));
        if let Err(e) = result {
            error!("Failed to open popup: {}", e);
        }
    }) as Box<dyn FnMut(MouseEvent)>);
    icon.set_onmousedown(Some(on_mousedown.as_ref().unchecked_ref()));
    on_mousedown.forget();

    body.append_child(&icon)
        .map_err(|e| format!("Failed to attach icon: {:?}", e))?;
    with_state(|state| state.icon = Some(icon.into()));
    Ok(())
}

fn inside_popup(target: Option<web_sys::EventTarget>) -> bool {
    target
        .and_then(|t| t.dyn_into::<Element>().ok())
        .and_then(|el| el.closest(".ai-popup-host").ok().flatten())
        .is_some()
}

fn register_page_listeners() -> Result<(), String> {
    let document = document()?;

    let on_mouseup = Closure::wrap(Box::new(move |e: MouseEvent| {
        let ready = with_state(|state| state.selection_enabled && state.guard.accepts_selection(now()));
        if !ready || e.button() != 0 || inside_popup(e.target()) {
            return;
        }
        let Some((text, anchor)) = current_selection().filter(|(text, _)| !text.is_empty()) else {
            return;
        };

        remove_icon();
        let x = e.client_x() as f64 + ICON_OFFSET_X;
        let y = e.client_y() as f64 + ICON_OFFSET_Y;
        if let Err(e) = show_icon(x, y, text, anchor) {
            error!("{}", e);
        }
    }) as Box<dyn FnMut(MouseEvent)>);

    let on_mousedown = Closure::wrap(Box::new(move |e: MouseEvent| {
        if with_state(|state| state.guard.handling_icon_click(now())) {
            return;
        }
        let icon = with_state(|state| state.icon.clone());
        let Some(icon) = icon else {
            return;
        };
        let on_icon = e
            .target()
            .and_then(|t| t.dyn_into::<web_sys::Node>().ok())
            .map(|node| icon.contains(Some(&node)))
            .unwrap_or(false);
        if !on_icon {
            remove_icon();
            if e.button() == 0 {
                clear_selection();
            }
        }
    }) as Box<dyn FnMut(MouseEvent)>);

    // Code blocks are rendered as raw HTML, so their copy buttons are delegated
    let on_click = Closure::wrap(Box::new(move |e: MouseEvent| {
        let button = e
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .and_then(|el| el.closest(".copy-button").ok().flatten());
        let Some(button) = button else {
            return;
        };
        let Some(code) = button.get_attribute("data-code") else {
            return;
        };
        e.prevent_default();
        spawn_local(async move {
            match chrome::copy_to_clipboard(&code).await {
                Ok(()) => {
                    if let Err(e) = button.class_list().add_1("copied") {
                        warn!("Failed to mark code as copied: {:?}", e);
                    }
                }
                Err(e) => error!("{}", e),
            }
        });
    }) as Box<dyn FnMut(MouseEvent)>);

    let listeners: [(&str, &Closure<dyn FnMut(MouseEvent)>); 3] = [
        ("mouseup", &on_mouseup),
        ("mousedown", &on_mousedown),
        ("click", &on_click),
    ];
    for (event, listener) in listeners {
        document
            .add_event_listener_with_callback(event, listener.as_ref().unchecked_ref())
            .map_err(|e| format!("Failed to listen for {}: {:?}", event, e))?;
    }

    on_mouseup.forget();
    on_mousedown.forget();
    on_click.forget();
    Ok(())
}
