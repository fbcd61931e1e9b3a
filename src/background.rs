/// Service-worker side: settings lookups, context menu, keyboard command

use log::{error, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

use crate::chrome;
use crate::messaging::{
    ApiKeyAndLanguage, CONTEXT_MENU_ID, CONTEXT_MENU_TITLE, INSTRUCTIONS_PAGE, ModelReply,
    Request, TOGGLE_COMMAND, create_popup_request, is_restricted_url,
};

pub fn start() {
    register_message_handler();
    register_install_hook();
    register_context_menu_handler();
    register_command_handler();
    info!("Background worker ready");
}

fn current_hour() -> u32 {
    js_sys::Date::new_0().get_hours()
}

fn register_message_handler() {
    let handler = Closure::wrap(Box::new(move |raw: JsValue| -> JsValue {
        let request: Request = match serde_wasm_bindgen::from_value(raw) {
            Ok(request) => request,
            Err(e) => {
                warn!("Ignoring unknown message: {:?}", e);
                return JsValue::UNDEFINED;
            }
        };

        match request {
            // Meant for content scripts
            Request::CreatePopup { .. } | Request::GetSelectedText => JsValue::UNDEFINED,
            request => future_to_promise(async move {
                respond(request).await.map_err(|e| {
                    error!("{}", e);
                    JsValue::from_str(&e)
                })
            })
            .into(),
        }
    }) as Box<dyn FnMut(JsValue) -> JsValue>);

    chrome::onRuntimeMessage(handler.as_ref().unchecked_ref());
    handler.forget();
}

async fn respond(request: Request) -> Result<JsValue, String> {
    match request {
        Request::GetApiKeyAndLanguage => {
            let settings = chrome::load_settings().await?;
            chrome::to_js(&ApiKeyAndLanguage::from(&settings))
        }
        Request::GetModel => {
            let settings = chrome::load_settings().await?;
            chrome::to_js(&ModelReply {
                model: settings.model,
            })
        }
        Request::OpenPopup => {
            chrome::open_options_page().await?;
            Ok(JsValue::TRUE)
        }
        Request::CreatePopup { .. } | Request::GetSelectedText => Ok(JsValue::UNDEFINED),
    }
}

fn register_install_hook() {
    let callback = Closure::wrap(Box::new(move |reason: String| {
        chrome::createContextMenu(CONTEXT_MENU_ID, CONTEXT_MENU_TITLE);

        if reason == "install" {
            let url = chrome::runtimeUrl(INSTRUCTIONS_PAGE);
            spawn_local(async move {
                if let Err(e) = chrome::open_tab(&url).await {
                    error!("{}", e);
                }
            });
        }
    }) as Box<dyn FnMut(String)>);

    chrome::onInstalled(callback.as_ref().unchecked_ref());
    callback.forget();
}

fn register_context_menu_handler() {
    let callback = Closure::wrap(Box::new(
        move |menu_item_id: String, selection: Option<String>, tab_id: i32| {
            if menu_item_id != CONTEXT_MENU_ID || tab_id < 0 {
                return;
            }
            let request = create_popup_request(selection, current_hour());
            spawn_local(async move {
                if let Err(e) = chrome::send_tab_message(tab_id, &request).await {
                    error!("{}", e);
                }
            });
        },
    ) as Box<dyn FnMut(String, Option<String>, i32)>);

    chrome::onContextMenuClicked(callback.as_ref().unchecked_ref());
    callback.forget();
}

fn register_command_handler() {
    let callback = Closure::wrap(Box::new(move |command: String| {
        if command != TOGGLE_COMMAND {
            return;
        }
        spawn_local(async {
            if let Err(e) = toggle_popup().await {
                error!("{}", e);
            }
        });
    }) as Box<dyn FnMut(String)>);

    chrome::onCommand(callback.as_ref().unchecked_ref());
    callback.forget();
}

async fn toggle_popup() -> Result<(), String> {
    let Some(tab) = chrome::active_tab().await? else {
        return Ok(());
    };
    if is_restricted_url(&tab.url) {
        info!("Skipping restricted tab {}", tab.url);
        return Ok(());
    }

    let selection = chrome::tab_selection(tab.id).await;
    let request = create_popup_request(Some(selection), current_hour());
    chrome::send_tab_message(tab.id, &request).await
}
