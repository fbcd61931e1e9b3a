/// Typed access to the extension host APIs through the JS bridge
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

use crate::messaging::{ApiKeyAndLanguage, ModelReply, Request};
use crate::settings::{STORAGE_KEYS, Settings};

// Import JS bridge functions
#[wasm_bindgen(module = "/js/chrome_bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn storageSyncGet(keys: JsValue) -> Result<JsValue, JsValue>;

    pub fn onStorageChanged(callback: &js_sys::Function);

    #[wasm_bindgen(catch)]
    async fn sendRuntimeMessage(message: JsValue) -> Result<JsValue, JsValue>;

    pub fn onRuntimeMessage(handler: &js_sys::Function);

    #[wasm_bindgen(catch)]
    async fn openOptionsPage() -> Result<(), JsValue>;

    pub fn runtimeUrl(path: &str) -> String;

    pub fn onInstalled(callback: &js_sys::Function);

    pub fn createContextMenu(id: &str, title: &str);

    pub fn onContextMenuClicked(callback: &js_sys::Function);

    pub fn onCommand(callback: &js_sys::Function);

    #[wasm_bindgen(catch)]
    async fn queryActiveTab() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getTabSelection(tab_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn sendTabMessage(tab_id: i32, message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn createTab(url: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn copyText(text: &str) -> Result<(), JsValue>;
}

#[derive(Debug, Clone, serde::Deserialize, PartialEq)]
pub struct ActiveTab {
    pub id: i32,
    pub url: String,
}

pub(crate) fn to_js<T: Serialize>(value: &T) -> Result<JsValue, String> {
    // Plain objects rather than Maps, so chrome's structured clone sees fields
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value
        .serialize(&serializer)
        .map_err(|e| format!("Failed to serialize: {:?}", e))
}

pub(crate) fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, String> {
    serde_wasm_bindgen::from_value(value).map_err(|e| format!("Failed to parse: {:?}", e))
}

pub async fn load_settings() -> Result<Settings, String> {
    let keys = to_js(&STORAGE_KEYS)?;
    let data = storageSyncGet(keys)
        .await
        .map_err(|e| format!("Failed to get storage: {:?}", e))?;

    if data.is_null() || data.is_undefined() {
        return Ok(Settings::new());
    }
    from_js(data)
}

/// Settings as the background worker reports them.
/// Falls back to reading storage directly if the worker does not answer.
pub async fn request_settings() -> Result<Settings, String> {
    let replies = async {
        let key: ApiKeyAndLanguage = send_message(&Request::GetApiKeyAndLanguage).await?;
        let model: ModelReply = send_message(&Request::GetModel).await?;
        Ok::<_, String>((key, model))
    };

    match replies.await {
        Ok((key, model)) => Ok(Settings {
            api_key: key.api_key,
            language: key.language,
            model: model.model,
            ..Settings::new()
        }),
        Err(e) => {
            warn!("Background did not answer, reading storage: {}", e);
            load_settings().await
        }
    }
}

/// Send a message to the background worker and decode its reply
pub async fn send_message<T: DeserializeOwned>(request: &Request) -> Result<T, String> {
    debug!("Sending {:?}", request);
    let reply = sendRuntimeMessage(to_js(request)?)
        .await
        .map_err(|e| format!("Failed to send message: {:?}", e))?;
    from_js(reply)
}

pub async fn send_tab_message(tab_id: i32, request: &Request) -> Result<(), String> {
    sendTabMessage(tab_id, to_js(request)?)
        .await
        .map(|_| ())
        .map_err(|e| format!("Failed to message tab {}: {:?}", tab_id, e))
}

pub async fn open_options_page() -> Result<(), String> {
    openOptionsPage()
        .await
        .map_err(|e| format!("Failed to open options: {:?}", e))
}

pub async fn active_tab() -> Result<Option<ActiveTab>, String> {
    let tab = queryActiveTab()
        .await
        .map_err(|e| format!("Failed to query tabs: {:?}", e))?;
    if tab.is_null() || tab.is_undefined() {
        return Ok(None);
    }
    from_js(tab).map(Some)
}

/// Selected text in a tab; empty when the page cannot be scripted
pub async fn tab_selection(tab_id: i32) -> String {
    match getTabSelection(tab_id).await {
        Ok(value) => value.as_string().unwrap_or_default(),
        Err(e) => {
            warn!("Could not read selection in tab {}: {:?}", tab_id, e);
            String::new()
        }
    }
}

pub async fn open_tab(url: &str) -> Result<(), String> {
    createTab(url)
        .await
        .map_err(|e| format!("Failed to open {}: {:?}", url, e))
}

pub async fn copy_to_clipboard(text: &str) -> Result<(), String> {
    copyText(text)
        .await
        .map_err(|e| format!("Failed to copy: {:?}", e))
}
