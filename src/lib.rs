/// DeepSeek Popup - Chrome Extension for asking about selected text
/// Built with Rust + WASM + Yew

pub mod api;
pub mod assembler;
mod background;
mod chrome;
mod content;
pub mod conversation;
pub mod layout;
pub mod markdown;
pub mod messaging;
pub mod popup_state;
pub mod pow;
pub mod scroll;
pub mod session;
pub mod settings;
pub mod sse;
pub mod theme;
pub mod ui;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Selection icon, popup and message listener for the host page
#[wasm_bindgen]
pub fn start_content_script() {
    content::start();
}

// Message handler, context menu and keyboard command for the service worker
#[wasm_bindgen]
pub fn start_background() {
    background::start();
}
