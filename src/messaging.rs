/// Messages exchanged between the background worker and content scripts
use serde::{Deserialize, Serialize};
use url::Url;

use crate::settings::{GREETINGS, Model, Settings};

pub const CONTEXT_MENU_ID: &str = "createPopup";
pub const CONTEXT_MENU_TITLE: &str = "DeepSeek AI";
pub const TOGGLE_COMMAND: &str = "toggle-popup";
pub const INSTRUCTIONS_PAGE: &str = "Instructions/Instructions.html";

/// Tab schemes content scripts cannot run in
const RESTRICTED_SCHEMES: [&str; 2] = ["chrome", "edge"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    GetApiKeyAndLanguage,
    GetModel,
    OpenPopup,
    CreatePopup {
        #[serde(rename = "selectedText", default)]
        selected_text: Option<String>,
        message: String,
    },
    GetSelectedText,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyAndLanguage {
    pub api_key: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelReply {
    pub model: Model,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectedTextReply {
    pub selected_text: String,
}

impl From<&Settings> for ApiKeyAndLanguage {
    fn from(settings: &Settings) -> Self {
        ApiKeyAndLanguage {
            api_key: settings.api_key.clone(),
            language: settings.language.clone(),
        }
    }
}

/// Greeting sent when the popup is opened without a selection
pub fn greeting_for_hour(hour: u32) -> &'static str {
    match hour {
        5..=11 => GREETINGS[0],
        12..=17 => GREETINGS[1],
        _ => GREETINGS[2],
    }
}

/// Ask the page to open a popup for `selection`, or greet when there is none
pub fn create_popup_request(selection: Option<String>, hour: u32) -> Request {
    let selection = selection.filter(|s| !s.trim().is_empty());
    let message = selection
        .clone()
        .unwrap_or_else(|| greeting_for_hour(hour).to_string());
    Request::CreatePopup {
        selected_text: selection,
        message,
    }
}

pub fn is_restricted_url(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| RESTRICTED_SCHEMES.contains(&parsed.scheme()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let json: Request = serde_json::from_str(r#"{"action":"getApiKeyAndLanguage"}"#).unwrap();
        assert_eq!(json, Request::GetApiKeyAndLanguage);

        let create = Request::CreatePopup {
            selected_text: Some("text".to_string()),
            message: "text".to_string(),
        };
        let value = serde_json::to_value(&create).unwrap();
        assert_eq!(value["action"], "createPopup");
        assert_eq!(value["selectedText"], "text");
    }

    #[test]
    fn test_create_popup_with_null_selection() {
        let request: Request = serde_json::from_str(
            r#"{"action":"createPopup","selectedText":null,"message":"Good morning 👋"}"#,
        )
        .unwrap();

        assert_eq!(
            request,
            Request::CreatePopup {
                selected_text: None,
                message: "Good morning 👋".to_string()
            }
        );
    }

    #[test]
    fn test_greetings_by_hour() {
        assert_eq!(greeting_for_hour(5), "Good morning 👋");
        assert_eq!(greeting_for_hour(11), "Good morning 👋");
        assert_eq!(greeting_for_hour(12), "Good afternoon 👋");
        assert_eq!(greeting_for_hour(17), "Good afternoon 👋");
        assert_eq!(greeting_for_hour(18), "Good evening 👋");
        assert_eq!(greeting_for_hour(3), "Good evening 👋");
    }

    #[test]
    fn test_create_popup_request() {
        assert_eq!(
            create_popup_request(Some("  ".to_string()), 9),
            Request::CreatePopup {
                selected_text: None,
                message: "Good morning 👋".to_string()
            }
        );
        assert_eq!(
            create_popup_request(Some("rust".to_string()), 9),
            Request::CreatePopup {
                selected_text: Some("rust".to_string()),
                message: "rust".to_string()
            }
        );
    }

    #[test]
    fn test_restricted_urls() {
        assert!(is_restricted_url("chrome://extensions"));
        assert!(is_restricted_url("edge://settings"));
        assert!(!is_restricted_url("https://example.com"));
        assert!(!is_restricted_url("not a url"));
    }

    #[test]
    fn test_api_key_reply_field_names() {
        let reply = ApiKeyAndLanguage::from(&Settings::new());
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["apiKey"], "");
        assert_eq!(value["language"], "auto");
    }
}
