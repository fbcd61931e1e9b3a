/// User settings kept in chrome.storage.sync, and the request body they shape

use crate::conversation::Message;
use serde::{Deserialize, Serialize};

pub const COMPLETIONS_URL: &str = "https://api.deepseek.com/chat/completions";

/// Storage keys, as the options page writes them
pub const STORAGE_KEYS: [&str; 4] = ["apiKey", "language", "model", "selectionEnabled"];

pub const GREETINGS: [&str; 3] = ["Good morning 👋", "Good afternoon 👋", "Good evening 👋"];

const TEMPERATURE: f32 = 0.5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Model {
    #[serde(rename = "v3")]
    V3,
    #[default]
    #[serde(rename = "r1")]
    R1,
}

impl Model {
    pub fn api_id(self) -> &'static str {
        match self {
            Model::V3 => "deepseek-chat",
            Model::R1 => "deepseek-reasoner",
        }
    }

    pub fn streams_reasoning(self) -> bool {
        self == Model::R1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub model: Model,
    #[serde(default = "default_true")]
    pub selection_enabled: bool,
}

fn default_language() -> String {
    "auto".to_string()
}

fn default_true() -> bool {
    true
}

impl Settings {
    pub fn new() -> Self {
        Settings {
            api_key: String::new(),
            language: default_language(),
            model: Model::default(),
            selection_enabled: true,
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Model used for a question. Greetings always go to the chat model.
    pub fn model_for(&self, question: &str) -> Model {
        if is_greeting(question) { Model::V3 } else { self.model }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_greeting(text: &str) -> bool {
    GREETINGS.contains(&text)
}

/// JSON body of a streaming chat-completions request
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub stream: bool,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(model: Model, messages: Vec<Message>) -> ChatRequest {
        ChatRequest {
            model: model.api_id().to_string(),
            messages,
            stream: true,
            temperature: TEMPERATURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;

    #[test]
    fn test_defaults_from_empty_storage() {
        let settings: Settings = serde_json::from_str("{}").unwrap();

        assert_eq!(settings, Settings::new());
        assert_eq!(settings.language, "auto");
        assert_eq!(settings.model, Model::R1);
        assert!(settings.selection_enabled);
        assert!(!settings.has_api_key());
    }

    #[test]
    fn test_storage_keys_round_trip_names() {
        let settings: Settings = serde_json::from_str(
            r#"{"apiKey":"sk-1","language":"English","model":"v3","selectionEnabled":false}"#,
        )
        .unwrap();

        assert_eq!(settings.api_key, "sk-1");
        assert_eq!(settings.model, Model::V3);
        assert!(!settings.selection_enabled);

        let json = serde_json::to_value(&settings).unwrap();
        for key in STORAGE_KEYS {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn test_model_ids() {
        assert_eq!(Model::V3.api_id(), "deepseek-chat");
        assert_eq!(Model::R1.api_id(), "deepseek-reasoner");
        assert!(Model::R1.streams_reasoning());
        assert!(!Model::V3.streams_reasoning());
    }

    #[test]
    fn test_greeting_uses_chat_model() {
        let settings = Settings::new();
        assert_eq!(settings.model_for("Good evening 👋"), Model::V3);
        assert_eq!(settings.model_for("Explain monads"), Model::R1);
    }

    #[test]
    fn test_request_body_shape() {
        let request = ChatRequest::new(Model::V3, vec![Message::new(Role::User, "hi")]);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "deepseek-chat");
        assert_eq!(json["stream"], true);
        assert_eq!(json["temperature"], 0.5);
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
