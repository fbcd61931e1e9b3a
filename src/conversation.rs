/// Conversation history replayed to the model on every turn
use serde::{Deserialize, Serialize};

const AUTO_LANGUAGE: &str = "auto";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message as the completions API expects it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Message {
        Message {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Conversation {
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::new(Role::User, text));
        self.drop_unanswered();
    }

    /// Record an answer. Empty answers (nothing arrived before a cancel)
    /// are not kept.
    pub fn push_assistant(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !text.is_empty() {
            self.messages.push(Message::new(Role::Assistant, text));
        }
    }

    /// Rewind so the last question can be asked again
    pub fn prepare_regenerate(&mut self) -> bool {
        if matches!(self.messages.last(), Some(m) if m.role == Role::Assistant) {
            self.messages.pop();
        }
        matches!(self.messages.last(), Some(m) if m.role == Role::User)
    }

    /// The last user question, if one is waiting for an answer
    pub fn pending_question(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// System prompt followed by the full history
    pub fn request_messages(&self, language: &str) -> Vec<Message> {
        std::iter::once(Message::new(Role::System, system_prompt(language)))
            .chain(self.messages.iter().cloned())
            .collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    // A question that never got an answer is superseded by the next one
    fn drop_unanswered(&mut self) {
        let mut i = self.messages.len();
        while i > 1 {
            i -= 1;
            if self.messages[i].role == Role::User && self.messages[i - 1].role == Role::User {
                self.messages.remove(i - 1);
            }
        }
    }
}

pub fn system_prompt(language: &str) -> String {
    let clause = if language.is_empty() || language == AUTO_LANGUAGE {
        "Detect and respond in the same language as the user's input. If the user's input is in Chinese, respond in Chinese. If the user's input is in English, respond in English, etc.".to_string()
    } else {
        format!(
            "You MUST respond ONLY in {lang}. This is a strict requirement. Do not use any other language except {lang}.",
            lang = language
        )
    };
    format!("You are a helpful AI assistant. {}", clause)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turns_accumulate() {
        let mut conversation = Conversation::new();
        conversation.push_user("What is Rust?");
        conversation.push_assistant("A systems language.");
        conversation.push_user("Is it fast?");

        let roles: Vec<Role> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
    }

    #[test]
    fn test_consecutive_user_messages_collapse() {
        let mut conversation = Conversation::new();
        conversation.push_user("first");
        // cancelled before any answer arrived
        conversation.push_assistant("");
        conversation.push_user("second");

        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].content, "second");
    }

    #[test]
    fn test_prepare_regenerate_drops_answer() {
        let mut conversation = Conversation::new();
        conversation.push_user("q");
        conversation.push_assistant("a");

        assert!(conversation.prepare_regenerate());
        assert_eq!(conversation.pending_question(), Some("q"));
        assert_eq!(conversation.messages().len(), 1);
    }

    #[test]
    fn test_prepare_regenerate_after_failure_keeps_question() {
        let mut conversation = Conversation::new();
        conversation.push_user("q");

        assert!(conversation.prepare_regenerate());
        assert_eq!(conversation.messages().len(), 1);
    }

    #[test]
    fn test_prepare_regenerate_on_empty() {
        let mut conversation = Conversation::new();
        assert!(!conversation.prepare_regenerate());
    }

    #[test]
    fn test_request_messages_start_with_system_prompt() {
        let mut conversation = Conversation::new();
        conversation.push_user("hi");

        let messages = conversation.request_messages("auto");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("same language"));
        assert_eq!(messages[1], Message::new(Role::User, "hi"));
    }

    #[test]
    fn test_system_prompt_fixed_language() {
        let prompt = system_prompt("French");
        assert!(prompt.starts_with("You are a helpful AI assistant."));
        assert!(prompt.contains("ONLY in French"));
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Message::new(Role::Assistant, "ok")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }
}
