use serde::{Deserialize, Serialize};

use super::ids::MessageId;

pub const WELCOME_MESSAGE_TEXT: &str = "សួស្តី! សូមស្វាគមន៍មកកាន់ AI Plus Khmer Chat។ តើខ្ញុំអាចជួយអ្វីអ្នកបានថ្ងៃនេះ? (Hello! Welcome to AI Plus Khmer Chat. How can I assist you today?)";

/// Reserved text of the notice shown after the history is cleared. Never replayed to the model.
pub const HISTORY_CLEARED_TEXT: &str =
    "Chat history cleared successfully. / ប្រវត្តិជជែកត្រូវបានសម្អាតដោយជោគជ័យ។";

/// Shown in place of a reply that streamed no text at all.
pub const NO_TEXT_RESPONSE_NOTICE: &str =
    "AI did not provide a text response. / AI មិនបានផ្តល់ការឆ្លើយតបជាអត្ថបទទេ។";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    pub base64_data: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ImageAttachment {
    pub fn new(base64_data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            base64_data: base64_data.into(),
            mime_type: mime_type.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    /// Display time, `HH:MM` in local time.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageAttachment>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ChatMessage {
    pub fn new(id: MessageId, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            sender,
            timestamp: display_timestamp(),
            images: Vec::new(),
            is_error: false,
        }
    }

    pub fn user(text: impl Into<String>, images: Vec<ImageAttachment>) -> Self {
        let mut message = Self::new(MessageId::user(), Sender::User, text);
        message.images = images;
        message
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self::new(MessageId::ai(), Sender::Ai, text)
    }

    /// Empty AI bubble that a streamed reply grows into.
    pub fn ai_placeholder() -> Self {
        Self::ai(String::new())
    }

    pub fn welcome() -> Self {
        Self::new(MessageId::welcome(), Sender::Ai, WELCOME_MESSAGE_TEXT)
    }

    pub fn history_cleared() -> Self {
        Self::new(MessageId::history_cleared(), Sender::Ai, HISTORY_CLEARED_TEXT)
    }

    pub fn append_text(&mut self, delta: &str) {
        self.text.push_str(delta);
    }

    /// Replaces the bubble content with a failure notice.
    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.text = message.into();
        self.is_error = true;
    }

    pub fn has_content(&self) -> bool {
        !self.text.trim().is_empty() || !self.images.is_empty()
    }

    pub fn is_history_cleared_marker(&self) -> bool {
        self.text == HISTORY_CLEARED_TEXT
    }
}

pub fn display_timestamp() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

fn is_false(value: &bool) -> bool {
    !*value
}
