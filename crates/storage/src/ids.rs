use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message identifier.
///
/// Minted ids are `<prefix>-<uuid v7>`, so they sort by creation time. Ids restored from
/// storage are kept verbatim, whatever their shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

pub const WELCOME_MESSAGE_ID: &str = "welcome-0";

impl MessageId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    fn minted(prefix: &str) -> Self {
        Self(format!("{prefix}-{}", Uuid::now_v7()))
    }

    pub fn user() -> Self {
        Self::minted("user")
    }

    pub fn ai() -> Self {
        Self::minted("ai")
    }

    pub fn history_cleared() -> Self {
        Self::minted("ai-cleared")
    }

    pub fn welcome() -> Self {
        Self(WELCOME_MESSAGE_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
