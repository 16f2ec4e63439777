use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use snafu::ResultExt;

use super::error::{
    CreateDirectorySnafu, RemoveFileSnafu, RenameTempFileSnafu, SerializeMessagesSnafu,
    StorageResult, WriteFileSnafu,
};
use super::types::ChatMessage;

/// Key the browser client stored its history under; reused as the file stem.
pub const STORAGE_KEY: &str = "aiPlusKhmerChatMessagesV2";
pub const STORE_DIRECTORY_NAME: &str = "khmerchat";

/// Per-user chat history persisted as a single JSON array.
#[derive(Debug, Clone)]
pub struct ChatStore {
    path: PathBuf,
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

impl ChatStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .map(|path| path.join(STORE_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".khmerchat"))
            .join(format!("{STORAGE_KEY}.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restores the stored history.
    ///
    /// Never fails: a missing, empty, unreadable or malformed blob yields a single welcome
    /// message, and a malformed blob is removed so it is not trusted again.
    pub fn load(&self) -> Vec<ChatMessage> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return vec![ChatMessage::welcome()];
            }
            Err(error) => {
                tracing::error!(
                    path = ?self.path,
                    error = %error,
                    "failed to read stored chat history, starting fresh"
                );
                self.discard();
                return vec![ChatMessage::welcome()];
            }
        };

        match serde_json::from_str::<Vec<ChatMessage>>(&content) {
            Ok(messages) if messages.is_empty() => vec![ChatMessage::welcome()],
            Ok(messages) => {
                tracing::debug!(count = messages.len(), "restored chat history");
                messages
            }
            Err(error) => {
                tracing::warn!(
                    path = ?self.path,
                    error = %error,
                    "invalid message structure in stored chat history, resetting"
                );
                self.discard();
                vec![ChatMessage::welcome()]
            }
        }
    }

    /// Persists the full history; an empty history removes the blob.
    pub fn save(&self, messages: &[ChatMessage]) -> StorageResult<()> {
        if messages.is_empty() {
            return self.remove();
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(CreateDirectorySnafu {
                stage: "create-store-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string(messages).context(SerializeMessagesSnafu {
            stage: "serialize-chat-history",
        })?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-store-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.path).context(RenameTempFileSnafu {
            stage: "rename-temporary-store-file",
            from: temp_path,
            to: self.path.clone(),
        })
    }

    /// Drops the stored history and returns what the view shows next: the welcome
    /// message followed by the cleared notice. Only the welcome message should seed
    /// the next session.
    pub fn clear(&self) -> StorageResult<Vec<ChatMessage>> {
        self.remove()?;
        Ok(vec![ChatMessage::welcome(), ChatMessage::history_cleared()])
    }

    fn remove(&self) -> StorageResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error).context(RemoveFileSnafu {
                stage: "remove-store-file",
                path: self.path.clone(),
            }),
        }
    }

    fn discard(&self) {
        if let Err(error) = self.remove() {
            tracing::warn!(error = %error, "failed to discard stored chat history");
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::ids::{MessageId, WELCOME_MESSAGE_ID};
    use crate::types::{HISTORY_CLEARED_TEXT, ImageAttachment, Sender};

    fn temp_store() -> ChatStore {
        let dir = std::env::temp_dir().join(format!("khmerchat-store-{}", Uuid::now_v7()));
        ChatStore::new(dir.join(format!("{STORAGE_KEY}.json")))
    }

    fn is_single_welcome(messages: &[ChatMessage]) -> bool {
        messages.len() == 1 && messages[0].id.as_str() == WELCOME_MESSAGE_ID
    }

    #[test]
    fn missing_file_loads_welcome_message() {
        let store = temp_store();
        let messages = store.load();

        assert!(is_single_welcome(&messages));
        assert_eq!(messages[0].sender, Sender::Ai);
    }

    #[test]
    fn saved_history_round_trips() {
        let store = temp_store();
        let history = vec![
            ChatMessage::welcome(),
            ChatMessage::user("hi", vec![ImageAttachment::new("AAAA", "image/png")]),
            ChatMessage::ai("hello"),
        ];

        store.save(&history).unwrap();
        assert_eq!(store.load(), history);
    }

    #[test]
    fn malformed_blob_is_discarded() {
        let store = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"[{"id":"user-1","text":"hi","sender":"robot","timestamp":"10:00"}]"#,
        )
        .unwrap();

        assert!(is_single_welcome(&store.load()));
        assert!(!store.path().exists());
    }

    #[test]
    fn malformed_images_fail_validation() {
        let store = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"[{"id":"user-1","text":"","sender":"user","timestamp":"10:00","images":[{"mimeType":"image/png"}]}]"#,
        )
        .unwrap();

        assert!(is_single_welcome(&store.load()));
    }

    #[test]
    fn non_json_blob_is_discarded() {
        let store = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "not json").unwrap();

        assert!(is_single_welcome(&store.load()));
        assert!(!store.path().exists());
    }

    #[test]
    fn empty_history_removes_the_blob() {
        let store = temp_store();
        store.save(&[ChatMessage::ai("hello")]).unwrap();
        assert!(store.path().exists());

        store.save(&[]).unwrap();
        assert!(!store.path().exists());
        assert!(is_single_welcome(&store.load()));
    }

    #[test]
    fn clear_returns_welcome_and_cleared_notice() {
        let store = temp_store();
        store
            .save(&[ChatMessage::user("hi", Vec::new())])
            .unwrap();

        let shown = store.clear().unwrap();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].id, MessageId::welcome());
        assert_eq!(shown[1].text, HISTORY_CLEARED_TEXT);
        assert!(!store.path().exists());
    }
}
