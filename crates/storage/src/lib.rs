pub mod error;
pub mod ids;
pub mod store;
pub mod types;

pub use error::{StorageError, StorageResult};
pub use ids::{MessageId, WELCOME_MESSAGE_ID};
pub use store::{ChatStore, STORAGE_KEY};
pub use types::{
    ChatMessage, HISTORY_CLEARED_TEXT, ImageAttachment, NO_TEXT_RESPONSE_NOTICE, Sender,
    WELCOME_MESSAGE_TEXT, display_timestamp,
};
