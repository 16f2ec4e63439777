mod error;
mod health;
mod manager;
mod ocr;
pub mod prompts;
mod retry;
mod settings;
pub mod transcript;

#[cfg(test)]
mod testing;

pub use error::{OcrError, SessionError, SessionResult};
pub use health::{ConnectionStatus, HealthConfig, HealthMonitor};
pub use manager::{SessionConfig, SessionHandle, SessionManager, SessionState, TurnStream};
pub use ocr::{OcrRequestor, is_no_text};
pub use retry::RetryPolicy;
pub use settings::{
    SETTINGS_DIRECTORY_NAME, SETTINGS_ENV_PREFIX, SETTINGS_FILE_NAME, Settings, SettingsError,
    SettingsStore,
};
pub use transcript::{MAX_HISTORY_ENTRIES, decode, encode, encode_default};
