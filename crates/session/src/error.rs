use std::time::Duration;

use khmerchat_llm::{TransportError, TransportErrorKind};
use snafu::Snafu;

use crate::prompts::{
    DISCONNECTED_TEXT, EMPTY_MESSAGE_TEXT, INVALID_CREDENTIAL_TEXT, OVERLOADED_TEXT,
    QUOTA_EXCEEDED_TEXT, RATE_LIMITED_TEXT, UNKNOWN_ERROR_TEXT,
};

/// Failure of a chat turn. `Display` is the bilingual text shown in the pending AI bubble.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    #[snafu(display("{}", EMPTY_MESSAGE_TEXT))]
    EmptyMessage { stage: &'static str },
    #[snafu(display("{}", DISCONNECTED_TEXT))]
    Disconnected {
        stage: &'static str,
        consecutive_failures: u32,
    },
    #[snafu(display("{}", OVERLOADED_TEXT))]
    TransientOverload {
        stage: &'static str,
        source: TransportError,
    },
    #[snafu(display("{}", RATE_LIMITED_TEXT))]
    RateLimited {
        stage: &'static str,
        source: TransportError,
    },
    #[snafu(display("{}", INVALID_CREDENTIAL_TEXT))]
    InvalidCredential {
        stage: &'static str,
        source: TransportError,
    },
    #[snafu(display("{}", QUOTA_EXCEEDED_TEXT))]
    QuotaExceeded {
        stage: &'static str,
        source: TransportError,
    },
    #[snafu(display("API Error: {source}"))]
    Network {
        stage: &'static str,
        source: TransportError,
        retry_after: Option<Duration>,
    },
    #[snafu(display("API Error: {source}"))]
    Unknown {
        stage: &'static str,
        source: TransportError,
    },
    #[snafu(display("{} ({source})", UNKNOWN_ERROR_TEXT))]
    Initialize {
        stage: &'static str,
        source: TransportError,
    },
}

impl SessionError {
    /// Maps a transport failure onto the user-facing taxonomy without side effects.
    pub fn classify(
        stage: &'static str,
        source: TransportError,
        retry_after: Option<Duration>,
    ) -> Self {
        match source.kind() {
            TransportErrorKind::Overloaded => Self::TransientOverload { stage, source },
            TransportErrorKind::RateLimited => Self::RateLimited { stage, source },
            TransportErrorKind::InvalidCredential => Self::InvalidCredential { stage, source },
            TransportErrorKind::QuotaExceeded => Self::QuotaExceeded { stage, source },
            TransportErrorKind::Network => Self::Network {
                stage,
                source,
                retry_after,
            },
            TransportErrorKind::Other => Self::Unknown { stage, source },
        }
    }

    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Whether this failure drops the session handle so the next turn starts clean.
    pub fn invalidates_session(&self) -> bool {
        match self {
            Self::TransientOverload { .. }
            | Self::InvalidCredential { .. }
            | Self::QuotaExceeded { .. } => true,
            Self::Network { retry_after, .. } => retry_after.is_some(),
            _ => false,
        }
    }

    /// Cooldown before the next attempt is meaningful, set once repeated connection
    /// failures have reset the session.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Network { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Connectivity failures belong in a banner rather than a message bubble.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Disconnected { .. })
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Self::EmptyMessage { stage }
            | Self::Disconnected { stage, .. }
            | Self::TransientOverload { stage, .. }
            | Self::RateLimited { stage, .. }
            | Self::InvalidCredential { stage, .. }
            | Self::QuotaExceeded { stage, .. }
            | Self::Network { stage, .. }
            | Self::Unknown { stage, .. }
            | Self::Initialize { stage, .. } => stage,
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum OcrError {
    #[snafu(display("OCR Error: {source}"))]
    Request {
        stage: &'static str,
        source: TransportError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport_error(kind: TransportErrorKind, message: &str) -> TransportError {
        TransportError::request("test", kind, message)
    }

    #[test]
    fn classification_follows_transport_kind() {
        let overloaded = SessionError::classify(
            "send",
            transport_error(TransportErrorKind::Overloaded, "503"),
            None,
        );
        assert!(matches!(overloaded, SessionError::TransientOverload { .. }));
        assert!(overloaded.invalidates_session());
        assert_eq!(overloaded.to_string(), OVERLOADED_TEXT);

        let limited = SessionError::classify(
            "send",
            transport_error(TransportErrorKind::RateLimited, "429"),
            None,
        );
        assert!(!limited.invalidates_session());
        assert_eq!(limited.user_message(), RATE_LIMITED_TEXT);
    }

    #[test]
    fn unknown_errors_keep_the_original_message() {
        let error = SessionError::classify(
            "send",
            transport_error(TransportErrorKind::Other, "candidate blocked by safety filter"),
            None,
        );

        assert_eq!(
            error.to_string(),
            "API Error: candidate blocked by safety filter"
        );
        assert!(!error.invalidates_session());
        assert_eq!(error.stage(), "send");
    }

    #[test]
    fn network_cooldown_marks_invalidation() {
        let below_threshold = SessionError::classify(
            "send",
            transport_error(TransportErrorKind::Network, "connection reset"),
            None,
        );
        assert_eq!(below_threshold.retry_after(), None);
        assert!(!below_threshold.invalidates_session());

        let at_threshold = SessionError::classify(
            "send",
            transport_error(TransportErrorKind::Network, "connection reset"),
            Some(Duration::from_secs(5)),
        );
        assert_eq!(at_threshold.retry_after(), Some(Duration::from_secs(5)));
        assert!(at_threshold.invalidates_session());
    }

    #[test]
    fn every_notice_is_bilingual() {
        for text in [
            EMPTY_MESSAGE_TEXT,
            DISCONNECTED_TEXT,
            OVERLOADED_TEXT,
            RATE_LIMITED_TEXT,
            INVALID_CREDENTIAL_TEXT,
            QUOTA_EXCEEDED_TEXT,
            UNKNOWN_ERROR_TEXT,
        ] {
            let (khmer, english) = text.split_once(" (").unwrap();
            assert!(khmer.chars().any(|c| ('\u{1780}'..='\u{17FF}').contains(&c)));
            assert!(english.ends_with(".)"));
        }
    }
}
