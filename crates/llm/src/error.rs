use snafu::Snafu;

/// Failure category reported by the remote API, decided once at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// Upstream overloaded or temporarily unavailable (HTTP 503).
    Overloaded,
    /// Too many requests (HTTP 429).
    RateLimited,
    InvalidCredential,
    QuotaExceeded,
    /// Connectivity problems: DNS, refused connections, timeouts.
    Network,
    Other,
}

impl TransportErrorKind {
    /// Classifies a provider failure from its status code and error text.
    ///
    /// Quota exhaustion is checked before rate limiting because Gemini reports both
    /// as 429 `RESOURCE_EXHAUSTED`, and only the message tells them apart.
    pub fn classify(status: Option<u16>, message: &str) -> Self {
        let status = status.or_else(|| extract_status_code(message));
        let lower = message.to_lowercase();

        // A failed stream open carries only the status line, and a bare 400 there is
        // Gemini rejecting the key.
        if lower.contains("api key not valid")
            || lower.contains("api_key_invalid")
            || lower.contains("invalid status code: 400")
            || matches!(status, Some(401 | 403))
        {
            return Self::InvalidCredential;
        }

        if status == Some(503) || lower.contains("overloaded") || lower.contains("unavailable") {
            return Self::Overloaded;
        }

        if lower.contains("quota") {
            return Self::QuotaExceeded;
        }

        if status == Some(429)
            || lower.contains("rate limit")
            || lower.contains("too many requests")
            || lower.contains("resource_exhausted")
        {
            return Self::RateLimited;
        }

        if [
            "error sending request",
            "network",
            "connect",
            "timeout",
            "timed out",
            "dns",
            "broken pipe",
            "reset by peer",
        ]
        .iter()
        .any(|needle| lower.contains(needle))
        {
            return Self::Network;
        }

        Self::Other
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Overloaded)
    }
}

/// Masks the value of every `key=` query parameter, e.g. in a request URL echoed
/// back by the http client.
pub(crate) fn redact_api_key(message: &str) -> String {
    const NEEDLE: &str = "key=";

    let mut redacted = String::with_capacity(message.len());
    let mut rest = message;
    while let Some(index) = rest.find(NEEDLE) {
        let (head, tail) = rest.split_at(index + NEEDLE.len());
        redacted.push_str(head);
        let end = tail
            .find(|c: char| matches!(c, '&' | ')' | '"' | '\'' | '#') || c.is_whitespace())
            .unwrap_or(tail.len());
        if end > 0 {
            redacted.push_str("[REDACTED]");
        }
        rest = &tail[end..];
    }
    redacted.push_str(rest);
    redacted
}

/// First standalone 4xx/5xx number in an error message.
fn extract_status_code(message: &str) -> Option<u16> {
    message
        .split(|c: char| !c.is_ascii_digit())
        .filter(|word| word.len() == 3)
        .filter_map(|word| word.parse::<u16>().ok())
        .find(|code| (400..600).contains(code))
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransportError {
    #[snafu(display("missing API key for provider '{provider_id}'"))]
    MissingApiKey {
        stage: &'static str,
        provider_id: String,
    },
    #[snafu(display("provider '{provider_id}' is not supported"))]
    UnsupportedProvider {
        stage: &'static str,
        provider_id: String,
    },
    #[snafu(display("request on `{stage}` has no content parts"))]
    EmptyParts { stage: &'static str },
    #[snafu(display("http client failed on `{stage}`, {source}"))]
    HttpClient {
        stage: &'static str,
        source: rig::http_client::Error,
    },
    #[snafu(display("{message}"))]
    Request {
        stage: &'static str,
        kind: TransportErrorKind,
        message: String,
    },
}

impl TransportError {
    /// Builds a classified request failure; used by transports outside this crate.
    pub fn request(
        stage: &'static str,
        kind: TransportErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Request {
            stage,
            kind,
            message: redact_api_key(&message.into()),
        }
    }

    pub(crate) fn from_completion(
        stage: &'static str,
        source: rig::completion::CompletionError,
    ) -> Self {
        let message = redact_api_key(&source.to_string());
        Self::Request {
            stage,
            kind: TransportErrorKind::classify(None, &message),
            message,
        }
    }

    pub fn kind(&self) -> TransportErrorKind {
        match self {
            Self::MissingApiKey { .. } => TransportErrorKind::InvalidCredential,
            Self::Request { kind, .. } => *kind,
            Self::UnsupportedProvider { .. } | Self::EmptyParts { .. } | Self::HttpClient { .. } => {
                TransportErrorKind::Other
            }
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Self::MissingApiKey { stage, .. }
            | Self::UnsupportedProvider { stage, .. }
            | Self::EmptyParts { stage }
            | Self::HttpClient { stage, .. }
            | Self::Request { stage, .. } => stage,
        }
    }
}

pub type TransportResult<T> = Result<T, TransportError>;
