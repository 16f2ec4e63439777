use std::future::Future;
use std::pin::Pin;

use futures::stream::BoxStream;

use super::content::{Content, Part, StreamDelta};
use super::error::TransportResult;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Streamed reply of a single turn. Finite, consumed once, dropped to stop reading.
pub type DeltaStream = BoxStream<'static, TransportResult<StreamDelta>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub provider_id: String,
    pub api_key: String,
    /// Empty means the provider's default base URL.
    pub endpoint: String,
    pub model_id: String,
}

impl TransportConfig {
    pub fn new(
        provider_id: impl Into<String>,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into().trim().to_string(),
            api_key: api_key.into().trim().to_string(),
            endpoint: endpoint.into().trim().to_string(),
            model_id: model_id.into().trim().to_string(),
        }
    }
}

/// A live, stateful conversation on the remote side.
///
/// Implementations append the user turn and the model reply to their history once a
/// stream finishes normally. A failed open or a stream error leaves history untouched,
/// so the same parts can be sent again.
pub trait ChatHandle: Send + Sync {
    fn history(&self) -> Vec<Content>;
    fn send_stream<'a>(&'a self, parts: &'a [Part]) -> BoxFuture<'a, TransportResult<DeltaStream>>;
}

pub trait GenerativeTransport: Send + Sync {
    fn id(&self) -> &str;
    fn model_id(&self) -> &str;
    fn start_chat(
        &self,
        history: Vec<Content>,
        system_instruction: Option<String>,
    ) -> TransportResult<Box<dyn ChatHandle>>;
    /// One-shot, non-conversational generation returning the reply text.
    fn generate<'a>(&'a self, parts: Vec<Part>) -> BoxFuture<'a, TransportResult<String>>;
}
