use std::sync::Arc;

mod content;
mod error;
mod model;
mod rig_adapter;
mod transport;

pub use content::{Content, Part, Role, StreamDelta};
pub use error::{TransportError, TransportErrorKind, TransportResult};
pub use model::{DEFAULT_GEMINI_MODEL, GEMINI_PROVIDER_ID, canonical_provider_id};
pub use rig_adapter::GeminiTransport;
pub use transport::{BoxFuture, ChatHandle, DeltaStream, GenerativeTransport, TransportConfig};

pub fn create_transport(
    mut config: TransportConfig,
) -> TransportResult<Arc<dyn GenerativeTransport>> {
    let Some(provider_id) = canonical_provider_id(&config.provider_id) else {
        return Err(TransportError::UnsupportedProvider {
            stage: "create-transport",
            provider_id: config.provider_id,
        });
    };

    config.provider_id = provider_id.to_string();
    if config.model_id.is_empty() {
        config.model_id = DEFAULT_GEMINI_MODEL.to_string();
    }

    Ok(Arc::new(GeminiTransport::new(config)?))
}
