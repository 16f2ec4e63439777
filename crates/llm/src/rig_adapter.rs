use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt;
use rig::OneOrMany;
use rig::completion::{AssistantContent, CompletionModel, Message as RigMessage};
use rig::message::{ImageMediaType, MimeType, UserContent};
use rig::prelude::CompletionClient;
use rig::providers::gemini;
use rig::streaming::StreamedAssistantContent;
use snafu::{OptionExt, ResultExt, ensure};

use super::content::{Content, Part, Role, StreamDelta};
use super::error::{
    EmptyPartsSnafu, HttpClientSnafu, MissingApiKeySnafu, TransportError, TransportResult,
};
use super::transport::{BoxFuture, ChatHandle, DeltaStream, GenerativeTransport, TransportConfig};

/// Gemini transport backed by rig's provider client.
pub struct GeminiTransport {
    config: TransportConfig,
    client: gemini::Client,
}

impl GeminiTransport {
    pub fn new(config: TransportConfig) -> TransportResult<Self> {
        ensure!(
            !config.api_key.is_empty(),
            MissingApiKeySnafu {
                stage: "gemini-transport-new",
                provider_id: config.provider_id.clone(),
            }
        );

        let client = Self::build_client(&config)?;
        Ok(Self { config, client })
    }

    fn build_client(config: &TransportConfig) -> TransportResult<gemini::Client> {
        let mut builder = gemini::Client::builder().api_key(config.api_key.as_str());
        if !config.endpoint.is_empty() {
            builder = builder.base_url(config.endpoint.as_str());
        }
        builder.build().context(HttpClientSnafu {
            stage: "build-client",
        })
    }
}

impl GenerativeTransport for GeminiTransport {
    fn id(&self) -> &str {
        &self.config.provider_id
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    fn start_chat(
        &self,
        history: Vec<Content>,
        system_instruction: Option<String>,
    ) -> TransportResult<Box<dyn ChatHandle>> {
        tracing::debug!(
            provider_id = %self.config.provider_id,
            model_id = %self.config.model_id,
            history_len = history.len(),
            "starting gemini chat"
        );

        Ok(Box::new(GeminiChat {
            client: self.client.clone(),
            model_id: self.config.model_id.clone(),
            system_instruction,
            history: Arc::new(Mutex::new(history)),
        }))
    }

    fn generate<'a>(&'a self, parts: Vec<Part>) -> BoxFuture<'a, TransportResult<String>> {
        Box::pin(async move {
            let prompt = to_rig_message(&Content::user(parts)).context(EmptyPartsSnafu {
                stage: "generate-build-prompt",
            })?;

            let model = self.client.completion_model(self.config.model_id.clone());
            let response = model
                .completion_request(prompt)
                .send()
                .await
                .map_err(|source| TransportError::from_completion("generate", source))?;

            Ok(response
                .choice
                .iter()
                .filter_map(|content| match content {
                    AssistantContent::Text(text) => Some(text.text.as_str()),
                    _ => None,
                })
                .collect::<String>())
        })
    }
}

struct GeminiChat {
    client: gemini::Client,
    model_id: String,
    system_instruction: Option<String>,
    history: Arc<Mutex<Vec<Content>>>,
}

impl GeminiChat {
    fn snapshot(&self) -> Vec<Content> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ChatHandle for GeminiChat {
    fn history(&self) -> Vec<Content> {
        self.snapshot()
    }

    fn send_stream<'a>(&'a self, parts: &'a [Part]) -> BoxFuture<'a, TransportResult<DeltaStream>> {
        Box::pin(async move {
            let user_turn = Content::user(parts.to_vec());
            let prompt = to_rig_message(&user_turn).context(EmptyPartsSnafu {
                stage: "open-stream-build-prompt",
            })?;

            let messages = self
                .snapshot()
                .iter()
                .filter_map(to_rig_message)
                .collect::<Vec<_>>();

            let model = self.client.completion_model(self.model_id.clone());
            let mut builder = model.completion_request(prompt).messages(messages);
            if let Some(instruction) = &self.system_instruction {
                builder = builder.preamble(instruction.clone());
            }

            let stream = builder
                .stream()
                .await
                .map_err(|source| TransportError::from_completion("open-stream", source))?;

            let mut deltas = stream
                .filter_map(|item| async move {
                    match item {
                        Ok(item) => map_stream_item(item).map(Ok),
                        Err(source) => {
                            tracing::warn!(error = %source, "gemini stream emitted an error chunk");
                            Some(Err(TransportError::from_completion("stream-chunk", source)))
                        }
                    }
                })
                .boxed();

            // rig sends the request on first poll, so status and connection failures
            // surface as the first item. Report those as a failed open.
            let first = match deltas.next().await {
                Some(Err(error)) => {
                    return Err(TransportError::request(
                        "open-stream",
                        error.kind(),
                        error.to_string(),
                    ));
                }
                first => first,
            };
            let deltas = futures::stream::iter(first).chain(deltas).boxed();

            Ok(record_turn(
                deltas,
                TurnRecorder {
                    history: Arc::clone(&self.history),
                    user_turn,
                    reply: String::new(),
                },
            ))
        })
    }
}

fn to_rig_message(content: &Content) -> Option<RigMessage> {
    match content.role {
        Role::Model => {
            // Gemini never receives model-authored images, only the reply text.
            let text = content.text();
            if text.trim().is_empty() {
                None
            } else {
                Some(RigMessage::assistant(text))
            }
        }
        Role::User => {
            let items = content
                .parts
                .iter()
                .map(to_user_content)
                .collect::<Vec<_>>();
            OneOrMany::many(items)
                .ok()
                .map(|content| RigMessage::User { content })
        }
    }
}

fn to_user_content(part: &Part) -> UserContent {
    match part {
        Part::Text(text) => UserContent::text(text.clone()),
        Part::InlineImage { mime_type, data } => UserContent::image_base64(
            data.clone(),
            ImageMediaType::from_mime_type(mime_type),
            None,
        ),
    }
}

fn map_stream_item<R>(item: StreamedAssistantContent<R>) -> Option<StreamDelta>
where
    R: Clone + Unpin,
{
    match item {
        StreamedAssistantContent::Text(text) => {
            if text.text.is_empty() {
                None
            } else {
                Some(StreamDelta::Text(text.text))
            }
        }
        StreamedAssistantContent::Reasoning(reasoning) => {
            let text = reasoning.reasoning.join("");
            if text.is_empty() {
                None
            } else {
                Some(StreamDelta::Reasoning(text))
            }
        }
        StreamedAssistantContent::ReasoningDelta { reasoning, .. } => {
            if reasoning.is_empty() {
                None
            } else {
                Some(StreamDelta::Reasoning(reasoning))
            }
        }
        StreamedAssistantContent::ToolCall { .. }
        | StreamedAssistantContent::ToolCallDelta { .. }
        | StreamedAssistantContent::Final(_) => None,
    }
}

struct TurnRecorder {
    history: Arc<Mutex<Vec<Content>>>,
    user_turn: Content,
    reply: String,
}

impl TurnRecorder {
    /// Appends the exchange. A reply without text is not recorded at all, so user turns
    /// never follow each other in the history.
    fn commit(self) {
        if self.reply.trim().is_empty() {
            tracing::debug!("reply carried no text, history left unchanged");
            return;
        }

        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.push(self.user_turn);
        history.push(Content::model(vec![Part::text(self.reply)]));
    }
}

/// Forwards deltas and commits the turn into chat history when the stream ends cleanly.
/// The first error is terminal: it is yielded, then the stream ends without committing.
fn record_turn(inner: DeltaStream, recorder: TurnRecorder) -> DeltaStream {
    futures::stream::unfold(
        (inner, Some(recorder)),
        |(mut inner, mut recorder)| async move {
            let active = recorder.as_mut()?;
            match inner.next().await {
                Some(Ok(delta)) => {
                    if let StreamDelta::Text(text) = &delta {
                        active.reply.push_str(text);
                    }
                    Some((Ok(delta), (inner, recorder)))
                }
                Some(Err(error)) => Some((Err(error), (inner, None))),
                None => {
                    if let Some(finished) = recorder.take() {
                        finished.commit();
                    }
                    None
                }
            }
        },
    )
    .boxed()
}
