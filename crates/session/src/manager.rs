use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use futures::{Stream, StreamExt, ready};
use khmerchat_llm::{
    ChatHandle, Content, DeltaStream, GenerativeTransport, Part, StreamDelta, TransportError,
    TransportErrorKind,
};
use khmerchat_storage::{ChatMessage, ImageAttachment};
use snafu::ensure;

use crate::error::{DisconnectedSnafu, EmptyMessageSnafu, SessionError, SessionResult};
use crate::health::{ConnectionStatus, HealthConfig, HealthMonitor};
use crate::prompts::KHMER_CHAT_SYSTEM_PROMPT;
use crate::retry::RetryPolicy;
use crate::transcript::{self, MAX_HISTORY_ENTRIES};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Transcript entries forwarded when seeding a handle.
    pub history_cap: usize,
    pub system_instruction: Option<String>,
    pub retry: RetryPolicy,
    pub health: HealthConfig,
    /// Reported through `SessionError::retry_after` once network failures hit the threshold.
    pub failure_cooldown: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_cap: MAX_HISTORY_ENTRIES,
            system_instruction: Some(KHMER_CHAT_SYSTEM_PROMPT.to_string()),
            retry: RetryPolicy::default(),
            health: HealthConfig::default(),
            failure_cooldown: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Sending,
}

/// The authoritative remote conversation, tagged so stale failures cannot drop a newer one.
pub struct SessionHandle {
    generation: u64,
    chat: Box<dyn ChatHandle>,
}

impl SessionHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn history(&self) -> Vec<Content> {
        self.chat.history()
    }
}

struct SendingGuard<'a>(&'a AtomicBool);

impl<'a> SendingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SessionManager {
    transport: Arc<dyn GenerativeTransport>,
    config: SessionConfig,
    handle: ArcSwapOption<SessionHandle>,
    sending: AtomicBool,
    generation: AtomicU64,
    lazy_initializations: AtomicU64,
    health: HealthMonitor,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn GenerativeTransport>, config: SessionConfig) -> Self {
        let health = HealthMonitor::new(Arc::clone(&transport), config.health);
        Self {
            transport,
            config,
            handle: ArcSwapOption::empty(),
            sending: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            lazy_initializations: AtomicU64::new(0),
            health,
        }
    }

    /// Seeds a fresh handle from the visible messages, replacing any current one.
    pub fn initialize(&self, messages: &[ChatMessage]) -> SessionResult<()> {
        self.open_session(messages).map(|_| ())
    }

    fn open_session(&self, messages: &[ChatMessage]) -> SessionResult<Arc<SessionHandle>> {
        let history = transcript::encode(messages, self.config.history_cap);
        let seeded_entries = history.len();

        let chat = match self
            .transport
            .start_chat(history, self.config.system_instruction.clone())
        {
            Ok(chat) => chat,
            Err(source) => {
                self.handle.store(None);
                tracing::error!(
                    provider = self.transport.id(),
                    error = %source,
                    "failed to start chat session"
                );
                return Err(SessionError::Initialize {
                    stage: "initialize",
                    source,
                });
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = Arc::new(SessionHandle { generation, chat });
        self.handle.store(Some(Arc::clone(&handle)));
        tracing::info!(
            provider = self.transport.id(),
            model = self.transport.model_id(),
            generation,
            seeded_entries,
            "chat session initialized"
        );
        Ok(handle)
    }

    /// Sends one user turn and hands back the streamed reply.
    ///
    /// Rejects empty turns and known outages before any transport call. A missing handle
    /// is opened with an empty transcript first.
    pub async fn send_turn(
        &self,
        text: &str,
        images: &[ImageAttachment],
    ) -> SessionResult<TurnStream> {
        let parts = turn_parts(text, images);
        ensure!(
            !parts.is_empty(),
            EmptyMessageSnafu {
                stage: "send-turn"
            }
        );

        if self.health.is_stale() {
            self.health.check_connection().await;
        }

        if !self.health.is_connected() {
            let consecutive_failures = self.health.status().consecutive_failures;
            tracing::warn!(consecutive_failures, "send rejected while disconnected");
            return DisconnectedSnafu {
                stage: "send-turn",
                consecutive_failures,
            }
            .fail();
        }

        let handle = match self.handle.load_full() {
            Some(handle) => handle,
            None => {
                let count = self.lazy_initializations.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::warn!(
                    lazy_initializations = count,
                    "sending without a session, initializing with an empty transcript"
                );
                self.open_session(&[])?
            }
        };

        let opened = {
            let _sending = SendingGuard::enter(&self.sending);
            self.config
                .retry
                .send_with_retry(handle.chat.as_ref(), &parts)
                .await
        };

        match opened {
            Ok(stream) => {
                self.health.record_success();
                Ok(TurnStream::new(stream))
            }
            Err(source) => Err(self.handle_send_failure(&handle, source)),
        }
    }

    fn handle_send_failure(&self, handle: &SessionHandle, source: TransportError) -> SessionError {
        let mut retry_after = None;
        if source.kind() == TransportErrorKind::Network {
            let consecutive_failures = self.health.record_failure();
            if self.health.failure_threshold_reached() {
                retry_after = Some(self.config.failure_cooldown);
            }
            tracing::warn!(consecutive_failures, "network failure while sending");
        }

        let error = SessionError::classify("send-turn", source, retry_after);
        tracing::warn!(
            generation = handle.generation,
            invalidates = error.invalidates_session(),
            error = %error,
            "turn failed"
        );
        if error.invalidates_session() {
            self.invalidate(handle.generation);
        }
        error
    }

    /// Drops the handle only if it is still the one with `generation`.
    fn invalidate(&self, generation: u64) {
        let previous = self.handle.rcu(|current| match current {
            Some(handle) if handle.generation == generation => None,
            other => other.clone(),
        });

        if previous.is_some_and(|handle| handle.generation == generation) {
            tracing::info!(generation, "session invalidated");
        }
    }

    /// Discards the handle. The next send or `initialize` starts over.
    pub fn reset(&self) {
        if let Some(previous) = self.handle.swap(None) {
            tracing::info!(generation = previous.generation, "session reset");
        }
    }

    pub fn state(&self) -> SessionState {
        if self.sending.load(Ordering::SeqCst) {
            SessionState::Sending
        } else if self.handle.load().is_some() {
            SessionState::Ready
        } else {
            SessionState::Uninitialized
        }
    }

    pub fn current_handle(&self) -> Option<Arc<SessionHandle>> {
        self.handle.load_full()
    }

    pub fn is_connected(&self) -> bool {
        self.health.is_connected()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.health.status()
    }

    pub async fn check_connection(&self) -> bool {
        self.health.check_connection().await
    }

    /// Sends that had to open a session on the fly.
    pub fn lazy_initializations(&self) -> u64 {
        self.lazy_initializations.load(Ordering::SeqCst)
    }
}

fn turn_parts(text: &str, images: &[ImageAttachment]) -> Vec<Part> {
    let text = text.trim();
    let mut parts = Vec::with_capacity(images.len() + 1);
    if !text.is_empty() {
        parts.push(Part::text(text));
    }
    parts.extend(
        images
            .iter()
            .map(|image| Part::inline_image(image.mime_type.as_str(), image.base64_data.as_str())),
    );
    parts
}

/// Streamed reply of one turn. Ends after its first error.
pub struct TurnStream {
    inner: Option<DeltaStream>,
}

impl TurnStream {
    fn new(inner: DeltaStream) -> Self {
        Self { inner: Some(inner) }
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_none()
    }

    /// Accumulates the visible reply text. Empty means the model sent no text.
    pub async fn collect_text(mut self) -> SessionResult<String> {
        let mut text = String::new();
        while let Some(delta) = self.next().await {
            if let StreamDelta::Text(chunk) = delta? {
                text.push_str(&chunk);
            }
        }
        Ok(text)
    }
}

impl Stream for TurnStream {
    type Item = SessionResult<StreamDelta>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match ready!(inner.poll_next_unpin(cx)) {
            Some(Ok(delta)) => Poll::Ready(Some(Ok(delta))),
            Some(Err(source)) => {
                this.inner = None;
                tracing::warn!(error = %source, "turn stream failed");
                Poll::Ready(Some(Err(SessionError::classify(
                    "turn-stream",
                    source,
                    None,
                ))))
            }
            None => {
                this.inner = None;
                Poll::Ready(None)
            }
        }
    }
}
