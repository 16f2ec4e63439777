//! Scripted transport used by the module tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use khmerchat_llm::{
    BoxFuture, ChatHandle, Content, DeltaStream, GenerativeTransport, Part, StreamDelta,
    TransportError, TransportErrorKind, TransportResult,
};

#[derive(Debug, Clone)]
pub(crate) enum Chunk {
    Text(&'static str),
    Reasoning(&'static str),
    Fail(TransportErrorKind, &'static str),
}

#[derive(Debug, Clone)]
pub(crate) enum Open {
    Stream(Vec<Chunk>),
    Fail(TransportErrorKind, &'static str),
}

#[derive(Default)]
pub(crate) struct ChatScript {
    opens: Mutex<VecDeque<Open>>,
    open_calls: AtomicUsize,
    sent: Mutex<Vec<Vec<Part>>>,
}

impl ChatScript {
    pub(crate) fn push(&self, open: Open) {
        self.opens.lock().unwrap().push_back(open);
    }

    pub(crate) fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn sent(&self) -> Vec<Vec<Part>> {
        self.sent.lock().unwrap().clone()
    }
}

struct ScriptedChat {
    script: Arc<ChatScript>,
    history: Vec<Content>,
}

impl ChatHandle for ScriptedChat {
    fn history(&self) -> Vec<Content> {
        self.history.clone()
    }

    fn send_stream<'a>(&'a self, parts: &'a [Part]) -> BoxFuture<'a, TransportResult<DeltaStream>> {
        Box::pin(async move {
            self.script.open_calls.fetch_add(1, Ordering::SeqCst);
            self.script.sent.lock().unwrap().push(parts.to_vec());

            let open = self
                .script
                .opens
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Open::Stream(Vec::new()));

            match open {
                Open::Fail(kind, message) => {
                    Err(TransportError::request("scripted-open", kind, message))
                }
                Open::Stream(chunks) => {
                    let items = chunks
                        .into_iter()
                        .map(|chunk| match chunk {
                            Chunk::Text(text) => Ok(StreamDelta::Text(text.to_string())),
                            Chunk::Reasoning(text) => Ok(StreamDelta::Reasoning(text.to_string())),
                            Chunk::Fail(kind, message) => {
                                Err(TransportError::request("scripted-chunk", kind, message))
                            }
                        })
                        .collect::<Vec<_>>();
                    Ok(futures::stream::iter(items).boxed())
                }
            }
        })
    }
}

pub(crate) struct ScriptedTransport {
    pub(crate) chat: Arc<ChatScript>,
    generations: Mutex<VecDeque<Result<String, (TransportErrorKind, &'static str)>>>,
    generate_calls: AtomicUsize,
    generated: Mutex<Vec<Vec<Part>>>,
    start_calls: AtomicUsize,
    start_failures: Mutex<VecDeque<(TransportErrorKind, &'static str)>>,
    seeds: Mutex<Vec<(Vec<Content>, Option<String>)>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            chat: Arc::new(ChatScript::default()),
            generations: Mutex::new(VecDeque::new()),
            generate_calls: AtomicUsize::new(0),
            generated: Mutex::new(Vec::new()),
            start_calls: AtomicUsize::new(0),
            start_failures: Mutex::new(VecDeque::new()),
            seeds: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn push_generate_ok(&self, text: &str) {
        self.generations
            .lock()
            .unwrap()
            .push_back(Ok(text.to_string()));
    }

    pub(crate) fn push_generate_err(&self, kind: TransportErrorKind, message: &'static str) {
        self.generations
            .lock()
            .unwrap()
            .push_back(Err((kind, message)));
    }

    pub(crate) fn push_start_err(&self, kind: TransportErrorKind, message: &'static str) {
        self.start_failures
            .lock()
            .unwrap()
            .push_back((kind, message));
    }

    pub(crate) fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn generated(&self) -> Vec<Vec<Part>> {
        self.generated.lock().unwrap().clone()
    }

    pub(crate) fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seeds(&self) -> Vec<(Vec<Content>, Option<String>)> {
        self.seeds.lock().unwrap().clone()
    }

    /// Transport calls of any kind.
    pub(crate) fn total_calls(&self) -> usize {
        self.start_calls() + self.generate_calls() + self.chat.open_calls()
    }

    pub(crate) fn as_transport(self: &Arc<Self>) -> Arc<dyn GenerativeTransport> {
        Arc::clone(self) as Arc<dyn GenerativeTransport>
    }
}

impl GenerativeTransport for ScriptedTransport {
    fn id(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "scripted-model"
    }

    fn start_chat(
        &self,
        history: Vec<Content>,
        system_instruction: Option<String>,
    ) -> TransportResult<Box<dyn ChatHandle>> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.seeds
            .lock()
            .unwrap()
            .push((history.clone(), system_instruction));

        if let Some((kind, message)) = self.start_failures.lock().unwrap().pop_front() {
            return Err(TransportError::request("scripted-start", kind, message));
        }

        Ok(Box::new(ScriptedChat {
            script: Arc::clone(&self.chat),
            history,
        }))
    }

    fn generate<'a>(&'a self, parts: Vec<Part>) -> BoxFuture<'a, TransportResult<String>> {
        Box::pin(async move {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            self.generated.lock().unwrap().push(parts);

            match self.generations.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err((kind, message))) => {
                    Err(TransportError::request("scripted-generate", kind, message))
                }
                None => Ok("ok".to_string()),
            }
        })
    }
}

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
