// The turn orchestrator: takes an inbound message, decides whether it
// triggers the relay, and runs one dialogue turn end to end.
//
// Control flow for a triggered message:
//   trigger-prefix check -> state lookup -> completion call -> state update
//   -> chunked delivery.
//
// Turns in the same channel run one at a time (per-channel mutex), so two
// rapid triggers can't interleave their state writes or their replies.
// Turns in different channels run concurrently. There are no retries
// anywhere; this is a best-effort relay by policy.

use crate::core::chunker::{self, ChunkSink, DeliveryError};
use crate::core::conversation::{ConversationState, ConversationStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

/// Reply text plus the continuation identifiers to persist for the next turn.
#[derive(Debug, Clone)]
pub struct CompletionReply {
    pub text: String,
    pub state: ConversationState,
}

/// The remote completion API, kept opaque behind a trait so the relay can be
/// tested without the network and the HTTP client lives in infra.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Sends `prompt` to the completion API, resuming the dialogue identified
    /// by `continuation` when present. `persona` is an optional
    /// system-instruction string forwarded verbatim.
    async fn complete(
        &self,
        prompt: &str,
        persona: Option<&str>,
        continuation: Option<&ConversationState>,
    ) -> Result<CompletionReply, Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Fixed prefix that marks a message as a prompt for the relay.
    pub trigger: String,
    /// Literal substring that clears the channel's dialogue instead of
    /// completing. `None` disables reset handling.
    pub reset_trigger: Option<String>,
    /// Optional persona / system-instruction string sent with every turn.
    pub persona: Option<String>,
    /// Transport payload ceiling, in characters.
    pub max_chunk_len: usize,
    /// Upper bound on one completion call.
    pub completion_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            trigger: "??".to_string(),
            reset_trigger: None,
            persona: None,
            max_chunk_len: 2000,
            completion_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("completion request failed: {0}")]
    Completion(String),

    #[error("completion request timed out after {0:?}")]
    CompletionTimeout(Duration),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a call to [`RelayService::handle_message`] did with the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Not a trigger message, or the prompt was empty. Nothing happened.
    Ignored,
    /// The reset trigger matched; the channel's dialogue state was cleared.
    Reset,
    /// A completion ran and the reply went out in `chunks` messages.
    Replied { chunks: usize },
}

pub struct RelayService<S: ConversationStore, P: CompletionProvider> {
    store: S,
    provider: P,
    config: RelayConfig,
    /// One mutex per channel; a whole turn holds it from state lookup through
    /// the last delivered chunk. Entries are never removed, matching the
    /// store's one-key-per-channel growth.
    channel_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<S: ConversationStore, P: CompletionProvider> RelayService<S, P> {
    pub fn new(store: S, provider: P, config: RelayConfig) -> Self {
        Self {
            store,
            provider,
            config,
            channel_locks: DashMap::new(),
        }
    }

    /// Whether `content` would start a relay turn. The Discord layer uses
    /// this to start a typing indicator before the turn runs.
    pub fn is_triggered(&self, content: &str) -> bool {
        matches!(self.prompt_of(content), Some(prompt) if !prompt.is_empty())
    }

    fn prompt_of<'a>(&self, content: &'a str) -> Option<&'a str> {
        content.strip_prefix(self.config.trigger.as_str())
    }

    fn channel_lock(&self, channel_id: &str) -> Arc<Mutex<()>> {
        self.channel_locks
            .entry(channel_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Runs one turn for an inbound message, delivering the reply through
    /// `sink`.
    ///
    /// Store lookups that fail degrade to a fresh dialogue; a failed state
    /// write is logged and the reply still goes out. Completion failures and
    /// partial deliveries surface as errors, with nothing sent past the
    /// failing chunk.
    pub async fn handle_message(
        &self,
        channel_id: &str,
        content: &str,
        sink: &dyn ChunkSink,
    ) -> Result<RelayOutcome, RelayError> {
        let Some(prompt) = self.prompt_of(content) else {
            return Ok(RelayOutcome::Ignored);
        };

        if prompt.is_empty() {
            return Ok(RelayOutcome::Ignored);
        }

        let lock = self.channel_lock(channel_id);
        let _turn = lock.lock().await;

        if let Some(reset) = &self.config.reset_trigger {
            if prompt.contains(reset.as_str()) {
                self.store.clear(channel_id).await?;
                tracing::info!(channel_id, "conversation reset");
                return Ok(RelayOutcome::Reset);
            }
        }

        let prior = match self.store.get(channel_id).await {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(
                    channel_id,
                    error = %err,
                    "state lookup failed, starting a fresh dialogue"
                );
                None
            }
        };

        let completion = self
            .provider
            .complete(prompt, self.config.persona.as_deref(), prior.as_ref());

        let reply = match tokio::time::timeout(self.config.completion_timeout, completion).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => return Err(RelayError::Completion(err.to_string())),
            Err(_) => return Err(RelayError::CompletionTimeout(self.config.completion_timeout)),
        };

        // State loss here is acceptable (the next turn just starts fresh),
        // but it must show up in the logs.
        if let Err(err) = self.store.set(channel_id, &reply.state).await {
            tracing::warn!(channel_id, error = %err, "failed to persist conversation state");
        }

        let chunks = chunker::split(&reply.text, self.config.max_chunk_len);
        let sent = chunker::deliver(&chunks, sink).await?;

        Ok(RelayOutcome::Replied { chunks: sent })
    }
}
