// Bridges the Discord gateway to the relay service.
//
// The handler owns nothing but the relay; each triggered message gets a sink
// bound to its channel and one call into the orchestrator. Failures never
// propagate back into serenity - they are logged here, and completion
// failures additionally get a short notice in the channel so the user isn't
// left staring at a typing indicator that went nowhere.

use crate::core::chunker::ChunkSink;
use crate::core::conversation::ConversationStore;
use crate::core::relay::{CompletionProvider, RelayError, RelayOutcome, RelayService};
use async_trait::async_trait;
use serenity::client::{Context, EventHandler};
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::ChannelId;
use std::error::Error;
use std::sync::Arc;

const COMPLETION_FAILED_NOTICE: &str =
    "Sorry, I couldn't get a response for that. Please try again.";

/// Sends reply chunks as plain messages into one channel.
pub struct ChannelSink {
    http: Arc<Http>,
    channel_id: ChannelId,
}

#[async_trait]
impl ChunkSink for ChannelSink {
    async fn send(&self, chunk: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.channel_id.say(&self.http, chunk).await?;
        Ok(())
    }
}

pub struct Handler<S: ConversationStore, P: CompletionProvider> {
    relay: Arc<RelayService<S, P>>,
}

impl<S: ConversationStore, P: CompletionProvider> Handler<S, P> {
    pub fn new(relay: Arc<RelayService<S, P>>) -> Self {
        Self { relay }
    }
}

#[serenity::async_trait]
impl<S, P> EventHandler for Handler<S, P>
where
    S: ConversationStore + 'static,
    P: CompletionProvider + 'static,
{
    async fn ready(&self, _ctx: Context, ready: Ready) {
        tracing::info!(user = %ready.user.name, "bot is online");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // Ignore bot messages (including our own)
        if msg.author.bot {
            return;
        }

        if !self.relay.is_triggered(&msg.content) {
            return;
        }

        let channel_id = msg.channel_id.get();

        // Best effort; a turn still runs if the typing indicator fails.
        let _ = msg.channel_id.broadcast_typing(&ctx.http).await;

        let sink = ChannelSink {
            http: ctx.http.clone(),
            channel_id: msg.channel_id,
        };

        match self
            .relay
            .handle_message(&channel_id.to_string(), &msg.content, &sink)
            .await
        {
            Ok(RelayOutcome::Replied { chunks }) => {
                tracing::debug!(channel_id, chunks, "reply delivered");
            }
            Ok(RelayOutcome::Reset) => {
                tracing::debug!(channel_id, "conversation state cleared");
            }
            Ok(RelayOutcome::Ignored) => {}
            Err(err @ (RelayError::Completion(_) | RelayError::CompletionTimeout(_))) => {
                tracing::error!(channel_id, error = %err, "completion failed");
                if let Err(err) = msg.reply(&ctx.http, COMPLETION_FAILED_NOTICE).await {
                    tracing::warn!(channel_id, error = %err, "failed to send failure notice");
                }
            }
            Err(RelayError::Delivery(err)) => {
                tracing::error!(
                    channel_id,
                    failed_chunk = err.index,
                    total_chunks = err.total,
                    reason = %err.reason,
                    "reply delivery failed partway"
                );
            }
            Err(err) => {
                tracing::error!(channel_id, error = %err, "failed to handle message");
            }
        }
    }
}
