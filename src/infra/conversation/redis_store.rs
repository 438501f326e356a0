// Redis-backed conversation store.
//
// One key per channel, holding the JSON-encoded continuation state. Keys are
// never expired; a channel that has spoken to the bot once keeps its entry
// until the reset trigger deletes it.

use crate::core::conversation::{ConversationState, ConversationStore, StoreError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

const KEY_PREFIX: &str = "conversation:";

/// `ConnectionManager` reconnects on its own and is cheap to clone, so one
/// store instance serves every concurrent turn.
pub struct RedisConversationStore {
    conn: ConnectionManager,
}

impl RedisConversationStore {
    /// Connects to Redis at `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(url).map_err(|err| StoreError::Connection(err.to_string()))?;

        let conn = client
            .get_connection_manager()
            .await
            .map_err(|err| StoreError::Connection(err.to_string()))?;

        tracing::info!(url, "connected to Redis");

        Ok(Self { conn })
    }

    fn key(channel_id: &str) -> String {
        format!("{KEY_PREFIX}{channel_id}")
    }
}

#[async_trait]
impl ConversationStore for RedisConversationStore {
    async fn get(&self, channel_id: &str) -> Result<Option<ConversationState>, StoreError> {
        let mut conn = self.conn.clone();

        let raw: Option<String> = conn
            .get(Self::key(channel_id))
            .await
            .map_err(|err| StoreError::Connection(err.to_string()))?;

        raw.map(|raw| ConversationState::decode(&raw)).transpose()
    }

    async fn set(&self, channel_id: &str, state: &ConversationState) -> Result<(), StoreError> {
        let raw = state.encode()?;
        let mut conn = self.conn.clone();

        let _: () = conn
            .set(Self::key(channel_id), raw)
            .await
            .map_err(|err| StoreError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn clear(&self, channel_id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();

        let _: i64 = conn
            .del(Self::key(channel_id))
            .await
            .map_err(|err| StoreError::Connection(err.to_string()))?;

        Ok(())
    }
}
