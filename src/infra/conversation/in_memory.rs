// In-memory implementation of the conversation store.
//
// Holds the same serialized string values a real backend would, so the codec
// path gets exercised even without Redis. Useful for tests and for running
// the bot without any store infrastructure (state is lost on restart).

use crate::core::conversation::{ConversationState, ConversationStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;

pub struct InMemoryConversationStore {
    /// Maps channel id -> JSON-encoded state.
    data: DashMap<String, String>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, channel_id: &str) -> Result<Option<ConversationState>, StoreError> {
        self.data
            .get(channel_id)
            .map(|entry| ConversationState::decode(entry.value()))
            .transpose()
    }

    async fn set(&self, channel_id: &str, state: &ConversationState) -> Result<(), StoreError> {
        let raw = state.encode()?;
        self.data.insert(channel_id.to_string(), raw);
        Ok(())
    }

    async fn clear(&self, channel_id: &str) -> Result<(), StoreError> {
        self.data.remove(channel_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> ConversationState {
        ConversationState {
            conversation_id: Some("conv-1".to_string()),
            parent_message_id: "msg-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_set_then_get_round_trips() {
        let store = InMemoryConversationStore::new();

        assert_eq!(store.get("42").await.unwrap(), None);

        store.set("42", &sample_state()).await.unwrap();
        assert_eq!(store.get("42").await.unwrap(), Some(sample_state()));
    }

    #[tokio::test]
    async fn test_set_overwrites_existing_state() {
        let store = InMemoryConversationStore::new();
        store.set("42", &sample_state()).await.unwrap();

        let newer = ConversationState {
            conversation_id: Some("conv-1".to_string()),
            parent_message_id: "msg-2".to_string(),
        };
        store.set("42", &newer).await.unwrap();

        assert_eq!(store.get("42").await.unwrap(), Some(newer));
    }

    #[tokio::test]
    async fn test_clear_removes_state() {
        let store = InMemoryConversationStore::new();
        store.set("42", &sample_state()).await.unwrap();

        store.clear("42").await.unwrap();
        assert_eq!(store.get("42").await.unwrap(), None);

        // Clearing an absent channel is not an error.
        store.clear("42").await.unwrap();
    }

    #[tokio::test]
    async fn test_channels_are_independent() {
        let store = InMemoryConversationStore::new();
        store.set("42", &sample_state()).await.unwrap();

        assert_eq!(store.get("43").await.unwrap(), None);
    }
}
