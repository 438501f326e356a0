// Conversation continuity for the chat relay.
//
// The relay keeps one small record per Discord channel: the identifiers the
// completion API hands back so the next prompt in that channel resumes the
// same dialogue thread. The channel id is the store key, never part of the
// value. A missing entry means "start a new dialogue".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Continuation identifiers for one channel's dialogue with the completion API.
///
/// `conversation_id` is absent under session-token authentication, where the
/// API tracks the thread server-side and only hands back message ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub parent_message_id: String,
}

impl ConversationState {
    /// Encodes the state as the single JSON string value kept under the
    /// channel key.
    pub fn encode(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Trait for persisting per-channel conversation state.
///
/// Implementations hold string keys and serialized string values; absent keys
/// surface as `Ok(None)` so the caller can tell "no dialogue yet" apart from
/// a backend failure. Writes are unconditional overwrites; the relay service
/// serializes turns per channel, so no versioning happens here.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Look up the continuation state for a channel.
    async fn get(&self, channel_id: &str) -> Result<Option<ConversationState>, StoreError>;

    /// Overwrite the continuation state for a channel.
    async fn set(&self, channel_id: &str, state: &ConversationState) -> Result<(), StoreError>;

    /// Remove the continuation state for a channel, resetting the dialogue.
    async fn clear(&self, channel_id: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let state = ConversationState {
            conversation_id: Some("conv-1".to_string()),
            parent_message_id: "msg-9".to_string(),
        };

        let raw = state.encode().unwrap();
        let decoded = ConversationState::decode(&raw).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_encode_omits_absent_conversation_id() {
        // Session-token dialogues carry no conversation id; the encoded value
        // should not mention the field at all.
        let state = ConversationState {
            conversation_id: None,
            parent_message_id: "msg-1".to_string(),
        };

        let raw = state.encode().unwrap();
        assert!(!raw.contains("conversation_id"));

        let decoded = ConversationState::decode(&raw).unwrap();
        assert_eq!(decoded.conversation_id, None);
        assert_eq!(decoded.parent_message_id, "msg-1");
    }

    #[test]
    fn test_decode_rejects_bare_identifier() {
        // The legacy encoding stored a bare id string instead of a record.
        // That shape is an error now, not a supported input.
        assert!(ConversationState::decode("msg-1").is_err());
    }
}
