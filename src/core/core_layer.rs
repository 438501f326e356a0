// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "chunker/reply_chunker.rs"]
pub mod chunker;

#[path = "conversation/conversation_store.rs"]
pub mod conversation;

#[path = "relay/relay_service.rs"]
pub mod relay;
