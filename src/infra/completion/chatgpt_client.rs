use crate::core::conversation::ConversationState;
use crate::core::relay::{CompletionProvider, CompletionReply};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::error::Error;

const DEFAULT_ENDPOINT: &str = "https://chat.openai.com/backend-api/conversation";

/// How the completion API is authenticated.
///
/// The hosted API takes an API key as a bearer token; the browser-session
/// flavor takes the session token as a cookie and tracks the conversation id
/// server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    ApiKey,
    SessionToken,
}

pub struct ChatGptClient {
    client: Client,
    token: String,
    auth_mode: AuthMode,
    endpoint: String,
}

impl ChatGptClient {
    pub fn new(token: String, auth_mode: AuthMode) -> Self {
        Self {
            client: Client::new(),
            token,
            auth_mode,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

#[async_trait]
impl CompletionProvider for ChatGptClient {
    async fn complete(
        &self,
        prompt: &str,
        persona: Option<&str>,
        continuation: Option<&ConversationState>,
    ) -> Result<CompletionReply, Box<dyn Error + Send + Sync>> {
        let payload = json!({
            "prompt": prompt,
            "system": persona,
            "conversation_id": continuation.and_then(|s| s.conversation_id.as_deref()),
            "parent_message_id": continuation.map(|s| s.parent_message_id.as_str()),
        });

        let request = self.client.post(&self.endpoint).json(&payload);
        let request = match self.auth_mode {
            AuthMode::ApiKey => {
                request.header("Authorization", format!("Bearer {}", self.token))
            }
            AuthMode::SessionToken => {
                request.header("Cookie", format!("session_token={}", self.token))
            }
        };

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            return Err(format!("completion API error: {} - {}", status, text).into());
        }

        let body: serde_json::Value = response.json().await?;

        let text = body["reply"]
            .as_str()
            .ok_or("missing reply text in completion response")?
            .to_string();

        // The reply's own message id is what the next turn continues from.
        let parent_message_id = body["message_id"]
            .as_str()
            .ok_or("missing message id in completion response")?
            .to_string();

        let conversation_id = body["conversation_id"].as_str().map(|s| s.to_string());

        Ok(CompletionReply {
            text,
            state: ConversationState {
                conversation_id,
                parent_message_id,
            },
        })
    }
}
