// This is the entry point of the chat relay bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (store, completion API)
// - `discord/` = Discord-specific adapters (gateway events, delivery)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Start the Discord gateway client

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::BotConfig;
use crate::core::relay::RelayService;
use crate::discord::Handler;
use crate::infra::completion::ChatGptClient;
use crate::infra::conversation::RedisConversationStore;
use serenity::client::Client;
use serenity::model::gateway::GatewayIntents;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = BotConfig::from_env().expect("Invalid configuration");

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let store = RedisConversationStore::connect(&config.redis_url)
        .await
        .expect("Failed to connect to the conversation store");

    let provider = ChatGptClient::new(config.completion_token.clone(), config.auth_mode);

    let relay = Arc::new(RelayService::new(store, provider, config.relay.clone()));

    // ========================================================================
    // DISCORD CLIENT SETUP
    // ========================================================================

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT; // Required to read message content

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(Handler::new(relay))
        .await
        .expect("Error creating client");

    if let Err(err) = client.start().await {
        tracing::error!(error = %err, "client error");
    }
}
