// Startup configuration, read once from the environment.
//
// The three credentials are hard requirements: without the Discord token, the
// completion token, or the store URI there is nothing useful the process can
// do, so loading fails before anything connects.

use crate::core::relay::RelayConfig;
use crate::infra::completion::AuthMode;
use anyhow::{bail, Context};
use std::time::Duration;

const DEFAULT_TRIGGER: &str = "??";
const DEFAULT_MAX_CHUNK_LEN: usize = 2000;
const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub completion_token: String,
    pub redis_url: String,
    pub auth_mode: AuthMode,
    pub relay: RelayConfig,
}

impl BotConfig {
    /// Loads the configuration from environment variables.
    ///
    /// Required: `DISCORD_TOKEN`, `OPENAI_TOKEN`, `REDIS_URL`.
    /// Optional: `OPENAI_AUTH_MODE` (`api-key` | `session-token`),
    /// `CHAT_TRIGGER`, `RESET_TRIGGER`, `PERSONA` / `PERSONA_FILE`,
    /// `MAX_CHUNK_LEN`, `COMPLETION_TIMEOUT_SECS`.
    pub fn from_env() -> anyhow::Result<Self> {
        let discord_token = required("DISCORD_TOKEN")?;
        let completion_token = required("OPENAI_TOKEN")?;
        let redis_url = required("REDIS_URL")?;

        let auth_mode = parse_auth_mode(std::env::var("OPENAI_AUTH_MODE").ok().as_deref())?;

        let trigger =
            std::env::var("CHAT_TRIGGER").unwrap_or_else(|_| DEFAULT_TRIGGER.to_string());
        if trigger.is_empty() {
            bail!("CHAT_TRIGGER must not be empty");
        }

        let reset_trigger = std::env::var("RESET_TRIGGER").ok().filter(|v| !v.is_empty());

        let max_chunk_len = match std::env::var("MAX_CHUNK_LEN") {
            Ok(raw) => {
                let len: usize = raw
                    .parse()
                    .context("MAX_CHUNK_LEN must be a positive integer")?;
                if len == 0 {
                    bail!("MAX_CHUNK_LEN must be a positive integer");
                }
                len
            }
            Err(_) => DEFAULT_MAX_CHUNK_LEN,
        };

        let completion_timeout = match std::env::var("COMPLETION_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.parse()
                    .context("COMPLETION_TIMEOUT_SECS must be a number of seconds")?,
            ),
            Err(_) => DEFAULT_COMPLETION_TIMEOUT,
        };

        Ok(Self {
            discord_token,
            completion_token,
            redis_url,
            auth_mode,
            relay: RelayConfig {
                trigger,
                reset_trigger,
                persona: load_persona(),
                max_chunk_len,
                completion_timeout,
            },
        })
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name).map_err(|_| anyhow::anyhow!("missing required environment variable {name}"))
}

fn parse_auth_mode(raw: Option<&str>) -> anyhow::Result<AuthMode> {
    match raw {
        None | Some("api-key") => Ok(AuthMode::ApiKey),
        Some("session-token") => Ok(AuthMode::SessionToken),
        Some(other) => bail!("unsupported OPENAI_AUTH_MODE: {other}"),
    }
}

/// `PERSONA_FILE` wins over `PERSONA`; a file that fails to read falls back
/// to the inline variable with a warning rather than aborting startup.
fn load_persona() -> Option<String> {
    let inline = std::env::var("PERSONA").ok().filter(|v| !v.is_empty());

    if let Ok(path) = std::env::var("PERSONA_FILE") {
        match std::fs::read_to_string(&path) {
            Ok(text) => return Some(text),
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "failed to read persona file");
            }
        }
    }

    inline
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_auth_mode() {
        assert_eq!(parse_auth_mode(None).unwrap(), AuthMode::ApiKey);
        assert_eq!(parse_auth_mode(Some("api-key")).unwrap(), AuthMode::ApiKey);
        assert_eq!(
            parse_auth_mode(Some("session-token")).unwrap(),
            AuthMode::SessionToken
        );
        assert!(parse_auth_mode(Some("oauth")).is_err());
    }
}
