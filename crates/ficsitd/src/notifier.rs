//! Message delivery to the chat platform.
//!
//! [`DiscordNotifier`] posts to a single channel through the Discord REST
//! API. It also performs the startup credential check.

use std::time::Duration;

use async_trait::async_trait;
use ficsit_core::format_mention;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{ConfigError, DiscordConfig};

/// Delivers a message or fails.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}

/// Delivery failures. Logged by the caller and never retried.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Failed to reach the chat platform: {0}")]
    Transport(String),

    #[error("Chat platform rejected the message (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// The bot account behind the token.
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

/// Posts messages to one Discord channel.
#[derive(Clone)]
pub struct DiscordNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
    channel_id: String,
    mention: Option<String>,
}

impl DiscordNotifier {
    /// Builds a notifier; `timeout` bounds every request.
    pub fn new(config: &DiscordConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(
                "DiscordBot (https://github.com/thenanox/ficsit-watch, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            token: config.token.clone(),
            channel_id: config.channel_id.clone(),
            mention: config.mention_role.as_deref().map(format_mention),
        })
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// Final message text, with the role mention prefix if configured.
    pub fn content(&self, message: &str) -> String {
        match &self.mention {
            Some(mention) => format!("{mention} {message}"),
            None => message.to_string(),
        }
    }

    /// Checks the bot token against `GET /users/@me`.
    ///
    /// # Errors
    ///
    /// - `ConfigError::CredentialRejected` on 401/403
    /// - `ConfigError::CredentialCheck` on any other failure
    pub async fn verify(&self) -> Result<BotUser, ConfigError> {
        let response = self
            .client
            .get(format!("{}/users/@me", self.api_base))
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .send()
            .await
            .map_err(|e| ConfigError::CredentialCheck {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ConfigError::CredentialRejected {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(ConfigError::CredentialCheck {
                reason: format!("unexpected status {status}"),
            });
        }

        response
            .json::<BotUser>()
            .await
            .map_err(|e| ConfigError::CredentialCheck {
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        let content = self.content(message);
        let response = self
            .client
            .post(format!(
                "{}/channels/{}/messages",
                self.api_base, self.channel_id
            ))
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .json(&CreateMessage { content: &content })
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(channel_id = %self.channel_id, "Notification delivered");
        Ok(())
    }
}
