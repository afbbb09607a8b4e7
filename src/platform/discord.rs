//! Discord adapter for the platform seam.
//!
//! Login is authenticated against the REST API (`GET /users/@me`), which is
//! how Discord distinguishes a bad token (401) from a transport problem.
//! The realtime gateway protocol is deliberately not implemented here; the
//! events sender is held by the connection so transport glue can feed it.

use super::{ConnectError, Connection, InboundEvent, Platform};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct DiscordPlatform {
    http: reqwest::Client,
    api_base: String,
}

impl DiscordPlatform {
    pub fn new(api_base: &str) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Platform for DiscordPlatform {
    async fn connect(
        &self,
        token: &str,
        events: mpsc::Sender<InboundEvent>,
    ) -> Result<Arc<dyn Connection>, ConnectError> {
        let url = format!("{}/users/@me", self.api_base);
        let resp = self
            .http
            .get(&url)
            .header("Authorization", format!("Bot {token}"))
            .send()
            .await
            .map_err(|e| ConnectError::Network(e.to_string()))?;

        match resp.status() {
            s if s.is_success() => {}
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return Err(ConnectError::InvalidToken);
            }
            s => return Err(ConnectError::Network(format!("unexpected status {s}"))),
        }

        #[derive(serde::Deserialize)]
        struct Me {
            id: String,
            username: String,
        }
        let me: Me = resp
            .json()
            .await
            .map_err(|e| ConnectError::Network(e.to_string()))?;
        tracing::info!("bot logged in as {} ({})", me.username, me.id);

        Ok(Arc::new(DiscordConnection {
            http: self.http.clone(),
            api_base: self.api_base.clone(),
            token: token.to_string(),
            bot_user_id: me.id,
            _events: events,
        }))
    }
}

struct DiscordConnection {
    http: reqwest::Client,
    api_base: String,
    token: String,
    bot_user_id: String,
    // Kept alive for the transport that feeds inbound events.
    _events: mpsc::Sender<InboundEvent>,
}

#[async_trait]
impl Connection for DiscordConnection {
    async fn send(&self, channel_id: &str, text: &str) -> anyhow::Result<()> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);
        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .json(&serde_json::json!({ "content": text }))
            .send()
            .await?;
        if !resp.status().is_success() {
            anyhow::bail!("message post failed with status {}", resp.status());
        }
        Ok(())
    }

    async fn close(&self) {
        // REST sessions hold no server-side state to tear down.
        tracing::info!("closed connection for bot user {}", self.bot_user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        // Reserved TEST-NET-1 address, nothing listens there.
        let platform = DiscordPlatform::new("http://192.0.2.1:9");
        let (tx, _rx) = mpsc::channel(1);
        let err = tokio::time::timeout(
            std::time::Duration::from_secs(20),
            platform.connect("not-a-real-token", tx),
        )
        .await
        .expect("client timeout should fire first")
        .err()
        .expect("connect must fail");
        assert!(matches!(err, ConnectError::Network(_)));
    }

    #[test]
    fn api_base_trailing_slash_is_normalized() {
        let platform = DiscordPlatform::new("https://discord.com/api/v10/");
        assert_eq!(platform.api_base, "https://discord.com/api/v10");
    }
}
