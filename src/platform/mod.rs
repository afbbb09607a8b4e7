//! Seam to the messaging platform.
//!
//! The supervisor only ever talks to these traits, so tests (and any future
//! transport) can swap in their own implementation. Inbound events are
//! pushed through an mpsc sender handed over at connect time, decoupling
//! arrival from processing.

pub mod discord;

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// An inbound command or message event for one tenant.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub tenant_id: String,
    pub channel_id: String,
    pub sender_id: String,
    /// Whether the platform attests the sender holds admin rights in the
    /// tenant. Admin-only commands are refused without it.
    pub sender_is_admin: bool,
    pub kind: EventKind,
}

#[derive(Debug, Clone)]
pub enum EventKind {
    SlashCommand {
        name: String,
        options: HashMap<String, String>,
    },
    /// The bot was mentioned; `content` has the mention itself stripped.
    Mention { content: String },
}

/// Login failure modes the supervisor must tell apart: a rejected credential
/// needs an admin to act, a network error is retryable.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("the platform rejected the bot token")]
    InvalidToken,
    #[error("network error during login: {0}")]
    Network(String),
}

#[async_trait]
pub trait Platform: Send + Sync {
    /// Authenticate `token` and open a connection. Events for this tenant
    /// are delivered through `events` for as long as the connection lives.
    async fn connect(
        &self,
        token: &str,
        events: mpsc::Sender<InboundEvent>,
    ) -> Result<std::sync::Arc<dyn Connection>, ConnectError>;
}

/// A live, authenticated connection for one tenant.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Post a reply into a channel. Errors are reported, never fatal.
    async fn send(&self, channel_id: &str, text: &str) -> anyhow::Result<()>;

    /// Close the connection. Idempotent.
    async fn close(&self);
}
