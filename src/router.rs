//! Inbound command dispatch.
//!
//! Events are parsed into a closed [`Command`] enum once, then dispatched
//! through an exhaustive match — adding a command without a handler is a
//! compile error. Replies to admins are actionable; replies to end users on
//! internal failures stay generic and never carry secret material.

use crate::credentials::{CredentialError, CredentialService};
use crate::platform::{EventKind, InboundEvent};
use crate::providers::{ChatError, ChatProvider};
use crate::store::SecretName;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Hello,
    SetKey { key: String },
    RemoveKey,
    Chat { prompt: String },
}

impl Command {
    /// Map a platform event to a command. `None` means "not for us".
    pub fn parse(kind: &EventKind) -> Option<Command> {
        match kind {
            EventKind::SlashCommand { name, options } => match name.as_str() {
                "setkey" => Some(Command::SetKey {
                    key: options.get("key").cloned().unwrap_or_default(),
                }),
                "removekey" => Some(Command::RemoveKey),
                "chatbot" => Some(Command::Chat {
                    prompt: options.get("prompt").cloned().unwrap_or_default(),
                }),
                _ => None,
            },
            EventKind::Mention { content } => {
                let content = content.trim();
                if content.is_empty() {
                    Some(Command::Hello)
                } else if content.eq_ignore_ascii_case("ping") {
                    Some(Command::Ping)
                } else {
                    Some(Command::Chat {
                        prompt: content.to_string(),
                    })
                }
            }
        }
    }
}

/// A reply heading back to the platform.
#[derive(Debug, Clone)]
pub struct OutboundReply {
    pub tenant_id: String,
    pub channel_id: String,
    pub text: String,
}

pub struct CommandRouter {
    credentials: Arc<CredentialService>,
    provider: Arc<dyn ChatProvider>,
    system_preamble: String,
}

impl CommandRouter {
    pub fn new(
        credentials: Arc<CredentialService>,
        provider: Arc<dyn ChatProvider>,
        system_preamble: &str,
    ) -> Self {
        Self {
            credentials,
            provider,
            system_preamble: system_preamble.to_string(),
        }
    }

    /// Consume inbound events until the channel closes, pushing replies to
    /// `replies`.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<InboundEvent>,
        replies: mpsc::Sender<OutboundReply>,
    ) {
        while let Some(event) = events.recv().await {
            let text = self.handle(&event).await;
            let reply = OutboundReply {
                tenant_id: event.tenant_id,
                channel_id: event.channel_id,
                text,
            };
            if replies.send(reply).await.is_err() {
                break;
            }
        }
    }

    /// Produce the reply text for one event.
    pub async fn handle(&self, event: &InboundEvent) -> String {
        let Some(command) = Command::parse(&event.kind) else {
            return "Unknown command.".to_string();
        };

        match command {
            Command::Ping => "Pong!".to_string(),
            Command::Hello => {
                "Hello! Mention me with a prompt or use /chatbot to talk to the AI.".to_string()
            }
            Command::SetKey { key } => self.set_key(event, &key),
            Command::RemoveKey => self.remove_key(event),
            Command::Chat { prompt } => self.chat(event, &prompt).await,
        }
    }

    fn set_key(&self, event: &InboundEvent, key: &str) -> String {
        if !event.sender_is_admin {
            return "Only server administrators can set the API key.".to_string();
        }
        match self
            .credentials
            .set(&event.tenant_id, SecretName::LlmApiKey, key)
        {
            Ok(()) => {
                tracing::info!(
                    "API key set for tenant {} by {}",
                    event.tenant_id,
                    event.sender_id
                );
                "Your Groq API key has been securely stored for this server. \
                 AI replies are now enabled."
                    .to_string()
            }
            Err(CredentialError::Validation(msg)) => {
                format!("{msg}. Please double-check it.")
            }
            Err(e) => {
                tracing::error!("storing key for tenant {} failed: {}", event.tenant_id, e);
                "There was an error storing your key. Please try again later.".to_string()
            }
        }
    }

    fn remove_key(&self, event: &InboundEvent) -> String {
        if !event.sender_is_admin {
            return "Only server administrators can remove the API key.".to_string();
        }
        match self
            .credentials
            .remove(&event.tenant_id, SecretName::LlmApiKey)
        {
            Ok(true) => {
                tracing::info!(
                    "API key removed for tenant {} by {}",
                    event.tenant_id,
                    event.sender_id
                );
                "The API key for this server has been removed. AI replies are disabled."
                    .to_string()
            }
            Ok(false) => "No API key was stored for this server.".to_string(),
            Err(e) => {
                tracing::error!("removing key for tenant {} failed: {}", event.tenant_id, e);
                "There was an error removing the key. Please try again later.".to_string()
            }
        }
    }

    async fn chat(&self, event: &InboundEvent, prompt: &str) -> String {
        if prompt.trim().is_empty() {
            return "Please include a prompt, e.g. `/chatbot what is the capital of France?`"
                .to_string();
        }

        let api_key = match self
            .credentials
            .get_plaintext(&event.tenant_id, SecretName::LlmApiKey)
        {
            Ok(Some(key)) => key,
            Ok(None) => {
                return "No API key is configured for this server. \
                        An administrator can set one with /setkey."
                    .to_string();
            }
            Err(CredentialError::Decryption) => {
                return "The stored API key can no longer be read. \
                        An administrator must reset it with /setkey."
                    .to_string();
            }
            Err(e) => {
                tracing::error!("key lookup for tenant {} failed: {}", event.tenant_id, e);
                return "Something went wrong. Please try again later.".to_string();
            }
        };

        match self
            .provider
            .complete(&api_key, &self.system_preamble, prompt)
            .await
        {
            Ok(completion) => completion,
            Err(ChatError::Unauthorized) => {
                "The AI provider rejected this server's API key. \
                 An administrator should reset it with /setkey."
                    .to_string()
            }
            Err(ChatError::Other(e)) => {
                tracing::error!("chat completion for tenant {} failed: {}", event.tenant_id, e);
                "There was an error talking to the AI. Please try again later.".to_string()
            }
        }
    }
}
