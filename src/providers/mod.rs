pub mod groq;

use async_trait::async_trait;

/// Chat-completion failures the router must tell apart: a rejected key
/// means "tell the admin to reset it", anything else is "try again later".
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("the LLM API rejected the configured key")]
    Unauthorized,
    #[error("chat completion failed: {0}")]
    Other(#[from] anyhow::Error),
}

/// Opaque chat-completion collaborator: plaintext key + preamble + prompt
/// in, a single completion string out.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(
        &self,
        api_key: &str,
        system_preamble: &str,
        prompt: &str,
    ) -> Result<String, ChatError>;
}
