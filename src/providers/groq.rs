//! Groq adapter speaking the OpenAI-compatible chat completions API.

use super::{ChatError, ChatProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct GroqProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl GroqProvider {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[async_trait]
impl ChatProvider for GroqProvider {
    async fn complete(
        &self,
        api_key: &str,
        system_preamble: &str,
        prompt: &str,
    ) -> Result<String, ChatError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system",
                    content: system_preamble.to_string(),
                },
                Message {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Other(e.into()))?;

        match resp.status() {
            s if s.is_success() => {}
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return Err(ChatError::Unauthorized);
            }
            s => {
                // Body may carry provider diagnostics but also echoes of the
                // request; log the status only.
                return Err(ChatError::Other(anyhow::anyhow!(
                    "chat completion returned status {s}"
                )));
            }
        }

        let body: ChatResponse = resp.json().await.map_err(|e| ChatError::Other(e.into()))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ChatError::Other(anyhow::anyhow!("completion had no choices")))?;
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let p = GroqProvider::new("https://api.groq.com/openai/", "llama-3.3-70b-versatile");
        assert_eq!(p.base_url, "https://api.groq.com/openai");
    }

    #[test]
    fn request_shape_matches_chat_completions() {
        let request = ChatRequest {
            model: "llama-3.3-70b-versatile".into(),
            messages: vec![
                Message {
                    role: "system",
                    content: "preamble".into(),
                },
                Message {
                    role: "user",
                    content: "hello".into(),
                },
            ],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama-3.3-70b-versatile");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
    }

    #[test]
    fn response_parses_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hi there"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "hi there");
    }
}
