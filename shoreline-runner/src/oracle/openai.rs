//! OpenAI-compatible `/chat/completions` client.
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use shoreline_game::{Oracle, OracleError, OracleRequest};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const TEMPERATURE: f32 = 0.7;
const ERROR_BODY_LIMIT: usize = 300;

/// Connection settings, usually taken from flags or `OPENAI_*` variables.
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// One blocking HTTP request per [`Oracle::invoke`].
#[derive(Debug)]
pub struct OpenAiOracle {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiOracle {
    /// # Errors
    ///
    /// Returns [`OracleError::Transport`] when the HTTP client cannot be built.
    pub fn new(settings: OpenAiSettings) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: completions_endpoint(&settings.base_url),
            api_key: settings.api_key,
            model: settings.model,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Default, Deserialize)]
struct Choice {
    #[serde(default)]
    message: ChoiceMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    /// Trimmed text of the first choice; empty when there is none.
    fn into_text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default()
    }
}

fn completions_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

impl Oracle for OpenAiOracle {
    fn invoke(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(OracleError::Transport(format!(
                "HTTP {status}: {}",
                truncate(&text, ERROR_BODY_LIMIT)
            )));
        }
        let payload: ChatResponse = response
            .json()
            .map_err(|e| OracleError::Payload(e.to_string()))?;
        Ok(payload.into_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        assert_eq!(
            completions_endpoint("http://localhost:11434/v1/"),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(
            completions_endpoint(DEFAULT_BASE_URL),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn first_choice_is_trimmed() {
        let payload: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  ACTION_1: x\n"}},{"message":{"content":"ignored"}}]}"#,
        )
        .expect("valid payload");
        assert_eq!(payload.into_text(), "ACTION_1: x");
    }

    #[test]
    fn missing_content_reads_as_empty() {
        for raw in [
            r#"{"choices":[]}"#,
            r#"{}"#,
            r#"{"choices":[{"message":{"content":null}}]}"#,
            r#"{"choices":[{"finish_reason":"length"}]}"#,
        ] {
            let payload: ChatResponse = serde_json::from_str(raw).expect("valid payload");
            assert_eq!(payload.into_text(), "", "{raw}");
        }
    }

    #[test]
    fn request_body_carries_system_and_user_messages() {
        let body = ChatRequest {
            model: "m",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "be terse",
                },
                ChatMessage {
                    role: "user",
                    content: "hello",
                },
            ],
            temperature: TEMPERATURE,
        };
        let json = serde_json::to_value(&body).expect("serializes");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
        assert_eq!(json["model"], "m");
    }

    #[test]
    fn error_bodies_are_truncated_on_char_boundaries() {
        assert_eq!(truncate("海平面上升", 2), "海平");
        assert_eq!(truncate("short", 10), "short");
    }
}
