use crate::config::{Credential, ResolvedEndpoint};
use crate::{LlmError, LlmResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Appended to the user message when a previous reply could not be parsed.
pub const JSON_ONLY_REMINDER: &str = "IMPORTANT: Respond with pure JSON only. Do not include \
markdown formatting, code fences, or any explanatory text outside the JSON object.";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// A system instruction plus one user message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// The same request with the pure-JSON reminder appended to the user message.
    pub fn with_json_reminder(&self) -> Self {
        Self {
            system: self.system.clone(),
            user: format!("{}\n\n{}", self.user, JSON_ONLY_REMINDER),
        }
    }
}

/// A chat-completion backend that turns a request into reply text.
///
/// Any error is treated as a transport failure by the invocation manager; a timeout is an
/// error like any other.
#[async_trait]
pub trait ChatEndpoint: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: &ChatRequest) -> LlmResult<String>;
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    messages: [WireMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireReplyMessage,
}

#[derive(Debug, Deserialize)]
struct WireReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Azure OpenAI style deployment endpoint.
pub struct AzureChatEndpoint {
    name: String,
    url: String,
    max_tokens: Option<u32>,
    credential: Credential,
    client: reqwest::Client,
}

impl std::fmt::Debug for AzureChatEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureChatEndpoint")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("max_tokens", &self.max_tokens)
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl AzureChatEndpoint {
    pub fn new(endpoint: ResolvedEndpoint) -> LlmResult<Self> {
        Self::with_timeout(endpoint, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(endpoint: ResolvedEndpoint, timeout: Duration) -> LlmResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        let config = endpoint.config;
        Ok(Self {
            url: deployment_url(&config.base_url, &config.model, &config.api_version),
            name: config.name,
            max_tokens: config.max_tokens,
            credential: endpoint.credential,
            client,
        })
    }

    fn transport(&self, message: impl Into<String>) -> LlmError {
        LlmError::Transport {
            endpoint: self.name.clone(),
            message: message.into(),
        }
    }
}

fn deployment_url(base_url: &str, model: &str, api_version: &str) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        base_url.trim_end_matches('/'),
        model,
        api_version
    )
}

#[async_trait]
impl ChatEndpoint for AzureChatEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &ChatRequest) -> LlmResult<String> {
        let body = WireRequest {
            messages: [
                WireMessage {
                    role: "system",
                    content: &request.system,
                },
                WireMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.url)
            .header("api-key", self.credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    self.transport("request timed out")
                } else {
                    self.transport(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.transport(format!("HTTP {status}: {text}")));
        }

        let reply: WireResponse = response
            .json()
            .await
            .map_err(|e| self.transport(format!("invalid response body: {e}")))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| self.transport("response contained no choices"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;

    fn resolved() -> ResolvedEndpoint {
        ResolvedEndpoint {
            config: EndpointConfig {
                name: "east".into(),
                base_url: "https://east.example.test/".into(),
                model: "gpt-4o".into(),
                api_version: "2024-08-01-preview".into(),
                max_tokens: Some(512),
                api_key_env: "EAST_KEY".into(),
            },
            credential: Credential::new("top-secret"),
        }
    }

    #[test]
    fn json_reminder_is_appended_to_user_message_only() {
        let request = ChatRequest::new("be precise", "review patient 4");
        let retried = request.with_json_reminder();
        assert_eq!(retried.system, "be precise");
        assert!(retried.user.starts_with("review patient 4\n\n"));
        assert!(retried.user.ends_with(JSON_ONLY_REMINDER));
    }

    #[test]
    fn deployment_url_joins_without_double_slash() {
        assert_eq!(
            deployment_url("https://east.example.test/", "gpt-4o", "2024-08-01-preview"),
            "https://east.example.test/openai/deployments/gpt-4o/chat/completions?api-version=2024-08-01-preview"
        );
    }

    #[test]
    fn request_body_omits_unset_max_tokens() {
        let body = WireRequest {
            messages: [
                WireMessage {
                    role: "system",
                    content: "s",
                },
                WireMessage {
                    role: "user",
                    content: "u",
                },
            ],
            max_tokens: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["messages"][1]["role"], "user");
    }

    #[test]
    fn debug_output_redacts_key() {
        let endpoint = AzureChatEndpoint::new(resolved()).unwrap();
        let debug = format!("{endpoint:?}");
        assert!(!debug.contains("top-secret"));
        assert_eq!(endpoint.name(), "east");
    }
}
