/// LLM Client: the single point of entry for chat-completion calls.
///
/// ARCHITECTURAL RULE: No other module may call the provider API directly.
/// The transport only moves bytes; `ProviderReply::decode` classifies what came back
/// exactly once, so callers match on a closed set of outcomes.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::ProviderConfig;

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// The successful chat-completion shape. Every field is optional so that a
/// well-formed JSON body missing `choices` still decodes.
#[derive(Debug, Default, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

impl ChatCompletion {
    /// Content of the first choice's message, if present and non-empty.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// What came back over the wire, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawReply {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl RawReply {
    pub fn is_json(&self) -> bool {
        self.content_type
            .to_ascii_lowercase()
            .contains("application/json")
    }
}

/// The provider reply, classified once.
#[derive(Debug)]
pub enum ProviderReply {
    Success(ChatCompletion),
    /// Declared JSON but failed to parse.
    MalformedJson { raw: String },
    /// A 2xx reply whose Content-Type is not JSON.
    NonJsonType { content_type: String, raw: String },
    /// Any non-2xx reply. `body` is the parsed JSON when possible, else the raw text.
    ProviderStatusError { status: u16, body: Value },
}

impl ProviderReply {
    pub fn decode(reply: RawReply) -> Self {
        let success = (200..300).contains(&reply.status);

        if !success {
            let body = if reply.is_json() {
                serde_json::from_str(&reply.body).unwrap_or(Value::String(reply.body))
            } else {
                Value::String(reply.body)
            };
            return ProviderReply::ProviderStatusError {
                status: reply.status,
                body,
            };
        }

        if !reply.is_json() {
            return ProviderReply::NonJsonType {
                content_type: reply.content_type,
                raw: reply.body,
            };
        }

        // Only a top-level object can carry `choices`; `null`, arrays and scalars are
        // malformed. An object of the wrong shape (e.g. `choices` is a string) is a
        // success without usable content.
        match serde_json::from_str::<Value>(&reply.body) {
            Ok(value @ Value::Object(_)) => ProviderReply::Success(
                serde_json::from_value::<ChatCompletion>(value).unwrap_or_default(),
            ),
            _ => ProviderReply::MalformedJson { raw: reply.body },
        }
    }
}

/// The seam between the adapter and the network. Production uses `HttpChatTransport`;
/// tests substitute a recording fake.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<RawReply, reqwest::Error>;
}

/// Posts chat-completion requests to the configured provider endpoint.
#[derive(Clone)]
pub struct HttpChatTransport {
    client: Client,
    api_url: String,
}

impl HttpChatTransport {
    pub fn new(config: &ProviderConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
            api_url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<RawReply, reqwest::Error> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await?;

        debug!("Provider raw response (status {status}, {content_type}): {body}");

        Ok(RawReply {
            status,
            content_type,
            body,
        })
    }
}
