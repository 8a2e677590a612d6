//! Completion Request Adapter: resume + job description in, optimized resume out.
//!
//! One call to `optimize` issues at most one outbound request. There is no retry,
//! batching, streaming, or caching; identical inputs hit the provider every time.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::ProviderConfig;
use crate::errors::AppError;
use crate::llm_client::{
    ChatCompletionRequest, ChatMessage, ChatTransport, HttpChatTransport, ProviderReply,
};

pub mod handlers;
pub mod prompts;

use prompts::{build_optimize_prompt, FALLBACK_RESPONSE, OPTIMIZE_SYSTEM};

/// Success payload, serialized as `{ "optimizedResume": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedResume {
    pub optimized_resume: String,
}

#[derive(Clone)]
pub struct ResumeOptimizer {
    provider: ProviderConfig,
    transport: Arc<dyn ChatTransport>,
}

impl ResumeOptimizer {
    pub fn new(provider: ProviderConfig, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            provider,
            transport,
        }
    }

    /// Builds an optimizer that talks to the configured endpoint over HTTP.
    pub fn from_config(provider: ProviderConfig) -> Result<Self, reqwest::Error> {
        let transport = HttpChatTransport::new(&provider)?;
        Ok(Self::new(provider, Arc::new(transport)))
    }

    pub fn model(&self) -> &str {
        &self.provider.model
    }

    pub fn has_credential(&self) -> bool {
        self.provider.api_key.is_some()
    }

    pub fn build_request(&self, resume: &str, job_description: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.provider.model.clone(),
            messages: vec![
                ChatMessage::system(OPTIMIZE_SYSTEM),
                ChatMessage::user(build_optimize_prompt(resume, job_description)),
            ],
        }
    }

    pub async fn optimize(
        &self,
        resume: &str,
        job_description: &str,
    ) -> Result<OptimizedResume, AppError> {
        let api_key = self
            .provider
            .api_key
            .as_deref()
            .ok_or(AppError::MissingCredential)?;

        let request = self.build_request(resume, job_description);
        info!(
            model = %self.provider.model,
            resume_bytes = resume.len(),
            job_description_bytes = job_description.len(),
            "Sending optimization request"
        );

        let raw = self
            .transport
            .send(api_key, &request)
            .await
            .map_err(|e| AppError::UnknownFailure(e.to_string()))?;

        match ProviderReply::decode(raw) {
            ProviderReply::Success(completion) => {
                let optimized_resume = match completion.text() {
                    Some(text) => text.to_string(),
                    None => {
                        warn!("Provider success reply had no message content; using fallback");
                        FALLBACK_RESPONSE.to_string()
                    }
                };
                Ok(OptimizedResume { optimized_resume })
            }
            ProviderReply::MalformedJson { raw } => {
                Err(AppError::MalformedProviderResponse { raw })
            }
            ProviderReply::NonJsonType { content_type, raw } => {
                Err(AppError::UnexpectedProviderResponseType { content_type, raw })
            }
            ProviderReply::ProviderStatusError { status, body } => {
                Err(AppError::ProviderError { status, body })
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::llm_client::RawReply;

    /// Records every request and answers with a canned reply.
    pub(crate) struct FakeTransport {
        reply: RawReply,
        pub(crate) calls: Mutex<Vec<(String, ChatCompletionRequest)>>,
    }

    impl FakeTransport {
        pub(crate) fn new(status: u16, content_type: &str, body: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: RawReply {
                    status,
                    content_type: content_type.to_string(),
                    body: body.to_string(),
                },
                calls: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatTransport for FakeTransport {
        async fn send(
            &self,
            api_key: &str,
            request: &ChatCompletionRequest,
        ) -> Result<RawReply, reqwest::Error> {
            self.calls
                .lock()
                .unwrap()
                .push((api_key.to_string(), request.clone()));
            Ok(self.reply.clone())
        }
    }

    pub(crate) fn provider_with_key() -> ProviderConfig {
        ProviderConfig {
            api_key: Some("test-key".to_string()),
            ..ProviderConfig::default()
        }
    }

    fn optimizer(transport: &Arc<FakeTransport>) -> ResumeOptimizer {
        ResumeOptimizer::new(provider_with_key(), transport.clone())
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_call() {
        let transport = FakeTransport::new(200, "application/json", "{}");
        let optimizer = ResumeOptimizer::new(ProviderConfig::default(), transport.clone());

        let result = optimizer.optimize("resume", "jd").await;

        assert!(matches!(result, Err(AppError::MissingCredential)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_success_returns_first_choice_content() {
        let transport = FakeTransport::new(
            200,
            "application/json",
            r#"{"choices":[{"message":{"content":"X"}},{"message":{"content":"Y"}}]}"#,
        );

        let result = optimizer(&transport).optimize("resume", "jd").await.unwrap();

        assert_eq!(
            result,
            OptimizedResume {
                optimized_resume: "X".to_string()
            }
        );
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_sends_bearer_key_model_and_two_messages() {
        let transport = FakeTransport::new(
            200,
            "application/json",
            r#"{"choices":[{"message":{"content":"X"}}]}"#,
        );

        optimizer(&transport)
            .optimize("Jane Doe", "Rust Engineer")
            .await
            .unwrap();

        let calls = transport.calls.lock().unwrap();
        let (key, request) = &calls[0];
        assert_eq!(key, "test-key");
        assert_eq!(request.model, "mistral-7b-instruct");
        assert_eq!(
            request.messages,
            vec![
                ChatMessage::system("You are an expert in ATS resume optimization."),
                ChatMessage::user("Optimize this resume: Jane Doe for this job: Rust Engineer"),
            ]
        );
    }

    #[tokio::test]
    async fn test_rate_limit_is_provider_error_with_body() {
        let transport = FakeTransport::new(429, "application/json", r#"{"error":"rate limited"}"#);

        let result = optimizer(&transport).optimize("resume", "jd").await;

        match result {
            Err(AppError::ProviderError { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, json!({ "error": "rate limited" }));
            }
            other => panic!("expected provider error, got {other:?}"),
        }
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_html_reply_is_unexpected_type_with_raw_body() {
        let transport = FakeTransport::new(200, "text/html", "<html>Error</html>");

        let result = optimizer(&transport).optimize("resume", "jd").await;

        match result {
            Err(AppError::UnexpectedProviderResponseType { raw, .. }) => {
                assert_eq!(raw, "<html>Error</html>")
            }
            other => panic!("expected unexpected-type error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_choices_falls_back_to_placeholder() {
        let transport = FakeTransport::new(200, "application/json", r#"{"id":"cmpl-1"}"#);

        let result = optimizer(&transport).optimize("resume", "jd").await.unwrap();

        assert_eq!(result.optimized_resume, "Error processing response.");
    }

    #[tokio::test]
    async fn test_malformed_json_keeps_raw_body() {
        let transport = FakeTransport::new(200, "application/json", "{\"choices\": [");

        let result = optimizer(&transport).optimize("resume", "jd").await;

        assert!(matches!(
            result,
            Err(AppError::MalformedProviderResponse { ref raw }) if raw == "{\"choices\": ["
        ));
    }

    #[tokio::test]
    async fn test_each_call_hits_the_provider() {
        let transport = FakeTransport::new(
            200,
            "application/json",
            r#"{"choices":[{"message":{"content":"X"}}]}"#,
        );
        let optimizer = optimizer(&transport);

        optimizer.optimize("same", "same").await.unwrap();
        optimizer.optimize("same", "same").await.unwrap();

        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_unknown_failure() {
        let provider = ProviderConfig {
            api_url: "http://127.0.0.1:1/v1/chat/completions".to_string(),
            timeout_secs: 5,
            ..provider_with_key()
        };
        let optimizer = ResumeOptimizer::from_config(provider).unwrap();

        let result = optimizer.optimize("resume", "jd").await;

        assert!(matches!(result, Err(AppError::UnknownFailure(_))));
    }
}
