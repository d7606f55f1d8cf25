//! Mock provider for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use transdrill_core::traits::{CompletionRequest, CompletionResponse, LlmProvider};

type ErrorFactory = Box<dyn Fn() -> anyhow::Error + Send + Sync>;

/// A mock LLM provider for exercising the scoring and generation clients
/// without real API calls.
///
/// Returns configurable responses based on prompt content matching, or
/// fails every call with an injected error.
pub struct MockProvider {
    /// Map of prompt substring → response text.
    responses: HashMap<String, String>,
    /// Default response if no prompt matches.
    default_response: String,
    /// When set, every call fails with this error.
    failure: Option<ErrorFactory>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last request received.
    last_request: Mutex<Option<CompletionRequest>>,
}

impl MockProvider {
    /// Create a new mock provider with the given prompt→response mappings.
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            responses,
            default_response: "{}".to_string(),
            failure: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            default_response: response.to_string(),
            ..Self::new(HashMap::new())
        }
    }

    /// Create a mock whose every call fails with the error `make_error` builds.
    pub fn failing<F>(make_error: F) -> Self
    where
        F: Fn() -> anyhow::Error + Send + Sync + 'static,
    {
        Self {
            failure: Some(Box::new(make_error)),
            ..Self::new(HashMap::new())
        }
    }

    /// Get the number of calls made to this provider.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this provider.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<CompletionResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        if let Some(make_error) = &self.failure {
            return Err(make_error());
        }

        let content = self
            .responses
            .iter()
            .find(|(key, _)| request.prompt.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_response.clone());

        Ok(CompletionResponse {
            content,
            model: request.model.clone(),
            latency_ms: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transdrill_core::error::ProviderError;

    fn request(prompt: &str) -> CompletionRequest {
        CompletionRequest {
            model: "mock".into(),
            system_prompt: String::new(),
            prompt: prompt.into(),
            max_tokens: 100,
            temperature: 0.0,
            json_mode: true,
        }
    }

    #[tokio::test]
    async fn fixed_response() {
        let provider = MockProvider::with_fixed_response(r#"{"score": 90}"#);
        let response = provider.complete(&request("anything")).await.unwrap();
        assert_eq!(response.content, r#"{"score": 90}"#);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.last_request().unwrap().prompt, "anything");
    }

    #[tokio::test]
    async fn prompt_matching() {
        let mut responses = HashMap::new();
        responses.insert("environment".to_string(), r#"{"score": 70}"#.to_string());
        responses.insert("education".to_string(), r#"{"score": 40}"#.to_string());
        let provider = MockProvider::new(responses);

        let resp = provider
            .complete(&request("Topic: environment"))
            .await
            .unwrap();
        assert!(resp.content.contains("70"));

        let resp = provider.complete(&request("Topic: sport")).await.unwrap();
        assert_eq!(resp.content, "{}");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn injected_failure() {
        let provider = MockProvider::failing(|| ProviderError::Timeout(60).into());
        let err = provider.complete(&request("x")).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert_eq!(provider.call_count(), 1);
    }
}
