//! LLM-backed answer scoring.
//!
//! [`OracleScorer`] asks a chat model to grade a translation against the
//! reference and degrades to local similarity scoring whenever the model is
//! unreachable or its reply is unusable. It never returns an error.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{instrument, warn};

use transdrill_core::error::FallbackReason;
use transdrill_core::model::SubmissionResult;
use transdrill_core::reply::{parse_score_reply, ReplyError};
use transdrill_core::similarity;
use transdrill_core::traits::{AnswerScorer, CompletionRequest, LlmProvider};

/// Longest answer, reference or context embedded in a prompt, in characters.
pub const MAX_PROMPT_TEXT_CHARS: usize = 1_000;

/// Feedback returned when no API key is configured.
pub const UNCONFIGURED_FEEDBACK: &str = "AI scoring is not configured. Set an OpenAI API key (OPENAI_API_KEY or transdrill.toml) to get graded feedback.";

const SYSTEM_PROMPT: &str =
    "You are an expert IELTS Writing tutor. Always respond with valid JSON only, no additional text.";

/// Model parameters for scoring calls.
#[derive(Debug, Clone)]
pub struct OracleSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            temperature: 0.3,
            max_tokens: 1024,
        }
    }
}

/// Truncate to at most `max` characters, marking the cut.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// Build the grading prompt.
pub fn build_scoring_prompt(
    user_answer: &str,
    reference_answer: &str,
    context_note: Option<&str>,
) -> String {
    let reference = truncate_chars(reference_answer, MAX_PROMPT_TEXT_CHARS);
    let answer = truncate_chars(user_answer, MAX_PROMPT_TEXT_CHARS);
    let context = context_note
        .map(|c| truncate_chars(c, MAX_PROMPT_TEXT_CHARS))
        .filter(|c| !c.is_empty())
        .map(|c| format!("Context/Topic: {c}\n"))
        .unwrap_or_default();

    format!(
        r#"You are a strict IELTS Writing Tutor. Compare the student's sentence with the Model Answer.

Model Answer: "{reference}"
Student's Answer: "{answer}"
{context}
Please analyze the student's answer and assess:
1. Collocation Check: Did they use the key phrases from the model answer?
2. Grammar & Tone: Is it formal enough for IELTS Writing?
3. Accuracy: How close is it to the model answer?

Output your response as a JSON object with this exact structure:
{{
  "score": <integer percentage from 0 to 100>,
  "feedback": "<detailed feedback in English explaining what is good and what needs improvement>",
  "diff": [
    {{"word": "<word from model answer>", "status": "correct" | "wrong" | "missing"}}
  ]
}}

The score is a percentage from 0 to 100. Do NOT use the IELTS 0-9 band scale.

The "diff" array should contain all significant words/phrases from the model answer, marking them as:
- "correct": the student used a similar/equivalent word
- "wrong": the student used a different word that changes meaning
- "missing": the student did not include this word/phrase

Be strict but fair."#
    )
}

/// The result returned without calling out when no API key is configured.
pub fn unconfigured_result() -> SubmissionResult {
    SubmissionResult {
        score: 0,
        feedback: UNCONFIGURED_FEEDBACK.to_string(),
        diff: Vec::new(),
    }
}

/// Answer scorer backed by an LLM, with local fallback.
pub struct OracleScorer {
    provider: Option<Arc<dyn LlmProvider>>,
    settings: OracleSettings,
}

impl OracleScorer {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: OracleSettings) -> Self {
        Self {
            provider: Some(provider),
            settings,
        }
    }

    /// A scorer with no credential: every evaluation returns
    /// [`unconfigured_result`] without touching the network.
    pub fn unconfigured() -> Self {
        Self {
            provider: None,
            settings: OracleSettings::default(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn settings(&self) -> &OracleSettings {
        &self.settings
    }
}

#[async_trait]
impl AnswerScorer for OracleScorer {
    fn name(&self) -> &str {
        "oracle"
    }

    #[instrument(skip_all, fields(model = %self.settings.model))]
    async fn evaluate(
        &self,
        user_answer: &str,
        reference_answer: &str,
        context_note: Option<&str>,
    ) -> SubmissionResult {
        let Some(provider) = &self.provider else {
            return unconfigured_result();
        };

        let request = CompletionRequest {
            model: self.settings.model.clone(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            prompt: build_scoring_prompt(user_answer, reference_answer, context_note),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            json_mode: true,
        };

        let response = match provider.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                let reason = FallbackReason::classify(&e);
                warn!("scoring call failed ({reason}): {e:#}; using similarity fallback");
                let mut fallback = similarity::score(user_answer, reference_answer);
                fallback.feedback = reason.annotate(&fallback.feedback);
                return fallback;
            }
        };

        match parse_score_reply(&response.content) {
            Ok(result) => {
                tracing::debug!(score = result.score, latency_ms = response.latency_ms, "scored");
                result
            }
            Err(ReplyError::Remote(message)) => {
                let reason = FallbackReason::from_remote_message(&message);
                warn!("scoring service reported an error ({reason}): {message}; using similarity fallback");
                let mut fallback = similarity::score(user_answer, reference_answer);
                fallback.feedback = reason.annotate(&fallback.feedback);
                fallback
            }
            Err(e) => {
                warn!("unusable scoring reply ({e}); using similarity fallback");
                similarity::score(user_answer, reference_answer)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;
    use crate::openai::OpenAiProvider;
    use transdrill_core::error::ProviderError;
    use transdrill_core::model::{DiffStatus, WordDiffEntry};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scorer(provider: Arc<MockProvider>) -> OracleScorer {
        OracleScorer::new(provider, OracleSettings::default())
    }

    #[tokio::test]
    async fn well_formed_reply_is_used() {
        let provider = Arc::new(MockProvider::with_fixed_response(
            r#"{"score": 76, "feedback": "Close.", "diff": [{"word": "there", "status": "wrong"}]}"#,
        ));
        let result = scorer(provider.clone())
            .evaluate("hello world", "hello there", Some("greetings"))
            .await;

        assert_eq!(result.score, 76);
        assert_eq!(result.feedback, "Close.");
        assert_eq!(
            result.diff,
            vec![WordDiffEntry::new("there", DiffStatus::Mismatched)]
        );

        let request = provider.last_request().unwrap();
        assert!(request.json_mode);
        assert!(request.prompt.contains("Context/Topic: greetings"));
        assert!(request.prompt.contains("Model Answer: \"hello there\""));
    }

    #[tokio::test]
    async fn band_score_is_normalized() {
        let provider = Arc::new(MockProvider::with_fixed_response(
            r#"{"score": 8, "feedback": "Band 8 work."}"#,
        ));
        let result = scorer(provider).evaluate("a", "b", None).await;
        assert_eq!(result.score, 85);
    }

    #[tokio::test]
    async fn empty_object_falls_back_to_similarity() {
        let provider = Arc::new(MockProvider::with_fixed_response("{}"));
        let result = scorer(provider)
            .evaluate("hello world", "hello there", None)
            .await;
        assert_eq!(result, similarity::score("hello world", "hello there"));
    }

    #[tokio::test]
    async fn non_json_reply_falls_back() {
        let provider = Arc::new(MockProvider::with_fixed_response(
            "I would give this an 8 out of 9.",
        ));
        let result = scorer(provider)
            .evaluate("hello world", "hello there", None)
            .await;
        assert_eq!(result, similarity::score("hello world", "hello there"));
    }

    #[tokio::test]
    async fn error_envelope_falls_back_with_tag() {
        let provider = Arc::new(MockProvider::with_fixed_response(
            r#"{"error": "Internal server error", "message": "boom"}"#,
        ));
        let result = scorer(provider).evaluate("same", "same", None).await;
        assert_eq!(result.score, 100);
        assert!(result.feedback.starts_with("[service_error] "));
    }

    #[tokio::test]
    async fn rate_limit_envelope_is_tagged() {
        let provider = Arc::new(MockProvider::with_fixed_response(
            r#"{"error": "rate limit", "message": "slow down"}"#,
        ));
        let result = scorer(provider)
            .evaluate("hello world", "hello there", None)
            .await;

        let fallback = similarity::score("hello world", "hello there");
        assert_eq!(result.score, fallback.score);
        assert_eq!(
            result.feedback,
            FallbackReason::RateLimited.annotate(&fallback.feedback)
        );
    }

    #[tokio::test]
    async fn transport_failure_is_tagged() {
        let provider = Arc::new(MockProvider::failing(|| {
            ProviderError::AuthenticationFailed("invalid key".into()).into()
        }));
        let result = scorer(provider)
            .evaluate("hello world", "hello there", None)
            .await;

        let fallback = similarity::score("hello world", "hello there");
        assert_eq!(result.score, fallback.score);
        assert_eq!(result.diff, fallback.diff);
        assert!(result.feedback.starts_with("[auth_failed] "));
        assert!(result.feedback.ends_with(&fallback.feedback));
    }

    #[tokio::test]
    async fn unconfigured_returns_placeholder() {
        let result = OracleScorer::unconfigured()
            .evaluate("hello world", "hello there", None)
            .await;
        assert_eq!(result, unconfigured_result());
        assert!(!OracleScorer::unconfigured().is_configured());
    }

    #[tokio::test]
    async fn rate_limited_http_response_is_tagged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("key", Some(server.uri()), None, 5).unwrap();
        let scorer = OracleScorer::new(Arc::new(provider), OracleSettings::default());
        let result = scorer.evaluate("hello world", "hello there", None).await;
        assert_eq!(result.score, 50);
        assert!(result.feedback.starts_with("[rate_limited] "));
    }

    #[tokio::test]
    async fn unreachable_server_is_tagged() {
        // Nothing listens on port 9 of localhost
        let provider =
            OpenAiProvider::new("key", Some("http://127.0.0.1:9".into()), None, 2).unwrap();
        let scorer = OracleScorer::new(Arc::new(provider), OracleSettings::default());
        let result = scorer.evaluate("a b", "a b", None).await;
        assert_eq!(result.score, 100);
        assert!(result.feedback.starts_with("[network_unreachable] "));
    }

    #[test]
    fn prompt_is_bounded() {
        let long_answer = "word ".repeat(2_000);
        let prompt = build_scoring_prompt(&long_answer, "reference", None);
        assert!(prompt.chars().count() < 4_000);
        assert!(prompt.contains('…'));
        assert!(prompt.contains("0 to 100"));
        assert!(!prompt.contains("Context/Topic"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("预期寿命显著延长", 4), "预期寿命…");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
