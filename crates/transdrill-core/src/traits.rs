//! Core trait definitions: the LLM transport, the two AI-backed services the
//! session consumes, and the progress sink it reports mastery to.
//!
//! The async traits are implemented in `transdrill-providers`; the core crate
//! ships offline implementations of the scorer and the progress sink.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{ExerciseContent, SubmissionResult};

// ---------------------------------------------------------------------------
// LLM Provider trait
// ---------------------------------------------------------------------------

/// Trait for chat-completion backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "openai").
    fn name(&self) -> &str;

    /// Run one completion. Failures carry a [`crate::error::ProviderError`]
    /// when the cause is known.
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<CompletionResponse>;
}

/// Request for a single chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier (e.g. "gpt-4o-mini").
    pub model: String,
    /// System prompt.
    pub system_prompt: String,
    /// The user prompt.
    pub prompt: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Ask the backend to constrain output to a JSON object.
    #[serde(default)]
    pub json_mode: bool,
}

/// Response from a chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The raw response text.
    pub content: String,
    /// Model that actually answered.
    pub model: String,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

// ---------------------------------------------------------------------------
// Services consumed by the session
// ---------------------------------------------------------------------------

/// Scores a learner's answer against the reference translation.
///
/// Implementations never fail: every failure resolves to a well-formed result.
#[async_trait]
pub trait AnswerScorer: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(
        &self,
        user_answer: &str,
        reference_answer: &str,
        context_note: Option<&str>,
    ) -> SubmissionResult;
}

/// Produces a new sentence pair with the same grammatical pattern as the
/// current one, on a different topic.
///
/// Implementations never fail: on error they return
/// [`ExerciseContent::generation_failed`] or some other usable content.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_similar(
        &self,
        current: &ExerciseContent,
        topic_hint: Option<&str>,
    ) -> ExerciseContent;
}

/// Receives the "level mastered" signal. Unlock and advance semantics belong
/// to the implementation.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn level_mastered(&self, level_id: u32) -> anyhow::Result<()>;
}

/// A sink that drops the signal, for sessions without persistence.
pub struct NoopProgress;

#[async_trait]
impl ProgressSink for NoopProgress {
    async fn level_mastered(&self, _: u32) -> anyhow::Result<()> {
        Ok(())
    }
}
