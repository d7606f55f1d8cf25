//! Question generation: new sentence pairs that reuse the grammatical pattern
//! of the current one on a different topic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{instrument, warn};

use transdrill_core::error::FallbackReason;
use transdrill_core::model::ExerciseContent;
use transdrill_core::reply::parse_question_reply;
use transdrill_core::traits::{CompletionRequest, LlmProvider, QuestionGenerator};

use crate::oracle::{truncate_chars, MAX_PROMPT_TEXT_CHARS};

/// Topic used by the template generator when none is given.
pub const DEFAULT_TEMPLATE_TOPIC: &str = "this topic";

const SYSTEM_PROMPT: &str =
    "You are an expert IELTS Writing tutor. Always respond with valid JSON only, no additional text.";

/// Model parameters for generation calls.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

/// Build the generation prompt.
pub fn build_generation_prompt(current: &ExerciseContent, topic_hint: Option<&str>) -> String {
    let source = truncate_chars(&current.source_text, MAX_PROMPT_TEXT_CHARS);
    let reference = truncate_chars(&current.reference_translation, MAX_PROMPT_TEXT_CHARS);
    let topic_line = match topic_hint.map(str::trim).filter(|t| !t.is_empty()) {
        Some(topic) => format!("New Topic: {}", truncate_chars(topic, MAX_PROMPT_TEXT_CHARS)),
        None => "Generate a new topic related to IELTS Writing Task 2".to_string(),
    };

    format!(
        r#"You are an IELTS Writing tutor. Analyze the grammatical structure of the provided English sentence and generate a NEW Chinese-English translation pair.

Current Chinese: "{source}"
Current English: "{reference}"
{topic_line}

Your task:
1. Identify the key grammatical structure used in the current English sentence (e.g., "not only... but also...", "It is... that...", passive voice, etc.)
2. Generate a NEW Chinese sentence that uses the SAME grammatical structure but discusses a DIFFERENT topic (use the provided topic if given, otherwise choose a common IELTS topic like education, environment, technology, etc.)
3. Provide the English translation that maintains the same structure
4. Explain why this structure is useful for IELTS Writing

Output your response as a JSON object with this exact structure:
{{
  "chinese": "<new Chinese sentence>",
  "standardEnglish": "<new English sentence using the same structure>",
  "explanation": "<brief explanation of the grammatical structure and why it's useful for IELTS Writing>"
}}

Make sure the new sentence is:
- Formally written (appropriate for IELTS Writing Task 2)
- Uses the same grammatical structure as the original
- Discusses a different topic
- Is realistic and natural"#
    )
}

/// Generator backed by an LLM. Any failure yields
/// [`ExerciseContent::generation_failed`].
pub struct LlmQuestionGenerator {
    provider: Arc<dyn LlmProvider>,
    settings: GeneratorSettings,
}

impl LlmQuestionGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: GeneratorSettings) -> Self {
        Self { provider, settings }
    }
}

#[async_trait]
impl QuestionGenerator for LlmQuestionGenerator {
    fn name(&self) -> &str {
        "llm"
    }

    #[instrument(skip_all, fields(model = %self.settings.model))]
    async fn generate_similar(
        &self,
        current: &ExerciseContent,
        topic_hint: Option<&str>,
    ) -> ExerciseContent {
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            prompt: build_generation_prompt(current, topic_hint),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            json_mode: true,
        };

        let response = match self.provider.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                let reason = FallbackReason::classify(&e);
                warn!("generation call failed ({reason}): {e:#}");
                return ExerciseContent::generation_failed();
            }
        };

        match parse_question_reply(&response.content) {
            Ok(content) => content,
            Err(e) => {
                warn!("unusable generation reply: {e}");
                ExerciseContent::generation_failed()
            }
        }
    }
}

const TEMPLATE_COUNT: usize = 3;

fn render_template(idx: usize, t: &str) -> ExerciseContent {
    match idx % TEMPLATE_COUNT {
        0 => ExerciseContent::new(
            format!("关于{t}，我们需要采取积极的措施来应对挑战。"),
            format!("Regarding {t}, we need to take proactive measures to address the challenges."),
            "This sentence uses the structure \"Regarding [topic], we need to...\" which is common in IELTS Writing Task 2.",
        ),
        1 => ExerciseContent::new(
            format!("{t}不仅影响个人，也影响整个社会。"),
            format!("{t} affects not only individuals but also society as a whole."),
            "This uses the \"not only... but also...\" structure, which is highly valued in IELTS Writing.",
        ),
        _ => ExerciseContent::new(
            format!("为了解决{t}问题，政府应该制定有效的政策。"),
            format!("To address the issue of {t}, the government should implement effective policies."),
            "This sentence uses \"To address the issue of...\" which is a formal way to introduce solutions.",
        ),
    }
}

/// Offline generator that fills fixed sentence templates with the topic.
///
/// Templates rotate in order, so output is deterministic for a given
/// sequence of calls.
pub struct TemplateGenerator {
    next: AtomicUsize,
    default_topic: String,
}

impl TemplateGenerator {
    pub fn new() -> Self {
        Self::with_default_topic(DEFAULT_TEMPLATE_TOPIC)
    }

    pub fn with_default_topic(topic: impl Into<String>) -> Self {
        Self {
            next: AtomicUsize::new(0),
            default_topic: topic.into(),
        }
    }

    /// Fill the next template with `topic`.
    pub fn fill(&self, topic: Option<&str>) -> ExerciseContent {
        let topic = topic
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(self.default_topic.as_str());
        let idx = self.next.fetch_add(1, Ordering::Relaxed);
        render_template(idx, topic)
    }
}

impl Default for TemplateGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuestionGenerator for TemplateGenerator {
    fn name(&self) -> &str {
        "template"
    }

    async fn generate_similar(
        &self,
        _current: &ExerciseContent,
        topic_hint: Option<&str>,
    ) -> ExerciseContent {
        self.fill(topic_hint)
    }
}
