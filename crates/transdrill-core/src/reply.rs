//! Parsing of model replies into engine types.
//!
//! Models are asked for bare JSON but often wrap it in a markdown fence or
//! surround it with prose. These helpers dig the object out and map it onto
//! [`SubmissionResult`] or [`ExerciseContent`], tolerating either field
//! vocabulary.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{DiffStatus, ExerciseContent, SubmissionResult, WordDiffEntry};
use crate::normalize::normalize_score;

/// Feedback used when the oracle omits it.
pub const MISSING_FEEDBACK: &str = "No detailed feedback was provided for this answer.";

/// Explanation used when the generator omits it.
pub const MISSING_EXPLANATION: &str = "Generated using the same grammatical structure.";

/// Why a reply could not be used.
#[derive(Debug, Error, PartialEq)]
pub enum ReplyError {
    #[error("reply is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("reply is not a JSON object")]
    NotAnObject,

    #[error("reply has no numeric score")]
    MissingScore,

    #[error("reply is missing required field `{0}`")]
    MissingField(&'static str),

    /// The service answered with an `{error, message?}` envelope instead of a result.
    #[error("service reported an error: {0}")]
    Remote(String),
}

/// Extract the JSON payload from a model reply.
///
/// Handles:
/// - ```json fenced blocks (preferred)
/// - Generic ``` blocks
/// - Bare JSON, possibly surrounded by prose (sliced from the first `{` to the last `}`)
pub fn extract_json_block(response: &str) -> String {
    let mut json_blocks = Vec::new();
    let mut generic_blocks = Vec::new();
    let mut in_block = false;
    let mut is_json_block = false;
    let mut is_generic_block = false;
    let mut current_block = String::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if !in_block && trimmed.starts_with("```") {
            in_block = true;
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            is_json_block = lang == "json";
            is_generic_block = lang.is_empty();
            current_block.clear();
            continue;
        }

        if in_block && trimmed == "```" {
            in_block = false;
            if is_json_block {
                json_blocks.push(current_block.clone());
            } else if is_generic_block {
                generic_blocks.push(current_block.clone());
            }
            current_block.clear();
            continue;
        }

        if in_block {
            if !current_block.is_empty() {
                current_block.push('\n');
            }
            current_block.push_str(line);
        }
    }

    // Truncated replies leave the last fence open
    if in_block && !current_block.is_empty() {
        if is_json_block {
            json_blocks.push(current_block);
        } else if is_generic_block {
            generic_blocks.push(current_block);
        }
    }

    if let Some(block) = json_blocks.into_iter().next() {
        return block.trim().to_string();
    }
    if let Some(block) = generic_blocks.into_iter().next() {
        return block.trim().to_string();
    }

    let trimmed = response.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => trimmed[start..=end].to_string(),
        _ => trimmed.to_string(),
    }
}

fn parse_object(response: &str) -> Result<Map<String, Value>, ReplyError> {
    let payload = extract_json_block(response);
    let value: Value =
        serde_json::from_str(&payload).map_err(|e| ReplyError::InvalidJson(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ReplyError::NotAnObject),
    }
}

/// First non-empty string among `keys`.
fn string_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Message of an `{error, message?}` envelope, if `map` is one.
///
/// `error` may be a string or an object carrying its own `message`.
fn remote_error(map: &Map<String, Value>) -> Option<String> {
    if map.contains_key("score") {
        return None;
    }
    let error = map.get("error")?;
    let headline = match error {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Object(inner) => string_field(inner, &["message", "type", "code"]),
        Value::Null => None,
        other => Some(other.to_string()),
    };
    let detail = string_field(map, &["message"]);
    let parts: Vec<String> = headline
        .into_iter()
        .chain(detail)
        .filter(|s| !s.is_empty())
        .collect();
    Some(if parts.is_empty() {
        "unknown error".to_string()
    } else {
        parts.join(": ")
    })
}

fn numeric_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn diff_entry(value: &Value) -> Option<WordDiffEntry> {
    let obj = value.as_object()?;
    let token = string_field(obj, &["token", "word"])?;
    let status = obj.get("status")?.as_str()?.parse::<DiffStatus>().ok()?;
    Some(WordDiffEntry { token, status })
}

/// Turn a scoring reply into a [`SubmissionResult`].
///
/// An error envelope maps to [`ReplyError::Remote`]. Otherwise only a missing
/// or non-numeric `score` is fatal. Missing feedback falls back to
/// [`MISSING_FEEDBACK`], a missing diff to an empty one, and unrecognized diff
/// entries are dropped.
pub fn parse_score_reply(response: &str) -> Result<SubmissionResult, ReplyError> {
    let map = parse_object(response)?;
    if let Some(message) = remote_error(&map) {
        return Err(ReplyError::Remote(message));
    }

    let raw = map
        .get("score")
        .and_then(numeric_score)
        .ok_or(ReplyError::MissingScore)?;

    let feedback =
        string_field(&map, &["feedback"]).unwrap_or_else(|| MISSING_FEEDBACK.to_string());

    let diff = match map.get("diff") {
        Some(Value::Array(items)) => {
            let entries: Vec<WordDiffEntry> = items.iter().filter_map(diff_entry).collect();
            if entries.len() < items.len() {
                tracing::debug!(
                    "dropped {} unrecognized diff entries",
                    items.len() - entries.len()
                );
            }
            entries
        }
        _ => Vec::new(),
    };

    Ok(SubmissionResult {
        score: normalize_score(raw),
        feedback,
        diff,
    })
}

/// Turn a generation reply into [`ExerciseContent`].
///
/// Source and reference text are required; the explanation defaults to
/// [`MISSING_EXPLANATION`].
pub fn parse_question_reply(response: &str) -> Result<ExerciseContent, ReplyError> {
    let map = parse_object(response)?;

    let source_text = string_field(&map, &["sourceText", "source_text", "chinese"])
        .ok_or(ReplyError::MissingField("sourceText"))?;
    let reference_translation = string_field(
        &map,
        &[
            "referenceTranslation",
            "reference_translation",
            "standardEnglish",
        ],
    )
    .ok_or(ReplyError::MissingField("referenceTranslation"))?;
    let explanation_note =
        string_field(&map, &["explanationNote", "explanation_note", "explanation"])
            .unwrap_or_else(|| MISSING_EXPLANATION.to_string());

    Ok(ExerciseContent {
        source_text,
        reference_translation,
        explanation_note,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_fenced_json() {
        let input = "Here you go:\n\n```json\n{\"score\": 80}\n```\n\nHope it helps";
        assert_eq!(extract_json_block(input), "{\"score\": 80}");
    }

    #[test]
    fn extract_prefers_json_over_generic() {
        let input = "```\nnot it\n```\n\n```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json_block(input), "{\"a\": 1}");
    }

    #[test]
    fn extract_from_surrounding_prose() {
        let input = "Sure! {\"score\": 70, \"feedback\": \"ok\"} Anything else?";
        assert_eq!(
            extract_json_block(input),
            "{\"score\": 70, \"feedback\": \"ok\"}"
        );
    }

    #[test]
    fn extract_unclosed_fence() {
        let input = "```json\n{\"score\": 60}";
        assert_eq!(extract_json_block(input), "{\"score\": 60}");
    }

    #[test]
    fn full_score_reply() {
        let reply = r#"{
            "score": 82,
            "feedback": "Nice use of the passive voice.",
            "diff": [
                {"word": "life", "status": "correct"},
                {"word": "expectancy", "status": "wrong"},
                {"token": "extended", "status": "absent"}
            ]
        }"#;
        let result = parse_score_reply(reply).unwrap();
        assert_eq!(result.score, 82);
        assert_eq!(result.feedback, "Nice use of the passive voice.");
        assert_eq!(
            result.diff,
            vec![
                WordDiffEntry::new("life", DiffStatus::Matched),
                WordDiffEntry::new("expectancy", DiffStatus::Mismatched),
                WordDiffEntry::new("extended", DiffStatus::Absent),
            ]
        );
    }

    #[test]
    fn band_score_reply_is_normalized() {
        let result = parse_score_reply(r#"{"score": 8, "feedback": "good"}"#).unwrap();
        assert_eq!(result.score, 85);
    }

    #[test]
    fn string_score_is_accepted() {
        let result = parse_score_reply(r#"{"score": "91"}"#).unwrap();
        assert_eq!(result.score, 91);
    }

    #[test]
    fn missing_feedback_and_diff_default() {
        let result = parse_score_reply(r#"{"score": 40}"#).unwrap();
        assert_eq!(result.feedback, MISSING_FEEDBACK);
        assert!(result.diff.is_empty());
    }

    #[test]
    fn bad_diff_entries_are_dropped() {
        let reply = r#"{"score": 50, "diff": [
            {"word": "ok", "status": "correct"},
            {"word": "odd", "status": "partial"},
            {"status": "missing"},
            "loose string"
        ]}"#;
        let result = parse_score_reply(reply).unwrap();
        assert_eq!(result.diff, vec![WordDiffEntry::new("ok", DiffStatus::Matched)]);
    }

    #[test]
    fn score_reply_errors() {
        assert_eq!(parse_score_reply("{}"), Err(ReplyError::MissingScore));
        assert_eq!(
            parse_score_reply(r#"{"score": null}"#),
            Err(ReplyError::MissingScore)
        );
        assert_eq!(parse_score_reply("[1, 2]"), Err(ReplyError::NotAnObject));
        assert!(matches!(
            parse_score_reply("I think this deserves an 8"),
            Err(ReplyError::InvalidJson(_))
        ));
    }

    #[test]
    fn error_envelope_is_remote_error() {
        assert_eq!(
            parse_score_reply(r#"{"error": "rate limit", "message": "slow down"}"#),
            Err(ReplyError::Remote("rate limit: slow down".into()))
        );
        assert_eq!(
            parse_score_reply(r#"{"error": {"message": "Invalid API key", "type": "auth"}}"#),
            Err(ReplyError::Remote("Invalid API key".into()))
        );
        assert_eq!(
            parse_score_reply(r#"{"error": null}"#),
            Err(ReplyError::Remote("unknown error".into()))
        );
        // A score wins over a stray error field
        assert_eq!(
            parse_score_reply(r#"{"score": 70, "error": "ignored"}"#)
                .unwrap()
                .score,
            70
        );
    }

    #[test]
    fn question_reply_original_field_names() {
        let reply = r#"{
            "chinese": "科技不仅改变了工作方式，也改变了生活方式。",
            "standardEnglish": "Technology has changed not only the way we work but also the way we live.",
            "explanation": "not only... but also..."
        }"#;
        let content = parse_question_reply(reply).unwrap();
        assert!(content.source_text.starts_with("科技"));
        assert!(content.reference_translation.starts_with("Technology"));
        assert_eq!(content.explanation_note, "not only... but also...");
    }

    #[test]
    fn question_reply_engine_field_names() {
        let reply = r#"{"sourceText": "甲", "referenceTranslation": "A"}"#;
        let content = parse_question_reply(reply).unwrap();
        assert_eq!(content.source_text, "甲");
        assert_eq!(content.reference_translation, "A");
        assert_eq!(content.explanation_note, MISSING_EXPLANATION);
    }

    #[test]
    fn question_reply_missing_fields() {
        assert_eq!(
            parse_question_reply(r#"{"standardEnglish": "A"}"#),
            Err(ReplyError::MissingField("sourceText"))
        );
        assert_eq!(
            parse_question_reply(r#"{"chinese": "甲", "standardEnglish": "  "}"#),
            Err(ReplyError::MissingField("referenceTranslation"))
        );
    }
}
