//! Core data model types for transdrill.
//!
//! These are the snapshots the engine hands out: what is being practiced,
//! and what a single submission scored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source text shown when question generation failed.
pub const GENERATION_FAILED_SOURCE: &str = "生成失败，请稍后重试。";
/// Reference text shown when question generation failed.
pub const GENERATION_FAILED_REFERENCE: &str =
    "Failed to generate question. Please try again later.";
/// Explanation shown when question generation failed.
pub const GENERATION_FAILED_EXPLANATION: &str = "AI service unavailable.";

/// The sentence pair currently being practiced.
///
/// Replaced wholesale when a new question is generated; never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseContent {
    /// Sentence in the learner's source language.
    pub source_text: String,
    /// Model translation the answer is scored against.
    pub reference_translation: String,
    /// Grammar or vocabulary note shown alongside the reference.
    #[serde(default)]
    pub explanation_note: String,
}

impl ExerciseContent {
    pub fn new(
        source_text: impl Into<String>,
        reference_translation: impl Into<String>,
        explanation_note: impl Into<String>,
    ) -> Self {
        Self {
            source_text: source_text.into(),
            reference_translation: reference_translation.into(),
            explanation_note: explanation_note.into(),
        }
    }

    /// Content returned in place of a generated question that could not be produced.
    ///
    /// It is still valid content: it can be displayed and answered.
    pub fn generation_failed() -> Self {
        Self::new(
            GENERATION_FAILED_SOURCE,
            GENERATION_FAILED_REFERENCE,
            GENERATION_FAILED_EXPLANATION,
        )
    }

    /// Whether this is the content produced by [`ExerciseContent::generation_failed`].
    pub fn is_generation_failed(&self) -> bool {
        self.reference_translation == GENERATION_FAILED_REFERENCE
            && self.source_text == GENERATION_FAILED_SOURCE
    }
}

/// How a reference token fared in the learner's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    /// The learner used this token or an equivalent.
    Matched,
    /// The learner used a different word that changes meaning.
    Mismatched,
    /// The learner left this token out.
    Absent,
}

impl fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffStatus::Matched => write!(f, "matched"),
            DiffStatus::Mismatched => write!(f, "mismatched"),
            DiffStatus::Absent => write!(f, "absent"),
        }
    }
}

impl FromStr for DiffStatus {
    type Err = String;

    /// Accepts both the engine's vocabulary and the one the scoring prompt asks for.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "matched" | "correct" => Ok(DiffStatus::Matched),
            "mismatched" | "wrong" => Ok(DiffStatus::Mismatched),
            "absent" | "missing" => Ok(DiffStatus::Absent),
            other => Err(format!("unknown diff status: {other}")),
        }
    }
}

/// One reference token and its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordDiffEntry {
    pub token: String,
    pub status: DiffStatus,
}

impl WordDiffEntry {
    pub fn new(token: impl Into<String>, status: DiffStatus) -> Self {
        Self {
            token: token.into(),
            status,
        }
    }
}

/// The outcome of scoring one submission. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    /// Quality score on a 0–100 scale.
    pub score: u8,
    /// Natural-language feedback, opaque to the engine.
    pub feedback: String,
    /// Token-level comparison against the reference, in reference order.
    #[serde(default)]
    pub diff: Vec<WordDiffEntry>,
}

impl SubmissionResult {
    /// Whether this result counts as a pass for the given threshold.
    pub fn passed(&self, pass_threshold: u8) -> bool {
        self.score >= pass_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_status_accepts_both_vocabularies() {
        assert_eq!("correct".parse::<DiffStatus>().unwrap(), DiffStatus::Matched);
        assert_eq!("Matched".parse::<DiffStatus>().unwrap(), DiffStatus::Matched);
        assert_eq!("wrong".parse::<DiffStatus>().unwrap(), DiffStatus::Mismatched);
        assert_eq!("missing".parse::<DiffStatus>().unwrap(), DiffStatus::Absent);
        assert_eq!(" absent ".parse::<DiffStatus>().unwrap(), DiffStatus::Absent);
        assert!("partial".parse::<DiffStatus>().is_err());
    }

    #[test]
    fn diff_status_serializes_lowercase() {
        let entry = WordDiffEntry::new("life", DiffStatus::Mismatched);
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"token":"life","status":"mismatched"}"#);
    }

    #[test]
    fn generation_failed_is_recognisable() {
        let content = ExerciseContent::generation_failed();
        assert!(content.is_generation_failed());
        assert!(!ExerciseContent::new("a", "b", "c").is_generation_failed());
    }

    #[test]
    fn passed_is_inclusive() {
        let result = SubmissionResult {
            score: 80,
            feedback: String::new(),
            diff: vec![],
        };
        assert!(result.passed(80));
        assert!(!result.passed(81));
    }
}
