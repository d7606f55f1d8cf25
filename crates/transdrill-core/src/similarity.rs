//! Word-overlap similarity scoring.
//!
//! The local scorer used whenever the scoring oracle is unreachable or
//! returns something unusable. It needs no I/O and always produces a
//! well-formed result.

use async_trait::async_trait;

use crate::model::{DiffStatus, SubmissionResult, WordDiffEntry};
use crate::traits::AnswerScorer;

const FEEDBACK_EXCELLENT: &str =
    "Excellent! Your translation is very close to the model answer. Well done!";
const FEEDBACK_GOOD: &str = "Good job! Your translation captures most of the key elements. Consider using more formal vocabulary and checking collocations.";
const FEEDBACK_FAIR: &str = "Your translation has the right idea, but needs improvement. Focus on using the key collocations from the model answer and maintaining formal tone.";
const FEEDBACK_POOR: &str = "Your translation needs significant improvement. Review the model answer and pay attention to grammar structure and key vocabulary.";

fn tokenize(text: &str) -> Vec<String> {
    text.trim()
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Similarity of two sentences on a 0–100 scale.
///
/// Every user token that appears anywhere in the reference counts as common,
/// so a repeated word is counted once per repetition.
pub fn similarity_score(user_text: &str, reference_text: &str) -> u8 {
    let user = tokenize(user_text);
    let reference = tokenize(reference_text);
    overlap_score(&user, &reference)
}

fn overlap_score(user: &[String], reference: &[String]) -> u8 {
    if user.is_empty() || reference.is_empty() {
        return 0;
    }
    let common = user.iter().filter(|t| reference.contains(t)).count();
    let denom = user.len().max(reference.len());
    // common <= user.len() <= denom, so this stays within 0..=100
    (100.0 * common as f64 / denom as f64).round() as u8
}

/// Canned feedback for a local score: tiers at 90, 70 and 50.
pub fn feedback_for(score: u8) -> &'static str {
    match score {
        90.. => FEEDBACK_EXCELLENT,
        70..=89 => FEEDBACK_GOOD,
        50..=69 => FEEDBACK_FAIR,
        _ => FEEDBACK_POOR,
    }
}

/// Score `user_text` against `reference_text` without any external call.
///
/// The diff lists every reference token as `Matched` or `Absent`; this scorer
/// cannot detect substitutions, so it never reports `Mismatched`.
pub fn score(user_text: &str, reference_text: &str) -> SubmissionResult {
    let user = tokenize(user_text);
    let reference = tokenize(reference_text);
    let score = overlap_score(&user, &reference);

    let diff = reference
        .iter()
        .map(|token| {
            let status = if user.contains(token) {
                DiffStatus::Matched
            } else {
                DiffStatus::Absent
            };
            WordDiffEntry::new(token.clone(), status)
        })
        .collect();

    SubmissionResult {
        score,
        feedback: feedback_for(score).to_string(),
        diff,
    }
}

/// [`AnswerScorer`] backed purely by [`score`], for offline sessions.
pub struct SimilarityScorer;

#[async_trait]
impl AnswerScorer for SimilarityScorer {
    fn name(&self) -> &str {
        "similarity"
    }

    async fn evaluate(
        &self,
        user_answer: &str,
        reference_answer: &str,
        _context_note: Option<&str>,
    ) -> SubmissionResult {
        score(user_answer, reference_answer)
    }
}
