//! Subcommand implementations and the output helpers they share.

pub mod check;
pub mod generate;
pub mod init;
pub mod levels;
pub mod practice;
pub mod progress;
pub mod validate;

use std::path::Path;

use anyhow::Result;

use transdrill_core::levels::{builtin_catalog, load_catalog, LevelCatalog};
use transdrill_core::model::{DiffStatus, ExerciseContent, SubmissionResult};
use transdrill_providers::TransdrillConfig;

/// The catalog named on the command line, else the configured one, else the
/// built-in journey.
pub fn load_levels(config: &TransdrillConfig, cli_path: Option<&Path>) -> Result<LevelCatalog> {
    match cli_path.or(config.levels_path.as_deref()) {
        Some(path) => load_catalog(path),
        None => builtin_catalog(),
    }
}

pub fn print_content(content: &ExerciseContent) {
    println!("Translate: {}", content.source_text);
    if content.is_generation_failed() {
        println!("  (question generation failed; answer it anyway or type :next to try again)");
    }
}

pub fn print_result(result: &SubmissionResult, pass_threshold: u8) {
    let verdict = if result.passed(pass_threshold) {
        "PASS"
    } else {
        "FAIL"
    };
    println!(
        "Score: {}/100 {verdict} (pass mark {pass_threshold})",
        result.score
    );
    println!("Feedback: {}", result.feedback);

    if !result.diff.is_empty() {
        let marked: Vec<String> = result
            .diff
            .iter()
            .map(|entry| {
                let mark = match entry.status {
                    DiffStatus::Matched => '+',
                    DiffStatus::Mismatched => '~',
                    DiffStatus::Absent => '-',
                };
                format!("{mark}{}", entry.token)
            })
            .collect();
        println!("Diff: {}", marked.join(" "));
    }
}
