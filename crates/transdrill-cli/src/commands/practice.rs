//! The `transdrill practice` command: an interactive session over stdin.
//!
//! Each input line is a translation to score, or one of `:next`, `:retry`
//! and `:quit`. Mastering a level and typing `:next` records the completion
//! and moves on to the following level.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use transdrill_core::levels::Level;
use transdrill_core::progress::JsonProgressStore;
use transdrill_core::session::{ExerciseSession, IgnoreReason, NextOutcome, SubmitOutcome};
use transdrill_core::streak::StreakPolicy;
use transdrill_providers::{create_generator, create_scorer, load_config_from};

const HELP: &str = "Type your translation, or :next, :retry, :quit.";

fn describe(reason: IgnoreReason) -> &'static str {
    match reason {
        IgnoreReason::EmptyAnswer => "empty answer",
        IgnoreReason::EvaluationInFlight => "still scoring the previous answer",
        IgnoreReason::GenerationInFlight => "still generating a question",
        IgnoreReason::AlreadyMastered => "level already mastered, type :next to continue",
    }
}

fn print_intro(level: &Level, policy: StreakPolicy) {
    println!("\n=== Level {}: {} ===", level.id, level.title);
    if !level.description.is_empty() {
        println!("{}", level.description);
    }
    for point in &level.learning_points {
        println!("  * {point}");
    }
    if !level.vocab.is_empty() {
        println!("Key vocabulary: {}", level.vocab.join(", "));
    }
    println!(
        "Score {} or more {} times in a row to master this level. {HELP}",
        policy.pass_threshold, policy.target
    );
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

pub async fn execute(
    level_id: u32,
    topic: Option<String>,
    levels_path: Option<PathBuf>,
    offline: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let catalog = super::load_levels(&config, levels_path.as_deref())?;
    let store = Arc::new(JsonProgressStore::new(config.progress_file()));

    if catalog.get(level_id).is_none() {
        anyhow::bail!("level {level_id} not found in catalog '{}'", catalog.id);
    }
    let progress = store.load();
    if !progress.is_unlocked(level_id) {
        anyhow::bail!(
            "level {level_id} is locked; complete level {} first",
            progress.max_level
        );
    }

    if !offline && !config.is_configured() {
        eprintln!("No API key configured: answers will not be graded. Use --offline for local scoring.");
    }

    let scorer = create_scorer(&config, offline)?;
    let generator = create_generator(&config, offline)?;
    let policy = config.streak_policy();
    let topic = topic.or_else(|| config.default_topic.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut current = level_id;

    'levels: loop {
        let Some(level) = catalog.get(current) else {
            break;
        };
        print_intro(level, policy);

        let session = ExerciseSession::new(
            level.id,
            level.content(),
            scorer.clone(),
            generator.clone(),
        )
        .with_policy(policy)
        .with_progress(store.clone());
        tracing::info!(session = %session.id(), level = level.id, "session started");
        super::print_content(&level.content());

        loop {
            prompt();
            let Some(line) = lines.next_line().await? else {
                println!();
                break 'levels;
            };

            match line.trim() {
                ":quit" | ":q" => break 'levels,
                ":retry" => {
                    session.reset().await;
                    super::print_content(&session.snapshot().await.content);
                }
                ":next" => match session.request_next(topic.as_deref()).await {
                    NextOutcome::LevelComplete { level_id, recorded } => {
                        if recorded {
                            println!("Level {level_id} complete!");
                        } else {
                            println!("Level {level_id} complete, but progress could not be saved.");
                        }
                        match catalog.next_after(level_id) {
                            Some(next) => {
                                current = next.id;
                                continue 'levels;
                            }
                            None => {
                                println!("You have completed every level in {}.", catalog.name);
                                break 'levels;
                            }
                        }
                    }
                    NextOutcome::NewQuestion(content) => super::print_content(&content),
                    NextOutcome::Ignored(reason) => println!("({})", describe(reason)),
                    NextOutcome::Stale => {}
                },
                "" => println!("{HELP}"),
                answer => match session.submit(answer).await {
                    SubmitOutcome::Evaluated { result, streak, .. } => {
                        super::print_result(&result, policy.pass_threshold);
                        if streak.mastered() {
                            println!("Level mastered! Type :next to continue.");
                        } else {
                            println!(
                                "Streak: {}/{}",
                                streak.consecutive_passes(),
                                streak.target()
                            );
                        }
                    }
                    SubmitOutcome::Ignored(reason) => println!("({})", describe(reason)),
                    SubmitOutcome::Stale => {}
                },
            }
        }
    }

    Ok(())
}
