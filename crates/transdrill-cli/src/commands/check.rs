//! The `transdrill check` command.

use std::path::PathBuf;

use anyhow::Result;

use transdrill_providers::{create_scorer, load_config_from};

pub async fn execute(
    answer: String,
    reference: String,
    context: Option<String>,
    json: bool,
    offline: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    if answer.trim().is_empty() {
        anyhow::bail!("answer is empty");
    }
    if reference.trim().is_empty() {
        anyhow::bail!("reference is empty");
    }

    let config = load_config_from(config_path.as_deref())?;
    let scorer = create_scorer(&config, offline)?;
    tracing::debug!("scoring with {}", scorer.name());

    let result = scorer
        .evaluate(&answer, &reference, context.as_deref())
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        super::print_result(&result, config.streak_policy().pass_threshold);
    }

    Ok(())
}
