//! The `transdrill generate` command.

use std::path::PathBuf;

use anyhow::Result;

use transdrill_providers::{create_generator, load_config_from};

pub async fn execute(
    level_id: u32,
    topic: Option<String>,
    levels_path: Option<PathBuf>,
    json: bool,
    offline: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let catalog = super::load_levels(&config, levels_path.as_deref())?;
    let Some(level) = catalog.get(level_id) else {
        anyhow::bail!("level {level_id} not found in catalog '{}'", catalog.id);
    };

    let generator = create_generator(&config, offline)?;
    let topic = topic.or_else(|| config.default_topic.clone());
    let content = generator
        .generate_similar(&level.content(), topic.as_deref())
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&content)?);
    } else {
        println!("Source:      {}", content.source_text);
        println!("Reference:   {}", content.reference_translation);
        println!("Explanation: {}", content.explanation_note);
    }

    if content.is_generation_failed() {
        anyhow::bail!("question generation failed");
    }

    Ok(())
}
