//! The `transdrill progress` commands.

use std::path::PathBuf;

use anyhow::Result;

use transdrill_core::progress::JsonProgressStore;
use transdrill_providers::load_config_from;

pub fn show(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = JsonProgressStore::new(config.progress_file());
    let progress = store.load();

    let completed: Vec<String> = progress
        .completed_levels
        .iter()
        .map(u32::to_string)
        .collect();

    println!("Progress file: {}", store.path().display());
    if completed.is_empty() {
        println!("Completed levels: none");
    } else {
        println!("Completed levels: {}", completed.join(", "));
    }
    println!("Unlocked up to level {}", progress.max_level);
    if let Some(at) = progress.updated_at {
        println!("Last updated: {}", at.format("%Y-%m-%d %H:%M UTC"));
    }
    Ok(())
}

pub fn reset(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = JsonProgressStore::new(config.progress_file());
    store.reset()?;
    println!("Progress reset.");
    Ok(())
}
