//! The `transdrill levels` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use transdrill_core::progress::JsonProgressStore;
use transdrill_providers::load_config_from;

pub fn execute(levels_path: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let catalog = super::load_levels(&config, levels_path.as_deref())?;
    let progress = JsonProgressStore::new(config.progress_file()).load();

    println!("{} ({} levels)", catalog.name, catalog.levels.len());

    let mut table = Table::new();
    table.set_header(vec!["Level", "Title", "Key vocabulary", "Status"]);

    for level in &catalog.levels {
        let status = if progress.is_completed(level.id) {
            "completed"
        } else if progress.is_unlocked(level.id) {
            "unlocked"
        } else {
            "locked"
        };
        table.add_row(vec![
            Cell::new(level.id),
            Cell::new(&level.title),
            Cell::new(level.vocab.join(", ")),
            Cell::new(status),
        ]);
    }

    println!("{table}");
    Ok(())
}
