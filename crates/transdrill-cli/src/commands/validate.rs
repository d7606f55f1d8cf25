//! The `transdrill validate` command.

use std::path::PathBuf;

use anyhow::Result;

use transdrill_core::levels::{load_catalog_directory, parse_catalog, validate_catalog};

pub fn execute(levels_path: PathBuf) -> Result<()> {
    let catalogs = if levels_path.is_dir() {
        load_catalog_directory(&levels_path)?
    } else {
        vec![parse_catalog(&levels_path)?]
    };

    let mut total_warnings = 0;

    for catalog in &catalogs {
        println!("Catalog: {} ({} levels)", catalog.name, catalog.levels.len());

        let warnings = validate_catalog(catalog);
        for w in &warnings {
            let prefix = w
                .level_id
                .map(|id| format!("  [level {id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All catalogs valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
