//! Level catalogs.
//!
//! Loads practice levels from TOML files and directories, and validates them.
//! A catalog of five IELTS writing levels is compiled in.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::ExerciseContent;

const BUILTIN_CATALOG: &str = include_str!("../data/ielts-journey.toml");

/// The sentence a level asks the learner to translate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub source_text: String,
    pub reference_translation: String,
    #[serde(default)]
    pub explanation: String,
}

/// One level of the journey.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Key takeaways shown before the challenge.
    #[serde(default)]
    pub learning_points: Vec<String>,
    /// Key collocations.
    #[serde(default)]
    pub vocab: Vec<String>,
    pub challenge: Challenge,
}

impl Level {
    /// The content a session for this level starts from.
    pub fn content(&self) -> ExerciseContent {
        ExerciseContent::new(
            self.challenge.source_text.clone(),
            self.challenge.reference_translation.clone(),
            self.challenge.explanation.clone(),
        )
    }
}

/// An ordered set of levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelCatalog {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Sorted by id.
    pub levels: Vec<Level>,
}

impl LevelCatalog {
    pub fn get(&self, id: u32) -> Option<&Level> {
        self.levels.iter().find(|l| l.id == id)
    }

    /// The level following `id`, if any.
    pub fn next_after(&self, id: u32) -> Option<&Level> {
        self.levels.iter().find(|l| l.id > id)
    }

    pub fn first(&self) -> Option<&Level> {
        self.levels.first()
    }
}

#[derive(Debug, Deserialize)]
struct TomlCatalogFile {
    catalog: TomlCatalogHeader,
    #[serde(default)]
    levels: Vec<Level>,
}

#[derive(Debug, Deserialize)]
struct TomlCatalogHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

/// The compiled-in IELTS journey.
pub fn builtin_catalog() -> Result<LevelCatalog> {
    parse_catalog_str(BUILTIN_CATALOG, Path::new("<builtin>"))
}

/// Parse a single TOML catalog file.
pub fn parse_catalog(path: &Path) -> Result<LevelCatalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read level catalog: {}", path.display()))?;

    parse_catalog_str(&content, path)
}

/// Parse a TOML string into a [`LevelCatalog`].
pub fn parse_catalog_str(content: &str, source_path: &Path) -> Result<LevelCatalog> {
    let parsed: TomlCatalogFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let mut levels = parsed.levels;
    levels.sort_by_key(|l| l.id);

    Ok(LevelCatalog {
        id: parsed.catalog.id,
        name: parsed.catalog.name,
        description: parsed.catalog.description,
        levels,
    })
}

/// Recursively load all `.toml` catalogs under a directory.
pub fn load_catalog_directory(dir: &Path) -> Result<Vec<LevelCatalog>> {
    let mut catalogs = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            catalogs.extend(load_catalog_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_catalog(&path) {
                Ok(catalog) => catalogs.push(catalog),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    catalogs.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(catalogs)
}

/// Load a catalog from a file, or merge every catalog in a directory.
///
/// Merged catalogs keep the header of the first one; levels are re-sorted by id.
pub fn load_catalog(path: &Path) -> Result<LevelCatalog> {
    if !path.is_dir() {
        return parse_catalog(path);
    }

    let mut catalogs = load_catalog_directory(path)?.into_iter();
    let Some(mut merged) = catalogs.next() else {
        anyhow::bail!("no level catalogs found in {}", path.display());
    };
    for catalog in catalogs {
        merged.levels.extend(catalog.levels);
    }
    merged.levels.sort_by_key(|l| l.id);
    Ok(merged)
}

/// A warning from catalog validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The level ID (if applicable).
    pub level_id: Option<u32>,
    pub message: String,
}

/// Validate a catalog for common issues.
pub fn validate_catalog(catalog: &LevelCatalog) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if catalog.levels.is_empty() {
        warnings.push(ValidationWarning {
            level_id: None,
            message: "catalog has no levels".into(),
        });
        return warnings;
    }

    let mut seen_ids = HashSet::new();
    for level in &catalog.levels {
        if !seen_ids.insert(level.id) {
            warnings.push(ValidationWarning {
                level_id: Some(level.id),
                message: format!("duplicate level ID: {}", level.id),
            });
        }
    }

    for level in &catalog.levels {
        if level.challenge.source_text.trim().is_empty() {
            warnings.push(ValidationWarning {
                level_id: Some(level.id),
                message: "challenge source_text is empty".into(),
            });
        }
        if level.challenge.reference_translation.trim().is_empty() {
            warnings.push(ValidationWarning {
                level_id: Some(level.id),
                message: "challenge reference_translation is empty".into(),
            });
        }
    }

    // Progress unlocks id + 1, so a gap strands every later level
    for pair in catalog.levels.windows(2) {
        let (prev, next) = (pair[0].id, pair[1].id);
        if next > prev.saturating_add(1) {
            warnings.push(ValidationWarning {
                level_id: Some(next),
                message: format!("level IDs skip from {prev} to {next}"),
            });
        }
    }

    if catalog.levels[0].id != 1 {
        warnings.push(ValidationWarning {
            level_id: Some(catalog.levels[0].id),
            message: "first level is not 1 and will never be unlocked".into(),
        });
    }

    warnings
}
