//! Journey progress: which levels are done and how far the learner has unlocked.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::traits::ProgressSink;

/// Completed levels and the highest unlocked level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    /// Level ids in the order they were completed.
    #[serde(default)]
    pub completed_levels: Vec<u32>,
    /// Highest unlocked level id.
    #[serde(default = "default_max_level")]
    pub max_level: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_max_level() -> u32 {
    1
}

impl Default for UserProgress {
    /// Only level 1 is unlocked.
    fn default() -> Self {
        Self {
            completed_levels: Vec::new(),
            max_level: default_max_level(),
            updated_at: None,
        }
    }
}

impl UserProgress {
    /// Mark `level_id` complete. Finishing the highest unlocked level
    /// unlocks the next one; replaying an earlier level unlocks nothing.
    pub fn record_completion(&mut self, level_id: u32) {
        if !self.completed_levels.contains(&level_id) {
            self.completed_levels.push(level_id);
        }
        if level_id == self.max_level {
            self.max_level = level_id.saturating_add(1);
        }
        self.updated_at = Some(Utc::now());
    }

    pub fn is_completed(&self, level_id: u32) -> bool {
        self.completed_levels.contains(&level_id)
    }

    pub fn is_unlocked(&self, level_id: u32) -> bool {
        level_id <= self.max_level
    }
}

/// Progress persisted as a JSON file.
pub struct JsonProgressStore {
    path: PathBuf,
    // Serializes read-modify-write cycles from this process
    write_lock: Mutex<()>,
}

impl JsonProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current progress. A missing file is fresh progress; an unreadable or
    /// corrupt one is logged and treated the same way.
    pub fn load(&self) -> UserProgress {
        self.decode(std::fs::read_to_string(&self.path))
    }

    /// [`load`](Self::load) without blocking the runtime thread.
    pub async fn load_async(&self) -> UserProgress {
        self.decode(tokio::fs::read_to_string(&self.path).await)
    }

    fn decode(&self, read: io::Result<String>) -> UserProgress {
        let content = match read {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return UserProgress::default();
            }
            Err(e) => {
                tracing::warn!("failed to read progress {}: {e}", self.path.display());
                return UserProgress::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("ignoring corrupt progress {}: {e}", self.path.display());
            UserProgress::default()
        })
    }

    /// Record a completed level and write the result back.
    pub async fn record_completion(&self, level_id: u32) -> Result<UserProgress> {
        let _guard = self.write_lock.lock().await;

        let mut progress = self.load_async().await;
        progress.record_completion(level_id);
        self.save(&progress).await?;
        Ok(progress)
    }

    async fn save(&self, progress: &UserProgress) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("failed to create progress directory: {}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string_pretty(progress)?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("failed to write progress: {}", self.path.display()))
    }

    /// Forget all progress.
    pub fn reset(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("failed to remove progress: {}", self.path.display())),
        }
    }
}

#[async_trait]
impl ProgressSink for JsonProgressStore {
    async fn level_mastered(&self, level_id: u32) -> Result<()> {
        let progress = self.record_completion(level_id).await?;
        tracing::info!(
            level = level_id,
            max_level = progress.max_level,
            "progress saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_unlocks_only_first_level() {
        let progress = UserProgress::default();
        assert!(progress.is_unlocked(1));
        assert!(!progress.is_unlocked(2));
        assert!(progress.completed_levels.is_empty());
    }

    #[test]
    fn completing_max_level_unlocks_next() {
        let mut progress = UserProgress::default();
        progress.record_completion(1);
        assert_eq!(progress.max_level, 2);
        assert!(progress.is_completed(1));
        assert!(progress.updated_at.is_some());

        progress.record_completion(2);
        assert_eq!(progress.max_level, 3);
    }

    #[test]
    fn replaying_earlier_level_is_idempotent() {
        let mut progress = UserProgress::default();
        progress.record_completion(1);
        progress.record_completion(2);
        progress.record_completion(1);
        assert_eq!(progress.completed_levels, vec![1, 2]);
        assert_eq!(progress.max_level, 3);
    }

    #[test]
    fn completing_largest_level_id_saturates() {
        let mut progress = UserProgress {
            max_level: u32::MAX,
            ..UserProgress::default()
        };
        progress.record_completion(u32::MAX);
        assert_eq!(progress.max_level, u32::MAX);
        assert!(progress.is_completed(u32::MAX));
    }

    #[tokio::test]
    async fn store_roundtrip_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonProgressStore::new(dir.path().join("nested").join("progress.json"));

        assert_eq!(store.load(), UserProgress::default());

        store.level_mastered(1).await.unwrap();
        let loaded = store.load();
        assert_eq!(loaded.completed_levels, vec![1]);
        assert_eq!(loaded.max_level, 2);

        store.reset().unwrap();
        assert_eq!(store.load(), UserProgress::default());
        // resetting twice is fine
        store.reset().unwrap();
    }

    #[tokio::test]
    async fn concurrent_completions_are_both_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonProgressStore::new(dir.path().join("progress.json"));

        let (first, second) =
            futures::join!(store.level_mastered(1), store.level_mastered(2));
        first.unwrap();
        second.unwrap();

        let mut completed = store.load().completed_levels;
        completed.sort_unstable();
        assert_eq!(completed, vec![1, 2]);
    }

    #[tokio::test]
    async fn corrupt_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonProgressStore::new(&path);
        assert_eq!(store.load(), UserProgress::default());

        let saved = store.record_completion(1).await.unwrap();
        assert_eq!(saved.max_level, 2);
        assert_eq!(store.load_async().await, saved);
    }

    #[test]
    fn reads_legacy_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, r#"{"completed_levels": [1, 2], "max_level": 3}"#).unwrap();

        let progress = JsonProgressStore::new(&path).load();
        assert_eq!(progress.completed_levels, vec![1, 2]);
        assert_eq!(progress.max_level, 3);
        assert!(progress.updated_at.is_none());
    }
}
