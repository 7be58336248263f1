//! Bulk import of audio files from a directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::queue::{FileMeta, RecordingQueue};

/// Which files an import picks up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Lowercase extensions without the dot
    pub extensions: Vec<String>,

    /// Descend into subdirectories
    pub recursive: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            extensions: ["m4a", "mp3", "wav", "ogg", "flac", "webm"]
                .into_iter()
                .map(String::from)
                .collect(),
            recursive: false,
        }
    }
}

impl ImportConfig {
    fn is_audio_file(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| {
                let ext = ext.to_string_lossy().to_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            })
            .unwrap_or(false)
    }
}

/// Outcome of an import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub queued: usize,
    pub already_queued: usize,
    pub errors: usize,
}

impl ImportResult {
    pub fn total_scanned(&self) -> usize {
        self.queued + self.already_queued + self.errors
    }
}

/// Enqueue every audio file under `dir` that the queue does not know yet.
/// Files are enqueued in path order so FIFO processing follows file names.
pub async fn import_directory(
    queue: &RecordingQueue,
    dir: &Path,
    config: &ImportConfig,
) -> Result<ImportResult> {
    if !dir.is_dir() {
        anyhow::bail!("Import directory does not exist: {}", dir.display());
    }

    let pattern = if config.recursive {
        dir.join("**").join("*")
    } else {
        dir.join("*")
    };
    let pattern = pattern.to_string_lossy().to_string();

    let mut paths: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("Invalid import pattern: {}", pattern))?
        .filter_map(|entry| entry.ok())
        .filter(|path| config.is_audio_file(path))
        .collect();
    paths.sort();

    let known: HashSet<PathBuf> = queue
        .list_all()
        .await?
        .into_iter()
        .map(|item| item.audio_file_path)
        .collect();

    let mut result = ImportResult::default();

    for path in paths {
        if known.contains(&path) {
            result.already_queued += 1;
            continue;
        }

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };

        let meta = FileMeta {
            file_size_bytes: Some(metadata.len()),
            duration_seconds: None,
        };

        match queue.enqueue(&path, meta).await {
            Ok(_) => result.queued += 1,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to enqueue recording");
                result.errors += 1;
            }
        }
    }

    Ok(result)
}
