//! Configuration for memline.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variable (MEMLINE_HOME)
//! 2. Config file (.memline/config.yaml)
//! 3. Defaults (~/.memline)
//!
//! Config file discovery:
//! - Searches current directory and parents for .memline/config.yaml
//! - `paths.home` is relative to the .memline/ directory, other paths to
//!   the project root (the directory holding .memline/)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::RetryPolicy;
use crate::timeline::ZoomBounds;

const CONFIG_DIR: &str = ".memline";
const CONFIG_FILE: &str = "config.yaml";
const HOME_ENV: &str = "MEMLINE_HOME";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
    #[serde(default)]
    pub timeline: Option<TimelineConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Data directory (relative to .memline/)
    pub home: Option<String>,
    /// Default directory for `memline import` (relative to project root)
    pub recordings: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineConfig {
    pub min_pixels_per_day: Option<f64>,
    pub max_pixels_per_day: Option<f64>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct Config {
    /// Data directory: queue log, database, settings
    pub home: PathBuf,
    pub recordings: Option<PathBuf>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub retry: RetryPolicy,
    pub zoom_bounds: ZoomBounds,
}

impl Config {
    /// Load from the current directory and process environment
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let env_home = std::env::var(HOME_ENV).ok().map(PathBuf::from);
        Self::load_from(&cwd, env_home)
    }

    /// Load with an explicit starting directory and `MEMLINE_HOME` value
    pub fn load_from(cwd: &Path, env_home: Option<PathBuf>) -> Result<Self> {
        let config_file = find_config_file(cwd);
        let parsed = match &config_file {
            Some(path) => load_config_file(path)?,
            None => ConfigFile::default(),
        };

        let home = match (env_home, &config_file, &parsed.paths.home) {
            (Some(home), _, _) => home,
            (None, Some(path), Some(home)) => {
                let memline_dir = path.parent().unwrap_or(Path::new("."));
                resolve_path(memline_dir, home)
            }
            _ => default_home()?,
        };

        let recordings = match (&config_file, &parsed.paths.recordings) {
            (Some(path), Some(dir)) => {
                // Project root is the parent of .memline/
                let base_dir = path
                    .parent()
                    .and_then(|p| p.parent())
                    .unwrap_or(Path::new("."));
                Some(resolve_path(base_dir, dir))
            }
            _ => None,
        };

        let defaults = ZoomBounds::default();
        let zoom_bounds = match parsed.timeline {
            Some(t) => ZoomBounds {
                min_pixels_per_day: t.min_pixels_per_day.unwrap_or(defaults.min_pixels_per_day),
                max_pixels_per_day: t.max_pixels_per_day.unwrap_or(defaults.max_pixels_per_day),
            },
            None => defaults,
        };
        zoom_bounds
            .validate()
            .context("Invalid timeline zoom bounds in config")?;

        Ok(Self {
            home,
            recordings,
            config_file,
            retry: parsed.retry.unwrap_or_default(),
            zoom_bounds,
        })
    }

    /// Recording queue log ($MEMLINE_HOME/queue.jsonl)
    pub fn queue_path(&self) -> PathBuf {
        self.home.join("queue.jsonl")
    }

    /// SQLite database ($MEMLINE_HOME/memline.db)
    pub fn database_path(&self) -> PathBuf {
        self.home.join("memline.db")
    }

    /// Key-value settings ($MEMLINE_HOME/settings.json)
    pub fn settings_path(&self) -> PathBuf {
        self.home.join("settings.json")
    }
}

fn default_home() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR))
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}
