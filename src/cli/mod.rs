//! Command-line interface for memline.
//!
//! Provides commands for queueing recordings, running the extraction
//! pipeline, reviewing pending events and printing timeline layouts.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::ingest::RecordingQueue;
use crate::settings::SettingsProvider;
use crate::store::SqliteStore;

pub mod queue;
pub mod review;
pub mod timeline;

/// memline - voice memories to a reviewable life timeline
#[derive(Parser, Debug)]
#[command(name = "memline")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the recording queue
    Queue {
        #[command(subcommand)]
        command: queue::QueueCommands,
    },

    /// Queue every audio file in a directory
    Import {
        /// Directory to scan (defaults to paths.recordings from config)
        dir: Option<PathBuf>,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Transcribe and extract events from pending recordings
    Process {
        /// Process only the oldest pending item and exit
        #[arg(long)]
        once: bool,
    },

    /// Review extracted events
    Pending {
        #[command(subcommand)]
        command: review::PendingCommands,
    },

    /// Browse approved events
    Events {
        #[command(subcommand)]
        command: review::EventCommands,
    },

    /// Manage eras (named life phases)
    Eras {
        #[command(subcommand)]
        command: review::EraCommands,
    },

    /// Print ruler ticks and track layout for a date range
    Timeline(timeline::TimelineArgs),

    /// Read or change settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },

    /// Show resolved configuration (debug)
    Config,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Print one setting, or all of them
    Get { key: Option<String> },

    /// Set a value (JSON literals keep their type)
    Set { key: String, value: String },

    /// Remove a setting
    Unset { key: String },
}

/// Everything a command needs, opened from the resolved config
pub struct App {
    pub config: Config,
    pub settings: SettingsProvider,
    pub queue: Arc<RecordingQueue>,
    pub store: Arc<SqliteStore>,
}

impl App {
    pub async fn open(config: Config) -> Result<Self> {
        tokio::fs::create_dir_all(&config.home)
            .await
            .with_context(|| format!("Failed to create data directory: {}", config.home.display()))?;

        let mut settings = SettingsProvider::new(config.settings_path());
        settings
            .initialize()
            .await
            .context("Failed to load settings")?;

        let queue = RecordingQueue::open(config.queue_path()).await?;
        let store = SqliteStore::open(&config.database_path())
            .with_context(|| format!("Failed to open database: {}", config.database_path().display()))?;

        Ok(Self {
            config,
            settings,
            queue: Arc::new(queue),
            store: Arc::new(store),
        })
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = Config::load()?;

        if let Commands::Config = self.command {
            return show_config(&config);
        }

        let mut app = App::open(config).await?;

        match self.command {
            Commands::Queue { command } => queue::execute(&app, command).await,
            Commands::Import { dir, recursive } => queue::execute_import(&app, dir, recursive).await,
            Commands::Process { once } => queue::execute_process(&app, once).await,
            Commands::Pending { command } => review::execute_pending(&app, command).await,
            Commands::Events { command } => review::execute_events(&app, command).await,
            Commands::Eras { command } => review::execute_eras(&app, command).await,
            Commands::Timeline(args) => timeline::execute(&app, args).await,
            Commands::Settings { command } => execute_settings(&mut app.settings, command).await,
            Commands::Config => Ok(()),
        }
    }
}

async fn execute_settings(settings: &mut SettingsProvider, command: SettingsCommands) -> Result<()> {
    match command {
        SettingsCommands::Get { key: Some(key) } => {
            match settings.get_json(&key)? {
                Some(value) => println!("{}", value),
                None => println!("(unset)"),
            }
        }
        SettingsCommands::Get { key: None } => {
            let keys: Vec<String> = settings.keys().map(str::to_string).collect();
            if keys.is_empty() {
                println!("No settings (file: {})", settings.path().display());
            }
            for key in keys {
                if let Some(value) = settings.get_json(&key)? {
                    println!("{} = {}", key, value);
                }
            }
        }
        SettingsCommands::Set { key, value } => {
            settings.set_from_str(&key, &value).await?;
            println!("✓ {} updated", key);
        }
        SettingsCommands::Unset { key } => {
            if settings.remove(&key).await? {
                println!("✓ {} removed", key);
            } else {
                println!("{} was not set", key);
            }
        }
    }

    Ok(())
}

fn show_config(cfg: &Config) -> Result<()> {
    println!("memline configuration");
    println!("══════════════════════════════════════════════════════════════");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:       {}", cfg.home.display());
    println!("  Queue:      {}", cfg.queue_path().display());
    println!("  Database:   {}", cfg.database_path().display());
    println!("  Settings:   {}", cfg.settings_path().display());
    if let Some(ref dir) = cfg.recordings {
        println!("  Recordings: {}", dir.display());
    }
    println!();
    println!("Retry policy:");
    println!("  Max attempts:  {}", cfg.retry.max_attempts);
    println!("  Initial delay: {}ms", cfg.retry.initial_delay_ms);
    println!("  Max delay:     {}ms", cfg.retry.max_delay_ms);
    println!("  Multiplier:    {}", cfg.retry.backoff_multiplier);
    println!();
    println!("Timeline zoom:");
    println!("  Min px/day: {}", cfg.zoom_bounds.min_pixels_per_day);
    println!("  Max px/day: {}", cfg.zoom_bounds.max_pixels_per_day);

    Ok(())
}
