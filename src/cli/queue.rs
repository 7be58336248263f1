//! Recording queue CLI commands.
//!
//! - `memline queue add|list|retry|clear`
//! - `memline import [dir]`
//! - `memline process [--once]`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use tokio_util::sync::CancellationToken;

use super::App;
use crate::adapters::extractor_from_settings;
use crate::core::{ExtractionPipeline, PipelineError};
use crate::domain::RecordingStatus;
use crate::ingest::{import_directory, transcriber_from_settings, FileMeta, ImportConfig};

#[derive(Subcommand, Debug)]
pub enum QueueCommands {
    /// Add one audio file
    Add {
        path: PathBuf,

        /// Recording length, if known
        #[arg(long)]
        duration: Option<f64>,
    },

    /// List queue items
    List {
        /// Filter by status (pending, processing, completed, failed)
        #[arg(short, long)]
        status: Option<String>,

        /// Maximum number of items to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Reset a failed item to pending
    Retry { id: String },

    /// Remove completed items
    Clear,
}

pub async fn execute(app: &App, command: QueueCommands) -> Result<()> {
    match command {
        QueueCommands::Add { path, duration } => execute_add(app, path, duration).await,
        QueueCommands::List { status, limit } => execute_list(app, status, limit).await,
        QueueCommands::Retry { id } => {
            let item = app.queue.retry(&id).await?;
            println!("✓ {} is pending again (retry #{})", item.file_name(), item.retry_count);
            Ok(())
        }
        QueueCommands::Clear => {
            let cleared = app.queue.clear_completed().await?;
            println!("✓ Cleared {} completed item(s)", cleared);
            Ok(())
        }
    }
}

async fn execute_add(app: &App, path: PathBuf, duration: Option<f64>) -> Result<()> {
    let path = path
        .canonicalize()
        .with_context(|| format!("Audio file not found: {}", path.display()))?;
    let metadata = tokio::fs::metadata(&path).await?;

    let item = app
        .queue
        .enqueue(
            &path,
            FileMeta {
                file_size_bytes: Some(metadata.len()),
                duration_seconds: duration,
            },
        )
        .await?;

    println!("✓ Queued {} ({})", item.file_name(), item.id);
    Ok(())
}

async fn execute_list(app: &App, status: Option<String>, limit: usize) -> Result<()> {
    let items = match status {
        Some(s) => {
            let status: RecordingStatus = s.parse().map_err(anyhow::Error::msg)?;
            app.queue.list_by_status(status).await?
        }
        None => app.queue.list_all().await?,
    };

    if items.is_empty() {
        println!("Queue is empty");
        return Ok(());
    }

    let counts = app.queue.status().await?;
    println!(
        "Pending: {}  Processing: {}  Completed: {}  Failed: {}",
        counts.pending, counts.processing, counts.completed, counts.failed
    );
    println!();
    println!("{:<38} {:<12} {:<30} {:<20}", "ID", "STATUS", "FILE", "CREATED");
    println!("{}", "-".repeat(100));

    for item in items.iter().take(limit) {
        println!(
            "{:<38} {:<12} {:<30} {:<20}",
            item.id,
            item.status.to_string(),
            truncate(&item.file_name(), 30),
            item.created_at.format("%Y-%m-%d %H:%M")
        );
        if let Some(ref error) = item.error_message {
            println!("    ↳ {}", error);
        }
    }

    if items.len() > limit {
        println!("... and {} more", items.len() - limit);
    }

    Ok(())
}

pub async fn execute_import(app: &App, dir: Option<PathBuf>, recursive: bool) -> Result<()> {
    let dir = dir
        .or_else(|| app.config.recordings.clone())
        .context("No directory given and paths.recordings is not configured")?;

    let config = ImportConfig {
        recursive,
        ..Default::default()
    };

    println!("📂 Scanning: {}", dir.display());
    let result = import_directory(&app.queue, &dir, &config).await?;

    println!();
    println!("Import Results:");
    println!("  New files queued: {}", result.queued);
    println!("  Already queued:   {}", result.already_queued);
    if result.errors > 0 {
        println!("  Errors:           {}", result.errors);
    }
    println!("  Total scanned:    {}", result.total_scanned());

    Ok(())
}

pub async fn execute_process(app: &App, once: bool) -> Result<()> {
    let transcriber = transcriber_from_settings(&app.settings)?;
    let extractor = extractor_from_settings(&app.settings)?;
    println!("Using {} + {}", transcriber.name(), extractor.name());

    let pipeline = ExtractionPipeline::new(
        Arc::clone(&app.queue),
        transcriber,
        extractor,
        app.store.clone(),
        app.store.clone(),
    )
    .with_retry_policy(app.config.retry.clone());

    if once {
        return match pipeline.process_next().await {
            Ok(Some(created)) => {
                println!("✓ Staged {} event(s) for review", created.len());
                Ok(())
            }
            Ok(None) => {
                println!("✓ No pending items to process");
                Ok(())
            }
            Err(PipelineError::AlreadyRunning) => {
                anyhow::bail!("Another processing run is in progress")
            }
            Err(e) => Err(e.into()),
        };
    }

    // Stop between items on Ctrl+C
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n🛑 Stopping after the current item...");
            on_signal.cancel();
        }
    });

    let summary = pipeline.process_all_pending(&cancel).await?;

    println!();
    println!("Processing Results:");
    println!("  Completed:      {}", summary.completed);
    println!("  Failed:         {}", summary.failed);
    println!("  Events staged:  {}", summary.pending_created);
    if summary.cancelled {
        println!("  (cancelled before the queue was empty)");
    }
    if summary.failed > 0 {
        println!();
        println!("Failed items keep their error; `memline queue retry <id>` re-queues them.");
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}
