//! Review and browsing commands.
//!
//! - `memline pending list|show|approve|reject|edit|suggest`
//! - `memline events list`
//! - `memline eras add|list|delete`

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Subcommand;
use uuid::Uuid;

use super::App;
use crate::core::{normalize_category, ReviewError, ReviewService};
use crate::domain::{Era, PendingEvent};
use crate::store::{EraRepository, EventRepository};

#[derive(Subcommand, Debug)]
pub enum PendingCommands {
    /// List events waiting for review
    List {
        /// Include already approved records
        #[arg(short, long)]
        all: bool,
    },

    /// Show one pending event in full
    Show { id: String },

    /// Promote a pending event to the timeline
    Approve { id: String },

    /// Discard a pending event
    Reject { id: String },

    /// Correct fields before approving
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Replace tags (comma-separated)
        #[arg(long)]
        tags: Option<String>,
    },

    /// Suggest existing tags for a pending event
    Suggest {
        id: String,

        #[arg(short, long, default_value = "5")]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum EventCommands {
    /// List approved events in a date range
    List {
        /// From date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// To date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Delete an approved event
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum EraCommands {
    /// Add a named life phase
    Add {
        name: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD); omit for an ongoing era
        #[arg(long)]
        end: Option<String>,

        /// Hex color, e.g. #4A90D9
        #[arg(long, default_value = "#4A90D9")]
        color: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// List eras
    List,

    /// Delete an era (its events stay, unassigned)
    Delete { id: String },
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).with_context(|| format!("Invalid id: {}", raw))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date (expected YYYY-MM-DD): {}", raw))
}

fn earliest() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or_default()
}

fn latest() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or_default()
}

fn review_service(app: &App) -> ReviewService {
    ReviewService::new(app.store.clone(), app.store.clone())
}

pub async fn execute_pending(app: &App, command: PendingCommands) -> Result<()> {
    let review = review_service(app);

    match command {
        PendingCommands::List { all } => {
            let filter = if all { None } else { Some(false) };
            let records = review.list(filter).await?;

            if records.is_empty() {
                println!("Nothing to review");
                return Ok(());
            }

            println!("{:<38} {:<10} {:<12} {:<6} {}", "ID", "DATE", "CATEGORY", "CONF", "TITLE");
            println!("{}", "-".repeat(100));
            for record in &records {
                println!(
                    "{:<38} {:<10} {:<12} {:<6.2} {}{}",
                    record.id,
                    record.start_date,
                    record.category.map(|c| c.as_str()).unwrap_or("-"),
                    record.confidence_score,
                    record.title,
                    if record.is_approved { " ✓" } else { "" }
                );
            }
            println!();
            println!("{} record(s)", records.len());
        }

        PendingCommands::Show { id } => {
            let id = parse_id(&id)?;
            match review.get(id).await? {
                Some(record) => print_pending(&record),
                None => anyhow::bail!("Pending event not found: {}", id),
            }
        }

        PendingCommands::Approve { id } => {
            let id = parse_id(&id)?;
            let approval = review.approve(id).await?;
            println!("✓ Approved: {} ({})", approval.event.title, approval.event.id);
        }

        PendingCommands::Reject { id } => {
            let id = parse_id(&id)?;
            match review.reject(id).await {
                Ok(true) => println!("✓ Rejected {}", id),
                Ok(false) => println!("Nothing to reject: {} does not exist", id),
                Err(ReviewError::AlreadyApproved(_)) => {
                    anyhow::bail!("{} is already on the timeline; delete the event instead", id)
                }
                Err(e) => return Err(e.into()),
            }
        }

        PendingCommands::Edit {
            id,
            title,
            start,
            end,
            category,
            tags,
        } => {
            let id = parse_id(&id)?;
            let mut record = review
                .get(id)
                .await?
                .with_context(|| format!("Pending event not found: {}", id))?;

            if let Some(title) = title {
                record.title = title;
            }
            if let Some(start) = start {
                record.start_date = parse_date(&start)?;
            }
            if let Some(end) = end {
                record.end_date = if end.is_empty() { None } else { Some(parse_date(&end)?) };
            }
            if let Some(category) = category {
                record.category = Some(normalize_category(&category));
            }
            if let Some(tags) = tags {
                record.tags = split_list(&tags);
            }

            review.update(&record).await?;
            println!("✓ Updated {}", id);
            print_pending(&record);
        }

        PendingCommands::Suggest { id, limit } => {
            let id = parse_id(&id)?;
            let suggestions = review.suggest_tags(id, limit).await?;
            if suggestions.is_empty() {
                println!("No suggestions");
            }
            for suggestion in suggestions {
                println!("  {:<24} {:.2}", suggestion.tag, suggestion.score);
            }
        }
    }

    Ok(())
}

pub async fn execute_events(app: &App, command: EventCommands) -> Result<()> {
    match command {
        EventCommands::List { from, to } => {
            let from = from.as_deref().map(parse_date).transpose()?.unwrap_or(earliest());
            let to = to.as_deref().map(parse_date).transpose()?.unwrap_or(latest());

            let events = app.store.list_events_by_date_range(from, to).await?;
            if events.is_empty() {
                println!("No events in range");
                return Ok(());
            }

            println!("{:<10} {:<10} {:<12} {}", "START", "END", "CATEGORY", "TITLE");
            println!("{}", "-".repeat(80));
            for event in &events {
                println!(
                    "{:<10} {:<10} {:<12} {}",
                    event.start_date,
                    event.end_date.map(|d| d.to_string()).unwrap_or_default(),
                    event.category.as_str(),
                    event.title
                );
                if !event.tags.is_empty() {
                    println!("    #{}", event.tags.join(" #"));
                }
            }
        }

        EventCommands::Delete { id } => {
            let id = parse_id(&id)?;
            if app.store.delete_event(id).await? {
                println!("✓ Deleted {}", id);
            } else {
                println!("No event with id {}", id);
            }
        }
    }

    Ok(())
}

pub async fn execute_eras(app: &App, command: EraCommands) -> Result<()> {
    match command {
        EraCommands::Add {
            name,
            start,
            end,
            color,
            description,
        } => {
            let mut era = Era::new(name, parse_date(&start)?, color);
            if let Some(end) = end {
                era = era.with_end_date(parse_date(&end)?);
            }
            era.description = description;
            era.validate()?;

            app.store.add_era(&era).await?;
            println!("✓ Added era {} ({})", era.name, era.id);
        }

        EraCommands::List => {
            let eras = app.store.list_eras().await?;
            if eras.is_empty() {
                println!("No eras");
                return Ok(());
            }
            println!("{:<38} {:<10} {:<10} {:<8} {}", "ID", "START", "END", "COLOR", "NAME");
            println!("{}", "-".repeat(90));
            for era in eras {
                println!(
                    "{:<38} {:<10} {:<10} {:<8} {}",
                    era.id,
                    era.start_date,
                    era.end_date.map(|d| d.to_string()).unwrap_or_else(|| "ongoing".into()),
                    era.color_code,
                    era.name
                );
            }
        }

        EraCommands::Delete { id } => {
            let id = parse_id(&id)?;
            if app.store.delete_era(id).await? {
                println!("✓ Deleted era {}", id);
            } else {
                println!("No era with id {}", id);
            }
        }
    }

    Ok(())
}

fn print_pending(record: &PendingEvent) {
    println!("Title:       {}", record.title);
    println!("ID:          {}", record.id);
    match record.end_date {
        Some(end) => println!("Dates:       {} → {}", record.start_date, end),
        None => println!("Date:        {}", record.start_date),
    }
    println!(
        "Category:    {}",
        record.category.map(|c| c.as_str()).unwrap_or("(none)")
    );
    println!("Confidence:  {:.2}", record.confidence_score);
    if let Some(ref description) = record.description {
        println!("Description: {}", description);
    }
    if !record.tags.is_empty() {
        println!("Tags:        {}", record.tags.join(", "));
    }
    if !record.people.is_empty() {
        println!("People:      {}", record.people.join(", "));
    }
    if !record.locations.is_empty() {
        println!("Locations:   {}", record.locations.join(", "));
    }
    if let Some(ref source) = record.queue_item_id {
        println!("Recording:   {}", source);
    }
    println!("Status:      {}", if record.is_approved { "approved" } else { "pending" });
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
