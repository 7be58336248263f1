//! `memline timeline`: ruler ticks and track layout for a date window.

use std::collections::HashMap;

use anyhow::{Context, Result};
use clap::Args;
use uuid::Uuid;

use super::review::parse_date;
use super::App;
use crate::store::{EraRepository, EventRepository};
use crate::timeline::{generate_ticks, layout, LayoutConfig, PlacedItem, Viewport, ZoomLevel};

#[derive(Args, Debug)]
pub struct TimelineArgs {
    /// Window start (YYYY-MM-DD)
    #[arg(long)]
    pub from: String,

    /// Window end (YYYY-MM-DD); ignored when --level is given
    #[arg(long)]
    pub to: Option<String>,

    /// Snap to a zoom level instead of fitting the range (year, month, week, day)
    #[arg(long)]
    pub level: Option<String>,

    /// Viewport width in pixels
    #[arg(long, default_value = "1200")]
    pub width: f64,

    /// Viewport height in pixels
    #[arg(long, default_value = "400")]
    pub height: f64,

    /// Print major ticks only
    #[arg(long)]
    pub major_only: bool,
}

fn parse_level(raw: &str) -> Result<ZoomLevel> {
    ZoomLevel::ALL
        .into_iter()
        .find(|level| level.as_str().eq_ignore_ascii_case(raw.trim()))
        .with_context(|| format!("Unknown zoom level: {} (expected year, month, week or day)", raw))
}

pub async fn execute(app: &App, args: TimelineArgs) -> Result<()> {
    let from = parse_date(&args.from)?;

    let viewport = match (&args.level, &args.to) {
        (Some(level), _) => Viewport::at_level(from, parse_level(level)?, args.width, args.height)?,
        (None, Some(to)) => Viewport::new(from, parse_date(to)?, args.width, args.height)?,
        (None, None) => anyhow::bail!("Give either --to or --level"),
    }
    .with_bounds(app.config.zoom_bounds)?;

    let converter = viewport.converter();
    let window_start = viewport.start().date();
    let window_end = viewport.end().date();

    println!(
        "{} → {}  ({:.1} days, {:.3} px/day, level {})",
        window_start,
        window_end,
        viewport.visible_days(),
        viewport.pixels_per_day(),
        viewport.zoom_level()
    );
    println!();

    println!("Ruler:");
    for tick in generate_ticks(&converter) {
        match (tick.major, &tick.label) {
            (true, Some(label)) => println!("  {:>8.1}px  ┃ {}", tick.x, label),
            (true, None) => println!("  {:>8.1}px  ┃", tick.x),
            (false, _) if !args.major_only => println!("  {:>8.1}px  │", tick.x),
            _ => {}
        }
    }
    println!();

    let events = app
        .store
        .list_events_by_date_range(window_start, window_end)
        .await?;
    let eras = app.store.list_eras().await?;

    let config = LayoutConfig::default();
    let placed = layout(&converter, &events, &eras, &config);

    let titles: HashMap<Uuid, &str> = events
        .iter()
        .map(|e| (e.id, e.title.as_str()))
        .chain(eras.iter().map(|e| (e.id, e.name.as_str())))
        .collect();

    print_section("Eras", placed.era_tracks(), &placed.eras, &titles, &config);
    print_section("Events", placed.event_tracks(), &placed.events, &titles, &config);
    print_section(
        "Milestones",
        placed.milestone_tracks(),
        &placed.milestones,
        &titles,
        &config,
    );

    Ok(())
}

fn print_section(
    heading: &str,
    tracks: usize,
    items: &[PlacedItem],
    titles: &HashMap<Uuid, &str>,
    config: &LayoutConfig,
) {
    println!("{} ({} item(s), {} track(s)):", heading, items.len(), tracks);
    for item in items {
        println!(
            "  track {:<2} y={:<6.0} [{:>8.1}, {:>8.1}]  {}",
            item.track,
            item.offset_y(config),
            item.span.start,
            item.span.end,
            titles.get(&item.id).copied().unwrap_or("?")
        );
    }
    println!();
}
