//! Track packing for event pins, era bars and milestone markers.
//!
//! Each kind gets its own track set. Items are placed greedily, in start
//! order, into the first track where their pixel span intersects nothing
//! already placed there.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::coords::CoordinateConverter;
use crate::domain::{Era, Event};

/// Pixel sizes used to turn dates into spans
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Minimum width of an event pin
    pub pin_width: f64,
    /// Width reserved for a milestone marker's label, centered on its date
    pub milestone_width: f64,
    /// Vertical distance between tracks
    pub track_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            pin_width: 24.0,
            milestone_width: 16.0,
            track_height: 28.0,
        }
    }
}

/// A horizontal extent in screen pixels, `start <= end`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

impl Span {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Touching edges do not count as overlap
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Greedy first-fit. `spans` must already be in placement order; the
/// result holds one track index per span.
pub fn assign_tracks(spans: &[Span]) -> Vec<usize> {
    let mut tracks: Vec<Vec<Span>> = Vec::new();
    let mut assigned = Vec::with_capacity(spans.len());

    for span in spans {
        let free = tracks
            .iter()
            .position(|placed| placed.iter().all(|p| !p.overlaps(span)));

        let track = match free {
            Some(index) => index,
            None => {
                tracks.push(Vec::new());
                tracks.len() - 1
            }
        };
        tracks[track].push(*span);
        assigned.push(track);
    }

    assigned
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedItem {
    pub id: Uuid,
    pub span: Span,
    pub track: usize,
}

impl PlacedItem {
    /// Distance above the axis; tracks stack upward
    pub fn offset_y(&self, config: &LayoutConfig) -> f64 {
        self.track as f64 * config.track_height
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineLayout {
    pub events: Vec<PlacedItem>,
    pub eras: Vec<PlacedItem>,
    pub milestones: Vec<PlacedItem>,
}

impl TimelineLayout {
    pub fn event_tracks(&self) -> usize {
        track_count(&self.events)
    }

    pub fn era_tracks(&self) -> usize {
        track_count(&self.eras)
    }

    pub fn milestone_tracks(&self) -> usize {
        track_count(&self.milestones)
    }
}

fn track_count(items: &[PlacedItem]) -> usize {
    items.iter().map(|i| i.track + 1).max().unwrap_or(0)
}

fn place(mut items: Vec<(NaiveDate, Uuid, Span)>) -> Vec<PlacedItem> {
    items.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    let spans: Vec<Span> = items.iter().map(|(_, _, span)| *span).collect();

    items
        .into_iter()
        .zip(assign_tracks(&spans))
        .map(|((_, id, span), track)| PlacedItem { id, span, track })
        .collect()
}

/// Lay out the visible subset of `events` and `eras`.
///
/// Milestone-category events become markers in their own track set.
/// Ongoing eras extend to the right edge of the viewport.
pub fn layout(
    converter: &CoordinateConverter,
    events: &[Event],
    eras: &[Era],
    config: &LayoutConfig,
) -> TimelineLayout {
    let mut pins = Vec::new();
    let mut markers = Vec::new();

    for event in events {
        if !converter.is_range_visible(event.start_date, event.end_date) {
            continue;
        }

        let x = converter.date_to_screen_x(event.start_date);
        if event.is_milestone() {
            let half = config.milestone_width / 2.0;
            markers.push((event.start_date, event.id, Span::new(x - half, x + half)));
        } else {
            let end_x = event
                .end_date
                .map(|d| converter.date_to_screen_x(d))
                .unwrap_or(x);
            pins.push((
                event.start_date,
                event.id,
                Span::new(x, end_x.max(x + config.pin_width)),
            ));
        }
    }

    let bars = eras
        .iter()
        .filter(|era| converter.is_range_visible(era.start_date, era.end_date))
        .map(|era| {
            let x = converter.date_to_screen_x(era.start_date);
            let end_x = match era.end_date {
                Some(d) => converter.date_to_screen_x(d),
                None => converter.width(),
            };
            (era.start_date, era.id, Span::new(x, end_x.max(x)))
        })
        .collect();

    TimelineLayout {
        events: place(pins),
        eras: place(bars),
        milestones: place(markers),
    }
}
