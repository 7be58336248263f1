//! Viewport and zoom state.
//!
//! The viewport keeps `start`, `pixels_per_day` and `width` as its source
//! of truth; `end` and `center` are derived, so
//! `pixels_per_day × days(end - start) == width` always holds.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::coords::{add_days, days_between, midnight, CoordinateConverter};

/// Pixels per wheel notch (one detent on most mice)
const WHEEL_NOTCH: f64 = 120.0;

/// Scale change per wheel notch
const ZOOM_STEP: f64 = 1.1;

#[derive(Debug, Error, PartialEq)]
pub enum ViewportError {
    #[error("Viewport end {end} is not after start {start}")]
    InvalidRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Viewport size must be positive, got {width}x{height}")]
    InvalidSize { width: f64, height: f64 },

    #[error("Zoom bounds must satisfy 0 < min <= max, got [{min}, {max}]")]
    InvalidBounds { min: f64, max: f64 },
}

/// Discrete zoom levels, coarsest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomLevel {
    Year,
    Month,
    Week,
    Day,
}

impl ZoomLevel {
    pub const ALL: [ZoomLevel; 4] = [Self::Year, Self::Month, Self::Week, Self::Day];

    /// Canonical scale for this level
    pub fn pixels_per_day(self) -> f64 {
        match self {
            Self::Year => 0.1,
            Self::Month => 2.0,
            Self::Week => 15.0,
            Self::Day => 50.0,
        }
    }

    /// One level finer, `None` at `Day`
    pub fn finer(self) -> Option<Self> {
        match self {
            Self::Year => Some(Self::Month),
            Self::Month => Some(Self::Week),
            Self::Week => Some(Self::Day),
            Self::Day => None,
        }
    }

    /// One level coarser, `None` at `Year`
    pub fn coarser(self) -> Option<Self> {
        match self {
            Self::Year => None,
            Self::Month => Some(Self::Year),
            Self::Week => Some(Self::Month),
            Self::Day => Some(Self::Week),
        }
    }

    /// Level whose canonical scale is closest to `pixels_per_day`.
    ///
    /// Distance is measured on a log scale since the levels are spaced
    /// geometrically.
    pub fn nearest(pixels_per_day: f64) -> Self {
        let target = pixels_per_day.max(f64::MIN_POSITIVE).ln();
        let mut best = Self::Year;
        let mut best_distance = f64::INFINITY;

        for level in Self::ALL {
            let distance = (level.pixels_per_day().ln() - target).abs();
            if distance < best_distance {
                best = level;
                best_distance = distance;
            }
        }

        best
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Week => "week",
            Self::Day => "day",
        }
    }
}

impl fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a discrete zoom step
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomOutcome {
    Zoomed(ZoomLevel),
    /// Already at the finest/coarsest level; nothing changed
    AtLimit(ZoomLevel),
}

/// Allowed range for the continuous scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomBounds {
    pub min_pixels_per_day: f64,
    pub max_pixels_per_day: f64,
}

impl Default for ZoomBounds {
    fn default() -> Self {
        Self {
            min_pixels_per_day: 0.01,
            max_pixels_per_day: 50.0,
        }
    }
}

impl ZoomBounds {
    pub fn validate(&self) -> Result<(), ViewportError> {
        if self.min_pixels_per_day > 0.0 && self.min_pixels_per_day <= self.max_pixels_per_day {
            Ok(())
        } else {
            Err(ViewportError::InvalidBounds {
                min: self.min_pixels_per_day,
                max: self.max_pixels_per_day,
            })
        }
    }

    pub fn clamp(&self, pixels_per_day: f64) -> f64 {
        pixels_per_day.clamp(self.min_pixels_per_day, self.max_pixels_per_day)
    }
}

/// Visible window and scale of the timeline
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    start: NaiveDateTime,
    pixels_per_day: f64,
    zoom_level: ZoomLevel,
    width: f64,
    height: f64,
    scroll_position: f64,
    bounds: ZoomBounds,
}

impl Viewport {
    /// Fit `[start, end]` into `width` pixels
    pub fn new(start: NaiveDate, end: NaiveDate, width: f64, height: f64) -> Result<Self, ViewportError> {
        Self::from_range(midnight(start), midnight(end), width, height, ZoomBounds::default())
    }

    pub fn from_range(
        start: NaiveDateTime,
        end: NaiveDateTime,
        width: f64,
        height: f64,
        bounds: ZoomBounds,
    ) -> Result<Self, ViewportError> {
        if end <= start {
            return Err(ViewportError::InvalidRange { start, end });
        }
        check_size(width, height)?;
        bounds.validate()?;

        let pixels_per_day = width / days_between(start, end);
        Ok(Self {
            start,
            pixels_per_day,
            zoom_level: ZoomLevel::nearest(pixels_per_day),
            width,
            height,
            scroll_position: 0.0,
            bounds,
        })
    }

    /// Start at `start` with the canonical scale of `level`
    pub fn at_level(start: NaiveDate, level: ZoomLevel, width: f64, height: f64) -> Result<Self, ViewportError> {
        check_size(width, height)?;
        Ok(Self {
            start: midnight(start),
            pixels_per_day: level.pixels_per_day(),
            zoom_level: level,
            width,
            height,
            scroll_position: 0.0,
            bounds: ZoomBounds::default(),
        })
    }

    pub fn with_bounds(mut self, bounds: ZoomBounds) -> Result<Self, ViewportError> {
        bounds.validate()?;
        self.bounds = bounds;
        self.pixels_per_day = bounds.clamp(self.pixels_per_day);
        Ok(self)
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        add_days(self.start, self.visible_days())
    }

    pub fn center(&self) -> NaiveDateTime {
        add_days(self.start, self.visible_days() / 2.0)
    }

    pub fn zoom_level(&self) -> ZoomLevel {
        self.zoom_level
    }

    pub fn pixels_per_day(&self) -> f64 {
        self.pixels_per_day
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Vertical scroll offset of the track area, in pixels
    pub fn scroll_position(&self) -> f64 {
        self.scroll_position
    }

    pub fn bounds(&self) -> ZoomBounds {
        self.bounds
    }

    pub fn visible_days(&self) -> f64 {
        self.width / self.pixels_per_day
    }

    pub fn converter(&self) -> CoordinateConverter {
        CoordinateConverter::new(self.start, self.end(), self.pixels_per_day)
    }

    /// Keep the whole window inside chrono's date range
    fn place_start(&mut self, start: NaiveDateTime) {
        let latest = add_days(NaiveDateTime::MAX, -self.visible_days());
        self.start = start.min(latest).max(NaiveDateTime::MIN);
    }

    /// Re-scale around the current center
    fn set_scale_centered(&mut self, pixels_per_day: f64) {
        let center = self.center();
        self.pixels_per_day = pixels_per_day;
        self.place_start(add_days(center, -self.visible_days() / 2.0));
    }

    /// One discrete level finer, keeping the center date
    pub fn zoom_in(&mut self) -> ZoomOutcome {
        match self.zoom_level.finer() {
            Some(level) => self.zoom_to_level(level),
            None => ZoomOutcome::AtLimit(self.zoom_level),
        }
    }

    /// One discrete level coarser, keeping the center date
    pub fn zoom_out(&mut self) -> ZoomOutcome {
        match self.zoom_level.coarser() {
            Some(level) => self.zoom_to_level(level),
            None => ZoomOutcome::AtLimit(self.zoom_level),
        }
    }

    pub fn zoom_to_level(&mut self, level: ZoomLevel) -> ZoomOutcome {
        self.set_scale_centered(self.bounds.clamp(level.pixels_per_day()));
        self.zoom_level = level;
        ZoomOutcome::Zoomed(level)
    }

    /// Continuous zoom keeping the date under `cursor_x` fixed on screen.
    ///
    /// Positive `wheel_delta` zooms in; 120 units is one notch.
    pub fn zoom_at_cursor(&mut self, cursor_x: f64, wheel_delta: f64) {
        let factor = ZOOM_STEP.powf(wheel_delta / WHEEL_NOTCH);
        self.set_scale_at(cursor_x, self.pixels_per_day * factor);
    }

    /// Set the scale to `pixels_per_day` (clamped), anchored at `cursor_x`
    pub fn set_scale_at(&mut self, cursor_x: f64, pixels_per_day: f64) {
        let anchor = self.converter().screen_x_to_datetime(cursor_x);
        let new_scale = self.bounds.clamp(pixels_per_day);

        self.pixels_per_day = new_scale;
        self.place_start(add_days(anchor, -cursor_x / new_scale));
        self.zoom_level = ZoomLevel::nearest(new_scale);
    }

    /// Shift the window by `pixel_offset`; positive moves later in time.
    /// Stops at the ends of the supported date range.
    pub fn pan(&mut self, pixel_offset: f64) {
        self.place_start(add_days(self.start, pixel_offset / self.pixels_per_day));
    }

    /// Move so that `date` sits in the middle
    pub fn center_on(&mut self, date: NaiveDate) {
        self.place_start(add_days(midnight(date), -self.visible_days() / 2.0));
    }

    /// Change the viewport size; start and scale stay put
    pub fn resize(&mut self, width: f64, height: f64) -> Result<(), ViewportError> {
        check_size(width, height)?;
        self.width = width;
        self.height = height;
        self.place_start(self.start);
        Ok(())
    }

    /// Scroll the track area vertically; never above the axis
    pub fn scroll_by(&mut self, dy: f64) {
        self.scroll_position = (self.scroll_position + dy).max(0.0);
    }
}

fn check_size(width: f64, height: f64) -> Result<(), ViewportError> {
    if width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite() {
        Ok(())
    } else {
        Err(ViewportError::InvalidSize { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn assert_invariant(vp: &Viewport) {
        let days = days_between(vp.start(), vp.end());
        assert!(
            (vp.pixels_per_day() * days - vp.width()).abs() < 1e-3,
            "{} * {} != {}",
            vp.pixels_per_day(),
            days,
            vp.width()
        );
    }

    #[test]
    fn test_fit_range() {
        let vp = Viewport::new(date(2024, 1, 1), date(2024, 1, 11), 500.0, 300.0).unwrap();
        assert!((vp.pixels_per_day() - 50.0).abs() < 1e-9);
        assert_eq!(vp.zoom_level(), ZoomLevel::Day);
        assert_eq!(vp.center(), midnight(date(2024, 1, 6)));
        assert_invariant(&vp);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            Viewport::new(date(2024, 1, 2), date(2024, 1, 1), 500.0, 300.0),
            Err(ViewportError::InvalidRange { .. })
        ));
        assert!(matches!(
            Viewport::new(date(2024, 1, 1), date(2024, 2, 1), 0.0, 300.0),
            Err(ViewportError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_discrete_zoom_and_limits() {
        let mut vp = Viewport::at_level(date(2024, 1, 1), ZoomLevel::Week, 1000.0, 400.0).unwrap();
        let center = vp.center();

        assert_eq!(vp.zoom_in(), ZoomOutcome::Zoomed(ZoomLevel::Day));
        assert_eq!(vp.zoom_in(), ZoomOutcome::AtLimit(ZoomLevel::Day));
        assert!((vp.pixels_per_day() - 50.0).abs() < 1e-9);
        assert!((days_between(center, vp.center())).abs() < 1e-6);

        assert_eq!(vp.zoom_out(), ZoomOutcome::Zoomed(ZoomLevel::Week));
        assert_eq!(vp.zoom_out(), ZoomOutcome::Zoomed(ZoomLevel::Month));
        assert_eq!(vp.zoom_out(), ZoomOutcome::Zoomed(ZoomLevel::Year));
        assert_eq!(vp.zoom_out(), ZoomOutcome::AtLimit(ZoomLevel::Year));
        assert_invariant(&vp);
    }

    #[test]
    fn test_cursor_anchor_preserved() {
        let mut vp = Viewport::at_level(date(2024, 1, 1), ZoomLevel::Month, 1000.0, 400.0).unwrap();

        for (cursor, delta) in [(250.0, 120.0), (10.0, -360.0), (999.0, 600.0), (500.0, -2400.0)] {
            let anchor = vp.converter().screen_x_to_datetime(cursor);
            vp.zoom_at_cursor(cursor, delta);
            let x = vp.converter().datetime_to_screen_x(anchor);
            assert!((x - cursor).abs() < 1.0, "anchor drifted to {}", x);
            assert_invariant(&vp);
        }
    }

    #[test]
    fn test_cursor_zoom_clamps_and_snaps() {
        let mut vp = Viewport::at_level(date(2024, 1, 1), ZoomLevel::Week, 1000.0, 400.0).unwrap();
        vp.zoom_at_cursor(500.0, 120.0 * 100.0);
        assert_eq!(vp.pixels_per_day(), 50.0);
        assert_eq!(vp.zoom_level(), ZoomLevel::Day);

        vp.zoom_at_cursor(500.0, -120.0 * 1000.0);
        assert_eq!(vp.pixels_per_day(), 0.01);
        assert_eq!(vp.zoom_level(), ZoomLevel::Year);
    }

    #[test]
    fn test_nearest_level() {
        assert_eq!(ZoomLevel::nearest(0.05), ZoomLevel::Year);
        assert_eq!(ZoomLevel::nearest(1.9), ZoomLevel::Month);
        assert_eq!(ZoomLevel::nearest(10.0), ZoomLevel::Week);
        assert_eq!(ZoomLevel::nearest(40.0), ZoomLevel::Day);
    }

    #[test]
    fn test_pan_keeps_scale() {
        let mut vp = Viewport::at_level(date(2024, 1, 1), ZoomLevel::Month, 1000.0, 400.0).unwrap();
        vp.pan(20.0);
        assert_eq!(vp.start(), midnight(date(2024, 1, 11)));
        assert_eq!(vp.zoom_level(), ZoomLevel::Month);
        vp.pan(-40.0);
        assert_eq!(vp.start(), midnight(date(2023, 12, 22)));
        assert_invariant(&vp);
    }

    #[test]
    fn test_pan_stops_at_date_range_edges() {
        let mut vp = Viewport::at_level(date(2024, 1, 1), ZoomLevel::Year, 1000.0, 400.0).unwrap();
        for _ in 0..1000 {
            vp.pan(1.0e6);
        }
        assert_eq!(vp.end(), NaiveDateTime::MAX);
        assert_invariant(&vp);

        for _ in 0..1000 {
            vp.pan(-1.0e6);
        }
        assert_eq!(vp.start(), NaiveDateTime::MIN);
        assert_invariant(&vp);
    }

    #[test]
    fn test_scroll_never_negative() {
        let mut vp = Viewport::at_level(date(2024, 1, 1), ZoomLevel::Month, 1000.0, 400.0).unwrap();
        vp.scroll_by(30.0);
        vp.scroll_by(-100.0);
        assert_eq!(vp.scroll_position(), 0.0);
    }
}
