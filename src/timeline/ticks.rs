//! Adaptive time-ruler ticks.

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::Serialize;

use super::coords::CoordinateConverter;

/// Minor ticks closer than this to a major tick are dropped
pub const MINOR_SUPPRESS_PX: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickUnit {
    Year,
    Quarter,
    Month,
    Week,
    Day,
}

impl TickUnit {
    /// Latest boundary of this unit at or before `date`. Weeks start on Monday.
    pub fn floor(self, date: NaiveDate) -> NaiveDate {
        let floored = match self {
            Self::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
            Self::Quarter => NaiveDate::from_ymd_opt(date.year(), (date.month0() / 3) * 3 + 1, 1),
            Self::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1),
            Self::Week => {
                date.checked_sub_signed(Duration::days(date.weekday().num_days_from_monday() as i64))
            }
            Self::Day => Some(date),
        };
        floored.unwrap_or(date)
    }

    /// Next boundary, `None` past the end of the calendar
    pub fn step(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Year => date.checked_add_months(Months::new(12)),
            Self::Quarter => date.checked_add_months(Months::new(3)),
            Self::Month => date.checked_add_months(Months::new(1)),
            Self::Week => date.checked_add_signed(Duration::days(7)),
            Self::Day => date.succ_opt(),
        }
    }

    pub fn label(self, date: NaiveDate) -> String {
        match self {
            Self::Year => date.format("%Y").to_string(),
            Self::Quarter => format!("Q{} {}", date.month0() / 3 + 1, date.year()),
            Self::Month => date.format("%b %Y").to_string(),
            Self::Week | Self::Day => date.format("%b %-d").to_string(),
        }
    }
}

/// (major, minor) units for a scale
pub fn granularity(pixels_per_day: f64) -> (TickUnit, TickUnit) {
    if pixels_per_day < 0.5 {
        (TickUnit::Year, TickUnit::Quarter)
    } else if pixels_per_day < 2.0 {
        (TickUnit::Quarter, TickUnit::Month)
    } else if pixels_per_day < 7.0 {
        (TickUnit::Month, TickUnit::Week)
    } else if pixels_per_day < 30.0 {
        (TickUnit::Week, TickUnit::Day)
    } else {
        (TickUnit::Day, TickUnit::Day)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub date: NaiveDate,
    pub x: f64,
    pub major: bool,
    /// Set on major ticks only
    pub label: Option<String>,
}

fn boundaries(unit: TickUnit, from: NaiveDate, until: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = Some(unit.floor(from));

    while let Some(date) = current {
        if date > until {
            break;
        }
        dates.push(date);
        current = unit.step(date);
    }

    dates
}

/// Ticks covering the converter's window, ordered by x.
///
/// Generation starts at the window start rounded down to the unit boundary
/// and stops at the first boundary past the window end.
pub fn generate_ticks(converter: &CoordinateConverter) -> Vec<Tick> {
    let (major_unit, minor_unit) = granularity(converter.pixels_per_day());
    let from = converter.start().date();
    let until = converter.end().date();

    let majors: Vec<Tick> = boundaries(major_unit, from, until)
        .into_iter()
        .map(|date| Tick {
            date,
            x: converter.date_to_screen_x(date),
            major: true,
            label: Some(major_unit.label(date)),
        })
        .collect();

    let mut ticks = majors.clone();
    if minor_unit != major_unit {
        let minors = boundaries(minor_unit, from, until)
            .into_iter()
            .map(|date| (date, converter.date_to_screen_x(date)))
            .filter(|(_, x)| majors.iter().all(|m| (m.x - x).abs() >= MINOR_SUPPRESS_PX))
            .map(|(date, x)| Tick {
                date,
                x,
                major: false,
                label: None,
            });
        ticks.extend(minors);
    }

    ticks.sort_by(|a, b| a.date.cmp(&b.date).then(b.major.cmp(&a.major)));
    ticks
}
