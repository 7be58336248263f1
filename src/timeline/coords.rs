//! Date ↔ pixel mapping for one viewport snapshot.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

pub(crate) const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Fractional days from `from` to `to`
pub(crate) fn days_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// Largest shift `add_days` computes exactly; wider than chrono's range
const MAX_SHIFT_DAYS: f64 = 200_000_000.0;

/// Shift `t` by fractional days, saturating at the representable range
pub(crate) fn add_days(t: NaiveDateTime, days: f64) -> NaiveDateTime {
    let days = days.clamp(-MAX_SHIFT_DAYS, MAX_SHIFT_DAYS);
    let delta = Duration::milliseconds((days * MILLIS_PER_DAY).round() as i64);
    t.checked_add_signed(delta).unwrap_or(if days < 0.0 {
        NaiveDateTime::MIN
    } else {
        NaiveDateTime::MAX
    })
}

pub(crate) fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Stateless converter; copy it out of a [`Viewport`](super::Viewport)
/// and the same inputs always give the same pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateConverter {
    start: NaiveDateTime,
    end: NaiveDateTime,
    pixels_per_day: f64,
}

impl CoordinateConverter {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, pixels_per_day: f64) -> Self {
        Self {
            start,
            end,
            pixels_per_day,
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn pixels_per_day(&self) -> f64 {
        self.pixels_per_day
    }

    /// Visible width in pixels
    pub fn width(&self) -> f64 {
        days_between(self.start, self.end) * self.pixels_per_day
    }

    pub fn date_to_screen_x(&self, date: NaiveDate) -> f64 {
        self.datetime_to_screen_x(midnight(date))
    }

    pub fn datetime_to_screen_x(&self, t: NaiveDateTime) -> f64 {
        days_between(self.start, t) * self.pixels_per_day
    }

    pub fn screen_x_to_datetime(&self, x: f64) -> NaiveDateTime {
        add_days(self.start, x / self.pixels_per_day)
    }

    /// Calendar day under `x`
    pub fn screen_x_to_date(&self, x: f64) -> NaiveDate {
        self.screen_x_to_datetime(x).date()
    }

    pub fn days_to_pixels(&self, days: f64) -> f64 {
        days * self.pixels_per_day
    }

    /// Whether `[start, end]` overlaps the visible window. Point events
    /// pass `None` and use `start` for both bounds.
    pub fn is_range_visible(&self, start: NaiveDate, end: Option<NaiveDate>) -> bool {
        let last = end.unwrap_or(start);
        !(last < self.start.date() || start > self.end.date())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn converter() -> CoordinateConverter {
        CoordinateConverter::new(midnight(date(2024, 1, 1)), midnight(date(2024, 3, 11)), 2.0)
    }

    #[test]
    fn test_month_scale_feb_first() {
        let x = converter().date_to_screen_x(date(2024, 2, 1));
        assert!((x - 62.0).abs() < 1e-9);
    }

    #[test]
    fn test_inverse() {
        let c = converter();
        assert_eq!(c.screen_x_to_date(62.0), date(2024, 2, 1));
        assert_eq!(c.screen_x_to_date(63.9), date(2024, 2, 1));
        assert_eq!(c.screen_x_to_date(-1.0), date(2023, 12, 31));
    }

    #[test]
    fn test_monotone() {
        let c = converter();
        let mut last = f64::MIN;
        let mut d = date(2023, 6, 1);
        while d < date(2024, 9, 1) {
            let x = c.date_to_screen_x(d);
            assert!(x >= last);
            last = x;
            d = d.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_add_days_saturates() {
        let t = midnight(date(2024, 1, 1));
        assert_eq!(add_days(t, 1e12), NaiveDateTime::MAX);
        assert_eq!(add_days(t, -1e12), NaiveDateTime::MIN);
        assert_eq!(add_days(NaiveDateTime::MAX, 1.0), NaiveDateTime::MAX);
        assert_eq!(add_days(t, 1.5), midnight(date(2024, 1, 2)) + Duration::hours(12));
    }

    #[test]
    fn test_visibility() {
        let c = converter();
        assert!(c.is_range_visible(date(2024, 2, 1), None));
        assert!(c.is_range_visible(date(2023, 12, 1), Some(date(2024, 1, 1))));
        assert!(c.is_range_visible(date(2023, 1, 1), Some(date(2025, 1, 1))));
        assert!(!c.is_range_visible(date(2023, 12, 1), Some(date(2023, 12, 31))));
        assert!(!c.is_range_visible(date(2024, 3, 12), None));
    }
}
