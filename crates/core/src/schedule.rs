//! Date arithmetic for target dates and calendar summaries.

use crate::extraction::CalendarSchedule;
use chrono::{Days, NaiveDate};

/// Average length of a month in days.
pub const DAYS_PER_MONTH: f64 = 30.44;

/// Horizon used when a schedule is requested before any target date is known.
pub const DEFAULT_HORIZON_DAYS: u64 = 365;

/// The date `months` months after `today`, counting a month as 30.44 days
/// and rounding to the nearest whole day.
pub fn target_date_after(today: NaiveDate, months: u32) -> NaiveDate {
    let days = (DAYS_PER_MONTH * f64::from(months)).round() as u64;
    today
        .checked_add_days(Days::new(days))
        .unwrap_or(NaiveDate::MAX)
}

/// The target date assumed when none has been set yet.
pub fn default_target_date(today: NaiveDate) -> NaiveDate {
    today
        .checked_add_days(Days::new(DEFAULT_HORIZON_DAYS))
        .unwrap_or(NaiveDate::MAX)
}

/// Event count and overall date range of a generated calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarSummary {
    pub event_count: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

impl CalendarSummary {
    /// Summarizes `schedule`, or `None` if it holds no events with valid dates.
    pub fn of(schedule: &CalendarSchedule) -> Option<Self> {
        let ranges: Vec<(NaiveDate, NaiveDate)> = schedule
            .events
            .iter()
            .filter_map(|event| event.dates().ok())
            .collect();
        let first_date = ranges.iter().map(|(start, _)| *start).min()?;
        let last_date = ranges.iter().map(|(_, end)| *end).max()?;
        Some(Self {
            event_count: schedule.events.len(),
            first_date,
            last_date,
        })
    }
}
