//! Day-by-day itinerary computation.
//!
//! A trip's itinerary always has exactly one entry per calendar day of its
//! inclusive date range, numbered from 1, with no gaps.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::model::{Activity, DailyItinerary};

/// Inclusive number of days between `start` and `end`.
///
/// # Errors
///
/// Returns [`Error::InvalidDateRange`] if `end` is before `start`.
pub fn day_count(start: NaiveDate, end: NaiveDate) -> Result<u32> {
    let span = (end - start).num_days();
    if span < 0 {
        return Err(Error::InvalidDateRange { start, end });
    }
    u32::try_from(span + 1).map_err(|_| Error::internal(format!("trip spans {span} days")))
}

/// Build an itinerary of `days` empty days starting at `start`.
#[must_use]
pub fn build(start: NaiveDate, days: u32) -> Vec<DailyItinerary> {
    start
        .iter_days()
        .zip(1..=days)
        .map(|(date, day)| DailyItinerary {
            day,
            date,
            activities: Vec::new(),
        })
        .collect()
}

/// Rebuild an itinerary for a new date range.
///
/// Days whose calendar date also appears in `old` keep their activities;
/// every other day starts empty. Days of `old` outside the new range are
/// dropped.
#[must_use]
pub fn regenerate(old: &[DailyItinerary], start: NaiveDate, days: u32) -> Vec<DailyItinerary> {
    let mut carried: HashMap<NaiveDate, &[Activity]> = old
        .iter()
        .map(|day| (day.date, day.activities.as_slice()))
        .collect();

    build(start, days)
        .into_iter()
        .map(|mut day| {
            if let Some(activities) = carried.remove(&day.date) {
                day.activities = activities.to_vec();
            }
            day
        })
        .collect()
}

/// Array position of the day falling on `date`.
#[must_use]
pub fn index_of_date(itinerary: &[DailyItinerary], date: NaiveDate) -> Option<usize> {
    itinerary.iter().position(|day| day.date == date)
}
