//! Calendar helpers for the two textual date forms.
//!
//! Records are stored under `month/day/year` and shown to API clients as
//! `day/month/year`, neither zero-padded.

use chrono::{Datelike, Days, NaiveDate};

/// Format a date in storage form, e.g. `1/15/2022`.
#[must_use]
pub fn storage_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}

/// Format a date in display form, e.g. `15/1/2022`.
#[must_use]
pub fn display_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}

/// Rewrite a storage date string into display form by swapping the first two
/// components.
///
/// Works on the text only, so non-canonical stored values (zero padding, odd
/// component counts) pass through unchanged in shape.
#[must_use]
pub fn storage_to_display(stored: &str) -> String {
    let mut parts = stored.splitn(3, '/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(d), Some(y)) => format!("{d}/{m}/{y}"),
        _ => stored.to_string(),
    }
}

/// Parse a storage date string (`month/day/year`).
///
/// Returns `None` unless the text has exactly three numeric components that
/// form a real calendar date.
#[must_use]
pub fn parse_storage_date(text: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = text.split('/').collect();
    let [month, day, year] = parts.as_slice() else {
        return None;
    };
    let month: u32 = parse_component(month)?;
    let day: u32 = parse_component(day)?;
    let year: i32 = parse_component(year)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_component<T: std::str::FromStr>(part: &str) -> Option<T> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// `count` consecutive calendar days starting at `start`.
#[must_use]
pub fn consecutive_days(start: NaiveDate, count: u32) -> Vec<NaiveDate> {
    (0..u64::from(count))
        .map_while(|offset| start.checked_add_days(Days::new(offset)))
        .collect()
}

/// Every calendar day of the given month, or an empty list for an invalid
/// month.
#[must_use]
pub fn days_of_month(year: i32, month: u32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|date| date.month() == month)
        .collect()
}

/// First and last day of a year.
#[must_use]
pub fn year_bounds(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    Some((
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}
