//! Validation of path and query parameters.
//!
//! The checks run in a fixed order and the first failure wins; the messages
//! are part of the public API.

use chrono::NaiveDate;
use thiserror::Error;

use crate::config::ApiConfig;

/// A rejected request parameter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    /// Year missing, non-numeric or outside the configured range.
    #[error("Wrong year input - must be a number between {min} - {max}.")]
    Year {
        /// Earliest accepted year.
        min: i32,
        /// Latest accepted year.
        max: i32,
    },

    /// Month outside 1 - 12.
    #[error("Wrong month input - must be a number between 1 - 12.")]
    Month,

    /// Day outside 1 - 31.
    #[error("Wrong date input - must be a number between 1 - 31.")]
    Day,

    /// In-range components that still don't name a real day, e.g. 31 April.
    #[error("{day}/{month}/{year} is not a valid calendar date!")]
    NotACalendarDate {
        /// Day of month.
        day: u32,
        /// Month of year.
        month: u32,
        /// Year.
        year: i32,
    },

    /// The `num` query parameter is not a positive integer.
    #[error("Wrong query string num - must be a number greater than zero")]
    Num,

    /// Unknown aggregation group.
    #[error("Wrong group input - must be one of local, mainland, others or all.")]
    Group,
}

/// Parse a year component and check it against the configured range.
///
/// # Errors
///
/// Returns [`ParamError::Year`] if the text isn't an integer in range.
pub fn parse_year(text: &str, limits: &ApiConfig) -> Result<i32, ParamError> {
    let err = ParamError::Year {
        min: limits.min_year,
        max: limits.max_year,
    };
    let year: i32 = text.trim().parse().map_err(|_| err.clone())?;
    if year < limits.min_year || year > limits.max_year {
        return Err(err);
    }
    Ok(year)
}

/// Parse a month component.
///
/// # Errors
///
/// Returns [`ParamError::Month`] if the text isn't an integer in 1 - 12.
pub fn parse_month(text: &str) -> Result<u32, ParamError> {
    match text.trim().parse::<u32>() {
        Ok(month @ 1..=12) => Ok(month),
        _ => Err(ParamError::Month),
    }
}

/// Parse a day component.
///
/// # Errors
///
/// Returns [`ParamError::Day`] if the text isn't an integer in 1 - 31.
pub fn parse_day(text: &str) -> Result<u32, ParamError> {
    match text.trim().parse::<u32>() {
        Ok(day @ 1..=31) => Ok(day),
        _ => Err(ParamError::Day),
    }
}

/// Validate a `year/month/day` triple into a calendar date.
///
/// # Errors
///
/// Returns the first failing check, in year, month, day, calendar order.
pub fn parse_date(
    year: &str,
    month: &str,
    day: &str,
    limits: &ApiConfig,
) -> Result<NaiveDate, ParamError> {
    let year = parse_year(year, limits)?;
    let month = parse_month(month)?;
    let day = parse_day(day)?;
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or(ParamError::NotACalendarDate { day, month, year })
}

/// Parse the optional `num` query parameter.
///
/// A missing or empty value defaults to 1. Values above `limits.max_range_days`
/// are clamped.
///
/// # Errors
///
/// Returns [`ParamError::Num`] for non-integers and values below 1.
pub fn parse_num(text: Option<&str>, limits: &ApiConfig) -> Result<u32, ParamError> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(1);
    };
    let num: i64 = text.parse().map_err(|_| ParamError::Num)?;
    if num < 1 {
        return Err(ParamError::Num);
    }
    Ok(u32::try_from(num)
        .unwrap_or(u32::MAX)
        .min(limits.max_range_days))
}
