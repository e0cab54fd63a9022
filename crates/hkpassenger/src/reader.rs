//! Date-range reads of paired arrival/departure records.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::config::ApiConfig;
use crate::dates;
use crate::error::Result;
use crate::params::{self, ParamError};
use crate::record::FlowRecord;
use crate::store::FlowStore;

/// A validated range request: `num` consecutive days from `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeQuery {
    /// First day of the range.
    pub start: NaiveDate,
    /// Number of consecutive days.
    pub num: u32,
}

impl RangeQuery {
    /// Validate raw path and query parameters.
    ///
    /// # Errors
    ///
    /// Returns the first failing check: year, month, day, calendar date, num.
    pub fn parse(
        year: &str,
        month: &str,
        day: &str,
        num: Option<&str>,
        limits: &ApiConfig,
    ) -> std::result::Result<Self, ParamError> {
        let start = params::parse_date(year, month, day, limits)?;
        let num = params::parse_num(num, limits)?;
        Ok(Self { start, num })
    }

    /// The storage date strings covered by this range.
    #[must_use]
    pub fn storage_dates(&self) -> Vec<String> {
        dates::consecutive_days(self.start, self.num)
            .into_iter()
            .map(dates::storage_date)
            .collect()
    }
}

/// Fetch the records for a range and keep only complete pairs.
///
/// # Errors
///
/// Returns an error if the store query fails.
pub async fn read_range(store: &dyn FlowStore, query: &RangeQuery) -> Result<Vec<FlowRecord>> {
    let wanted = query.storage_dates();
    let records = store.find_by_dates(&wanted).await?;
    debug!(
        "Range from {} ({} days) matched {} records",
        query.start,
        query.num,
        records.len()
    );
    Ok(pair_records(records))
}

/// Rewrite dates into display form, group by date and keep groups of exactly
/// two, Arrival first.
///
/// Groups come out in text order of the display date.
#[must_use]
pub fn pair_records(records: Vec<FlowRecord>) -> Vec<FlowRecord> {
    let mut by_date: BTreeMap<String, Vec<FlowRecord>> = BTreeMap::new();
    for mut record in records {
        record.date = dates::storage_to_display(&record.date);
        by_date.entry(record.date.clone()).or_default().push(record);
    }

    by_date
        .into_values()
        .filter(|group| group.len() == 2)
        .flat_map(|mut group| {
            group.sort_by_key(|record| record.flow);
            group
        })
        .collect()
}
