//! Net passenger flow per day or per month.
//!
//! Arrivals count positively and departures negatively, per traveller
//! category. Periods without records are left out rather than zero-filled.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::dates;
use crate::error::Result;
use crate::params::{self, ParamError};
use crate::record::FlowRecord;
use crate::store::FlowStore;

/// Traveller category selected for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    /// Hong Kong residents only.
    Local,
    /// Mainland visitors only.
    Mainland,
    /// Other visitors only.
    Others,
    /// All three categories plus their total.
    All,
}

impl FromStr for Group {
    type Err = ParamError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "mainland" => Ok(Self::Mainland),
            "others" => Ok(Self::Others),
            "all" => Ok(Self::All),
            _ => Err(ParamError::Group),
        }
    }
}

/// Aggregation granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// One bucket per day of the month.
    Month {
        /// Year.
        year: i32,
        /// Month of year.
        month: u32,
    },
    /// One bucket per month of the year.
    Year {
        /// Year.
        year: i32,
    },
}

/// A validated aggregation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateQuery {
    /// Which categories to report.
    pub group: Group,
    /// Which period to cover.
    pub period: Period,
}

impl AggregateQuery {
    /// Validate a daily-within-month request.
    ///
    /// # Errors
    ///
    /// Returns the first failing check: group, year, month.
    pub fn daily(
        group: &str,
        year: &str,
        month: &str,
        limits: &ApiConfig,
    ) -> std::result::Result<Self, ParamError> {
        let group = group.parse()?;
        let year = params::parse_year(year, limits)?;
        let month = params::parse_month(month)?;
        Ok(Self {
            group,
            period: Period::Month { year, month },
        })
    }

    /// Validate a monthly-within-year request.
    ///
    /// # Errors
    ///
    /// Returns the first failing check: group, year.
    pub fn monthly(
        group: &str,
        year: &str,
        limits: &ApiConfig,
    ) -> std::result::Result<Self, ParamError> {
        let group = group.parse()?;
        let year = params::parse_year(year, limits)?;
        Ok(Self {
            group,
            period: Period::Year { year },
        })
    }
}

/// Signed per-category sums for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetFlow {
    /// Net Hong Kong residents.
    pub local: i64,
    /// Net Mainland visitors.
    pub mainland: i64,
    /// Net other visitors.
    pub others: i64,
}

impl NetFlow {
    /// Fold one record into the sums.
    pub fn add(&mut self, record: &FlowRecord) {
        let sign = record.flow.sign();
        self.local += sign * i64::from(record.local);
        self.mainland += sign * i64::from(record.mainland);
        self.others += sign * i64::from(record.others);
    }

    /// Sum over all three categories.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.local + self.mainland + self.others
    }
}

/// One output row: a period label plus the selected net counts.
///
/// Serializes as `{"Date": "15/1/2022", "Local": ..}` for daily rows and
/// `{"Month": "1/2022", ..}` for monthly rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRow {
    /// Key naming the period field, `Date` or `Month`.
    pub period_key: &'static str,
    /// Period label.
    pub period: String,
    /// Which categories are emitted.
    pub group: Group,
    /// The sums.
    pub net: NetFlow,
}

impl Serialize for AggregateRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let fields = if self.group == Group::All { 5 } else { 2 };
        let mut map = serializer.serialize_map(Some(fields))?;
        map.serialize_entry(self.period_key, &self.period)?;
        match self.group {
            Group::Local => map.serialize_entry("Local", &self.net.local)?,
            Group::Mainland => map.serialize_entry("Mainland", &self.net.mainland)?,
            Group::Others => map.serialize_entry("Others", &self.net.others)?,
            Group::All => {
                map.serialize_entry("Local", &self.net.local)?;
                map.serialize_entry("Mainland", &self.net.mainland)?;
                map.serialize_entry("Others", &self.net.others)?;
                map.serialize_entry("Total", &self.net.total())?;
            }
        }
        map.end()
    }
}

/// Run an aggregation against the store.
///
/// # Errors
///
/// Returns an error if the store query fails.
pub async fn aggregate(store: &dyn FlowStore, query: &AggregateQuery) -> Result<Vec<AggregateRow>> {
    let rows = match query.period {
        Period::Month { year, month } => {
            let wanted: Vec<String> = dates::days_of_month(year, month)
                .into_iter()
                .map(dates::storage_date)
                .collect();
            let records = store.find_by_dates(&wanted).await?;
            daily_rows(&records, query.group)
        }
        Period::Year { year } => {
            let Some((first, last)) = dates::year_bounds(year) else {
                return Ok(Vec::new());
            };
            let records = store.find_between(first, last).await?;
            monthly_rows(&records, query.group)
        }
    };
    debug!("Aggregated {:?} into {} rows", query, rows.len());
    Ok(rows)
}

/// Bucket records per calendar day, in chronological order.
#[must_use]
pub fn daily_rows(records: &[FlowRecord], group: Group) -> Vec<AggregateRow> {
    let mut buckets: BTreeMap<NaiveDate, NetFlow> = BTreeMap::new();
    for record in records {
        let Some(day) = dates::parse_storage_date(&record.date) else {
            warn!("Skipping record with unreadable date {:?}", record.date);
            continue;
        };
        buckets.entry(day).or_default().add(record);
    }

    buckets
        .into_iter()
        .map(|(day, net)| AggregateRow {
            period_key: "Date",
            period: dates::display_date(day),
            group,
            net,
        })
        .collect()
}

/// Bucket records per (year, month), in chronological order.
#[must_use]
pub fn monthly_rows(records: &[FlowRecord], group: Group) -> Vec<AggregateRow> {
    let mut buckets: BTreeMap<(i32, u32), NetFlow> = BTreeMap::new();
    for record in records {
        let Some(day) = dates::parse_storage_date(&record.date) else {
            warn!("Skipping record with unreadable date {:?}", record.date);
            continue;
        };
        buckets
            .entry((day.year(), day.month()))
            .or_default()
            .add(record);
    }

    buckets
        .into_iter()
        .map(|((year, month), net)| AggregateRow {
            period_key: "Month",
            period: format!("{month}/{year}"),
            group,
            net,
        })
        .collect()
}
