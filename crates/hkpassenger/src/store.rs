//! The record store abstraction the API runs against.
//!
//! [`crate::storage::Storage`] is the `SQLite` implementation. A single handle
//! is built at startup and shared by every request as `Arc<dyn FlowStore>`.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::record::{FlowEntry, FlowRecord};

/// Persistent collection of [`FlowRecord`]s.
#[async_trait]
pub trait FlowStore: Send + Sync + std::fmt::Debug {
    /// Records whose storage date string is one of `dates`, ordered by
    /// `(date, flow)` on the raw text.
    async fn find_by_dates(&self, dates: &[String]) -> Result<Vec<FlowRecord>>;

    /// Records whose calendar day falls within `first..=last`.
    async fn find_between(&self, first: NaiveDate, last: NaiveDate) -> Result<Vec<FlowRecord>>;

    /// Insert `entries` under `date` unless any record already carries that
    /// exact date string.
    ///
    /// The existence check and the inserts are atomic. Returns `false` when
    /// the date was already present and nothing was written.
    async fn insert_day(&self, date: &str, day: NaiveDate, entries: &[FlowEntry]) -> Result<bool>;
}
