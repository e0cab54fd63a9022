//! Storage layer for hkpassenger.
//!
//! This module provides `SQLite`-based persistent storage for passenger flow
//! records and implements [`FlowStore`] on top of it.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::{Flow, FlowEntry, FlowRecord};
use crate::store::FlowStore;

const SELECT_RECORD: &str = "SELECT date, flow, local, mainland, others FROM daylog";

/// Storage engine for flow records.
///
/// Wraps a single `SQLite` connection behind a mutex. Clones share the same
/// connection.
#[derive(Debug, Clone)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Arc<Mutex<Connection>>,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// then brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let mut conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&mut conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&mut conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("storage connection lock poisoned"))
    }

    /// Get records whose storage date is one of `dates`.
    ///
    /// Ordered by `(date, flow)` using byte-wise text comparison, so
    /// `10/1/2022` sorts before `2/1/2022`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn records_for_dates(&self, dates: &[String]) -> Result<Vec<FlowRecord>> {
        if dates.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; dates.len()].join(", ");
        let sql = format!("{SELECT_RECORD} WHERE date IN ({placeholders}) ORDER BY date, flow");

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(dates.iter()), Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(
            "Found {} records for {} dates",
            records.len(),
            dates.len()
        );
        Ok(records)
    }

    /// Get records whose calendar day lies within `first..=last`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn records_between(&self, first: NaiveDate, last: NaiveDate) -> Result<Vec<FlowRecord>> {
        let sql = format!("{SELECT_RECORD} WHERE day >= ?1 AND day <= ?2 ORDER BY day, flow");

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(
                params![first.to_string(), last.to_string()],
                Self::row_to_record,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Check if any record carries exactly this storage date string.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn date_exists(&self, date: &str) -> Result<bool> {
        let conn = self.conn()?;
        Self::date_exists_in(&conn, date)
    }

    fn date_exists_in(conn: &Connection, date: &str) -> Result<bool> {
        let found = conn
            .query_row("SELECT 1 FROM daylog WHERE date = ?1 LIMIT 1", [date], |_| {
                Ok(())
            })
            .optional()?;
        Ok(found.is_some())
    }

    /// Insert a day's entries unless the date is already present.
    ///
    /// Runs the existence check and all inserts in one transaction. Returns
    /// `false` if the date already existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; nothing from this
    /// call is committed in that case.
    pub fn insert_day_if_absent(
        &self,
        date: &str,
        day: NaiveDate,
        entries: &[FlowEntry],
    ) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        if Self::date_exists_in(&tx, date)? {
            debug!("Skipping existing date {}", date);
            return Ok(false);
        }

        {
            let mut stmt = tx.prepare(
                r"
                INSERT INTO daylog (date, day, flow, local, mainland, others)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )?;
            let day = day.to_string();
            for entry in entries {
                stmt.execute(params![
                    date,
                    day,
                    entry.flow.as_str(),
                    entry.local,
                    entry.mainland,
                    entry.others,
                ])?;
            }
        }

        tx.commit()?;
        info!("Inserted {} records for {}", entries.len(), date);
        Ok(true)
    }

    /// Count total records in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM daylog", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let (total_records, distinct_dates, first, last) = {
            let conn = self.conn()?;
            conn.query_row(
                "SELECT COUNT(*), COUNT(DISTINCT date), MIN(day), MAX(day) FROM daylog",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )?
        };

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_records,
            distinct_dates,
            first_day: first.and_then(|s| s.parse().ok()),
            last_day: last.and_then(|s| s.parse().ok()),
            db_size_bytes,
        })
    }

    /// Run a storage call on the blocking thread pool.
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Self) -> Result<T> + Send + 'static,
    {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || op(&storage))
            .await
            .map_err(|err| Error::internal(format!("storage task failed: {err}")))?
    }

    /// Convert a database row to a `FlowRecord`.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<FlowRecord> {
        let flow_str: String = row.get(1)?;
        let flow: Flow = flow_str.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(FlowRecord {
            date: row.get(0)?,
            flow,
            local: row.get(2)?,
            mainland: row.get(3)?,
            others: row.get(4)?,
        })
    }
}

#[async_trait]
impl FlowStore for Storage {
    async fn find_by_dates(&self, dates: &[String]) -> Result<Vec<FlowRecord>> {
        let dates = dates.to_vec();
        self.blocking(move |storage| storage.records_for_dates(&dates))
            .await
    }

    async fn find_between(&self, first: NaiveDate, last: NaiveDate) -> Result<Vec<FlowRecord>> {
        self.blocking(move |storage| storage.records_between(first, last))
            .await
    }

    async fn insert_day(&self, date: &str, day: NaiveDate, entries: &[FlowEntry]) -> Result<bool> {
        let date = date.to_string();
        let entries = entries.to_vec();
        self.blocking(move |storage| storage.insert_day_if_absent(&date, day, &entries))
            .await
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StorageStats {
    /// Total number of records stored.
    pub total_records: i64,
    /// Number of distinct storage date strings.
    pub distinct_dates: i64,
    /// Earliest calendar day on record.
    pub first_day: Option<NaiveDate>,
    /// Latest calendar day on record.
    pub last_day: Option<NaiveDate>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn pair(local: u32) -> Vec<FlowEntry> {
        vec![
            FlowEntry {
                flow: Flow::Departure,
                local,
                mainland: 2,
                others: 1,
            },
            FlowEntry {
                flow: Flow::Arrival,
                local,
                mainland: 5,
                others: 3,
            },
        ]
    }

    #[test]
    fn test_open_in_memory() {
        let storage = create_test_storage();
        assert_eq!(storage.path().to_string_lossy(), ":memory:");
        assert_eq!(storage.count().unwrap(), 0);
    }

    #[test]
    fn test_open_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("daylog.db");

        let storage = Storage::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(storage.path(), path.as_path());
    }

    #[test]
    fn test_reopen_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daylog.db");

        {
            let storage = Storage::open(&path).unwrap();
            storage
                .insert_day_if_absent("1/15/2022", ymd(2022, 1, 15), &pair(10))
                .unwrap();
        }

        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.count().unwrap(), 2);
        assert!(storage.date_exists("1/15/2022").unwrap());
    }

    #[test]
    fn test_insert_day_if_absent() {
        let storage = create_test_storage();

        let inserted = storage
            .insert_day_if_absent("1/15/2022", ymd(2022, 1, 15), &pair(10))
            .unwrap();
        assert!(inserted);
        assert_eq!(storage.count().unwrap(), 2);

        let again = storage
            .insert_day_if_absent("1/15/2022", ymd(2022, 1, 15), &pair(99))
            .unwrap();
        assert!(!again);
        assert_eq!(storage.count().unwrap(), 2);
    }

    #[test]
    fn test_exact_date_string_match() {
        let storage = create_test_storage();
        storage
            .insert_day_if_absent("01/15/2022", ymd(2022, 1, 15), &pair(1))
            .unwrap();

        assert!(storage.date_exists("01/15/2022").unwrap());
        assert!(!storage.date_exists("1/15/2022").unwrap());
    }

    #[test]
    fn test_records_for_dates_sorted_as_text() {
        let storage = create_test_storage();
        storage
            .insert_day_if_absent("2/1/2022", ymd(2022, 2, 1), &pair(1))
            .unwrap();
        storage
            .insert_day_if_absent("10/1/2022", ymd(2022, 10, 1), &pair(2))
            .unwrap();

        let records = storage
            .records_for_dates(&["2/1/2022".to_string(), "10/1/2022".to_string()])
            .unwrap();

        let keys: Vec<(&str, Flow)> = records.iter().map(|r| (r.date.as_str(), r.flow)).collect();
        assert_eq!(
            keys,
            vec![
                ("10/1/2022", Flow::Arrival),
                ("10/1/2022", Flow::Departure),
                ("2/1/2022", Flow::Arrival),
                ("2/1/2022", Flow::Departure),
            ]
        );
    }

    #[test]
    fn test_records_for_no_dates() {
        let storage = create_test_storage();
        assert!(storage.records_for_dates(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_records_between() {
        let storage = create_test_storage();
        storage
            .insert_day_if_absent("12/31/2021", ymd(2021, 12, 31), &pair(1))
            .unwrap();
        storage
            .insert_day_if_absent("1/1/2022", ymd(2022, 1, 1), &pair(2))
            .unwrap();
        storage
            .insert_day_if_absent("12/31/2022", ymd(2022, 12, 31), &pair(3))
            .unwrap();

        let records = storage
            .records_between(ymd(2022, 1, 1), ymd(2022, 12, 31))
            .unwrap();
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.date.ends_with("/2022")));
    }

    #[test]
    fn test_counts_round_trip() {
        let storage = create_test_storage();
        storage
            .insert_day_if_absent("3/4/2023", ymd(2023, 3, 4), &pair(42))
            .unwrap();

        let records = storage.records_for_dates(&["3/4/2023".to_string()]).unwrap();
        let arrival = records.iter().find(|r| r.flow == Flow::Arrival).unwrap();
        assert_eq!(arrival.local, 42);
        assert_eq!(arrival.mainland, 5);
        assert_eq!(arrival.others, 3);
    }

    #[test]
    fn test_unknown_flow_is_an_error() {
        let storage = create_test_storage();
        {
            let conn = storage.conn().unwrap();
            conn.execute_batch("DROP TABLE daylog; CREATE TABLE daylog (date TEXT, day TEXT, flow TEXT, local INTEGER, mainland INTEGER, others INTEGER);")
                .unwrap();
            conn.execute(
                "INSERT INTO daylog VALUES ('1/1/2022', '2022-01-01', 'Sideways', 1, 1, 1)",
                [],
            )
            .unwrap();
        }

        let result = storage.records_for_dates(&["1/1/2022".to_string()]);
        assert!(matches!(result, Err(Error::DatabaseQuery(_))));
    }

    #[test]
    fn test_stats_empty() {
        let storage = create_test_storage();
        let stats = storage.stats().unwrap();

        assert_eq!(stats.total_records, 0);
        assert_eq!(stats.distinct_dates, 0);
        assert!(stats.first_day.is_none());
        assert!(stats.last_day.is_none());
    }

    #[test]
    fn test_stats_with_data() {
        let storage = create_test_storage();
        storage
            .insert_day_if_absent("1/15/2022", ymd(2022, 1, 15), &pair(1))
            .unwrap();
        storage
            .insert_day_if_absent("3/2/2023", ymd(2023, 3, 2), &pair(1))
            .unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_records, 4);
        assert_eq!(stats.distinct_dates, 2);
        assert_eq!(stats.first_day, Some(ymd(2022, 1, 15)));
        assert_eq!(stats.last_day, Some(ymd(2023, 3, 2)));
    }

    #[tokio::test]
    async fn test_flow_store_impl() {
        let storage = create_test_storage();
        let store: &dyn FlowStore = &storage;

        assert!(store
            .insert_day("5/6/2024", ymd(2024, 5, 6), &pair(7))
            .await
            .unwrap());
        let records = store.find_by_dates(&["5/6/2024".to_string()]).await.unwrap();
        assert_eq!(records.len(), 2);
        let records = store
            .find_between(ymd(2024, 1, 1), ymd(2024, 12, 31))
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_connection() {
        let storage = create_test_storage();
        let clone = storage.clone();

        assert!(clone
            .insert_day("7/8/2024", ymd(2024, 7, 8), &pair(2))
            .await
            .unwrap());
        assert_eq!(storage.count().unwrap(), 2);
        assert!(!storage.date_exists("7/9/2024").unwrap());
        assert!(storage.date_exists("7/8/2024").unwrap());
    }
}
