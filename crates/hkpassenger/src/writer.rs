//! Bulk insertion of daily record pairs.
//!
//! The payload maps storage date strings (`month/day/year`) to their flow
//! entries. Each date is validated and inserted on its own; one bad or
//! existing date never blocks the others.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::dates;
use crate::error::Result;
use crate::record::FlowEntry;
use crate::store::FlowStore;

/// Outcome for one date of a bulk insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertStatus {
    /// Entries written.
    Added,
    /// The date already had records; nothing written.
    Existed,
    /// The key isn't a valid `month/day/year` date.
    InvalidDate,
    /// The value isn't a non-empty list of flow entries.
    InvalidRecords,
}

impl InsertStatus {
    /// Status message reported to the client.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            // Fixed wording, reported whatever the number of entries written.
            Self::Added => "Added two records to the database",
            Self::Existed => "Records existed; cannot override",
            Self::InvalidDate => "Wrong date format or invalid date",
            Self::InvalidRecords => "Wrong record format",
        }
    }
}

impl Serialize for InsertStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

/// Why a payload was rejected as a whole.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Empty body, empty object, or not an object at all.
    #[error("POST request - missing data.")]
    MissingData,

    /// The body isn't JSON.
    #[error("POST request - malformed JSON body.")]
    Malformed(#[source] serde_json::Error),
}

/// Parse a raw request body into the date → entries map.
///
/// # Errors
///
/// Returns [`PayloadError`] when there is nothing to process.
pub fn parse_payload(body: &[u8]) -> std::result::Result<Map<String, Value>, PayloadError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(PayloadError::MissingData);
    }
    match serde_json::from_slice::<Value>(body).map_err(PayloadError::Malformed)? {
        Value::Object(map) if !map.is_empty() => Ok(map),
        _ => Err(PayloadError::MissingData),
    }
}

/// Per-date results of a bulk insert, in payload order.
///
/// Serializes as `{"status": {"<date>": "<message>", ...}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    /// One entry per payload key.
    pub status: Vec<(String, InsertStatus)>,
}

impl BulkReport {
    /// Look up the status recorded for a date key.
    #[must_use]
    pub fn get(&self, date: &str) -> Option<InsertStatus> {
        self.status
            .iter()
            .find(|(key, _)| key == date)
            .map(|(_, status)| *status)
    }
}

impl Serialize for BulkReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        struct StatusMap<'a>(&'a [(String, InsertStatus)]);

        impl Serialize for StatusMap<'_> {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
            }
        }

        let mut state = serializer.serialize_struct("BulkReport", 1)?;
        state.serialize_field("status", &StatusMap(&self.status))?;
        state.end()
    }
}

/// Insert every date of the payload that isn't already present.
///
/// # Errors
///
/// A store failure aborts the remaining dates. Dates inserted before the
/// failure stay inserted.
pub async fn write_bulk(store: &dyn FlowStore, payload: Map<String, Value>) -> Result<BulkReport> {
    let mut report = BulkReport::default();

    for (date, value) in payload {
        let status = write_day(store, &date, value).await?;
        debug!("Bulk insert {}: {:?}", date, status);
        report.status.push((date, status));
    }

    let added = report
        .status
        .iter()
        .filter(|(_, status)| *status == InsertStatus::Added)
        .count();
    info!(
        "Bulk insert processed {} dates, added {}",
        report.status.len(),
        added
    );
    Ok(report)
}

async fn write_day(store: &dyn FlowStore, date: &str, value: Value) -> Result<InsertStatus> {
    let Some(day) = dates::parse_storage_date(date) else {
        return Ok(InsertStatus::InvalidDate);
    };
    let entries = match serde_json::from_value::<Vec<FlowEntry>>(value) {
        Ok(entries) if !entries.is_empty() => entries,
        _ => return Ok(InsertStatus::InvalidRecords),
    };

    if store.insert_day(date, day, &entries).await? {
        Ok(InsertStatus::Added)
    } else {
        Ok(InsertStatus::Existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use serde_json::json;

    fn sample_payload() -> Value {
        json!({
            "1/15/2022": [
                {"Flow": "Arrival", "Local": 10, "Mainland": 5, "Others": 1},
                {"Flow": "Departure", "Local": 8, "Mainland": 4, "Others": 0}
            ]
        })
    }

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_parse_payload_missing_data() {
        let bodies: [&[u8]; 6] = [b"", b"   ", b"{}", b"[]", b"null", b"42"];
        for body in bodies {
            assert!(
                matches!(parse_payload(body), Err(PayloadError::MissingData)),
                "{}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn test_parse_payload_malformed() {
        assert!(matches!(
            parse_payload(b"{not json"),
            Err(PayloadError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_payload_keeps_key_order() {
        let map = parse_payload(br#"{"2/1/2022": [], "1/1/2022": []}"#).unwrap();
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, vec!["2/1/2022", "1/1/2022"]);
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(
            InsertStatus::Added.message(),
            "Added two records to the database"
        );
        assert_eq!(
            InsertStatus::Existed.message(),
            "Records existed; cannot override"
        );
        assert_eq!(
            InsertStatus::InvalidDate.message(),
            "Wrong date format or invalid date"
        );
    }

    #[test]
    fn test_report_serialization() {
        let report = BulkReport {
            status: vec![
                ("1/15/2022".to_string(), InsertStatus::Added),
                ("2022/13/40".to_string(), InsertStatus::InvalidDate),
            ],
        };
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"status":{"1/15/2022":"Added two records to the database","2022/13/40":"Wrong date format or invalid date"}}"#
        );
    }

    #[tokio::test]
    async fn test_write_bulk_then_repeat() {
        let storage = Storage::open_in_memory().unwrap();

        let report = write_bulk(&storage, as_map(sample_payload())).await.unwrap();
        assert_eq!(report.get("1/15/2022"), Some(InsertStatus::Added));
        assert_eq!(storage.count().unwrap(), 2);

        let report = write_bulk(&storage, as_map(sample_payload())).await.unwrap();
        assert_eq!(report.get("1/15/2022"), Some(InsertStatus::Existed));
        assert_eq!(storage.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_single_entry_day_reports_added() {
        let storage = Storage::open_in_memory().unwrap();
        let payload = json!({
            "4/4/2022": [{"Flow": "Arrival", "Local": 3, "Mainland": 2, "Others": 1}]
        });

        let report = write_bulk(&storage, as_map(payload)).await.unwrap();
        assert_eq!(report.get("4/4/2022"), Some(InsertStatus::Added));
        assert_eq!(
            serde_json::to_value(&report).unwrap()["status"]["4/4/2022"],
            "Added two records to the database"
        );
        assert_eq!(storage.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_write_bulk_dates_are_independent() {
        let storage = Storage::open_in_memory().unwrap();
        let payload = json!({
            "2022/13/40": [],
            "2/30/2022": [],
            "1/16/2022": [
                {"Flow": "Arrival", "Local": 1, "Mainland": 1, "Others": 1},
                {"Flow": "Departure", "Local": 1, "Mainland": 1, "Others": 1}
            ],
            "1/17/2022": "nope",
            "1/18/2022": []
        });

        let report = write_bulk(&storage, as_map(payload)).await.unwrap();
        assert_eq!(report.get("2022/13/40"), Some(InsertStatus::InvalidDate));
        assert_eq!(report.get("2/30/2022"), Some(InsertStatus::InvalidDate));
        assert_eq!(report.get("1/16/2022"), Some(InsertStatus::Added));
        assert_eq!(report.get("1/17/2022"), Some(InsertStatus::InvalidRecords));
        assert_eq!(report.get("1/18/2022"), Some(InsertStatus::InvalidRecords));
        assert_eq!(storage.count().unwrap(), 2);
    }
}
