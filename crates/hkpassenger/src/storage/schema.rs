//! `SQLite` schema definitions for the daylog store.

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement to create the daylog table.
///
/// `date` holds the storage date text exactly as written; `day` is the same
/// date as ISO `YYYY-MM-DD` for range scans.
pub const CREATE_DAYLOG_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS daylog (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    day TEXT NOT NULL,
    flow TEXT NOT NULL CHECK (flow IN ('Arrival', 'Departure')),
    local INTEGER NOT NULL CHECK (local >= 0),
    mainland INTEGER NOT NULL CHECK (mainland >= 0),
    others INTEGER NOT NULL CHECK (others >= 0),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// Index for lookups by storage date string.
pub const CREATE_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_daylog_date ON daylog(date, flow)
";

/// Index for calendar range scans.
pub const CREATE_DAY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_daylog_day ON daylog(day)
";

/// Statements applied by the version 1 migration, in order.
pub const V1_STATEMENTS: &[&str] = &[CREATE_DAYLOG_TABLE, CREATE_DATE_INDEX, CREATE_DAY_INDEX];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daylog_table_contains_required_columns() {
        for column in [
            "date TEXT NOT NULL",
            "day TEXT NOT NULL",
            "flow TEXT NOT NULL",
            "local INTEGER NOT NULL",
            "mainland INTEGER NOT NULL",
            "others INTEGER NOT NULL",
        ] {
            assert!(CREATE_DAYLOG_TABLE.contains(column), "missing {column}");
        }
    }

    #[test]
    fn test_metadata_table_structure() {
        assert!(CREATE_METADATA_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_METADATA_TABLE.contains("value TEXT NOT NULL"));
    }

    #[test]
    fn test_v1_statements_create_table_first() {
        assert_eq!(V1_STATEMENTS[0], CREATE_DAYLOG_TABLE);
        assert!(V1_STATEMENTS.iter().all(|stmt| !stmt.trim().is_empty()));
    }
}
