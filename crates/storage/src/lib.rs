//! Storage implementations for innkeep.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use chrono::{DateTime, SecondsFormat, Utc};
use innkeep_core::StorageError;

/// Render a timestamp as fixed-width RFC 3339 UTC text, so that string
/// order equals chronological order.
pub fn to_db_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
pub fn from_db_timestamp(text: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::QueryFailed(format!("bad timestamp '{text}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_sort_lexically() {
        let a = Utc.with_ymd_and_hms(2026, 3, 9, 23, 59, 59).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();
        assert!(to_db_timestamp(&a) < to_db_timestamp(&b));
        assert_eq!(to_db_timestamp(&b), "2026-03-10T00:00:00.000000Z");
    }

    #[test]
    fn timestamp_roundtrip() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 1, 12, 30, 0).unwrap();
        assert_eq!(from_db_timestamp(&to_db_timestamp(&ts)).unwrap(), ts);
        assert!(from_db_timestamp("yesterday").is_err());
    }
}
