//! Checkpoint document types
//!
//! These types are serialized to JSON and read back when resuming.

use crate::stats::RunStats;
use crate::types::Record;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A saved harvest: items in collection order plus the stats at save time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// When the checkpoint was written
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,

    /// Request counters at save time
    #[serde(default)]
    pub stats: RunStats,

    /// Collected items
    #[serde(rename = "data")]
    pub items: Vec<Record>,

    /// Number of items, as recorded by the writer
    pub count: usize,
}

impl Checkpoint {
    /// Create a checkpoint stamped with the current time
    pub fn new(items: Vec<Record>, stats: RunStats) -> Self {
        Self {
            timestamp: Utc::now(),
            stats,
            count: items.len(),
            items,
        }
    }

    /// Whether `count` agrees with the number of items
    pub fn is_consistent(&self) -> bool {
        self.count == self.items.len()
    }
}

/// Borrowed view used when saving, so the accumulator is never cloned
#[derive(Debug, Serialize)]
pub(crate) struct CheckpointRef<'a> {
    pub timestamp: DateTime<Utc>,
    pub stats: &'a RunStats,
    pub data: &'a [Record],
    pub count: usize,
}

impl<'a> CheckpointRef<'a> {
    pub(crate) fn new(items: &'a [Record], stats: &'a RunStats) -> Self {
        Self {
            timestamp: Utc::now(),
            stats,
            data: items,
            count: items.len(),
        }
    }
}

/// Accepts RFC 3339 or a zone-less ISO timestamp (read as UTC)
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checkpoint_document_keys() {
        let stats = RunStats {
            total_requests: 3,
            successful: 2,
            throttled: 1,
            errors: 0,
        };
        let items = vec![json!({"uid": "a"})];
        let value = serde_json::to_value(CheckpointRef::new(&items, &stats)).unwrap();

        assert_eq!(value["count"], 1);
        assert_eq!(value["data"][0]["uid"], "a");
        assert_eq!(value["stats"]["throttled"], 1);
        assert!(value["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_checkpoint_naive_timestamp() {
        let doc = json!({
            "timestamp": "2024-03-01T10:15:30.123456",
            "stats": {"total_requests": 1, "successful": 1, "rate_limited": 0, "errors": 0},
            "data": [],
            "count": 0
        });
        let checkpoint: Checkpoint = serde_json::from_value(doc).unwrap();
        assert_eq!(checkpoint.timestamp.to_rfc3339(), "2024-03-01T10:15:30.123456+00:00");
        assert!(checkpoint.is_consistent());
    }

    #[test]
    fn test_checkpoint_bad_timestamp() {
        let doc = json!({"timestamp": "yesterday", "data": [], "count": 0});
        assert!(serde_json::from_value::<Checkpoint>(doc).is_err());
    }
}
