use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{accounting::AccumulatorState, classify::verdict::Verdict};

/// Schema version written into every snapshot.
pub const SNAPSHOT_VERSION: &str = "1.0";

/// The persisted projection of the accountant's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub total_time_seconds: f64,
    pub productive_time_seconds: f64,
    pub is_tracking: bool,
    #[serde(default)]
    pub last_result: Option<Verdict>,
    /// Milliseconds since the unix epoch. Strictly increases from one save to the next.
    #[serde(default)]
    pub saved_at: i64,
    #[serde(default)]
    pub version: String,
}

impl Snapshot {
    pub fn capture(state: &AccumulatorState, last_result: Option<Verdict>, now: DateTime<Utc>) -> Self {
        Self {
            total_time_seconds: state.total_seconds,
            productive_time_seconds: state.productive_seconds,
            is_tracking: state.is_tracking,
            last_result,
            saved_at: now.timestamp_millis(),
            version: SNAPSHOT_VERSION.into(),
        }
    }

    /// Parses stored data. The counters have to be numbers and `isTracking` a boolean; anything
    /// else is treated as if nothing was stored.
    pub fn parse(data: &str) -> Option<Snapshot> {
        match serde_json::from_str::<Snapshot>(data) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Stored tracking data is invalid, starting fresh: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use crate::{
        accounting::AccumulatorState,
        classify::verdict::Verdict,
    };

    use super::{Snapshot, SNAPSHOT_VERSION};

    #[test]
    fn test_capture_shape() {
        let state = AccumulatorState {
            total_seconds: 12.5,
            productive_seconds: 10.,
            is_tracking: true,
            last_tick_at: None,
        };
        let now = Utc.with_ymd_and_hms(2018, 7, 4, 0, 0, 0).unwrap();
        let snapshot = Snapshot::capture(&state, Some(Verdict::unknown("")), now);
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["totalTimeSeconds"], json!(12.5));
        assert_eq!(value["productiveTimeSeconds"], json!(10.));
        assert_eq!(value["isTracking"], json!(true));
        assert_eq!(value["lastResult"]["category"], json!("Unknown"));
        assert_eq!(value["savedAt"], json!(now.timestamp_millis()));
        assert_eq!(value["version"], json!(SNAPSHOT_VERSION));
    }

    #[test]
    fn test_parse_minimal() {
        let snapshot = Snapshot::parse(
            r#"{"totalTimeSeconds": 30, "productiveTimeSeconds": 12.5, "isTracking": false}"#,
        )
        .unwrap();
        assert_eq!(snapshot.total_time_seconds, 30.);
        assert_eq!(snapshot.productive_time_seconds, 12.5);
        assert_eq!(snapshot.last_result, None);
    }

    #[test]
    fn test_parse_rejects_invalid_structure() {
        assert_eq!(
            Snapshot::parse(r#"{"totalTimeSeconds": 30, "productiveTimeSeconds": 12}"#),
            None
        );
        assert_eq!(
            Snapshot::parse(r#"{"totalTimeSeconds": "30", "productiveTimeSeconds": 12, "isTracking": true}"#),
            None
        );
        assert_eq!(
            Snapshot::parse(r#"{"totalTimeSeconds": 30, "productiveTimeSeconds": 12, "isTracking": "yes"}"#),
            None
        );
        assert_eq!(Snapshot::parse("{\"totalTimeSec"), None);
        assert_eq!(Snapshot::parse("null"), None);
    }
}
