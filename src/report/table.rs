use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tracker::EventLog;

/// One report row's values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportValues {
    pub confidence: f64,
    pub face: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReportRow {
    /// Elapsed time since stream start, `H:MM:SS.ffffff`.
    pub timestamp: String,
    pub values: ReportValues,
}

/// Report rows keyed by elapsed-duration string.
///
/// Keys are unique. Inserting an existing key overwrites that row's values in
/// place, so the row keeps the position where the key first appeared.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportTable {
    rows: Vec<ReportRow>,
    index: HashMap<String, usize>,
}

impl ReportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table for a finished event log.
    ///
    /// Entries missing a confidence or face flag (the stream-start marker) are
    /// skipped. Elapsed time is measured from the marker when one is present.
    pub fn build(log: &EventLog) -> Self {
        let start_ms = log.stream_start_ms().unwrap_or(0.0);
        let mut table = Self::new();
        for entry in log.entries() {
            let (Some(confidence), Some(face)) = (entry.confidence, entry.is_face) else {
                continue;
            };
            let key = format_elapsed(entry.timestamp_ms - start_ms);
            table.insert(key, ReportValues { confidence, face });
        }
        table
    }

    /// Insert or overwrite the row for `key`.
    pub fn insert(&mut self, key: String, values: ReportValues) {
        match self.index.get(&key) {
            Some(&position) => self.rows[position].values = values,
            None => {
                self.index.insert(key.clone(), self.rows.len());
                self.rows.push(ReportRow {
                    timestamp: key,
                    values,
                });
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&ReportValues> {
        self.index.get(key).map(|&position| &self.rows[position].values)
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Format a millisecond offset as `H:MM:SS.ffffff`.
///
/// Rounds to the nearest microsecond. Hours are not wrapped into days and
/// negative offsets clamp to zero.
pub fn format_elapsed(elapsed_ms: f64) -> String {
    let micros = if elapsed_ms.is_finite() && elapsed_ms > 0.0 {
        (elapsed_ms * 1000.0).round() as u64
    } else {
        0
    };
    let fraction = micros % 1_000_000;
    let total_secs = micros / 1_000_000;
    format!(
        "{}:{:02}:{:02}.{:06}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60,
        fraction
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::DetectionEvent;

    fn log_of(entries: &[DetectionEvent]) -> EventLog {
        EventLog::from_entries(entries.to_vec())
    }

    #[test]
    fn formats_elapsed_durations() {
        assert_eq!(format_elapsed(0.0), "0:00:00.000000");
        assert_eq!(format_elapsed(1000.0), "0:00:01.000000");
        assert_eq!(format_elapsed(33.366666), "0:00:00.033367");
        assert_eq!(format_elapsed(61_500.25), "0:01:01.500250");
        assert_eq!(format_elapsed(3_723_004.0), "1:02:03.004000");
        assert_eq!(format_elapsed(90_000_000.0), "25:00:00.000000");
        assert_eq!(format_elapsed(-5.0), "0:00:00.000000");
        assert_eq!(format_elapsed(f64::NAN), "0:00:00.000000");
    }

    #[test]
    fn marker_is_excluded_from_rows() {
        let log = log_of(&[
            DetectionEvent::stream_start(0.0),
            DetectionEvent::face(1000.0, 0.87),
        ]);
        let table = ReportTable::build(&log);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].timestamp, "0:00:01.000000");
        assert_eq!(
            table.rows()[0].values,
            ReportValues {
                confidence: 0.87,
                face: true
            }
        );
    }

    #[test]
    fn partially_filled_entries_are_skipped() {
        let log = log_of(&[
            DetectionEvent::stream_start(0.0),
            DetectionEvent {
                timestamp_ms: 10.0,
                confidence: Some(0.9),
                is_face: None,
            },
            DetectionEvent {
                timestamp_ms: 20.0,
                confidence: None,
                is_face: Some(true),
            },
            DetectionEvent::face(30.0, 0.6),
        ]);
        let table = ReportTable::build(&log);
        assert_eq!(table.len(), 1);
        assert!(table.get("0:00:00.030000").is_some());
    }

    #[test]
    fn elapsed_is_relative_to_stream_start() {
        let log = log_of(&[
            DetectionEvent::stream_start(500.0),
            DetectionEvent::face(2500.0, 0.75),
        ]);
        let table = ReportTable::build(&log);
        assert_eq!(table.rows()[0].timestamp, "0:00:02.000000");
    }

    #[test]
    fn colliding_keys_keep_the_last_write() {
        let log = log_of(&[
            DetectionEvent::stream_start(0.0),
            DetectionEvent::face(100.0, 0.6),
            DetectionEvent::face(200.0, 0.7),
            // Rounds to the same microsecond as 100 ms.
            DetectionEvent::face(100.0000001, 0.95),
        ]);
        let table = ReportTable::build(&log);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].timestamp, "0:00:00.100000");
        assert_eq!(table.rows()[0].values.confidence, 0.95);
        assert_eq!(table.rows()[1].values.confidence, 0.7);
    }

    #[test]
    fn building_twice_is_identical() {
        let log = log_of(&[
            DetectionEvent::stream_start(0.0),
            DetectionEvent::face(33.0, 0.9),
            DetectionEvent::face(66.0, 0.8),
        ]);
        assert_eq!(ReportTable::build(&log), ReportTable::build(&log));
    }

    #[test]
    fn empty_log_builds_empty_table() {
        assert!(ReportTable::build(&EventLog::new()).is_empty());
    }
}
