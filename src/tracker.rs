//! Detection event tracking.
//!
//! `DetectionEventTracker` turns per-frame candidate lists into an ordered,
//! de-duplicated `EventLog`:
//!
//! - Candidates below `min_confidence`, or with a NaN confidence, are dropped
//!   silently.
//! - A retained candidate whose box equals the most recently retained box is a
//!   continuation and is not logged.
//! - Any other retained candidate is appended exactly once.
//! - Every retained candidate, logged or not, becomes the new reference box.
//!
//! The reference is a single box across the whole run, not one per face. A
//! scene with two stable faces therefore logs an event on nearly every frame,
//! since each face's box differs from the other one's.

use serde::{Deserialize, Serialize};

use crate::detect::{BoundingBox, DetectionCandidate};

/// One entry of the event log.
///
/// Retained detections always carry `Some(confidence)` and `Some(true)`. The
/// stream-start marker carries neither.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub timestamp_ms: f64,
    pub confidence: Option<f64>,
    pub is_face: Option<bool>,
}

impl DetectionEvent {
    pub fn face(timestamp_ms: f64, confidence: f64) -> Self {
        Self {
            timestamp_ms,
            confidence: Some(confidence),
            is_face: Some(true),
        }
    }

    pub fn stream_start(timestamp_ms: f64) -> Self {
        Self {
            timestamp_ms,
            confidence: None,
            is_face: None,
        }
    }

    /// True when the entry records only a timestamp.
    pub fn is_stream_start(&self) -> bool {
        self.confidence.is_none() && self.is_face.is_none()
    }
}

/// Append-only, insertion-ordered log of detection events.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<DetectionEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from raw entries, e.g. one deserialized from disk.
    pub fn from_entries(entries: Vec<DetectionEvent>) -> Self {
        Self { entries }
    }

    /// All entries, including the stream-start marker.
    pub fn entries(&self) -> &[DetectionEvent] {
        &self.entries
    }

    /// Logged detections, without the stream-start marker.
    pub fn events(&self) -> impl Iterator<Item = &DetectionEvent> + '_ {
        self.entries.iter().filter(|entry| !entry.is_stream_start())
    }

    /// Timestamp of the stream-start marker, if one was recorded.
    pub fn stream_start_ms(&self) -> Option<f64> {
        self.entries
            .first()
            .filter(|entry| entry.is_stream_start())
            .map(|entry| entry.timestamp_ms)
    }

    /// Number of logged detections. The marker is not counted.
    pub fn len(&self) -> usize {
        self.events().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, event: DetectionEvent) {
        self.entries.push(event);
    }
}

/// Per-frame outcome, mostly for logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    pub candidates: usize,
    pub retained: usize,
    pub appended: usize,
}

/// Owns the event log for the duration of a run.
#[derive(Debug, Default)]
pub struct DetectionEventTracker {
    log: EventLog,
    last_box: Option<BoundingBox>,
}

impl DetectionEventTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a tracker with an explicit stream-start reference.
    pub fn with_stream_start(timestamp_ms: f64) -> Self {
        let mut tracker = Self::new();
        tracker.log.push(DetectionEvent::stream_start(timestamp_ms));
        tracker
    }

    /// Fold one frame's candidates into the log.
    ///
    /// The first call records the stream-start marker if none was given.
    pub fn process_frame(
        &mut self,
        timestamp_ms: f64,
        candidates: &[DetectionCandidate],
        min_confidence: f64,
    ) -> FrameOutcome {
        if self.log.entries.is_empty() {
            self.log.push(DetectionEvent::stream_start(timestamp_ms));
        }

        let mut outcome = FrameOutcome {
            candidates: candidates.len(),
            ..FrameOutcome::default()
        };

        for candidate in candidates {
            if candidate.confidence.is_nan() || candidate.confidence < min_confidence {
                continue;
            }
            outcome.retained += 1;

            let continuation = self.last_box == Some(candidate.bbox);
            self.last_box = Some(candidate.bbox);
            if continuation {
                continue;
            }

            self.log
                .push(DetectionEvent::face(timestamp_ms, candidate.confidence));
            outcome.appended += 1;
        }

        outcome
    }

    /// Most recently retained box, if any.
    pub fn last_box(&self) -> Option<BoundingBox> {
        self.last_box
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// End the run and hand over the log.
    pub fn finish(self) -> EventLog {
        self.log
    }
}
