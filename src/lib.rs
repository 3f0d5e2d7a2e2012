//! Face detection event reports.
//!
//! This crate turns a stream of video frames into a timestamped log of face
//! detections and exports it as a table.
//!
//! # Architecture
//!
//! A run is a single sequential pipeline:
//!
//! 1. **Ingest**: a `FrameSource` yields frames with their stream position.
//! 2. **Detect**: a `DetectorBackend` returns raw (confidence, box) candidates.
//! 3. **Track**: `DetectionEventTracker` thresholds candidates and drops
//!    continuations of the last retained box, appending the rest to an `EventLog`.
//! 4. **Report**: at end of stream the log becomes a `ReportTable` keyed by
//!    elapsed time and is written as CSV, XLSX or index-oriented JSON.
//!
//! # Module Structure
//!
//! - `frame`: decoded frames and pre-inference resizing
//! - `ingest`: frame sources (local files, V4L2 cameras, `stub://` synthetics)
//! - `detect`: detector backends (stub, tract ONNX)
//! - `tracker`: event log and de-duplication
//! - `report`: report table and exporters
//! - `pipeline`: the per-frame loop
//! - `config`: layered configuration

pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod report;
pub mod tracker;

pub use config::AppConfig;
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use detect::{BoundingBox, DetectionCandidate, DetectorBackend, StubBackend};
pub use frame::Frame;
pub use ingest::{open_source, CameraConfig, CameraSource, FileConfig, FileSource, FrameSource};
pub use pipeline::{run, PipelineConfig, RunOutput, RunSummary, StopReason};
pub use report::{ReportConfig, ReportFormat, ReportTable, ReportWriter};
pub use tracker::{DetectionEvent, DetectionEventTracker, EventLog};
