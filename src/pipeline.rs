//! Frame-at-a-time detection run.
//!
//! One sequential loop: pull a frame, resize it, run the detector, fold the
//! candidates into the tracker. The stop flag is polled once per frame. There
//! are no timeouts; a stalled source or detector stalls the run.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::detect::DetectorBackend;
use crate::ingest::FrameSource;
use crate::tracker::{DetectionEventTracker, EventLog};

/// Default frame width applied before inference.
pub const DEFAULT_FRAME_WIDTH: u32 = 400;

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Candidates below this confidence are dropped.
    pub min_confidence: f64,
    /// Frames are resized to this width before inference. Zero disables resizing.
    pub frame_width: u32,
    /// Stop after this many frames.
    pub max_frames: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            frame_width: DEFAULT_FRAME_WIDTH,
            max_frames: None,
        }
    }
}

/// Why the frame loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    Stopped,
    FrameLimit,
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub frames: u64,
    pub candidates: u64,
    pub retained: u64,
    pub events: u64,
    pub fps: f64,
    pub live: bool,
    pub stop_reason: StopReason,
}

/// Output of a run: the finished log plus counters.
#[derive(Debug)]
pub struct RunOutput {
    pub log: EventLog,
    pub summary: RunSummary,
}

impl RunOutput {
    /// Reports are only produced for finite sources.
    pub fn should_report(&self) -> bool {
        !self.summary.live
    }
}

/// Drive `source` through `detector` until end of stream, the frame limit, or `stop`.
///
/// The source must already be connected.
pub fn run<S, D>(
    source: &mut S,
    detector: &mut D,
    cfg: &PipelineConfig,
    stop: &AtomicBool,
) -> Result<RunOutput>
where
    S: FrameSource + ?Sized,
    D: DetectorBackend + ?Sized,
{
    let fps = source.frames_per_second();
    let live = source.is_live();
    log::debug!("Video loaded with {:.0} fps.", fps);
    log::info!(
        "detecting on {} with backend {} (min confidence {:.2})",
        source.describe(),
        detector.name(),
        cfg.min_confidence
    );

    let mut tracker = match source.start_timestamp_ms() {
        Some(start_ms) => DetectionEventTracker::with_stream_start(start_ms),
        None => DetectionEventTracker::new(),
    };
    let mut summary = RunSummary {
        frames: 0,
        candidates: 0,
        retained: 0,
        events: 0,
        fps,
        live,
        stop_reason: StopReason::EndOfStream,
    };
    let started = Instant::now();

    loop {
        if stop.load(Ordering::SeqCst) {
            log::info!("stop requested. Quitting detection.");
            summary.stop_reason = StopReason::Stopped;
            break;
        }
        if cfg.max_frames.is_some_and(|limit| summary.frames >= limit) {
            summary.stop_reason = StopReason::FrameLimit;
            break;
        }

        let Some(frame) = source
            .next_frame()
            .with_context(|| format!("failed to read frame {}", summary.frames + 1))?
        else {
            break;
        };
        let frame = frame.resize_to_width(cfg.frame_width);
        let candidates = detector
            .infer(&frame)
            .with_context(|| format!("inference failed on frame {}", summary.frames + 1))?;

        for candidate in candidates
            .iter()
            .filter(|c| c.confidence >= cfg.min_confidence)
        {
            log::debug!(
                "t={:.0}ms face {:.2}% at {:?}",
                frame.timestamp_ms,
                candidate.confidence * 100.0,
                candidate.bbox
            );
        }

        let outcome = tracker.process_frame(frame.timestamp_ms, &candidates, cfg.min_confidence);
        summary.frames += 1;
        summary.candidates += outcome.candidates as u64;
        summary.retained += outcome.retained as u64;
        summary.events += outcome.appended as u64;
    }

    log::info!(
        "Closing video frames. {} frames, {} retained detections, {} events in {:.1}s",
        summary.frames,
        summary.retained,
        summary.events,
        started.elapsed().as_secs_f64()
    );

    Ok(RunOutput {
        log: tracker.finish(),
        summary,
    })
}
