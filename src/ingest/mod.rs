//! Frame ingestion sources.
//!
//! This module provides the sources a run can pull frames from:
//! - Local video files (FFmpeg decode with feature: ingest-file-ffmpeg)
//! - Live cameras over V4L2 (feature: ingest-v4l2)
//! - `stub://` synthetic clips and cameras (always available, for tests and demos)
//!
//! File sources are finite and end with `Ok(None)`. Camera sources are live
//! and only stop when the run is stopped.

pub mod camera;
pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
mod synthetic;

use anyhow::Result;

pub use camera::{CameraConfig, CameraSource};
pub use file::{FileConfig, FileSource};

use crate::frame::Frame;

/// A sequential source of timestamped frames.
pub trait FrameSource {
    /// Open the underlying device or file.
    fn connect(&mut self) -> Result<()>;

    /// Next frame, or `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Nominal frame rate. Zero when unknown.
    fn frames_per_second(&self) -> f64;

    /// Explicit stream origin in milliseconds, when the source knows one.
    ///
    /// `None` makes the first frame's timestamp the report's t=0.
    fn start_timestamp_ms(&self) -> Option<f64> {
        None
    }

    /// True for sources with no natural end (cameras).
    fn is_live(&self) -> bool;

    /// Human-readable locator for logs.
    fn describe(&self) -> String;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }

    fn frames_per_second(&self) -> f64 {
        (**self).frames_per_second()
    }

    fn start_timestamp_ms(&self) -> Option<f64> {
        (**self).start_timestamp_ms()
    }

    fn is_live(&self) -> bool {
        (**self).is_live()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Open a file source for `video`, or the configured camera when no video is given.
pub fn open_source(video: Option<&str>, camera: &CameraConfig) -> Result<Box<dyn FrameSource>> {
    match video {
        Some(path) => {
            log::info!("Loading video from file {}.", path);
            Ok(Box::new(FileSource::new(FileConfig {
                path: path.to_string(),
            })?))
        }
        None => {
            log::info!("Loading video from camera {}.", camera.device);
            Ok(Box::new(CameraSource::new(camera.clone())?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_source_selects_file_or_camera() -> Result<()> {
        let camera = CameraConfig {
            device: "stub://cam".to_string(),
            ..CameraConfig::default()
        };
        let file = open_source(Some("stub://clip?frames=3"), &camera)?;
        assert!(!file.is_live());
        assert_eq!(file.describe(), "stub://clip?frames=3");

        let live = open_source(None, &camera)?;
        assert!(live.is_live());
        assert_eq!(live.describe(), "stub://cam");
        Ok(())
    }
}
