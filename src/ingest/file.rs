//! Local file frame source.
//!
//! `FileSource` reads frames from a local video file. It is a finite source:
//! `next_frame` returns `Ok(None)` at end of file and the run produces a report.
//!
//! `stub://` locators produce a synthetic clip and are always available. Real
//! files need the `ingest-file-ffmpeg` feature.

use anyhow::{anyhow, Result};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::synthetic::{StubParams, SyntheticFrames, STUB_SCHEME};
use super::FrameSource;
use crate::frame::Frame;

const DEFAULT_STUB_FRAMES: u64 = 300;
const DEFAULT_STUB_FPS: f64 = 30.0;

/// Configuration for a local file source.
#[derive(Clone, Debug, Default)]
pub struct FileConfig {
    /// Local file path (e.g., "videos/lobby.mp4") or `stub://` locator.
    pub path: String,
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticFileSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes)"
            ));
        }
        if config.path.starts_with(STUB_SCHEME) {
            Ok(Self {
                backend: FileBackend::Synthetic(SyntheticFileSource::new(config)?),
            })
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                Ok(Self {
                    backend: FileBackend::Ffmpeg(FfmpegFileSource::new(config)?),
                })
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                Err(anyhow!(
                    "file ingestion requires the ingest-file-ffmpeg feature"
                ))
            }
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> FileStats {
        match &self.backend {
            FileBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

impl FrameSource for FileSource {
    fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.connect(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }

    fn frames_per_second(&self) -> f64 {
        match &self.backend {
            FileBackend::Synthetic(source) => source.frames.params().fps,
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.frames_per_second(),
        }
    }

    fn is_live(&self) -> bool {
        false
    }

    fn describe(&self) -> String {
        self.stats().path
    }
}

/// Statistics for a file source.
#[derive(Clone, Debug)]
pub struct FileStats {
    pub frames_captured: u64,
    pub path: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticFileSource {
    config: FileConfig,
    frames: SyntheticFrames,
}

impl SyntheticFileSource {
    fn new(config: FileConfig) -> Result<Self> {
        let params = StubParams::parse(&config.path, Some(DEFAULT_STUB_FRAMES), DEFAULT_STUB_FPS)?;
        Ok(Self {
            config,
            frames: SyntheticFrames::new(params),
        })
    }

    fn connect(&mut self) -> Result<()> {
        log::info!("FileSource: connected to {} (synthetic)", self.config.path);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.frames.next_frame()
    }

    fn stats(&self) -> FileStats {
        FileStats {
            frames_captured: self.frames.frames_emitted(),
            path: self.config.path.clone(),
        }
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with(STUB_SCHEME) {
        return true;
    }
    !path.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(path: &str) -> Result<FileSource> {
        FileSource::new(FileConfig {
            path: path.to_string(),
        })
    }

    #[test]
    fn rejects_remote_urls() {
        assert!(stub("rtsp://camera/stream").is_err());
        assert!(stub("https://example.com/video.mp4").is_err());
        assert!(stub("  ").is_err());
    }

    #[test]
    fn synthetic_file_is_finite() -> Result<()> {
        let mut source = stub("stub://clip?frames=4&fps=20&width=16&height=16")?;
        source.connect()?;
        assert!(!source.is_live());
        assert_eq!(source.frames_per_second(), 20.0);

        let mut stamps = Vec::new();
        while let Some(frame) = source.next_frame()? {
            stamps.push(frame.timestamp_ms);
        }
        assert_eq!(stamps, vec![0.0, 50.0, 100.0, 150.0]);
        assert!(source.next_frame()?.is_none());
        assert_eq!(source.stats().frames_captured, 4);
        Ok(())
    }

    #[cfg(not(feature = "ingest-file-ffmpeg"))]
    #[test]
    fn real_files_need_ffmpeg_feature() {
        assert!(stub("videos/lobby.mp4").is_err());
    }
}
