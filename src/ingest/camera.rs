//! Live camera frame source.
//!
//! `CameraSource` captures from a local V4L2 device node (e.g. /dev/video0)
//! with the `ingest-v4l2` feature, or from an endless synthetic stream for
//! `stub://` devices. It is a live source: it never reaches end of stream on
//! its own, and runs against it do not produce a report.
//!
//! Timestamps are milliseconds since `connect`.

use anyhow::{anyhow, Result};

use super::synthetic::{StubParams, SyntheticFrames, STUB_SCHEME};
use super::FrameSource;
use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0") or `stub://` locator.
    pub device: String,
    /// Requested frame rate.
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 30,
            width: 640,
            height: 480,
        }
    }
}

/// Live camera frame source.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCameraSource),
    #[cfg(feature = "ingest-v4l2")]
    Device(v4l2::DeviceCameraSource),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.device.starts_with(STUB_SCHEME) {
            return Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCameraSource::new(config)?),
            });
        }
        #[cfg(feature = "ingest-v4l2")]
        {
            Ok(Self {
                backend: CameraBackend::Device(v4l2::DeviceCameraSource::new(config)),
            })
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            Err(anyhow!(
                "camera capture from {} requires the ingest-v4l2 feature",
                config.device
            ))
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.stats(),
        }
    }
}

impl FrameSource for CameraSource {
    fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.connect(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.next_frame().map(Some),
        }
    }

    fn frames_per_second(&self) -> f64 {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.frames.params().fps,
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.frames_per_second(),
        }
    }

    fn is_live(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        self.stats().device
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub device: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticCameraSource {
    config: CameraConfig,
    frames: SyntheticFrames,
}

impl SyntheticCameraSource {
    fn new(config: CameraConfig) -> Result<Self> {
        let mut params = StubParams::parse(&config.device, None, config.target_fps.max(1) as f64)?;
        if !config.device.contains("width=") {
            params.width = config.width;
        }
        if !config.device.contains("height=") {
            params.height = config.height;
        }
        Ok(Self {
            config,
            frames: SyntheticFrames::new(params),
        })
    }

    fn connect(&mut self) -> Result<()> {
        log::info!("CameraSource: connected to {} (synthetic)", self.config.device);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.frames.next_frame()
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frames.frames_emitted(),
            device: self.config.device.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Production V4L2 source using libv4l
// ----------------------------------------------------------------------------

#[cfg(feature = "ingest-v4l2")]
mod v4l2 {
    use anyhow::{anyhow, Context, Result};
    use ouroboros::self_referencing;
    use std::time::Instant;

    use super::{CameraConfig, CameraStats};
    use crate::frame::Frame;
    use crate::ingest::normalize::{normalize_to_rgb, PixelFormat};

    pub(super) struct DeviceCameraSource {
        config: CameraConfig,
        state: Option<DeviceState>,
        frame_count: u64,
        connected_at: Option<Instant>,
        active_width: u32,
        active_height: u32,
        active_format: PixelFormat,
    }

    #[self_referencing]
    struct DeviceState {
        device: v4l::Device,
        #[borrows(mut device)]
        #[covariant]
        stream: v4l::prelude::MmapStream<'this, v4l::Device>,
    }

    impl DeviceCameraSource {
        pub(super) fn new(config: CameraConfig) -> Self {
            Self {
                active_width: config.width,
                active_height: config.height,
                active_format: PixelFormat::Rgb24,
                config,
                state: None,
                frame_count: 0,
                connected_at: None,
            }
        }

        pub(super) fn connect(&mut self) -> Result<()> {
            use v4l::buffer::Type;
            use v4l::video::Capture;

            let mut device = v4l::Device::with_path(&self.config.device)
                .with_context(|| format!("open v4l2 device {}", self.config.device))?;
            let mut format = device.format().context("read v4l2 format")?;
            format.width = self.config.width;
            format.height = self.config.height;
            format.fourcc = v4l::FourCC::new(b"RGB3");

            let format = match device.set_format(&format) {
                Ok(format) => format,
                Err(err) => {
                    log::warn!(
                        "CameraSource: failed to set format on {}: {}",
                        self.config.device,
                        err
                    );
                    device
                        .format()
                        .context("read v4l2 format after set failure")?
                }
            };

            self.active_format =
                PixelFormat::from_fourcc(&format.fourcc.repr).ok_or_else(|| {
                    anyhow!(
                        "v4l2 device {} offers unsupported pixel format {}",
                        self.config.device,
                        String::from_utf8_lossy(&format.fourcc.repr)
                    )
                })?;

            if self.config.target_fps > 0 {
                let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
                if let Err(err) = device.set_params(&params) {
                    log::warn!(
                        "CameraSource: failed to set fps on {}: {}",
                        self.config.device,
                        err
                    );
                }
            }

            self.active_width = format.width;
            self.active_height = format.height;

            let state = DeviceStateBuilder {
                device,
                stream_builder: |device| {
                    v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                        .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
                },
            }
            .try_build()?;
            self.state = Some(state);
            self.connected_at = Some(Instant::now());

            log::info!(
                "CameraSource: connected to {} ({}x{} {:?})",
                self.config.device,
                self.active_width,
                self.active_height,
                self.active_format
            );
            Ok(())
        }

        pub(super) fn next_frame(&mut self) -> Result<Frame> {
            use v4l::io::traits::CaptureStream;

            let state = self.state.as_mut().context("v4l2 device not connected")?;
            let (buf, _meta) = state
                .with_mut(|fields| fields.stream.next())
                .context("capture v4l2 frame")?;
            let pixels = normalize_to_rgb(
                buf,
                self.active_width,
                self.active_height,
                self.active_format,
            )?;

            self.frame_count += 1;
            let timestamp_ms = self
                .connected_at
                .map(|at| at.elapsed().as_secs_f64() * 1000.0)
                .unwrap_or(0.0);

            Frame::from_rgb(pixels, self.active_width, self.active_height, timestamp_ms)
        }

        pub(super) fn frames_per_second(&self) -> f64 {
            self.config.target_fps as f64
        }

        pub(super) fn stats(&self) -> CameraStats {
            CameraStats {
                frames_captured: self.frame_count,
                device: self.config.device.clone(),
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> CameraConfig {
        CameraConfig {
            device: "stub://webcam".to_string(),
            target_fps: 10,
            width: 32,
            height: 24,
        }
    }

    #[test]
    fn camera_source_is_live_and_endless() -> Result<()> {
        let mut source = CameraSource::new(stub_config())?;
        source.connect()?;
        assert!(source.is_live());
        assert_eq!(source.frames_per_second(), 10.0);

        for _ in 0..500 {
            assert!(source.next_frame()?.is_some());
        }
        assert_eq!(source.stats().frames_captured, 500);
        Ok(())
    }

    #[test]
    fn camera_source_uses_configured_dimensions() -> Result<()> {
        let mut source = CameraSource::new(stub_config())?;
        source.connect()?;
        let frame = source.next_frame()?.ok_or_else(|| anyhow!("no frame"))?;
        assert_eq!((frame.width(), frame.height()), (32, 24));
        Ok(())
    }
}
