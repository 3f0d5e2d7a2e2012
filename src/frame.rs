//! Decoded video frames.
//!
//! A `Frame` is produced by an ingest source, optionally resized by the
//! pipeline, handed to the detector, and dropped at the end of the frame's
//! processing. Nothing downstream of the detector sees pixels.

use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;

/// An RGB frame together with its stream position.
pub struct Frame {
    image: RgbImage,
    /// Position of this frame in the stream, in milliseconds.
    pub timestamp_ms: f64,
}

impl Frame {
    pub fn new(image: RgbImage, timestamp_ms: f64) -> Self {
        Self {
            image,
            timestamp_ms,
        }
    }

    /// Build a frame from packed RGB24 bytes.
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32, timestamp_ms: f64) -> Result<Self> {
        let len = pixels.len();
        let image = RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
            anyhow!(
                "expected {} RGB bytes for a {}x{} frame, received {}",
                width as usize * height as usize * 3,
                width,
                height,
                len
            )
        })?;
        Ok(Self::new(image, timestamp_ms))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Packed RGB24 pixel bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Resize to `width`, keeping the aspect ratio. Height is truncated.
    ///
    /// Returns the frame unchanged when it already has the requested width.
    pub fn resize_to_width(self, width: u32) -> Frame {
        if width == 0 || width == self.width() {
            return self;
        }
        let ratio = width as f64 / self.width() as f64;
        let height = ((self.height() as f64 * ratio) as u32).max(1);
        let image = imageops::resize(&self.image, width, height, FilterType::Triangle);
        Frame {
            image,
            timestamp_ms: self.timestamp_ms,
        }
    }
}
