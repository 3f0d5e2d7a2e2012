use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, DetectionCandidate};
use crate::frame::Frame;

/// Stub backend for synthetic runs and tests.
///
/// Hashes the frame pixels and derives one candidate from the digest, so the
/// same content always yields the same box and confidence, and any change in
/// content moves the box.
#[derive(Default)]
pub struct StubBackend;

impl StubBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<DetectionCandidate>> {
        let (width, height) = (frame.width(), frame.height());
        if width < 4 || height < 4 {
            return Ok(Vec::new());
        }

        let digest: [u8; 32] = Sha256::digest(frame.pixels()).into();
        let x1 = u16::from_le_bytes([digest[0], digest[1]]) as u32 % (width / 2);
        let y1 = u16::from_le_bytes([digest[2], digest[3]]) as u32 % (height / 2);
        let side = (width.min(height) / 4).max(1);
        let confidence = 0.3 + 0.7 * (digest[4] as f64 / 255.0);

        Ok(vec![DetectionCandidate::new(
            confidence,
            BoundingBox::new(
                x1 as i32,
                y1 as i32,
                (x1 + side) as i32,
                (y1 + side) as i32,
            ),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(fill: u8) -> Frame {
        Frame::from_rgb(vec![fill; 64 * 48 * 3], 64, 48, 0.0).unwrap()
    }

    #[test]
    fn stub_backend_is_deterministic_per_content() {
        let mut backend = StubBackend::new();
        let a1 = backend.infer(&frame(1)).unwrap();
        let a2 = backend.infer(&frame(1)).unwrap();
        let b = backend.infer(&frame(2)).unwrap();

        assert_eq!(a1.len(), 1);
        assert_eq!(a1, a2);
        assert_ne!(a1[0].bbox, b[0].bbox);
    }

    #[test]
    fn stub_backend_boxes_stay_inside_frame() {
        let mut backend = StubBackend::new();
        for fill in 0..32u8 {
            let c = backend.infer(&frame(fill)).unwrap()[0];
            assert!((0.3..=1.0).contains(&c.confidence));
            assert!(c.bbox.x1 >= 0 && c.bbox.x2 <= 64);
            assert!(c.bbox.y1 >= 0 && c.bbox.y2 <= 48);
            assert!(c.bbox.x1 < c.bbox.x2 && c.bbox.y1 < c.bbox.y2);
        }
    }

    #[test]
    fn tiny_frames_yield_nothing() {
        let mut backend = StubBackend::new();
        let tiny = Frame::from_rgb(vec![0u8; 2 * 2 * 3], 2, 2, 0.0).unwrap();
        assert!(backend.infer(&tiny).unwrap().is_empty());
    }
}
