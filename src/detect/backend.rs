use anyhow::Result;

use crate::detect::result::DetectionCandidate;
use crate::frame::Frame;

/// Face detector backend.
///
/// Implementations wrap a pretrained detector and return every candidate the
/// model produced for the frame, unfiltered. Thresholding and de-duplication
/// happen downstream in the tracker. Boxes are in the pixel space of the frame
/// passed in.
pub trait DetectorBackend {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run inference on one frame.
    fn infer(&mut self, frame: &Frame) -> Result<Vec<DetectionCandidate>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<D: DetectorBackend + ?Sized> DetectorBackend for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<DetectionCandidate>> {
        (**self).infer(frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
