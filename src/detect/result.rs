/// Axis-aligned box in frame-pixel coordinates.
///
/// `x1 < x2` and `y1 < y2` are expected but not enforced; malformed boxes are
/// carried through unchanged. Equality is exact, element-wise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Scale a box given in normalized 0..1 coordinates into pixel space.
    ///
    /// Coordinates are truncated toward zero, not rounded.
    pub fn from_normalized(coords: [f32; 4], width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            x1: (coords[0] * w) as i32,
            y1: (coords[1] * h) as i32,
            x2: (coords[2] * w) as i32,
            y2: (coords[3] * h) as i32,
        }
    }
}

/// One raw inference output for a single frame, not yet filtered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionCandidate {
    /// 0..=1
    pub confidence: f64,
    pub bbox: BoundingBox,
}

impl DetectionCandidate {
    pub fn new(confidence: f64, bbox: BoundingBox) -> Self {
        Self { confidence, bbox }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_boxes_truncate_into_pixel_space() {
        let b = BoundingBox::from_normalized([0.1, 0.25, 0.5, 0.999], 400, 300);
        assert_eq!(b, BoundingBox::new(40, 75, 200, 299));
    }

    #[test]
    fn equality_is_element_wise() {
        let a = BoundingBox::new(10, 20, 30, 40);
        assert_eq!(a, BoundingBox::new(10, 20, 30, 40));
        assert_ne!(a, BoundingBox::new(10, 20, 30, 41));
        assert_ne!(a, BoundingBox::new(11, 21, 31, 41));
    }
}
