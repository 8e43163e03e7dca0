/// Axis-aligned detection box in original-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionCandidate {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Classifier decision score that accepted the window.
    pub confidence: f32,
}

impl DetectionCandidate {
    pub fn new(x: u32, y: u32, width: u32, height: u32, confidence: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Intersection-over-union with another box. Empty boxes overlap nothing.
    pub fn iou(&self, other: &DetectionCandidate) -> f32 {
        let left = u64::from(self.x.max(other.x));
        let top = u64::from(self.y.max(other.y));
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return 0.0;
        }
        let intersection = (right - left) * (bottom - top);
        let union = self.area() + other.area() - intersection;
        if union == 0 {
            0.0
        } else {
            (intersection as f64 / union as f64) as f32
        }
    }

    /// `true` when the box lies completely inside a `width` x `height` image.
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        self.right() <= u64::from(width) && self.bottom() <= u64::from(height)
    }
}
