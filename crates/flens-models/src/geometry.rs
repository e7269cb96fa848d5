//! Bounding-box geometry shared across the detection pipeline.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in source-frame pixel coordinates.
///
/// Invariant: a box that enters the pipeline satisfies `x2 > x1 && y2 > y1`;
/// detector decode discards anything degenerate before it gets here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    /// Create a new bounding box from pixel corners.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box width in pixels.
    #[inline]
    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    /// Box height in pixels.
    #[inline]
    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Length of the shorter side in pixels.
    #[inline]
    pub fn shorter_side(&self) -> i32 {
        self.width().min(self.height())
    }

    /// Box area in pixels.
    #[inline]
    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    /// Whether both dimensions are strictly positive.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.x2 > self.x1 && self.y2 > self.y1
    }

    /// Center point.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.x1 + self.x2) as f64 / 2.0,
            (self.y1 + self.y2) as f64 / 2.0,
        )
    }

    /// Compute Intersection over Union with another box.
    ///
    /// Each box's area is floored at one pixel and a small epsilon pads the
    /// denominator, so degenerate boxes yield a finite score instead of a
    /// division by zero.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let xa = self.x1.max(other.x1);
        let ya = self.y1.max(other.y1);
        let xb = self.x2.min(other.x2);
        let yb = self.y2.min(other.y2);

        let inter_w = (xb - xa).max(0) as i64;
        let inter_h = (yb - ya).max(0) as i64;
        let intersection = inter_w * inter_h;

        let area_a = self.area().max(1);
        let area_b = other.area().max(1);

        intersection as f64 / ((area_a + area_b - intersection) as f64 + 1e-6)
    }

    /// Scale the box around its center by `scale`, then clamp to
    /// `[0, frame_w - 1] x [0, frame_h - 1]`.
    ///
    /// The result always lies inside the frame with non-negative area; a box
    /// fully outside the frame collapses onto the nearest edge.
    pub fn expand(&self, scale: f64, frame_w: u32, frame_h: u32) -> BoundingBox {
        let (cx, cy) = self.center();
        let w = self.width() as f64 * scale;
        let h = self.height() as f64 * scale;

        let last_x = (frame_w as i32 - 1).max(0);
        let last_y = (frame_h as i32 - 1).max(0);

        let nx1 = ((cx - w / 2.0).max(0.0) as i32).min(last_x);
        let ny1 = ((cy - h / 2.0).max(0.0) as i32).min(last_y);
        let nx2 = ((cx + w / 2.0).max(0.0) as i32).min(last_x).max(nx1);
        let ny2 = ((cy + h / 2.0).max(0.0) as i32).min(last_y).max(ny1);

        BoundingBox {
            x1: nx1,
            y1: ny1,
            x2: nx2,
            y2: ny2,
        }
    }
}
