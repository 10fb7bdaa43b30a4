use serde_derive::{Deserialize, Serialize};

use super::Point;

/// An axis aligned box in CSS pixels. Layout boxes reported by the page and
/// the viewport itself are both expressed as a `Rect`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect { x, y, w, h }
    }

    /// A viewport of the given dimensions, anchored at the origin.
    pub const fn sized(w: f32, h: f32) -> Rect {
        Rect::new(0.0, 0.0, w, h)
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    pub fn contains_point(&self, point: Point) -> bool {
        self.x <= point.x
            && point.x <= self.x + self.w
            && self.y <= point.y
            && point.y <= self.y + self.h
    }
}
