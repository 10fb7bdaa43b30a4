use std::ops::Sub;

use serde_derive::{Deserialize, Serialize};

/// A position in CSS pixels, relative to the top left of the viewport.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Point {
        Point { x, y }
    }

    #[must_use]
    pub fn round(&self) -> Self {
        Point {
            x: self.x.round(),
            y: self.y.round(),
        }
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}
