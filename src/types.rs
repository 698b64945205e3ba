use glam::{DVec2, IVec2};

use crate::error::{AlignError, Result};

/// Sub-pixel location in image space. The origin is the top-left pixel and
/// `y` grows downwards, the convention of the `image` crate.
pub type Point = DVec2;

/// Correspondence between two raw points, `a` in the source plane and `b`
/// in the destination plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointMatch {
    pub a: Point,
    pub b: Point,
}

impl PointMatch {
    pub fn new(a: Point, b: Point) -> PointMatch {
        PointMatch { a, b }
    }
}

/// Quadrilateral destination region given by its four corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub bottom_left: Point,
    pub bottom_right: Point,
    pub top_left: Point,
    pub top_right: Point,
}

impl Frame {
    pub fn new(bottom_left: Point, bottom_right: Point, top_left: Point, top_right: Point) -> Frame {
        Frame {
            bottom_left,
            bottom_right,
            top_left,
            top_right,
        }
    }

    /// Builds a frame from corners ordered bottom-left, bottom-right,
    /// top-left, top-right.
    pub fn from_corners(corners: &[Point]) -> Result<Frame> {
        match corners {
            [bl, br, tl, tr] => Ok(Frame::new(*bl, *br, *tl, *tr)),
            _ => Err(AlignError::InvalidInput(format!(
                "a frame needs 4 corners, got {}",
                corners.len()
            ))),
        }
    }

    pub fn corners(&self) -> [Point; 4] {
        [self.bottom_left, self.bottom_right, self.top_left, self.top_right]
    }

    /// Inclusive integer bounding box `(min, max)` of the four corners.
    pub fn bounding_box(&self) -> (IVec2, IVec2) {
        let corners = self.corners();
        let min = corners.iter().fold(DVec2::splat(f64::MAX), |acc, p| acc.min(*p));
        let max = corners.iter().fold(DVec2::splat(f64::MIN), |acc, p| acc.max(*p));
        (min.floor().as_ivec2(), max.ceil().as_ivec2())
    }
}
