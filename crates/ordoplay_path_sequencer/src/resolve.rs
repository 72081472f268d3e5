// SPDX-License-Identifier: MIT OR Apache-2.0
//! Coordinate resolution for segment endpoints.

use crate::math::{Point2, Transform2};
use crate::pattern::CoordinateSpace;

/// A frame that relative-space patterns are authored against
pub trait ReferenceFrame {
    /// Current world transform of the frame
    fn world_transform(&self) -> Transform2;
}

impl ReferenceFrame for Transform2 {
    fn world_transform(&self) -> Transform2 {
        *self
    }
}

/// Map a stored segment point to world space.
///
/// World-space points, and relative points without a frame, pass through
/// unchanged. Evaluated on every call so a moving frame moves the targets.
pub fn resolve(point: Point2, space: CoordinateSpace, frame: Option<&dyn ReferenceFrame>) -> Point2 {
    match (space, frame) {
        (CoordinateSpace::RelativeToReference, Some(frame)) => {
            frame.world_transform().transform_point(point)
        }
        _ => point,
    }
}
