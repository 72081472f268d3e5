// SPDX-License-Identifier: MIT OR Apache-2.0
//! 2D vector and transform types used by path playback.

use serde::{Deserialize, Serialize};

/// 2D point / vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
}

impl Point2 {
    /// Origin
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Create a new point
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Vector length
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Squared vector length
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Euclidean distance to another point
    pub fn distance(self, other: Point2) -> f32 {
        (other - self).length()
    }

    /// Component-wise product
    pub fn scale(self, factor: Point2) -> Point2 {
        Point2::new(self.x * factor.x, self.y * factor.y)
    }

    /// Rotate counter-clockwise by `radians`
    pub fn rotate(self, radians: f32) -> Point2 {
        let (sin, cos) = radians.sin_cos();
        Point2::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Linear interpolation that does not clamp `t`.
    ///
    /// Values of `t` outside `[0, 1]` extrapolate past the endpoints.
    pub fn lerp_unclamped(self, to: Point2, t: f32) -> Point2 {
        self + (to - self) * t
    }

    /// Whether both components are finite
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl std::ops::Add for Point2 {
    type Output = Point2;
    fn add(self, rhs: Point2) -> Point2 {
        Point2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point2 {
    type Output = Point2;
    fn sub(self, rhs: Point2) -> Point2 {
        Point2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Point2 {
    type Output = Point2;
    fn mul(self, rhs: f32) -> Point2 {
        Point2::new(self.x * rhs, self.y * rhs)
    }
}

/// World transform of a reference frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform2 {
    /// World position
    pub position: Point2,
    /// Rotation in radians, counter-clockwise
    pub rotation: f32,
    /// Local scale
    pub scale: Point2,
}

impl Transform2 {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        position: Point2::ZERO,
        rotation: 0.0,
        scale: Point2::new(1.0, 1.0),
    };

    /// Transform at a position with no rotation
    pub fn from_position(position: Point2) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Set rotation
    pub fn with_rotation(mut self, radians: f32) -> Self {
        self.rotation = radians;
        self
    }

    /// Set scale
    pub fn with_scale(mut self, scale: Point2) -> Self {
        self.scale = scale;
        self
    }

    /// Map a local point into world space (scale, then rotate, then translate)
    pub fn transform_point(&self, local: Point2) -> Point2 {
        self.position + local.scale(self.scale).rotate(self.rotation)
    }
}

impl Default for Transform2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}
