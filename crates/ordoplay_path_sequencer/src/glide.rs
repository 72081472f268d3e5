// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tick-driven eased glide between two points.

use crate::body::Body;
use crate::easing::ease;
use crate::math::Point2;

/// Moves a body from one point to another over a fixed duration.
///
/// The task is plain data: advancing it is the only way it makes progress,
/// and dropping it cancels it without the final snap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlideTask {
    /// Start point
    pub from: Point2,
    /// End point
    pub to: Point2,
    /// Glide duration in seconds
    pub duration: f32,
    /// Ease power
    pub ease_power: f32,
    /// Whether the body should deal contact damage while gliding
    pub hazardous: bool,
    elapsed: f32,
}

impl GlideTask {
    /// Create a hazardous glide
    pub fn new(from: Point2, to: Point2, duration: f32, ease_power: f32) -> Self {
        Self {
            from,
            to,
            duration,
            ease_power,
            hazardous: true,
            elapsed: 0.0,
        }
    }

    /// Set the hazard flag
    pub fn with_hazard(mut self, hazardous: bool) -> Self {
        self.hazardous = hazardous;
        self
    }

    /// A non-positive duration completes without waiting for a tick
    pub fn is_instant(&self) -> bool {
        self.duration.is_nan() || self.duration <= 0.0
    }

    /// Time accumulated so far
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Position along the glide for an elapsed time.
    ///
    /// The final lerp is unclamped so curve shapes that leave `[0, 1]`
    /// overshoot the endpoints.
    pub fn sample(&self, elapsed: f32) -> Point2 {
        if self.is_instant() {
            return self.to;
        }
        let t = (elapsed / self.duration).clamp(0.0, 1.0);
        self.from.lerp_unclamped(self.to, ease(t, self.ease_power))
    }

    /// Advance by `dt` and command the body.
    ///
    /// Returns `Some(leftover)` once the glide has finished, where `leftover`
    /// is the part of `dt` past the end of the glide. Instant glides place the
    /// body directly and hand back all of `dt`.
    pub fn step(&mut self, dt: f32, body: &mut dyn Body) -> Option<f32> {
        if self.is_instant() {
            body.set_position(self.to);
            return Some(dt.max(0.0));
        }

        self.elapsed += dt.max(0.0);

        if self.elapsed >= self.duration {
            // Exact endpoint, free of interpolation drift
            body.move_position(self.to);
            tracing::trace!(x = self.to.x, y = self.to.y, "Glide finished");
            return Some(self.elapsed - self.duration);
        }

        let position = self.sample(self.elapsed);
        body.move_position(position);
        tracing::trace!(x = position.x, y = position.y, elapsed = self.elapsed, "Glide sample");
        None
    }
}
