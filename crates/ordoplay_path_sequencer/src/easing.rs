// SPDX-License-Identifier: MIT OR Apache-2.0
//! Easing curve for glides.

/// Symmetric power ease: `t^p / (t^p + (1 - t)^p)`.
///
/// `t` is clamped to `[0, 1]`. A power of 1 is linear, 2 is quadratic
/// ease-in-out, and larger powers sharpen the acceleration around the
/// midpoint. Powers below 1 invert the shape (fast start and end, slow middle).
///
/// `power` must be positive; that is the pattern author's responsibility.
pub fn ease(t: f32, power: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    let a = t.powf(power);
    let b = (1.0 - t).powf(power);
    let sum = a + b;

    // Both terms underflow for very large powers near the midpoint
    if sum <= 0.0 {
        return if t < 0.5 {
            0.0
        } else if t > 0.5 {
            1.0
        } else {
            0.5
        };
    }

    a / sum
}
