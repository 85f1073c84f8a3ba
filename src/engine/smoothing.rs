// Frame-rate independent exponential approach.
// Each frame closes `dt * rate` of the remaining gap, clamped so a long
// frame lands on the target instead of overshooting past it.

use glam::Vec3;

/// Fraction of the remaining gap to close this frame, in [0, 1].
/// Non-finite or negative `dt` closes nothing.
pub fn blend_factor(rate: f32, dt: f32) -> f32 {
    let f = dt * rate;
    if f.is_finite() { f.clamp(0.0, 1.0) } else if f > 0.0 { 1.0 } else { 0.0 }
}

pub fn approach(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    match blend_factor(rate, dt) {
        f if f >= 1.0 => target,
        f => current + (target - current) * f,
    }
}

pub fn approach_vec3(current: Vec3, target: Vec3, rate: f32, dt: f32) -> Vec3 {
    match blend_factor(rate, dt) {
        f if f >= 1.0 => target,
        f => current.lerp(target, f),
    }
}
