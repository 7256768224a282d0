//! Force model for a bob hanging from a tether
//!
//! Three contributors, all pure functions of the current state:
//! - gravity        `m g`
//! - tension        `m |g| cos(theta)` along the tether, toward the anchor
//! - centripetal    `m |v|^2 / L`, toward the anchor
//!
//! `ForceSample` keeps the values of the last step for diagnostics only; it is
//! never read back by the integrator.

use crate::simulation::states::NVec3;

/// Below this length a direction is treated as undefined
pub const NORM_EPS: f64 = 1.0e-12;

/// Unit vector along `v`, or `None` when `v` has (near) zero length
pub fn unit(v: &NVec3) -> Option<NVec3> {
    v.try_normalize(NORM_EPS)
}

/// Gravitational force on a bob of mass `m`: F = m g
pub fn gravity_force(m: f64, g: &NVec3) -> NVec3 {
    *g * m
}

/// Gravity pre-scaled by the step: m g dt
pub fn gravity_impulse(m: f64, g: &NVec3, dt: f64) -> NVec3 {
    gravity_force(m, g) * dt
}

/// Angle in degrees between `a` and `b`, 0 when either is degenerate
pub fn angle_deg(a: &NVec3, b: &NVec3) -> f64 {
    match (unit(a), unit(b)) {
        (Some(ua), Some(ub)) => ua.dot(&ub).clamp(-1.0, 1.0).acos().to_degrees(),
        _ => 0.0,
    }
}

/// Tension magnitude `m |g| cos(theta)`
///
/// `outward` is the unit vector from anchor to bob and `gravity_dir` the unit
/// gravity direction, theta is the angle between them. Perpendicular vectors
/// give exactly 0 (no sign flip at the horizontal). Zero vectors, which stand
/// in for undefined directions, also give 0.
///
/// Negative values mean the bob is above the anchor.
pub fn tension_magnitude(outward: &NVec3, gravity_dir: &NVec3, m: f64, g_mag: f64) -> f64 {
    let cos_theta = outward.dot(gravity_dir).clamp(-1.0, 1.0);
    if cos_theta == 0.0 {
        return 0.0;
    }
    m * g_mag * cos_theta
}

/// Centripetal magnitude `m |v|^2 / L`
///
/// Uses the scalar speed so the result does not depend on the orientation of
/// the axes.
pub fn centripetal_magnitude(v: &NVec3, m: f64, length: f64) -> f64 {
    m * v.norm_squared() / length
}

/// Centripetal force directed along `inward` (unit vector from bob to anchor)
pub fn centripetal_force(v: &NVec3, m: f64, length: f64, inward: &NVec3) -> NVec3 {
    *inward * centripetal_magnitude(v, m, length)
}

/// Per-step diagnostics for overlays and CSV traces
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ForceSample {
    pub gravity_force: NVec3,         // m g
    pub tension_force: f64,           // signed tension magnitude, 0 when not taut
    pub tension_direction: NVec3,     // unit bob -> anchor, zero when not taut
    pub centripetal_magnitude: f64,   // m |v|^2 / L, 0 when not taut
    pub is_taut: bool,                // tether limited the bob this step
    pub delta_theta: f64,             // angle between tether and gravity, degrees
    pub angular_momentum: NVec3,      // about the active anchor, zero when detached
    pub velocity: NVec3,              // bob velocity after the step
    pub degenerate: bool,             // a direction was undefined and zeroed
}

impl ForceSample {
    /// Tension as a vector
    pub fn tension_vector(&self) -> NVec3 {
        self.tension_force * self.tension_direction
    }

    /// Centripetal correction as a vector
    pub fn centripetal_vector(&self) -> NVec3 {
        self.centripetal_magnitude * self.tension_direction
    }

    /// Sum of all forces applied during the step
    pub fn resultant(&self) -> NVec3 {
        self.gravity_force + self.tension_vector() + self.centripetal_vector()
    }
}
