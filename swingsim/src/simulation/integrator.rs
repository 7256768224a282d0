//! Fixed-step integrator for a tethered bob
//!
//! Semi-implicit Euler: forces update the velocity first, the new velocity then
//! moves the position. When the tether is taut, tension and centripetal
//! corrections are folded into the velocity before the position is projected
//! back inside the tether sphere.

use tracing::{debug, trace};

use super::constraint::project;
use super::forces::{
    angle_deg, centripetal_magnitude, gravity_force, gravity_impulse, tension_magnitude, unit,
    ForceSample,
};
use super::states::{Bob, NVec3, Tether};

/// Advance `bob` by one tick of length `dt`
///
/// With `tether == None` the bob is in free fall and only gravity acts.
/// Otherwise:
/// 1. gravity kicks the velocity: v += (m g / m) dt
/// 2. tentative position x' = x + v dt
/// 3. the tether is taut when |x' - pivot| >= L - taut_eps
/// 4. if taut, tension + centripetal (along the pre-step bob -> pivot direction)
///    kick the velocity again and x' is recomputed
/// 5. x' is projected so |x - pivot| <= L
///
/// `dt` is assumed validated by the caller.
pub fn pendulum_step(bob: &mut Bob, tether: Option<&Tether>, gravity: &NVec3, taut_eps: f64, dt: f64) -> ForceSample {
    let m = bob.m;

    // Gravity kick
    let f_gravity = gravity_force(m, gravity);
    bob.v += gravity_impulse(m, gravity, dt) / m;

    // Drift with the gravity-only velocity
    let mut tentative = bob.x + bob.v * dt;

    let mut sample = ForceSample {
        gravity_force: f_gravity,
        ..Default::default()
    };

    let Some(tether) = tether else {
        // Free fall: no constraint, no tension
        bob.x = tentative;
        sample.velocity = bob.v;
        trace!(x = ?bob.x, v = ?bob.v, "free-fall step");
        return sample;
    };

    // Direction of the tether before this step's motion
    let offset = bob.x - tether.pivot;
    sample.delta_theta = angle_deg(&offset, gravity);

    let taut = (tentative - tether.pivot).norm() >= tether.length - taut_eps;

    if taut {
        let outward = match unit(&offset) {
            Some(u) => u,
            None => {
                // Bob sits on the pivot: no usable tether direction this step
                debug!(pivot = ?tether.pivot, "degenerate tether direction, dropping tension");
                sample.degenerate = true;
                NVec3::zeros()
            }
        };
        let inward = -outward;

        // Zero gravity has no direction; tension is 0 in that case
        let gravity_dir = unit(gravity).unwrap_or_else(NVec3::zeros);

        let tension = tension_magnitude(&outward, &gravity_dir, m, gravity.norm());
        let centripetal = if sample.degenerate {
            0.0
        } else {
            centripetal_magnitude(&bob.v, m, tether.length)
        };

        // Tension + centripetal kick, then redo the drift
        bob.v += inward * ((tension + centripetal) / m * dt);
        tentative = bob.x + bob.v * dt;

        sample.tension_force = tension;
        sample.tension_direction = inward;
        sample.centripetal_magnitude = centripetal;
    }

    let projection = project(tether, &tentative, taut_eps);
    bob.x = projection.x;

    sample.is_taut = taut || projection.taut;
    sample.velocity = bob.v;
    sample.angular_momentum = bob.angular_momentum(&tether.pivot);

    trace!(x = ?bob.x, v = ?bob.v, taut = sample.is_taut, "tethered step");
    sample
}
