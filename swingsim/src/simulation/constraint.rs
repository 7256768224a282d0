//! Position-based tether constraint
//!
//! The tether is a cable, not a rod: it only limits the maximum separation.
//! A tentative position inside the sphere of radius `length` around the pivot
//! is kept as is; one outside is pulled back onto the sphere along the ray from
//! the pivot through it.

use crate::simulation::states::{NVec3, Tether};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub x: NVec3,      // corrected position
    pub taut: bool,    // separation reached the tether length
}

/// Project `tentative` back inside `tether`
///
/// `taut` is true when the tentative separation is at least `length - eps`,
/// so a bob resting exactly on the sphere counts as taut without being moved.
pub fn project(tether: &Tether, tentative: &NVec3, eps: f64) -> Projection {
    let offset = tentative - tether.pivot;
    let d = offset.norm();

    if d <= tether.length {
        // Slack (or just touching): leave the position alone
        return Projection {
            x: *tentative,
            taut: d >= tether.length - eps,
        };
    }

    // d > length > 0, so offset has a well-defined direction
    Projection {
        x: tether.pivot + offset * (tether.length / d),
        taut: true,
    }
}
