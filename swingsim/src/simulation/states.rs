//! Core state types for the swing simulation.
//!
//! - `Bob`             the simulated point mass (position, velocity, mass)
//! - `Anchor`          a candidate pivot in world space, referenced by index
//! - `Tether`          the active pivot position plus its maximum length
//! - `AttachmentState` whether the bob hangs from an anchor or is in free fall

use nalgebra::Vector3;

use crate::error::{Result, SwingError};

pub type NVec3 = Vector3<f64>;

/// Reject vectors with a NaN or infinite component
pub fn check_finite(v: &NVec3, what: &'static str) -> Result<()> {
    if v.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(SwingError::NonFinite { what })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bob {
    pub x: NVec3, // position
    pub v: NVec3, // velocity
    pub m: f64,   // mass
}

impl Bob {
    /// Build a bob, rejecting non-positive or non-finite mass and non-finite vectors
    pub fn new(x: NVec3, v: NVec3, m: f64) -> Result<Self> {
        if !(m.is_finite() && m > 0.0) {
            return Err(SwingError::NonPositiveMass(m));
        }
        check_finite(&x, "bob position")?;
        check_finite(&v, "bob velocity")?;
        Ok(Self { x, v, m })
    }

    /// Angular momentum about `pivot`: (x - pivot) × m v
    pub fn angular_momentum(&self, pivot: &NVec3) -> NVec3 {
        (self.x - pivot).cross(&(self.m * self.v))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: NVec3, // world-space position
}

impl Anchor {
    pub fn new(x: NVec3) -> Self {
        Self { x }
    }

    pub fn validate(&self) -> Result<()> {
        check_finite(&self.x, "anchor position")
    }
}

/// The constraint seen by the integrator for one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tether {
    pub pivot: NVec3, // anchor position
    pub length: f64,  // maximum separation, always > 0
}

impl Tether {
    pub fn new(pivot: NVec3, length: f64) -> Result<Self> {
        if !(length.is_finite() && length > 0.0) {
            return Err(SwingError::NonPositiveTetherLength(length));
        }
        Ok(Self { pivot, length })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttachmentState {
    /// Constrained by the tether of `anchor`
    Attached { anchor: usize },
    /// Free fall since `elapsed` simulation time; reattaches to `target`
    Detached { elapsed: f64, target: usize },
}

impl AttachmentState {
    pub fn is_attached(&self) -> bool {
        matches!(self, AttachmentState::Attached { .. })
    }

    /// Anchor the bob hangs from, if any
    pub fn anchor(&self) -> Option<usize> {
        match *self {
            AttachmentState::Attached { anchor } => Some(anchor),
            AttachmentState::Detached { .. } => None,
        }
    }
}
