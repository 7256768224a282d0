//! Numerical and physical parameters for the simulation
//!
//! `Parameters` holds runtime settings:
//! - fixed step size and end time,
//! - gravitational acceleration vector,
//! - detach-to-reattach delay,
//! - epsilon used when classifying the tether as taut

use crate::error::{Result, SwingError};
use crate::simulation::states::NVec3;

/// Standard gravity magnitude
pub const EARTH_GRAVITY: f64 = 9.81;
/// Default time spent in free fall before reattaching
pub const DEFAULT_RELEASE_DELAY: f64 = 1.0;
/// Default slack for "approximately equal counts as taut"
pub const DEFAULT_TAUT_EPS: f64 = 1.0e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub t_end: f64,         // time end
    pub h0: f64,            // fixed step size
    pub gravity: NVec3,     // gravitational acceleration
    pub release_delay: f64, // free-fall time before reattaching
    pub taut_eps: f64,      // taut classification epsilon
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            t_end: 10.0,
            h0: 0.02,
            gravity: NVec3::new(0.0, -EARTH_GRAVITY, 0.0),
            release_delay: DEFAULT_RELEASE_DELAY,
            taut_eps: DEFAULT_TAUT_EPS,
        }
    }
}

impl Parameters {
    /// Fail fast on values the stepper cannot work with
    pub fn validate(&self) -> Result<()> {
        check_time_step(self.h0)?;
        if !self.t_end.is_finite() {
            return Err(SwingError::NonFinite { what: "t_end" });
        }
        if !self.gravity.iter().all(|c| c.is_finite()) {
            return Err(SwingError::NonFinite { what: "gravity" });
        }
        if !(self.release_delay.is_finite() && self.release_delay >= 0.0) {
            return Err(SwingError::NegativeReleaseDelay(self.release_delay));
        }
        if !(self.taut_eps.is_finite() && self.taut_eps >= 0.0) {
            return Err(SwingError::NegativeTautEps(self.taut_eps));
        }
        Ok(())
    }
}

/// A tick must move time forward
pub fn check_time_step(dt: f64) -> Result<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(SwingError::NonPositiveTimeStep(dt))
    }
}
