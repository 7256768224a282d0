//! Error types for the swing simulation.
//!
//! Every variant is a configuration problem: bad input at setup time or at the
//! offending call. Degenerate geometry during a step (bob sitting on its anchor)
//! is recovered inside the step and never surfaces here.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SwingError {
    #[error("mass must be positive and finite, got {0}")]
    NonPositiveMass(f64),

    #[error("tether length must be positive, got {0}")]
    NonPositiveTetherLength(f64),

    #[error("anchor list is empty")]
    NoAnchors,

    #[error("anchor index {index} out of range (count: {count})")]
    AnchorOutOfRange { index: usize, count: usize },

    #[error("time step must be positive and finite, got {0}")]
    NonPositiveTimeStep(f64),

    #[error("release delay must be non-negative and finite, got {0}")]
    NegativeReleaseDelay(f64),

    #[error("taut tolerance must be non-negative and finite, got {0}")]
    NegativeTautEps(f64),

    #[error("record stride must be at least 1 tick")]
    ZeroRecordStride,

    #[error("attach command at t = {0} has no anchor index")]
    MissingAnchorIndex(f64),

    #[error("{what} must be finite")]
    NonFinite { what: &'static str },
}

pub type Result<T> = std::result::Result<T, SwingError>;
