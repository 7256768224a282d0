//! Attach / detach state machine
//!
//! ```text
//!   Attached(i) --pivot request--> Detached { elapsed: 0, target }
//!   Detached    --elapsed >= release_delay--> Attached(target), L = |bob - anchor[target]|
//!   any state   --reset--> Attached(0), L = |bob - anchor[0]|
//! ```
//!
//! The release delay is polled: every tick adds `dt` to `elapsed`, nothing
//! blocks or sleeps. Anchors are owned by the caller and passed in by slice.

use tracing::{debug, warn};

use crate::error::{Result, SwingError};
use crate::simulation::states::{Anchor, AttachmentState, NVec3, Tether};

/// Slack on the elapsed-time comparison so that accumulated float ticks land on the delay
pub const TIME_SLACK: f64 = 1.0e-9;

/// Pivot-change command coming from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotRequest {
    /// Cycle to the following anchor, wrapping to 0
    Next,
    /// Jump to a specific anchor
    Index(usize),
}

/// What changed during a machine operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Detached { target: usize },
    Reattached { anchor: usize, length: f64 },
    Reset { length: f64 },
}

/// Cyclic pivot policy: `current + 1`, wrapping to 0 at the end of the list
pub fn next_pivot(current: usize, count: usize) -> usize {
    if current + 1 >= count {
        0
    } else {
        current + 1
    }
}

fn anchor_at(anchors: &[Anchor], index: usize) -> Result<&Anchor> {
    anchors.get(index).ok_or(SwingError::AnchorOutOfRange {
        index,
        count: anchors.len(),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentMachine {
    state: AttachmentState,
    tether_length: f64,  // meaningful only while attached
    pivot_index: usize,  // cursor of the pivot policy
    release_delay: f64,
}

impl AttachmentMachine {
    /// Start attached to anchor 0 with the bob's current distance as tether length
    pub fn new(bob_x: &NVec3, anchors: &[Anchor], release_delay: f64) -> Result<Self> {
        if anchors.is_empty() {
            return Err(SwingError::NoAnchors);
        }
        for anchor in anchors {
            anchor.validate()?;
        }
        if !(release_delay.is_finite() && release_delay >= 0.0) {
            return Err(SwingError::NegativeReleaseDelay(release_delay));
        }
        let tether = Tether::new(anchors[0].x, (bob_x - anchors[0].x).norm())?;

        Ok(Self {
            state: AttachmentState::Attached { anchor: 0 },
            tether_length: tether.length,
            pivot_index: 0,
            release_delay,
        })
    }

    pub fn state(&self) -> AttachmentState {
        self.state
    }

    pub fn release_delay(&self) -> f64 {
        self.release_delay
    }

    /// Anchor most recently chosen by the pivot policy
    pub fn pivot_index(&self) -> usize {
        self.pivot_index
    }

    /// Current tether length, `None` while detached
    pub fn tether_length(&self) -> Option<f64> {
        self.state.is_attached().then_some(self.tether_length)
    }

    /// Constraint for the integrator, `None` while detached
    pub fn tether(&self, anchors: &[Anchor]) -> Option<Tether> {
        let anchor = self.state.anchor()?;
        anchors.get(anchor).map(|a| Tether {
            pivot: a.x,
            length: self.tether_length,
        })
    }

    /// Release the tether and schedule a reattach
    ///
    /// Ignored (returns `Ok(None)`) while already detached: only one detach can
    /// be outstanding. An out-of-range index is rejected in every state.
    pub fn request_pivot_change(&mut self, request: PivotRequest, anchors: &[Anchor]) -> Result<Option<Transition>> {
        if anchors.is_empty() {
            return Err(SwingError::NoAnchors);
        }
        let target = match request {
            PivotRequest::Next => next_pivot(self.pivot_index, anchors.len()),
            PivotRequest::Index(index) => {
                anchor_at(anchors, index)?;
                index
            }
        };

        if !self.state.is_attached() {
            debug!(?request, "pivot change ignored, already detached");
            return Ok(None);
        }

        self.pivot_index = target;
        self.state = AttachmentState::Detached { elapsed: 0.0, target };
        debug!(anchor = target, "detached from pivot");
        Ok(Some(Transition::Detached { target }))
    }

    /// Accumulate `dt` of free-fall time and reattach once the delay has passed
    ///
    /// The new tether length is the bob's distance to the target at this instant.
    /// If the bob sits exactly on the target the reattach is retried next tick;
    /// any other invalid length is an error.
    pub fn advance(&mut self, dt: f64, bob_x: &NVec3, anchors: &[Anchor]) -> Result<Option<Transition>> {
        let AttachmentState::Detached { elapsed, target } = self.state else {
            return Ok(None);
        };

        let elapsed = elapsed + dt;
        self.state = AttachmentState::Detached { elapsed, target };

        if elapsed + TIME_SLACK < self.release_delay {
            return Ok(None);
        }

        let anchor = anchor_at(anchors, target)?;
        let length = (bob_x - anchor.x).norm();
        if length == 0.0 {
            warn!(anchor = target, "bob coincides with target anchor, deferring reattach");
            return Ok(None);
        }
        let tether = Tether::new(anchor.x, length)?;

        self.state = AttachmentState::Attached { anchor: target };
        self.tether_length = tether.length;
        debug!(anchor = target, length = tether.length, elapsed, "reattached");
        Ok(Some(Transition::Reattached {
            anchor: target,
            length: tether.length,
        }))
    }

    /// Force `Attached(0)`, dropping any pending reattach
    pub fn reset(&mut self, bob_x: &NVec3, anchors: &[Anchor]) -> Result<Transition> {
        let first = anchor_at(anchors, 0).map_err(|_| SwingError::NoAnchors)?;
        let tether = Tether::new(first.x, (bob_x - first.x).norm())?;

        self.state = AttachmentState::Attached { anchor: 0 };
        self.pivot_index = 0;
        self.tether_length = tether.length;
        debug!(length = tether.length, "reset to first pivot");
        Ok(Transition::Reset {
            length: tether.length,
        })
    }
}
