//! Scripted host commands for headless runs
//!
//! A `CommandSchedule` is a time-ordered queue. Each host tick drains the
//! commands whose timestamp has been reached; they are applied at the tick
//! boundary, before the physics step.

use std::collections::VecDeque;

use crate::simulation::attachment::{PivotRequest, TIME_SLACK};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Pivot(PivotRequest),
    Reset,
    Pause,
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedCommand {
    pub at: f64,          // host clock time
    pub command: Command,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandSchedule {
    pending: VecDeque<TimedCommand>,
}

impl CommandSchedule {
    /// Build a schedule; commands with equal timestamps keep their input order
    pub fn new(mut commands: Vec<TimedCommand>) -> Self {
        commands.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self {
            pending: commands.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Remove and return every command due at or before `clock`
    pub fn due(&mut self, clock: f64) -> Vec<Command> {
        let mut out = Vec::new();
        while let Some(next) = self.pending.front() {
            if next.at > clock + TIME_SLACK {
                break;
            }
            if let Some(tc) = self.pending.pop_front() {
                out.push(tc.command);
            }
        }
        out
    }
}
