//! High-level runtime engine settings
//!
//! Selects how a `Scenario` is driven (headless CSV trace or bevy viewer)
//! and how often the headless run records a row

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engine {
    pub viewer: bool,        // false = headless, true = bevy viewer
    pub record_every: usize, // emit one trace row every N ticks
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            viewer: false,
            record_every: 1,
        }
    }
}
