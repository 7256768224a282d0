//! Configuration types for loading swing scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! scenario. A scenario consists of:
//!
//! - [`EngineConfig`]     – how the scenario is driven (headless or viewer)
//! - [`ParametersConfig`] – step size, gravity, release delay, taut epsilon
//! - [`BobConfig`]        – initial state of the bob
//! - anchors              – candidate pivot positions, attached to anchor 0 at start
//! - [`CommandConfig`]    – scripted host commands for headless runs
//! - [`ScenarioConfig`]   – top-level wrapper used to load a scenario from YAML
//!
//! # YAML format
//!
//! ```yaml
//! engine:
//!   viewer: false           # true -> open the bevy viewer
//!   record_every: 5         # CSV row every 5 ticks
//!
//! parameters:
//!   t_end: 10.0             # total host time
//!   h0: 0.02                # fixed step size
//!   gravity: [0.0, -9.81, 0.0]
//!   release_delay: 1.0      # free fall before reattaching
//!   taut_eps: 1.0e-6
//!
//! bob:
//!   x: [0.0, -3.0, 0.0]
//!   v: [0.0, 0.0, 0.0]
//!   m: 1.0
//!
//! anchors:
//!   - [0.0, 0.0, 0.0]
//!   - [4.0, 0.5, 0.0]
//!
//! commands:
//!   - { at: 1.0, action: next }
//!   - { at: 3.0, action: attach, anchor: 0 }
//!   - { at: 6.0, action: reset }
//! ```
//!
//! Only `parameters.t_end`, `parameters.h0`, `bob.x`, `bob.m` and `anchors`
//! are required. The scenario layer validates the values.

use serde::Deserialize;

use crate::simulation::params::{DEFAULT_RELEASE_DELAY, DEFAULT_TAUT_EPS, EARTH_GRAVITY};

fn default_record_every() -> usize {
    1
}

fn default_gravity() -> [f64; 3] {
    [0.0, -EARTH_GRAVITY, 0.0]
}

fn default_release_delay() -> f64 {
    DEFAULT_RELEASE_DELAY
}

fn default_taut_eps() -> f64 {
    DEFAULT_TAUT_EPS
}

/// How the scenario is driven
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub viewer: bool, // `false` - headless CSV trace, `true` - bevy viewer
    #[serde(default = "default_record_every")]
    pub record_every: usize, // emit one CSV row every N ticks
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            viewer: false,
            record_every: default_record_every(),
        }
    }
}

/// Numerical and physical parameters
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ParametersConfig {
    pub t_end: f64, // total host time for headless runs
    pub h0: f64,    // fixed step size
    #[serde(default = "default_gravity")]
    pub gravity: [f64; 3], // gravitational acceleration
    #[serde(default = "default_release_delay")]
    pub release_delay: f64, // free-fall time before reattaching
    #[serde(default = "default_taut_eps")]
    pub taut_eps: f64, // "approximately equal counts as taut"
}

/// Initial state of the bob
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct BobConfig {
    pub x: [f64; 3], // initial position
    #[serde(default)]
    pub v: [f64; 3], // initial velocity
    pub m: f64,      // mass
}

/// Kind of scripted command
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionConfig {
    Next,   // cycle to the following anchor
    Attach, // jump to `anchor`
    Reset,  // back to the start, attached to anchor 0
    Pause,
    Resume,
}

/// One scripted command
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CommandConfig {
    pub at: f64, // host time at which the command fires
    pub action: ActionConfig,
    #[serde(default)]
    pub anchor: Option<usize>, // required by `attach`
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    pub parameters: ParametersConfig,
    pub bob: BobConfig,
    pub anchors: Vec<[f64; 3]>,
    #[serde(default)]
    pub commands: Vec<CommandConfig>,
}
