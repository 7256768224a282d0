pub mod error;
pub mod simulation;
pub mod configuration;
#[cfg(feature = "viewer")]
pub mod visualization;
pub mod benchmark;

pub use error::{Result, SwingError};

pub use simulation::states::{Anchor, AttachmentState, Bob, NVec3, Tether};
pub use simulation::params::Parameters;
pub use simulation::engine::Engine;
pub use simulation::forces::ForceSample;
pub use simulation::constraint::{project, Projection};
pub use simulation::integrator::pendulum_step;
pub use simulation::attachment::{next_pivot, AttachmentMachine, PivotRequest, Transition};
pub use simulation::schedule::{Command, CommandSchedule, TimedCommand};
pub use simulation::scenario::{Scenario, TraceRow};

pub use configuration::config::{ActionConfig, BobConfig, CommandConfig, EngineConfig, ParametersConfig, ScenarioConfig};

#[cfg(feature = "viewer")]
pub use visualization::swing_vis3d::run_3d;

pub use benchmark::benchmark::{bench_step, bench_step_curve, bench_threads};
