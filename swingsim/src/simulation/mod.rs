pub mod states;
pub mod params;
pub mod engine;
pub mod forces;
pub mod constraint;
pub mod integrator;
pub mod attachment;
pub mod schedule;
pub mod scenario;
