//! Build fully-initialized swing scenarios and drive them tick by tick
//!
//! A `Scenario` is the runtime bundle the host talks to. It owns
//! - engine settings (`Engine`) and numerical parameters (`Parameters`)
//! - the bob and the list of candidate anchors
//! - the attachment state machine
//! - the scripted command schedule and the last `ForceSample`
//!
//! Host operations are `step`/`step_dt` (one fixed tick), `request_pivot_change`,
//! `reset` and `set_paused`. `tick`/`run_until` add the scripted commands on top.
//!
//! A scenario carries no shared state: separate scenarios can be stepped on
//! separate threads, a single one must be stepped by one thread at a time.

use std::fmt;

use tracing::{debug, info};

use crate::configuration::config::{ActionConfig, ScenarioConfig};
use crate::error::{Result, SwingError};
use crate::simulation::attachment::{AttachmentMachine, PivotRequest, Transition, TIME_SLACK};
use crate::simulation::engine::Engine;
use crate::simulation::forces::ForceSample;
use crate::simulation::integrator::pendulum_step;
use crate::simulation::params::{check_time_step, Parameters};
use crate::simulation::schedule::{Command, CommandSchedule, TimedCommand};
use crate::simulation::states::{check_finite, Anchor, AttachmentState, Bob, NVec3, Tether};

#[derive(Debug, Clone)]
pub struct Scenario {
    pub engine: Engine,
    parameters: Parameters,
    bob: Bob,
    start: Bob, // restored on reset
    anchors: Vec<Anchor>,
    machine: AttachmentMachine,
    schedule: CommandSchedule,
    sample: ForceSample,
    t: f64,       // simulated time, frozen while paused
    clock: f64,   // host time, used for scripted commands
    ticks: usize, // host ticks so far
    paused: bool,
}

impl Scenario {
    /// Validate the inputs and start attached to anchor 0
    pub fn new(engine: Engine, parameters: Parameters, bob: Bob, anchors: Vec<Anchor>, schedule: CommandSchedule) -> Result<Self> {
        if engine.record_every == 0 {
            return Err(SwingError::ZeroRecordStride);
        }
        parameters.validate()?;
        let machine = AttachmentMachine::new(&bob.x, &anchors, parameters.release_delay)?;

        info!(
            anchors = anchors.len(),
            length = machine.tether_length().unwrap_or_default(),
            "scenario ready"
        );

        Ok(Self {
            engine,
            parameters,
            start: bob.clone(),
            bob,
            anchors,
            machine,
            schedule,
            sample: ForceSample::default(),
            t: 0.0,
            clock: 0.0,
            ticks: 0,
            paused: false,
        })
    }

    /// Map the YAML-facing configuration into a runtime scenario
    pub fn build_scenario(cfg: ScenarioConfig) -> Result<Self> {
        // Engine (runtime) from EngineConfig
        let engine = Engine {
            viewer: cfg.engine.viewer,
            record_every: cfg.engine.record_every,
        };

        // Parameters (runtime) from ParametersConfig
        let p_cfg = cfg.parameters;
        let parameters = Parameters {
            t_end: p_cfg.t_end,
            h0: p_cfg.h0,
            gravity: NVec3::from(p_cfg.gravity),
            release_delay: p_cfg.release_delay,
            taut_eps: p_cfg.taut_eps,
        };

        // Bob and anchors as nalgebra vectors
        let bob = Bob::new(NVec3::from(cfg.bob.x), NVec3::from(cfg.bob.v), cfg.bob.m)?;
        let anchors: Vec<Anchor> = cfg.anchors.iter().map(|a| Anchor::new(NVec3::from(*a))).collect();

        // Scripted commands
        let commands = cfg
            .commands
            .iter()
            .map(|c| {
                let command = match c.action {
                    ActionConfig::Next => Command::Pivot(PivotRequest::Next),
                    ActionConfig::Attach => {
                        let index = c.anchor.ok_or(SwingError::MissingAnchorIndex(c.at))?;
                        if index >= anchors.len() {
                            return Err(SwingError::AnchorOutOfRange {
                                index,
                                count: anchors.len(),
                            });
                        }
                        Command::Pivot(PivotRequest::Index(index))
                    }
                    ActionConfig::Reset => Command::Reset,
                    ActionConfig::Pause => Command::Pause,
                    ActionConfig::Resume => Command::Resume,
                };
                if !c.at.is_finite() {
                    return Err(SwingError::NonFinite { what: "command time" });
                }
                Ok(TimedCommand { at: c.at, command })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(engine, parameters, bob, anchors, CommandSchedule::new(commands))
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn bob(&self) -> &Bob {
        &self.bob
    }

    /// Bob position, the value a renderer reads every tick
    pub fn position(&self) -> NVec3 {
        self.bob.x
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// Move an anchor between steps; the tether length is kept
    pub fn move_anchor(&mut self, index: usize, x: NVec3) -> Result<()> {
        check_finite(&x, "anchor position")?;
        let count = self.anchors.len();
        let anchor = self
            .anchors
            .get_mut(index)
            .ok_or(SwingError::AnchorOutOfRange { index, count })?;
        anchor.x = x;
        Ok(())
    }

    pub fn attachment(&self) -> AttachmentState {
        self.machine.state()
    }

    pub fn tether(&self) -> Option<Tether> {
        self.machine.tether(&self.anchors)
    }

    pub fn tether_length(&self) -> Option<f64> {
        self.machine.tether_length()
    }

    /// Anchor selected by the pivot policy (target of a pending reattach)
    pub fn pivot_index(&self) -> usize {
        self.machine.pivot_index()
    }

    /// Diagnostics of the last step
    pub fn diagnostics(&self) -> &ForceSample {
        &self.sample
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            debug!(paused, "pause toggled");
        }
        self.paused = paused;
    }

    /// One fixed tick of length `parameters.h0`
    pub fn step(&mut self) -> Result<&ForceSample> {
        let dt = self.parameters.h0;
        self.step_dt(dt)
    }

    /// One tick of length `dt`: integrate, then advance the attachment machine
    ///
    /// A paused scenario does not move and does not advance its release timer.
    pub fn step_dt(&mut self, dt: f64) -> Result<&ForceSample> {
        check_time_step(dt)?;
        if self.paused {
            return Ok(&self.sample);
        }

        let tether = self.machine.tether(&self.anchors);
        self.sample = pendulum_step(
            &mut self.bob,
            tether.as_ref(),
            &self.parameters.gravity,
            self.parameters.taut_eps,
            dt,
        );
        self.t += dt;

        self.machine.advance(dt, &self.bob.x, &self.anchors)?;
        Ok(&self.sample)
    }

    /// Release the current tether; reattaches after `release_delay`
    ///
    /// Returns `Ok(None)` when a reattach is already pending.
    pub fn request_pivot_change(&mut self, request: PivotRequest) -> Result<Option<Transition>> {
        self.machine.request_pivot_change(request, &self.anchors)
    }

    /// Back to the starting position at rest, attached to anchor 0
    pub fn reset(&mut self) -> Result<Transition> {
        // The machine checks the new tether before touching its own state
        let transition = self.machine.reset(&self.start.x, &self.anchors)?;
        self.bob = self.start.clone();
        self.sample = ForceSample::default();
        Ok(transition)
    }

    /// Apply one host command
    pub fn apply(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Pivot(request) => {
                self.request_pivot_change(request)?;
            }
            Command::Reset => {
                self.reset()?;
            }
            Command::Pause => self.set_paused(true),
            Command::Resume => self.set_paused(false),
        }
        Ok(())
    }

    /// One host tick: apply due scripted commands, then step
    pub fn tick(&mut self) -> Result<()> {
        for command in self.schedule.due(self.clock) {
            self.apply(command)?;
        }
        self.step()?;
        self.clock += self.parameters.h0;
        self.ticks += 1;
        Ok(())
    }

    /// Tick until the host clock reaches `parameters.t_end`
    ///
    /// `on_record` sees the initial state and then every `engine.record_every`
    /// ticks. Returns the number of ticks run.
    pub fn run_until<F>(&mut self, mut on_record: F) -> Result<usize>
    where
        F: FnMut(&Scenario),
    {
        let every = self.engine.record_every;
        if every == 0 {
            return Err(SwingError::ZeroRecordStride);
        }
        let start = self.ticks;
        on_record(&*self);

        while self.clock + TIME_SLACK < self.parameters.t_end {
            self.tick()?;
            if self.ticks % every == 0 {
                on_record(&*self);
            }
        }
        Ok(self.ticks - start)
    }

    /// Snapshot for CSV output
    pub fn trace_row(&self) -> TraceRow {
        TraceRow {
            t: self.t,
            x: self.bob.x,
            v: self.bob.v,
            anchor: self.machine.state().anchor(),
            length: self.machine.tether_length(),
            taut: self.sample.is_taut,
            tension: self.sample.tension_force,
            centripetal: self.sample.centripetal_magnitude,
            delta_theta: self.sample.delta_theta,
        }
    }
}

/// One line of the headless trace
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceRow {
    pub t: f64,
    pub x: NVec3,
    pub v: NVec3,
    pub anchor: Option<usize>, // None while detached
    pub length: Option<f64>,
    pub taut: bool,
    pub tension: f64,
    pub centripetal: f64,
    pub delta_theta: f64,
}

impl TraceRow {
    pub const CSV_HEADER: &'static str =
        "t,x,y,z,vx,vy,vz,anchor,length,taut,tension,centripetal,delta_theta";
}

impl fmt::Display for TraceRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let anchor = self.anchor.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string());
        let length = self.length.map(|l| format!("{l:.6}")).unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{:.4},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{},{},{},{:.6},{:.6},{:.3}",
            self.t,
            self.x.x,
            self.x.y,
            self.x.z,
            self.v.x,
            self.v.y,
            self.v.z,
            anchor,
            length,
            self.taut as u8,
            self.tension,
            self.centripetal,
            self.delta_theta,
        )
    }
}
