use std::thread;
use std::time::Instant;

use crate::error::Result;
use crate::simulation::attachment::PivotRequest;
use crate::simulation::engine::Engine;
use crate::simulation::params::Parameters;
use crate::simulation::scenario::Scenario;
use crate::simulation::schedule::CommandSchedule;
use crate::simulation::states::{Anchor, Bob, NVec3};

/// Deterministic anchor row, 4 units apart along x
fn make_anchors(count: usize) -> Vec<Anchor> {
    (0..count)
        .map(|i| Anchor::new(NVec3::new(4.0 * i as f64, (i as f64 * 0.37).sin(), 0.0)))
        .collect()
}

/// Helper to build the `i`-th independent scenario
fn make_scenario(i: usize) -> Result<Scenario> {
    let i_f = i as f64;
    // deterministic start positions, no rand needed
    let x = NVec3::new((i_f * 0.37).sin() * 2.0, -3.0, (i_f * 0.13).cos());
    let bob = Bob::new(x, NVec3::zeros(), 1.0)?;

    let params = Parameters {
        t_end: 100.0,
        h0: 0.02,
        release_delay: 0.5,
        ..Parameters::default()
    };

    Scenario::new(Engine::default(), params, bob, make_anchors(4), CommandSchedule::default())
}

/// Step `sc` for `steps` ticks, swinging to the next anchor every 100 ticks
fn drive(sc: &mut Scenario, steps: usize) -> Result<()> {
    for k in 0..steps {
        if k % 100 == 0 {
            sc.request_pivot_change(PivotRequest::Next)?;
        }
        sc.step()?;
    }
    Ok(())
}

/// Time a single scenario over increasing step counts
pub fn bench_step() -> Result<()> {
    let counts = [1_000, 10_000, 100_000, 1_000_000];

    for steps in counts {
        let mut sc = make_scenario(0)?;

        // Warm up
        drive(&mut sc, 100)?;

        let t0 = Instant::now();
        drive(&mut sc, steps)?;
        let elapsed = t0.elapsed().as_secs_f64();

        println!(
            "steps = {steps:8}, total = {:8.6} s, per step = {:8.3} ns",
            elapsed,
            elapsed * 1e9 / steps as f64
        );
    }
    Ok(())
}

/// Per-tick cost of stepping `n` independent scenarios in sequence
/// Paste output directly into excel to graph
pub fn bench_step_curve() -> Result<()> {
    println!("N,ms_per_tick");

    let ticks = 200;
    for n in (100..=5000).step_by(100) {
        let mut scenarios = (0..n).map(make_scenario).collect::<Result<Vec<_>>>()?;

        let t0 = Instant::now();
        for _ in 0..ticks {
            for sc in scenarios.iter_mut() {
                drive(sc, 1)?;
            }
        }
        let ms = t0.elapsed().as_secs_f64() * 1000.0 / ticks as f64;

        println!("{},{:.6}", n, ms);
    }
    Ok(())
}

/// Shard independent scenarios across worker threads, one owner per scenario
pub fn bench_threads() -> Result<()> {
    let n = 4096;
    let steps = 1_000;
    let workers = thread::available_parallelism().map(|p| p.get()).unwrap_or(1);

    let mut thread_counts: Vec<usize> = [1, 2, 4, workers].into_iter().filter(|t| *t <= workers).collect();
    thread_counts.dedup();

    for threads in thread_counts {
        let mut scenarios = (0..n).map(make_scenario).collect::<Result<Vec<_>>>()?;
        let chunk = n.div_ceil(threads);

        let t0 = Instant::now();
        thread::scope(|s| -> Result<()> {
            let handles: Vec<_> = scenarios
                .chunks_mut(chunk)
                .map(|shard| {
                    s.spawn(move || -> Result<()> {
                        for sc in shard.iter_mut() {
                            drive(sc, steps)?;
                        }
                        Ok(())
                    })
                })
                .collect();
            for h in handles {
                // a panicking worker is a bug in the stepper, surface it
                match h.join() {
                    Ok(res) => res?,
                    Err(payload) => std::panic::resume_unwind(payload),
                }
            }
            Ok(())
        })?;
        let elapsed = t0.elapsed().as_secs_f64();

        println!("threads = {threads:2}, N = {n}, steps = {steps}, total = {elapsed:8.6} s");
    }
    Ok(())
}
