use swingsim::{Scenario, ScenarioConfig, TraceRow};
use swingsim::{bench_step, bench_step_curve, bench_threads};

use clap::Parser;
use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Tethered swing simulation")]
struct Args {
    /// Scenario file: a path, or a name under `scenarios/`
    #[arg(short, long, default_value = "web_swing.yaml")]
    file_name: String,

    /// Open the viewer regardless of the scenario's engine setting
    #[arg(long)]
    viewer: bool,

    /// Run the stepping benchmarks instead of a scenario
    #[arg(long)]
    bench: bool,
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let direct = PathBuf::from(file_name);
    let config_path = if direct.is_file() {
        direct
    } else {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name)
    };

    let file = File::open(&config_path)
        .with_context(|| format!("failed to open scenario {}", config_path.display()))?;
    let reader = BufReader::new(file);
    let scenario_cfg: ScenarioConfig = serde_yaml::from_reader(reader)
        .with_context(|| format!("failed to parse scenario {}", config_path.display()))?;

    Ok(scenario_cfg)
}

/// Headless run: CSV trace on stdout
fn run_headless(mut scenario: Scenario) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    writeln!(out, "{}", TraceRow::CSV_HEADER)?;

    let mut write_err = None;
    let ticks = scenario.run_until(|sc| {
        if write_err.is_none() {
            if let Err(e) = writeln!(out, "{}", sc.trace_row()) {
                write_err = Some(e);
            }
        }
    })?;
    if let Some(e) = write_err {
        return Err(e.into());
    }
    out.flush()?;

    info!(ticks, t = scenario.time(), "headless run finished");
    Ok(())
}

#[cfg(feature = "viewer")]
fn run_viewer(scenario: Scenario) -> Result<()> {
    swingsim::run_3d(scenario);
    Ok(())
}

#[cfg(not(feature = "viewer"))]
fn run_viewer(_scenario: Scenario) -> Result<()> {
    anyhow::bail!("built without the `viewer` feature")
}

fn main() -> Result<()> {
    // stderr so stdout stays a clean CSV trace
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if args.bench {
        bench_step()?;
        bench_threads()?;
        bench_step_curve()?;
        return Ok(());
    }

    let scenario_cfg = load_scenario_from_yaml(&args.file_name)?;
    let scenario = Scenario::build_scenario(scenario_cfg)?;

    if args.viewer || scenario.engine.viewer {
        run_viewer(scenario)
    } else {
        run_headless(scenario)
    }
}
