use tarasim::{bench_forces, bench_steps};
use tarasim::{IntegratorKind, MemoryHistory, PositionSink, Scenario, ScenarioConfig, StreamSink};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Integrates the equations of motion for a small-N system described by a
/// scenario file. Positions go to stdout, diagnostics to stderr.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Scenario file; a bare name is looked up in the crate's scenarios/ directory
    #[arg(short, default_value = "two_body.yaml")]
    file_name: String,

    /// The integration timestep
    #[arg(long)]
    dt: Option<f64>,

    /// The system time when starting integration
    #[arg(long)]
    t_start: Option<f64>,

    /// The system time when stopping integration
    #[arg(long)]
    t_end: Option<f64>,

    /// Write-out interval
    #[arg(short, long)]
    output_interval: Option<f64>,

    /// Softening length
    #[arg(short, long)]
    epsilon: Option<f64>,

    /// Opening tolerance for the tree force calculation
    #[arg(long)]
    tolerance: Option<f64>,

    /// Integrator: leapfrog or position_verlet
    #[arg(short, long)]
    integrator: Option<IntegratorKind>,

    /// Write body positions to stdout
    #[arg(short = 's', long)]
    output: bool,

    /// Use direct summation instead of the Barnes–Hut tree
    #[arg(long)]
    no_tree: bool,

    /// Print the history log to stderr at the end of the run
    #[arg(long)]
    history: bool,

    /// Run the direct vs tree benchmarks instead of a scenario
    #[arg(long)]
    bench: bool,
}

// load here to keep main clean
fn load_scenario(file_name: &str) -> Result<ScenarioConfig> {
    let direct = PathBuf::from(file_name);
    let config_path = if direct.exists() {
        direct
    } else {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name)
    };
    ScenarioConfig::load(&config_path)
        .with_context(|| format!("failed to load scenario {}", config_path.display()))
}

fn apply_overrides(scenario: &mut Scenario, args: &Args) {
    let p = &mut scenario.parameters;
    if let Some(dt) = args.dt { p.dt = dt; }
    if let Some(t) = args.t_start { p.t_start = t; }
    if let Some(t) = args.t_end { p.t_end = t; }
    if let Some(o) = args.output_interval { p.output_interval = o; }
    if let Some(e) = args.epsilon { p.eps = e; }

    let e = &mut scenario.engine;
    if let Some(tol) = args.tolerance { e.theta = tol; }
    if let Some(kind) = args.integrator { e.integrator = kind; }
    if args.no_tree {
        e.barnes_hut = false;
        info!("tree disabled");
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.bench {
        bench_forces(&[200, 400, 800, 1600, 3200, 6400])?;
        bench_steps(&[200, 400, 800, 1600, 3200])?;
        return Ok(());
    }

    let cfg = load_scenario(&args.file_name)?;
    let mut scenario = Scenario::build_scenario(&cfg).context("invalid scenario")?;
    apply_overrides(&mut scenario, &args);

    let mut history = MemoryHistory::new();
    let summary = {
        let mut sim = scenario.into_simulation()?;
        sim.attach_history(&mut history);
        sim.add_to_history(&format!(
            "accessed by tarasim ({} forces, {} integrator)",
            sim.force_model(),
            sim.integrator()
        ))?;

        let stdout = io::stdout();
        let mut sink = StreamSink::new(BufWriter::new(stdout.lock()));
        let summary = if args.output {
            info!("outputting data");
            sim.run(Some(&mut sink as &mut dyn PositionSink))?
        } else {
            sim.run(None)?
        };
        sink.into_inner().flush()?;

        sim.add_to_history(&format!(
            "integrated {} steps to t = {}, energy drift {:e}",
            summary.steps,
            summary.final_time,
            summary.energy_drift()
        ))?;
        summary
    };

    eprintln!("START energy: {}", summary.start.total());
    eprintln!("END energy: {}", summary.end.total());

    if args.history {
        for entry in history.entries() {
            eprintln!("history: {entry}");
        }
    }

    Ok(())
}
