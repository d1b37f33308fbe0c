mod error;

use clap::{Args, Parser, Subcommand, ValueEnum};
use co_model::{InterfaceType, Model};
use co_reference::{CoSimulationFlavor, MODEL_NAMES, model_by_name};
use co_results::{
    RunManifest, RunStore, read_input_csv_file, write_trajectory_csv, write_trajectory_csv_file,
};
use co_sim::{Recorder, SimOptions, SolverKind, StartValue, simulate_with_progress};
use error::{CliError, CliResult};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "co-cli")]
#[command(about = "Co-simulation master for the bundled reference models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available models
    List,
    /// Show variables and default experiment of a model
    Info {
        /// Model name (see `list`)
        model: String,
    },
    /// Run a simulation
    Simulate(SimulateArgs),
    /// List stored runs of a model
    Runs {
        /// Run store directory
        store_dir: PathBuf,
        /// Model name
        model: String,
    },
    /// Show details of a stored run
    ShowRun {
        /// Run store directory
        store_dir: PathBuf,
        /// Run ID to display
        run_id: String,
        /// Export the stored trajectory as CSV
        #[arg(long)]
        output_file: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Interface {
    Me,
    Cs,
}

#[derive(Clone, Copy, ValueEnum)]
enum Solver {
    Euler,
    Bdf,
}

#[derive(Args)]
struct SimulateArgs {
    /// Model name (see `list`)
    model: String,
    /// Interface to simulate
    #[arg(long, value_enum)]
    interface: Option<Interface>,
    /// Mimic the legacy co-simulation interface (discard on termination)
    #[arg(long)]
    legacy: bool,
    /// Solver for Model Exchange
    #[arg(long, value_enum)]
    solver: Option<Solver>,
    #[arg(long)]
    start_time: Option<f64>,
    #[arg(long)]
    stop_time: Option<f64>,
    /// Fixed step size of the Euler solver
    #[arg(long)]
    step_size: Option<f64>,
    #[arg(long)]
    output_interval: Option<f64>,
    #[arg(long)]
    relative_tolerance: Option<f64>,
    /// Wall-clock timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,
    /// Start value as name=value (repeatable)
    #[arg(long = "start-value", value_name = "NAME=VALUE")]
    start_values: Vec<String>,
    /// Variable to record (repeatable)
    #[arg(long = "output", value_name = "NAME")]
    outputs: Vec<String>,
    /// Input table CSV (first column time)
    #[arg(long)]
    input: Option<PathBuf>,
    /// YAML experiment file, overridden by the flags above
    #[arg(long)]
    experiment: Option<PathBuf>,
    /// Allow the instance to return early from a step
    #[arg(long)]
    early_return: bool,
    /// Handle co-simulation events in event mode
    #[arg(long)]
    event_mode: bool,
    /// Record only on the output grid
    #[arg(long)]
    no_record_events: bool,
    /// Log every call into the instance at debug level
    #[arg(long)]
    log_calls: bool,
    /// Write the trajectory to a CSV file instead of stdout
    #[arg(long)]
    output_file: Option<PathBuf>,
    /// Save the run to this store directory
    #[arg(long)]
    store: Option<PathBuf>,
    /// Show a progress line on stderr
    #[arg(long)]
    progress: bool,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => cmd_list(),
        Commands::Info { model } => cmd_info(&model),
        Commands::Simulate(args) => cmd_simulate(&args),
        Commands::Runs { store_dir, model } => cmd_runs(&store_dir, &model),
        Commands::ShowRun {
            store_dir,
            run_id,
            output_file,
        } => cmd_show_run(&store_dir, &run_id, output_file.as_deref()),
    }
}

fn cmd_list() -> CliResult<()> {
    for name in MODEL_NAMES {
        let model = model_by_name(name, CoSimulationFlavor::Modern)?;
        match &model.description().description {
            Some(text) => println!("  {name} - {text}"),
            None => println!("  {name}"),
        }
    }
    Ok(())
}

fn cmd_info(name: &str) -> CliResult<()> {
    let model = model_by_name(name, CoSimulationFlavor::Modern)?;
    let description = model.description();

    println!("Model: {}", description.model_name);
    if let Some(text) = &description.description {
        println!("  {text}");
    }
    let mut interfaces = Vec::new();
    if description.model_exchange {
        interfaces.push("Model Exchange");
    }
    if description.co_simulation.is_some() {
        interfaces.push("Co-Simulation");
    }
    println!("  Interfaces: {}", interfaces.join(", "));
    println!("  Continuous states: {}", description.number_of_continuous_states);
    println!("  Event indicators: {}", description.number_of_event_indicators);

    if let Some(experiment) = &description.default_experiment {
        println!("\nDefault experiment:");
        let fields = [
            ("start time", experiment.start_time),
            ("stop time", experiment.stop_time),
            ("tolerance", experiment.tolerance),
            ("step size", experiment.step_size),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                println!("  {label}: {value}");
            }
        }
    }

    println!("\nVariables:");
    println!(
        "  {:<28} {:>4}  {:<8} {:<20} {:<11} {:<10} {}",
        "name", "vr", "type", "causality", "variability", "start", "unit"
    );
    for v in &description.variables {
        let start = v.start.as_ref().map(|s| s.to_string()).unwrap_or_default();
        println!(
            "  {:<28} {:>4}  {:<8} {:<20} {:<11} {:<10} {}",
            v.name,
            v.value_reference.get(),
            v.variable_type.name(),
            format!("{:?}", v.causality),
            format!("{:?}", v.variability),
            start,
            v.unit.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn load_experiment(path: &Path) -> CliResult<SimOptions> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::ExperimentRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| CliError::ExperimentParse {
        path: path.to_path_buf(),
        source,
    })
}

fn build_options(args: &SimulateArgs) -> CliResult<SimOptions> {
    let mut options = match &args.experiment {
        Some(path) => load_experiment(path)?,
        None => SimOptions::default(),
    };

    if let Some(interface) = args.interface {
        options.interface = match interface {
            Interface::Me => InterfaceType::ModelExchange,
            Interface::Cs => InterfaceType::CoSimulation,
        };
    }
    if let Some(solver) = args.solver {
        options.solver = match solver {
            Solver::Euler => SolverKind::Euler,
            Solver::Bdf => SolverKind::Bdf,
        };
    }
    options.start_time = args.start_time.or(options.start_time);
    options.stop_time = args.stop_time.or(options.stop_time);
    options.step_size = args.step_size.or(options.step_size);
    options.output_interval = args.output_interval.or(options.output_interval);
    options.relative_tolerance = args.relative_tolerance.or(options.relative_tolerance);
    options.timeout = args.timeout.or(options.timeout);

    for assignment in &args.start_values {
        let (name, value) = assignment.split_once('=').ok_or_else(|| {
            CliError::InvalidArgument(format!("expected NAME=VALUE, got '{assignment}'"))
        })?;
        options
            .start_values
            .insert(name.trim().to_string(), StartValue::parse(value));
    }
    if !args.outputs.is_empty() {
        options.output = Some(args.outputs.clone());
    }
    if let Some(path) = &args.input {
        options.input = Some(read_input_csv_file(path)?);
    }

    options.early_return_allowed |= args.early_return;
    options.use_event_mode |= args.event_mode;
    options.log_calls |= args.log_calls;
    if args.no_record_events {
        options.record_events = false;
    }
    Ok(options)
}

fn cmd_simulate(args: &SimulateArgs) -> CliResult<()> {
    let flavor = if args.legacy {
        CoSimulationFlavor::Legacy
    } else {
        CoSimulationFlavor::Modern
    };
    let model = model_by_name(&args.model, flavor)?;
    let options = build_options(args)?;

    let stop_time = options
        .stop_time
        .or_else(|| model.description().default_experiment.and_then(|e| e.stop_time));
    let mut last_emit = Instant::now();
    let mut progress = |time: f64, recorder: &Recorder| {
        if last_emit.elapsed().as_millis() >= 100 {
            render_progress(time, stop_time, recorder);
            last_emit = Instant::now();
        }
        true
    };
    let step_finished: Option<co_sim::StepFinished<'_>> = if args.progress {
        Some(&mut progress)
    } else {
        None
    };

    let started = Instant::now();
    let outcome = simulate_with_progress(model.as_ref(), &options, step_finished)?;
    if args.progress {
        clear_progress_line();
    }
    info!(
        model = %args.model,
        reason = ?outcome.stop_reason,
        rows = outcome.trajectory.len(),
        elapsed_s = started.elapsed().as_secs_f64(),
        "simulation finished"
    );

    match &args.output_file {
        Some(path) => {
            write_trajectory_csv_file(&outcome.trajectory, path)?;
            eprintln!(
                "✓ Wrote {} rows to {} ({:?} at t={})",
                outcome.trajectory.len(),
                path.display(),
                outcome.stop_reason,
                outcome.time
            );
        }
        None => write_trajectory_csv(&outcome.trajectory, io::stdout().lock())?,
    }

    if let Some(dir) = &args.store {
        let store = RunStore::new(dir)?;
        let manifest = RunManifest::from_outcome(&args.model, &options, &outcome);
        store.save_run(&manifest, &outcome.trajectory)?;
        eprintln!("✓ Saved run: {}", manifest.run_id);
    }

    Ok(())
}

fn clear_progress_line() {
    eprint!("\r{}\r", " ".repeat(80));
    let _ = io::stderr().flush();
}

fn render_progress(time: f64, stop_time: Option<f64>, recorder: &Recorder) {
    let rows = recorder.trajectory().len();
    match stop_time {
        Some(stop) if stop > 0.0 => {
            let fraction = (time / stop).clamp(0.0, 1.0);
            let width = 28usize;
            let filled = ((fraction * width as f64).round() as usize).min(width);
            eprint!(
                "\r[{}{}] {:>6.2}%  t={:.3}/{:.3}  rows={}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled)),
                fraction * 100.0,
                time,
                stop,
                rows
            );
        }
        _ => eprint!("\rt={time:.3}  rows={rows}"),
    }
    let _ = io::stderr().flush();
}

fn cmd_runs(store_dir: &Path, model: &str) -> CliResult<()> {
    let store = RunStore::new(store_dir)?;
    let runs = store.list_runs(model)?;

    if runs.is_empty() {
        println!("No stored runs found for model: {}", model);
    } else {
        println!("Stored runs for model '{}':", model);
        for manifest in runs {
            println!(
                "  {} ({}, {:?}, {} rows)",
                manifest.run_id, manifest.timestamp, manifest.stop_reason, manifest.rows
            );
        }
    }
    Ok(())
}

fn cmd_show_run(store_dir: &Path, run_id: &str, output_file: Option<&Path>) -> CliResult<()> {
    let store = RunStore::new(store_dir)?;
    let manifest = store.load_manifest(run_id)?;
    let trajectory = store.load_trajectory(run_id)?;

    println!("Run {}", manifest.run_id);
    println!("  Model: {}", manifest.model_name);
    println!("  Saved: {}", manifest.timestamp);
    println!("  Interface: {:?}", manifest.options.interface);
    println!("  Stopped: {:?} at t={}", manifest.stop_reason, manifest.final_time);
    println!("  Steps: {}", manifest.stats.steps);
    println!("  Events: {}", manifest.stats.events);
    println!("  Wall time: {:.3}s", manifest.stats.wall_time_s);
    println!("  Rows: {}", trajectory.len());
    if let (Some(first), Some(last)) = (trajectory.time.first(), trajectory.time.last()) {
        println!("  Time range: {first} - {last}");
    }
    println!("\nVariables:");
    for (name, ty) in manifest.names.iter().zip(&manifest.types) {
        println!("  {} ({})", name, ty.name());
    }

    if let Some(path) = output_file {
        write_trajectory_csv_file(&trajectory, path)?;
        println!(
            "\n✓ Exported {} rows to {}",
            trajectory.len(),
            path.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> SimulateArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Simulate(args) => args,
            _ => panic!("expected simulate"),
        }
    }

    #[test]
    fn flags_override_defaults() {
        let args = parse(&[
            "co-cli",
            "simulate",
            "BouncingBall",
            "--interface",
            "cs",
            "--stop-time",
            "2.5",
            "--start-value",
            "e=0.5",
            "--output",
            "h",
            "--event-mode",
        ]);
        let options = build_options(&args).unwrap();
        assert_eq!(options.interface, InterfaceType::CoSimulation);
        assert_eq!(options.stop_time, Some(2.5));
        assert_eq!(options.start_values.get("e"), Some(&StartValue::Real(0.5)));
        assert_eq!(options.output, Some(vec!["h".to_string()]));
        assert!(options.use_event_mode);
        assert!(options.record_events);
    }

    #[test]
    fn start_value_needs_assignment() {
        let args = parse(&["co-cli", "simulate", "Stair", "--start-value", "counter"]);
        assert!(matches!(
            build_options(&args),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn experiment_file_is_overridden_by_flags() {
        let dir = std::env::temp_dir().join("co_cli_experiment_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("experiment.yaml");
        std::fs::write(
            &path,
            "solver: euler\nstop_time: 4.0\nstep_size: 0.01\nrecord_events: false\n",
        )
        .unwrap();

        let args = parse(&[
            "co-cli",
            "simulate",
            "Dahlquist",
            "--experiment",
            path.to_str().unwrap(),
            "--stop-time",
            "2",
        ]);
        let options = build_options(&args).unwrap();
        assert_eq!(options.solver, SolverKind::Euler);
        assert_eq!(options.stop_time, Some(2.0));
        assert_eq!(options.step_size, Some(0.01));
        assert!(!options.record_events);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
