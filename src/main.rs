//! Cell Energy Sim - Entry point
//!
//! Runs a stochastic trial ensemble (or a single deterministic reference run)
//! and writes the result tables to a timestamped export directory.
//!
//! CLI Usage:
//!   cargo run --release                         # 300 trials with default parameters
//!   cargo run --release -- -n 50 -s 7           # 50 trials, seed 7
//!   cargo run --release -- --reference          # One noise-free run, asymptotic fit allowed
//!   cargo run --release -- -c params.json -o out

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use cell_energy_sim::{
    config::Parameters,
    export::{timestamped_dir, write_run_manifest, write_table_csv, RunManifest},
    state::{Species, Table},
    trials::{run_reference, TrialRunner},
};

struct CliArgs {
    reference: bool,
    repeats: Option<usize>,
    seed: Option<u64>,
    config: Option<PathBuf>,
    out_dir: PathBuf,
    sequential: bool,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        reference: false,
        repeats: None,
        seed: None,
        config: None,
        out_dir: PathBuf::from("exports"),
        sequential: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--reference" | "-r" => cli.reference = true,
            "--sequential" => cli.sequential = true,
            "-n" | "--repeats" => {
                i += 1;
                if i < args.len() {
                    cli.repeats = args[i].parse().ok();
                }
            }
            "-s" | "--seed" => {
                i += 1;
                if i < args.len() {
                    cli.seed = args[i].parse().ok();
                }
            }
            "-c" | "--config" => {
                i += 1;
                if i < args.len() {
                    cli.config = Some(PathBuf::from(&args[i]));
                }
            }
            "-o" | "--out" => {
                i += 1;
                if i < args.len() {
                    cli.out_dir = PathBuf::from(&args[i]);
                }
            }
            "--help" | "-h" => {
                println!("Cell Energy Sim");
                println!();
                println!("Usage: cell-energy-sim [OPTIONS]");
                println!();
                println!("Options:");
                println!("  --reference, -r    Single noise-free run with the configured constants");
                println!("  -n, --repeats N    Number of trials (default: 300)");
                println!("  -s, --seed S       Base RNG seed (default: 0)");
                println!("  -c, --config FILE  JSON parameter file (default: params.json if present)");
                println!("  -o, --out DIR      Export directory (default: exports)");
                println!("  --sequential       Run trials on one thread");
                println!("  --help, -h         Show this help");
                std::process::exit(0);
            }
            other => log::warn!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    cli
}

fn run_reference_mode(params: &Parameters, out_dir: &Path) -> Result<()> {
    println!("=== Cell Energy Sim - Reference Run ===\n");
    let run = run_reference(params)?;

    println!("Fit model: {}", run.curve.outcome.model().name());
    match run.curve.outcome.fitted_k() {
        Some(k) => println!("Fitted k:  {:.5} /min", k),
        None => println!("Fitted k:  n/a (flat normalization)"),
    }
    println!("AUC:       {:.6}", run.auc);

    let dir = timestamped_dir(out_dir)?;

    let mut trajectory = Table::new(
        std::iter::once("time".to_string())
            .chain(Species::ALL.iter().map(|s| s.name().to_string())),
    );
    for (t, state) in run.chain.combined.times().iter().zip(run.chain.combined.states()) {
        let mut row = vec![*t];
        row.extend_from_slice(&state.to_array());
        trajectory.push_row(row);
    }
    write_table_csv(&trajectory, dir.join("trajectory.csv"))?;

    let mut curve = Table::new(["time", "raw", "reference", "normalized"]);
    for i in 0..run.curve.values.len() {
        curve.push_row(vec![
            run.curve.times_min[i],
            run.raw[i],
            run.curve.reference[i],
            run.curve.values[i],
        ]);
    }
    write_table_csv(&curve, dir.join("response.csv"))?;

    println!("\nExported to {}", dir.display());
    Ok(())
}

fn run_ensemble_mode(params: Parameters, out_dir: &Path) -> Result<()> {
    println!("=== Cell Energy Sim - Trial Ensemble ===\n");
    let runner = TrialRunner::new(params)?;

    let start = Instant::now();
    let ensemble = runner.run();
    let elapsed = start.elapsed();

    let summary = ensemble.summary();
    summary.print_summary();
    println!("  Elapsed:   {:.2?}", elapsed);

    let dir = timestamped_dir(out_dir)?;
    write_table_csv(&ensemble.summary_table(), dir.join("summary.csv"))?;
    write_table_csv(&ensemble.raw_table(), dir.join("raw_traces.csv"))?;
    write_table_csv(&ensemble.normalized_table(), dir.join("normalized_traces.csv"))?;
    write_run_manifest(&RunManifest::new(runner.params(), &ensemble), dir.join("manifest.json"))?;

    println!("\nExported to {}", dir.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = parse_args();

    // An explicit config must load; the implicit one falls back to defaults
    let mut params = match &cli.config {
        Some(path) => Parameters::from_json_file(path)?,
        None => Parameters::load_or_default("params.json"),
    };
    if let Some(repeats) = cli.repeats {
        params.trials.repeats = repeats;
    }
    if let Some(seed) = cli.seed {
        params.trials.seed = seed;
    }
    if cli.sequential {
        params.trials.parallel = false;
    }

    log::info!("Cell Energy Sim starting...");

    if cli.reference {
        run_reference_mode(&params, &cli.out_dir)
    } else {
        run_ensemble_mode(params, &cli.out_dir)
    }
}
