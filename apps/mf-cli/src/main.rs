use clap::{Parser, Subcommand};
use mf_app::{
    AppResult, ExecutionMode, Metric, MetricsSummary, PerformanceMetrics, StudyConfig,
    load_study, run_nominal, run_study, save_study, write_study_outputs, write_trajectory_csv,
};
use mf_sim::MotorParam;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mf-cli")]
#[command(about = "MotorFlow CLI - PID motor step response and uncertainty studies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default study file
    Init {
        /// Where to write the study YAML
        study_path: PathBuf,
    },
    /// Validate a study file
    Validate {
        /// Path to the study YAML file
        study_path: PathBuf,
    },
    /// Run every sampling strategy of a study
    Run {
        /// Path to the study YAML file
        study_path: PathBuf,
        /// Directory for summary.json, samples.csv and envelope CSVs
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Override the ensemble size
        #[arg(long)]
        samples: Option<usize>,
        /// Override the base seed
        #[arg(long)]
        seed: Option<u64>,
        /// Simulate ensemble members one after another
        #[arg(long)]
        sequential: bool,
    },
    /// Simulate the nominal motor once
    Single {
        /// Study file supplying gains, simulation options and nominal parameters
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output CSV file for the trajectory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    // RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { study_path } => cmd_init(&study_path),
        Commands::Validate { study_path } => cmd_validate(&study_path),
        Commands::Run {
            study_path,
            out,
            samples,
            seed,
            sequential,
        } => cmd_run(&study_path, out.as_deref(), samples, seed, sequential),
        Commands::Single { config, output } => cmd_single(config.as_deref(), output.as_deref()),
    }
}

fn cmd_init(study_path: &Path) -> AppResult<()> {
    let study = StudyConfig::default();
    save_study(study_path, &study)?;
    println!("✓ Wrote default study to {}", study_path.display());
    Ok(())
}

fn cmd_validate(study_path: &Path) -> AppResult<()> {
    println!("Validating study: {}", study_path.display());
    let study = load_study(study_path)?;
    println!("✓ Study is valid");
    println!(
        "  {} ({} samples x {} strategies, seed {})",
        study.name,
        study.n_samples,
        study.strategies.len(),
        study.seed
    );
    Ok(())
}

fn cmd_run(
    study_path: &Path,
    out: Option<&Path>,
    samples: Option<usize>,
    seed: Option<u64>,
    sequential: bool,
) -> AppResult<()> {
    let mut study = load_study(study_path)?;
    if let Some(n) = samples {
        study.n_samples = n;
    }
    if let Some(s) = seed {
        study.seed = s;
    }
    if sequential {
        study.execution = ExecutionMode::Sequential;
    }

    println!("Running study: {}", study.name);
    println!(
        "  {} samples, seed {}, dt = {} s, t_max = {} s",
        study.n_samples, study.seed, study.simulation.dt, study.simulation.t_max
    );

    let started = Instant::now();
    let outcome = run_study(&study)?;
    println!("✓ Study completed in {:.2} s", started.elapsed().as_secs_f64());

    println!();
    println!("Nominal:");
    print_metrics(&outcome.nominal.metrics);

    for s in &outcome.strategies {
        println!();
        println!("{} ({:.2} s):", s.strategy, s.elapsed_s);
        if s.non_finite > 0 {
            println!("  ! {} non-finite trajectories", s.non_finite);
        }
        print_summary(&s.summary);
    }

    if let Some(dir) = out {
        let files = write_study_outputs(dir, &outcome)?;
        println!();
        println!("✓ Wrote {} files to {}", files.len(), dir.display());
    }

    Ok(())
}

fn cmd_single(config: Option<&Path>, output: Option<&Path>) -> AppResult<()> {
    let study = match config {
        Some(path) => load_study(path)?,
        None => StudyConfig::default(),
    };

    let nominal = run_nominal(&study)?;
    println!("Nominal step response ({} samples)", nominal.trajectory.len());
    for p in MotorParam::ALL {
        println!("  {:<3} = {} {}", p.label(), nominal.params.get(p), p.unit());
    }
    print_metrics(&nominal.metrics);

    if let Some(path) = output {
        write_trajectory_csv(path, &nominal.trajectory)?;
        println!("✓ Trajectory written to {}", path.display());
    }

    Ok(())
}

fn print_metrics(metrics: &PerformanceMetrics) {
    for m in Metric::ALL {
        match metrics.get(m) {
            Some(v) => println!("  {:<20} {:>12.6}", m.label(), v),
            None => println!("  {:<20} {:>12}", m.label(), "undefined"),
        }
    }
}

fn print_summary(summary: &MetricsSummary) {
    println!(
        "  {:<20} {:>12} {:>12} {:>8}",
        "metric", "mean", "std", "defined"
    );
    for m in Metric::ALL {
        let stats = summary.get(m);
        println!(
            "  {:<20} {:>12.6} {:>12.6} {:>4}/{}",
            m.label(),
            stats.mean,
            stats.std,
            stats.defined,
            summary.n_samples
        );
    }
}
