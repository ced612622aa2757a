//! dispatch-sweep CLI - Synthetic Dynamic-Dispatch Benchmarks
//!
//! Run and time verification tools over a grid of generated programs.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use dispatch_sweep::generator::{DispatchStyle, TriggerRule};
use dispatch_sweep::results::{self, ResultsDirectory, UNKNOWN_REVISION};
use dispatch_sweep::sweep::{Sweep, SweepConfig, SweepGrid};
use dispatch_sweep::tool::ToolRegistry;
use dispatch_sweep::{Error, Result};

/// Run and time synthetic dynamic dispatch tests
#[derive(Parser, Debug)]
#[command(name = "dispatch-sweep")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Number of dynamic functions (minimum if maximum is provided)
    #[arg(long, default_value = "2")]
    funs: u32,

    /// Maximum number of dynamic functions
    #[arg(long)]
    maxfuns: Option<u32>,

    /// Step between function counts
    #[arg(long, default_value = "1")]
    funstep: u32,

    /// Number of iterations (minimum if maximum is provided)
    #[arg(long = "i", default_value = "10")]
    iterations: u32,

    /// Maximum number of iterations
    #[arg(long = "maxi")]
    max_iterations: Option<u32>,

    /// Step between iteration counts
    #[arg(long = "istep", default_value = "1")]
    iteration_step: u32,

    /// Tools to run on each program, in order (comma-separated)
    #[arg(long, default_value = "rmc,smack", value_delimiter = ',')]
    tools: Vec<String>,

    /// JSON file with additional or replacement tool definitions
    #[arg(long)]
    tool_config: Option<PathBuf>,

    /// Kill a tool after this many seconds and abort the sweep
    #[arg(long)]
    timeout: Option<u64>,

    /// Directory in which the results directory is created
    #[arg(long, default_value = ".")]
    output_root: PathBuf,

    /// Source revision for the results directory name (default: git HEAD)
    #[arg(long)]
    revision: Option<String>,

    /// Dispatch style of generated programs (reference, boxed, static)
    #[arg(long, default_value = "reference")]
    dispatch: String,

    /// Use the earlier trigger rule without the final-iteration override
    #[arg(long)]
    descending_triggers: bool,

    /// Write programs without running any tool
    #[arg(long)]
    generate_only: bool,

    /// Show a progress bar
    #[arg(long)]
    progress: bool,
}

impl Cli {
    fn grid(&self) -> Result<SweepGrid> {
        SweepGrid::from_bounds(
            self.iterations,
            self.max_iterations,
            self.iteration_step,
            self.funs,
            self.maxfuns,
            self.funstep,
        )
    }

    fn dispatch_style(&self) -> Result<DispatchStyle> {
        DispatchStyle::parse(&self.dispatch).ok_or_else(|| {
            Error::Configuration(format!(
                "unknown dispatch style '{}' (expected reference, boxed or static)",
                self.dispatch
            ))
        })
    }

    fn registry(&self) -> Result<ToolRegistry> {
        let mut registry = ToolRegistry::builtin();
        if let Some(path) = &self.tool_config {
            registry.load_json(path)?;
        }
        let names: Vec<&str> = self
            .tools
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        registry.select(names.as_slice())
    }

    fn revision(&self) -> String {
        if let Some(rev) = &self.revision {
            return rev.clone();
        }
        results::current_revision().unwrap_or_else(|e| {
            warn!("{e}; using '{UNKNOWN_REVISION}'");
            UNKNOWN_REVISION.to_string()
        })
    }
}

fn run(cli: &Cli) -> Result<()> {
    // Everything the sweep depends on is validated before touching disk
    let grid = cli.grid()?;
    let dispatch = cli.dispatch_style()?;
    let tools = cli.registry()?;

    let rule = if cli.descending_triggers {
        TriggerRule::Descending
    } else {
        TriggerRule::FinalIteration
    };
    let config = SweepConfig::new(grid)
        .dispatch(dispatch)
        .rule(rule)
        .timeout(cli.timeout.map(Duration::from_secs))
        .generate_only(cli.generate_only)
        .show_progress(cli.progress);

    let dir = ResultsDirectory::create(&cli.output_root, &Local::now(), &cli.revision())?;
    info!("Writing results to: {}", dir.path().display());

    let sweep = Sweep::with_process_runner(config, tools);
    let summary = sweep.run(&dir)?;

    info!(
        cells = summary.cells,
        invocations = summary.invocations,
        "Sweep finished; total tool time {:.1} seconds, results in {}",
        summary.tool_time.as_secs_f64(),
        summary.results.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
