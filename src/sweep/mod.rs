//! Sweep orchestration
//!
//! For every grid cell: synthesize the program, write it to the results
//! directory, then run each configured tool in order, timing it and
//! checking its log for the tool's failure marker before appending a row
//! to the results table.
//!
//! Everything runs on the calling thread; one external process at a time.
//! A missing marker aborts the sweep. Rows written before the abort stay
//! in `results.csv`.

mod grid;

pub use grid::{ParamRange, SweepGrid};

use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info};

use crate::generator::{
    DispatchStyle, GenerationParameters, Renderer, RustRenderer, Synthesizer, TriggerRule,
};
use crate::results::{ResultRow, ResultsDirectory, ResultsTable, ToolInvocationResult};
use crate::tool::{ProcessRunner, ToolRegistry, ToolRunner, ToolSpec};
use crate::{Error, Result};

/// Configuration for a sweep
#[derive(Debug, Clone, Default)]
pub struct SweepConfig {
    /// Parameter grid
    pub grid: SweepGrid,
    /// Trigger rule for generated programs
    pub rule: TriggerRule,
    /// Dispatch style for generated programs
    pub dispatch: DispatchStyle,
    /// Per-invocation timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Write programs without launching tools
    pub generate_only: bool,
    /// Show progress bar
    pub show_progress: bool,
}

impl SweepConfig {
    /// Configuration for the given grid with defaults elsewhere
    #[must_use]
    pub fn new(grid: SweepGrid) -> Self {
        Self {
            grid,
            ..Self::default()
        }
    }

    /// Set the dispatch style
    #[must_use]
    pub fn dispatch(mut self, style: DispatchStyle) -> Self {
        self.dispatch = style;
        self
    }

    /// Set the trigger rule
    #[must_use]
    pub fn rule(mut self, rule: TriggerRule) -> Self {
        self.rule = rule;
        self
    }

    /// Set the per-invocation timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Only generate programs
    #[must_use]
    pub fn generate_only(mut self, generate_only: bool) -> Self {
        self.generate_only = generate_only;
        self
    }

    /// Enable or disable the progress bar
    #[must_use]
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }
}

/// Totals of a completed sweep
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepSummary {
    /// Grid cells processed
    pub cells: usize,
    /// Tool invocations recorded in the results table
    pub invocations: usize,
    /// Sum of measured tool time
    pub tool_time: Duration,
    /// Results table path
    pub results: PathBuf,
}

/// Grid sweep over a set of tools
#[derive(Debug)]
pub struct Sweep<R> {
    config: SweepConfig,
    tools: ToolRegistry,
    runner: R,
    synthesizer: Synthesizer,
}

impl Sweep<ProcessRunner> {
    /// Sweep launching real subprocesses, honouring `config.timeout`
    #[must_use]
    pub fn with_process_runner(config: SweepConfig, tools: ToolRegistry) -> Self {
        let runner = ProcessRunner::new().with_timeout(config.timeout);
        Self::new(config, tools, runner)
    }
}

impl<R: ToolRunner> Sweep<R> {
    /// Sweep with an explicit runner
    #[must_use]
    pub fn new(config: SweepConfig, tools: ToolRegistry, runner: R) -> Self {
        let synthesizer = Synthesizer::new()
            .with_rule(config.rule)
            .with_style(config.dispatch);
        Self {
            config,
            tools,
            runner,
            synthesizer,
        }
    }

    /// Sweep configuration
    #[must_use]
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Tools run per cell, in order
    #[must_use]
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run the whole grid, writing artifacts into `dir`
    ///
    /// # Errors
    ///
    /// Stops at the first error: a generation failure, an I/O error, a tool
    /// that cannot be launched or times out, or a log without its marker.
    pub fn run(&self, dir: &ResultsDirectory) -> Result<SweepSummary> {
        if self.tools.is_empty() && !self.config.generate_only {
            return Err(Error::Configuration("no tools configured".into()));
        }

        let table = ResultsTable::create(dir.results_path())?;
        let mut summary = SweepSummary {
            results: table.path().to_path_buf(),
            ..SweepSummary::default()
        };

        let progress = self.progress_bar();

        for params in self.config.grid.cells() {
            let program_file = self.write_program(dir, params)?;
            summary.cells += 1;

            if self.config.generate_only {
                for spec in self.tools.tools() {
                    spec.prepare(dir.path(), &program_file, params)?;
                }
                if let Some(pb) = &progress {
                    pb.inc(1);
                }
                continue;
            }

            for spec in self.tools.tools() {
                if let Some(pb) = &progress {
                    pb.set_message(format!("{} {}", spec.name, params.test_id()));
                }
                let result = self.invoke(dir, spec, &program_file, params)?;
                table.append(&ResultRow::from(&result))?;
                summary.invocations += 1;
                summary.tool_time += Duration::from_secs_f64(result.elapsed_seconds);
                if let Some(pb) = &progress {
                    pb.inc(1);
                }
            }
        }

        if let Some(pb) = &progress {
            pb.finish_with_message("Sweep complete");
        }

        Ok(summary)
    }

    /// Synthesize the cell's program and write it under `dir`
    ///
    /// # Errors
    ///
    /// Returns an error if synthesis fails or the file cannot be written.
    pub fn write_program(
        &self,
        dir: &ResultsDirectory,
        params: GenerationParameters,
    ) -> Result<PathBuf> {
        let program = self.synthesizer.synthesize(params)?;
        let extension = RustRenderer::new(self.synthesizer.style()).extension();
        let path = dir.program_path(params, extension);
        std::fs::write(&path, &program.text)?;
        debug!(test = %params.test_id(), path = %path.display(), "wrote program");
        Ok(path)
    }

    /// Run one tool on one cell and check its log for the failure marker
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingMarker`] if the log does not contain the
    /// tool's marker, or any error from preparing or running the tool.
    pub fn invoke(
        &self,
        dir: &ResultsDirectory,
        spec: &ToolSpec,
        program_file: &Path,
        params: GenerationParameters,
    ) -> Result<ToolInvocationResult> {
        let invocation = spec.prepare(dir.path(), program_file, params)?;
        debug!(command = %invocation.command_line(), "launching");

        let outcome = self.runner.run(&invocation)?;
        info!(
            "{} for {} ran in {:.1} seconds",
            spec.name,
            invocation.test,
            outcome.elapsed.as_secs_f64()
        );

        let raw_output = String::from_utf8_lossy(&std::fs::read(&invocation.log)?).into_owned();
        if !spec.found_failure(&raw_output) {
            error!(
                tool = %spec.name,
                test = %invocation.test,
                exit_code = ?outcome.exit_code,
                "expected verification failure not found; log follows\n{raw_output}"
            );
            return Err(Error::MissingMarker {
                tool: spec.name.clone(),
                test: invocation.test,
                marker: spec.marker.clone(),
                log: invocation.log,
            });
        }

        Ok(ToolInvocationResult::new(
            spec.name.clone(),
            params,
            outcome.elapsed,
            raw_output,
        ))
    }

    fn progress_bar(&self) -> Option<ProgressBar> {
        if !self.config.show_progress {
            return None;
        }
        let per_cell = if self.config.generate_only {
            1
        } else {
            self.tools.len()
        };
        let pb = ProgressBar::new((self.config.grid.len() * per_cell) as u64);
        // Template is hardcoded and known to be valid
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    }
}
