//! dispatch-sweep - Synthetic Dynamic-Dispatch Benchmarks for Verifiers
//!
//! Generates parameterized programs with a single polymorphic call site in
//! a loop, runs external verification tools on them, and records how long
//! each tool takes as the iteration count and the number of dispatch
//! targets grow. Every generated program carries one planted assertion
//! failure on its last iteration; a tool that does not report it stops the
//! sweep.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DISPATCH-SWEEP                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  SweepGrid  →  Synthesizer  →  ToolSpec / Runner  →  Results │
//! │  (i, funs)     IR → check →    launch, time,         CSV +   │
//! │                render          match marker          logs    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use dispatch_sweep::prelude::*;
//!
//! let grid = SweepGrid::from_bounds(10, Some(30), 10, 2, Some(4), 1)?;
//! let dir = ResultsDirectory::at("bench-out")?;
//! let sweep = Sweep::with_process_runner(SweepConfig::new(grid), ToolRegistry::builtin());
//! let summary = sweep.run(&dir)?;
//! println!("{} rows in {}", summary.invocations, summary.results.display());
//! # Ok::<(), dispatch_sweep::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`generator`] - Program synthesis (structured form, checks, rendering)
//! - [`tool`] - Verification tool specs and subprocess runner
//! - [`sweep`] - Grid enumeration and orchestration
//! - [`results`] - Results directory and CSV table

#![forbid(unsafe_code)]

pub mod error;
pub mod generator;
pub mod results;
pub mod sweep;
pub mod tool;

pub use error::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::generator::{
        synthesize, DispatchStyle, GenerationParameters, SyntheticProgram, Synthesizer,
        TriggerRule,
    };
    pub use crate::results::{ResultRow, ResultsDirectory, ResultsTable, ToolInvocationResult};
    pub use crate::sweep::{ParamRange, Sweep, SweepConfig, SweepGrid, SweepSummary};
    pub use crate::tool::{ProcessRunner, ToolInvocation, ToolRegistry, ToolRunner, ToolSpec};
    pub use crate::{Error, Result};
}
