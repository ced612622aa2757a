//! Parameter grid enumeration
//!
//! The grid is the cartesian product of an iteration range and a function
//! range, visited iterations-outer, functions-inner, both ascending.

use serde::{Deserialize, Serialize};

use crate::generator::GenerationParameters;
use crate::{Error, Result};

/// Inclusive stepped range of one parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamRange {
    /// First value
    pub min: u32,
    /// Upper bound (inclusive; reached only if `max - min` is a multiple of `step`)
    pub max: u32,
    /// Distance between consecutive values
    pub step: u32,
}

impl ParamRange {
    /// Validated range
    ///
    /// `name` and `max_name` are used in error messages, e.g. `funs` and
    /// `maxfuns`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `min` or `step` is zero or
    /// `max < min`.
    pub fn new(name: &str, max_name: &str, min: u32, max: u32, step: u32) -> Result<Self> {
        if min == 0 {
            return Err(Error::Configuration(format!("{name} must be at least 1")));
        }
        if step == 0 {
            return Err(Error::Configuration(format!(
                "step for {name} must be at least 1"
            )));
        }
        if max < min {
            return Err(Error::Configuration(format!(
                "{max_name} ({max}) must be >= {name} ({min})"
            )));
        }
        Ok(Self { min, max, step })
    }

    /// Single-value range
    #[must_use]
    pub fn single(value: u32) -> Self {
        Self {
            min: value,
            max: value,
            step: 1,
        }
    }

    /// Values in ascending order
    pub fn values(&self) -> impl Iterator<Item = u32> {
        (self.min..=self.max).step_by(self.step as usize)
    }

    /// Number of values
    #[must_use]
    pub fn len(&self) -> usize {
        ((self.max - self.min) / self.step) as usize + 1
    }

    /// Always false for a validated range
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.max < self.min
    }
}

/// Two-dimensional sweep over (iterations, functions)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepGrid {
    /// Iteration counts (outer loop)
    pub iterations: ParamRange,
    /// Function counts (inner loop)
    pub functions: ParamRange,
}

impl Default for SweepGrid {
    fn default() -> Self {
        Self {
            iterations: ParamRange::single(10),
            functions: ParamRange::single(2),
        }
    }
}

impl SweepGrid {
    /// Grid from command-line style bounds
    ///
    /// A missing maximum equals its minimum.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if either range is invalid or the
    /// iteration range exceeds what a generated program can loop over.
    pub fn from_bounds(
        iterations: u32,
        max_iterations: Option<u32>,
        iteration_step: u32,
        functions: u32,
        max_functions: Option<u32>,
        function_step: u32,
    ) -> Result<Self> {
        let functions = ParamRange::new(
            "funs",
            "maxfuns",
            functions,
            max_functions.unwrap_or(functions),
            function_step,
        )?;
        let iterations = ParamRange::new(
            "i",
            "maxi",
            iterations,
            max_iterations.unwrap_or(iterations),
            iteration_step,
        )?;
        if iterations.max > GenerationParameters::MAX_ITERATIONS {
            return Err(Error::Configuration(format!(
                "maxi ({}) exceeds {}",
                iterations.max,
                GenerationParameters::MAX_ITERATIONS
            )));
        }
        Ok(Self {
            iterations,
            functions,
        })
    }

    /// Cells in visiting order
    pub fn cells(&self) -> impl Iterator<Item = GenerationParameters> + '_ {
        self.iterations.values().flat_map(move |iterations| {
            self.functions
                .values()
                .map(move |functions| GenerationParameters {
                    iterations,
                    functions,
                })
        })
    }

    /// Number of cells
    #[must_use]
    pub fn len(&self) -> usize {
        self.iterations.len() * self.functions.len()
    }

    /// Always false for a validated grid
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty() || self.functions.is_empty()
    }
}
