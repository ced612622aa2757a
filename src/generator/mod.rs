//! Synthetic dynamic-dispatch program generation
//!
//! Builds small programs with one polymorphic call site inside a loop.
//! One implementation is rigged to return the failure sentinel on the last
//! iteration, so every generated program fails its assertion exactly once,
//! at a known iteration.
//!
//! # Example
//!
//! ```rust
//! use dispatch_sweep::generator::{synthesize, GenerationParameters};
//!
//! let params = GenerationParameters::new(10, 2)?;
//! let program = synthesize(params)?;
//! assert!(program.text.contains("trait A"));
//! assert_eq!(program.failing_iteration(), 9);
//! # Ok::<(), dispatch_sweep::Error>(())
//! ```

pub mod ir;
mod render;
mod trigger;

pub use ir::{
    Capability, Driver, Implementation, ProgramIr, SelectArm, SelectionChain, FAIL_VALUE,
    PASS_VALUE,
};
pub use render::{DispatchStyle, Renderer, RustRenderer};
pub use trigger::TriggerRule;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Size and shape of one synthetic program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenerationParameters {
    /// Loop iterations in the driver
    pub iterations: u32,
    /// Number of implementations behind the dispatch site
    pub functions: u32,
}

impl GenerationParameters {
    /// Largest iteration count that still fits the `i32` loop variable
    pub const MAX_ITERATIONS: u32 = i32::MAX as u32;

    /// Validated parameters
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if either count is zero or the
    /// iteration count exceeds [`Self::MAX_ITERATIONS`].
    pub fn new(iterations: u32, functions: u32) -> Result<Self> {
        if iterations == 0 {
            return Err(Error::Configuration(
                "iteration count must be at least 1".into(),
            ));
        }
        if functions == 0 {
            return Err(Error::Configuration(
                "function count must be at least 1".into(),
            ));
        }
        if iterations > Self::MAX_ITERATIONS {
            return Err(Error::Configuration(format!(
                "iteration count {iterations} exceeds {}",
                Self::MAX_ITERATIONS
            )));
        }
        Ok(Self {
            iterations,
            functions,
        })
    }

    /// Test identifier used in file names, e.g. `10i_2f`
    #[must_use]
    pub fn test_id(&self) -> String {
        format!("{}i_{}f", self.iterations, self.functions)
    }
}

impl std::fmt::Display for GenerationParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} iterations, {} functions",
            self.iterations, self.functions
        )
    }
}

/// Rendered program together with the structure it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticProgram {
    /// Parameters the program was built from
    pub params: GenerationParameters,
    /// Structured form, already checked
    pub ir: ProgramIr,
    /// Source text
    pub text: String,
}

impl SyntheticProgram {
    /// Iteration on which the driver's assertion fails
    #[must_use]
    pub fn failing_iteration(&self) -> u32 {
        self.params.iterations - 1
    }
}

/// Template-free program builder
#[derive(Debug, Clone, Copy, Default)]
pub struct Synthesizer {
    rule: TriggerRule,
    style: DispatchStyle,
}

impl Synthesizer {
    /// Synthesizer with the canonical trigger rule and reference dispatch
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different trigger rule
    #[must_use]
    pub fn with_rule(mut self, rule: TriggerRule) -> Self {
        self.rule = rule;
        self
    }

    /// Use a different dispatch style
    #[must_use]
    pub fn with_style(mut self, style: DispatchStyle) -> Self {
        self.style = style;
        self
    }

    /// Dispatch style in use
    #[must_use]
    pub fn style(&self) -> DispatchStyle {
        self.style
    }

    /// Build the structured program without checking it
    #[must_use]
    pub fn build(&self, params: GenerationParameters) -> ProgramIr {
        let implementations = self
            .rule
            .triggers(params.iterations, params.functions)
            .into_iter()
            .zip(0..)
            .map(|(trigger, index)| Implementation { index, trigger })
            .collect();

        ProgramIr {
            capability: Capability::default(),
            implementations,
            driver: Driver {
                iterations: params.iterations,
                selection: SelectionChain::ascending(params.functions),
            },
        }
    }

    /// Build, check and render a program
    ///
    /// # Errors
    ///
    /// Returns [`Error::Generation`] if the structured program violates
    /// the fault-placement or selection-chain guarantees.
    pub fn synthesize(&self, params: GenerationParameters) -> Result<SyntheticProgram> {
        let ir = self.build(params);
        ir.check()
            .map_err(|e| Error::Generation(format!("{}: {e}", params.test_id())))?;
        let text = RustRenderer::new(self.style).render(&ir);
        Ok(SyntheticProgram { params, ir, text })
    }
}

/// Synthesize with the default [`Synthesizer`]
///
/// # Errors
///
/// See [`Synthesizer::synthesize`].
pub fn synthesize(params: GenerationParameters) -> Result<SyntheticProgram> {
    Synthesizer::new().synthesize(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_reject_zero() {
        assert!(GenerationParameters::new(0, 2).is_err());
        assert!(GenerationParameters::new(10, 0).is_err());
    }

    #[test]
    fn test_parameters_reject_overflow() {
        let err = GenerationParameters::new(u32::MAX, 1).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(GenerationParameters::new(GenerationParameters::MAX_ITERATIONS, 1).is_ok());
    }

    #[test]
    fn test_test_id() {
        let params = GenerationParameters::new(10, 2).unwrap();
        assert_eq!(params.test_id(), "10i_2f");
        assert_eq!(params.to_string(), "10 iterations, 2 functions");
    }

    #[test]
    fn test_scenario_ten_by_two() {
        let params = GenerationParameters::new(10, 2).unwrap();
        let program = synthesize(params).unwrap();

        assert_eq!(program.ir.implementations[0].trigger, 10);
        assert_eq!(program.ir.implementations[1].trigger, 9);
        assert_eq!(program.ir.driver.selection.select(9), 1);
        assert_eq!(program.ir.simulate(), Some(9));
        assert_eq!(program.failing_iteration(), 9);
        assert!(program.text.contains("for i in 0..10 {"));
        assert!(program.text.contains("if x == 9 {"));
    }

    #[test]
    fn test_shape_of_program() {
        let params = GenerationParameters::new(20, 4).unwrap();
        let program = synthesize(params).unwrap();

        assert_eq!(program.text.matches("trait A {").count(), 1);
        assert_eq!(program.text.matches("impl A for Struct").count(), 4);
        assert_eq!(program.text.matches("fn main()").count(), 1);
        for residue in 1..4 {
            assert_eq!(
                program.text.matches(&format!("i % 4 == {residue} {{")).count(),
                1
            );
        }
        assert!(!program.text.contains("i % 4 == 0"));
    }

    #[test]
    fn test_collision_case_is_valid() {
        let params = GenerationParameters::new(10, 3).unwrap();
        let program = synthesize(params).unwrap();
        assert_eq!(program.ir.failing_iterations(), vec![9]);
    }

    #[test]
    fn test_descending_rule_rejected_on_collision() {
        let params = GenerationParameters::new(10, 3).unwrap();
        let err = Synthesizer::new()
            .with_rule(TriggerRule::Descending)
            .synthesize(params)
            .unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
        assert!(err.to_string().contains("10i_3f"));
    }

    #[test]
    fn test_descending_rule_accepted_without_collision() {
        let params = GenerationParameters::new(10, 2).unwrap();
        let program = Synthesizer::new()
            .with_rule(TriggerRule::Descending)
            .synthesize(params)
            .unwrap();
        assert_eq!(program.ir.simulate(), Some(9));
    }

    #[test]
    fn test_style_is_applied() {
        let params = GenerationParameters::new(5, 2).unwrap();
        let synth = Synthesizer::new().with_style(DispatchStyle::Boxed);
        assert_eq!(synth.style(), DispatchStyle::Boxed);
        let program = synth.synthesize(params).unwrap();
        assert!(program.text.contains("Box<dyn A>"));
    }

    #[test]
    fn test_deterministic() {
        let params = GenerationParameters::new(37, 5).unwrap();
        let a = synthesize(params).unwrap();
        let b = synthesize(params).unwrap();
        assert_eq!(a.text, b.text);
        assert_eq!(a, b);
    }
}
