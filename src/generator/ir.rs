//! Structured form of a synthetic dispatch program
//!
//! A program is built here first and rendered to text afterwards, so the
//! fault-placement and selection-chain properties can be checked on the
//! structure rather than on generated source.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Return value of a non-failing call
pub const PASS_VALUE: i64 = 1;

/// Return value of a call whose trigger fired
pub const FAIL_VALUE: i64 = -1;

/// Polymorphic capability with a single `f(x) -> integer` operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// Capability (trait) name
    pub name: String,
    /// Operation name
    pub operation: String,
}

impl Default for Capability {
    fn default() -> Self {
        Self {
            name: "A".to_string(),
            operation: "f".to_string(),
        }
    }
}

/// One implementing type of the capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    /// Index in `0..functions`
    pub index: u32,
    /// Input on which the operation returns [`FAIL_VALUE`]
    pub trigger: i64,
}

impl Implementation {
    /// Type name used when rendering
    #[must_use]
    pub fn type_name(&self) -> String {
        format!("Struct{}", self.index)
    }

    /// Evaluate the operation on `x`
    #[must_use]
    pub fn call(&self, x: i64) -> i64 {
        if x == self.trigger {
            FAIL_VALUE
        } else {
            PASS_VALUE
        }
    }
}

/// Conditional arm of the selection chain: `i % modulus == residue`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectArm {
    /// Residue compared against
    pub residue: u32,
    /// Implementation chosen when the residue matches
    pub implementation: u32,
}

/// Chain of equality tests choosing an implementation per iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionChain {
    /// Modulus applied to the loop counter
    pub modulus: u32,
    /// Conditional arms, tested in order
    pub arms: Vec<SelectArm>,
    /// Implementation chosen when no arm matches
    pub default: u32,
}

impl SelectionChain {
    /// Chain with residue 0 as the fallback and `1..modulus` as arms
    #[must_use]
    pub fn ascending(modulus: u32) -> Self {
        Self {
            modulus,
            arms: (1..modulus)
                .map(|r| SelectArm {
                    residue: r,
                    implementation: r,
                })
                .collect(),
            default: 0,
        }
    }

    /// Total branch count (default included)
    #[must_use]
    pub fn branch_count(&self) -> usize {
        self.arms.len() + 1
    }

    /// Residues covered, default first then arms in chain order
    #[must_use]
    pub fn residues(&self) -> Vec<u32> {
        std::iter::once(self.default)
            .chain(self.arms.iter().map(|arm| arm.residue))
            .collect()
    }

    /// Implementation chosen on loop iteration `i`
    #[must_use]
    pub fn select(&self, i: u64) -> u32 {
        let residue = (i % u64::from(self.modulus)) as u32;
        self.arms
            .iter()
            .find(|arm| arm.residue == residue)
            .map_or(self.default, |arm| arm.implementation)
    }
}

/// Driver loop: `for i in 0..iterations { select; assert f(i) == PASS }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    /// Loop bound (exclusive)
    pub iterations: u32,
    /// Implementation selection
    pub selection: SelectionChain,
}

/// Complete synthetic program before rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramIr {
    /// Capability declaration
    pub capability: Capability,
    /// Implementations, indexed `0..functions`
    pub implementations: Vec<Implementation>,
    /// Driver routine
    pub driver: Driver,
}

impl ProgramIr {
    /// Iterations on which the driver's assertion fails
    ///
    /// Solved per implementation rather than by running the loop: an
    /// implementation fails only on its own trigger, and only if the loop
    /// reaches that value and selects it there.
    #[must_use]
    pub fn failing_iterations(&self) -> Vec<u32> {
        let iterations = i64::from(self.driver.iterations);
        let mut failing: Vec<u32> = self
            .implementations
            .iter()
            .filter(|imp| (0..iterations).contains(&imp.trigger))
            .filter(|imp| self.driver.selection.select(imp.trigger as u64) == imp.index)
            .map(|imp| imp.trigger as u32)
            .collect();
        failing.sort_unstable();
        failing.dedup();
        failing
    }

    /// Run the driver and return the first iteration whose assertion fails
    #[must_use]
    pub fn simulate(&self) -> Option<u32> {
        (0..self.driver.iterations).find(|&i| {
            let chosen = self.driver.selection.select(u64::from(i));
            self.implementations
                .get(chosen as usize)
                .is_some_and(|imp| imp.call(i64::from(i)) != PASS_VALUE)
        })
    }

    /// Check the structural guarantees before rendering
    ///
    /// # Errors
    ///
    /// Returns [`Error::Generation`] if implementations are not indexed
    /// `0..functions`, the selection chain does not cover every residue
    /// exactly once in ascending order with 0 as the default, or the fault
    /// does not fire on the final iteration only.
    pub fn check(&self) -> Result<()> {
        let functions = self.implementations.len();
        if functions == 0 {
            return Err(Error::Generation("program has no implementations".into()));
        }

        for (expected, imp) in self.implementations.iter().enumerate() {
            if imp.index as usize != expected {
                return Err(Error::Generation(format!(
                    "implementation {} found at position {expected}",
                    imp.index
                )));
            }
        }

        let selection = &self.driver.selection;
        if selection.modulus as usize != functions {
            return Err(Error::Generation(format!(
                "selection modulus {} does not match {functions} implementations",
                selection.modulus
            )));
        }
        let expected: Vec<u32> = (0..selection.modulus).collect();
        if selection.residues() != expected {
            return Err(Error::Generation(format!(
                "selection chain covers residues {:?}, expected {expected:?}",
                selection.residues()
            )));
        }
        if selection.arms.iter().any(|arm| arm.residue != arm.implementation) {
            return Err(Error::Generation(
                "selection arm dispatches to a foreign implementation".into(),
            ));
        }

        let last = self.driver.iterations.checked_sub(1).ok_or_else(|| {
            Error::Generation("driver loop has zero iterations".into())
        })?;
        let failing = self.failing_iterations();
        if failing != [last] {
            return Err(Error::Generation(format!(
                "fault fires on iterations {failing:?}, expected only {last}"
            )));
        }
        Ok(())
    }
}
