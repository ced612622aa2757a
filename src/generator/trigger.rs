//! Trigger-value rules for fault placement
//!
//! Each synthetic implementation returns the failure sentinel when its
//! input equals its trigger value. The rule decides where those triggers
//! sit relative to the loop bounds.

use serde::{Deserialize, Serialize};

/// Rule assigning a trigger value to every implementation index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerRule {
    /// `iterations - i`, except the implementation selected on the final
    /// iteration which fires on `iterations - 1`.
    ///
    /// A default trigger that would be selected on its own iteration before
    /// the final one is parked at `-i`, outside the loop range, so the
    /// final iteration is the only failing one.
    #[default]
    FinalIteration,

    /// `iterations - i` for every implementation, with no override.
    ///
    /// Kept to reproduce the earlier generator. Fault placement is only
    /// correct for some parameter pairs; the program check rejects the rest.
    Descending,
}

impl TriggerRule {
    /// Compute the trigger for implementation `index`
    #[must_use]
    pub fn trigger(self, iterations: u32, functions: u32, index: u32) -> i64 {
        let iterations = i64::from(iterations);
        let functions = i64::from(functions);
        let index = i64::from(index);
        let default = iterations - index;

        match self {
            Self::Descending => default,
            Self::FinalIteration => {
                if index == (iterations - 1).rem_euclid(functions) {
                    iterations - 1
                } else if (0..iterations).contains(&default) && default % functions == index {
                    -index
                } else {
                    default
                }
            }
        }
    }

    /// Triggers for indices `0..functions`, in index order
    #[must_use]
    pub fn triggers(self, iterations: u32, functions: u32) -> Vec<i64> {
        (0..functions)
            .map(|index| self.trigger(iterations, functions, index))
            .collect()
    }
}

impl std::fmt::Display for TriggerRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FinalIteration => write!(f, "final-iteration"),
            Self::Descending => write!(f, "descending"),
        }
    }
}
