//! Emission and transition scoring contracts.
//!
//! The orchestrators never compute scores themselves. They call an
//! [`EmissionScorer`] for per-token label scores and, on the structured path,
//! a [`TransitionScorer`] for chain potentials.
//!
//! ```text
//! test reps ──┐
//! support ────┼──► EmissionScorer ──► scores (batch, len, K)
//! label reps ─┘                                   │
//!                                                 ▼
//! test reps ──┐                        ┌──────────────────────┐
//! support ────┼──► TransitionScorer ──►│ pairwise (K, K)      │
//! label reps ─┘    (optional)          │ start (K), end (K)   │
//!                                      └──────────────────────┘
//! ```
//!
//! `K` is always the pad-free alphabet size.

pub mod emission;
pub mod transition;

pub use emission::{PrototypeScorer, Similarity};
pub use transition::ParamTransitionScorer;

use crate::{ensure_shape, Result};
use ndarray::{Array1, Array2, ArrayView2, ArrayView3, ArrayView4};

/// Produces per-token, per-label scores from test and support representations.
pub trait EmissionScorer: Send + Sync {
    /// Score every test token against every pad-free label.
    ///
    /// # Arguments
    /// * `test_reps` - `(batch, test_len, dim)`
    /// * `support_reps` - `(batch, support_size, support_len, dim)`
    /// * `test_mask` - `(batch, test_len)`
    /// * `support_mask` - `(batch, support_size, support_len)`
    /// * `support_target` - one-hot over the full alphabet,
    ///   `(batch, support_size, support_len, num_tags)`
    /// * `label_reps` - schema-aware callers only, `(batch, K, dim)`
    ///
    /// # Returns
    /// Scores of shape `(batch, test_len, K)`.
    fn score(
        &self,
        test_reps: ArrayView3<'_, f32>,
        support_reps: ArrayView4<'_, f32>,
        test_mask: ArrayView2<'_, bool>,
        support_mask: ArrayView3<'_, bool>,
        support_target: ArrayView4<'_, f32>,
        label_reps: Option<ArrayView3<'_, f32>>,
    ) -> Result<ndarray::Array3<f32>>;

    /// Short identifier for logs.
    fn name(&self) -> &'static str;
}

/// Produces chain potentials for the structured decoder.
pub trait TransitionScorer: Send + Sync {
    /// Compute start, end and pairwise potentials over the pad-free alphabet.
    ///
    /// `label_reps` is a single label schema `(K, dim)`; the same potentials
    /// are used for every element of the batch.
    fn score(
        &self,
        test_reps: ArrayView3<'_, f32>,
        support_target: ArrayView4<'_, f32>,
        label_reps: Option<ArrayView2<'_, f32>>,
    ) -> Result<TransitionPotentials>;

    /// Short identifier for logs.
    fn name(&self) -> &'static str;
}

/// Linear-chain potentials over the pad-free alphabet.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPotentials {
    /// `transitions[[i, j]]`: score of tag `i` followed by tag `j`, `(K, K)`
    pub transitions: Array2<f32>,
    /// Score of starting a sequence with each tag, `(K)`
    pub start: Array1<f32>,
    /// Score of ending a sequence with each tag, `(K)`
    pub end: Array1<f32>,
}

impl TransitionPotentials {
    /// Bundle potentials without checking shapes.
    #[must_use]
    pub fn new(transitions: Array2<f32>, start: Array1<f32>, end: Array1<f32>) -> Self {
        Self {
            transitions,
            start,
            end,
        }
    }

    /// Number of tags these potentials cover.
    #[must_use]
    pub fn num_tags(&self) -> usize {
        self.start.len()
    }

    /// Check every component is sized to `num_tags`.
    pub fn validate(&self, num_tags: usize) -> Result<()> {
        ensure_shape(
            "transition matrix",
            &[num_tags, num_tags],
            self.transitions.shape(),
        )?;
        ensure_shape("start transitions", &[num_tags], self.start.shape())?;
        ensure_shape("end transitions", &[num_tags], self.end.shape())?;
        Ok(())
    }
}
