//! Stored transition potentials with optional label-schema backoff.

use super::{TransitionPotentials, TransitionScorer};
use crate::{ensure_shape, Error, Result};
use ndarray::{Array1, Array2, ArrayView2, ArrayView3, ArrayView4};

/// Transition scorer holding fixed start, end and pairwise potentials.
///
/// With a label schema and a non-zero backoff the pairwise potentials become
/// `(1 - b) * stored + b * scale * (L · Lᵀ)`, where `L` holds one embedding
/// per pad-free label. Start and end potentials are always the stored ones.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamTransitionScorer {
    potentials: TransitionPotentials,
    label_backoff: f32,
    label_scale: f32,
}

impl ParamTransitionScorer {
    /// Use the given potentials as-is.
    pub fn from_potentials(potentials: TransitionPotentials) -> Result<Self> {
        potentials.validate(potentials.num_tags())?;
        if potentials.num_tags() == 0 {
            return Err(Error::invalid_input("transition potentials cover no tags"));
        }
        Ok(Self {
            potentials,
            label_backoff: 0.0,
            label_scale: 1.0,
        })
    }

    /// Every potential set to `value` for `num_tags` pad-free labels.
    pub fn uniform(num_tags: usize, value: f32) -> Result<Self> {
        Self::from_potentials(TransitionPotentials::new(
            Array2::from_elem((num_tags, num_tags), value),
            Array1::from_elem(num_tags, value),
            Array1::from_elem(num_tags, value),
        ))
    }

    /// Weight of label-derived pairwise potentials, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_label_backoff(mut self, backoff: f32) -> Self {
        self.label_backoff = backoff.clamp(0.0, 1.0);
        self
    }

    /// Scale applied to label-label similarities.
    #[must_use]
    pub fn with_label_scale(mut self, scale: f32) -> Self {
        self.label_scale = scale;
        self
    }

    /// Number of pad-free labels covered.
    #[must_use]
    pub fn num_tags(&self) -> usize {
        self.potentials.num_tags()
    }
}

impl TransitionScorer for ParamTransitionScorer {
    fn score(
        &self,
        _test_reps: ArrayView3<'_, f32>,
        support_target: ArrayView4<'_, f32>,
        label_reps: Option<ArrayView2<'_, f32>>,
    ) -> Result<TransitionPotentials> {
        let k = self.num_tags();
        let full = support_target.dim().3;
        ensure_shape("support target tags (pad included)", &[k + 1], &[full])?;

        let mut potentials = self.potentials.clone();
        if let Some(labels) = label_reps {
            if self.label_backoff > 0.0 {
                ensure_shape("label schema rows", &[k], &[labels.nrows()])?;
                let b = self.label_backoff;
                let similarity = labels.dot(&labels.t()) * self.label_scale;
                potentials.transitions *= 1.0 - b;
                potentials.transitions.scaled_add(b, &similarity);
            }
        }
        Ok(potentials)
    }

    fn name(&self) -> &'static str {
        "param-transitions"
    }
}
