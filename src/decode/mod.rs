//! Decoders: structured (linear-chain) and unstructured (per-token).
//!
//! Both decoders work over the pad-free alphabet and only look at positions
//! the output mask marks as valid. Valid positions are visited in order, so a
//! mask does not have to be a prefix: `[T, F, T]` decodes two tokens.
//!
//! | Decoder | Training | Inference |
//! |---------|----------|-----------|
//! | [`ConditionalRandomField`] | log-likelihood (forward algorithm) | Viterbi best path |
//! | [`SoftmaxLabeler`] | masked token cross-entropy | per-token argmax |

pub mod crf;
pub mod softmax;

pub use crf::ConditionalRandomField;
pub use softmax::SoftmaxLabeler;

use crate::scoring::TransitionPotentials;
use crate::{ensure_shape, Error, Result};
use ndarray::{ArrayView1, ArrayView2, ArrayView3};

/// Chain decoder over emission scores plus transition potentials.
pub trait StructuredDecoder: Send + Sync {
    /// Log-likelihood of the gold tags, summed over the batch.
    ///
    /// # Arguments
    /// * `scores` - `(batch, len, K)`
    /// * `potentials` - start/end/pairwise potentials over `K` tags
    /// * `tags` - pad-free gold IDs, `(batch, len)`
    /// * `mask` - valid positions, `(batch, len)`
    fn log_likelihood(
        &self,
        scores: ArrayView3<'_, f32>,
        potentials: &TransitionPotentials,
        tags: ArrayView2<'_, usize>,
        mask: ArrayView2<'_, bool>,
    ) -> Result<f32>;

    /// Best path and its score for every batch element.
    ///
    /// Each path holds one pad-free ID per valid position.
    fn viterbi_tags(
        &self,
        scores: ArrayView3<'_, f32>,
        potentials: &TransitionPotentials,
        mask: ArrayView2<'_, bool>,
    ) -> Result<Vec<(Vec<usize>, f32)>>;

    /// Short identifier for logs.
    fn name(&self) -> &'static str;
}

/// Independent per-token classifier.
pub trait TokenDecoder: Send + Sync {
    /// Masked classification loss between scores and pad-free gold tags.
    fn loss(
        &self,
        scores: ArrayView3<'_, f32>,
        mask: ArrayView2<'_, bool>,
        tags: ArrayView2<'_, usize>,
    ) -> Result<f32>;

    /// Highest-scoring pad-free ID at every valid position.
    fn decode(
        &self,
        scores: ArrayView3<'_, f32>,
        mask: ArrayView2<'_, bool>,
    ) -> Result<Vec<Vec<usize>>>;

    /// Short identifier for logs.
    fn name(&self) -> &'static str;
}

/// Indices of the valid positions in one mask row.
pub(crate) fn valid_positions(mask: ArrayView1<'_, bool>) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(i, &valid)| valid.then_some(i))
        .collect()
}

/// Shared shape checks for decoder inputs.
pub(crate) fn check_inputs(
    scores: ArrayView3<'_, f32>,
    mask: ArrayView2<'_, bool>,
    tags: Option<ArrayView2<'_, usize>>,
) -> Result<()> {
    let (batch, len, _) = scores.dim();
    ensure_shape("decoder mask vs scores", &[batch, len], mask.shape())?;
    if let Some(tags) = tags {
        ensure_shape("decoder tags vs scores", &[batch, len], tags.shape())?;
    }
    Ok(())
}

/// Reject a gold tag outside the pad-free alphabet.
pub(crate) fn check_tag(tag: usize, num_tags: usize) -> Result<usize> {
    if tag < num_tags {
        Ok(tag)
    } else {
        Err(Error::invalid_input(format!(
            "gold tag {} outside pad-free alphabet of size {}",
            tag, num_tags
        )))
    }
}

/// Numerically stable `ln(Σ exp(x))`.
pub(crate) fn log_sum_exp<I>(values: I) -> f32
where
    I: IntoIterator<Item = f32> + Clone,
{
    let max = values.clone().into_iter().fold(f32::NEG_INFINITY, f32::max);
    if max == f32::NEG_INFINITY {
        return f32::NEG_INFINITY;
    }
    let sum: f32 = values.into_iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}
