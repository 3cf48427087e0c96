//! Per-token softmax classification.

use super::{check_inputs, check_tag, log_sum_exp, valid_positions, TokenDecoder};
use crate::Result;
use ndarray::{ArrayView1, ArrayView2, ArrayView3, Axis};

/// Unstructured decoder: every valid token is classified on its own.
///
/// The loss is averaged per sequence first and then over the sequences that
/// have at least one valid token, so long and short sentences weigh the same.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftmaxLabeler;

impl SoftmaxLabeler {
    /// Create a softmax labeler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Index of the largest score (first one on ties).
fn argmax(row: ArrayView1<'_, f32>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best_i, best), (i, &v)| {
            if v > best {
                (i, v)
            } else {
                (best_i, best)
            }
        })
        .0
}

impl TokenDecoder for SoftmaxLabeler {
    fn loss(
        &self,
        scores: ArrayView3<'_, f32>,
        mask: ArrayView2<'_, bool>,
        tags: ArrayView2<'_, usize>,
    ) -> Result<f32> {
        check_inputs(scores, mask, Some(tags))?;
        let k = scores.dim().2;

        let mut total = 0.0f32;
        let mut sequences = 0usize;
        for (b, emissions) in scores.axis_iter(Axis(0)).enumerate() {
            let positions = valid_positions(mask.row(b));
            if positions.is_empty() {
                continue;
            }
            let mut nll = 0.0f32;
            for &pos in &positions {
                let gold = check_tag(tags[[b, pos]], k)?;
                let row = emissions.row(pos);
                nll += log_sum_exp(row.iter().copied()) - row[gold];
            }
            total += nll / positions.len() as f32;
            sequences += 1;
        }

        if sequences == 0 {
            return Ok(0.0);
        }
        Ok(total / sequences as f32)
    }

    fn decode(
        &self,
        scores: ArrayView3<'_, f32>,
        mask: ArrayView2<'_, bool>,
    ) -> Result<Vec<Vec<usize>>> {
        check_inputs(scores, mask, None)?;
        Ok(scores
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(b, emissions)| {
                valid_positions(mask.row(b))
                    .into_iter()
                    .map(|pos| argmax(emissions.row(pos)))
                    .collect()
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "softmax"
    }
}
