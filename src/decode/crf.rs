//! Linear-chain conditional random field.
//!
//! Potentials are supplied per call (they come from a transition scorer), so
//! the CRF itself holds no parameters.
//!
//! For a path `y` over valid positions `p_0 .. p_n`:
//!
//! ```text
//! score(y) = start[y_0] + e[p_0, y_0]
//!          + Σ_{i≥1} ( trans[y_{i-1}, y_i] + e[p_i, y_i] )
//!          + end[y_n]
//!
//! log p(y) = score(y) - log Σ_{y'} exp(score(y'))
//! ```

use super::{check_inputs, check_tag, log_sum_exp, valid_positions, StructuredDecoder};
use crate::scoring::TransitionPotentials;
use crate::Result;
use ndarray::{Array1, ArrayView2, ArrayView3, Axis};

/// Linear-chain CRF with start and end potentials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConditionalRandomField;

impl ConditionalRandomField {
    /// Create a CRF decoder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn check(scores: ArrayView3<'_, f32>, potentials: &TransitionPotentials) -> Result<usize> {
        let k = scores.dim().2;
        potentials.validate(k)?;
        Ok(k)
    }

    /// Score of one gold path for one sequence.
    fn path_score(
        emissions: ArrayView2<'_, f32>,
        potentials: &TransitionPotentials,
        positions: &[usize],
        path: &[usize],
    ) -> f32 {
        let mut score = 0.0;
        let mut prev: Option<usize> = None;
        for (&pos, &tag) in positions.iter().zip(path) {
            score += emissions[[pos, tag]];
            score += match prev {
                None => potentials.start[tag],
                Some(p) => potentials.transitions[[p, tag]],
            };
            prev = Some(tag);
        }
        if let Some(last) = prev {
            score += potentials.end[last];
        }
        score
    }

    /// Log partition function for one sequence (forward algorithm).
    fn log_partition(
        emissions: ArrayView2<'_, f32>,
        potentials: &TransitionPotentials,
        positions: &[usize],
    ) -> f32 {
        let k = potentials.num_tags();
        let Some((&first, rest)) = positions.split_first() else {
            return 0.0;
        };
        let mut alpha: Array1<f32> = &potentials.start + &emissions.row(first);
        for &pos in rest {
            let next = Array1::from_shape_fn(k, |cur| {
                log_sum_exp((0..k).map(|prev| alpha[prev] + potentials.transitions[[prev, cur]]))
                    + emissions[[pos, cur]]
            });
            alpha = next;
        }
        log_sum_exp((0..k).map(|tag| alpha[tag] + potentials.end[tag]))
    }

    /// Viterbi for one sequence.
    fn best_path(
        emissions: ArrayView2<'_, f32>,
        potentials: &TransitionPotentials,
        positions: &[usize],
    ) -> (Vec<usize>, f32) {
        let k = potentials.num_tags();
        let Some((&first, rest)) = positions.split_first() else {
            return (Vec::new(), 0.0);
        };

        let mut delta: Array1<f32> = &potentials.start + &emissions.row(first);
        let mut backpointers: Vec<Vec<usize>> = Vec::with_capacity(rest.len());
        for &pos in rest {
            let mut next = Array1::<f32>::zeros(k);
            let mut pointers = vec![0usize; k];
            for cur in 0..k {
                let (best_prev, best) = (0..k)
                    .map(|prev| (prev, delta[prev] + potentials.transitions[[prev, cur]]))
                    .fold((0, f32::NEG_INFINITY), |acc, cand| {
                        if cand.1 > acc.1 {
                            cand
                        } else {
                            acc
                        }
                    });
                next[cur] = best + emissions[[pos, cur]];
                pointers[cur] = best_prev;
            }
            delta = next;
            backpointers.push(pointers);
        }

        let (mut tag, score) = (0..k)
            .map(|t| (t, delta[t] + potentials.end[t]))
            .fold((0, f32::NEG_INFINITY), |acc, cand| {
                if cand.1 > acc.1 {
                    cand
                } else {
                    acc
                }
            });

        let mut path = Vec::with_capacity(positions.len());
        path.push(tag);
        for pointers in backpointers.iter().rev() {
            tag = pointers[tag];
            path.push(tag);
        }
        path.reverse();
        (path, score)
    }
}

impl StructuredDecoder for ConditionalRandomField {
    fn log_likelihood(
        &self,
        scores: ArrayView3<'_, f32>,
        potentials: &TransitionPotentials,
        tags: ArrayView2<'_, usize>,
        mask: ArrayView2<'_, bool>,
    ) -> Result<f32> {
        check_inputs(scores, mask, Some(tags))?;
        let k = Self::check(scores, potentials)?;

        let mut total = 0.0;
        for (b, emissions) in scores.axis_iter(Axis(0)).enumerate() {
            let positions = valid_positions(mask.row(b));
            let path = positions
                .iter()
                .map(|&pos| check_tag(tags[[b, pos]], k))
                .collect::<Result<Vec<_>>>()?;
            let numerator = Self::path_score(emissions, potentials, &positions, &path);
            let denominator = Self::log_partition(emissions, potentials, &positions);
            total += numerator - denominator;
        }
        Ok(total)
    }

    fn viterbi_tags(
        &self,
        scores: ArrayView3<'_, f32>,
        potentials: &TransitionPotentials,
        mask: ArrayView2<'_, bool>,
    ) -> Result<Vec<(Vec<usize>, f32)>> {
        check_inputs(scores, mask, None)?;
        Self::check(scores, potentials)?;

        Ok(scores
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(b, emissions)| {
                Self::best_path(emissions, potentials, &valid_positions(mask.row(b)))
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "crf"
    }
}
