//! Prototype-similarity emission scoring.
//!
//! Each pad-free label gets a prototype: the mean of the support token
//! representations annotated with it. Test tokens are scored by their
//! similarity to every prototype.
//!
//! ```text
//! support tokens            prototypes              test token
//!   "Paris"  (LOC) ─┐
//!   "Berlin" (LOC) ─┴─► mean ─► p_LOC ─┐
//!   "Alice"  (PER) ─────────► p_PER ───┼── sim(x, p_k) × scale ──► score[k]
//!   "the"    (O)   ─────────► p_O   ───┘
//! ```
//!
//! With label representations (schema-aware scoring) each prototype is
//! interpolated toward its label embedding, which keeps labels with few or no
//! support tokens scorable.

use super::EmissionScorer;
use crate::{ensure_shape, Error, Result};
use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, ArrayView4, Axis};
use serde::{Deserialize, Serialize};

/// Similarity between a test token and a prototype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Similarity {
    /// Raw dot product.
    #[default]
    Dot,
    /// Cosine similarity (zero vectors score 0).
    Cosine,
    /// Negated squared Euclidean distance.
    NegativeSquaredL2,
}

impl Similarity {
    fn name(self) -> &'static str {
        match self {
            Self::Dot => "prototype(dot)",
            Self::Cosine => "prototype(cosine)",
            Self::NegativeSquaredL2 => "prototype(l2)",
        }
    }
}

/// Emission scorer comparing test tokens with per-label support prototypes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrototypeScorer {
    similarity: Similarity,
    scale: f32,
    label_weight: f32,
}

impl Default for PrototypeScorer {
    fn default() -> Self {
        Self::new(Similarity::Dot)
    }
}

impl PrototypeScorer {
    /// Create with unit scale and no label interpolation.
    #[must_use]
    pub fn new(similarity: Similarity) -> Self {
        Self {
            similarity,
            scale: 1.0,
            label_weight: 0.0,
        }
    }

    /// Multiply every score by `scale`.
    #[must_use]
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Interpolation weight toward label representations, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_label_weight(mut self, weight: f32) -> Self {
        self.label_weight = weight.clamp(0.0, 1.0);
        self
    }

    /// Configured similarity.
    #[must_use]
    pub fn similarity(&self) -> Similarity {
        self.similarity
    }

    /// Mean support representation per pad-free label, `(K, dim)`.
    ///
    /// Only unmasked support tokens contribute. Labels that no support token
    /// carries keep a zero prototype.
    pub fn prototypes(
        support_reps: ArrayView3<'_, f32>,
        support_mask: ArrayView2<'_, bool>,
        support_target: ArrayView3<'_, f32>,
    ) -> Result<Array2<f32>> {
        let (support_size, support_len, dim) = support_reps.dim();
        ensure_shape(
            "support mask vs support reps",
            &[support_size, support_len],
            support_mask.shape(),
        )?;
        let num_tags = support_target.dim().2;
        ensure_shape(
            "support target vs support reps",
            &[support_size, support_len, num_tags],
            support_target.shape(),
        )?;
        if num_tags < 2 {
            return Err(Error::invalid_input(
                "support target must cover pad plus at least one real label",
            ));
        }
        let k = num_tags - 1;

        let mut sums = Array2::<f32>::zeros((k, dim));
        let mut counts = vec![0.0f32; k];
        for sent in 0..support_size {
            for l in 0..support_len {
                if !support_mask[[sent, l]] {
                    continue;
                }
                let rep = support_reps.slice(s![sent, l, ..]);
                for tag in 0..k {
                    let weight = support_target[[sent, l, tag + 1]];
                    if weight != 0.0 {
                        sums.row_mut(tag).scaled_add(weight, &rep);
                        counts[tag] += weight;
                    }
                }
            }
        }
        for (mut row, &count) in sums.axis_iter_mut(Axis(0)).zip(&counts) {
            if count > 0.0 {
                row /= count;
            }
        }
        Ok(sums)
    }

    fn similarities(&self, tokens: ArrayView2<'_, f32>, protos: ArrayView2<'_, f32>) -> Array2<f32> {
        let mut scores = match self.similarity {
            Similarity::Dot => tokens.dot(&protos.t()),
            Similarity::Cosine => {
                let tokens = l2_normalize_rows(tokens);
                let protos = l2_normalize_rows(protos);
                tokens.dot(&protos.t())
            }
            Similarity::NegativeSquaredL2 => {
                let cross = tokens.dot(&protos.t());
                let token_sq = tokens.map_axis(Axis(1), |r| r.dot(&r));
                let proto_sq = protos.map_axis(Axis(1), |r| r.dot(&r));
                let mut out = cross * 2.0;
                for ((t, p), v) in out.indexed_iter_mut() {
                    *v -= token_sq[t] + proto_sq[p];
                }
                out
            }
        };
        if self.scale != 1.0 {
            scores *= self.scale;
        }
        scores
    }
}

fn l2_normalize_rows(m: ArrayView2<'_, f32>) -> Array2<f32> {
    let mut out = m.to_owned();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row /= norm;
        }
    }
    out
}

impl EmissionScorer for PrototypeScorer {
    fn score(
        &self,
        test_reps: ArrayView3<'_, f32>,
        support_reps: ArrayView4<'_, f32>,
        test_mask: ArrayView2<'_, bool>,
        support_mask: ArrayView3<'_, bool>,
        support_target: ArrayView4<'_, f32>,
        label_reps: Option<ArrayView3<'_, f32>>,
    ) -> Result<Array3<f32>> {
        let (batch, test_len, dim) = test_reps.dim();
        ensure_shape("test mask vs test reps", &[batch, test_len], test_mask.shape())?;
        let (support_batch, support_size, support_len, support_dim) = support_reps.dim();
        ensure_shape("support reps batch", &[batch], &[support_batch])?;
        ensure_shape("support reps dim", &[dim], &[support_dim])?;
        ensure_shape(
            "support mask vs support reps",
            &[batch, support_size, support_len],
            support_mask.shape(),
        )?;
        let (target_batch, target_size, target_len, _) = support_target.dim();
        ensure_shape(
            "support target vs support reps",
            &[batch, support_size, support_len],
            &[target_batch, target_size, target_len],
        )?;
        let k = support_target.dim().3.saturating_sub(1);
        if let Some(labels) = label_reps {
            ensure_shape("label reps", &[batch, k, dim], labels.shape())?;
        }

        let mut scores = Array3::<f32>::zeros((batch, test_len, k));
        for b in 0..batch {
            let mut protos = Self::prototypes(
                support_reps.index_axis(Axis(0), b),
                support_mask.index_axis(Axis(0), b),
                support_target.index_axis(Axis(0), b),
            )?;
            if let Some(labels) = label_reps {
                if self.label_weight > 0.0 {
                    let w = self.label_weight;
                    protos *= 1.0 - w;
                    protos.scaled_add(w, &labels.index_axis(Axis(0), b));
                }
            }
            let sims = self.similarities(test_reps.index_axis(Axis(0), b), protos.view());
            scores.index_axis_mut(Axis(0), b).assign(&sims);
        }
        Ok(scores)
    }

    fn name(&self) -> &'static str {
        self.similarity.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array4};

    /// One support sentence: [LOC-ish, PER-ish, pad], alphabet [PAD, LOC, PER].
    fn support() -> (Array4<f32>, Array3<bool>, Array4<f32>) {
        let reps = Array4::from_shape_vec(
            (1, 1, 3, 2),
            vec![1.0, 0.0, 0.0, 1.0, 9.0, 9.0],
        )
        .unwrap();
        let mask = array![[[true, true, false]]];
        let mut target = Array4::<f32>::zeros((1, 1, 3, 3));
        target[[0, 0, 0, 1]] = 1.0;
        target[[0, 0, 1, 2]] = 1.0;
        target[[0, 0, 2, 0]] = 1.0;
        (reps, mask, target)
    }

    #[test]
    fn test_prototypes_ignore_masked_and_pad() {
        let (reps, mask, target) = support();
        let protos = PrototypeScorer::prototypes(
            reps.index_axis(Axis(0), 0),
            mask.index_axis(Axis(0), 0),
            target.index_axis(Axis(0), 0),
        )
        .unwrap();
        assert_eq!(protos, array![[1.0f32, 0.0], [0.0, 1.0]]);
    }

    #[test]
    fn test_missing_label_gets_zero_prototype() {
        let (reps, mask, _) = support();
        let mut target = Array4::<f32>::zeros((1, 1, 3, 4));
        target[[0, 0, 0, 1]] = 1.0;
        target[[0, 0, 1, 1]] = 1.0;
        let protos = PrototypeScorer::prototypes(
            reps.index_axis(Axis(0), 0),
            mask.index_axis(Axis(0), 0),
            target.index_axis(Axis(0), 0),
        )
        .unwrap();
        assert_eq!(protos.row(0), array![0.5f32, 0.5]);
        assert_eq!(protos.row(1), array![0.0f32, 0.0]);
        assert_eq!(protos.row(2), array![0.0f32, 0.0]);
    }

    #[test]
    fn test_matching_prototype_scores_highest() {
        let (reps, mask, target) = support();
        let test = Array3::from_shape_vec((1, 2, 2), vec![0.9, 0.1, 0.2, 0.8]).unwrap();
        let test_mask = array![[true, true]];

        for sim in [Similarity::Dot, Similarity::Cosine, Similarity::NegativeSquaredL2] {
            let scorer = PrototypeScorer::new(sim);
            let scores = scorer
                .score(
                    test.view(),
                    reps.view(),
                    test_mask.view(),
                    mask.view(),
                    target.view(),
                    None,
                )
                .unwrap();
            assert_eq!(scores.dim(), (1, 2, 2));
            assert!(scores[[0, 0, 0]] > scores[[0, 0, 1]], "{:?}", sim);
            assert!(scores[[0, 1, 1]] > scores[[0, 1, 0]], "{:?}", sim);
        }
    }

    #[test]
    fn test_negative_l2_values() {
        let scorer = PrototypeScorer::new(Similarity::NegativeSquaredL2);
        let tokens = array![[1.0f32, 1.0]];
        let protos = array![[1.0f32, 1.0], [0.0, 0.0]];
        let sims = scorer.similarities(tokens.view(), protos.view());
        assert!((sims[[0, 0]] - 0.0).abs() < 1e-6);
        assert!((sims[[0, 1]] + 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_label_weight_pulls_toward_labels() {
        let (reps, mask, target) = support();
        let test = Array3::from_shape_vec((1, 1, 2), vec![0.0, 1.0]).unwrap();
        let test_mask = array![[true]];
        // swap label embeddings: LOC points at PER's support direction
        let labels = Array3::from_shape_vec((1, 2, 2), vec![0.0, 1.0, 1.0, 0.0]).unwrap();

        let plain = PrototypeScorer::new(Similarity::Dot);
        let schema = PrototypeScorer::new(Similarity::Dot).with_label_weight(1.0);
        let args = (test.view(), reps.view(), test_mask.view(), mask.view(), target.view());

        let a = plain
            .score(args.0, args.1, args.2, args.3, args.4, Some(labels.view()))
            .unwrap();
        let b = schema
            .score(args.0, args.1, args.2, args.3, args.4, Some(labels.view()))
            .unwrap();
        assert!(a[[0, 0, 1]] > a[[0, 0, 0]]);
        assert!(b[[0, 0, 0]] > b[[0, 0, 1]]);
    }

    #[test]
    fn test_scale_applies() {
        let scorer = PrototypeScorer::new(Similarity::Dot).with_scale(3.0);
        let sims = scorer.similarities(array![[1.0f32, 2.0]].view(), array![[1.0f32, 1.0]].view());
        assert_eq!(sims, array![[9.0f32]]);
    }

    #[test]
    fn test_rejects_mask_mismatch() {
        let (reps, mask, target) = support();
        let test = Array3::<f32>::zeros((1, 2, 2));
        let bad_mask = array![[true, true, true]];
        let err = PrototypeScorer::default()
            .score(
                test.view(),
                reps.view(),
                bad_mask.view(),
                mask.view(),
                target.view(),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_rejects_support_batch_mismatch() {
        let (reps, mask, target) = support();
        let support_reps = ndarray::concatenate![Axis(0), reps, reps];
        let test = Array3::<f32>::zeros((2, 2, 2));
        let test_mask = Array2::from_elem((2, 2), true);
        let scorer = PrototypeScorer::default();

        let err = scorer
            .score(
                test.view(),
                support_reps.view(),
                test_mask.view(),
                mask.view(),
                target.view(),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));

        let support_mask = ndarray::concatenate![Axis(0), mask, mask];
        let err = scorer
            .score(
                test.view(),
                support_reps.view(),
                test_mask.view(),
                support_mask.view(),
                target.view(),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }
}
