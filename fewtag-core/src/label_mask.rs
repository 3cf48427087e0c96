//! Label-transition masks and the transition constraint filter.
//!
//! A [`LabelMask`] is a square boolean matrix over the *full* tag alphabet:
//! `mask[[i, j]] == true` permits a transition from tag `i` to tag `j`.
//! Before it touches a transition matrix, row 0 and column 0 (the pad label)
//! are dropped so the mask lines up with the pad-free alphabet.
//!
//! # Soft masking
//!
//! Disallowed transitions are forced to exactly zero, not to negative
//! infinity. A zero potential is only "forbidden" for decoders that
//! exponentiate and normalise potentials; for purely additive log-potentials
//! it is a neutral score.

use crate::{ensure_shape, Error, Result, TagAlphabet};
use ndarray::{s, Array2, ArrayView2};

/// Static transition-compatibility matrix over the full tag alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMask {
    mask: Array2<bool>,
}

impl LabelMask {
    /// Wrap a full-alphabet mask.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLabelMask`] unless the mask is `alphabet.len()` square.
    pub fn new(mask: Array2<bool>, alphabet: &TagAlphabet) -> Result<Self> {
        let (rows, cols) = mask.dim();
        if rows != cols {
            return Err(Error::invalid_label_mask(format!(
                "mask must be square, got {}x{}",
                rows, cols
            )));
        }
        if rows != alphabet.len() {
            return Err(Error::invalid_label_mask(format!(
                "mask covers {} tags but the alphabet has {} (pad included)",
                rows,
                alphabet.len()
            )));
        }
        Ok(Self { mask })
    }

    /// Mask permitting every transition.
    #[must_use]
    pub fn allow_all(alphabet: &TagAlphabet) -> Self {
        let n = alphabet.len();
        Self {
            mask: Array2::from_elem((n, n), true),
        }
    }

    /// BIO constraints: `I-X` may only follow `B-X` or `I-X`.
    ///
    /// Labels without a `B-`/`I-` prefix are unconstrained in both directions.
    #[must_use]
    pub fn bio(alphabet: &TagAlphabet) -> Self {
        let n = alphabet.len();
        let mut mask = Array2::from_elem((n, n), true);
        for to in 1..n {
            let Some(inside) = alphabet.label(to).and_then(|l| l.strip_prefix("I-")) else {
                continue;
            };
            for from in 1..n {
                let from_label = alphabet.label(from).unwrap_or_default();
                let continues = from_label
                    .strip_prefix("B-")
                    .or_else(|| from_label.strip_prefix("I-"))
                    .is_some_and(|ty| ty == inside);
                mask[[from, to]] = continues;
            }
        }
        Self { mask }
    }

    /// Number of tags covered, pad included.
    #[must_use]
    pub fn num_tags(&self) -> usize {
        self.mask.nrows()
    }

    /// Whether `from -> to` is permitted (full IDs).
    #[must_use]
    pub fn allows(&self, from: usize, to: usize) -> bool {
        self.mask.get((from, to)).copied().unwrap_or(false)
    }

    /// Full-alphabet view.
    #[must_use]
    pub fn view(&self) -> ArrayView2<'_, bool> {
        self.mask.view()
    }

    /// View with the pad row and column removed.
    #[must_use]
    pub fn pad_free(&self) -> ArrayView2<'_, bool> {
        self.mask.slice(s![1.., 1..])
    }
}

/// Zero out disallowed transitions.
///
/// With no mask the transitions are returned unchanged.
///
/// # Errors
///
/// [`Error::ShapeMismatch`] if the pad-free mask and the transitions differ
/// in shape.
pub fn apply_label_mask(
    transitions: Array2<f32>,
    label_mask: Option<&LabelMask>,
) -> Result<Array2<f32>> {
    let Some(label_mask) = label_mask else {
        return Ok(transitions);
    };
    let trans_mask = label_mask.pad_free();
    ensure_shape(
        "pad-free label mask vs transitions",
        trans_mask.shape(),
        transitions.shape(),
    )?;

    let mut masked = transitions;
    masked.zip_mut_with(&trans_mask, |t, &allowed| {
        if !allowed {
            *t = 0.0;
        }
    });
    Ok(masked)
}
