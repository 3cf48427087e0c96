//! Decision orchestrators.
//!
//! An orchestrator turns one few-shot episode into either a loss or a
//! prediction:
//!
//! ```text
//!            ┌──────────────────────────────────────────────────┐
//! Episode ──►│ EmissionScorer ──► scores (batch, len, K)         │
//!            │        │                                          │
//!            │   shift_in(target)                                │
//!            │        │                                          │
//!            │   ┌────┴─────────────────────┐                    │
//!            │   │ Structured               │ Unstructured       │
//!            │   │ TransitionScorer         │                    │
//!            │   │ apply_label_mask         │                    │
//!            │   │ CRF llh / Viterbi        │ softmax / argmax   │
//!            │   └────┬─────────────────────┘                    │
//!            │   shift_out(paths)                                │
//!            └────────┴─────────────────────────────────────────►│ Loss | Prediction
//! ```
//!
//! | Orchestrator | Task | Label reps | Target logging |
//! |--------------|------|------------|----------------|
//! | [`FewShotSeqLabeler`] | sequence labeling | no | no |
//! | [`SchemaFewShotSeqLabeler`] | sequence labeling | yes | inference |
//! | [`FewShotTextClassifier`] | classification | no | no |
//! | [`SchemaFewShotTextClassifier`] | classification | yes | inference |

pub mod classifier;
pub mod seq;

pub use classifier::{FewShotTextClassifier, SchemaFewShotTextClassifier};
pub use seq::{FewShotSeqLabeler, FewShotSeqLabelerBuilder, SchemaFewShotSeqLabeler};

use crate::{ensure_shape, Error, Result, TagAlphabet};
use ndarray::{ArrayView1, ArrayView2, ArrayView3, ArrayView4};

/// Whether a forward call trains or predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Return a loss.
    Train,
    /// Return predictions.
    Infer,
}

impl Mode {
    /// Map the conventional `is_training` flag.
    #[must_use]
    pub fn from_training(is_training: bool) -> Self {
        if is_training {
            Self::Train
        } else {
            Self::Infer
        }
    }
}

/// Result of one forward call: a loss or a prediction, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardOutput {
    /// Scalar training loss.
    Loss(f32),
    /// Full-alphabet label IDs, one sequence per batch element.
    Prediction(Vec<Vec<usize>>),
}

impl ForwardOutput {
    /// The loss, if this came from a training call.
    #[must_use]
    pub fn loss(&self) -> Option<f32> {
        match self {
            Self::Loss(loss) => Some(*loss),
            Self::Prediction(_) => None,
        }
    }

    /// The predictions, if this came from an inference call.
    #[must_use]
    pub fn prediction(&self) -> Option<&[Vec<usize>]> {
        match self {
            Self::Loss(_) => None,
            Self::Prediction(p) => Some(p),
        }
    }

    /// Consume into predictions.
    #[must_use]
    pub fn into_prediction(self) -> Option<Vec<Vec<usize>>> {
        match self {
            Self::Loss(_) => None,
            Self::Prediction(p) => Some(p),
        }
    }
}

/// Borrowed inputs of one few-shot forward call.
///
/// Shapes:
///
/// | Field | Shape |
/// |-------|-------|
/// | `test_reps` | `(batch, test_len, dim)` |
/// | `test_mask` | `(batch, test_len)` |
/// | `support_reps` | `(batch, support_size, support_len, dim)` |
/// | `support_mask` | `(batch, support_size, support_len)` |
/// | `test_target` | `(batch, test_len)`; classification `(batch, multi_label_num)` |
/// | `support_target` | `(batch, support_size, support_len, num_tags)` one-hot, pad included |
/// | `support_num` | `(batch)` |
/// | `label_reps` | `(batch, K, dim)`, schema-aware orchestrators only |
///
/// Target IDs use the full alphabet (0 = pad).
#[derive(Debug, Clone, Copy)]
pub struct Episode<'a> {
    /// Test token representations.
    pub test_reps: ArrayView3<'a, f32>,
    /// Valid test positions.
    pub test_mask: ArrayView2<'a, bool>,
    /// Support token representations.
    pub support_reps: ArrayView4<'a, f32>,
    /// Valid support positions.
    pub support_mask: ArrayView3<'a, bool>,
    /// Raw test label IDs.
    pub test_target: ArrayView2<'a, usize>,
    /// One-hot support labels over the full alphabet.
    pub support_target: ArrayView4<'a, f32>,
    /// Number of support instances per batch element.
    pub support_num: ArrayView1<'a, usize>,
    /// Label-schema representations.
    pub label_reps: Option<ArrayView3<'a, f32>>,
}

impl<'a> Episode<'a> {
    /// Batch size.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.test_reps.dim().0
    }

    /// Checks shared by every orchestrator: support side and batch sizes.
    pub(crate) fn check_support(&self, alphabet: &TagAlphabet) -> Result<()> {
        let batch = self.batch_size();
        let (support_batch, support_size, support_len, _) = self.support_reps.dim();
        ensure_shape("support reps batch", &[batch], &[support_batch])?;
        ensure_shape(
            "support mask vs support reps",
            &[batch, support_size, support_len],
            self.support_mask.shape(),
        )?;
        ensure_shape(
            "support target vs support reps and alphabet",
            &[batch, support_size, support_len, alphabet.len()],
            self.support_target.shape(),
        )?;
        ensure_shape("support num", &[batch], self.support_num.shape())?;
        ensure_shape("test target batch", &[batch], &[self.test_target.nrows()])?;
        Ok(())
    }

    /// Label reps for schema-aware orchestrators, shape-checked.
    pub(crate) fn require_label_reps(&self, alphabet: &TagAlphabet) -> Result<ArrayView3<'a, f32>> {
        let label_reps = self.label_reps.ok_or_else(|| {
            Error::invalid_input("schema-aware forward requires label representations")
        })?;
        let (batch, _, dim) = self.test_reps.dim();
        ensure_shape(
            "label reps",
            &[batch, alphabet.pad_free_len(), dim],
            label_reps.shape(),
        )?;
        Ok(label_reps)
    }
}
