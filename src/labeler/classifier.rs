//! Few-shot text classification.
//!
//! Classification reuses the labeling machinery with a single output slot
//! per sentence: whatever test mask the caller passes, emission scoring and
//! decoding see an all-true `(batch, 1)` mask. The emission scorer must
//! therefore return `(batch, 1, K)` scores, typically from sentence-level
//! test reps of length 1.
//!
//! Only the first target column is used for the loss; extra columns of a
//! multi-label target are ignored.

use super::{Episode, ForwardOutput, Mode};
use crate::decode::{SoftmaxLabeler, TokenDecoder};
use crate::scoring::EmissionScorer;
use crate::sink::{target_record, TargetSink};
use crate::{ensure_shape, shift_in, shift_out, Error, Result, TagAlphabet};
use ndarray::{s, Array2, ArrayView3};
use std::fmt;
use std::sync::Arc;

/// Few-shot sentence classifier.
pub struct FewShotTextClassifier {
    alphabet: TagAlphabet,
    emission: Box<dyn EmissionScorer>,
    decoder: Box<dyn TokenDecoder>,
}

impl fmt::Debug for FewShotTextClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FewShotTextClassifier")
            .field("alphabet", &self.alphabet)
            .field("emission", &self.emission.name())
            .field("decoder", &self.decoder.name())
            .finish()
    }
}

impl FewShotTextClassifier {
    /// Classifier with a [`SoftmaxLabeler`] decoder.
    #[must_use]
    pub fn new<E: EmissionScorer + 'static>(alphabet: TagAlphabet, emission: E) -> Self {
        Self::new_boxed(alphabet, Box::new(emission))
    }

    /// Same as [`new`](Self::new) for an already boxed scorer.
    #[must_use]
    pub fn new_boxed(alphabet: TagAlphabet, emission: Box<dyn EmissionScorer>) -> Self {
        log::debug!(
            "[fewtag] text classifier: emission={}, classes={}",
            emission.name(),
            alphabet.pad_free_len()
        );
        Self {
            alphabet,
            emission,
            decoder: Box::new(SoftmaxLabeler::new()),
        }
    }

    /// Replace the decoder.
    #[must_use]
    pub fn with_decoder<D: TokenDecoder + 'static>(mut self, decoder: D) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    /// Class alphabet, pad included.
    #[must_use]
    pub fn alphabet(&self) -> &TagAlphabet {
        &self.alphabet
    }

    /// Loss in [`Mode::Train`]; in [`Mode::Infer`] one single-element
    /// full-alphabet prediction per batch element.
    pub fn forward(&self, episode: &Episode<'_>, mode: Mode) -> Result<ForwardOutput> {
        self.run(episode, None, None, mode)
    }

    fn run(
        &self,
        episode: &Episode<'_>,
        label_reps: Option<ArrayView3<'_, f32>>,
        sink: Option<&dyn TargetSink>,
        mode: Mode,
    ) -> Result<ForwardOutput> {
        let batch = episode.batch_size();
        log::trace!(
            "[fewtag] classify forward: mode={:?}, batch={}, support={:?}",
            mode,
            batch,
            episode.support_reps.shape()
        );
        episode.check_support(&self.alphabet)?;

        let output_mask = Array2::from_elem((batch, 1), true);
        let scores = self.emission.score(
            episode.test_reps,
            episode.support_reps,
            output_mask.view(),
            episode.support_mask,
            episode.support_target,
            label_reps,
        )?;
        ensure_shape(
            "classification scores",
            &[batch, 1, self.alphabet.pad_free_len()],
            scores.shape(),
        )?;

        match mode {
            Mode::Train => {
                if episode.test_target.ncols() == 0 {
                    return Err(Error::invalid_input(
                        "classification target needs at least one column",
                    ));
                }
                let target = shift_in(&episode.test_target.slice(s![.., ..1]));
                let loss = self
                    .decoder
                    .loss(scores.view(), output_mask.view(), target.view())?;
                Ok(ForwardOutput::Loss(loss))
            }
            Mode::Infer => {
                if let Some(sink) = sink {
                    sink.append(&target_record(episode.test_target))?;
                }
                let labels = self.decoder.decode(scores.view(), output_mask.view())?;
                Ok(ForwardOutput::Prediction(shift_out(&labels)))
            }
        }
    }
}

/// Text classifier conditioned on label-schema representations.
///
/// Label reps are handed to the emission scorer; with a sink attached the raw
/// targets of every inference call are appended to it.
pub struct SchemaFewShotTextClassifier {
    inner: FewShotTextClassifier,
    sink: Option<Arc<dyn TargetSink>>,
}

impl fmt::Debug for SchemaFewShotTextClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaFewShotTextClassifier")
            .field("inner", &self.inner)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl SchemaFewShotTextClassifier {
    /// Wrap a classifier.
    #[must_use]
    pub fn new(inner: FewShotTextClassifier) -> Self {
        Self { inner, sink: None }
    }

    /// Log raw test targets of every inference call to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn TargetSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The wrapped classifier.
    #[must_use]
    pub fn inner(&self) -> &FewShotTextClassifier {
        &self.inner
    }

    /// Like [`FewShotTextClassifier::forward`], with label reps from the episode.
    pub fn forward(&self, episode: &Episode<'_>, mode: Mode) -> Result<ForwardOutput> {
        let label_reps = episode.require_label_reps(&self.inner.alphabet)?;
        self.inner
            .run(episode, Some(label_reps), self.sink.as_deref(), mode)
    }
}
