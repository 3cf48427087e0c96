//! Few-shot sequence labeling.
//!
//! # Decoding paths
//!
//! The path is fixed when the labeler is built:
//!
//! | Transition scorer | Label mask | Path |
//! |-------------------|------------|------|
//! | yes | optional | structured (CRF) |
//! | no | none | unstructured (softmax) |
//! | no | some | rejected at build time |
//!
//! # Example
//!
//! ```rust
//! use fewtag::decode::ConditionalRandomField;
//! use fewtag::labeler::FewShotSeqLabeler;
//! use fewtag::scoring::{ParamTransitionScorer, PrototypeScorer};
//! use fewtag::{LabelMask, TagAlphabet};
//!
//! let alphabet = TagAlphabet::with_pad(["B-PER", "I-PER", "O"]).unwrap();
//! let labeler = FewShotSeqLabeler::builder(alphabet.clone(), PrototypeScorer::default())
//!     .transition(ParamTransitionScorer::uniform(3, 0.0).unwrap())
//!     .structured_decoder(ConditionalRandomField::new())
//!     .label_mask(LabelMask::bio(&alphabet))
//!     .build()
//!     .unwrap();
//! assert!(labeler.is_structured());
//! ```

use super::{Episode, ForwardOutput, Mode};
use crate::decode::{ConditionalRandomField, SoftmaxLabeler, StructuredDecoder, TokenDecoder};
use crate::scoring::{EmissionScorer, TransitionPotentials, TransitionScorer};
use crate::sink::{target_record, TargetSink};
use crate::{
    apply_label_mask, ensure_shape, shift_in, shift_out, Error, LabelMask, Result, TagAlphabet,
};
use ndarray::{Array3, ArrayView2, ArrayView3, Axis, Zip};
use std::fmt;
use std::sync::Arc;

/// How scores are turned into a loss or predictions.
enum DecodingPath {
    Structured {
        transition: Box<dyn TransitionScorer>,
        decoder: Box<dyn StructuredDecoder>,
        label_mask: Option<LabelMask>,
    },
    Unstructured {
        decoder: Box<dyn TokenDecoder>,
    },
}

/// Builder for [`FewShotSeqLabeler`].
#[must_use]
pub struct FewShotSeqLabelerBuilder {
    alphabet: TagAlphabet,
    emission: Box<dyn EmissionScorer>,
    transition: Option<Box<dyn TransitionScorer>>,
    structured_decoder: Option<Box<dyn StructuredDecoder>>,
    token_decoder: Option<Box<dyn TokenDecoder>>,
    label_mask: Option<LabelMask>,
}

impl FewShotSeqLabelerBuilder {
    /// Enable the structured path with this transition scorer.
    pub fn transition<T: TransitionScorer + 'static>(self, transition: T) -> Self {
        self.transition_boxed(Box::new(transition))
    }

    /// Enable the structured path with a boxed transition scorer.
    pub fn transition_boxed(mut self, transition: Box<dyn TransitionScorer>) -> Self {
        self.transition = Some(transition);
        self
    }

    /// Decoder for the structured path (default: [`ConditionalRandomField`]).
    pub fn structured_decoder<D: StructuredDecoder + 'static>(mut self, decoder: D) -> Self {
        self.structured_decoder = Some(Box::new(decoder));
        self
    }

    /// Decoder for the unstructured path (default: [`SoftmaxLabeler`]).
    pub fn token_decoder<D: TokenDecoder + 'static>(mut self, decoder: D) -> Self {
        self.token_decoder = Some(Box::new(decoder));
        self
    }

    /// Constrain transitions with a full-alphabet label mask.
    pub fn label_mask(mut self, label_mask: LabelMask) -> Self {
        self.label_mask = Some(label_mask);
        self
    }

    /// Fix the decoding path and build the labeler.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if a label mask is given without a transition scorer
    /// - [`Error::InvalidLabelMask`] if the mask does not cover the alphabet
    pub fn build(self) -> Result<FewShotSeqLabeler> {
        if let Some(mask) = &self.label_mask {
            if mask.num_tags() != self.alphabet.len() {
                return Err(Error::invalid_label_mask(format!(
                    "mask covers {} tags but the alphabet has {}",
                    mask.num_tags(),
                    self.alphabet.len()
                )));
            }
        }

        let path = match self.transition {
            Some(transition) => DecodingPath::Structured {
                transition,
                decoder: self
                    .structured_decoder
                    .unwrap_or_else(|| Box::new(ConditionalRandomField::new())),
                label_mask: self.label_mask,
            },
            None => {
                if self.label_mask.is_some() {
                    return Err(Error::config(
                        "a label mask needs a transition scorer to act on",
                    ));
                }
                DecodingPath::Unstructured {
                    decoder: self
                        .token_decoder
                        .unwrap_or_else(|| Box::new(SoftmaxLabeler::new())),
                }
            }
        };

        let labeler = FewShotSeqLabeler {
            alphabet: self.alphabet,
            emission: self.emission,
            path,
        };
        log::debug!(
            "[fewtag] seq labeler: emission={}, decoder={}, label_mask={}, tags={}",
            labeler.emission.name(),
            labeler.decoder_name(),
            labeler.has_label_mask(),
            labeler.alphabet.pad_free_len()
        );
        Ok(labeler)
    }
}

/// Few-shot sequence labeler: emission scoring plus CRF or softmax decoding.
///
/// Targets and predictions use the full alphabet (0 = pad); decoders only
/// ever see pad-free IDs.
pub struct FewShotSeqLabeler {
    alphabet: TagAlphabet,
    emission: Box<dyn EmissionScorer>,
    path: DecodingPath,
}

impl fmt::Debug for FewShotSeqLabeler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FewShotSeqLabeler")
            .field("alphabet", &self.alphabet)
            .field("emission", &self.emission.name())
            .field("decoder", &self.decoder_name())
            .field("label_mask", &self.has_label_mask())
            .finish()
    }
}

impl FewShotSeqLabeler {
    /// Start building a labeler over `alphabet` with the given emission scorer.
    pub fn builder<E: EmissionScorer + 'static>(
        alphabet: TagAlphabet,
        emission: E,
    ) -> FewShotSeqLabelerBuilder {
        Self::builder_boxed(alphabet, Box::new(emission))
    }

    /// Same as [`builder`](Self::builder) for an already boxed scorer.
    pub fn builder_boxed(
        alphabet: TagAlphabet,
        emission: Box<dyn EmissionScorer>,
    ) -> FewShotSeqLabelerBuilder {
        FewShotSeqLabelerBuilder {
            alphabet,
            emission,
            transition: None,
            structured_decoder: None,
            token_decoder: None,
            label_mask: None,
        }
    }

    /// Tag alphabet, pad included.
    #[must_use]
    pub fn alphabet(&self) -> &TagAlphabet {
        &self.alphabet
    }

    /// Whether decoding goes through the transition scorer and CRF.
    #[must_use]
    pub fn is_structured(&self) -> bool {
        matches!(self.path, DecodingPath::Structured { .. })
    }

    /// Whether a label mask constrains transitions.
    #[must_use]
    pub fn has_label_mask(&self) -> bool {
        matches!(
            self.path,
            DecodingPath::Structured {
                label_mask: Some(_),
                ..
            }
        )
    }

    /// Name of the active decoder.
    #[must_use]
    pub fn decoder_name(&self) -> &'static str {
        match &self.path {
            DecodingPath::Structured { decoder, .. } => decoder.name(),
            DecodingPath::Unstructured { decoder } => decoder.name(),
        }
    }

    /// Loss in [`Mode::Train`], full-alphabet predictions in [`Mode::Infer`].
    pub fn forward(&self, episode: &Episode<'_>, mode: Mode) -> Result<ForwardOutput> {
        self.run(episode, None, None, mode)
    }

    /// Training loss for one episode.
    pub fn loss(&self, episode: &Episode<'_>) -> Result<f32> {
        let scores = self.emissions(episode, None)?;
        self.train_loss(episode, scores.view(), None)
    }

    /// Full-alphabet predictions for one episode, one entry per valid token.
    pub fn predict(&self, episode: &Episode<'_>) -> Result<Vec<Vec<usize>>> {
        let scores = self.emissions(episode, None)?;
        self.infer(episode, scores.view(), None)
    }

    pub(crate) fn run(
        &self,
        episode: &Episode<'_>,
        label_reps: Option<ArrayView3<'_, f32>>,
        sink: Option<&dyn TargetSink>,
        mode: Mode,
    ) -> Result<ForwardOutput> {
        log::trace!(
            "[fewtag] seq forward: mode={:?}, test={:?}, support={:?}",
            mode,
            episode.test_reps.shape(),
            episode.support_reps.shape()
        );
        let scores = self.emissions(episode, label_reps)?;
        match mode {
            Mode::Train => Ok(ForwardOutput::Loss(self.train_loss(
                episode,
                scores.view(),
                label_reps,
            )?)),
            Mode::Infer => {
                if let Some(sink) = sink {
                    sink.append(&target_record(episode.test_target))?;
                }
                Ok(ForwardOutput::Prediction(self.infer(
                    episode,
                    scores.view(),
                    label_reps,
                )?))
            }
        }
    }

    /// Validate the episode and compute `(batch, len, K)` emission scores.
    fn emissions(
        &self,
        episode: &Episode<'_>,
        label_reps: Option<ArrayView3<'_, f32>>,
    ) -> Result<Array3<f32>> {
        let (batch, len, _) = episode.test_reps.dim();
        ensure_shape("test mask vs test reps", &[batch, len], episode.test_mask.shape())?;
        ensure_shape("test target vs test mask", &[batch, len], episode.test_target.shape())?;
        episode.check_support(&self.alphabet)?;

        let scores = self.emission.score(
            episode.test_reps,
            episode.support_reps,
            episode.test_mask,
            episode.support_mask,
            episode.support_target,
            label_reps,
        )?;
        ensure_shape(
            "emission scores",
            &[batch, len, self.alphabet.pad_free_len()],
            scores.shape(),
        )?;
        Ok(scores)
    }

    fn train_loss(
        &self,
        episode: &Episode<'_>,
        scores: ArrayView3<'_, f32>,
        label_reps: Option<ArrayView3<'_, f32>>,
    ) -> Result<f32> {
        let target = shift_in(&episode.test_target);
        match &self.path {
            DecodingPath::Structured {
                transition,
                decoder,
                label_mask,
            } => {
                let potentials =
                    Self::potentials(transition.as_ref(), label_mask.as_ref(), episode, label_reps)?;
                let llh =
                    decoder.log_likelihood(scores, &potentials, target.view(), episode.test_mask)?;
                Ok(-llh)
            }
            DecodingPath::Unstructured { decoder } => {
                decoder.loss(scores, episode.test_mask, target.view())
            }
        }
    }

    fn infer(
        &self,
        episode: &Episode<'_>,
        scores: ArrayView3<'_, f32>,
        label_reps: Option<ArrayView3<'_, f32>>,
    ) -> Result<Vec<Vec<usize>>> {
        let paths = match &self.path {
            DecodingPath::Structured {
                transition,
                decoder,
                label_mask,
            } => {
                let potentials =
                    Self::potentials(transition.as_ref(), label_mask.as_ref(), episode, label_reps)?;
                decoder
                    .viterbi_tags(scores, &potentials, episode.test_mask)?
                    .into_iter()
                    .map(|(path, _score)| path)
                    .collect::<Vec<_>>()
            }
            DecodingPath::Unstructured { decoder } => decoder.decode(scores, episode.test_mask)?,
        };
        Ok(shift_out(&paths))
    }

    /// Transition potentials with the label mask applied.
    fn potentials(
        transition: &dyn TransitionScorer,
        label_mask: Option<&LabelMask>,
        episode: &Episode<'_>,
        label_reps: Option<ArrayView3<'_, f32>>,
    ) -> Result<TransitionPotentials> {
        let schema = label_reps.map(shared_schema).transpose()?.flatten();
        let mut potentials =
            transition.score(episode.test_reps, episode.support_target, schema)?;
        potentials.transitions = apply_label_mask(potentials.transitions, label_mask)?;
        Ok(potentials)
    }
}

/// The single label schema of a batch.
///
/// Transition potentials are shared across the batch, so every element must
/// carry the same label reps. Elements are compared bitwise, so identical
/// reps holding NaN still count as one schema. `None` for an empty batch.
fn shared_schema(label_reps: ArrayView3<'_, f32>) -> Result<Option<ArrayView2<'_, f32>>> {
    if label_reps.dim().0 == 0 {
        return Ok(None);
    }
    let first = label_reps.index_axis_move(Axis(0), 0);
    for (b, other) in label_reps.axis_iter(Axis(0)).enumerate().skip(1) {
        let same = Zip::from(&other)
            .and(&first)
            .all(|a, f| a.to_bits() == f.to_bits());
        if !same {
            return Err(Error::invalid_input(format!(
                "label reps of batch element {} differ from element 0; \
                 transition scoring needs one schema per batch",
                b
            )));
        }
    }
    Ok(Some(first))
}

/// Sequence labeler that also conditions on label-schema representations.
///
/// Every forward call must supply `label_reps` of shape `(batch, K, dim)`.
/// With a sink attached, inference calls append the raw test targets before
/// decoding; the sink never influences the returned predictions.
pub struct SchemaFewShotSeqLabeler {
    inner: FewShotSeqLabeler,
    sink: Option<Arc<dyn TargetSink>>,
}

impl fmt::Debug for SchemaFewShotSeqLabeler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaFewShotSeqLabeler")
            .field("inner", &self.inner)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl SchemaFewShotSeqLabeler {
    /// Wrap a built labeler.
    #[must_use]
    pub fn new(inner: FewShotSeqLabeler) -> Self {
        Self { inner, sink: None }
    }

    /// Log raw test targets of every inference call to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn TargetSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The wrapped labeler.
    #[must_use]
    pub fn inner(&self) -> &FewShotSeqLabeler {
        &self.inner
    }

    /// Whether a target sink is attached.
    #[must_use]
    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Like [`FewShotSeqLabeler::forward`], with label reps taken from the episode.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if the episode has no label reps, or if they
    /// differ across the batch on the structured path.
    pub fn forward(&self, episode: &Episode<'_>, mode: Mode) -> Result<ForwardOutput> {
        let label_reps = episode.require_label_reps(&self.inner.alphabet)?;
        self.inner
            .run(episode, Some(label_reps), self.sink.as_deref(), mode)
    }
}
