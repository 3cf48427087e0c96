//! Serde configuration for wiring labelers from files.
//!
//! ```toml
//! emb_log = "runs/emb.log"
//!
//! [emission]
//! similarity = "cosine"
//! scale = 10.0
//! label_weight = 0.5
//!
//! [transition]
//! init = 0.0
//! label_backoff = 0.3
//! label_scale = 1.0
//! ```
//!
//! Every field has a default; an empty document is a valid configuration
//! (dot-product prototypes, no transition scorer, no target log). A
//! `[transition]` table selects the structured decoding path.

use crate::labeler::{
    FewShotSeqLabeler, FewShotTextClassifier, SchemaFewShotSeqLabeler,
    SchemaFewShotTextClassifier,
};
use crate::scoring::{ParamTransitionScorer, PrototypeScorer, Similarity};
use crate::sink::{FileSink, TargetSink};
use crate::{Error, LabelMask, Result, TagAlphabet};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Emission scorer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionConfig {
    /// Token-prototype similarity.
    pub similarity: Similarity,
    /// Multiplier on every score.
    pub scale: f32,
    /// Interpolation toward label reps in `[0, 1]`; schema-aware only.
    pub label_weight: f32,
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            similarity: Similarity::Dot,
            scale: 1.0,
            label_weight: 0.0,
        }
    }
}

/// Transition scorer settings. Present means structured decoding.
///
/// Potentials start out uniform at `init`. With `label_backoff` at 0 and no
/// label mask they never vary, so Viterbi decoding returns the per-token
/// argmax; only the label mask or label-rep backoff shapes the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Initial value of every start, end and pairwise potential.
    pub init: f32,
    /// Weight of label-derived pairwise potentials in `[0, 1]`.
    pub label_backoff: f32,
    /// Scale of label-label similarities.
    pub label_scale: f32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            init: 0.0,
            label_backoff: 0.0,
            label_scale: 1.0,
        }
    }
}

/// Top-level labeler configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelerConfig {
    /// Emission scorer settings.
    pub emission: EmissionConfig,
    /// Transition scorer settings; `None` selects softmax decoding.
    pub transition: Option<TransitionConfig>,
    /// File receiving raw test targets of schema-aware inference calls.
    pub emb_log: Option<PathBuf>,
}

impl LabelerConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)
            .map_err(|e| Error::config(format!("failed to parse TOML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)
            .map_err(|e| Error::config(format!("failed to parse JSON config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self)
            .map_err(|e| Error::config(format!("failed to serialize config: {}", e)))
    }

    /// Reject values the scorers would silently clamp.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.emission.label_weight) {
            return Err(Error::config(format!(
                "emission.label_weight must be in [0, 1], got {}",
                self.emission.label_weight
            )));
        }
        if let Some(t) = &self.transition {
            if !(0.0..=1.0).contains(&t.label_backoff) {
                return Err(Error::config(format!(
                    "transition.label_backoff must be in [0, 1], got {}",
                    t.label_backoff
                )));
            }
        }
        Ok(())
    }

    fn emission_scorer(&self) -> PrototypeScorer {
        PrototypeScorer::new(self.emission.similarity)
            .with_scale(self.emission.scale)
            .with_label_weight(self.emission.label_weight)
    }

    fn sink(&self) -> Result<Option<Arc<dyn TargetSink>>> {
        let Some(path) = &self.emb_log else {
            return Ok(None);
        };
        let sink: Arc<dyn TargetSink> = Arc::new(FileSink::open(path)?);
        Ok(Some(sink))
    }

    /// Sequence labeler with the reference collaborators.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `label_mask` is given without a `[transition]`
    /// section.
    pub fn build_seq_labeler(
        &self,
        alphabet: TagAlphabet,
        label_mask: Option<LabelMask>,
    ) -> Result<FewShotSeqLabeler> {
        let k = alphabet.pad_free_len();
        let mut builder = FewShotSeqLabeler::builder(alphabet, self.emission_scorer());
        if let Some(t) = &self.transition {
            builder = builder.transition(
                ParamTransitionScorer::uniform(k, t.init)?
                    .with_label_backoff(t.label_backoff)
                    .with_label_scale(t.label_scale),
            );
        }
        if let Some(mask) = label_mask {
            builder = builder.label_mask(mask);
        }
        builder.build()
    }

    /// Schema-aware sequence labeler; opens `emb_log` if set.
    pub fn build_schema_seq_labeler(
        &self,
        alphabet: TagAlphabet,
        label_mask: Option<LabelMask>,
    ) -> Result<SchemaFewShotSeqLabeler> {
        let labeler = SchemaFewShotSeqLabeler::new(self.build_seq_labeler(alphabet, label_mask)?);
        Ok(match self.sink()? {
            Some(sink) => labeler.with_sink(sink),
            None => labeler,
        })
    }

    /// Text classifier with the reference emission scorer.
    ///
    /// The transition section, if any, is ignored.
    pub fn build_text_classifier(&self, alphabet: TagAlphabet) -> Result<FewShotTextClassifier> {
        if self.transition.is_some() {
            log::debug!("[fewtag] transition settings ignored for text classification");
        }
        Ok(FewShotTextClassifier::new(alphabet, self.emission_scorer()))
    }

    /// Schema-aware text classifier; opens `emb_log` if set.
    pub fn build_schema_text_classifier(
        &self,
        alphabet: TagAlphabet,
    ) -> Result<SchemaFewShotTextClassifier> {
        let clf = SchemaFewShotTextClassifier::new(self.build_text_classifier(alphabet)?);
        Ok(match self.sink()? {
            Some(sink) => clf.with_sink(sink),
            None => clf,
        })
    }
}
