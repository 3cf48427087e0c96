//! Tag alphabet with a reserved pad label.
//!
//! Every alphabet in fewtag carries the pad label at ID 0. Real tags start at
//! ID 1. Structured decoders work over the *pad-free* alphabet, where real tag
//! `i` (full ID) becomes `i - 1`; see [`crate::pad`].
//!
//! ```text
//! full alphabet      [PAD]  O   B-PER  I-PER
//! full ID              0    1     2      3
//! pad-free ID          -    0     1      2
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// ID of the reserved pad label.
pub const PAD_ID: usize = 0;

/// Surface form of the reserved pad label.
pub const PAD_LABEL: &str = "[PAD]";

/// Label alphabet whose ID 0 is always [`PAD_LABEL`].
///
/// Construction validates the pad convention instead of trusting callers to
/// keep it, so an alphabet that exists is always usable by the decoders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct TagAlphabet {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl TagAlphabet {
    /// Build from a full label list whose first entry must be [`PAD_LABEL`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAlphabet`] if ID 0 is not the pad label, if no
    /// real label follows it, or if a label appears twice.
    pub fn new<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Result<Self> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();

        match labels.first() {
            None => return Err(Error::invalid_alphabet("alphabet is empty")),
            Some(first) if first != PAD_LABEL => {
                return Err(Error::invalid_alphabet(format!(
                    "ID {} must be the pad label {:?}, found {:?}",
                    PAD_ID, PAD_LABEL, first
                )))
            }
            Some(_) => {}
        }
        if labels.len() < 2 {
            return Err(Error::invalid_alphabet(
                "alphabet needs at least one real label besides pad",
            ));
        }

        let mut index = HashMap::with_capacity(labels.len());
        for (id, label) in labels.iter().enumerate() {
            if index.insert(label.clone(), id).is_some() {
                return Err(Error::invalid_alphabet(format!(
                    "duplicate label {:?}",
                    label
                )));
            }
        }

        Ok(Self { labels, index })
    }

    /// Build from real labels only; the pad label is prepended.
    pub fn with_pad<S: Into<String>>(real_labels: impl IntoIterator<Item = S>) -> Result<Self> {
        let labels = std::iter::once(PAD_LABEL.to_string())
            .chain(real_labels.into_iter().map(Into::into));
        Self::new(labels)
    }

    /// Size of the full alphabet, pad included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false: a valid alphabet has at least pad plus one real label.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of real labels (the alphabet structured decoders see).
    #[must_use]
    pub fn pad_free_len(&self) -> usize {
        self.labels.len() - 1
    }

    /// Full ID of a label.
    #[must_use]
    pub fn id(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Label for a full ID.
    #[must_use]
    pub fn label(&self, id: usize) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    /// Real labels in pad-free order.
    #[must_use]
    pub fn real_labels(&self) -> &[String] {
        &self.labels[1..]
    }

    /// Map a sequence of full IDs back to labels.
    ///
    /// Unknown IDs are reported rather than skipped.
    pub fn decode(&self, ids: &[usize]) -> Result<Vec<&str>> {
        ids.iter()
            .map(|&id| {
                self.label(id).ok_or_else(|| {
                    Error::invalid_input(format!(
                        "label ID {} outside alphabet of size {}",
                        id,
                        self.len()
                    ))
                })
            })
            .collect()
    }
}

impl TryFrom<Vec<String>> for TagAlphabet {
    type Error = Error;

    fn try_from(labels: Vec<String>) -> Result<Self> {
        Self::new(labels)
    }
}

impl From<TagAlphabet> for Vec<String> {
    fn from(alphabet: TagAlphabet) -> Self {
        alphabet.labels
    }
}
