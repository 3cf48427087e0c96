//! # fewtag
//!
//! Decision layer for few-shot sequence labeling and text classification.
//!
//! Given encoded test and support sentences, a labeler scores every test
//! token against every label and either returns a training loss or decodes
//! label predictions:
//!
//! - **Structured**: emission scores plus transition potentials, decoded by a
//!   linear-chain CRF (log-likelihood for training, Viterbi for inference)
//! - **Unstructured**: per-token softmax (cross-entropy / argmax)
//! - **Schema-aware**: label representations feed both scorers; raw test
//!   targets can be logged to a [`TargetSink`](sink::TargetSink)
//!
//! ## Label IDs
//!
//! ```text
//!   full alphabet     [PAD]   B-PER   I-PER   O
//!   full ID             0       1       2     3
//!                               │       │     │   shift_in  (id - 1, clamped)
//!                               ▼       ▼     ▼
//!   pad-free ID                 0       1     2   ◄─ scorers and decoders
//!                               │       │     │   shift_out (id + 1)
//!                               ▼       ▼     ▼
//!   prediction                  1       2     3
//! ```
//!
//! Targets and predictions crossing the public API always use full IDs.
//!
//! ## Quick Start
//!
//! ```rust
//! use fewtag::labeler::{Episode, FewShotSeqLabeler, Mode};
//! use fewtag::scoring::{ParamTransitionScorer, PrototypeScorer};
//! use fewtag::TagAlphabet;
//! use ndarray::{array, Array3, Array4};
//!
//! let alphabet = TagAlphabet::with_pad(["PER", "O"]).unwrap();
//! let labeler = FewShotSeqLabeler::builder(alphabet, PrototypeScorer::default())
//!     .transition(ParamTransitionScorer::uniform(2, 0.0).unwrap())
//!     .build()
//!     .unwrap();
//!
//! // one support sentence: "Alice"=PER, "ran"=O
//! let support_reps = Array4::from_shape_vec((1, 1, 2, 2), vec![1.0, 0.0, 0.0, 1.0]).unwrap();
//! let mut support_target = Array4::<f32>::zeros((1, 1, 2, 3));
//! support_target[[0, 0, 0, 1]] = 1.0;
//! support_target[[0, 0, 1, 2]] = 1.0;
//!
//! let test_reps = Array3::from_shape_vec((1, 2, 2), vec![0.1, 0.9, 0.8, 0.2]).unwrap();
//! let test_mask = array![[true, true]];
//! let test_target = array![[2usize, 1]];
//! let support_mask = Array3::from_elem((1, 1, 2), true);
//! let support_num = array![1usize];
//!
//! let episode = Episode {
//!     test_reps: test_reps.view(),
//!     test_mask: test_mask.view(),
//!     support_reps: support_reps.view(),
//!     support_mask: support_mask.view(),
//!     test_target: test_target.view(),
//!     support_target: support_target.view(),
//!     support_num: support_num.view(),
//!     label_reps: None,
//! };
//!
//! let out = labeler.forward(&episode, Mode::Infer).unwrap();
//! assert_eq!(out.prediction(), Some(&[vec![2, 1]][..]));
//! ```
//!
//! ## Configuration
//!
//! [`LabelerConfig`](config::LabelerConfig) wires the reference scorers from
//! TOML or JSON:
//!
//! ```rust
//! use fewtag::config::LabelerConfig;
//! use fewtag::{LabelMask, TagAlphabet};
//!
//! let config = LabelerConfig::from_toml_str("[transition]\ninit = 0.0").unwrap();
//! let alphabet = TagAlphabet::with_pad(["B-LOC", "I-LOC", "O"]).unwrap();
//! let mask = LabelMask::bio(&alphabet);
//! let labeler = config.build_seq_labeler(alphabet, Some(mask)).unwrap();
//! assert!(labeler.has_label_mask());
//! ```
//!
//! ## Logging
//!
//! fewtag logs through the [`log`] facade (`debug` when a labeler is built,
//! `trace` per forward call) and never installs a logger itself.

#![warn(missing_docs)]

pub mod config;
pub mod decode;
pub mod labeler;
pub mod scoring;
pub mod sink;
pub mod sync;

pub use fewtag_core::{
    apply_label_mask, ensure_shape, shift_in, shift_out, Error, LabelMask, Result, TagAlphabet,
    PAD_ID, PAD_LABEL,
};

pub use config::LabelerConfig;
pub use labeler::{
    Episode, FewShotSeqLabeler, FewShotTextClassifier, ForwardOutput, Mode,
    SchemaFewShotSeqLabeler, SchemaFewShotTextClassifier,
};
