//! # fewtag-core
//!
//! Core types shared by the fewtag crates:
//!
//! - **Tag alphabet**: `TagAlphabet` with the pad label reserved at ID 0
//! - **Pad shifting**: `shift_in` / `shift_out` between full and pad-free IDs
//! - **Label masks**: `LabelMask` and the transition constraint filter
//! - **Errors**: `Error`, `Result`, and exact shape checks
//!
//! ```rust
//! use fewtag_core::{shift_in, shift_out, TagAlphabet};
//! use ndarray::array;
//!
//! let alphabet = TagAlphabet::with_pad(["O", "B-PER", "I-PER"]).unwrap();
//! assert_eq!(alphabet.pad_free_len(), 3);
//!
//! let target = array![[2usize, 3, 0]];
//! assert_eq!(shift_in(&target), array![[1usize, 2, 0]]);
//! assert_eq!(shift_out(&[vec![1, 2]]), vec![vec![2, 3]]);
//! ```

#![warn(missing_docs)]

pub mod alphabet;
pub mod error;
pub mod label_mask;
pub mod pad;

pub use alphabet::{TagAlphabet, PAD_ID, PAD_LABEL};
pub use error::{ensure_shape, Error, Result};
pub use label_mask::{apply_label_mask, LabelMask};
pub use pad::{shift_in, shift_out};
