//! Error types for fewtag-core.

use thiserror::Error;

/// Result type for fewtag operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for fewtag operations.
///
/// Every variant describes a structural precondition that was violated before
/// any numeric work was done. Nothing here is retried; a forward call either
/// completes or fails as a whole.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Two arrays that must agree on their dimensions do not.
    #[error("Shape mismatch for {what}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Which array (or pair of arrays) was checked.
        what: String,
        /// Expected dimensions.
        expected: Vec<usize>,
        /// Actual dimensions.
        got: Vec<usize>,
    },

    /// Tag alphabet does not reserve the pad label at ID 0, or is otherwise malformed.
    #[error("Invalid tag alphabet: {0}")]
    InvalidAlphabet(String),

    /// Label mask is not a square matrix over the full tag alphabet.
    #[error("Invalid label mask: {0}")]
    InvalidLabelMask(String),

    /// Collaborators were wired together inconsistently.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a shape mismatch error.
    #[must_use]
    pub fn shape_mismatch(what: impl Into<String>, expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create an invalid alphabet error.
    #[must_use]
    pub fn invalid_alphabet(msg: impl Into<String>) -> Self {
        Self::InvalidAlphabet(msg.into())
    }

    /// Create an invalid label mask error.
    #[must_use]
    pub fn invalid_label_mask(msg: impl Into<String>) -> Self {
        Self::InvalidLabelMask(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Fail with [`Error::ShapeMismatch`] unless `got == expected`.
///
/// Shapes are compared exactly; no broadcasting is ever attempted.
pub fn ensure_shape(what: &str, expected: &[usize], got: &[usize]) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(Error::shape_mismatch(what, expected, got))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_shape_accepts_equal() {
        assert!(ensure_shape("mask", &[2, 3], &[2, 3]).is_ok());
    }

    #[test]
    fn test_ensure_shape_rejects_broadcastable() {
        let err = ensure_shape("mask", &[2, 3], &[1, 3]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("mask"));
        assert!(msg.contains("[2, 3]"));
        assert!(msg.contains("[1, 3]"));
    }
}
