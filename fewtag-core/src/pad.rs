//! Pad-index shifting between the full and the pad-free tag alphabet.
//!
//! Decoders never see the pad label. Targets are shifted down by one on the
//! way in and predictions shifted up by one on the way out.
//!
//! Shifting in clamps at zero, so pad entries (ID 0) land on pad-free ID 0,
//! the same value as the first real tag. That value is never meaningful: pad
//! positions are excluded from loss and decoding by the output mask, not by
//! their shifted ID.

use ndarray::{Array, ArrayBase, Data, Dimension};

/// Map raw target IDs into the pad-free alphabet (`max(id - 1, 0)`).
#[must_use]
pub fn shift_in<S, D>(target: &ArrayBase<S, D>) -> Array<usize, D>
where
    S: Data<Elem = usize>,
    D: Dimension,
{
    target.mapv(|id| id.saturating_sub(1))
}

/// Map pad-free predictions back into the full alphabet (`id + 1`).
///
/// Returns new sequences; the input is left untouched so callers can keep
/// pad-free predictions around for inspection.
#[must_use]
pub fn shift_out(predictions: &[Vec<usize>]) -> Vec<Vec<usize>> {
    predictions
        .iter()
        .map(|path| path.iter().map(|&id| id + 1).collect())
        .collect()
}
