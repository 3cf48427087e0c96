//! Property-based tests for pad shifting and the transition constraint filter.

use fewtag::{apply_label_mask, shift_in, shift_out, LabelMask, TagAlphabet, PAD_ID};
use ndarray::{Array1, Array2};
use proptest::prelude::*;

fn alphabet(num_tags: usize) -> TagAlphabet {
    TagAlphabet::with_pad((1..num_tags).map(|i| format!("T{}", i))).unwrap()
}

/// Full-alphabet size, a full mask and pad-free transitions of matching size.
fn mask_and_transitions() -> impl Strategy<Value = (usize, Vec<bool>, Vec<f32>)> {
    (2usize..7).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec(any::<bool>(), n * n),
            prop::collection::vec(-10.0f32..10.0, (n - 1) * (n - 1)),
        )
    })
}

proptest! {
    /// INVARIANT: shift_out(shift_in(ids)) restores every real ID
    #[test]
    fn shift_round_trip_restores_real_ids(
        ids in prop::collection::vec(prop::collection::vec(1usize..100, 0..10), 1..6)
    ) {
        let pad_free: Vec<Vec<usize>> = ids
            .iter()
            .map(|row| shift_in(&Array1::from(row.clone())).to_vec())
            .collect();
        prop_assert_eq!(shift_out(&pad_free), ids);
    }

    /// INVARIANT: shifted-out predictions never contain the pad ID
    #[test]
    fn shift_out_never_pad(
        preds in prop::collection::vec(prop::collection::vec(0usize..20, 0..10), 0..6)
    ) {
        let out = shift_out(&preds);
        prop_assert_eq!(out.len(), preds.len());
        for (row, orig) in out.iter().zip(&preds) {
            prop_assert_eq!(row.len(), orig.len());
            prop_assert!(row.iter().all(|&id| id != PAD_ID));
        }
    }

    /// INVARIANT: shift_in is total and never underflows
    #[test]
    fn shift_in_clamps(raw in prop::collection::vec(0usize..5, 1..20)) {
        let shifted = shift_in(&Array1::from(raw.clone()));
        for (&r, &s) in raw.iter().zip(shifted.iter()) {
            prop_assert_eq!(s, r.saturating_sub(1));
        }
    }

    /// INVARIANT: no mask leaves transitions bit-for-bit unchanged
    #[test]
    fn no_mask_is_identity((n, _mask, values) in mask_and_transitions()) {
        let transitions = Array2::from_shape_vec((n - 1, n - 1), values).unwrap();
        let out = apply_label_mask(transitions.clone(), None).unwrap();
        prop_assert_eq!(out, transitions);
    }

    /// INVARIANT: disallowed transitions are exactly zero, allowed ones untouched
    #[test]
    fn mask_zeroes_exactly_disallowed((n, mask, values) in mask_and_transitions()) {
        let alphabet = alphabet(n);
        let mask = LabelMask::new(Array2::from_shape_vec((n, n), mask).unwrap(), &alphabet).unwrap();
        let transitions = Array2::from_shape_vec((n - 1, n - 1), values).unwrap();
        let out = apply_label_mask(transitions.clone(), Some(&mask)).unwrap();

        for i in 0..n - 1 {
            for j in 0..n - 1 {
                if mask.allows(i + 1, j + 1) {
                    prop_assert_eq!(out[[i, j]], transitions[[i, j]]);
                } else {
                    prop_assert_eq!(out[[i, j]], 0.0);
                }
            }
        }
    }

    /// INVARIANT: pad row and column never influence the result
    #[test]
    fn pad_row_and_column_ignored((n, mask, values) in mask_and_transitions()) {
        let alphabet = alphabet(n);
        let mut raw = Array2::from_shape_vec((n, n), mask).unwrap();
        let transitions = Array2::from_shape_vec((n - 1, n - 1), values).unwrap();
        let before = apply_label_mask(
            transitions.clone(),
            Some(&LabelMask::new(raw.clone(), &alphabet).unwrap()),
        )
        .unwrap();

        raw.row_mut(0).mapv_inplace(|v| !v);
        raw.column_mut(0).mapv_inplace(|v| !v);
        let after = apply_label_mask(
            transitions,
            Some(&LabelMask::new(raw, &alphabet).unwrap()),
        )
        .unwrap();
        prop_assert_eq!(before, after);
    }
}

#[test]
fn mask_shape_mismatch_is_error() {
    let mask = LabelMask::allow_all(&alphabet(4));
    let transitions = Array2::<f32>::zeros((2, 2));
    assert!(apply_label_mask(transitions, Some(&mask)).is_err());
}

#[test]
fn negative_transitions_become_zero() {
    let alphabet = alphabet(3);
    let mut raw = Array2::from_elem((3, 3), true);
    raw[[1, 2]] = false;
    let mask = LabelMask::new(raw, &alphabet).unwrap();
    let transitions = Array2::from_elem((2, 2), -7.5f32);
    let out = apply_label_mask(transitions, Some(&mask)).unwrap();
    assert_eq!(out[[0, 1]], 0.0);
    assert!(out[[0, 1]].is_sign_positive());
    assert_eq!(out[[0, 0]], -7.5);
}
