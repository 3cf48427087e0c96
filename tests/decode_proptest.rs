//! Property-based tests for the CRF and softmax decoders.

use fewtag::decode::{ConditionalRandomField, SoftmaxLabeler, StructuredDecoder, TokenDecoder};
use fewtag::scoring::TransitionPotentials;
use ndarray::{Array1, Array2, Array3};
use proptest::prelude::*;

/// `(len, num_tags, emissions, transitions, start, end, mask)` for one sentence.
type Case = (usize, usize, Vec<f32>, Vec<f32>, Vec<f32>, Vec<f32>, Vec<bool>);

fn case() -> impl Strategy<Value = Case> {
    (1usize..5, 2usize..4).prop_flat_map(|(len, k)| {
        (
            Just(len),
            Just(k),
            prop::collection::vec(-3.0f32..3.0, len * k),
            prop::collection::vec(-2.0f32..2.0, k * k),
            prop::collection::vec(-1.0f32..1.0, k),
            prop::collection::vec(-1.0f32..1.0, k),
            prop::collection::vec(any::<bool>(), len),
        )
    })
}

fn unpack(c: &Case) -> (Array3<f32>, TransitionPotentials, Array2<bool>) {
    let (len, k, e, t, s, end, m) = c.clone();
    (
        Array3::from_shape_vec((1, len, k), e).unwrap(),
        TransitionPotentials::new(
            Array2::from_shape_vec((k, k), t).unwrap(),
            Array1::from(s),
            Array1::from(end),
        ),
        Array2::from_shape_vec((1, len), m).unwrap(),
    )
}

/// Every tag sequence of length `n` over `k` tags.
fn all_paths(n: usize, k: usize) -> Vec<Vec<usize>> {
    (0..k.pow(n as u32))
        .map(|mut code| {
            (0..n)
                .map(|_| {
                    let t = code % k;
                    code /= k;
                    t
                })
                .collect()
        })
        .collect()
}

/// Place a path over valid positions into a full-length tag row.
fn spread(path: &[usize], mask: &Array2<bool>) -> Array2<usize> {
    let mut tags = Array2::zeros(mask.dim());
    let mut it = path.iter();
    for (pos, &valid) in mask.row(0).iter().enumerate() {
        if valid {
            tags[[0, pos]] = *it.next().unwrap();
        }
    }
    tags
}

proptest! {
    /// INVARIANT: CRF log-likelihood is a log-probability
    #[test]
    fn crf_llh_non_positive(c in case(), seed in any::<u64>()) {
        let (scores, potentials, mask) = unpack(&c);
        let k = c.1;
        let tags = Array2::from_shape_fn(mask.dim(), |(_, i)| ((seed >> (i * 2)) as usize) % k);
        let llh = ConditionalRandomField::new()
            .log_likelihood(scores.view(), &potentials, tags.view(), mask.view())
            .unwrap();
        prop_assert!(llh <= 1e-4, "llh = {}", llh);
    }

    /// INVARIANT: probabilities of all paths sum to one
    #[test]
    fn crf_probabilities_normalised(c in case()) {
        let (scores, potentials, mask) = unpack(&c);
        let n = mask.iter().filter(|&&v| v).count();
        let crf = ConditionalRandomField::new();
        let total: f32 = all_paths(n, c.1)
            .iter()
            .map(|path| {
                let tags = spread(path, &mask);
                crf.log_likelihood(scores.view(), &potentials, tags.view(), mask.view())
                    .unwrap()
                    .exp()
            })
            .sum();
        prop_assert!((total - 1.0).abs() < 1e-3, "total = {}", total);
    }

    /// INVARIANT: the Viterbi path is at least as likely as every other path
    #[test]
    fn viterbi_is_most_likely(c in case()) {
        let (scores, potentials, mask) = unpack(&c);
        let n = mask.iter().filter(|&&v| v).count();
        let crf = ConditionalRandomField::new();
        let best = crf.viterbi_tags(scores.view(), &potentials, mask.view()).unwrap();
        prop_assert_eq!(best.len(), 1);
        prop_assert_eq!(best[0].0.len(), n);

        let llh = |path: &[usize]| {
            let tags = spread(path, &mask);
            crf.log_likelihood(scores.view(), &potentials, tags.view(), mask.view())
                .unwrap()
        };
        let best_llh = llh(&best[0].0);
        for path in all_paths(n, c.1) {
            prop_assert!(best_llh >= llh(&path) - 1e-4);
        }
    }

    /// INVARIANT: softmax loss is non-negative and argmax stays in range
    #[test]
    fn softmax_loss_non_negative(c in case()) {
        let (scores, _, mask) = unpack(&c);
        let k = c.1;
        let tags = Array2::from_shape_fn(mask.dim(), |(_, i)| i % k);
        let labeler = SoftmaxLabeler::new();
        let loss = labeler.loss(scores.view(), mask.view(), tags.view()).unwrap();
        prop_assert!(loss >= 0.0);

        let decoded = labeler.decode(scores.view(), mask.view()).unwrap();
        prop_assert_eq!(decoded[0].len(), mask.iter().filter(|&&v| v).count());
        prop_assert!(decoded[0].iter().all(|&t| t < k));
    }
}
