//! Prediction driver: turns raw likelihood scores into the desired
//! prefetch set.
//!
//! Ranking is fully deterministic so that repeated reconciliation passes
//! over an unchanged prediction produce an identical desired set.

use std::collections::{HashMap, HashSet};

use crate::Key;

/// Derive the ordered desired prefetch set from a likelihood map.
///
/// Keys already resident are dropped, as are candidates whose score
/// breaks the non-negative contract. Zero is a valid score; such
/// candidates sort last and fall away only through truncation. The
/// survivors are ordered by score descending, ties broken by absolute
/// distance to `current` ascending, then by key ascending, and
/// truncated to `limit`.
pub fn rank_candidates(
    likelihoods: HashMap<Key, f64>,
    current: Key,
    resident: &HashSet<Key>,
    limit: usize,
) -> Vec<Key> {
    let mut candidates: Vec<(Key, f64)> = likelihoods
        .into_iter()
        .filter(|(key, score)| !resident.contains(key) && score.is_finite() && *score >= 0.0)
        .collect();

    candidates.sort_by(|(a_key, a_score), (b_key, b_score)| {
        b_score
            .partial_cmp(a_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| current.abs_diff(*a_key).cmp(&current.abs_diff(*b_key)))
            .then_with(|| a_key.cmp(b_key))
    });

    candidates.truncate(limit);
    candidates.into_iter().map(|(key, _)| key).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(Key, f64)]) -> HashMap<Key, f64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_orders_by_score_descending() {
        let ranked = rank_candidates(
            scores(&[(11, 0.5), (12, 1.0), (13, 0.1)]),
            10,
            &HashSet::new(),
            8,
        );
        assert_eq!(ranked, vec![12, 11, 13]);
    }

    #[test]
    fn test_ties_broken_by_distance_then_key() {
        // 8 and 12 are equidistant from 10; the smaller key wins.
        let ranked = rank_candidates(
            scores(&[(12, 1.0), (8, 1.0), (15, 1.0)]),
            10,
            &HashSet::new(),
            8,
        );
        assert_eq!(ranked, vec![8, 12, 15]);
    }

    #[test]
    fn test_filters_resident_and_invalid_scores() {
        let resident: HashSet<Key> = [11].into_iter().collect();
        let ranked = rank_candidates(
            scores(&[(11, 1.0), (12, 0.8), (14, -1.0), (15, f64::NAN)]),
            10,
            &resident,
            8,
        );
        assert_eq!(ranked, vec![12]);
    }

    #[test]
    fn test_zero_scores_rank_last_but_participate() {
        let ranked = rank_candidates(scores(&[(12, 0.8), (13, 0.0)]), 10, &HashSet::new(), 8);
        assert_eq!(ranked, vec![12, 13]);

        // Truncation is the only thing that sheds a zero-scored candidate.
        let ranked = rank_candidates(scores(&[(12, 0.8), (13, 0.0)]), 10, &HashSet::new(), 1);
        assert_eq!(ranked, vec![12]);
    }

    #[test]
    fn test_truncates_to_limit() {
        let ranked = rank_candidates(
            scores(&[(11, 0.9), (12, 0.8), (13, 0.7)]),
            10,
            &HashSet::new(),
            2,
        );
        assert_eq!(ranked, vec![11, 12]);
    }

    #[test]
    fn test_empty_prediction_means_no_speculation() {
        let ranked = rank_candidates(HashMap::new(), 10, &HashSet::new(), 8);
        assert!(ranked.is_empty());
    }
}
