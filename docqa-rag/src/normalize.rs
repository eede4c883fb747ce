//! Min-max score normalization.
//!
//! Rankers produce scores on unrelated scales (cosine similarity vs. BM25), so
//! each candidate list is rescaled onto `[0, 1]` before fusion. Statistics are
//! taken from the list itself; nothing is carried across queries.

use crate::document::SearchResult;

/// Rescale scores linearly so the maximum becomes `1.0` and the minimum `0.0`.
///
/// Order is preserved. An empty list stays empty, and a list whose scores are
/// all equal maps every score to `0.0`.
pub fn normalize_scores(mut results: Vec<SearchResult>) -> Vec<SearchResult> {
    let Some(first) = results.first() else {
        return results;
    };

    let (min, max) = results
        .iter()
        .fold((first.score, first.score), |(lo, hi), r| (lo.min(r.score), hi.max(r.score)));
    let range = max - min;

    for result in &mut results {
        result.score = if range > 0.0 { (result.score - min) / range } else { 0.0 };
    }
    results
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::document::Chunk;

    fn results(scores: &[f32]) -> Vec<SearchResult> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| SearchResult {
                chunk: Chunk::new(format!("chunk {i}"), "a.txt", "doc"),
                score,
            })
            .collect()
    }

    fn scores(results: &[SearchResult]) -> Vec<f32> {
        results.iter().map(|r| r.score).collect()
    }

    #[test]
    fn maps_extremes_to_unit_interval() {
        let normalized = normalize_scores(results(&[4.0, 2.0, 3.0]));
        assert_eq!(scores(&normalized), vec![1.0, 0.0, 0.5]);
        assert_eq!(normalized[2].chunk.text, "chunk 2");
    }

    #[test]
    fn empty_list_stays_empty() {
        assert!(normalize_scores(Vec::new()).is_empty());
    }

    #[test]
    fn constant_scores_map_to_zero() {
        assert_eq!(scores(&normalize_scores(results(&[0.8, 0.8]))), vec![0.0, 0.0]);
        assert_eq!(scores(&normalize_scores(results(&[3.5]))), vec![0.0]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn normalized_scores_stay_within_bounds(raw in proptest::collection::vec(-50.0f32..50.0, 1..30)) {
            let normalized = scores(&normalize_scores(results(&raw)));
            prop_assert_eq!(normalized.len(), raw.len());
            prop_assert!(normalized.iter().all(|s| (0.0..=1.0).contains(s)));

            let max = raw.iter().cloned().fold(f32::MIN, f32::max);
            let min = raw.iter().cloned().fold(f32::MAX, f32::min);
            let max_idx = raw.iter().position(|&s| s == max).unwrap();
            let min_idx = raw.iter().position(|&s| s == min).unwrap();
            if max > min {
                prop_assert_eq!(normalized[max_idx], 1.0);
                prop_assert_eq!(normalized[min_idx], 0.0);
            } else {
                prop_assert!(normalized.iter().all(|&s| s == 0.0));
            }
        }
    }
}
