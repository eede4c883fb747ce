//! Answer confidence heuristic.

/// Weight of the mean evidence relevance score.
pub const RETRIEVAL_WEIGHT: f32 = 0.5;
/// Weight of the citation count signal.
pub const CITATION_WEIGHT: f32 = 0.3;
/// Weight of the answer length signal.
pub const SUBSTANCE_WEIGHT: f32 = 0.2;

/// Citation count at which the citation signal saturates.
const CITATION_SATURATION: f32 = 3.0;
/// Answer length, in characters, at which the substance signal saturates.
const SUBSTANCE_SATURATION: f32 = 200.0;

/// Answers starting with this phrase (any case) are refusals.
pub const REFUSAL_PREFIX: &str = "i don't have";

/// Estimate how far an answer can be trusted, in `[0, 1]`.
///
/// Combines the mean of `evidence_scores` (the relevance of the chunks shown
/// to the generator), the number of citations (saturating at 3) and the
/// answer length in characters (saturating at 200). Empty answers and
/// refusals score exactly `0.0`.
pub fn estimate_confidence(answer: &str, evidence_scores: &[f32], citation_count: usize) -> f32 {
    if is_refusal(answer) {
        return 0.0;
    }

    let retrieval = if evidence_scores.is_empty() {
        0.0
    } else {
        evidence_scores.iter().sum::<f32>() / evidence_scores.len() as f32
    };
    let citations = (citation_count as f32 / CITATION_SATURATION).min(1.0);
    let substance = (answer.chars().count() as f32 / SUBSTANCE_SATURATION).min(1.0);

    let confidence =
        RETRIEVAL_WEIGHT * retrieval + CITATION_WEIGHT * citations + SUBSTANCE_WEIGHT * substance;
    if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) }
}

/// Whether `answer` is empty or declines to answer.
pub fn is_refusal(answer: &str) -> bool {
    if answer.is_empty() {
        return true;
    }
    answer
        .get(..REFUSAL_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(REFUSAL_PREFIX))
}
