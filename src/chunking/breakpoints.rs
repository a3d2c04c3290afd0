//! Breakpoint detection over sentence-embedding distances.

use super::config::BreakpointStrategy;
use crate::embeddings::cosine_similarity;

/// Cosine distance: `1 - cosine_similarity`, clamped into `[0, 2]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    (1.0 - cosine_similarity(a, b)).clamp(0.0, 2.0)
}

/// Distances between each consecutive pair of embeddings; length `n - 1`.
pub fn distance_sequence(embeddings: &[Vec<f32>]) -> Vec<f32> {
    embeddings
        .windows(2)
        .map(|pair| cosine_distance(&pair[0], &pair[1]))
        .collect()
}

/// Linearly-interpolated P-th percentile of `values`, P in (0, 100].
pub fn percentile(values: &[f32], p: f32) -> f32 {
    debug_assert!(!values.is_empty());
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (sorted.len() - 1) as f32;
    let lower = rank.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let fraction = rank - lower as f32;
    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

/// Threshold above which a distance marks a topic boundary.
///
/// `None` when the distance sequence is empty (zero or one sentence), in
/// which case no boundaries exist.
pub fn breakpoint_threshold(distances: &[f32], strategy: &BreakpointStrategy) -> Option<f32> {
    if distances.is_empty() {
        return None;
    }
    let threshold = match *strategy {
        BreakpointStrategy::Percentile { threshold } => percentile(distances, threshold),
        BreakpointStrategy::StandardDeviation { multiplier } => {
            let mean = distances.iter().sum::<f32>() / distances.len() as f32;
            let variance = distances
                .iter()
                .map(|d| {
                    let diff = d - mean;
                    diff * diff
                })
                .sum::<f32>()
                / distances.len() as f32;
            mean + multiplier * variance.sqrt()
        }
    };
    Some(threshold)
}

/// Indices `i` where a boundary falls after sentence `i`.
pub fn select_breakpoints(distances: &[f32], threshold: f32) -> Vec<usize> {
    distances
        .iter()
        .enumerate()
        .filter(|(_, distance)| **distance > threshold)
        .map(|(index, _)| index)
        .collect()
}
