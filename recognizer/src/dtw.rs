//! Dynamic time warping over cosine distances between MFCC vectors.

/// Cosine similarity between two vectors, accumulated in f64.
///
/// Mismatched or zero lengths yield 0. Two near-zero vectors count as
/// identical (1.0); a near-zero vector against a real one yields 0. The
/// near-zero tests read the squared sums, so `v` against itself is always
/// 1.0, however small `v` is.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        dot += x as f64 * y as f64;
        norm_a += x as f64 * x as f64;
        norm_b += y as f64 * y as f64;
    }

    // norm_a and norm_b stay squared here; sqrt only feeds the denominator.
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-9 {
        if norm_a < 1e-9 && norm_b < 1e-9 {
            return 1.0;
        }
        return 0.0;
    }
    (dot / denom) as f32
}

/// DTW similarity between a live utterance and a reference sequence,
/// normalized to [0, 1]. Either input empty yields 0.
///
/// Cell cost is `1 - cosine_similarity` with the three standard
/// predecessors (match, insert, delete).
pub fn compute_similarity(live: &[Vec<f32>], reference: &[Vec<f32>]) -> f32 {
    if live.is_empty() || reference.is_empty() {
        return 0.0;
    }

    let n = live.len();
    let m = reference.len();
    let mut dp = vec![vec![f32::INFINITY; m + 1]; n + 1];
    dp[0][0] = 0.0;

    for i in 1..=n {
        for j in 1..=m {
            let cost = 1.0 - cosine_similarity(&live[i - 1], &reference[j - 1]);
            let best = dp[i - 1][j - 1].min(dp[i - 1][j]).min(dp[i][j - 1]);
            dp[i][j] = cost + best;
        }
    }

    normalized_similarity(dp[n][m], n, m)
}

/// Collapses a raw DTW path cost into a [0, 1] similarity score.
fn normalized_similarity(raw_cost: f32, live_len: usize, ref_len: usize) -> f32 {
    let denom = (live_len + ref_len) as f32;
    let similarity = if denom > 1e-6 {
        1.0 - raw_cost / denom
    } else if raw_cost < 1e-6 && (live_len > 0 || ref_len > 0) {
        1.0
    } else {
        0.0
    };
    similarity.clamp(0.0, 1.0)
}
