//! Cosine similarity and bounded top-K selection.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// `dot / (|a| * |b|)` over the shared prefix of `a` and `b`, accumulated in f64.
///
/// Returns `0.0` when either prefix has zero norm or the result is not finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let len = a.len().min(b.len());
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a[..len].iter().zip(&b[..len]) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

/// Heap entry ordered so that "greater" means "better": higher score first,
/// then earlier position.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f64,
    position: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.position.cmp(&self.position))
    }
}

/// Positions and scores of the `k` best items, best first.
///
/// One pass with a min-heap capped at `k`. On equal scores the earlier item
/// wins, both for admission and in the final order.
pub fn top_k_positions<I>(scores: I, k: usize) -> Vec<(usize, f64)>
where
    I: IntoIterator<Item = f64>,
{
    if k == 0 {
        return Vec::new();
    }
    let mut heap = BinaryHeap::with_capacity(k + 1);
    for (position, score) in scores.into_iter().enumerate() {
        let candidate = Candidate { score, position };
        if heap.len() < k {
            heap.push(Reverse(candidate));
        } else if heap.peek().is_some_and(|Reverse(worst)| candidate > *worst) {
            heap.pop();
            heap.push(Reverse(candidate));
        }
    }

    let mut best: Vec<Candidate> = heap.into_iter().map(|Reverse(c)| c).collect();
    best.sort_unstable_by(|a, b| b.cmp(a));
    best.into_iter().map(|c| (c.position, c.score)).collect()
}
