use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// One kept result.
#[derive(Debug, Clone)]
struct HeapEntry {
    score: f64,
    external_id: String,
}

// The heap keeps the *worst* kept result at the root so it can be
// evicted cheaply: worst means lowest score, ties broken toward the
// lexicographically largest external id.
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.external_id.cmp(&other.external_id))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

/// The top n search results, collected over a DAAT evaluation.
pub struct ResultHeap {
    heap: BinaryHeap<HeapEntry>,
    max_size: usize,
}

impl ResultHeap {
    /// An empty heap that keeps at most n results.
    pub fn new(max_size: usize) -> Self {
        ResultHeap {
            heap: BinaryHeap::with_capacity(max_size + 1),
            max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn is_full(&self) -> bool {
        self.heap.len() >= self.max_size
    }

    /// True when the score alone already rules the result out. The
    /// common case over a large corpus; callers check this before
    /// paying for the external id lookup.
    pub fn would_reject(&self, score: f64) -> bool {
        self.is_full()
            && self
                .heap
                .peek()
                .map(|worst| worst.score > score)
                .unwrap_or(true)
    }

    pub fn add(&mut self, score: f64, external_id: String) {
        if !self.is_full() {
            self.heap.push(HeapEntry { score, external_id });
            return;
        }

        // Replace the worst kept result only if the new one beats it:
        // higher score, or the same score with a smaller external id.
        if let Some(worst) = self.heap.peek() {
            if worst.score < score || (worst.score == score && worst.external_id > external_id) {
                self.heap.pop();
                self.heap.push(HeapEntry { score, external_id });
            }
        }
    }

    /// The results in ranking order: descending score, ascending
    /// external id.
    pub fn into_ranking(self) -> Vec<(f64, String)> {
        let mut results: Vec<(f64, String)> = self
            .heap
            .into_iter()
            .map(|entry| (entry.score, entry.external_id))
            .collect();
        results.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        results
    }
}
