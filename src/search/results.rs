use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

/// Search results container
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub documents: Vec<SearchHit>,
    pub elapsed: Duration,
    pub total_candidates: u64,  // Documents fully scored
    pub complete: bool,         // false when a deadline or cancel cut the search short
}

/// Document with relevance score
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
}

/// A scored document number, ordered so that the heap top is the worst hit:
/// lower score first, then higher document number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    pub doc: u32,
    pub score: f32,
}

impl ScoredDoc {
    pub fn new(doc: u32, score: f32) -> Self {
        ScoredDoc { doc, score }
    }

    /// Score descending, then document number ascending.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other.score.total_cmp(&self.score).then(self.doc.cmp(&other.doc))
    }
}

impl Eq for ScoredDoc {}

impl PartialOrd for ScoredDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredDoc {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank_cmp(other)
    }
}

/// Top-K collector for efficient result collection
pub struct TopKCollector {
    heap: BinaryHeap<ScoredDoc>,
    k: usize,
    pub total_collected: u64,  // Track total documents processed
}

impl TopKCollector {
    pub fn new(k: usize) -> Self {
        TopKCollector {
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(4096)),
            k,
            total_collected: 0,
        }
    }

    pub fn collect(&mut self, doc: u32, score: f32) {
        self.total_collected += 1;
        if self.k == 0 {
            return;
        }
        let hit = ScoredDoc::new(doc, score);
        if self.heap.len() < self.k {
            self.heap.push(hit);
        } else if let Some(worst) = self.heap.peek() {
            if hit < *worst {
                self.heap.pop();
                self.heap.push(hit);
            }
        }
    }

    /// Score a document must reach to matter; `None` until the heap is full.
    pub fn threshold(&self) -> Option<f32> {
        if self.k > 0 && self.heap.len() >= self.k {
            self.heap.peek().map(|worst| worst.score)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Best hit first.
    pub fn into_sorted(self) -> Vec<ScoredDoc> {
        self.heap.into_sorted_vec()
    }
}

/// Per-segment outcome of a query.
#[derive(Debug, Clone, Default)]
pub struct SegmentHits {
    pub hits: Vec<ScoredDoc>,
    pub scored: u64,
    pub complete: bool,
}

/// Merge per-segment top lists into the global top `k`.
pub fn merge_top_k(parts: Vec<SegmentHits>, k: usize) -> SegmentHits {
    let mut merged = SegmentHits { complete: true, ..SegmentHits::default() };
    let mut all = Vec::new();
    for part in parts {
        merged.scored += part.scored;
        merged.complete &= part.complete;
        all.extend(part.hits);
    }
    all.sort_unstable_by(ScoredDoc::rank_cmp);
    all.truncate(k);
    merged.hits = all;
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_best_k_with_doc_tie_break() {
        let mut collector = TopKCollector::new(3);
        for (doc, score) in [(5, 1.0), (1, 2.0), (9, 2.0), (3, 2.0), (7, 0.5)] {
            collector.collect(doc, score);
        }
        assert_eq!(collector.total_collected, 5);
        assert_eq!(collector.threshold(), Some(2.0));
        let docs: Vec<u32> = collector.into_sorted().iter().map(|h| h.doc).collect();
        assert_eq!(docs, vec![1, 3, 9]);
    }

    #[test]
    fn threshold_waits_for_full_heap() {
        let mut collector = TopKCollector::new(2);
        collector.collect(0, 4.0);
        assert_eq!(collector.threshold(), None);
        collector.collect(1, 3.0);
        assert_eq!(collector.threshold(), Some(3.0));
    }

    #[test]
    fn zero_k_only_counts() {
        let mut collector = TopKCollector::new(0);
        collector.collect(0, 1.0);
        collector.collect(1, 2.0);
        assert_eq!(collector.total_collected, 2);
        assert_eq!(collector.threshold(), None);
        assert!(collector.into_sorted().is_empty());
    }

    #[test]
    fn merge_orders_across_segments() {
        let a = SegmentHits { hits: vec![ScoredDoc::new(0, 3.0), ScoredDoc::new(2, 1.0)], scored: 4, complete: true };
        let b = SegmentHits { hits: vec![ScoredDoc::new(10, 3.0), ScoredDoc::new(11, 2.0)], scored: 2, complete: false };
        let merged = merge_top_k(vec![b, a], 3);
        let docs: Vec<u32> = merged.hits.iter().map(|h| h.doc).collect();
        assert_eq!(docs, vec![0, 10, 11]);
        assert_eq!(merged.scored, 6);
        assert!(!merged.complete);
    }
}
