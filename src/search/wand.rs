use crate::core::cancel::StopCondition;
use crate::core::error::Result;
use crate::core::types::TermHash;
use crate::index::posting::TermPostings;
use crate::index::segment::SegmentSource;
use crate::search::cursor::{TermCursor, END_DOC};
use crate::search::results::{SegmentHits, TopKCollector};

/// Loop iterations between two deadline/cancel checks.
pub const STOP_CHECK_STEPS: u64 = 256;

/// Relative slack on upper bounds. Bounds are summed in cursor order while
/// scores are summed in query-term order, so they may differ in the last bits.
const BOUND_SLACK: f32 = 1e-5;

#[inline]
pub(crate) fn can_reach(bound: f32, threshold: f32) -> bool {
    bound * (1.0 + BOUND_SLACK) >= threshold
}

/// Disjunctive top-k over one segment: Block-Max WAND for several terms,
/// straight block skipping for one.
pub fn search_any(
    segment: &dyn SegmentSource,
    terms: &[TermHash],
    k: usize,
    stop: &StopCondition,
) -> Result<SegmentHits> {
    let mut present = Vec::with_capacity(terms.len());
    for (idx, &term) in terms.iter().enumerate() {
        if let Some(postings) = segment.postings(term)? {
            present.push((idx, postings));
        }
    }
    match present.len() {
        0 => Ok(SegmentHits { complete: true, ..SegmentHits::default() }),
        1 => single_term(segment, &present[0].1, k, stop),
        _ => {
            let cursors = present
                .into_iter()
                .map(|(idx, postings)| TermCursor::new(postings, idx))
                .collect::<Result<Vec<_>>>()?;
            block_max_wand(segment, cursors, k, stop)
        }
    }
}

fn single_term(
    segment: &dyn SegmentSource,
    postings: &TermPostings<'_>,
    k: usize,
    stop: &StopCondition,
) -> Result<SegmentHits> {
    let stats = segment.stats();
    let scorer = stats.scorer();
    let avg = stats.avg_doc_len as f32;
    let mut collector = TopKCollector::new(k);
    let (mut docs, mut freqs) = (Vec::new(), Vec::new());
    let mut steps = 0u64;
    let mut complete = true;

    'blocks: for i in 0..postings.block_count() {
        if let Some(threshold) = collector.threshold() {
            if !can_reach(postings.block(i).max_score, threshold) {
                continue;
            }
        }
        postings.decode_block(i, &mut docs, &mut freqs)?;
        for (&doc, &freq) in docs.iter().zip(&freqs) {
            if steps % STOP_CHECK_STEPS == 0 && stop.should_stop() {
                complete = false;
                break 'blocks;
            }
            steps += 1;
            let score = scorer.score(postings.idf, freq, segment.doc_len(doc), avg);
            collector.collect(doc, score);
        }
    }

    Ok(SegmentHits {
        scored: collector.total_collected,
        hits: collector.into_sorted(),
        complete,
    })
}

fn find_pivot(cursors: &[TermCursor<'_>], threshold: Option<f32>) -> Option<usize> {
    let Some(threshold) = threshold else {
        // Heap not full yet: every document is worth scoring.
        return (!cursors[0].is_exhausted()).then_some(0);
    };
    let mut upper = 0.0f32;
    for (i, cursor) in cursors.iter().enumerate() {
        if cursor.is_exhausted() {
            return None;
        }
        upper += cursor.max_score();
        if can_reach(upper, threshold) {
            return Some(i);
        }
    }
    None
}

fn block_max_wand(
    segment: &dyn SegmentSource,
    mut cursors: Vec<TermCursor<'_>>,
    k: usize,
    stop: &StopCondition,
) -> Result<SegmentHits> {
    let stats = segment.stats();
    let scorer = stats.scorer();
    let avg = stats.avg_doc_len as f32;
    let mut collector = TopKCollector::new(k);
    let mut contributions: Vec<(usize, f32)> = Vec::with_capacity(cursors.len());
    let mut steps = 0u64;
    let mut complete = true;

    loop {
        if steps % STOP_CHECK_STEPS == 0 && stop.should_stop() {
            complete = false;
            break;
        }
        steps += 1;

        cursors.sort_unstable_by_key(|c| (c.doc(), c.term_idx));
        let threshold = collector.threshold();
        let Some(mut pivot) = find_pivot(&cursors, threshold) else {
            break;
        };
        let pivot_doc = cursors[pivot].doc();
        while pivot + 1 < cursors.len() && cursors[pivot + 1].doc() == pivot_doc {
            pivot += 1;
        }

        // Block-max check: the blocks around the pivot may not be able to
        // beat the threshold even though the terms' global maxima can.
        if let Some(threshold) = threshold {
            let bound: f32 = cursors[..=pivot].iter().map(|c| c.block_max_for(pivot_doc)).sum();
            if !can_reach(bound, threshold) {
                let mut target = cursors[..=pivot]
                    .iter()
                    .map(|c| c.block_end_for(pivot_doc))
                    .min()
                    .unwrap_or(END_DOC)
                    .saturating_add(1);
                if let Some(next) = cursors.get(pivot + 1) {
                    target = target.min(next.doc());
                }
                for cursor in &mut cursors[..=pivot] {
                    cursor.advance(target)?;
                }
                continue;
            }
        }

        if cursors[0].doc() == pivot_doc {
            let doc_len = segment.doc_len(pivot_doc);
            contributions.clear();
            for cursor in &cursors[..=pivot] {
                let score = scorer.score(cursor.idf(), cursor.freq(), doc_len, avg);
                contributions.push((cursor.term_idx, score));
            }
            contributions.sort_unstable_by_key(|(idx, _)| *idx);
            let score: f32 = contributions.iter().map(|(_, s)| *s).sum();
            collector.collect(pivot_doc, score);

            for cursor in &mut cursors[..=pivot] {
                cursor.next()?;
            }
        } else {
            for cursor in cursors[..pivot].iter_mut().filter(|c| c.doc() < pivot_doc) {
                cursor.advance(pivot_doc)?;
            }
        }
    }

    Ok(SegmentHits {
        scored: collector.total_collected,
        hits: collector.into_sorted(),
        complete,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cancel::CancelToken;
    use crate::core::config::{FreqPrecision, SegmentConfig};
    use crate::index::segment::SegmentHandle;
    use crate::search::testing::{brute_force, random_segment, VOCABULARY};
    use crate::storage::segment_file::MappedSegment;
    use crate::mmap::byte_view::ByteView;

    const QUERIES: &[&[TermHash]] = &[
        &[1],
        &[VOCABULARY],
        &[1, 2],
        &[3, 17],
        &[1, 2, 3, 4],
        &[30, 35, 38, 39, VOCABULARY],
        &[5, 999],
        &[999],
        &[2, 9, 14, 22, 27, 33],
    ];

    fn check_against_brute_force(segment: &dyn SegmentSource) {
        for &query in QUERIES {
            for k in [1, 3, 10, 50, 5000] {
                let got = search_any(segment, query, k, &StopCondition::default()).unwrap();
                let (expected, candidates) = brute_force(segment, query, k, false);
                assert_eq!(got.hits, expected, "query {:?}, k {}", query, k);
                assert!(got.complete);
                assert!(got.scored <= candidates);
                if k >= candidates as usize {
                    assert_eq!(got.scored, candidates);
                }
            }
        }
    }

    #[test]
    fn matches_brute_force() {
        let segment = random_segment(7, 0, 1500, &SegmentConfig::default());
        check_against_brute_force(&segment);
    }

    #[test]
    fn matches_brute_force_with_wide_frequencies_and_offset_base() {
        let config = SegmentConfig { freq_precision: FreqPrecision::U16, ..SegmentConfig::default() };
        let segment = random_segment(99, 4000, 900, &config);
        check_against_brute_force(&segment);
    }

    #[test]
    fn matches_brute_force_on_mapped_bytes() {
        let heap = random_segment(3, 0, 700, &SegmentConfig::default());
        let mapped = MappedSegment::open(ByteView::from_vec(heap.encode().unwrap()), true).unwrap();
        let handle: SegmentHandle = std::sync::Arc::new(mapped);
        check_against_brute_force(handle.as_ref());
    }

    #[test]
    fn cancelled_search_is_incomplete() {
        let segment = random_segment(1, 0, 300, &SegmentConfig::default());
        let cancel = CancelToken::new();
        cancel.cancel();
        let stop = StopCondition::new(None, Some(cancel));
        for query in [&[1u64][..], &[1, 2][..]] {
            let got = search_any(&segment, query, 10, &stop).unwrap();
            assert!(!got.complete);
            assert!(got.hits.is_empty());
        }
    }

    #[test]
    fn zero_k_scores_every_candidate() {
        let segment = random_segment(5, 0, 400, &SegmentConfig::default());
        let got = search_any(&segment, &[1, 2], 0, &StopCondition::default()).unwrap();
        let (_, candidates) = brute_force(&segment, &[1, 2], 0, false);
        assert!(got.hits.is_empty());
        assert_eq!(got.scored, candidates);
    }
}
