use crate::core::cancel::StopCondition;
use crate::core::error::{Error, Result};
use crate::core::types::TermHash;
use crate::index::segment::SegmentSource;
use crate::search::cursor::TermCursor;
use crate::search::results::{SegmentHits, TopKCollector};
use crate::search::wand::{can_reach, STOP_CHECK_STEPS};

/// Top-k over the documents holding every query term.
///
/// The candidate set is the intersection of the terms' document bitmaps,
/// smallest first; only those documents are scored.
pub fn search_all(
    segment: &dyn SegmentSource,
    terms: &[TermHash],
    k: usize,
    stop: &StopCondition,
) -> Result<SegmentHits> {
    let empty = SegmentHits { complete: true, ..SegmentHits::default() };
    if terms.is_empty() {
        return Ok(empty);
    }
    let mut postings = Vec::with_capacity(terms.len());
    for &term in terms {
        match segment.postings(term)? {
            Some(p) => postings.push(p),
            None => return Ok(empty),
        }
    }

    let mut order: Vec<usize> = (0..postings.len()).collect();
    order.sort_by_key(|&i| postings[i].doc_freq);
    let mut candidates = postings[order[0]].doc_set()?;
    for &i in &order[1..] {
        if candidates.is_empty() {
            break;
        }
        candidates &= postings[i].doc_set()?;
    }
    if candidates.is_empty() {
        return Ok(empty);
    }

    let stats = segment.stats();
    let scorer = stats.scorer();
    let avg = stats.avg_doc_len as f32;
    let mut cursors = postings
        .into_iter()
        .enumerate()
        .map(|(idx, p)| TermCursor::new(p, idx))
        .collect::<Result<Vec<_>>>()?;
    let mut collector = TopKCollector::new(k);
    let mut complete = true;

    for (step, doc) in candidates.iter().enumerate() {
        if step as u64 % STOP_CHECK_STEPS == 0 && stop.should_stop() {
            complete = false;
            break;
        }
        if let Some(threshold) = collector.threshold() {
            let bound: f32 = cursors.iter().map(|c| c.block_max_for(doc)).sum();
            if !can_reach(bound, threshold) {
                continue;
            }
        }

        let doc_len = segment.doc_len(doc);
        let mut score = 0.0f32;
        for cursor in &mut cursors {
            cursor.advance(doc)?;
            if cursor.doc() != doc {
                return Err(Error::corrupted(format!(
                    "document {} is in the term bitmap but not in its postings",
                    doc
                )));
            }
            score += scorer.score(cursor.idf(), cursor.freq(), doc_len, avg);
        }
        collector.collect(doc, score);
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
    use crate::core::config::SegmentConfig;
    use crate::search::testing::{brute_force, random_segment};

    #[test]
    fn matches_brute_force_intersection() {
        for bitmaps in [false, true] {
            let config = SegmentConfig { bitmaps, ..SegmentConfig::default() };
            let segment = random_segment(11, 0, 1200, &config);
            for query in [&[1u64, 2][..], &[1, 5, 9][..], &[20, 30][..], &[3][..]] {
                for k in [1, 10, 1000] {
                    let got = search_all(&segment, query, k, &StopCondition::default()).unwrap();
                    let (expected, _) = brute_force(&segment, query, k, true);
                    assert_eq!(got.hits, expected, "query {:?}, k {}", query, k);
                }
            }
        }
    }

    #[test]
    fn missing_term_empties_the_result() {
        let segment = random_segment(2, 0, 200, &SegmentConfig::default());
        let got = search_all(&segment, &[1, 12345], 10, &StopCondition::default()).unwrap();
        assert!(got.hits.is_empty());
        assert_eq!(got.scored, 0);
        assert!(got.complete);
    }
}
