use std::sync::Arc;
use std::time::{Duration, Instant};
use rayon::prelude::*;
use tracing::debug;
use crate::analysis::analyzer::Analyzer;
use crate::core::cancel::{CancelToken, StopCondition};
use crate::core::error::Result;
use crate::core::types::TermHash;
use crate::index::segment::SegmentHandle;
use crate::search::conjunctive::search_all;
use crate::search::results::{merge_top_k, SegmentHits};
use crate::search::wand::search_any;

/// How query terms combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Any,  // documents holding at least one term, Block-Max WAND
    All,  // documents holding every term, bitmap intersection first
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
    pub offset: usize,
    pub mode: SearchMode,
    pub deadline: Option<Instant>,
    pub cancel: Option<CancelToken>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        SearchRequest {
            query: query.into(),
            limit: 10,
            offset: 0,
            mode: SearchMode::Any,
            deadline: None,
            cancel: None,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        self.deadline(Instant::now() + timeout)
    }

    pub fn cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Hits each segment must return: the whole window up to `offset + limit`.
    /// A zero limit only counts candidates.
    pub fn top_k(&self) -> usize {
        if self.limit == 0 {
            0
        } else {
            self.limit.saturating_add(self.offset)
        }
    }
}

/// Fans a query out over segments and merges their top lists.
pub struct QueryExecutor {
    analyzer: Arc<Analyzer>,
}

impl QueryExecutor {
    pub fn new(analyzer: Arc<Analyzer>) -> Self {
        QueryExecutor { analyzer }
    }

    pub fn execute(&self, segments: &[SegmentHandle], request: &SearchRequest) -> Result<SegmentHits> {
        let terms = self.analyzer.query_terms(&request.query);
        self.execute_terms(segments, &terms, request)
    }

    /// Run already-analyzed `terms`; the window is `request.top_k()`, not
    /// yet cut to `offset`/`limit`.
    pub fn execute_terms(
        &self,
        segments: &[SegmentHandle],
        terms: &[TermHash],
        request: &SearchRequest,
    ) -> Result<SegmentHits> {
        if terms.is_empty() || segments.is_empty() {
            return Ok(SegmentHits { complete: true, ..SegmentHits::default() });
        }
        let stop = StopCondition::new(request.deadline, request.cancel.clone());
        let k = request.top_k();

        let parts = segments
            .par_iter()
            .map(|segment| match request.mode {
                SearchMode::Any => search_any(segment.as_ref(), terms, k, &stop),
                SearchMode::All => search_all(segment.as_ref(), terms, k, &stop),
            })
            .collect::<Result<Vec<_>>>()?;

        let merged = merge_top_k(parts, k);
        debug!(
            terms = terms.len(),
            segments = segments.len(),
            scored = merged.scored,
            complete = merged.complete,
            "query executed"
        );
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{SegmentConfig, TokenizerConfig};
    use crate::search::results::ScoredDoc;
    use crate::search::testing::{brute_force, random_segment};

    fn executor() -> QueryExecutor {
        QueryExecutor::new(Arc::new(Analyzer::from_config(&TokenizerConfig::ascii()).unwrap()))
    }

    fn segments() -> Vec<SegmentHandle> {
        let config = SegmentConfig::default();
        vec![
            random_segment(21, 0, 500, &config).into_handle(),
            random_segment(22, 500, 300, &config).into_handle(),
            random_segment(23, 800, 700, &config).into_handle(),
        ]
    }

    #[test]
    fn fan_out_matches_per_segment_brute_force() {
        let segments = segments();
        for mode in [SearchMode::Any, SearchMode::All] {
            for terms in [&[1u64][..], &[2, 7][..], &[1, 3, 5, 30][..]] {
                let request = SearchRequest::new("").limit(15).offset(5).mode(mode);
                let got = executor().execute_terms(&segments, terms, &request).unwrap();

                let mut expected: Vec<ScoredDoc> = segments
                    .iter()
                    .flat_map(|s| brute_force(s.as_ref(), terms, 20, mode == SearchMode::All).0)
                    .collect();
                expected.sort_unstable_by(ScoredDoc::rank_cmp);
                expected.truncate(20);
                assert_eq!(got.hits, expected, "{:?} {:?}", mode, terms);
                assert!(got.complete);
            }
        }
    }

    #[test]
    fn window_covers_offset() {
        assert_eq!(SearchRequest::new("q").limit(10).offset(100).top_k(), 110);
        assert_eq!(SearchRequest::new("q").limit(0).offset(100).top_k(), 0);
        assert_eq!(SearchRequest::new("q").limit(usize::MAX).offset(1).top_k(), usize::MAX);
    }

    #[test]
    fn empty_query_and_expired_deadline() {
        let segments = segments();
        let got = executor().execute(&segments, &SearchRequest::new("   ")).unwrap();
        assert!(got.hits.is_empty() && got.complete);

        let expired = SearchRequest::new("").deadline(Instant::now());
        let got = executor().execute_terms(&segments, &[1], &expired).unwrap();
        assert!(!got.complete);
    }
}
