use std::path::PathBuf;
use tracing::debug;
use crate::core::cancel::CancelToken;
use crate::core::config::SegmentConfig;
use crate::core::error::{Error, Result};
use crate::core::types::DocNum;
use crate::index::builder::{SegmentBuilder, SegmentInput};
use crate::index::segment::{SegmentHandle, SegmentSource};
use crate::parallel::indexer::ParallelIndexer;
use crate::parallel::shard::{append_shards, empty_shards, flatten, ShardMap};
use crate::storage::catalog::SegmentId;

/// A segment produced by an accumulator, with its file when it was spilled.
pub struct BuiltSegment {
    pub handle: SegmentHandle,
    pub file: Option<SpilledFile>,
}

#[derive(Debug, Clone)]
pub struct SpilledFile {
    pub id: SegmentId,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Collects postings batch by batch and turns them into segments.
///
/// A failed or cancelled `add_batch` leaves the accumulator exactly as it
/// was before the call.
pub trait PostingAccumulator: Send {
    fn add_batch(&mut self, doc_nums: &[DocNum], texts: &[String], cancel: &CancelToken) -> Result<()>;

    /// Segments covering every accepted batch, in document order.
    fn finish(&mut self) -> Result<Vec<BuiltSegment>>;

    /// Drop everything accumulated so far, including files already written.
    fn abort(&mut self);
}

/// Keeps every batch in RAM and builds a single segment at `finish`.
pub struct MemoryAccumulator {
    indexer: ParallelIndexer,
    builder: SegmentBuilder,
    base_doc: Option<u32>,
    doc_lens: Vec<u16>,
    total_tokens: u64,
    shards: Vec<ShardMap>,
}

impl MemoryAccumulator {
    pub fn new(indexer: ParallelIndexer, config: &SegmentConfig) -> Self {
        MemoryAccumulator {
            indexer,
            builder: SegmentBuilder::new(config),
            base_doc: None,
            doc_lens: Vec::new(),
            total_tokens: 0,
            shards: empty_shards(),
        }
    }

    pub fn doc_count(&self) -> usize {
        self.doc_lens.len()
    }
}

impl PostingAccumulator for MemoryAccumulator {
    fn add_batch(&mut self, doc_nums: &[DocNum], texts: &[String], cancel: &CancelToken) -> Result<()> {
        if let (Some(base), Some(first)) = (self.base_doc, doc_nums.first()) {
            let expected = base + self.doc_lens.len() as u32;
            if first.value() != expected {
                return Err(Error::invalid_argument(format!(
                    "batch starts at document {}, expected {}",
                    first.value(),
                    expected
                )));
            }
        }

        let batch = self.indexer.index_batch(doc_nums, texts, cancel)?;
        if batch.doc_lens.is_empty() {
            return Ok(());
        }

        // Commit point: nothing above touched our state.
        self.base_doc.get_or_insert(batch.base_doc);
        self.doc_lens.extend_from_slice(&batch.doc_lens);
        self.total_tokens += batch.total_tokens;
        self.indexer.install(|| append_shards(&mut self.shards, batch.shards));
        debug!(docs = self.doc_lens.len(), "memory accumulator batch merged");
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<BuiltSegment>> {
        let Some(base_doc) = self.base_doc.take() else {
            return Ok(Vec::new());
        };
        let input = SegmentInput {
            base_doc,
            doc_lens: std::mem::take(&mut self.doc_lens),
            total_tokens: std::mem::take(&mut self.total_tokens),
            terms: flatten(std::mem::replace(&mut self.shards, empty_shards())),
        };
        let segment = self.builder.build(input)?;
        debug!(
            docs = segment.stats().doc_count,
            terms = segment.stats().term_count,
            "memory accumulator built segment"
        );
        Ok(vec![BuiltSegment { handle: segment.into_handle(), file: None }])
    }

    fn abort(&mut self) {
        self.base_doc = None;
        self.doc_lens.clear();
        self.total_tokens = 0;
        self.shards = empty_shards();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::analysis::analyzer::Analyzer;
    use crate::analysis::hash::hash_term;
    use crate::core::config::TokenizerConfig;

    fn accumulator() -> MemoryAccumulator {
        let analyzer = Arc::new(Analyzer::from_config(&TokenizerConfig::ascii()).unwrap());
        MemoryAccumulator::new(ParallelIndexer::new(3, analyzer).unwrap(), &SegmentConfig::default())
    }

    fn batch(base: u32, texts: &[&str]) -> (Vec<DocNum>, Vec<String>) {
        (
            (0..texts.len() as u32).map(|i| DocNum(base + i)).collect(),
            texts.iter().map(|t| t.to_string()).collect(),
        )
    }

    #[test]
    fn builds_one_segment_from_many_batches() {
        let mut acc = accumulator();
        let (d1, t1) = batch(0, &["red fox", "blue fox"]);
        let (d2, t2) = batch(2, &["red dog"]);
        acc.add_batch(&d1, &t1, &CancelToken::new()).unwrap();
        acc.add_batch(&d2, &t2, &CancelToken::new()).unwrap();

        let built = acc.finish().unwrap();
        assert_eq!(built.len(), 1);
        let segment = &built[0].handle;
        assert_eq!(segment.stats().doc_count, 3);
        let red = segment.postings(hash_term("red")).unwrap().unwrap();
        let docs: Vec<u32> = red.decode_all().unwrap().iter().map(|p| p.doc).collect();
        assert_eq!(docs, vec![0, 2]);
    }

    #[test]
    fn cancelled_batch_leaves_state_untouched() {
        let mut acc = accumulator();
        let (d1, t1) = batch(0, &["kept"]);
        acc.add_batch(&d1, &t1, &CancelToken::new()).unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let (d2, t2) = batch(1, &["dropped"]);
        assert!(acc.add_batch(&d2, &t2, &cancel).unwrap_err().is_cancelled());
        assert_eq!(acc.doc_count(), 1);

        let built = acc.finish().unwrap();
        let segment = &built[0].handle;
        assert!(segment.postings(hash_term("dropped")).unwrap().is_none());
        assert_eq!(segment.stats().doc_count, 1);
    }

    #[test]
    fn finish_without_documents_builds_nothing() {
        let mut acc = accumulator();
        assert!(acc.finish().unwrap().is_empty());
    }

    #[test]
    fn abort_discards_batches() {
        let mut acc = accumulator();
        let (d, t) = batch(0, &["one", "two"]);
        acc.add_batch(&d, &t, &CancelToken::new()).unwrap();
        acc.abort();
        assert!(acc.finish().unwrap().is_empty());
    }
}
