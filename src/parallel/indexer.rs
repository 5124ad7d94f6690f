use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use crate::analysis::analyzer::Analyzer;
use crate::analysis::term_table::TermFreqTable;
use crate::core::cancel::CancelToken;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{clamp_doc_len, DocNum, Posting};
use crate::parallel::shard::{ShardMap, ShardedPostings};

/// Documents between two cancellation checks inside a worker.
const CANCEL_CHECK_DOCS: usize = 64;

/// Postings of one tokenized batch, grouped into 256 sorted shards.
#[derive(Debug)]
pub struct BatchPostings {
    pub base_doc: u32,
    pub doc_lens: Vec<u16>,
    pub total_tokens: u64,
    pub shards: Vec<ShardMap>,
}

/// Parallel document indexer for high-throughput indexing
///
/// Owns a crate-local rayon pool sized from the configured worker count.
/// Phase 1 tokenizes worker slices into thread-local maps and scatters them
/// into the shards; phase 2 sorts each shard as an independent task.
pub struct ParallelIndexer {
    pub workers: usize,
    analyzer: Arc<Analyzer>,
    pool: rayon::ThreadPool,
}

impl ParallelIndexer {
    pub fn new(workers: usize, analyzer: Arc<Analyzer>) -> Result<Self> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("quarry-index-{}", i))
            .build()
            .map_err(|e| Error::new(ErrorKind::Internal, format!("index worker pool: {}", e)))?;

        Ok(ParallelIndexer { workers, analyzer, pool })
    }

    pub fn analyzer(&self) -> &Arc<Analyzer> {
        &self.analyzer
    }

    /// Run `op` on the indexing pool.
    pub fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.pool.install(op)
    }

    /// Tokenize one batch. `doc_nums` must be consecutive; nothing is
    /// shared with other batches, so an error or cancellation simply drops
    /// the partial result.
    pub fn index_batch(&self, doc_nums: &[DocNum], texts: &[String], cancel: &CancelToken) -> Result<BatchPostings> {
        if doc_nums.len() != texts.len() {
            return Err(Error::invalid_argument(format!(
                "{} document numbers for {} texts",
                doc_nums.len(),
                texts.len()
            )));
        }
        let base_doc = doc_nums.first().map(|d| d.value()).unwrap_or(0);
        if doc_nums.iter().enumerate().any(|(i, d)| Some(d.value()) != base_doc.checked_add(i as u32)) {
            return Err(Error::invalid_argument("batch document numbers must be consecutive"));
        }
        if cancel.is_cancelled() {
            return Err(Error::cancelled());
        }

        let n = texts.len();
        let mut doc_lens = vec![0u16; n];
        let total_tokens = AtomicU64::new(0);
        let shards = ShardedPostings::new();
        let chunk = n.div_ceil(self.workers).max(1);
        let analyzer = &self.analyzer;

        // Phase 1: tokenize worker slices, scatter into shards.
        self.pool.install(|| {
            texts
                .par_chunks(chunk)
                .zip(doc_lens.par_chunks_mut(chunk))
                .enumerate()
                .try_for_each(|(worker, (docs, lens))| -> Result<()> {
                    let mut table = TermFreqTable::new();
                    let mut local: ShardMap = HashMap::new();
                    let first = base_doc + (worker * chunk) as u32;
                    let mut tokens = 0u64;

                    for (i, text) in docs.iter().enumerate() {
                        if i % CANCEL_CHECK_DOCS == 0 && cancel.is_cancelled() {
                            return Err(Error::cancelled());
                        }
                        let len = analyzer.analyze_into(text, &mut table);
                        lens[i] = clamp_doc_len(len);
                        tokens += len as u64;
                        let doc = first + i as u32;
                        for (hash, freq) in table.entries() {
                            local.entry(hash).or_default().push(Posting::new(doc, freq));
                        }
                    }

                    total_tokens.fetch_add(tokens, Ordering::Relaxed);
                    shards.scatter(local);
                    Ok(())
                })
        })?;

        if cancel.is_cancelled() {
            return Err(Error::cancelled());
        }

        // Phase 2: per-shard merge.
        let shards = self.pool.install(|| shards.into_sorted());
        let total_tokens = total_tokens.into_inner();
        debug!(base_doc, docs = n, tokens = total_tokens, "batch tokenized");

        Ok(BatchPostings { base_doc, doc_lens, total_tokens, shards })
    }
}
