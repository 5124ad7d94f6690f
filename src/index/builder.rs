use std::collections::HashMap;
use roaring::RoaringBitmap;
use crate::core::config::{FreqPrecision, SegmentConfig};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Posting, TermHash, BLOCK_SIZE};
use crate::index::posting::{encode_block, BlockMeta};
use crate::index::segment::{Segment, SegmentStats, TermEntry};
use crate::scoring::scorer::BM25Scorer;

/// Turns accumulated postings into an immutable [`Segment`].
///
/// Terms are emitted in ascending hash order and postings sorted by document
/// number, so the same input always produces byte-identical block payloads.
pub struct SegmentBuilder {
    config: SegmentConfig,
}

/// Everything one build consumes.
pub struct SegmentInput {
    pub base_doc: u32,
    pub doc_lens: Vec<u16>,
    pub total_tokens: u64,
    pub terms: Vec<(TermHash, Vec<Posting>)>,
}

impl SegmentBuilder {
    pub fn new(config: &SegmentConfig) -> Self {
        SegmentBuilder { config: config.clone() }
    }

    pub fn build(&self, input: SegmentInput) -> Result<Segment> {
        let SegmentInput { base_doc, doc_lens, total_tokens, mut terms } = input;
        let doc_count = u32::try_from(doc_lens.len())
            .map_err(|_| Error::invalid_argument("segment holds more than u32::MAX documents"))?;
        base_doc
            .checked_add(doc_count)
            .ok_or_else(|| Error::invalid_argument("document numbers overflow u32"))?;

        let avg_doc_len = if doc_count == 0 {
            0.0
        } else {
            total_tokens as f64 / doc_count as f64
        };
        let avg = avg_doc_len as f32;
        let scorer = BM25Scorer::new(self.config.k1, self.config.b);
        let precision = self.config.freq_precision;

        terms.sort_unstable_by_key(|(hash, _)| *hash);

        let mut entries = HashMap::with_capacity(terms.len());
        let mut payload = Vec::new();
        let (mut docs, mut freqs) = (Vec::with_capacity(BLOCK_SIZE), Vec::with_capacity(BLOCK_SIZE));

        for (hash, mut postings) in terms {
            if postings.is_empty() {
                continue;
            }
            postings.sort_unstable_by_key(|p| p.doc);
            let doc_freq = postings.len() as u32;
            let idf = BM25Scorer::idf(doc_count, doc_freq);

            let mut blocks = Vec::with_capacity(postings.len().div_ceil(BLOCK_SIZE));
            let mut max_score = 0.0f32;
            for window in postings.chunks(BLOCK_SIZE) {
                docs.clear();
                freqs.clear();
                let mut block_max = 0.0f32;
                for posting in window {
                    let local = posting
                        .doc
                        .checked_sub(base_doc)
                        .filter(|&i| i < doc_count)
                        .ok_or_else(|| Error::new(
                            ErrorKind::Internal,
                            format!("posting for document {} outside segment", posting.doc),
                        ))?;
                    let stored_freq = match precision {
                        FreqPrecision::U8 => posting.freq.min(u8::MAX as u16),
                        FreqPrecision::U16 => posting.freq,
                    };
                    let score = scorer.score(idf, stored_freq, doc_lens[local as usize], avg);
                    block_max = block_max.max(score);
                    docs.push(posting.doc);
                    freqs.push(stored_freq);
                }

                let offset = payload.len();
                encode_block(&docs, &freqs, precision, &mut payload);
                blocks.push(BlockMeta {
                    first_doc: docs[0],
                    last_doc: docs[docs.len() - 1],
                    count: docs.len() as u32,
                    max_score: block_max,
                    offset: offset as u64,
                    len: (payload.len() - offset) as u32,
                });
                max_score = max_score.max(block_max);
            }

            let bitmap = if self.config.bitmaps {
                let mut set = RoaringBitmap::new();
                set.extend(postings.iter().map(|p| p.doc));
                Some(set)
            } else {
                None
            };

            entries.insert(hash, TermEntry { doc_freq, idf, max_score, blocks, bitmap });
        }

        Ok(Segment {
            stats: SegmentStats {
                doc_count,
                base_doc,
                term_count: entries.len() as u32,
                avg_doc_len,
                total_tokens,
                k1: self.config.k1,
                b: self.config.b,
                freq_precision: precision,
                has_bitmaps: self.config.bitmaps,
            },
            terms: entries,
            payload,
            doc_lens,
        })
    }
}
