use std::collections::HashMap;
use std::sync::Arc;
use roaring::RoaringBitmap;
use crate::core::config::FreqPrecision;
use crate::core::error::Result;
use crate::core::types::TermHash;
use crate::index::posting::{BitmapRef, BlockMeta, BlockMetas, TermPostings};
use crate::scoring::scorer::BM25Scorer;
use crate::storage::segment_file;

/// Corpus statistics of one segment. BM25 is evaluated against these
/// (not index-wide values) so the stored block maxima remain exact bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentStats {
    pub doc_count: u32,
    pub base_doc: u32,
    pub term_count: u32,
    pub avg_doc_len: f64,
    pub total_tokens: u64,
    pub k1: f32,
    pub b: f32,
    pub freq_precision: FreqPrecision,
    pub has_bitmaps: bool,
}

impl SegmentStats {
    pub fn scorer(&self) -> BM25Scorer {
        BM25Scorer::new(self.k1, self.b)
    }

    /// One past the last document number of the segment.
    pub fn end_doc(&self) -> u32 {
        self.base_doc + self.doc_count
    }
}

/// Per-term metadata of a heap segment.
#[derive(Debug, Clone)]
pub struct TermEntry {
    pub doc_freq: u32,
    pub idf: f32,
    pub max_score: f32,
    pub blocks: Vec<BlockMeta>,
    pub bitmap: Option<RoaringBitmap>,
}

/// Read seam shared by heap-resident and memory-mapped segments.
pub trait SegmentSource: Send + Sync {
    fn stats(&self) -> &SegmentStats;

    /// Stored (saturated) length of a document of this segment; 0 outside it.
    fn doc_len(&self, doc: u32) -> u16;

    /// Postings of `term`, `None` when the segment does not hold it.
    fn postings(&self, term: TermHash) -> Result<Option<TermPostings<'_>>>;

    /// Bytes of the versioned segment file.
    fn encode(&self) -> Result<Vec<u8>>;

    fn is_mapped(&self) -> bool {
        false
    }
}

pub type SegmentHandle = Arc<dyn SegmentSource>;

/// Immutable heap-resident segment.
#[derive(Debug, Clone)]
pub struct Segment {
    pub stats: SegmentStats,
    pub terms: HashMap<TermHash, TermEntry>,
    pub payload: Vec<u8>,
    pub doc_lens: Vec<u16>,
}

impl Segment {
    /// Terms in ascending hash order.
    pub fn sorted_terms(&self) -> Vec<(TermHash, &TermEntry)> {
        let mut terms: Vec<_> = self.terms.iter().map(|(&h, e)| (h, e)).collect();
        terms.sort_unstable_by_key(|(h, _)| *h);
        terms
    }

    pub fn into_handle(self) -> SegmentHandle {
        Arc::new(self)
    }
}

impl SegmentSource for Segment {
    fn stats(&self) -> &SegmentStats {
        &self.stats
    }

    fn doc_len(&self, doc: u32) -> u16 {
        doc.checked_sub(self.stats.base_doc)
            .and_then(|i| self.doc_lens.get(i as usize))
            .copied()
            .unwrap_or(0)
    }

    fn postings(&self, term: TermHash) -> Result<Option<TermPostings<'_>>> {
        Ok(self.terms.get(&term).map(|entry| TermPostings {
            doc_freq: entry.doc_freq,
            idf: entry.idf,
            max_score: entry.max_score,
            blocks: BlockMetas::Decoded(&entry.blocks),
            payload: &self.payload,
            precision: self.stats.freq_precision,
            bitmap: match &entry.bitmap {
                Some(bitmap) => BitmapRef::Decoded(bitmap),
                None => BitmapRef::Absent,
            },
        }))
    }

    fn encode(&self) -> Result<Vec<u8>> {
        segment_file::encode_segment(self)
    }
}
