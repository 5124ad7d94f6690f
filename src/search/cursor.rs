use crate::core::error::Result;
use crate::index::posting::TermPostings;

/// Document number of an exhausted cursor.
pub const END_DOC: u32 = u32::MAX;

/// Forward-only iterator over one term's posting blocks.
///
/// Only the current block is decoded; `advance` skips blocks through their
/// metadata without touching the payload.
pub struct TermCursor<'a> {
    postings: TermPostings<'a>,
    pub term_idx: usize,
    block: usize,
    docs: Vec<u32>,
    freqs: Vec<u16>,
    pos: usize,
    doc: u32,
}

impl<'a> TermCursor<'a> {
    pub fn new(postings: TermPostings<'a>, term_idx: usize) -> Result<Self> {
        let mut cursor = TermCursor {
            postings,
            term_idx,
            block: 0,
            docs: Vec::with_capacity(crate::core::types::BLOCK_SIZE),
            freqs: Vec::with_capacity(crate::core::types::BLOCK_SIZE),
            pos: 0,
            doc: END_DOC,
        };
        cursor.load_block(0)?;
        Ok(cursor)
    }

    fn load_block(&mut self, block: usize) -> Result<()> {
        self.block = block;
        self.pos = 0;
        if block >= self.postings.block_count() {
            self.docs.clear();
            self.freqs.clear();
            self.doc = END_DOC;
            return Ok(());
        }
        self.postings.decode_block(block, &mut self.docs, &mut self.freqs)?;
        self.doc = self.docs.first().copied().unwrap_or(END_DOC);
        Ok(())
    }

    #[inline]
    pub fn doc(&self) -> u32 {
        self.doc
    }

    pub fn is_exhausted(&self) -> bool {
        self.doc == END_DOC
    }

    /// Frequency at the current posting; 0 once exhausted.
    #[inline]
    pub fn freq(&self) -> u16 {
        self.freqs.get(self.pos).copied().unwrap_or(0)
    }

    pub fn idf(&self) -> f32 {
        self.postings.idf
    }

    /// Upper bound of the term over the whole segment.
    pub fn max_score(&self) -> f32 {
        self.postings.max_score
    }

    pub fn next(&mut self) -> Result<()> {
        if self.is_exhausted() {
            return Ok(());
        }
        self.pos += 1;
        if self.pos < self.docs.len() {
            self.doc = self.docs[self.pos];
            Ok(())
        } else {
            self.load_block(self.block + 1)
        }
    }

    /// Move to the first posting with document >= `target`.
    pub fn advance(&mut self, target: u32) -> Result<()> {
        if self.doc >= target {
            return Ok(());
        }
        if self.postings.block(self.block).last_doc < target {
            let block = self.postings.blocks.find_block(self.block + 1, target);
            self.load_block(block)?;
            if self.is_exhausted() {
                return Ok(());
            }
        }
        // The current block now ends at or after `target`.
        let rest = &self.docs[self.pos..];
        self.pos += rest.partition_point(|&d| d < target);
        self.doc = self.docs.get(self.pos).copied().unwrap_or(END_DOC);
        Ok(())
    }

    /// Block-max bound for `target`: the maximum score of the block that
    /// would hold it, 0 past the last block. Does not move the cursor.
    pub fn block_max_for(&self, target: u32) -> f32 {
        match self.block_for(target) {
            Some(i) => self.postings.block(i).max_score,
            None => 0.0,
        }
    }

    /// Last document of the block that would hold `target`.
    pub fn block_end_for(&self, target: u32) -> u32 {
        match self.block_for(target) {
            Some(i) => self.postings.block(i).last_doc,
            None => END_DOC,
        }
    }

    fn block_for(&self, target: u32) -> Option<usize> {
        if self.is_exhausted() {
            return None;
        }
        let i = self.postings.blocks.find_block(self.block, target);
        (i < self.postings.block_count()).then_some(i)
    }
}
