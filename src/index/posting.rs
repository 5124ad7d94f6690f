use roaring::RoaringBitmap;
use crate::compression::vbyte::VByteEncoder;
use crate::core::config::FreqPrecision;
use crate::core::error::{Error, Result};
use crate::core::types::{Posting, BLOCK_SIZE};

/// Encoded size of one [`BlockMeta`].
pub const BLOCK_META_BYTES: usize = 28;

/// Skip data of one posting block.
///
/// `offset`/`len` locate the block payload inside the segment's block
/// section: VByte gaps for `count - 1` documents (the first document is
/// `first_doc`), followed by `count` frequencies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockMeta {
    pub first_doc: u32,
    pub last_doc: u32,
    pub count: u32,
    pub max_score: f32,
    pub offset: u64,
    pub len: u32,
}

impl BlockMeta {
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.first_doc.to_le_bytes());
        out.extend_from_slice(&self.last_doc.to_le_bytes());
        out.extend_from_slice(&self.count.to_le_bytes());
        out.extend_from_slice(&self.max_score.to_le_bytes());
        out.extend_from_slice(&self.offset.to_le_bytes());
        out.extend_from_slice(&self.len.to_le_bytes());
    }

    /// Parse a `BLOCK_META_BYTES` chunk.
    fn read(chunk: &[u8]) -> BlockMeta {
        let u32_at = |at: usize| {
            let mut b = [0u8; 4];
            b.copy_from_slice(&chunk[at..at + 4]);
            u32::from_le_bytes(b)
        };
        let mut offset = [0u8; 8];
        offset.copy_from_slice(&chunk[16..24]);
        BlockMeta {
            first_doc: u32_at(0),
            last_doc: u32_at(4),
            count: u32_at(8),
            max_score: f32::from_bits(u32_at(12)),
            offset: u64::from_le_bytes(offset),
            len: u32_at(24),
        }
    }
}

/// Block metadata of one term, either decoded (heap segment) or still
/// encoded in mapped pages.
#[derive(Debug, Clone, Copy)]
pub enum BlockMetas<'a> {
    Decoded(&'a [BlockMeta]),
    Encoded(&'a [u8]),
}

impl<'a> BlockMetas<'a> {
    /// Wrap encoded metadata; the length must be a whole number of entries.
    pub fn encoded(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() % BLOCK_META_BYTES != 0 {
            return Err(Error::corrupted("block metadata is not a whole number of entries"));
        }
        Ok(BlockMetas::Encoded(bytes))
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            BlockMetas::Decoded(metas) => metas.len(),
            BlockMetas::Encoded(bytes) => bytes.len() / BLOCK_META_BYTES,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Caller guarantees `i < len()`.
    #[inline]
    pub fn get(&self, i: usize) -> BlockMeta {
        match self {
            BlockMetas::Decoded(metas) => metas[i],
            BlockMetas::Encoded(bytes) => {
                BlockMeta::read(&bytes[i * BLOCK_META_BYTES..(i + 1) * BLOCK_META_BYTES])
            }
        }
    }

    /// First block at or after `from` whose last document is >= `target`;
    /// `len()` when there is none.
    pub fn find_block(&self, from: usize, target: u32) -> usize {
        let (mut lo, mut hi) = (from, self.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.get(mid).last_doc < target {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }
}

#[derive(Debug, Clone, Copy)]
pub enum BitmapRef<'a> {
    Absent,
    Decoded(&'a RoaringBitmap),
    Serialized(&'a [u8]),
}

/// Read-only access to one term's postings inside a segment.
#[derive(Debug, Clone, Copy)]
pub struct TermPostings<'a> {
    pub doc_freq: u32,
    pub idf: f32,
    pub max_score: f32,
    pub blocks: BlockMetas<'a>,
    pub payload: &'a [u8],
    pub precision: FreqPrecision,
    pub bitmap: BitmapRef<'a>,
}

impl<'a> TermPostings<'a> {
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, i: usize) -> BlockMeta {
        self.blocks.get(i)
    }

    /// Decode block `i` into `docs`/`freqs` (both cleared first).
    pub fn decode_block(&self, i: usize, docs: &mut Vec<u32>, freqs: &mut Vec<u16>) -> Result<()> {
        let meta = self.blocks.get(i);
        let start = usize::try_from(meta.offset)
            .map_err(|_| Error::corrupted("block offset out of range"))?;
        let bytes = start
            .checked_add(meta.len as usize)
            .and_then(|end| self.payload.get(start..end))
            .ok_or_else(|| Error::corrupted(format!("block {} payload out of bounds", i)))?;
        decode_block(bytes, &meta, self.precision, docs, freqs)
    }

    pub fn decode_all(&self) -> Result<Vec<Posting>> {
        let mut out = Vec::with_capacity(self.doc_freq as usize);
        let (mut docs, mut freqs) = (Vec::new(), Vec::new());
        for i in 0..self.block_count() {
            self.decode_block(i, &mut docs, &mut freqs)?;
            out.extend(docs.iter().zip(&freqs).map(|(&d, &f)| Posting::new(d, f)));
        }
        Ok(out)
    }

    /// Document set of the term, from the stored bitmap when present.
    pub fn doc_set(&self) -> Result<RoaringBitmap> {
        match self.bitmap {
            BitmapRef::Decoded(bitmap) => Ok(bitmap.clone()),
            BitmapRef::Serialized(bytes) => RoaringBitmap::deserialize_from(bytes)
                .map_err(|e| Error::corrupted(format!("bitmap: {}", e))),
            BitmapRef::Absent => {
                let mut set = RoaringBitmap::new();
                let (mut docs, mut freqs) = (Vec::new(), Vec::new());
                for i in 0..self.block_count() {
                    self.decode_block(i, &mut docs, &mut freqs)?;
                    set.extend(docs.iter().copied());
                }
                Ok(set)
            }
        }
    }
}

/// Append the payload of one block (docs ascending, `1..=BLOCK_SIZE` entries).
pub fn encode_block(docs: &[u32], freqs: &[u16], precision: FreqPrecision, out: &mut Vec<u8>) {
    debug_assert!(!docs.is_empty() && docs.len() <= BLOCK_SIZE);
    debug_assert_eq!(docs.len(), freqs.len());

    VByteEncoder::encode_deltas(out, docs[0], &docs[1..]);
    match precision {
        FreqPrecision::U8 => out.extend(freqs.iter().map(|&f| f.min(u8::MAX as u16) as u8)),
        FreqPrecision::U16 => {
            for &f in freqs {
                out.extend_from_slice(&f.to_le_bytes());
            }
        }
    }
}

pub fn decode_block(
    bytes: &[u8],
    meta: &BlockMeta,
    precision: FreqPrecision,
    docs: &mut Vec<u32>,
    freqs: &mut Vec<u16>,
) -> Result<()> {
    let count = meta.count as usize;
    if count == 0 || count > BLOCK_SIZE {
        return Err(Error::corrupted(format!("block holds {} postings", count)));
    }
    docs.clear();
    freqs.clear();

    docs.push(meta.first_doc);
    let used = VByteEncoder::decode_deltas(bytes, meta.first_doc, count - 1, docs)?;
    if docs[count - 1] != meta.last_doc {
        return Err(Error::corrupted("block last document does not match its header"));
    }

    let rest = &bytes[used..];
    match precision {
        FreqPrecision::U8 => {
            if rest.len() != count {
                return Err(Error::corrupted("block frequency section has the wrong size"));
            }
            freqs.extend(rest.iter().map(|&f| f as u16));
        }
        FreqPrecision::U16 => {
            if rest.len() != count * 2 {
                return Err(Error::corrupted("block frequency section has the wrong size"));
            }
            freqs.extend(rest.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])));
        }
    }
    Ok(())
}
