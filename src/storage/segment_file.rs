use std::collections::HashMap;
use std::path::Path;
use fst::{Map, MapBuilder, Streamer};
use roaring::RoaringBitmap;
use crate::core::config::FreqPrecision;
use crate::core::error::{Error, Result};
use crate::core::types::TermHash;
use crate::index::posting::{BitmapRef, BlockMeta, BlockMetas, TermPostings, BLOCK_META_BYTES};
use crate::index::segment::{Segment, SegmentSource, SegmentStats, TermEntry};
use crate::mmap::byte_view::ByteView;
use crate::mmap::mmap_file::MmapFile;

pub const SEGMENT_MAGIC: &[u8; 8] = b"QRYSEG01";
pub const SEGMENT_VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 128;

const FLAG_FREQ_U16: u32 = 1;
const FLAG_BITMAPS: u32 = 1 << 1;
const KNOWN_FLAGS: u32 = FLAG_FREQ_U16 | FLAG_BITMAPS;

/// Fixed part of a term record; block metadata follows.
const TERM_RECORD_BYTES: usize = 40;

// [ HEADER (128 bytes) ]
// [ DICTIONARY   fst: big-endian term hash -> term record offset ]
// [ TERM RECORDS hash, df, idf, max score, block count, bitmap ref, block metas ]
// [ BLOCKS       VByte gaps + frequencies per block ]
// [ DOC LENGTHS  u16 per document ]
// [ BITMAPS      serialized roaring bitmaps ]
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentHeader {
    pub version: u32,
    pub flags: u32,
    pub doc_count: u32,
    pub base_doc: u32,
    pub term_count: u32,
    pub checksum: u32,  // CRC32 of everything after the header
    pub avg_doc_len: f64,
    pub total_tokens: u64,
    pub k1: f32,
    pub b: f32,
    pub dict: Section,
    pub terms: Section,
    pub blocks: Section,
    pub doc_lens_offset: u64,  // length is doc_count * 2
    pub bitmaps: Section,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Section {
    pub offset: u64,
    pub len: u64,
}

impl Section {
    fn view(&self, file: &ByteView, name: &str) -> Result<ByteView> {
        let (offset, len) = (to_usize(self.offset)?, to_usize(self.len)?);
        if offset < HEADER_SIZE && len > 0 {
            return Err(Error::corrupted(format!("{} section overlaps the header", name)));
        }
        file.sub_view(offset, len)
            .map_err(|_| Error::corrupted(format!("{} section is truncated", name)))
    }
}

fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::corrupted("offset does not fit in memory"))
}

impl SegmentHeader {
    fn write(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.extend_from_slice(SEGMENT_MAGIC);
        for v in [self.version, self.flags, self.doc_count, self.base_doc, self.term_count, self.checksum] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&self.avg_doc_len.to_le_bytes());
        out.extend_from_slice(&self.total_tokens.to_le_bytes());
        out.extend_from_slice(&self.k1.to_le_bytes());
        out.extend_from_slice(&self.b.to_le_bytes());
        for v in [
            self.dict.offset, self.dict.len,
            self.terms.offset, self.terms.len,
            self.blocks.offset, self.blocks.len,
            self.doc_lens_offset,
            self.bitmaps.offset, self.bitmaps.len,
        ] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        debug_assert_eq!(out.len() - start, HEADER_SIZE);
    }

    fn parse(view: &ByteView) -> Result<Self> {
        if view.len() < HEADER_SIZE {
            return Err(Error::corrupted(format!(
                "segment file of {} bytes is shorter than its header",
                view.len()
            )));
        }
        if view.slice(0, 8)? != SEGMENT_MAGIC {
            return Err(Error::corrupted("bad segment magic"));
        }
        let version = view.u32_at(8)?;
        if version != SEGMENT_VERSION {
            return Err(Error::corrupted(format!(
                "segment format version {} is not supported (expected {})",
                version, SEGMENT_VERSION
            )));
        }
        let flags = view.u32_at(12)?;
        if flags & !KNOWN_FLAGS != 0 {
            return Err(Error::corrupted(format!("unknown segment flags {:#x}", flags)));
        }
        let section = |at: usize| -> Result<Section> {
            Ok(Section { offset: view.u64_at(at)?, len: view.u64_at(at + 8)? })
        };
        Ok(SegmentHeader {
            version,
            flags,
            doc_count: view.u32_at(16)?,
            base_doc: view.u32_at(20)?,
            term_count: view.u32_at(24)?,
            checksum: view.u32_at(28)?,
            avg_doc_len: view.f64_at(32)?,
            total_tokens: view.u64_at(40)?,
            k1: view.f32_at(48)?,
            b: view.f32_at(52)?,
            dict: section(56)?,
            terms: section(72)?,
            blocks: section(88)?,
            doc_lens_offset: view.u64_at(104)?,
            bitmaps: section(112)?,
        })
    }

    fn freq_precision(&self) -> FreqPrecision {
        if self.flags & FLAG_FREQ_U16 != 0 { FreqPrecision::U16 } else { FreqPrecision::U8 }
    }

    fn stats(&self) -> SegmentStats {
        SegmentStats {
            doc_count: self.doc_count,
            base_doc: self.base_doc,
            term_count: self.term_count,
            avg_doc_len: self.avg_doc_len,
            total_tokens: self.total_tokens,
            k1: self.k1,
            b: self.b,
            freq_precision: self.freq_precision(),
            has_bitmaps: self.flags & FLAG_BITMAPS != 0,
        }
    }
}

/// Encode a heap segment into the versioned file format.
pub fn encode_segment(segment: &Segment) -> Result<Vec<u8>> {
    let stats = &segment.stats;
    let terms = segment.sorted_terms();

    let mut dict = MapBuilder::memory();
    let mut records = Vec::with_capacity(terms.len() * (TERM_RECORD_BYTES + BLOCK_META_BYTES));
    let mut bitmaps = Vec::new();

    for (hash, entry) in &terms {
        dict.insert(hash.to_be_bytes(), records.len() as u64)?;

        let (bitmap_offset, bitmap_len) = match &entry.bitmap {
            Some(bitmap) => {
                let offset = bitmaps.len();
                bitmap.serialize_into(&mut bitmaps)?;
                (offset as u64, (bitmaps.len() - offset) as u32)
            }
            None => (0, 0),
        };

        records.extend_from_slice(&hash.to_le_bytes());
        records.extend_from_slice(&entry.doc_freq.to_le_bytes());
        records.extend_from_slice(&entry.idf.to_le_bytes());
        records.extend_from_slice(&entry.max_score.to_le_bytes());
        records.extend_from_slice(&(entry.blocks.len() as u32).to_le_bytes());
        records.extend_from_slice(&bitmap_offset.to_le_bytes());
        records.extend_from_slice(&bitmap_len.to_le_bytes());
        records.extend_from_slice(&0u32.to_le_bytes());
        for meta in &entry.blocks {
            meta.write_to(&mut records);
        }
    }
    let dict = dict.into_inner()?;

    let mut body = Vec::with_capacity(
        dict.len() + records.len() + segment.payload.len() + segment.doc_lens.len() * 2 + bitmaps.len(),
    );
    let place = |bytes: &[u8], body: &mut Vec<u8>| {
        let section = Section {
            offset: (HEADER_SIZE + body.len()) as u64,
            len: bytes.len() as u64,
        };
        body.extend_from_slice(bytes);
        section
    };
    let dict_section = place(&dict, &mut body);
    let terms_section = place(&records, &mut body);
    let blocks_section = place(&segment.payload, &mut body);
    let doc_lens_offset = (HEADER_SIZE + body.len()) as u64;
    for len in &segment.doc_lens {
        body.extend_from_slice(&len.to_le_bytes());
    }
    let bitmaps_section = place(&bitmaps, &mut body);

    let mut flags = 0;
    if stats.freq_precision == FreqPrecision::U16 {
        flags |= FLAG_FREQ_U16;
    }
    if stats.has_bitmaps {
        flags |= FLAG_BITMAPS;
    }
    let header = SegmentHeader {
        version: SEGMENT_VERSION,
        flags,
        doc_count: stats.doc_count,
        base_doc: stats.base_doc,
        term_count: terms.len() as u32,
        checksum: crc32fast::hash(&body),
        avg_doc_len: stats.avg_doc_len,
        total_tokens: stats.total_tokens,
        k1: stats.k1,
        b: stats.b,
        dict: dict_section,
        terms: terms_section,
        blocks: blocks_section,
        doc_lens_offset,
        bitmaps: bitmaps_section,
    };

    let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
    header.write(&mut out);
    out.extend_from_slice(&body);
    Ok(out)
}

/// A segment read in place from a validated byte view.
///
/// Posting blocks, block metadata and the dictionary are read straight from
/// the view; nothing is decoded up front.
pub struct MappedSegment {
    stats: SegmentStats,
    dict: Map<ByteView>,
    terms: ByteView,
    blocks: ByteView,
    doc_lens: ByteView,
    bitmaps: ByteView,
    file: ByteView,
}

struct TermRecord<'a> {
    hash: TermHash,
    doc_freq: u32,
    idf: f32,
    max_score: f32,
    metas: &'a [u8],
    bitmap: Option<&'a [u8]>,
}

impl MappedSegment {
    /// Validate `file` and wrap it. Magic, version, section bounds and
    /// (when `verify_checksum`) the body CRC are checked here.
    pub fn open(file: ByteView, verify_checksum: bool) -> Result<Self> {
        let header = SegmentHeader::parse(&file)?;
        if verify_checksum {
            let body = file.slice(HEADER_SIZE, file.len() - HEADER_SIZE)?;
            if crc32fast::hash(body) != header.checksum {
                return Err(Error::corrupted("segment checksum mismatch"));
            }
        }

        let dict_view = header.dict.view(&file, "dictionary")?;
        let terms = header.terms.view(&file, "term records")?;
        let blocks = header.blocks.view(&file, "blocks")?;
        let doc_lens = Section {
            offset: header.doc_lens_offset,
            len: header.doc_count as u64 * 2,
        }
        .view(&file, "document lengths")?;
        let bitmaps = header.bitmaps.view(&file, "bitmaps")?;

        let dict = Map::new(dict_view)?;
        if dict.len() != header.term_count as usize {
            return Err(Error::corrupted(format!(
                "dictionary holds {} terms, header says {}",
                dict.len(),
                header.term_count
            )));
        }
        if header.base_doc.checked_add(header.doc_count).is_none() {
            return Err(Error::corrupted("segment document range overflows"));
        }

        Ok(MappedSegment {
            stats: header.stats(),
            dict,
            terms,
            blocks,
            doc_lens,
            bitmaps,
            file,
        })
    }

    /// Map `path` and open it.
    pub fn open_path(path: &Path, verify_checksum: bool) -> Result<Self> {
        let mapped = MmapFile::open_read_only(path)?;
        Self::open(mapped.view(), verify_checksum).map_err(|e| {
            Error::new(e.kind, format!("{}: {}", path.display(), e.context))
        })
    }

    fn record(&self, offset: u64) -> Result<TermRecord<'_>> {
        let at = to_usize(offset)?;
        let hash = self.terms.u64_at(at)?;
        let block_count = self.terms.u32_at(at + 20)? as usize;
        let bitmap_offset = to_usize(self.terms.u64_at(at + 24)?)?;
        let bitmap_len = self.terms.u32_at(at + 32)? as usize;
        let metas_len = block_count
            .checked_mul(BLOCK_META_BYTES)
            .ok_or_else(|| Error::corrupted("block count overflows"))?;
        Ok(TermRecord {
            hash,
            doc_freq: self.terms.u32_at(at + 8)?,
            idf: self.terms.f32_at(at + 12)?,
            max_score: self.terms.f32_at(at + 16)?,
            metas: self.terms.slice(at + TERM_RECORD_BYTES, metas_len)?,
            bitmap: if bitmap_len > 0 {
                Some(self.bitmaps.slice(bitmap_offset, bitmap_len)?)
            } else {
                None
            },
        })
    }

    /// Decode the whole segment into heap form.
    pub fn to_heap(&self) -> Result<Segment> {
        let mut terms = HashMap::with_capacity(self.stats.term_count as usize);
        let mut stream = self.dict.stream();
        while let Some((key, offset)) = stream.next() {
            let key: [u8; 8] = key
                .try_into()
                .map_err(|_| Error::corrupted("dictionary key is not a term hash"))?;
            let hash = u64::from_be_bytes(key);
            let record = self.record(offset)?;
            if record.hash != hash {
                return Err(Error::corrupted("term record does not match its dictionary key"));
            }
            let metas = BlockMetas::encoded(record.metas)?;
            let blocks: Vec<BlockMeta> = (0..metas.len()).map(|i| metas.get(i)).collect();
            let bitmap = match record.bitmap {
                Some(bytes) => Some(
                    RoaringBitmap::deserialize_from(bytes)
                        .map_err(|e| Error::corrupted(format!("bitmap: {}", e)))?,
                ),
                None => None,
            };
            terms.insert(hash, TermEntry {
                doc_freq: record.doc_freq,
                idf: record.idf,
                max_score: record.max_score,
                blocks,
                bitmap,
            });
        }

        let doc_lens = self
            .doc_lens
            .as_slice()
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();

        Ok(Segment {
            stats: self.stats.clone(),
            terms,
            payload: self.blocks.to_vec(),
            doc_lens,
        })
    }
}

impl SegmentSource for MappedSegment {
    fn stats(&self) -> &SegmentStats {
        &self.stats
    }

    fn doc_len(&self, doc: u32) -> u16 {
        doc.checked_sub(self.stats.base_doc)
            .and_then(|i| self.doc_lens.u16_at(i as usize * 2).ok())
            .unwrap_or(0)
    }

    fn postings(&self, term: TermHash) -> Result<Option<TermPostings<'_>>> {
        let Some(offset) = self.dict.get(term.to_be_bytes()) else {
            return Ok(None);
        };
        let record = self.record(offset)?;
        if record.hash != term {
            return Err(Error::corrupted("term record does not match its dictionary key"));
        }
        Ok(Some(TermPostings {
            doc_freq: record.doc_freq,
            idf: record.idf,
            max_score: record.max_score,
            blocks: BlockMetas::encoded(record.metas)?,
            payload: self.blocks.as_slice(),
            precision: self.stats.freq_precision,
            bitmap: match record.bitmap {
                Some(bytes) => BitmapRef::Serialized(bytes),
                None => BitmapRef::Absent,
            },
        }))
    }

    fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.file.to_vec())
    }

    fn is_mapped(&self) -> bool {
        self.file.is_mapped()
    }
}

/// Decode segment file bytes into a heap segment.
pub fn decode_segment(bytes: Vec<u8>, verify_checksum: bool) -> Result<Segment> {
    MappedSegment::open(ByteView::from_vec(bytes), verify_checksum)?.to_heap()
}
