use std::fs;
use std::path::Path;
use crate::core::error::{Error, Result};
use crate::index::segment::{Segment, SegmentHandle};
use crate::storage::docid_map::{DocIdMap, Reader};
use crate::storage::layout::write_file_atomic;
use crate::storage::segment_file::decode_segment;

pub const SNAPSHOT_MAGIC: &[u8; 8] = b"QRYSNP01";
pub const SNAPSHOT_VERSION: u32 = 1;
const SNAPSHOT_HEADER: usize = 16;

// [ magic (8) | version u32 | crc32 of body u32 ]
// [ doc ids:  len u64 | docids.bin bytes ]
// [ segments: count u32 | (len u64 | segment file bytes)* ]

/// Whole-index image used by the heap store profile.
#[derive(Debug)]
pub struct Snapshot {
    pub doc_ids: DocIdMap,
    pub segments: Vec<Segment>,
}

/// Write every segment and the id table into one file, atomically.
/// Returns the file size.
pub fn write_snapshot(path: &Path, doc_ids: &DocIdMap, segments: &[SegmentHandle]) -> Result<u64> {
    let mut body = Vec::new();
    let ids = doc_ids.encode();
    body.extend_from_slice(&(ids.len() as u64).to_le_bytes());
    body.extend_from_slice(&ids);
    body.extend_from_slice(&(segments.len() as u32).to_le_bytes());
    for segment in segments {
        let bytes = segment.encode()?;
        body.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
        body.extend_from_slice(&bytes);
    }

    let mut out = Vec::with_capacity(SNAPSHOT_HEADER + body.len());
    out.extend_from_slice(SNAPSHOT_MAGIC);
    out.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
    out.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
    out.extend_from_slice(&body);
    write_file_atomic(path, &out)?;
    Ok(out.len() as u64)
}

/// Load a snapshot, decoding every segment into heap form. `None` if the
/// file does not exist.
pub fn read_snapshot(path: &Path, verify_checksums: bool) -> Result<Option<Snapshot>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    decode_snapshot(&data, verify_checksums).map(Some)
}

pub fn decode_snapshot(data: &[u8], verify_checksums: bool) -> Result<Snapshot> {
    let mut reader = Reader { data, pos: 0 };
    if reader.take(8)? != SNAPSHOT_MAGIC {
        return Err(Error::corrupted("bad snapshot magic"));
    }
    let version = reader.u32()?;
    if version != SNAPSHOT_VERSION {
        return Err(Error::corrupted(format!(
            "snapshot format version {} is not supported (expected {})",
            version, SNAPSHOT_VERSION
        )));
    }
    let checksum = reader.u32()?;
    if verify_checksums && crc32fast::hash(&data[SNAPSHOT_HEADER..]) != checksum {
        return Err(Error::corrupted("snapshot checksum mismatch"));
    }

    let ids_len = section_len(reader.u64()?)?;
    let doc_ids = DocIdMap::decode(reader.take(ids_len)?)?;

    let count = reader.u32()? as usize;
    let mut segments = Vec::with_capacity(count.min(reader.remaining() / 8));
    let mut next_doc = 0u32;
    for _ in 0..count {
        let len = section_len(reader.u64()?)?;
        // The outer checksum already covers the segment bytes.
        let segment = decode_segment(reader.take(len)?.to_vec(), false)?;
        if segment.stats.base_doc != next_doc {
            return Err(Error::corrupted(format!(
                "snapshot segment starts at document {}, expected {}",
                segment.stats.base_doc, next_doc
            )));
        }
        next_doc = segment.stats.end_doc();
        segments.push(segment);
    }
    if reader.remaining() != 0 {
        return Err(Error::corrupted("trailing bytes after snapshot segments"));
    }
    if next_doc as usize != doc_ids.len() {
        return Err(Error::corrupted(format!(
            "snapshot holds {} documents but {} ids",
            next_doc,
            doc_ids.len()
        )));
    }
    Ok(Snapshot { doc_ids, segments })
}

fn section_len(len: u64) -> Result<usize> {
    usize::try_from(len).map_err(|_| Error::corrupted("snapshot section does not fit in memory"))
}
