use std::fs;
use std::path::Path;
use crate::core::error::{Error, Result};
use crate::storage::layout::write_file_atomic;

pub const DOC_IDS_MAGIC: &[u8; 8] = b"QRYIDS01";
pub const DOC_IDS_VERSION: u32 = 1;

/// Document number -> external id. Document `n` is entry `n`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocIdMap {
    ids: Vec<String>,
}

impl DocIdMap {
    pub fn new() -> Self {
        DocIdMap::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, doc: u32) -> Option<&str> {
        self.ids.get(doc as usize).map(String::as_str)
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = String>) {
        self.ids.extend(ids);
    }

    /// Drop every id from `len` on.
    pub fn truncate(&mut self, len: usize) {
        self.ids.truncate(len);
    }

    pub fn encode(&self) -> Vec<u8> {
        let payload: usize = self.ids.iter().map(|id| 4 + id.len()).sum();
        let mut out = Vec::with_capacity(16 + payload);
        out.extend_from_slice(DOC_IDS_MAGIC);
        out.extend_from_slice(&DOC_IDS_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.ids.len() as u32).to_le_bytes());
        for id in &self.ids {
            out.extend_from_slice(&(id.len() as u32).to_le_bytes());
            out.extend_from_slice(id.as_bytes());
        }
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = Reader { data, pos: 0 };
        if reader.take(8)? != DOC_IDS_MAGIC {
            return Err(Error::corrupted("bad document id magic"));
        }
        let version = reader.u32()?;
        if version != DOC_IDS_VERSION {
            return Err(Error::corrupted(format!(
                "document id format version {} is not supported (expected {})",
                version, DOC_IDS_VERSION
            )));
        }
        let count = reader.u32()? as usize;
        // Every entry needs at least its length prefix.
        if count > reader.remaining() / 4 {
            return Err(Error::corrupted(format!("document id count {} exceeds file size", count)));
        }

        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let len = reader.u32()? as usize;
            let bytes = reader.take(len)?;
            let id = std::str::from_utf8(bytes)
                .map_err(|_| Error::corrupted("document id is not valid UTF-8"))?;
            ids.push(id.to_string());
        }
        if reader.remaining() != 0 {
            return Err(Error::corrupted("trailing bytes after document ids"));
        }
        Ok(DocIdMap { ids })
    }

    pub fn load(path: &Path) -> Result<Option<Self>> {
        match fs::read(path) {
            Ok(data) => Ok(Some(Self::decode(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_file_atomic(path, &self.encode())
    }
}

/// Cursor over a length-prefixed little-endian buffer.
pub(crate) struct Reader<'a> {
    pub data: &'a [u8],
    pub pos: usize,
}

impl<'a> Reader<'a> {
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::corrupted(format!(
                "truncated: need {} bytes at offset {}, {} left",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    pub fn u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }
}
