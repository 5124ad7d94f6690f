use std::fs;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::layout::{write_file_atomic, StorageLayout};

pub const CATALOG_VERSION: u32 = 1;

/// Unique segment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    pub fn new() -> Self {
        SegmentId(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

/// One persisted segment file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: SegmentId,
    pub base_doc: u32,
    pub doc_count: u32,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Ordered list of the segment files of an mmap-profile index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub version: u32,
    pub segments: Vec<CatalogEntry>,
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog {
            version: CATALOG_VERSION,
            segments: Vec::new(),
        }
    }
}

impl Catalog {
    pub fn load(storage: &StorageLayout) -> Result<Option<Self>> {
        let path = storage.catalog_path();
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let catalog: Catalog = serde_json::from_slice(&data)?;
        if catalog.version != CATALOG_VERSION {
            return Err(Error::corrupted(format!(
                "catalog version {} is not supported (expected {})",
                catalog.version, CATALOG_VERSION
            )));
        }
        catalog.validate()?;
        Ok(Some(catalog))
    }

    pub fn save(&self, storage: &StorageLayout) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)?;
        write_file_atomic(&storage.catalog_path(), &data)
    }

    /// Segments must tile `[0, doc_count)` in order.
    pub fn validate(&self) -> Result<()> {
        let mut next = 0u32;
        for entry in &self.segments {
            if entry.base_doc != next {
                return Err(Error::corrupted(format!(
                    "segment {} starts at document {}, expected {}",
                    entry.id.0, entry.base_doc, next
                )));
            }
            next = next
                .checked_add(entry.doc_count)
                .ok_or_else(|| Error::corrupted("catalog document count overflows"))?;
        }
        Ok(())
    }

    pub fn doc_count(&self) -> u32 {
        self.segments.iter().map(|s| s.doc_count).sum()
    }

    pub fn push(&mut self, entry: CatalogEntry) -> Result<()> {
        if entry.base_doc != self.doc_count() {
            return Err(Error::new(
                ErrorKind::Internal,
                format!("segment {} does not continue the catalog", entry.id.0),
            ));
        }
        self.segments.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(base_doc: u32, doc_count: u32) -> CatalogEntry {
        CatalogEntry {
            id: SegmentId::new(),
            base_doc,
            doc_count,
            created_at: Utc::now(),
            size_bytes: 1024,
        }
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::create(dir.path()).unwrap();
        assert!(Catalog::load(&storage).unwrap().is_none());

        let mut catalog = Catalog::default();
        catalog.push(entry(0, 10)).unwrap();
        catalog.push(entry(10, 5)).unwrap();
        catalog.save(&storage).unwrap();

        let loaded = Catalog::load(&storage).unwrap().unwrap();
        assert_eq!(loaded, catalog);
        assert_eq!(loaded.doc_count(), 15);
    }

    #[test]
    fn rejects_gaps() {
        let mut catalog = Catalog::default();
        assert!(catalog.push(entry(3, 1)).is_err());
        catalog.segments.push(entry(2, 1));
        assert_eq!(catalog.validate().unwrap_err().kind, ErrorKind::Corrupted);
    }

    #[test]
    fn unknown_version_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::create(dir.path()).unwrap();
        fs::write(storage.catalog_path(), br#"{"version": 9, "segments": []}"#).unwrap();
        assert_eq!(Catalog::load(&storage).unwrap_err().kind, ErrorKind::Corrupted);
    }
}
