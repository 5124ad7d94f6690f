use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use crate::core::error::Result;
use crate::storage::catalog::SegmentId;

/// Directory structure for data files
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,      // Root directory
    pub segments_dir: PathBuf,  // Segment files (.seg)
    pub meta_dir: PathBuf,      // Catalog and document ids
}

impl StorageLayout {
    /// Layout rooted at `base_dir`, without touching the filesystem.
    pub fn at(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        StorageLayout {
            segments_dir: base_dir.join("segments"),
            meta_dir: base_dir.join("meta"),
            base_dir,
        }
    }

    /// Layout rooted at `base_dir`, creating the directories.
    pub fn create(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let layout = Self::at(base_dir);
        fs::create_dir_all(&layout.segments_dir)?;
        fs::create_dir_all(&layout.meta_dir)?;
        Ok(layout)
    }

    pub fn segment_path(&self, id: &SegmentId) -> PathBuf {
        self.segments_dir.join(format!("{}.seg", id.0))
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.meta_dir.join("catalog.json")
    }

    pub fn doc_ids_path(&self) -> PathBuf {
        self.meta_dir.join("docids.bin")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.base_dir.join("index.snap")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.base_dir.join(".lock")
    }
}

/// Write `bytes` to a sibling temp file, sync it and rename it over `path`,
/// so readers see either the old or the new file.
pub fn write_file_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::create(dir.path().join("idx")).unwrap();
        assert!(layout.segments_dir.is_dir());
        assert!(layout.meta_dir.is_dir());
        assert!(layout.catalog_path().starts_with(&layout.meta_dir));
    }

    #[test]
    fn atomic_write_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.bin");
        write_file_atomic(&path, b"one").unwrap();
        write_file_atomic(&path, b"two").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");
        assert!(!dir.path().join("file.bin.tmp").exists());
    }
}
