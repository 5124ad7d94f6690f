use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use crate::core::error::{Error, Result};
use crate::mmap::byte_view::ByteView;

/// Memory-mapped file for zero-copy reads
pub struct MmapFile {
    pub mmap: Arc<Mmap>,
    pub len: usize,
}

impl MmapFile {
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let metadata = file.metadata()?;
        let len = metadata.len() as usize;
        if len == 0 {
            return Err(Error::corrupted(format!(
                "{} is empty",
                path.as_ref().display()
            )));
        }

        // The file is never written after it is published, so the mapping
        // stays valid for as long as the Arc lives.
        let mmap = unsafe { MmapOptions::new().len(len).map(&file)? };

        Ok(MmapFile { mmap: Arc::new(mmap), len })
    }

    pub fn data(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Checked view over the whole mapping.
    pub fn view(&self) -> ByteView {
        ByteView::from_mmap(Arc::clone(&self.mmap))
    }
}
