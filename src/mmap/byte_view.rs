use std::sync::Arc;
use memmap2::Mmap;
use crate::core::error::{Error, Result};

#[derive(Debug, Clone)]
enum Backing {
    Mapped(Arc<Mmap>),
    Heap(Arc<Vec<u8>>),
}

impl Backing {
    #[inline]
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Mapped(m) => &m[..],
            Backing::Heap(v) => &v[..],
        }
    }
}

/// Bounds-checked window over shared immutable bytes (a memory map or a heap
/// buffer). The window is validated when it is created; every accessor is
/// checked again against the window and returns `Corrupted` when it would
/// read past the end.
#[derive(Debug, Clone)]
pub struct ByteView {
    backing: Backing,
    start: usize,
    len: usize,
}

impl ByteView {
    pub fn from_mmap(mmap: Arc<Mmap>) -> Self {
        let len = mmap.len();
        ByteView { backing: Backing::Mapped(mmap), start: 0, len }
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let len = bytes.len();
        ByteView { backing: Backing::Heap(Arc::new(bytes)), start: 0, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.backing, Backing::Mapped(_))
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.backing.bytes()[self.start..self.start + self.len]
    }

    #[inline]
    fn check(&self, offset: usize, len: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(Error::corrupted(format!(
                "read of {} bytes at offset {} exceeds view of {} bytes",
                len, offset, self.len
            ))),
        }
    }

    #[inline]
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.check(offset, len)?;
        Ok(&self.as_slice()[offset..offset + len])
    }

    /// Narrower view sharing the same backing.
    pub fn sub_view(&self, offset: usize, len: usize) -> Result<ByteView> {
        self.check(offset, len)?;
        Ok(ByteView {
            backing: self.backing.clone(),
            start: self.start + offset,
            len,
        })
    }

    #[inline]
    fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(offset, N)?);
        Ok(out)
    }

    #[inline]
    pub fn u16_at(&self, offset: usize) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array(offset)?))
    }

    #[inline]
    pub fn u32_at(&self, offset: usize) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array(offset)?))
    }

    #[inline]
    pub fn u64_at(&self, offset: usize) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array(offset)?))
    }

    #[inline]
    pub fn f32_at(&self, offset: usize) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array(offset)?))
    }

    #[inline]
    pub fn f64_at(&self, offset: usize) -> Result<f64> {
        Ok(f64::from_le_bytes(self.array(offset)?))
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}
