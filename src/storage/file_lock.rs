use std::fs::{File, OpenOptions};
use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::layout::StorageLayout;

/// Single writer guarantee for a data directory.
///
/// Held for the lifetime of an open `Index`; released on drop.
pub struct FileLock {
    pub file: File,
}

impl FileLock {
    pub fn acquire(storage: &StorageLayout) -> Result<Self> {
        let lock_path = storage.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::{flock, LOCK_EX, LOCK_NB};

            let fd = file.as_raw_fd();
            // SAFETY: `fd` is owned by `file`, which outlives the call.
            let rc = unsafe { flock(fd, LOCK_EX | LOCK_NB) };
            if rc != 0 {
                return Err(Error::new(
                    ErrorKind::Io,
                    format!("{} is locked by another index", storage.base_dir.display()),
                ));
            }
        }

        Ok(FileLock { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::{flock, LOCK_UN};

            let fd = self.file.as_raw_fd();
            unsafe {
                flock(fd, LOCK_UN);
            }
        }
    }
}
