use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapMut};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum MemoryMappingError {
    #[error("path does not exist: {0}")]
    Missing(PathBuf),
    #[error("refusing to map a directory: {0}")]
    IsDirectory(PathBuf),
    #[error("cannot map empty file: {0}")]
    Empty(PathBuf),
    #[error("permission denied opening {0}")]
    PermissionDenied(PathBuf),
    #[error("i/o error mapping {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MemoryMappingError {
    fn from_open_err(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            MemoryMappingError::PermissionDenied(path.to_path_buf())
        } else if err.kind() == std::io::ErrorKind::NotFound {
            MemoryMappingError::Missing(path.to_path_buf())
        } else {
            MemoryMappingError::Io { path: path.to_path_buf(), source: err }
        }
    }
}

enum Backing {
    ReadOnly(Mmap),
    ReadWrite(MmapMut),
}

/// A memory-mapped span over a file on disk, used for zero-copy reads off a
/// sealed WAL segment or a compacted range file (§4.B).
pub struct MappedBuffer {
    path: PathBuf,
    backing: Backing,
}

impl MappedBuffer {
    /// Maps `path` read-only. Fails up front rather than mapping a
    /// zero-length or directory path, since `mmap` on those either errors
    /// opaquely or (for zero length) succeeds with an unusable empty map.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self, MemoryMappingError> {
        let path = path.as_ref();
        if path.is_dir() {
            return Err(MemoryMappingError::IsDirectory(path.to_path_buf()));
        }
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|e| MemoryMappingError::from_open_err(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| MemoryMappingError::Io { path: path.to_path_buf(), source: e })?
            .len();
        if len == 0 {
            return Err(MemoryMappingError::Empty(path.to_path_buf()));
        }
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| MemoryMappingError::Io { path: path.to_path_buf(), source: e })?;
        debug!(path = %path.display(), len, "mapped file read-only");
        Ok(Self { path: path.to_path_buf(), backing: Backing::ReadOnly(mmap) })
    }

    /// Maps `path` read-write. The file is opened (not created); callers are
    /// expected to have pre-sized it via `set_len` before mapping.
    pub fn open_read_write(path: impl AsRef<Path>) -> Result<Self, MemoryMappingError> {
        let path = path.as_ref();
        if path.is_dir() {
            return Err(MemoryMappingError::IsDirectory(path.to_path_buf()));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| MemoryMappingError::from_open_err(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| MemoryMappingError::Io { path: path.to_path_buf(), source: e })?
            .len();
        if len == 0 {
            return Err(MemoryMappingError::Empty(path.to_path_buf()));
        }
        let mmap = unsafe { MmapMut::map_mut(&file) }
            .map_err(|e| MemoryMappingError::Io { path: path.to_path_buf(), source: e })?;
        debug!(path = %path.display(), len, "mapped file read-write");
        Ok(Self { path: path.to_path_buf(), backing: Backing::ReadWrite(mmap) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        match &self.backing {
            Backing::ReadOnly(m) => m.len(),
            Backing::ReadWrite(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.backing {
            Backing::ReadOnly(m) => &m[..],
            Backing::ReadWrite(m) => &m[..],
        }
    }

    /// Returns a writable slice, or `None` if this buffer was opened read-only.
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        match &mut self.backing {
            Backing::ReadOnly(_) => None,
            Backing::ReadWrite(m) => Some(&mut m[..]),
        }
    }

    /// Flushes any writes to the backing file. A no-op for read-only maps.
    pub fn flush(&self) -> Result<(), MemoryMappingError> {
        match &self.backing {
            Backing::ReadOnly(_) => Ok(()),
            Backing::ReadWrite(m) => m.flush().map_err(|e| MemoryMappingError::Io {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

impl Drop for MappedBuffer {
    fn drop(&mut self) {
        if let Backing::ReadWrite(_) = &self.backing {
            if self.flush().is_err() {
                warn!(path = %self.path.display(), "failed to flush mapped buffer on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(contents: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn maps_read_only_and_exposes_contents() {
        let f = file_with(b"hello rangedb");
        let mapped = MappedBuffer::open_read_only(f.path()).unwrap();
        assert_eq!(mapped.as_slice(), b"hello rangedb");
        assert_eq!(mapped.len(), 13);
    }

    #[test]
    fn read_only_map_refuses_mutation() {
        let f = file_with(b"immutable");
        let mut mapped = MappedBuffer::open_read_only(f.path()).unwrap();
        assert!(mapped.as_mut_slice().is_none());
    }

    #[test]
    fn read_write_map_allows_mutation_and_flush() {
        let f = file_with(b"mutable!");
        let mut mapped = MappedBuffer::open_read_write(f.path()).unwrap();
        mapped.as_mut_slice().unwrap()[0] = b'M';
        mapped.flush().unwrap();
        assert_eq!(&mapped.as_slice()[..1], b"M");
    }

    #[test]
    fn missing_path_is_rejected() {
        let err = MappedBuffer::open_read_only("/nonexistent/rangedb/path").unwrap_err();
        assert!(matches!(err, MemoryMappingError::Missing(_)));
    }

    #[test]
    fn directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = MappedBuffer::open_read_only(dir.path()).unwrap_err();
        assert!(matches!(err, MemoryMappingError::IsDirectory(_)));
    }

    #[test]
    fn empty_file_is_rejected() {
        let f = NamedTempFile::new().unwrap();
        let err = MappedBuffer::open_read_only(f.path()).unwrap_err();
        assert!(matches!(err, MemoryMappingError::Empty(_)));
    }
}
