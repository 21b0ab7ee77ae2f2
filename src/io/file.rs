//! Rank-local file handle with explicit-offset reads.
//!
//! Every rank opens the shared binary files itself and reads its own slice
//! at an explicit byte offset. The handle is dropped when the read that
//! opened it returns, on success and on error alike.

use crate::mesh_error::MeshIoError;
use bytemuck::Pod;
use std::fs::File;
use std::io::{ErrorKind as IoErrorKind, Read, Seek, SeekFrom};
use std::mem::size_of;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct RankFile {
    file: File,
    path: PathBuf,
    len: u64,
}

impl RankFile {
    /// Open `path`; failure is reported as `CannotOpen(path)`.
    pub fn open(path: &Path) -> Result<Self, MeshIoError> {
        let open = || -> std::io::Result<(File, u64)> {
            let file = File::open(path)?;
            let len = file.metadata()?.len();
            Ok((file, len))
        };
        let (file, len) = open().map_err(|e| {
            log::debug!("open {} failed: {e}", path.display());
            MeshIoError::CannotOpen(path.to_path_buf())
        })?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// File length in whole values of `T`.
    pub fn len_in<T>(&self) -> u64 {
        self.len / size_of::<T>() as u64
    }

    /// Fill `out` with the values starting at value index `first`.
    ///
    /// Returns the number of whole values actually read; fewer than
    /// `out.len()` means the file ended early.
    pub fn read_at<T: Pod>(&mut self, first: u64, out: &mut [T]) -> Result<usize, MeshIoError> {
        let byte_offset = first
            .checked_mul(size_of::<T>() as u64)
            .ok_or_else(|| MeshIoError::SizeMismatch(format!("offset {first} overflows")))?;
        if out.is_empty() || byte_offset >= self.len {
            return Ok(0);
        }
        self.file.seek(SeekFrom::Start(byte_offset))?;
        let buf = bytemuck::cast_slice_mut::<T, u8>(out);
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == IoErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled / size_of::<T>())
    }

    /// Read the whole file.
    pub fn read_all(&mut self) -> Result<Vec<u8>, MeshIoError> {
        let mut out = vec![0u8; self.len as usize];
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_exact(&mut out)?;
        Ok(out)
    }
}
