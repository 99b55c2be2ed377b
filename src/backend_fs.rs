//! Local filesystem backend.
//!
//! Writes land in a uniquely-named temp file next to the destination and
//! are renamed into place on commit, so a reader never observes a
//! half-written artifact and an aborted write leaves nothing behind.
//! Parent directories are not created; a missing parent surfaces as
//! `NotFound`.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::backend::{BlobWriter, StorageBackend};
use crate::error::StoreError;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Path-addressed backend over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsBackend;

impl FsBackend {
    pub fn new() -> Self {
        FsBackend
    }
}

impl StorageBackend for FsBackend {
    fn open_write(&self, location: &str) -> Result<Box<dyn BlobWriter>, StoreError> {
        let final_path = PathBuf::from(location);
        let file_name = final_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| StoreError::Other {
                location: location.to_string(),
                source: Box::new(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "path has no file name",
                )),
            })?;
        let tmp_name = format!(
            ".{}.{}.{}.tmp",
            file_name,
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        );
        let tmp_path = match final_path.parent() {
            Some(parent) => parent.join(tmp_name),
            None => PathBuf::from(tmp_name),
        };

        let file = File::create(&tmp_path).map_err(|e| StoreError::from_io(location, e))?;
        Ok(Box::new(FsWriter {
            file: Some(file),
            tmp_path,
            final_path,
            location: location.to_string(),
            committed: false,
        }))
    }

    fn open_read(&self, location: &str) -> Result<Box<dyn Read>, StoreError> {
        let file =
            File::open(Path::new(location)).map_err(|e| StoreError::from_io(location, e))?;
        Ok(Box::new(file))
    }
}

struct FsWriter {
    file: Option<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    location: String,
    committed: bool,
}

impl Write for FsWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.write(buf),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "writer closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl BlobWriter for FsWriter {
    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        let mut file = match self.file.take() {
            Some(file) => file,
            None => return Ok(()),
        };
        file.flush()
            .map_err(|e| StoreError::from_io(&self.location, e))?;
        drop(file);
        fs::rename(&self.tmp_path, &self.final_path)
            .map_err(|e| StoreError::from_io(&self.location, e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for FsWriter {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // Close the handle before unlinking.
        self.file.take();
        if let Err(err) = fs::remove_file(&self.tmp_path) {
            if err.kind() != io::ErrorKind::NotFound {
                log::warn!(
                    "failed to remove partial artifact {}: {}",
                    self.tmp_path.display(),
                    err
                );
            }
        }
    }
}
