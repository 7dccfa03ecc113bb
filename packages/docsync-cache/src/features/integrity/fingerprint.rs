//! Filesystem probing and file hashing

use crate::errors::CacheResult;
use crate::shared::ContentHash;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

impl ContentHash {
    /// Compute from file path (streamed read + hash)
    pub fn from_file(path: impl AsRef<Path>) -> CacheResult<Self> {
        let mut file = File::open(path.as_ref())?;
        let mut hasher = Sha256::new();

        let mut buffer = [0u8; 8192];
        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(Self(hasher.finalize().into()))
    }
}

/// Current on-disk state of a backing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileState {
    pub exists: bool,
    pub mtime_ns: Option<u64>,
    pub size_bytes: u64,
}

impl FileState {
    pub const ABSENT: FileState = FileState {
        exists: false,
        mtime_ns: None,
        size_bytes: 0,
    };

    /// Stat the path. A missing path, a path routed through a regular file, or
    /// a directory is `ABSENT`; any other stat failure is an error.
    pub fn probe(path: &Path) -> CacheResult<Self> {
        let metadata = match path.metadata() {
            Ok(m) => m,
            Err(e) if cannot_exist(&e) => return Ok(Self::ABSENT),
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_file() {
            return Ok(Self::ABSENT);
        }

        Ok(Self {
            exists: true,
            mtime_ns: Some(mtime_ns(metadata.modified()?)),
            size_bytes: metadata.len(),
        })
    }
}

/// No file can live at the path: it is missing, or a parent component is a file
fn cannot_exist(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// Nanoseconds since Unix epoch (pre-epoch clamps to 0)
fn mtime_ns(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
