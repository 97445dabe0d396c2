//! Filesystem helpers for rewriting documents in place without losing them.
//!
//! A decrypted document replaces its encrypted original via:
//! - a temp file in the same directory (avoids cross-device renames)
//! - flush + `sync_all`
//! - a rename into place with replace semantics (including on Windows)
//! - restoring the original permissions and timestamps on the new file
//!   ([`PreservedMetadata`])

mod times;

use std::fs::{self, File, Permissions};
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

pub use times::{FileTimestamps, CREATION_TIME_RESTORABLE};

#[derive(Debug)]
pub enum AtomicWriteError<E> {
    Io(io::Error),
    Writer(E),
}

impl<E> From<io::Error> for AtomicWriteError<E> {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl<E: std::fmt::Display> std::fmt::Display for AtomicWriteError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtomicWriteError::Io(err) => write!(f, "io error: {err}"),
            AtomicWriteError::Writer(err) => write!(f, "write error: {err}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for AtomicWriteError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AtomicWriteError::Io(err) => Some(err),
            AtomicWriteError::Writer(err) => Some(err),
        }
    }
}

fn parent_dir_or_dot(path: &Path) -> &Path {
    // `Path::parent` returns `Some("")` for bare relative file names like `report.pdf`.
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Atomically replace `dest` with whatever `write_fn` writes.
///
/// The destination's directory must already exist: documents are only ever rewritten where
/// they were found. If `write_fn` returns an error, `dest` is left untouched and the temp file
/// is removed.
pub fn atomic_write<T, E>(
    dest: impl AsRef<Path>,
    write_fn: impl FnOnce(&mut File) -> Result<T, E>,
) -> Result<T, AtomicWriteError<E>> {
    let dest = dest.as_ref();
    let dir = parent_dir_or_dot(dest);

    let mut tmp = NamedTempFile::new_in(dir).map_err(AtomicWriteError::Io)?;
    let out = write_fn(tmp.as_file_mut()).map_err(AtomicWriteError::Writer)?;

    tmp.as_file_mut().flush().map_err(AtomicWriteError::Io)?;
    tmp.as_file().sync_all().map_err(AtomicWriteError::Io)?;

    let tmp_path = tmp.into_temp_path();
    replace_file(tmp_path.as_ref(), dest).map_err(AtomicWriteError::Io)?;

    // The file is already in place; a failed directory sync is not a write failure.
    let _ = sync_parent_dir(dest);

    Ok(out)
}

/// Convenience helper for atomically writing a full byte slice to disk.
pub fn atomic_write_bytes(dest: impl AsRef<Path>, bytes: &[u8]) -> io::Result<()> {
    atomic_write(dest, |file| file.write_all(bytes)).map_err(|err| match err {
        AtomicWriteError::Io(err) => err,
        AtomicWriteError::Writer(err) => err,
    })
}

/// Metadata of a document that has to survive its content being swapped out.
#[derive(Debug, Clone)]
pub struct PreservedMetadata {
    pub times: FileTimestamps,
    pub permissions: Permissions,
}

impl PreservedMetadata {
    pub fn capture(path: impl AsRef<Path>) -> io::Result<Self> {
        let meta = fs::metadata(path.as_ref())?;
        Ok(Self {
            times: FileTimestamps::from_metadata(&meta)?,
            permissions: meta.permissions(),
        })
    }

    /// Restore timestamps first: a read-only permission set would otherwise block the
    /// writable handle that setting times requires.
    pub fn restore(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        self.times.restore(path)?;
        fs::set_permissions(path, self.permissions.clone())
    }

    /// Put back the access time only if reading the file moved it.
    ///
    /// Used on paths that read a document without rewriting it. Best-effort: a file we may
    /// read but not write simply keeps its new access time.
    pub fn restore_access_time_if_changed(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let Ok(now) = FileTimestamps::capture(path) else {
            return;
        };
        if now.accessed == self.times.accessed {
            return;
        }
        let reset = FileTimestamps {
            accessed: self.times.accessed,
            modified: now.modified,
            created: None,
        };
        if let Err(err) = reset.restore(path) {
            log::debug!("could not reset access time of {}: {err}", path.display());
        }
    }
}

fn sync_parent_dir(path: &Path) -> io::Result<()> {
    let parent = parent_dir_or_dot(path);
    // Opening a directory as a file works on most Unix platforms; elsewhere this is a no-op
    // failure that callers ignore.
    let dir = File::open(parent)?;
    dir.sync_all()
}

fn replace_file(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        use std::os::windows::ffi::OsStrExt as _;
        use windows_sys::Win32::Storage::FileSystem::{MoveFileExW, MOVEFILE_REPLACE_EXISTING};

        fn to_wide_null(path: &Path) -> Vec<u16> {
            let mut wide: Vec<u16> = path.as_os_str().encode_wide().collect();
            wide.push(0);
            wide
        }

        let from_w = to_wide_null(from);
        let to_w = to_wide_null(to);
        let ok = unsafe { MoveFileExW(from_w.as_ptr(), to_w.as_ptr(), MOVEFILE_REPLACE_EXISTING) };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(not(windows))]
    {
        fs::rename(from, to)
    }
}
