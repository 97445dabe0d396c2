//! Capture and restore file timestamps across a destructive rewrite.
//!
//! Replacing a file through a rename gives the destination the temp file's inode, so every
//! timestamp the user cares about has to be put back by hand afterwards.
//!
//! Platform coverage:
//! - access and modification times are restored everywhere;
//! - creation (birth) time is restored on Windows and macOS;
//! - on other Unix platforms there is no API to set a birth time, so it is captured but not
//!   restored. The inode change time (`ctime`) is never settable from userspace.

use std::fs::{self, FileTimes, Metadata, OpenOptions};
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Whether [`FileTimestamps::restore`] can put back the creation time on this platform.
pub const CREATION_TIME_RESTORABLE: bool = cfg!(any(windows, target_os = "macos"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimestamps {
    pub accessed: SystemTime,
    pub modified: SystemTime,
    /// `None` when the filesystem does not report a birth time.
    pub created: Option<SystemTime>,
}

impl FileTimestamps {
    pub fn capture(path: impl AsRef<Path>) -> io::Result<Self> {
        let meta = fs::metadata(path.as_ref())?;
        Self::from_metadata(&meta)
    }

    pub fn from_metadata(meta: &Metadata) -> io::Result<Self> {
        Ok(Self {
            accessed: meta.accessed()?,
            modified: meta.modified()?,
            created: meta.created().ok(),
        })
    }

    /// Reapply the captured times to `path`.
    ///
    /// The file is opened for writing (without truncation) because both `utimensat` and
    /// `SetFileTime` need a writable handle.
    pub fn restore(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = OpenOptions::new().write(true).open(path.as_ref())?;
        let times = FileTimes::new()
            .set_accessed(self.accessed)
            .set_modified(self.modified);

        #[cfg(windows)]
        let times = {
            use std::os::windows::fs::FileTimesExt as _;
            match self.created {
                Some(created) => times.set_created(created),
                None => times,
            }
        };

        #[cfg(target_os = "macos")]
        let times = {
            use std::os::macos::fs::FileTimesExt as _;
            match self.created {
                Some(created) => times.set_created(created),
                None => times,
            }
        };

        file.set_times(times)
    }
}
