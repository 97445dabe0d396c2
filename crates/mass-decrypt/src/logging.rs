//! Run log: one append-only file per process, opened at startup.
//!
//! Library code logs through the `log` facade; [`RunLog::install`] routes those records into a
//! `tracing-subscriber` fmt layer that writes plain (non-ANSI) lines to the log file.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILE: &str = "runtime.log";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to open log file `{path}`: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to install logger: {0}")]
    Install(String),
}

/// Handle to the installed run log.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// Open `path` for appending and make it the process-wide log sink.
    ///
    /// `level` is an `EnvFilter` directive (`info`, `debug`, `mass_decrypt=trace`, ...); an
    /// unparsable directive falls back to [`DEFAULT_LOG_LEVEL`].
    pub fn install(path: impl AsRef<Path>, level: &str) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        let file = open_append(&path)?;

        let filter =
            EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
            .try_init()
            .map_err(|err| LogError::Install(err.to_string()))?;

        log::debug!("Logging to {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_append(path: &Path) -> Result<File, LogError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LogError::Open {
            path: path.to_path_buf(),
            source,
        })
}
