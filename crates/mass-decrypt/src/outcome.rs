use std::fmt;

/// A terminal success for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unlocked {
    /// Protection was removed and the file rewritten.
    Decrypted,
    /// The file was not protected; nothing was written.
    Unencrypted,
}

#[derive(Debug, thiserror::Error)]
pub enum UnlockError {
    #[error("password rejected")]
    WrongPassword,
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("parse error: {0}")]
    Parse(String),
    /// Decryption succeeded but the output failed structural validation.
    #[error("integrity check failed: {}", .problems.join("; "))]
    IntegrityCheckFailed { problems: Vec<String> },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

impl UnlockError {
    /// Only a rejected key depends on which password was tried; every other failure repeats
    /// identically for the rest of the list.
    pub fn is_password_dependent(&self) -> bool {
        matches!(self, UnlockError::WrongPassword)
    }

    pub fn label(&self) -> &'static str {
        match self {
            UnlockError::WrongPassword => "wrong_password",
            UnlockError::UnsupportedFormat(_) => "unsupported_format",
            UnlockError::Parse(_) => "parse_error",
            UnlockError::IntegrityCheckFailed { .. } => "integrity_check_failed",
            UnlockError::Io(_) | UnlockError::Other(_) => "other_error",
        }
    }
}

/// Result of trying to unlock one document.
pub type UnlockOutcome = Result<Unlocked, UnlockError>;

/// Per-run outcome counters. Every processed file lands in exactly one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    pub decrypted: usize,
    pub unencrypted: usize,
    pub errors: usize,
}

impl RunTally {
    pub fn record(&mut self, outcome: &UnlockOutcome) {
        match outcome {
            Ok(Unlocked::Decrypted) => self.decrypted += 1,
            Ok(Unlocked::Unencrypted) => self.unencrypted += 1,
            Err(_) => self.errors += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.decrypted + self.unencrypted + self.errors
    }
}

impl fmt::Display for RunTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Files decrypted: {}", self.decrypted)?;
        writeln!(f, "Files unencrypted: {}", self.unencrypted)?;
        write!(
            f,
            "Files not read (errors or no matching password): {}",
            self.errors
        )
    }
}
