//! Per-format "remove protection in place" capability.
//!
//! Each implementation follows the same contract:
//! - decide whether the file is encrypted without using the candidate password, and return
//!   [`Unlocked::Unencrypted`] without writing anything if it is not;
//! - otherwise hand the password to the codec crate and classify its answer (rejected key vs.
//!   broken/unsupported container vs. I/O fault);
//! - on success, stage the full plaintext in memory and only then atomically replace the
//!   original, restoring its permissions and timestamps afterwards.

mod office;
mod pdf;

use std::path::Path;

use mass_decrypt_fs::PreservedMetadata;

use crate::kind::DocumentKind;
use crate::outcome::{UnlockError, UnlockOutcome, Unlocked};

pub use office::OfficeDecryptor;
pub use pdf::{check_pdf_structure, PdfDecryptor};

pub trait Decryptor {
    fn kind(&self) -> DocumentKind;

    /// Try to remove protection from `path` using `password`.
    fn attempt(&self, path: &Path, password: &str) -> UnlockOutcome;
}

/// One decryptor per document kind, selected by file extension at dispatch time.
pub struct Decryptors {
    office: OfficeDecryptor,
    pdf: PdfDecryptor,
}

impl Decryptors {
    pub fn new(integrity_check: bool) -> Self {
        Self {
            office: OfficeDecryptor::new(),
            pdf: PdfDecryptor::new().with_integrity_check(integrity_check),
        }
    }

    pub fn for_kind(&self, kind: DocumentKind) -> &dyn Decryptor {
        match kind {
            DocumentKind::Office => &self.office,
            DocumentKind::Pdf => &self.pdf,
        }
    }
}

/// Snapshot a document before reading it, so every exit path can put its metadata back.
fn open_document(path: &Path) -> Result<(PreservedMetadata, Vec<u8>), UnlockError> {
    let preserved = PreservedMetadata::capture(path)?;
    let bytes = std::fs::read(path)?;
    Ok((preserved, bytes))
}

/// Exit path for outcomes that leave the document untouched.
fn leave_untouched(
    path: &Path,
    preserved: &PreservedMetadata,
    outcome: UnlockOutcome,
) -> UnlockOutcome {
    preserved.restore_access_time_if_changed(path);
    outcome
}

/// Swap in the staged plaintext and restore the original metadata.
///
/// Once the rename has happened the document counts as decrypted; failing to restore its
/// metadata afterwards is logged rather than turned into an error.
fn commit_plaintext(
    path: &Path,
    plaintext: &[u8],
    preserved: &PreservedMetadata,
) -> UnlockOutcome {
    mass_decrypt_fs::atomic_write_bytes(path, plaintext)?;

    if let Err(err) = preserved.restore(path) {
        log::warn!("Metadata not restored: {}, {err}", path.display());
    } else if preserved.times.created.is_some() && !mass_decrypt_fs::CREATION_TIME_RESTORABLE {
        log::debug!(
            "Creation time not restorable on this platform: {}",
            path.display()
        );
    }
    Ok(Unlocked::Decrypted)
}
