//! Batch removal of password protection from Office and PDF documents.
//!
//! A run walks a folder, picks the documents of the selected classes by extension, and tries
//! each candidate password in order until one unlocks the document. Unlocked documents are
//! rewritten in place (atomically, keeping their timestamps and permissions); everything else is
//! left byte-for-byte untouched. Per-file decisions go to an append-only run log and the run
//! ends with a three-line summary.

pub mod batch;
pub mod cli;
pub mod decryptor;
pub mod discovery;
pub mod kind;
pub mod logging;
pub mod outcome;
pub mod passwords;
pub mod trial;

pub use batch::{run, BatchError, BatchObserver, BatchOptions, NoProgress};
pub use decryptor::{check_pdf_structure, Decryptor, Decryptors, OfficeDecryptor, PdfDecryptor};
pub use discovery::{discover, CandidateFile};
pub use kind::{DocumentClasses, DocumentKind};
pub use outcome::{RunTally, UnlockError, UnlockOutcome, Unlocked};
pub use passwords::{PasswordList, PasswordListError};
pub use trial::{try_all, TrialReport};
