use std::path::PathBuf;

use crate::decryptor::Decryptors;
use crate::discovery::{discover, CandidateFile};
use crate::kind::DocumentClasses;
use crate::outcome::{RunTally, UnlockError, Unlocked};
use crate::passwords::PasswordList;
use crate::trial::{try_all, TrialReport};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub root: PathBuf,
    pub recursive: bool,
    pub classes: DocumentClasses,
    /// Structurally validate decrypted PDFs before they replace the original.
    pub integrity_check: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("'{}' is not a valid directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("no document classes selected (pass --office and/or --pdf)")]
    NoDocumentClasses,
}

/// Progress surface for a batch run. All methods default to no-ops.
pub trait BatchObserver {
    fn on_start(&mut self, _total: usize) {}
    fn on_file_start(&mut self, _file: &CandidateFile, _index: usize) {}
    fn on_file_done(&mut self, _file: &CandidateFile, _report: &TrialReport) {}
    fn on_finish(&mut self, _tally: &RunTally) {}
}

/// Observer that ignores every event.
pub struct NoProgress;

impl BatchObserver for NoProgress {}

/// Process every matching document under `options.root`.
///
/// Only an invalid root or an empty class selection fail the run, and both are checked before
/// any file is touched. Per-file failures are counted and logged.
pub fn run(
    options: &BatchOptions,
    passwords: &PasswordList,
    observer: &mut dyn BatchObserver,
) -> Result<RunTally, BatchError> {
    if !options.root.is_dir() {
        return Err(BatchError::NotADirectory(options.root.clone()));
    }
    if options.classes.is_empty() {
        return Err(BatchError::NoDocumentClasses);
    }

    let files = discover(&options.root, options.recursive, options.classes);
    log::info!(
        "Scanning {}: {} candidate file(s), {} password(s)",
        options.root.display(),
        files.len(),
        passwords.len()
    );

    let decryptors = Decryptors::new(options.integrity_check);
    let mut tally = RunTally::default();
    observer.on_start(files.len());

    for (index, file) in files.iter().enumerate() {
        observer.on_file_start(file, index);

        let report = try_all(decryptors.for_kind(file.kind), &file.path, passwords);
        log_outcome(file, &report);
        tally.record(&report.outcome);

        observer.on_file_done(file, &report);
    }

    log::info!(
        "Finished {}: decrypted={} unencrypted={} errors={}",
        options.root.display(),
        tally.decrypted,
        tally.unencrypted,
        tally.errors
    );
    observer.on_finish(&tally);
    Ok(tally)
}

fn log_outcome(file: &CandidateFile, report: &TrialReport) {
    let path = file.path.display();
    let kind = file.kind;
    match &report.outcome {
        Ok(Unlocked::Decrypted) => {
            log::info!("Unlocked: {path} [{kind}] (attempt {})", report.attempts)
        }
        Ok(Unlocked::Unencrypted) => log::info!("Not encrypted: {path} [{kind}]"),
        Err(UnlockError::WrongPassword) => log::warn!(
            "No matching password: {path} [{kind}] ({} tried)",
            report.attempts
        ),
        Err(err @ (UnlockError::Io(_) | UnlockError::Other(_))) => {
            log::error!("Error: {path} [{kind}], {err}")
        }
        Err(err) => log::warn!("{}: {path} [{kind}], {err}", err.label()),
    }
}
