use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use indicatif::{ProgressBar, ProgressStyle};

use crate::batch::{self, BatchError, BatchObserver, BatchOptions, NoProgress};
use crate::discovery::CandidateFile;
use crate::kind::DocumentClasses;
use crate::logging::{LogError, RunLog, DEFAULT_LOG_FILE, DEFAULT_LOG_LEVEL};
use crate::outcome::RunTally;
use crate::passwords::{PasswordList, PasswordListError};
use crate::trial::TrialReport;

/// Exit code for a root path that is not a directory.
pub const EXIT_NOT_A_DIRECTORY: u8 = 3;
/// Exit code for a password list that cannot be read or holds no passwords.
pub const EXIT_PASSWORD_LIST: u8 = 4;
/// Exit code for a log file that cannot be opened.
pub const EXIT_LOG_FILE: u8 = 5;

#[derive(Parser, Debug)]
#[command(name = "mass_decrypt", version, about = "Unlock PDF and Office files.")]
#[command(group(
    ArgGroup::new("password_source")
        .required(true)
        .args(["password", "plist"])
))]
#[command(group(
    ArgGroup::new("document_classes")
        .required(true)
        .multiple(true)
        .args(["pdf", "office"])
))]
pub struct Args {
    /// Path to the folder containing the documents.
    pub path: PathBuf,

    /// Recursively process subfolders.
    #[arg(short = 'R', long)]
    pub recursive: bool,

    /// Password for decryption.
    #[arg(short = 'p', long)]
    pub password: Option<String>,

    /// Path to a text file with one password per line.
    ///
    /// Trailing whitespace is stripped and blank lines are skipped.
    #[arg(long, value_name = "FILE")]
    pub plist: Option<PathBuf>,

    /// Decrypt PDF files.
    #[arg(short = 'P', long)]
    pub pdf: bool,

    /// Decrypt Office files (Word, Excel, PowerPoint).
    #[arg(short = 'O', long)]
    pub office: bool,

    /// Validate decrypted PDF files before they replace the original.
    #[arg(long)]
    pub integrity_check: bool,

    /// Append-only log of per-file decisions.
    #[arg(long, value_name = "FILE", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Do not draw a progress bar.
    #[arg(long)]
    pub no_progress: bool,
}

impl Args {
    fn classes(&self) -> DocumentClasses {
        DocumentClasses {
            office: self.office,
            pdf: self.pdf,
        }
    }

    fn passwords(&self) -> Result<PasswordList> {
        match (&self.password, &self.plist) {
            (Some(password), _) => Ok(PasswordList::single(password.as_str())),
            (None, Some(path)) => Ok(PasswordList::from_file(path)?),
            // `clap` enforces the `password_source` group; this covers programmatic callers.
            (None, None) => anyhow::bail!("either --password or --plist must be provided"),
        }
    }
}

pub fn run() -> ExitCode {
    let args = Args::parse();
    match run_with_args(args) {
        Ok(tally) => {
            println!("\n{tally}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

pub fn run_with_args(args: Args) -> Result<RunTally> {
    let passwords = args.passwords()?;

    if !args.path.is_dir() {
        return Err(BatchError::NotADirectory(args.path.clone()).into());
    }

    let run_log = RunLog::install(&args.log_file, &args.log_level)?;
    log::info!(
        "Run started: root={} recursive={} office={} pdf={} integrity_check={} log={}",
        args.path.display(),
        args.recursive,
        args.office,
        args.pdf,
        args.integrity_check,
        run_log.path().display()
    );

    let options = BatchOptions {
        root: args.path.clone(),
        recursive: args.recursive,
        classes: args.classes(),
        integrity_check: args.integrity_check,
    };

    let tally = if args.no_progress {
        batch::run(&options, &passwords, &mut NoProgress)
    } else {
        batch::run(&options, &passwords, &mut ProgressObserver::default())
    }
    .with_context(|| format!("processing {}", args.path.display()))?;

    Ok(tally)
}

/// Map a fatal error to its documented exit code.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    if let Some(BatchError::NotADirectory(_)) = err.downcast_ref::<BatchError>() {
        EXIT_NOT_A_DIRECTORY
    } else if err.downcast_ref::<PasswordListError>().is_some() {
        EXIT_PASSWORD_LIST
    } else if err.downcast_ref::<LogError>().is_some() {
        EXIT_LOG_FILE
    } else {
        1
    }
}

/// Progress bar on stderr showing the file currently being processed.
#[derive(Default)]
struct ProgressObserver {
    bar: Option<ProgressBar>,
}

impl BatchObserver for ProgressObserver {
    fn on_start(&mut self, total: usize) {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{msg} [{wide_bar}] {pos}/{len} files ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        self.bar = Some(bar);
    }

    fn on_file_start(&mut self, file: &CandidateFile, _index: usize) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("Processing: {}", file.display_name));
        }
    }

    fn on_file_done(&mut self, _file: &CandidateFile, _report: &TrialReport) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn on_finish(&mut self, _tally: &RunTally) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
