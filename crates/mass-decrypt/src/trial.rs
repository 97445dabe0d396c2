use std::path::Path;

use crate::decryptor::Decryptor;
use crate::outcome::{UnlockError, UnlockOutcome};
use crate::passwords::PasswordList;

/// Final outcome for one file plus how many passwords it took to get there.
#[derive(Debug)]
pub struct TrialReport {
    pub outcome: UnlockOutcome,
    pub attempts: usize,
}

/// Try each password in order until one unlocks the file, the file turns out not to need one,
/// or the failure is one that no other password would change.
pub fn try_all(decryptor: &dyn Decryptor, path: &Path, passwords: &PasswordList) -> TrialReport {
    let mut attempts = 0;

    for password in passwords.iter() {
        attempts += 1;
        match decryptor.attempt(path, password) {
            Err(err) if err.is_password_dependent() => {
                log::debug!(
                    "Attempt {attempts}/{} rejected: {}",
                    passwords.len(),
                    path.display()
                );
            }
            outcome => return TrialReport { outcome, attempts },
        }
    }

    TrialReport {
        outcome: Err(UnlockError::WrongPassword),
        attempts,
    }
}
