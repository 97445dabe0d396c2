use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PasswordListError {
    #[error("failed to read password list `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("password list `{path}` contains no passwords")]
    Empty { path: PathBuf },
}

/// Ordered candidate passwords, tried front to back for every file.
///
/// Never empty: construction from a list file fails rather than produce a list that could
/// not even detect an unencrypted file.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordList {
    passwords: Vec<String>,
}

impl PasswordList {
    /// A list holding one literal password. The empty string is a valid candidate.
    pub fn single(password: impl Into<String>) -> Self {
        Self {
            passwords: vec![password.into()],
        }
    }

    /// Load a newline-delimited list.
    ///
    /// Trailing whitespace (including `\r` from CRLF files) is stripped from every line,
    /// a leading UTF-8 BOM is dropped, and blank lines are skipped. Leading whitespace is
    /// kept because it can be part of a password.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PasswordListError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| PasswordListError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let list = Self::parse(&contents);
        if list.passwords.is_empty() {
            return Err(PasswordListError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(list)
    }

    fn parse(contents: &str) -> Self {
        let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
        let passwords = contents
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self { passwords }
    }

    pub fn len(&self) -> usize {
        self.passwords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passwords.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.passwords.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PasswordList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            passwords: iter.into_iter().map(Into::into).collect(),
        }
    }
}

// Candidates are secrets; keep them out of debug output and logs.
impl std::fmt::Debug for PasswordList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordList")
            .field("len", &self.passwords.len())
            .finish_non_exhaustive()
    }
}
