use std::fmt;
use std::path::Path;

/// Word processing, spreadsheet and presentation containers handled by the Office decryptor.
pub const OFFICE_EXTENSIONS: &[&str] = &[
    "doc", "docx", "docm", "xls", "xlsx", "xlsm", "xlsb", "pptx", "pptm",
];

pub const PDF_EXTENSIONS: &[&str] = &["pdf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Office,
    Pdf,
}

impl DocumentKind {
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            DocumentKind::Office => OFFICE_EXTENSIONS,
            DocumentKind::Pdf => PDF_EXTENSIONS,
        }
    }

    /// Classify a path by its extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        [DocumentKind::Office, DocumentKind::Pdf]
            .into_iter()
            .find(|kind| kind.extensions().contains(&ext.as_str()))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Office => "office",
            DocumentKind::Pdf => "pdf",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The document classes a run was asked to process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentClasses {
    pub office: bool,
    pub pdf: bool,
}

impl DocumentClasses {
    pub const ALL: DocumentClasses = DocumentClasses {
        office: true,
        pdf: true,
    };

    pub fn is_empty(self) -> bool {
        !self.office && !self.pdf
    }

    pub fn contains(self, kind: DocumentKind) -> bool {
        match kind {
            DocumentKind::Office => self.office,
            DocumentKind::Pdf => self.pdf,
        }
    }

    /// Kind of `path` if it belongs to one of the requested classes.
    pub fn classify(self, path: &Path) -> Option<DocumentKind> {
        DocumentKind::from_path(path).filter(|kind| self.contains(*kind))
    }
}
