//! PDF documents protected by the standard security handler (RC4/AES, user/owner passwords).
//!
//! Parsing, key derivation and object decryption belong to `lopdf`. A document whose user
//! password is empty (owner-password-only protection) is unlocked without consulting the
//! candidate at all.

use std::collections::BTreeSet;
use std::path::Path;

use lopdf::encryption::DecryptionError;
use lopdf::{Document, Object, ObjectId};

use super::{commit_plaintext, leave_untouched, open_document, Decryptor};
use crate::kind::DocumentKind;
use crate::outcome::{UnlockError, UnlockOutcome, Unlocked};

#[derive(Debug, Default)]
pub struct PdfDecryptor {
    integrity_check: bool,
}

impl PdfDecryptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the decrypted output before it replaces the original.
    pub fn with_integrity_check(mut self, enabled: bool) -> Self {
        self.integrity_check = enabled;
        self
    }

    /// Decrypt `bytes` into a staged plaintext document.
    ///
    /// Returns `Ok(None)` when the document is not encrypted.
    fn stage_plaintext(
        &self,
        bytes: &[u8],
        password: &str,
    ) -> Result<Option<Vec<u8>>, UnlockError> {
        let mut doc =
            Document::load_mem(bytes).map_err(|err| UnlockError::Parse(err.to_string()))?;

        // `lopdf` transparently opens documents whose user password is empty; those still
        // carry protection worth stripping.
        let decrypted_on_load = doc.encryption_state.is_some();
        if !decrypted_on_load {
            if !doc.is_encrypted() {
                return Ok(None);
            }
            check_security_handler(&doc)?;

            let key = if doc.authenticate_password("").is_ok() {
                ""
            } else {
                password
            };
            doc.decrypt(key).map_err(classify_decrypt_error)?;
        }
        strip_encryption(&mut doc);

        let mut plaintext = Vec::with_capacity(bytes.len());
        doc.save_to(&mut plaintext).map_err(|err| {
            UnlockError::Other(format!("failed to serialise decrypted PDF: {err}"))
        })?;

        if self.integrity_check {
            let problems = check_pdf_structure(&plaintext);
            if !problems.is_empty() {
                return Err(UnlockError::IntegrityCheckFailed { problems });
            }
        }

        Ok(Some(plaintext))
    }
}

impl Decryptor for PdfDecryptor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Pdf
    }

    fn attempt(&self, path: &Path, password: &str) -> UnlockOutcome {
        let (preserved, bytes) = open_document(path)?;

        match self.stage_plaintext(&bytes, password) {
            Ok(Some(plaintext)) => commit_plaintext(path, &plaintext, &preserved),
            Ok(None) => leave_untouched(path, &preserved, Ok(Unlocked::Unencrypted)),
            Err(err) => leave_untouched(path, &preserved, Err(err)),
        }
    }
}

fn classify_decrypt_error(err: lopdf::Error) -> UnlockError {
    match err {
        lopdf::Error::Decryption(DecryptionError::IncorrectPassword) => UnlockError::WrongPassword,
        lopdf::Error::Decryption(err) => UnlockError::UnsupportedFormat(err.to_string()),
        err => UnlockError::Other(err.to_string()),
    }
}

fn check_security_handler(doc: &Document) -> Result<(), UnlockError> {
    let encrypt = doc
        .trailer
        .get(b"Encrypt")
        .map_err(|err| UnlockError::Parse(format!("missing /Encrypt entry: {err}")))?;
    let dict = match encrypt {
        Object::Reference(id) => doc.get_dictionary(*id),
        other => other.as_dict(),
    }
    .map_err(|err| UnlockError::Parse(format!("unreadable encryption dictionary: {err}")))?;

    let filter = dict
        .get(b"Filter")
        .and_then(|filter| filter.as_name())
        .map_err(|err| UnlockError::Parse(format!("encryption dictionary has no /Filter: {err}")))?;
    if filter != b"Standard".as_slice() {
        return Err(UnlockError::UnsupportedFormat(format!(
            "security handler /{}",
            String::from_utf8_lossy(filter)
        )));
    }
    Ok(())
}

fn strip_encryption(doc: &mut Document) {
    doc.encryption_state = None;
    if let Some(Object::Reference(id)) = doc.trailer.remove(b"Encrypt") {
        doc.objects.remove(&id);
    }
}

/// Structural validation of a serialised PDF.
///
/// Returns a list of problems; an empty list means the document is well-formed as far as
/// these checks go: it parses, carries no encryption dictionary, its trailer `/Root` resolves
/// to a `/Catalog` with a resolvable `/Pages` tree, and no indirect reference dangles.
pub fn check_pdf_structure(bytes: &[u8]) -> Vec<String> {
    let doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(err) => return vec![format!("document does not parse: {err}")],
    };

    let mut problems = Vec::new();
    if doc.is_encrypted() {
        problems.push("document still carries an /Encrypt dictionary".to_string());
    }

    match doc.trailer.get(b"Root").and_then(|root| root.as_reference()) {
        Err(_) => problems.push("trailer has no /Root reference".to_string()),
        Ok(root_id) => match doc.get_dictionary(root_id) {
            Err(_) => problems.push(format!(
                "/Root {} does not resolve to a dictionary",
                display_id(root_id)
            )),
            Ok(catalog) => {
                let is_catalog = catalog
                    .get(b"Type")
                    .and_then(|ty| ty.as_name())
                    .map(|name| name == b"Catalog".as_slice())
                    .unwrap_or(false);
                if !is_catalog {
                    problems.push("/Root is not a /Catalog".to_string());
                }
                match catalog.get(b"Pages").and_then(|pages| pages.as_reference()) {
                    Err(_) => problems.push("catalog has no /Pages reference".to_string()),
                    Ok(pages_id) if doc.get_dictionary(pages_id).is_err() => problems.push(
                        format!("/Pages {} does not resolve to a dictionary", display_id(pages_id)),
                    ),
                    Ok(_) => {}
                }
            }
        },
    }

    let mut references = BTreeSet::new();
    for object in doc.objects.values() {
        collect_references(object, &mut references);
    }
    problems.extend(
        references
            .into_iter()
            .filter(|id| !doc.objects.contains_key(id))
            .map(|id| format!("dangling reference {}", display_id(id))),
    );

    problems
}

fn collect_references(object: &Object, out: &mut BTreeSet<ObjectId>) {
    match object {
        Object::Reference(id) => {
            out.insert(*id);
        }
        Object::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                collect_references(value, out);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                collect_references(value, out);
            }
        }
        _ => {}
    }
}

fn display_id((number, generation): ObjectId) -> String {
    format!("{number} {generation} R")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn save(doc: &mut Document) -> Vec<u8> {
        let mut out = Vec::new();
        doc.save_to(&mut out).expect("save pdf");
        out
    }

    fn minimal_doc() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn well_formed_document_has_no_problems() {
        let bytes = save(&mut minimal_doc());
        assert_eq!(check_pdf_structure(&bytes), Vec::<String>::new());
    }

    #[test]
    fn dangling_reference_is_reported() {
        let mut doc = minimal_doc();
        doc.add_object(dictionary! {
            "Type" => "Annot",
            "P" => Object::Reference((999, 0)),
        });
        let problems = check_pdf_structure(&save(&mut doc));
        assert!(
            problems.iter().any(|p| p.contains("dangling reference 999 0 R")),
            "{problems:?}"
        );
    }

    #[test]
    fn root_must_be_a_catalog() {
        let mut doc = minimal_doc();
        let bogus = doc.add_object(dictionary! { "Type" => "Outlines" });
        doc.trailer.set("Root", bogus);
        let problems = check_pdf_structure(&save(&mut doc));
        assert!(problems.iter().any(|p| p.contains("not a /Catalog")), "{problems:?}");
        assert!(problems.iter().any(|p| p.contains("no /Pages")), "{problems:?}");
    }

    #[test]
    fn garbage_does_not_parse() {
        let problems = check_pdf_structure(b"quarterly figures, definitely not a pdf");
        assert_eq!(problems.len(), 1, "{problems:?}");
        assert!(problems[0].starts_with("document does not parse"));
    }
}
