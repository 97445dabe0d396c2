#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use lopdf::{dictionary, Document, EncryptionState, EncryptionVersion, Object, Permissions};
use mass_decrypt_fs::FileTimestamps;
use ms_offcrypto_writer::Ecma376AgileWriter;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const PASSWORD: &str = "correct horse";

/// A fixed point in the past, so a rewrite that forgets to restore times is visible.
pub fn backdated() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_500_000_000)
}

pub fn backdate(path: &Path) {
    FileTimestamps {
        accessed: backdated(),
        modified: backdated(),
        created: None,
    }
    .restore(path)
    .expect("backdate file");
}

pub fn zip_bytes(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let cursor = Cursor::new(Vec::new());
    let mut writer = ZipWriter::new(cursor);
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Stored);

    for (name, bytes) in parts {
        writer.start_file(*name, options).expect("start zip entry");
        writer.write_all(bytes).expect("write zip entry");
    }

    writer.finish().expect("finish zip").into_inner()
}

const CONTENT_TYPES: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#;
const DOCUMENT: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p/></w:body></w:document>"#;

/// A well-formed Word package larger than one Agile segment (4096 bytes).
pub fn plain_docx() -> Vec<u8> {
    let mut styles = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    );
    for level in 1..=64 {
        styles.push_str(&format!(
            r#"<w:style w:type="paragraph" w:styleId="Heading{level}"><w:name w:val="heading {level}"/></w:style>"#
        ));
    }
    styles.push_str("</w:styles>");

    let bytes = zip_bytes(&[
        ("[Content_Types].xml", CONTENT_TYPES),
        ("word/document.xml", DOCUMENT),
        ("word/styles.xml", styles.as_bytes()),
    ]);
    assert!(bytes.len() > 4096, "fixture must span more than one segment");
    bytes
}

/// A Word package smaller than one Agile segment.
pub fn small_docx() -> Vec<u8> {
    zip_bytes(&[
        ("[Content_Types].xml", CONTENT_TYPES),
        ("word/document.xml", DOCUMENT),
    ])
}

/// Wrap `plain` in an ECMA-376 Agile encrypted OLE container.
pub fn encrypt_package(plain: &[u8], password: &str) -> Vec<u8> {
    let cursor = Cursor::new(Vec::<u8>::new());
    let mut rng = rand::rng();
    let mut writer =
        Ecma376AgileWriter::create(&mut rng, password, cursor).expect("create encryptor");
    writer.write_all(plain).expect("write plaintext package");
    writer.into_inner().expect("finalize encryption").into_inner()
}

fn pdf_document(dangling_annotation: bool) -> Document {
    let mut doc = Document::with_version("1.5");
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(vec![1u8; 16], lopdf::StringFormat::Literal),
            Object::String(vec![2u8; 16], lopdf::StringFormat::Literal),
        ]),
    );

    let pages_id = doc.new_object_id();
    let mut page = dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
    };
    if dangling_annotation {
        page.set("Annots", vec![Object::Reference((999, 0))]);
    }
    let page_id = doc.add_object(page);
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Quarterly figures"),
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc
}

pub fn plain_pdf() -> Vec<u8> {
    let mut out = Vec::new();
    pdf_document(false).save_to(&mut out).expect("save pdf");
    out
}

/// RC4-128 encrypted PDF with the given passwords.
pub fn encrypted_pdf(user_password: &str, owner_password: &str) -> Vec<u8> {
    encrypt_pdf(pdf_document(false), user_password, owner_password)
}

/// Encrypted PDF whose page points at an annotation object that does not exist.
pub fn encrypted_pdf_with_dangling_annotation(password: &str) -> Vec<u8> {
    encrypt_pdf(pdf_document(true), password, "owner-secret")
}

fn encrypt_pdf(mut doc: Document, user_password: &str, owner_password: &str) -> Vec<u8> {
    let version = EncryptionVersion::V2 {
        document: &doc,
        owner_password,
        user_password,
        key_length: 128,
        permissions: Permissions::all(),
    };
    let state = EncryptionState::try_from(version).expect("encryption state");
    doc.encrypt(&state).expect("encrypt pdf");

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save encrypted pdf");
    out
}

pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04")
}
