//! Office documents: OOXML packages (`EncryptedPackage` inside an OLE/CFB wrapper) and legacy
//! binary Word/Excel files.
//!
//! Key derivation and decryption belong to the `office-crypto` crate. This module only looks at
//! container structure, enough to answer "is this protected?" without a password:
//! - a ZIP (`PK\x03\x04`) is a plain OOXML package;
//! - an OLE file with `EncryptionInfo` + `EncryptedPackage` streams is an encrypted OOXML package;
//! - an OLE file with a `WordDocument` stream is protected iff its FIB has `fEncrypted` set;
//! - an OLE file with a `Workbook`/`Book` stream is protected iff the globals substream carries
//!   a `FILEPASS` record.
//!
//! `office-crypto` has no BIFF decryption, so a protected Excel 97-2003 workbook is reported as
//! unsupported without consulting the codec. Agile packages shorter than one segment are
//! rejected the same way.

use std::io::{Cursor, Read};
use std::path::Path;

use office_crypto::DecryptError;

use super::{commit_plaintext, leave_untouched, open_document, Decryptor};
use crate::kind::DocumentKind;
use crate::outcome::{UnlockError, UnlockOutcome, Unlocked};

const OLE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];

/// `FibBase.wIdent` of a Word binary document.
const WORD_FIB_IDENT: u16 = 0xA5EC;
/// `FibBase` flags word: `fEncrypted` (bit 8) and `fObfuscated` (bit 15).
const FIB_FLAGS_OFFSET: usize = 0x0A;
const FIB_ENCRYPTED: u16 = 0x0100;
const FIB_OBFUSCATED: u16 = 0x8000;

const BIFF_BOF_BIFF8: u16 = 0x0809;
const BIFF_BOF_BIFF5: u16 = 0x0009;
const BIFF_EOF: u16 = 0x000A;
const BIFF_FILEPASS: u16 = 0x002F;

/// Agile encryption processes the package in segments of this many plaintext bytes.
const AGILE_SEGMENT_LENGTH: u64 = 4096;
/// `EncryptedPackage` starts with the plaintext size as a little-endian `u64`.
const PACKAGE_SIZE_PREFIX: u64 = 8;

/// ECMA-376 scheme named by the `EncryptionInfo` version header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PackageScheme {
    Agile,
    Standard,
}

/// What kind of protection a container carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Protection {
    None,
    /// ECMA-376 Agile or Standard encryption of an OOXML package.
    EncryptedPackage(PackageScheme),
    /// RC4 / RC4 CryptoAPI encryption of a Word 97-2003 document.
    LegacyWord,
    /// `FILEPASS`-protected Excel 97-2003 workbook.
    LegacyExcel,
}

#[derive(Debug, Default)]
pub struct OfficeDecryptor;

impl OfficeDecryptor {
    pub fn new() -> Self {
        Self
    }
}

impl Decryptor for OfficeDecryptor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Office
    }

    fn attempt(&self, path: &Path, password: &str) -> UnlockOutcome {
        let (preserved, bytes) = open_document(path)?;

        let protection = match inspect(&bytes) {
            Ok(protection) => protection,
            Err(err) => return leave_untouched(path, &preserved, Err(err)),
        };
        if protection == Protection::None {
            return leave_untouched(path, &preserved, Ok(Unlocked::Unencrypted));
        }

        log::debug!("{protection:?} protection detected: {}", path.display());
        let plaintext = match decrypt(&bytes, password, protection) {
            Ok(plaintext) => plaintext,
            Err(err) => return leave_untouched(path, &preserved, Err(err)),
        };

        commit_plaintext(path, &plaintext, &preserved)
    }
}

fn decrypt(bytes: &[u8], password: &str, protection: Protection) -> Result<Vec<u8>, UnlockError> {
    let expected_magic: &[u8] = match protection {
        Protection::EncryptedPackage(_) => &ZIP_MAGIC,
        Protection::LegacyWord => &OLE_MAGIC,
        Protection::LegacyExcel => {
            return Err(UnlockError::UnsupportedFormat(
                "FILEPASS-protected Excel 97-2003 workbook".to_string(),
            ))
        }
        Protection::None => return Ok(bytes.to_vec()),
    };

    let plaintext = run_codec(bytes, password, protection)?;

    // Some schemes have no password verifier; a wrong key then shows up as garbage output.
    if !plaintext.starts_with(expected_magic) {
        return Err(UnlockError::WrongPassword);
    }
    Ok(plaintext)
}

/// Malformed streams can panic inside the codec; that stays a failure of this file only.
fn run_codec(bytes: &[u8], password: &str, protection: Protection) -> Result<Vec<u8>, UnlockError> {
    match std::panic::catch_unwind(|| office_crypto::decrypt_from_bytes(bytes.to_vec(), password)) {
        Ok(Ok(plaintext)) => Ok(plaintext),
        Ok(Err(err)) => Err(classify_codec_error(err, protection)),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("unknown panic");
            Err(UnlockError::Other(format!("office-crypto aborted: {reason}")))
        }
    }
}

/// Only the RC4 CryptoAPI path reports a failed password verifier as `InvalidStructure`; for
/// packages that error means the container itself is broken.
fn classify_codec_error(err: DecryptError, protection: Protection) -> UnlockError {
    match err {
        DecryptError::Unimplemented(what) => UnlockError::UnsupportedFormat(what),
        DecryptError::IoError(err) => UnlockError::Io(err),
        DecryptError::InvalidHeader => {
            UnlockError::Parse("invalid compound document header".to_string())
        }
        DecryptError::InvalidStructure if protection == Protection::LegacyWord => {
            UnlockError::WrongPassword
        }
        DecryptError::InvalidStructure => {
            UnlockError::Parse("malformed encrypted container".to_string())
        }
        err => UnlockError::Other(format!("office-crypto: {err}")),
    }
}

/// Classify the protection of an Office container without a password.
pub(crate) fn inspect(bytes: &[u8]) -> Result<Protection, UnlockError> {
    if bytes.starts_with(&ZIP_MAGIC) {
        return Ok(Protection::None);
    }
    if !bytes.starts_with(&OLE_MAGIC) {
        return Err(UnlockError::Parse(
            "neither an OOXML package nor an OLE compound document".to_string(),
        ));
    }

    let mut ole = cfb::CompoundFile::open(Cursor::new(bytes))
        .map_err(|err| UnlockError::Parse(format!("invalid compound document: {err}")))?;

    if ole.is_stream("EncryptionInfo") && ole.is_stream("EncryptedPackage") {
        let mut header = [0u8; 4];
        ole.open_stream("EncryptionInfo")
            .and_then(|mut stream| stream.read_exact(&mut header))
            .map_err(|err| UnlockError::Parse(format!("unreadable EncryptionInfo: {err}")))?;
        let scheme = check_encryption_info_version(header)?;

        let mut size_prefix = [0u8; 8];
        let stream_len = ole
            .open_stream("EncryptedPackage")
            .and_then(|mut stream| {
                let len = stream.len();
                if len >= PACKAGE_SIZE_PREFIX {
                    stream.read_exact(&mut size_prefix)?;
                }
                Ok(len)
            })
            .map_err(|err| UnlockError::Parse(format!("unreadable EncryptedPackage: {err}")))?;
        check_package_size(scheme, stream_len, u64::from_le_bytes(size_prefix))?;
        return Ok(Protection::EncryptedPackage(scheme));
    }

    if ole.is_stream("WordDocument") {
        let mut fib = [0u8; FIB_FLAGS_OFFSET + 2];
        ole.open_stream("WordDocument")
            .and_then(|mut stream| stream.read_exact(&mut fib))
            .map_err(|err| UnlockError::Parse(format!("unreadable WordDocument stream: {err}")))?;
        return word_protection(&fib);
    }

    for name in ["Workbook", "Book"] {
        if !ole.is_stream(name) {
            continue;
        }
        let mut workbook = Vec::new();
        ole.open_stream(name)
            .and_then(|mut stream| stream.read_to_end(&mut workbook))
            .map_err(|err| UnlockError::Parse(format!("unreadable {name} stream: {err}")))?;
        return Ok(if globals_have_filepass(&workbook) {
            Protection::LegacyExcel
        } else {
            Protection::None
        });
    }

    Err(UnlockError::Parse(
        "unrecognised compound document (no Word, Excel or EncryptedPackage streams)".to_string(),
    ))
}

fn check_encryption_info_version(header: [u8; 4]) -> Result<PackageScheme, UnlockError> {
    let major = u16::from_le_bytes([header[0], header[1]]);
    let minor = u16::from_le_bytes([header[2], header[3]]);
    match (major, minor) {
        (4, 4) => Ok(PackageScheme::Agile),
        (2..=4, 2) => Ok(PackageScheme::Standard),
        (3 | 4, 3) => Err(UnlockError::UnsupportedFormat(
            "extensible encryption".to_string(),
        )),
        _ => Err(UnlockError::Parse(format!(
            "unknown EncryptionInfo version {major}.{minor}"
        ))),
    }
}

/// The ciphertext must cover the declared plaintext size, and an Agile package must fill at
/// least one segment for `office-crypto` to process it.
fn check_package_size(
    scheme: PackageScheme,
    stream_len: u64,
    declared: u64,
) -> Result<(), UnlockError> {
    let Some(payload) = stream_len.checked_sub(PACKAGE_SIZE_PREFIX) else {
        return Err(UnlockError::Parse(format!(
            "EncryptedPackage stream is truncated ({stream_len} bytes)"
        )));
    };
    if declared > payload {
        return Err(UnlockError::Parse(format!(
            "EncryptedPackage declares {declared} bytes but holds {payload}"
        )));
    }
    if scheme == PackageScheme::Agile && declared < AGILE_SEGMENT_LENGTH {
        return Err(UnlockError::UnsupportedFormat(format!(
            "Agile package of {declared} bytes is shorter than one segment \
             ({AGILE_SEGMENT_LENGTH} bytes)"
        )));
    }
    Ok(())
}

fn word_protection(fib: &[u8]) -> Result<Protection, UnlockError> {
    let ident = u16::from_le_bytes([fib[0], fib[1]]);
    if ident != WORD_FIB_IDENT {
        return Err(UnlockError::Parse(format!(
            "WordDocument stream has unexpected FIB identifier {ident:#06x}"
        )));
    }

    let flags = u16::from_le_bytes([fib[FIB_FLAGS_OFFSET], fib[FIB_FLAGS_OFFSET + 1]]);
    match (flags & FIB_ENCRYPTED != 0, flags & FIB_OBFUSCATED != 0) {
        (false, _) => Ok(Protection::None),
        (true, true) => Err(UnlockError::UnsupportedFormat(
            "Word XOR obfuscation".to_string(),
        )),
        (true, false) => Ok(Protection::LegacyWord),
    }
}

/// Returns true if the BIFF workbook globals substream contains a `FILEPASS` record.
///
/// Best-effort: a stream that does not start with `BOF`, or is truncated, is not encrypted.
fn globals_have_filepass(stream: &[u8]) -> bool {
    let mut offset = 0usize;
    let mut first = true;

    while let Some(header) = stream.get(offset..offset + 4) {
        let record_id = u16::from_le_bytes([header[0], header[1]]);
        let len = u16::from_le_bytes([header[2], header[3]]) as usize;

        if first {
            if record_id != BIFF_BOF_BIFF8 && record_id != BIFF_BOF_BIFF5 {
                return false;
            }
            first = false;
        } else if record_id == BIFF_FILEPASS {
            return true;
        } else if record_id == BIFF_EOF {
            return false;
        }

        offset += 4 + len;
    }

    false
}
