//! Output file names for a person's converted documents.
//!
//! Every file starts with `<first>_<last>` built from sanitised name parts,
//! then the slot key: `Ayşe_Yılmaz_diploma.jpeg`.

use crate::config::TargetSize;
use crate::error::ConvertError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Criminal-record certificate slot.
pub const SLOT_CRIMINAL_RECORD: &str = "sabika_kaydi";
/// Diploma slot.
pub const SLOT_DIPLOMA: &str = "diploma";
/// Health report slot.
pub const SLOT_HEALTH_REPORT: &str = "saglik_raporu";

/// The document slots a submission normally carries, in display order.
pub const DOCUMENT_SLOTS: [&str; 3] = [SLOT_CRIMINAL_RECORD, SLOT_DIPLOMA, SLOT_HEALTH_REPORT];

// Whitespace runs become a single underscore.
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// Anything outside ASCII alphanumerics, `_`, `-` and the Turkish letters.
static RE_DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_\-çğıöşüÇĞİÖŞÜ]").unwrap());

/// Make a name part safe for a file name.
///
/// Trims, turns each whitespace run into one `_`, then drops anything that is
/// not an ASCII letter or digit, `_`, `-`, or a Turkish letter.
pub fn sanitize_name_part(raw: &str) -> String {
    let s = RE_WHITESPACE.replace_all(raw.trim(), "_");
    RE_DISALLOWED.replace_all(&s, "").into_owned()
}

/// `<first>_<last>` from sanitised parts.
///
/// Both parts must still be non-empty after sanitising.
pub fn identifier(first_name: &str, last_name: &str) -> Result<String, ConvertError> {
    let first = sanitize_name_part(first_name);
    let last = sanitize_name_part(last_name);
    if first.is_empty() || last.is_empty() {
        return Err(ConvertError::InvalidConfig(
            "first and last name are both required".to_string(),
        ));
    }
    Ok(format!("{first}_{last}"))
}

/// `<identifier>_<slot>.jpeg`
pub fn slot_filename(identifier: &str, slot: &str) -> String {
    format!("{identifier}_{slot}.jpeg")
}

/// `<identifier>_biyometrik_<size>.jpeg`
pub fn biometric_filename(identifier: &str, size: TargetSize) -> String {
    format!("{identifier}_biyometrik_{}.jpeg", size.label())
}
