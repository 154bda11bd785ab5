use regex::bytes::Regex;

use crate::error::{ExtractError, Result};

lazy_static::lazy_static! {
    static ref SUB_FILTER_REGEX: Regex = Regex::new(r"(?-u)/SubFilter\s*/([\w.]*)").unwrap();
}

/// Signature encodings this crate knows how to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubFilter {
    AdbePkcs7Detached,
    EtsiCadesDetached,
}

impl SubFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            SubFilter::AdbePkcs7Detached => "adbe.pkcs7.detached",
            SubFilter::EtsiCadesDetached => "etsi.cades.detached",
        }
    }
}

/// Reads the first `/SubFilter` of the document and rejects anything but a
/// detached CMS signature.
pub fn check_sub_filter(pdf: &[u8]) -> Result<SubFilter> {
    let value = SUB_FILTER_REGEX
        .captures(pdf)
        .and_then(|caps| caps.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
        .filter(|v| !v.is_empty())
        .ok_or(ExtractError::MissingSubFilter)?;

    match value.trim().to_ascii_lowercase().as_str() {
        "adbe.pkcs7.detached" => Ok(SubFilter::AdbePkcs7Detached),
        "etsi.cades.detached" => Ok(SubFilter::EtsiCadesDetached),
        _ => Err(ExtractError::UnsupportedSubFilter(value)),
    }
}
