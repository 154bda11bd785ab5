use extractor::ExtractError;
use serde::Serialize;
use signature_validator::{CmsError, SignatureError};
use thiserror::Error;

/// Failure class of a verification error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "TYPE_INPUT")]
    Input,
    #[serde(rename = "TYPE_PARSE")]
    Parse,
    #[serde(rename = "TYPE_BYTE_RANGE")]
    ByteRange,
    #[serde(rename = "UNSUPPORTED_SUBFILTER")]
    UnsupportedSubFilter,
    #[serde(rename = "VERIFY_SIGNATURE")]
    VerifySignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct VerifyPdfError {
    pub kind: ErrorKind,
    pub message: String,
}

impl VerifyPdfError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        VerifyPdfError {
            kind,
            message: message.into(),
        }
    }

    pub fn input() -> Self {
        VerifyPdfError::new(ErrorKind::Input, "PDF expected as Buffer.")
    }
}

impl From<ExtractError> for VerifyPdfError {
    fn from(err: ExtractError) -> Self {
        let kind = match err {
            ExtractError::UnsupportedSubFilter(_) => ErrorKind::UnsupportedSubFilter,
            ExtractError::TrailingBytes | ExtractError::OutOfBounds => ErrorKind::ByteRange,
            ExtractError::MissingSubFilter
            | ExtractError::ByteRangeNotFound
            | ExtractError::MalformedByteRange(_)
            | ExtractError::UnresolvedPlaceholder
            | ExtractError::InvalidSignatureHex(_) => ErrorKind::Parse,
        };
        VerifyPdfError::new(kind, err.to_string())
    }
}

impl From<CmsError> for VerifyPdfError {
    fn from(err: CmsError) -> Self {
        VerifyPdfError::new(ErrorKind::Parse, err.to_string())
    }
}

impl From<SignatureError> for VerifyPdfError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::Cms(cms) => cms.into(),
            SignatureError::Chain(_) | SignatureError::WrongAuthenticatedAttributes => {
                VerifyPdfError::new(ErrorKind::VerifySignature, err.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, VerifyPdfError>;

#[cfg(test)]
mod tests {
    use super::*;
    use signature_validator::ChainError;

    #[test]
    fn kinds_follow_the_failing_stage() {
        let err: VerifyPdfError = ExtractError::TrailingBytes.into();
        assert_eq!(err.kind, ErrorKind::ByteRange);
        assert_eq!(err.message, "Failed byte range verification.");

        let err: VerifyPdfError = ExtractError::UnsupportedSubFilter("x".into()).into();
        assert_eq!(err.kind, ErrorKind::UnsupportedSubFilter);

        let err: VerifyPdfError = ExtractError::ByteRangeNotFound.into();
        assert_eq!(err.kind, ErrorKind::Parse);

        let err: VerifyPdfError = SignatureError::WrongAuthenticatedAttributes.into();
        assert_eq!(err.kind, ErrorKind::VerifySignature);
        assert_eq!(err.to_string(), "Wrong authenticated attributes");

        let err: VerifyPdfError = SignatureError::Cms(CmsError::MissingMessageDigest).into();
        assert_eq!(err.kind, ErrorKind::Parse);

        let err: VerifyPdfError = SignatureError::Chain(ChainError::NoRoot).into();
        assert_eq!(err.kind, ErrorKind::VerifySignature);
        assert!(err.message.starts_with("cannot determine the signer certificate"));
    }

    #[test]
    fn input_error() {
        let err = VerifyPdfError::input();
        assert_eq!(err.kind, ErrorKind::Input);
        assert_eq!(err.to_string(), "PDF expected as Buffer.");
    }
}
