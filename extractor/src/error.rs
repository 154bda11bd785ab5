use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot find subfilter")]
    MissingSubFilter,
    #[error("subFilter {0} not supported")]
    UnsupportedSubFilter(String),
    #[error("Failed to locate ByteRange.")]
    ByteRangeNotFound,
    #[error("malformed ByteRange: {0}")]
    MalformedByteRange(String),
    #[error("ByteRange still holds a placeholder")]
    UnresolvedPlaceholder,
    #[error("Failed byte range verification.")]
    TrailingBytes,
    #[error("ByteRange values out of bounds")]
    OutOfBounds,
    #[error("signature is not valid hex: {0}")]
    InvalidSignatureHex(#[from] hex::FromHexError),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
