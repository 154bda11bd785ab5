use simple_asn1::{ASN1DecodeErr, OID};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("X.509 parse error: {0}")]
    Parse(String),
    #[error("certificate validity date is out of range")]
    InvalidValidity,
    #[error("PEM error: {0}")]
    Pem(String),
}

#[derive(Debug, Error)]
pub enum CmsError {
    #[error("DER parse error: {0}")]
    Der(#[from] ASN1DecodeErr),
    #[error("PKCS#7 structure error: {0}")]
    Structure(String),
    #[error("Unsupported digest algorithm OID: {0:?}")]
    UnsupportedDigestOid(OID),
    #[error("messageDigest attribute (OID 1.2.840.113549.1.9.4) not found")]
    MissingMessageDigest,
    #[error(transparent)]
    Certificate(#[from] CertificateError),
}

impl CmsError {
    pub fn structure(msg: impl Into<String>) -> Self {
        CmsError::Structure(msg.into())
    }
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("signature carries no certificates")]
    Empty,
    #[error("no root certificate found: every certificate is issued by another one")]
    NoRoot,
}

/// Failure to evaluate one signature. Ordinary tampering, expiry and
/// untrusted chains are not errors; they are reported in
/// [`SignatureCheck`](crate::SignatureCheck).
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error(transparent)]
    Cms(#[from] CmsError),
    #[error("cannot determine the signer certificate: {0}")]
    Chain(#[from] ChainError),
    #[error("Wrong authenticated attributes")]
    WrongAuthenticatedAttributes,
}

#[derive(Debug, Error)]
pub enum RootStoreError {
    #[error("I/O error reading trusted roots: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Certificate(#[from] CertificateError),
    #[error("no system trust store found")]
    NotFound,
}
