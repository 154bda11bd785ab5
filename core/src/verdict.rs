use extractor::SignatureMeta;
use serde::Serialize;
use signature_validator::SignatureCheck;

use crate::details::CertificateDetails;
use crate::error::VerifyPdfError;

/// Result of [`PdfVerifier::verify`](crate::PdfVerifier::verify).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DocumentVerdict {
    Checked(DocumentReport),
    Failed(FailedVerification),
}

impl DocumentVerdict {
    pub fn verified(&self) -> bool {
        match self {
            DocumentVerdict::Checked(report) => report.verified,
            DocumentVerdict::Failed(_) => false,
        }
    }

    pub fn authenticity(&self) -> Option<bool> {
        self.report().map(|r| r.authenticity)
    }

    pub fn integrity(&self) -> Option<bool> {
        self.report().map(|r| r.integrity)
    }

    pub fn expired(&self) -> Option<bool> {
        self.report().map(|r| r.expired)
    }

    pub fn signatures(&self) -> Option<&[SignatureVerdict]> {
        self.report().map(|r| r.signatures.as_slice())
    }

    /// The error that stopped verification, if any.
    pub fn error(&self) -> Option<&VerifyPdfError> {
        match self {
            DocumentVerdict::Checked(_) => None,
            DocumentVerdict::Failed(failed) => Some(&failed.error),
        }
    }

    pub fn report(&self) -> Option<&DocumentReport> {
        match self {
            DocumentVerdict::Checked(report) => Some(report),
            DocumentVerdict::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub verified: bool,
    pub authenticity: bool,
    pub integrity: bool,
    pub expired: bool,
    pub signatures: Vec<SignatureVerdict>,
}

impl DocumentReport {
    /// Every signature must pass; a single expired chain marks the document.
    pub fn aggregate(signatures: Vec<SignatureVerdict>) -> Self {
        DocumentReport {
            verified: signatures.iter().all(|s| s.verified),
            authenticity: signatures.iter().all(|s| s.authenticity),
            integrity: signatures.iter().all(|s| s.integrity),
            expired: signatures.iter().any(|s| s.expired),
            signatures,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedVerification {
    /// Always `false`.
    pub verified: bool,
    pub message: String,
    pub error: VerifyPdfError,
}

impl From<VerifyPdfError> for FailedVerification {
    fn from(error: VerifyPdfError) -> Self {
        FailedVerification {
            verified: false,
            message: error.message.clone(),
            error,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SignatureVerdict {
    pub verified: bool,
    pub authenticity: bool,
    pub integrity: bool,
    pub expired: bool,
    pub meta: SignatureVerdictMeta,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureVerdictMeta {
    /// Chain from the signer up.
    pub certs: Vec<CertificateDetails>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved_certs: Vec<CertificateDetails>,
    pub signature_meta: SignatureMeta,
}

impl SignatureVerdict {
    pub fn new(check: &SignatureCheck, signature_meta: SignatureMeta) -> Self {
        SignatureVerdict {
            verified: check.verified(),
            authenticity: check.authenticity,
            integrity: check.integrity,
            expired: check.expired,
            meta: SignatureVerdictMeta {
                certs: CertificateDetails::list(check.chain.certificates()),
                unresolved_certs: check
                    .chain
                    .unresolved()
                    .iter()
                    .map(|cert| CertificateDetails::new(cert, false))
                    .collect(),
                signature_meta,
            },
        }
    }
}
