//! Digital signature verification for PDF documents.
//!
//! ```no_run
//! use signature_validator::RootStore;
//! use verify_pdf::PdfVerifier;
//!
//! let roots = RootStore::system()?;
//! let pdf = std::fs::read("contract.pdf")?;
//! let verdict = PdfVerifier::new(&roots).verify(&pdf)?;
//! println!("verified: {}", verdict.verified());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io::Read;

use chrono::{DateTime, Utc};
use extractor::{check_sub_filter, extract_signatures};
use signature_validator::{
    build_chain, parse_signed_data, verify_signature, Certificate, RootStore,
};

pub mod details;
pub mod error;
pub mod verdict;

pub use details::CertificateDetails;
pub use error::{ErrorKind, Result, VerifyPdfError};
pub use verdict::{
    DocumentReport, DocumentVerdict, FailedVerification, SignatureVerdict, SignatureVerdictMeta,
};

/// Checks every signature of a document against a set of trusted roots.
#[derive(Debug, Clone, Copy)]
pub struct PdfVerifier<'a> {
    root_store: &'a RootStore,
    now: Option<DateTime<Utc>>,
}

impl<'a> PdfVerifier<'a> {
    pub fn new(root_store: &'a RootStore) -> Self {
        PdfVerifier {
            root_store,
            now: None,
        }
    }

    /// Evaluate certificate expiry at `now` instead of the system clock.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Verifies `pdf`.
    ///
    /// Only a missing or unsupported `/SubFilter` is returned as `Err`. Any
    /// later failure, in one signature or in locating them, yields
    /// [`DocumentVerdict::Failed`].
    pub fn verify(&self, pdf: impl AsRef<[u8]>) -> Result<DocumentVerdict> {
        let pdf = pdf.as_ref();
        let sub_filter = check_sub_filter(pdf)?;
        log::debug!("sub-filter {}", sub_filter.as_str());

        match self.check_signatures(pdf) {
            Ok(report) => Ok(DocumentVerdict::Checked(report)),
            Err(error) => {
                log::debug!("verification failed: {}", error);
                Ok(DocumentVerdict::Failed(error.into()))
            }
        }
    }

    /// Reads the whole document from `reader`, then verifies it.
    pub fn verify_reader(&self, mut reader: impl Read) -> Result<DocumentVerdict> {
        let mut pdf = Vec::new();
        reader.read_to_end(&mut pdf).map_err(|e| {
            log::debug!("cannot read PDF: {}", e);
            VerifyPdfError::input()
        })?;
        self.verify(pdf)
    }

    fn check_signatures(&self, pdf: &[u8]) -> Result<DocumentReport> {
        let now = self.now.unwrap_or_else(Utc::now);
        let signatures = extract_signatures(pdf)?
            .into_iter()
            .map(|sig| -> Result<SignatureVerdict> {
                let check =
                    verify_signature(&sig.signature, &sig.signed_data, self.root_store, now)?;
                Ok(SignatureVerdict::new(&check, sig.meta))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(DocumentReport::aggregate(signatures))
    }
}

/// [`PdfVerifier::verify`] evaluated at the current time.
pub fn verify_document(pdf: impl AsRef<[u8]>, root_store: &RootStore) -> Result<DocumentVerdict> {
    PdfVerifier::new(root_store).verify(pdf)
}

/// Certificates carried by each signature, without verifying anything.
///
/// Certificates are listed signer first when they form a chain, in their
/// embedded order otherwise.
pub fn certificates_info(pdf: impl AsRef<[u8]>) -> Result<Vec<Vec<CertificateDetails>>> {
    extract_signatures(pdf.as_ref())?
        .iter()
        .map(|sig| -> Result<Vec<CertificateDetails>> {
            let signed = parse_signed_data(&sig.signature)?;
            let certs: Vec<Certificate> = match build_chain(&signed.certificates) {
                Ok(chain) => chain
                    .certificates()
                    .iter()
                    .chain(chain.unresolved())
                    .cloned()
                    .collect(),
                Err(_) => signed.certificates,
            };
            Ok(CertificateDetails::list(&certs))
        })
        .collect()
}
