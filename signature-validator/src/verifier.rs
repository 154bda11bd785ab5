use chrono::{DateTime, Utc};

use crate::chain::{build_chain, CertificateChain};
use crate::error::SignatureError;
use crate::pkcs7_signature::parse_signed_data;
use crate::root_store::RootStore;

/// Outcome of evaluating one signature. The three verdicts are independent.
#[derive(Debug, Clone)]
pub struct SignatureCheck {
    /// The signed bytes hash to the `messageDigest` the signer committed to.
    pub integrity: bool,
    /// The chain is complete, linked by valid signatures and anchored in the
    /// root store.
    pub authenticity: bool,
    /// Some certificate of the chain is outside its validity window.
    pub expired: bool,
    pub chain: CertificateChain,
}

impl SignatureCheck {
    pub fn verified(&self) -> bool {
        self.integrity && self.authenticity && !self.expired
    }
}

/// Checks one CMS `signature` over `signed_data`.
///
/// Errors are reserved for blobs that cannot be evaluated at all: undecodable
/// CMS, no usable certificate, or authenticated attributes that the signer
/// certificate did not sign.
pub fn verify_signature(
    signature: &[u8],
    signed_data: &[u8],
    roots: &RootStore,
    now: DateTime<Utc>,
) -> Result<SignatureCheck, SignatureError> {
    let cms = parse_signed_data(signature)?;
    let chain = build_chain(&cms.certificates)?;
    let leaf = chain.leaf();

    if let Some(serial) = &cms.signer_serial {
        if serial != leaf.serial() {
            log::warn!(
                "signer serial {} does not match leaf certificate serial {}",
                serial,
                leaf.serial()
            );
        }
    }

    let algorithm = cms.digest_algorithm;
    let attrs_digest = algorithm.digest(&cms.signed_attrs_der);
    if !leaf.verify_digest(algorithm, &attrs_digest, &cms.encrypted_digest) {
        return Err(SignatureError::WrongAuthenticatedAttributes);
    }

    let integrity = algorithm.digest(signed_data) == cms.message_digest;
    let authenticity = is_authentic(&chain, roots);
    let expired = chain.is_expired_at(now);
    log::debug!(
        "signature by {:?}: integrity={} authenticity={} expired={}",
        leaf.subject().common_name(),
        integrity,
        authenticity,
        expired
    );

    Ok(SignatureCheck {
        integrity,
        authenticity,
        expired,
        chain,
    })
}

/// Chain of trust: nothing left unattached, every link signed by its parent
/// and the top of the chain trusted by `roots`.
pub fn is_authentic(chain: &CertificateChain, roots: &RootStore) -> bool {
    chain.is_complete() && chain.is_linked() && roots.is_trusted(chain.root())
}
