//! Cryptographic half of PDF signature verification.
//!
//! Decodes the CMS / PKCS#7 `SignedData` blob embedded in a PDF, orders the
//! certificates it carries into a chain, and evaluates integrity,
//! authenticity and expiry for one signature.

use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use simple_asn1::{oid, OID};

pub mod certificate;
pub mod chain;
pub mod error;
pub mod pkcs7_signature;
pub mod root_store;
mod verifier;

pub use certificate::{AttributeKey, AttributeMap, Certificate, Validity};
pub use chain::{build_chain, CertificateChain};
pub use error::{CertificateError, ChainError, CmsError, RootStoreError, SignatureError};
pub use pkcs7_signature::{parse_signed_data, CmsSignedData};
pub use root_store::RootStore;
pub use verifier::{is_authentic, verify_signature, SignatureCheck};

/// Hash functions accepted for signatures. Anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Maps a digest algorithm identifier found in a `SignerInfo`.
    pub fn from_oid(digest_oid: &OID) -> Option<Self> {
        match digest_oid {
            o if *o == oid!(1, 3, 14, 3, 2, 26) => Some(DigestAlgorithm::Sha1),
            o if *o == oid!(2, 16, 840, 1, 101, 3, 4, 2, 4) => Some(DigestAlgorithm::Sha224),
            o if *o == oid!(2, 16, 840, 1, 101, 3, 4, 2, 1) => Some(DigestAlgorithm::Sha256),
            o if *o == oid!(2, 16, 840, 1, 101, 3, 4, 2, 2) => Some(DigestAlgorithm::Sha384),
            o if *o == oid!(2, 16, 840, 1, 101, 3, 4, 2, 3) => Some(DigestAlgorithm::Sha512),
            _ => None,
        }
    }

    /// Maps the dotted OID of a certificate's `shaXWithRSAEncryption`
    /// signature algorithm.
    pub fn from_signature_oid(signature_oid: &str) -> Option<Self> {
        match signature_oid {
            "1.2.840.113549.1.1.5" => Some(DigestAlgorithm::Sha1),
            "1.2.840.113549.1.1.14" => Some(DigestAlgorithm::Sha224),
            "1.2.840.113549.1.1.11" => Some(DigestAlgorithm::Sha256),
            "1.2.840.113549.1.1.12" => Some(DigestAlgorithm::Sha384),
            "1.2.840.113549.1.1.13" => Some(DigestAlgorithm::Sha512),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha224 => "sha224",
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha384 => "sha384",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha1 => sha1::Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha224 => Sha224::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// PKCS#1 v1.5 padding scheme bound to this hash's `DigestInfo` prefix.
    pub fn pkcs1v15(self) -> Pkcs1v15Sign {
        match self {
            DigestAlgorithm::Sha1 => Pkcs1v15Sign::new::<sha1::Sha1>(),
            DigestAlgorithm::Sha224 => Pkcs1v15Sign::new::<Sha224>(),
            DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
            DigestAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
            DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_allow_list() {
        assert_eq!(
            DigestAlgorithm::from_oid(&oid!(2, 16, 840, 1, 101, 3, 4, 2, 1)),
            Some(DigestAlgorithm::Sha256)
        );
        assert_eq!(
            DigestAlgorithm::from_oid(&oid!(1, 3, 14, 3, 2, 26)),
            Some(DigestAlgorithm::Sha1)
        );
        // md5
        assert_eq!(
            DigestAlgorithm::from_oid(&oid!(1, 2, 840, 113549, 2, 5)),
            None
        );
        assert_eq!(
            DigestAlgorithm::from_signature_oid("1.2.840.113549.1.1.4"),
            None
        );
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            hex::encode(DigestAlgorithm::Sha256.digest(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(DigestAlgorithm::Sha1.digest(b"abc").len(), 20);
        assert_eq!(DigestAlgorithm::Sha512.digest(b"abc").len(), 64);
    }
}
