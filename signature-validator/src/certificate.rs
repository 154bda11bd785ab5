//! Owned view of an X.509 certificate, as carried in a CMS `SignedData`.

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use rsa::RsaPublicKey;
use serde::ser::{Serialize, SerializeMap, Serializer};
use x509_parser::certificate::X509Certificate;
use x509_parser::pem::Pem;
use x509_parser::prelude::FromDer;
use x509_parser::public_key::PublicKey;
use x509_parser::time::ASN1Time;
use x509_parser::x509::X509Name;

use crate::error::CertificateError;
use crate::DigestAlgorithm;

type Result<T> = std::result::Result<T, CertificateError>;

/// Distinguished name attribute types we know by name. Anything else is kept
/// under its dotted OID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeKey {
    CommonName,
    Country,
    Locality,
    StateOrProvince,
    StreetAddress,
    Organization,
    OrganizationalUnit,
    SerialNumber,
    Email,
    Title,
    GivenName,
    Surname,
    DomainComponent,
    Other(String),
}

impl AttributeKey {
    pub fn from_oid(oid: &str) -> Self {
        match oid {
            "2.5.4.3" => AttributeKey::CommonName,
            "2.5.4.6" => AttributeKey::Country,
            "2.5.4.7" => AttributeKey::Locality,
            "2.5.4.8" => AttributeKey::StateOrProvince,
            "2.5.4.9" => AttributeKey::StreetAddress,
            "2.5.4.10" => AttributeKey::Organization,
            "2.5.4.11" => AttributeKey::OrganizationalUnit,
            "2.5.4.5" => AttributeKey::SerialNumber,
            "1.2.840.113549.1.9.1" => AttributeKey::Email,
            "2.5.4.12" => AttributeKey::Title,
            "2.5.4.42" => AttributeKey::GivenName,
            "2.5.4.4" => AttributeKey::Surname,
            "0.9.2342.19200300.100.1.25" => AttributeKey::DomainComponent,
            other => AttributeKey::Other(other.to_owned()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AttributeKey::CommonName => "commonName",
            AttributeKey::Country => "countryName",
            AttributeKey::Locality => "localityName",
            AttributeKey::StateOrProvince => "stateOrProvinceName",
            AttributeKey::StreetAddress => "streetAddress",
            AttributeKey::Organization => "organizationName",
            AttributeKey::OrganizationalUnit => "organizationalUnitName",
            AttributeKey::SerialNumber => "serialNumber",
            AttributeKey::Email => "emailAddress",
            AttributeKey::Title => "title",
            AttributeKey::GivenName => "givenName",
            AttributeKey::Surname => "surname",
            AttributeKey::DomainComponent => "domainComponent",
            AttributeKey::Other(oid) => oid,
        }
    }
}

/// Issuer or subject attributes in certificate order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap(Vec<(AttributeKey, String)>);

impl AttributeMap {
    fn from_name(name: &X509Name<'_>) -> Self {
        let entries = name
            .iter_attributes()
            .map(|attr| {
                let key = AttributeKey::from_oid(&attr.attr_type().to_id_string());
                // Non-string values (e.g. BMPString) are kept as hex of the raw value.
                let value = match attr.as_str() {
                    Ok(s) => s.to_owned(),
                    Err(_) => hex::encode(attr.attr_value().as_bytes()),
                };
                (key, value)
            })
            .collect();
        AttributeMap(entries)
    }

    pub fn get(&self, key: &AttributeKey) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn common_name(&self) -> Option<&str> {
        self.get(&AttributeKey::CommonName)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttributeKey, &str)> {
        self.0.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Serializes as an object keyed by attribute name. A repeated attribute type
/// keeps only its last value.
impl Serialize for AttributeMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let last_values: Vec<&(AttributeKey, String)> = self
            .0
            .iter()
            .enumerate()
            .filter(|(i, (key, _))| !self.0[i + 1..].iter().any(|(later, _)| later == key))
            .map(|(_, entry)| entry)
            .collect();
        let mut map = serializer.serialize_map(Some(last_values.len()))?;
        for (key, value) in last_values {
            map.serialize_entry(key.name(), value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validity {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl Validity {
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now && now <= self.not_after
    }
}

fn to_utc(time: &ASN1Time) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(time.timestamp(), 0).ok_or(CertificateError::InvalidValidity)
}

#[derive(Debug, Clone)]
pub struct Certificate {
    der: Vec<u8>,
    tbs: Vec<u8>,
    issuer: AttributeMap,
    subject: AttributeMap,
    issuer_raw: Vec<u8>,
    subject_raw: Vec<u8>,
    serial: BigUint,
    validity: Validity,
    public_key: Option<RsaPublicKey>,
    signature_algorithm: String,
    signature: Vec<u8>,
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl Certificate {
    /// Parses one DER certificate. Bytes following it are ignored.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (rest, x509) =
            X509Certificate::from_der(der).map_err(|e| CertificateError::Parse(e.to_string()))?;
        Self::from_x509(&der[..der.len() - rest.len()], &x509)
    }

    /// Parses back-to-back DER certificates, as found in the implicit
    /// `certificates [0]` field of `SignedData`.
    pub fn parse_all(bytes: &[u8]) -> Result<Vec<Self>> {
        let mut input = bytes;
        let mut certs = Vec::new();
        while !input.is_empty() {
            let (rest, x509) = X509Certificate::from_der(input)
                .map_err(|e| CertificateError::Parse(e.to_string()))?;
            certs.push(Self::from_x509(&input[..input.len() - rest.len()], &x509)?);
            input = rest;
        }
        Ok(certs)
    }

    /// Parses every `CERTIFICATE` block of a PEM buffer.
    pub fn from_pem(input: &[u8]) -> Result<Vec<Self>> {
        let mut certs = Vec::new();
        for pem in Pem::iter_from_buffer(input) {
            let pem = match pem {
                Ok(pem) => pem,
                // Trailing garbage after the last certificate.
                Err(_) if !certs.is_empty() => break,
                Err(e) => return Err(CertificateError::Pem(e.to_string())),
            };
            if pem.label == "CERTIFICATE" || pem.label == "TRUSTED CERTIFICATE" {
                certs.push(Self::from_der(&pem.contents)?);
            }
        }
        if certs.is_empty() {
            return Err(CertificateError::Pem(
                "no certificates found in PEM input".into(),
            ));
        }
        Ok(certs)
    }

    fn from_x509(der: &[u8], x509: &X509Certificate<'_>) -> Result<Self> {
        let validity = x509.validity();
        let public_key = match x509.public_key().parsed() {
            Ok(PublicKey::RSA(key)) => RsaPublicKey::new(
                rsa::BigUint::from_bytes_be(key.modulus),
                rsa::BigUint::from_bytes_be(key.exponent),
            )
            .ok(),
            _ => None,
        };

        Ok(Certificate {
            der: der.to_vec(),
            tbs: x509.tbs_certificate.as_ref().to_vec(),
            issuer: AttributeMap::from_name(x509.issuer()),
            subject: AttributeMap::from_name(x509.subject()),
            issuer_raw: x509.issuer().as_raw().to_vec(),
            subject_raw: x509.subject().as_raw().to_vec(),
            serial: BigUint::from_bytes_be(x509.raw_serial()),
            validity: Validity {
                not_before: to_utc(&validity.not_before)?,
                not_after: to_utc(&validity.not_after)?,
            },
            public_key,
            signature_algorithm: x509.signature_algorithm.algorithm.to_id_string(),
            signature: x509.signature_value.data.to_vec(),
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn issuer(&self) -> &AttributeMap {
        &self.issuer
    }

    pub fn subject(&self) -> &AttributeMap {
        &self.subject
    }

    pub fn serial(&self) -> &BigUint {
        &self.serial
    }

    pub fn validity(&self) -> &Validity {
        &self.validity
    }

    /// The RSA key of the subject, `None` for other key types.
    pub fn public_key(&self) -> Option<&RsaPublicKey> {
        self.public_key.as_ref()
    }

    pub fn is_self_issued(&self) -> bool {
        self.subject_raw == self.issuer_raw
    }

    /// Name-only relation: `child` declares `self` as its issuer.
    pub fn is_issuer_of(&self, child: &Certificate) -> bool {
        self.subject_raw == child.issuer_raw
    }

    /// [`is_issuer_of`](Self::is_issuer_of) plus a check of the child's
    /// signature with this certificate's key.
    pub fn verify_issued(&self, child: &Certificate) -> bool {
        if !self.is_issuer_of(child) {
            return false;
        }
        let Some(algorithm) = DigestAlgorithm::from_signature_oid(&child.signature_algorithm) else {
            log::debug!(
                "unsupported certificate signature algorithm {}",
                child.signature_algorithm
            );
            return false;
        };
        self.verify_digest(algorithm, &algorithm.digest(&child.tbs), &child.signature)
    }

    /// Checks an RSA PKCS#1 v1.5 `signature` over an already computed digest.
    pub fn verify_digest(&self, algorithm: DigestAlgorithm, hashed: &[u8], signature: &[u8]) -> bool {
        match &self.public_key {
            Some(key) => key.verify(algorithm.pkcs1v15(), hashed, signature).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::Certificate;

    static ROOT_PEM: &[u8] = include_bytes!("../../sample-pdfs/certs/root.pem");
    static INTERMEDIATE_PEM: &[u8] = include_bytes!("../../sample-pdfs/certs/intermediate.pem");
    static LEAF_PEM: &[u8] = include_bytes!("../../sample-pdfs/certs/leaf.pem");
    static EXPIRED_LEAF_PEM: &[u8] = include_bytes!("../../sample-pdfs/certs/expired-leaf.pem");
    static ROGUE_PEM: &[u8] = include_bytes!("../../sample-pdfs/certs/rogue.pem");
    static CROSS_SIGNED_PEM: &[u8] = include_bytes!("../../sample-pdfs/certs/cross/pair.pem");

    fn load(pem: &[u8]) -> Certificate {
        Certificate::from_pem(pem)
            .expect("fixture certificate")
            .remove(0)
    }

    pub fn root() -> Certificate {
        load(ROOT_PEM)
    }

    pub fn intermediate() -> Certificate {
        load(INTERMEDIATE_PEM)
    }

    pub fn leaf() -> Certificate {
        load(LEAF_PEM)
    }

    pub fn expired_leaf() -> Certificate {
        load(EXPIRED_LEAF_PEM)
    }

    pub fn rogue() -> Certificate {
        load(ROGUE_PEM)
    }

    /// The intermediate with the last byte of its signature flipped. Names
    /// and key are untouched.
    pub fn forged_intermediate() -> Certificate {
        let mut der = intermediate().der().to_vec();
        let last = der.len() - 1;
        der[last] ^= 0x01;
        Certificate::from_der(&der).expect("forged certificate still parses")
    }

    /// Two CAs, each naming the other as its issuer.
    pub fn cross_signed_pair() -> Vec<Certificate> {
        Certificate::from_pem(CROSS_SIGNED_PEM).expect("fixture certificates")
    }

    pub fn at(year: i32, month: u32, day: u32) -> chrono::DateTime<chrono::Utc> {
        use chrono::TimeZone;
        chrono::Utc
            .with_ymd_and_hms(year, month, day, 0, 0, 0)
            .single()
            .expect("valid date")
    }
}
