use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use signature_validator::{AttributeMap, Certificate, Validity};

/// Human-readable summary of one certificate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateDetails {
    /// Set on the signer certificate only.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub client_certificate: bool,
    pub issued_by: AttributeMap,
    pub issued_to: AttributeMap,
    pub validity_period: Validity,
    pub pem_certificate: String,
}

impl CertificateDetails {
    pub fn new(cert: &Certificate, client_certificate: bool) -> Self {
        CertificateDetails {
            client_certificate,
            issued_by: cert.issuer().clone(),
            issued_to: cert.subject().clone(),
            validity_period: *cert.validity(),
            pem_certificate: to_pem(cert.der()),
        }
    }

    /// Details for `certs`, the first one flagged as the signer.
    pub fn list(certs: &[Certificate]) -> Vec<Self> {
        certs
            .iter()
            .enumerate()
            .map(|(i, cert)| CertificateDetails::new(cert, i == 0))
            .collect()
    }
}

/// PEM armour with 64 column lines.
pub fn to_pem(der: &[u8]) -> String {
    let encoded = STANDARD.encode(der);
    let mut pem = String::with_capacity(encoded.len() + encoded.len() / 64 * 2 + 64);
    pem.push_str("-----BEGIN CERTIFICATE-----\r\n");
    for line in encoded.as_bytes().chunks(64) {
        // base64 output is ASCII
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push_str("\r\n");
    }
    pem.push_str("-----END CERTIFICATE-----\r\n");
    pem
}

#[cfg(test)]
mod tests {
    use super::*;

    static LEAF_PEM: &[u8] = include_bytes!("../../sample-pdfs/certs/leaf.pem");

    #[test]
    fn pem_round_trips() {
        let leaf = Certificate::from_pem(LEAF_PEM).unwrap().remove(0);
        let pem = to_pem(leaf.der());
        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\r\n"));
        assert!(pem.lines().all(|l| l.trim_end().len() <= 64));
        let again = Certificate::from_pem(pem.as_bytes()).unwrap();
        assert_eq!(again, vec![leaf]);
    }

    #[test]
    fn only_first_entry_is_client_certificate() {
        let leaf = Certificate::from_pem(LEAF_PEM).unwrap().remove(0);
        let details = CertificateDetails::list(&[leaf.clone(), leaf]);
        assert!(details[0].client_certificate);
        assert!(!details[1].client_certificate);
        assert_eq!(details[0].issued_to.common_name(), Some("Jane Signer"));
    }
}
