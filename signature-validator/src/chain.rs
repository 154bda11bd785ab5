//! Orders the unordered certificate set of a signature into leaf -> root.

use chrono::{DateTime, Utc};

use crate::certificate::Certificate;
use crate::error::ChainError;

/// Certificates ordered from the signer (leaf) up to the topmost issuer found
/// in the set. Never empty.
#[derive(Debug, Clone)]
pub struct CertificateChain {
    certs: Vec<Certificate>,
    unresolved: Vec<Certificate>,
}

impl CertificateChain {
    /// The signer certificate.
    pub fn leaf(&self) -> &Certificate {
        &self.certs[0]
    }

    pub fn root(&self) -> &Certificate {
        &self.certs[self.certs.len() - 1]
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certs
    }

    /// Certificates of the set that could not be attached to the chain.
    pub fn unresolved(&self) -> &[Certificate] {
        &self.unresolved
    }

    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Every certificate carries a valid signature of the next one in line.
    pub fn is_linked(&self) -> bool {
        self.certs
            .windows(2)
            .all(|pair| pair[1].verify_issued(&pair[0]))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.certs.iter().any(|cert| !cert.validity().contains(now))
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }
}

/// Builds the chain from `certificates` in any order.
///
/// The root is the certificate that no *other* member of the set issued. When
/// several qualify the first one wins; leftovers end up in
/// [`CertificateChain::unresolved`].
pub fn build_chain(certificates: &[Certificate]) -> Result<CertificateChain, ChainError> {
    let mut remaining: Vec<&Certificate> = Vec::with_capacity(certificates.len());
    for cert in certificates {
        if !remaining.contains(&cert) {
            remaining.push(cert);
        }
    }
    if remaining.is_empty() {
        return Err(ChainError::Empty);
    }

    let roots: Vec<usize> = (0..remaining.len())
        .filter(|&i| {
            !remaining
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && other.is_issuer_of(remaining[i]))
        })
        .collect();
    let root_index = *roots.first().ok_or(ChainError::NoRoot)?;
    if roots.len() > 1 {
        log::warn!(
            "{} root candidates in certificate set, using {:?}",
            roots.len(),
            remaining[root_index].subject().common_name()
        );
    }

    let mut chain = vec![remaining.remove(root_index)];
    while let Some(pos) = remaining.iter().position(|cert| {
        chain
            .last()
            .map_or(false, |front| front.is_issuer_of(cert))
    }) {
        chain.push(remaining.remove(pos));
    }
    chain.reverse();

    if !remaining.is_empty() {
        log::warn!(
            "{} certificate(s) could not be attached to the chain",
            remaining.len()
        );
    }
    log::debug!("certificate chain of length {}", chain.len());

    Ok(CertificateChain {
        certs: chain.into_iter().cloned().collect(),
        unresolved: remaining.into_iter().cloned().collect(),
    })
}
