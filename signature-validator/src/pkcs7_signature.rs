use num_bigint::BigUint;
use simple_asn1::{from_der, oid, ASN1Block, ASN1Class};

use crate::certificate::Certificate;
use crate::error::CmsError;
use crate::DigestAlgorithm;

type Result<T> = std::result::Result<T, CmsError>;

/// What verification needs out of a CMS `SignedData` blob.
#[derive(Debug, Clone)]
pub struct CmsSignedData {
    /// `certificates [0]` in the order they appear.
    pub certificates: Vec<Certificate>,
    pub digest_algorithm: DigestAlgorithm,
    /// `SignerInfo.signature`, the RSA signature over `signed_attrs_der`.
    pub encrypted_digest: Vec<u8>,
    /// Authenticated attributes re-tagged as a universal SET, i.e. the bytes
    /// the signer actually signed.
    pub signed_attrs_der: Vec<u8>,
    /// Value of the `messageDigest` authenticated attribute.
    pub message_digest: Vec<u8>,
    /// From `issuerAndSerialNumber`; `None` when the signer is identified by
    /// subject key identifier.
    pub signer_serial: Option<BigUint>,
}

pub fn parse_signed_data(signature: &[u8]) -> Result<CmsSignedData> {
    let der = der_envelope(signature)?;
    let blocks = from_der(der)?;

    let content_info = extract_content_info(&blocks)?;
    let signed_children = extract_signed_children(content_info, der)?;
    let signer = get_signer_info(&signed_children, der)?;
    let certificates = extract_certificates(&signed_children, der)?;

    log::debug!(
        "SignedData: {} certificate(s), digest {}",
        certificates.len(),
        signer.digest_algorithm.name()
    );

    Ok(CmsSignedData {
        certificates,
        digest_algorithm: signer.digest_algorithm,
        encrypted_digest: signer.signature,
        signed_attrs_der: signer.signed_attrs_der,
        message_digest: signer.message_digest,
        signer_serial: signer.serial,
    })
}

/// Cuts `input` to its outer DER element. The `/Contents` placeholder of a
/// PDF signature is zero padded past the end of the CMS blob.
pub fn der_envelope(input: &[u8]) -> Result<&[u8]> {
    let (header_len, body_len) = read_header(input, 0)?;
    let end = header_len
        .checked_add(body_len)
        .ok_or_else(|| CmsError::structure("DER length overflow"))?;
    input
        .get(..end)
        .ok_or_else(|| CmsError::structure("signature shorter than its DER length"))
}

/// Header and body length of the TLV starting at `offset`.
fn read_header(der: &[u8], offset: usize) -> Result<(usize, usize)> {
    let tag = *der
        .get(offset)
        .ok_or_else(|| CmsError::structure("empty DER input"))?;
    if tag & 0x1f == 0x1f {
        return Err(CmsError::structure("multi-byte DER tags are not supported"));
    }
    let first = *der
        .get(offset + 1)
        .ok_or_else(|| CmsError::structure("truncated DER length"))?;
    if first & 0x80 == 0 {
        return Ok((2, first as usize));
    }

    let count = (first & 0x7f) as usize;
    if count == 0 {
        return Err(CmsError::structure("indefinite length encoding"));
    }
    if count > 4 {
        return Err(CmsError::structure("DER length does not fit in 32 bits"));
    }
    let bytes = der
        .get(offset + 2..offset + 2 + count)
        .ok_or_else(|| CmsError::structure("truncated DER length"))?;
    let len = bytes.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize);
    Ok((2 + count, len))
}

/// Raw bytes of the whole TLV that starts at `offset`.
fn raw_element(der: &[u8], offset: usize) -> Result<&[u8]> {
    let tail = der
        .get(offset..)
        .ok_or_else(|| CmsError::structure("element offset past end of input"))?;
    der_envelope(tail)
}

/// Raw content octets of the TLV that starts at `offset`.
fn raw_body(der: &[u8], offset: usize) -> Result<&[u8]> {
    let (header_len, _) = read_header(der, offset)?;
    Ok(&raw_element(der, offset)?[header_len..])
}

fn is_context_tag(block: &ASN1Block, number: u8) -> bool {
    match block {
        ASN1Block::Explicit(ASN1Class::ContextSpecific, _, tag, _) => *tag == BigUint::from(number),
        ASN1Block::Unknown(ASN1Class::ContextSpecific, _, _, tag, _) => *tag == BigUint::from(number),
        _ => false,
    }
}

fn extract_content_info(blocks: &[ASN1Block]) -> Result<&[ASN1Block]> {
    if let Some(ASN1Block::Sequence(_, children)) = blocks.first() {
        // Verify contentType is signedData OID
        if let Some(ASN1Block::ObjectIdentifier(_, oid_val)) = children.first() {
            if *oid_val != oid!(1, 2, 840, 113549, 1, 7, 2) {
                return Err(CmsError::structure("Not a SignedData contentType"));
            }
            Ok(children)
        } else {
            Err(CmsError::structure("Missing contentType OID"))
        }
    } else {
        Err(CmsError::structure("Top-level not a SEQUENCE"))
    }
}

/// Children of the `SignedData` SEQUENCE, with offsets relative to `der`.
fn extract_signed_children(children: &[ASN1Block], der: &[u8]) -> Result<Vec<ASN1Block>> {
    let block = children
        .get(1)
        .ok_or_else(|| CmsError::structure("Missing SignedData content"))?;

    match block {
        ASN1Block::Explicit(ASN1Class::ContextSpecific, _, _, inner) => match inner.as_ref() {
            ASN1Block::Sequence(_, seq_children) => Ok(seq_children.clone()),
            _ => Err(CmsError::structure("Explicit SignedData not a SEQUENCE")),
        },
        ASN1Block::Sequence(_, seq_children) => Ok(seq_children.clone()),
        ASN1Block::Unknown(ASN1Class::ContextSpecific, true, _, _, _) => {
            // The generic decoder gave up on the body; report why.
            let body = raw_body(der, block.offset())?;
            from_der(body)?;
            Err(CmsError::structure("Inner SignedData not a SEQUENCE"))
        }
        other => Err(CmsError::structure(format!(
            "Unexpected SignedData format: {:?}",
            other.class()
        ))),
    }
}

struct SignerInfo {
    serial: Option<BigUint>,
    digest_algorithm: DigestAlgorithm,
    signed_attrs_der: Vec<u8>,
    message_digest: Vec<u8>,
    signature: Vec<u8>,
}

fn get_signer_info(signed_data_seq: &[ASN1Block], der: &[u8]) -> Result<SignerInfo> {
    // last item of SignedData is signerInfos
    let signer_infos = match signed_data_seq.last() {
        Some(ASN1Block::Set(_, items)) => items,
        _ => return Err(CmsError::structure("Expected SignerInfos SET in SignedData")),
    };
    if signer_infos.len() > 1 {
        log::warn!(
            "SignedData has {} signers, only the first is checked",
            signer_infos.len()
        );
    }

    // SignerInfo ::= SEQUENCE {
    // version
    // sid (issuerAndSerialNumber or [0] subjectKeyIdentifier)
    // digestAlgorithm
    // signedAttrs [0] IMPLICIT OPTIONAL
    // signatureAlgorithm
    // signature
    // unsignedAttrs [1] IMPLICIT OPTIONAL
    // }
    let signer_info = match signer_infos.first() {
        Some(ASN1Block::Sequence(_, items)) if items.len() >= 5 => items,
        _ => return Err(CmsError::structure("Expected SignerInfo SEQUENCE")),
    };

    // issuerAndSerialNumber ::= SEQUENCE { issuer Name, serialNumber INTEGER }
    let serial = match &signer_info[1] {
        ASN1Block::Sequence(_, parts) if parts.len() == 2 => match &parts[1] {
            ASN1Block::Integer(_, big_int) => {
                Some(BigUint::from_bytes_be(&big_int.to_signed_bytes_be()))
            }
            _ => return Err(CmsError::structure("Expected serialNumber INTEGER")),
        },
        _ => None,
    };

    let digest_oid = match &signer_info[2] {
        ASN1Block::Sequence(_, items) => match items.first() {
            Some(ASN1Block::ObjectIdentifier(_, oid)) => oid.clone(),
            _ => return Err(CmsError::structure("Invalid digestAlgorithm in SignerInfo")),
        },
        _ => return Err(CmsError::structure("Digest algorithm missing")),
    };
    let digest_algorithm =
        DigestAlgorithm::from_oid(&digest_oid).ok_or(CmsError::UnsupportedDigestOid(digest_oid))?;

    // Match the IMPLICIT [0] block. One attribute decodes as Explicit, several
    // as Unknown, so the bytes are taken from the input either way.
    let signed_attrs = signer_info
        .iter()
        .skip(3)
        .find(|block| is_context_tag(block, 0))
        .ok_or(CmsError::MissingMessageDigest)?;
    let signed_attrs_der = {
        let mut out = raw_element(der, signed_attrs.offset())?.to_vec();
        out[0] = 0x31; // SET
        out
    };

    let attrs = from_der(&signed_attrs_der)?;
    let message_digest = extract_message_digest(&attrs)?;

    let signature = match signer_info.get(5) {
        Some(ASN1Block::OctetString(_, s)) => s.clone(),
        _ => return Err(CmsError::structure("EncryptedDigest (signature) not found")),
    };

    Ok(SignerInfo {
        serial,
        digest_algorithm,
        signed_attrs_der,
        message_digest,
        signature,
    })
}

fn extract_certificates(signed_data_seq: &[ASN1Block], der: &[u8]) -> Result<Vec<Certificate>> {
    // certificates [0] IMPLICIT, between encapContentInfo and signerInfos
    let certs_block = signed_data_seq
        .iter()
        .skip(3)
        .find(|block| is_context_tag(block, 0));

    match certs_block {
        Some(block) => {
            let body = raw_body(der, block.offset())?;
            Ok(Certificate::parse_all(body)?)
        }
        None => Ok(Vec::new()),
    }
}

/// find and return the messageDigest OCTET STRING bytes.
fn extract_message_digest(attrs: &[ASN1Block]) -> Result<Vec<u8>> {
    // If there's exactly one block and it's a SET, unwrap it to get at the SEQUENCEs.
    let candidates: &[ASN1Block] = match attrs {
        [ASN1Block::Set(_, inner)] => inner.as_slice(),
        _ => attrs,
    };

    // Now each `attr` should be a Sequence([OID, Set([OctetString, …])])
    for attr in candidates {
        if let ASN1Block::Sequence(_, items) = attr {
            match items.as_slice() {
                [ASN1Block::ObjectIdentifier(_, oid), values, ..]
                    if *oid == oid!(1, 2, 840, 113549, 1, 9, 4) =>
                {
                    return match values {
                        ASN1Block::Set(_, inner_vals) => match inner_vals.first() {
                            Some(ASN1Block::OctetString(_, data)) => Ok(data.clone()),
                            _ => Err(CmsError::structure(
                                "messageDigest value not an OctetString",
                            )),
                        },
                        _ => Err(CmsError::structure("messageDigest missing inner Set")),
                    };
                }
                _ => continue,
            }
        }
    }

    Err(CmsError::MissingMessageDigest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::fixtures;

    static SIGNED_PDF: &[u8] = include_bytes!("../../sample-pdfs/signed.pdf");
    static THREE_TIMES_PDF: &[u8] = include_bytes!("../../sample-pdfs/signed-three-times.pdf");

    /// Hex `/Contents` of a fixture, located from its ByteRange offsets.
    fn contents(pdf: &[u8], gap_start: usize, gap_end: usize) -> Vec<u8> {
        let hex_text: Vec<u8> = pdf[gap_start + 1..gap_end - 1].to_vec();
        hex::decode(hex_text).unwrap()
    }

    #[test]
    fn parses_signed_fixture() {
        let blob = contents(SIGNED_PDF, 592, 16978);
        let signed = parse_signed_data(&blob).unwrap();

        assert_eq!(signed.digest_algorithm, DigestAlgorithm::Sha256);
        assert_eq!(signed.certificates.len(), 3);
        assert!(signed.certificates.contains(&fixtures::leaf()));
        assert!(signed.certificates.contains(&fixtures::root()));
        assert_eq!(signed.signer_serial.as_ref(), Some(fixtures::leaf().serial()));
        assert_eq!(signed.message_digest.len(), 32);
        assert_eq!(signed.encrypted_digest.len(), 256);
        assert_eq!(signed.signed_attrs_der[0], 0x31);

        let mut data = SIGNED_PDF[..592].to_vec();
        data.extend_from_slice(&SIGNED_PDF[16978..]);
        assert_eq!(
            DigestAlgorithm::Sha256.digest(&data),
            signed.message_digest
        );
    }

    #[test]
    fn single_certificate_is_read_from_raw_bytes() {
        // Second revision carries only a self-signed certificate.
        let blob = contents(THREE_TIMES_PDF, 17156, 33542);
        let signed = parse_signed_data(&blob).unwrap();
        assert_eq!(signed.certificates, vec![fixtures::rogue()]);
    }

    #[test]
    fn envelope_ignores_zero_padding() {
        let padded = [0x30, 0x03, 0x02, 0x01, 0x00, 0x00, 0x00];
        assert_eq!(der_envelope(&padded).unwrap(), &padded[..5]);

        let long = {
            let mut v = vec![0x04, 0x81, 0x80];
            v.extend(std::iter::repeat(0xaa).take(0x80));
            v.push(0);
            v
        };
        assert_eq!(der_envelope(&long).unwrap().len(), 0x83);

        assert!(der_envelope(&[0x30, 0x80, 0x00, 0x00]).is_err());
        assert!(der_envelope(&[0x30, 0x05, 0x02]).is_err());
        assert!(der_envelope(&[]).is_err());
    }

    #[test]
    fn rejects_non_signed_data() {
        // ContentInfo with id-data
        let data_ci = [
            0x30, 0x0b, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x01,
        ];
        assert!(matches!(
            parse_signed_data(&data_ci),
            Err(CmsError::Structure(_))
        ));
        assert!(parse_signed_data(&[0x02, 0x01, 0x05]).is_err());
    }

    #[test]
    fn message_digest_lookup() {
        let attrs = vec![ASN1Block::Set(
            0,
            vec![ASN1Block::Sequence(
                0,
                vec![
                    ASN1Block::ObjectIdentifier(0, oid!(1, 2, 840, 113549, 1, 9, 3)),
                    ASN1Block::Set(0, vec![ASN1Block::Null(0)]),
                ],
            )],
        )];
        assert!(matches!(
            extract_message_digest(&attrs),
            Err(CmsError::MissingMessageDigest)
        ));

        let attrs = vec![ASN1Block::Sequence(
            0,
            vec![
                ASN1Block::ObjectIdentifier(0, oid!(1, 2, 840, 113549, 1, 9, 4)),
                ASN1Block::Set(0, vec![ASN1Block::OctetString(0, vec![1, 2, 3])]),
            ],
        )];
        assert_eq!(extract_message_digest(&attrs).unwrap(), vec![1, 2, 3]);
    }
}
