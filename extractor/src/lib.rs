//! Locates the signatures of a PDF in its raw bytes.
//!
//! No object parsing happens here: the `/ByteRange` arrays written by the
//! signing tool tell where each signature sits and which bytes it covers.

pub mod byte_range;
pub mod error;
pub mod meta;
pub mod sub_filter;

pub use byte_range::{find_byte_ranges, ByteRange, ByteRangeDecl, ByteRangeField};
pub use error::{ExtractError, Result};
pub use meta::SignatureMeta;
pub use sub_filter::{check_sub_filter, SubFilter};

/// One embedded signature and the bytes it signs.
#[derive(Debug, Clone)]
pub struct SignatureInstance {
    pub byte_range: ByteRange,
    /// Decoded `/Contents` blob, zero padding included.
    pub signature: Vec<u8>,
    pub signed_data: Vec<u8>,
    pub meta: SignatureMeta,
}

/// Extracts every signature in document order.
///
/// The last `/ByteRange` must reach the end of the file; bytes appended after
/// the newest signature are rejected.
pub fn extract_signatures(pdf: &[u8]) -> Result<Vec<SignatureInstance>> {
    let decls = find_byte_ranges(pdf)?;

    if let Some(last) = decls.last() {
        let end = last.resolve()?.end()?;
        if pdf.len() > end {
            log::debug!("{} bytes after the last signed revision", pdf.len() - end);
            return Err(ExtractError::TrailingBytes);
        }
    }

    decls
        .iter()
        .map(|decl| {
            let byte_range = decl.resolve()?;
            let signed_data = byte_range.signed_data(pdf)?;
            let signature = byte_range.signature(pdf)?;
            let meta = SignatureMeta::scrape(&signed_data);
            Ok(SignatureInstance {
                byte_range,
                signature,
                signed_data,
                meta,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    static SIGNED_PDF: &[u8] = include_bytes!("../../sample-pdfs/signed.pdf");
    static THREE_TIMES_PDF: &[u8] = include_bytes!("../../sample-pdfs/signed-three-times.pdf");

    /// `<prefix>/ByteRange [..] /Contents <hex>` with zero-padded offsets.
    fn synthetic(hex: &str, trailer: &str) -> Vec<u8> {
        let head = "%PDF-1.7\n<< /ByteRange [0000000000 0000000000 0000000000 0000000000] /Reason (Test) /Contents <";
        let len1 = head.len() - 1;
        let start2 = len1 + 1 + hex.len() + 1;
        let len2 = 3 + trailer.len();
        let head = head.replacen(
            "[0000000000 0000000000 0000000000 0000000000]",
            &format!("[0000000000 {:010} {:010} {:010}]", len1, start2, len2),
            1,
        );
        format!("{}{}> >>{}", head, hex, trailer).into_bytes()
    }

    #[test]
    fn extracts_synthetic_signature() {
        let pdf = synthetic("deadbeef0000", "\n%%EOF\n");
        let sigs = extract_signatures(&pdf).unwrap();
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].signature, vec![0xde, 0xad, 0xbe, 0xef, 0, 0]);
        assert_eq!(sigs[0].meta.reason.as_deref(), Some("Test"));
        assert!(sigs[0].signed_data.ends_with(b" >>\n%%EOF\n"));
        assert!(!sigs[0].signed_data.windows(4).any(|w| w == b"dead"));
    }

    #[test]
    fn appended_bytes_fail() {
        let mut pdf = synthetic("00", "\n%%EOF\n");
        pdf.extend_from_slice(b"% appended\n");
        assert!(matches!(
            extract_signatures(&pdf),
            Err(ExtractError::TrailingBytes)
        ));
    }

    #[test]
    fn unsigned_placeholder_fails() {
        let pdf = b"/ByteRange [0 /********** /********** /**********] /Contents <00>";
        assert!(matches!(
            extract_signatures(pdf),
            Err(ExtractError::UnresolvedPlaceholder)
        ));
    }

    #[test]
    fn fixture_signature() {
        let sigs = extract_signatures(SIGNED_PDF).unwrap();
        assert_eq!(sigs.len(), 1);
        assert_eq!(
            sigs[0].byte_range,
            ByteRange {
                start1: 0,
                len1: 592,
                start2: 16978,
                len2: 117
            }
        );
        assert_eq!(sigs[0].signed_data.len(), 592 + 117);
        assert_eq!(sigs[0].signature.len(), 16384 / 2);
        assert_eq!(sigs[0].signature[0], 0x30);
        assert_eq!(
            sigs[0].meta,
            SignatureMeta {
                reason: Some("Approved by the signer".into()),
                contact_info: Some("jane@example.com".into()),
                location: Some("Porto Alegre".into()),
                name: Some("Jane Signer".into()),
            }
        );
    }

    #[test]
    fn incremental_signatures_in_order() {
        let sigs = extract_signatures(THREE_TIMES_PDF).unwrap();
        let reasons: Vec<_> = sigs
            .iter()
            .map(|s| s.meta.reason.clone().unwrap_or_default())
            .collect();
        assert_eq!(reasons, vec!["First", "Second", "Third"]);
        assert_eq!(sigs[2].byte_range.end().unwrap(), THREE_TIMES_PDF.len());
    }
}
