//! `/ByteRange [start1 len1 start2 len2]` declarations and the spans they
//! cover.

use regex::bytes::Regex;

use crate::error::{ExtractError, Result};

lazy_static::lazy_static! {
    static ref BYTE_RANGE_REGEX: Regex =
        Regex::new(r"(?-u)/ByteRange\s*\[\s*(?:(?:\d*|/\*{10})\s+){3}(?:\d+|/\*{10})\s*\]").unwrap();
    static ref FIELD_REGEX: Regex = Regex::new(r"(?-u)\d+|/\*{10}").unwrap();
}

/// Ten-star value written by signing tools before the offsets are known.
const PLACEHOLDER: &[u8] = b"/**********";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRangeField {
    Value(usize),
    Placeholder,
}

/// One `/ByteRange` array as written in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteRangeDecl {
    /// Position of `/ByteRange` in the document.
    pub offset: usize,
    pub fields: [ByteRangeField; 4],
}

impl ByteRangeDecl {
    pub fn is_placeholder(&self) -> bool {
        self.fields.contains(&ByteRangeField::Placeholder)
    }

    pub fn resolve(&self) -> Result<ByteRange> {
        let mut values = [0usize; 4];
        for (value, field) in values.iter_mut().zip(self.fields.iter()) {
            match field {
                ByteRangeField::Value(v) => *value = *v,
                ByteRangeField::Placeholder => return Err(ExtractError::UnresolvedPlaceholder),
            }
        }
        let [start1, len1, start2, len2] = values;
        Ok(ByteRange {
            start1,
            len1,
            start2,
            len2,
        })
    }
}

/// Two spans covered by one signature. The hex encoded signature sits in the
/// gap between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub start1: usize,
    pub len1: usize,
    pub start2: usize,
    pub len2: usize,
}

impl ByteRange {
    fn end1(&self) -> Result<usize> {
        self.start1
            .checked_add(self.len1)
            .ok_or(ExtractError::OutOfBounds)
    }

    /// First byte past the second span.
    pub fn end(&self) -> Result<usize> {
        self.start2
            .checked_add(self.len2)
            .ok_or(ExtractError::OutOfBounds)
    }

    /// The two covered spans, checked against a document of `doc_len` bytes.
    pub fn spans(&self, doc_len: usize) -> Result<(std::ops::Range<usize>, std::ops::Range<usize>)> {
        let end1 = self.end1()?;
        let end2 = self.end()?;
        if end1 > self.start2 || end2 > doc_len {
            return Err(ExtractError::OutOfBounds);
        }
        Ok((self.start1..end1, self.start2..end2))
    }

    /// `span1 ++ span2`, the bytes the signature was computed over.
    pub fn signed_data(&self, pdf: &[u8]) -> Result<Vec<u8>> {
        let (first, second) = self.spans(pdf.len())?;
        let mut signed_data = Vec::with_capacity(first.len() + second.len());
        signed_data.extend_from_slice(&pdf[first]);
        signed_data.extend_from_slice(&pdf[second]);
        Ok(signed_data)
    }

    /// Text between the spans, minus the opening `<`.
    pub fn signature_hex<'a>(&self, pdf: &'a [u8]) -> Result<&'a [u8]> {
        let (first, second) = self.spans(pdf.len())?;
        let start = first.end.checked_add(1).ok_or(ExtractError::OutOfBounds)?;
        pdf.get(start..second.start).ok_or(ExtractError::OutOfBounds)
    }

    /// Decoded signature blob. The closing `>` and PDF whitespace are dropped.
    pub fn signature(&self, pdf: &[u8]) -> Result<Vec<u8>> {
        let hex_text: Vec<u8> = self
            .signature_hex(pdf)?
            .iter()
            .copied()
            .filter(|b| !is_pdf_whitespace(*b) && *b != b'>')
            .collect();
        Ok(hex::decode(hex_text)?)
    }
}

fn is_pdf_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\n' | b'\r' | b'\t' | b'\x0c' | b'\0')
}

/// Every `/ByteRange` declaration in document order.
pub fn find_byte_ranges(pdf: &[u8]) -> Result<Vec<ByteRangeDecl>> {
    let decls = BYTE_RANGE_REGEX
        .find_iter(pdf)
        .map(|m| parse_decl(m.start(), m.as_bytes()))
        .collect::<Result<Vec<_>>>()?;
    if decls.is_empty() {
        return Err(ExtractError::ByteRangeNotFound);
    }
    log::debug!("found {} ByteRange declaration(s)", decls.len());
    Ok(decls)
}

fn parse_decl(offset: usize, text: &[u8]) -> Result<ByteRangeDecl> {
    // Skip the "/ByteRange" keyword itself.
    let array = &text[b"/ByteRange".len()..];
    let fields = FIELD_REGEX
        .find_iter(array)
        .map(|m| parse_field(m.as_bytes()))
        .collect::<Result<Vec<_>>>()?;

    let fields: [ByteRangeField; 4] = fields.try_into().map_err(|f: Vec<_>| {
        ExtractError::MalformedByteRange(format!("expected 4 values, found {}", f.len()))
    })?;
    Ok(ByteRangeDecl { offset, fields })
}

fn parse_field(text: &[u8]) -> Result<ByteRangeField> {
    if text == PLACEHOLDER {
        return Ok(ByteRangeField::Placeholder);
    }
    std::str::from_utf8(text)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(ByteRangeField::Value)
        .ok_or_else(|| {
            ExtractError::MalformedByteRange(format!(
                "invalid value {}",
                String::from_utf8_lossy(text)
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_every_declaration() {
        let pdf = b"<< /ByteRange [0 10 20 5] >> junk /ByteRange[ 0   30\n40 7 ] ";
        let decls = find_byte_ranges(pdf).unwrap();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].offset, 3);
        assert_eq!(
            decls[1].resolve().unwrap(),
            ByteRange {
                start1: 0,
                len1: 30,
                start2: 40,
                len2: 7
            }
        );
    }

    #[test]
    fn placeholder_is_tracked() {
        let pdf = b"/ByteRange [0 /********** /********** /**********]";
        let decls = find_byte_ranges(pdf).unwrap();
        assert!(decls[0].is_placeholder());
        assert_eq!(decls[0].fields[0], ByteRangeField::Value(0));
        assert!(matches!(
            decls[0].resolve(),
            Err(ExtractError::UnresolvedPlaceholder)
        ));
    }

    #[test]
    fn missing_declaration() {
        assert!(matches!(
            find_byte_ranges(b"%PDF-1.7 /Contents <00>"),
            Err(ExtractError::ByteRangeNotFound)
        ));
        // Three values only.
        assert!(matches!(
            find_byte_ranges(b"/ByteRange [0 10 20]"),
            Err(ExtractError::ByteRangeNotFound)
        ));
    }

    #[test]
    fn huge_value_is_malformed() {
        let pdf = b"/ByteRange [0 10 20 99999999999999999999999999]";
        assert!(matches!(
            find_byte_ranges(pdf),
            Err(ExtractError::MalformedByteRange(_))
        ));
    }

    #[test]
    fn spans_and_signature() {
        let pdf = b"abcde<0a0B 1f\n>fghij";
        let range = ByteRange {
            start1: 0,
            len1: 5,
            start2: 15,
            len2: 5,
        };
        assert_eq!(range.signed_data(pdf).unwrap(), b"abcdefghij");
        assert_eq!(range.signature_hex(pdf).unwrap(), b"0a0B 1f\n>");
        assert_eq!(range.signature(pdf).unwrap(), vec![0x0a, 0x0b, 0x1f]);
    }

    #[test]
    fn rejects_bad_hex_and_bounds() {
        let pdf = b"abcde<zz>fghij";
        let range = ByteRange {
            start1: 0,
            len1: 5,
            start2: 9,
            len2: 5,
        };
        assert!(matches!(
            range.signature(pdf),
            Err(ExtractError::InvalidSignatureHex(_))
        ));

        let past_end = ByteRange { len2: 6, ..range };
        assert!(matches!(
            past_end.signed_data(pdf),
            Err(ExtractError::OutOfBounds)
        ));

        let overlapping = ByteRange { len1: 10, ..range };
        assert!(matches!(
            overlapping.signed_data(pdf),
            Err(ExtractError::OutOfBounds)
        ));

        let overflow = ByteRange {
            start2: usize::MAX,
            ..range
        };
        assert!(matches!(overflow.end(), Err(ExtractError::OutOfBounds)));
    }
}
