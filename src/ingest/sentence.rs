//! Decodes a single normalized NMEA 0183 AIS-wrapping sentence, as produced
//! by [`super::framer::extract`], into a structured [`Sentence`].
//!
//! The wire shape is fixed: `!IIIII,P,X,S,C,PAYLOAD,p[*HH]\r\n`. Fields are
//! comma-delimited rather than fixed-width (`S` and `C` are often empty), so
//! parsing walks the comma positions directly instead of using nom's
//! combinator machinery the way the decoder's own sentence layer does -
//! there's no real grammar here beyond "split on comma, validate each part".
//! `X` on the wire is NMEA's 1-based sentence number; `Sentence::part_index`
//! stores it converted to 0-based.

use std::ops::Range;

use chrono::{DateTime, Utc};

pub const MIN_SENTENCE_LEN: usize = 17;
pub const MAX_SENTENCE_LEN: usize = 9 * 82;

const IDENTIFIER_PREFIXES: [&[u8; 4]; 10] = [
    b"ABVD", b"ADVD", b"AIVD", b"ANVD", b"ARVD", b"ASVD", b"ATVD", b"AXVD", b"BSVD", b"SAVD",
];

/// Outcome of verifying a sentence's trailing `*HH` checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumVerdict {
    Passed,
    Failed,
    Absent,
}

/// The SMID/parts/part_index triple needed to find (and abort) the
/// assembler slot a malformed sentence would otherwise have belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialKey {
    pub smid: Option<u8>,
    pub parts: u8,
    pub part_index: u8,
}

/// A decoded NMEA 0183 AIS sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    /// Verbatim text, always ending in `\r\n`.
    pub text: Vec<u8>,
    pub identifier: [u8; 5],
    pub parts: u8,
    pub part_index: u8,
    pub smid: Option<u8>,
    pub channel: Option<char>,
    /// Byte range of the armored payload within `text`.
    pub payload: Range<usize>,
    pub padding: u8,
    pub checksum: ChecksumVerdict,
    pub received_at: DateTime<Utc>,
}

impl Sentence {
    pub fn payload_bytes(&self) -> &[u8] {
        &self.text[self.payload.clone()]
    }

    pub fn key(&self) -> PartialKey {
        PartialKey {
            smid: self.smid,
            parts: self.parts,
            part_index: self.part_index,
        }
    }
}

/// A sentence that failed validation. `partial` carries whatever of the
/// SMID/parts/part_index triple was decoded before the failure, so the
/// assembler can still abort a matching in-flight slot.
#[derive(Debug, thiserror::Error)]
#[error("malformed sentence: {reason}")]
pub struct Error {
    pub reason: &'static str,
    pub partial: Option<PartialKey>,
}

impl Error {
    fn bare(reason: &'static str) -> Self {
        Self { reason, partial: None }
    }

    fn with_partial(reason: &'static str, partial: PartialKey) -> Self {
        Self {
            reason,
            partial: Some(partial),
        }
    }
}

fn parse_single_digit(field: &[u8]) -> Option<u8> {
    if field.len() == 1 && field[0].is_ascii_digit() {
        Some(field[0] - b'0')
    } else {
        None
    }
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decodes `text` (the verbatim, CRLF-terminated bytes handed back by the
/// framer) into a [`Sentence`].
pub fn parse(text: Vec<u8>, received_at: DateTime<Utc>) -> Result<Sentence, Error> {
    if text.len() < MIN_SENTENCE_LEN || text.len() > MAX_SENTENCE_LEN {
        return Err(Error::bare("sentence length out of range"));
    }
    if text.first() != Some(&b'!') {
        return Err(Error::bare("missing leading '!'"));
    }
    if !text.ends_with(b"\r\n") {
        return Err(Error::bare("missing trailing CRLF"));
    }
    let body = &text[1..text.len() - 2];

    let (checksum, fields_region) = match body.iter().position(|&b| b == b'*') {
        Some(star) => {
            let hex = &body[star + 1..];
            let verdict = match hex {
                [a, b] => match (hex_value(*a), hex_value(*b)) {
                    (Some(hi), Some(lo)) => {
                        let expected = (hi << 4) | lo;
                        let computed = body[..star].iter().fold(0u8, |acc, &b| acc ^ b);
                        if expected == computed {
                            ChecksumVerdict::Passed
                        } else {
                            ChecksumVerdict::Failed
                        }
                    }
                    _ => ChecksumVerdict::Failed,
                },
                _ => ChecksumVerdict::Failed,
            };
            (verdict, &body[..star])
        }
        None => (ChecksumVerdict::Absent, body),
    };

    let commas: Vec<usize> = fields_region
        .iter()
        .enumerate()
        .filter(|&(_, &b)| b == b',')
        .map(|(i, _)| i)
        .collect();
    if commas.len() != 6 {
        return Err(Error::bare("wrong number of comma-delimited fields"));
    }
    let mut bounds = Vec::with_capacity(7);
    let mut start = 0;
    for &c in &commas {
        bounds.push((start, c));
        start = c + 1;
    }
    bounds.push((start, fields_region.len()));
    let field = |i: usize| -> &[u8] { &fields_region[bounds[i].0..bounds[i].1] };

    let identifier_field = field(0);
    if identifier_field.len() != 5 {
        return Err(Error::bare("identifier must be 5 characters"));
    }
    let (prefix, suffix) = (&identifier_field[..4], identifier_field[4]);
    if !IDENTIFIER_PREFIXES.iter().any(|p| p.as_slice() == prefix) || !matches!(suffix, b'M' | b'O') {
        return Err(Error::bare("identifier not in whitelist"));
    }
    let mut identifier = [0u8; 5];
    identifier.copy_from_slice(identifier_field);

    let parts = parse_single_digit(field(1)).ok_or_else(|| Error::bare("parts must be a single digit"))?;
    if !(1..=9).contains(&parts) {
        return Err(Error::bare("parts out of range"));
    }

    // The wire field is the 1-based NMEA "sentence number"; the rest of the
    // pipeline works with a 0-based part_index.
    let part_index_wire =
        parse_single_digit(field(2)).ok_or_else(|| Error::bare("part_index must be a single digit"))?;
    if part_index_wire == 0 {
        return Err(Error::bare("part_index must be at least 1 on the wire"));
    }
    let part_index = part_index_wire - 1;

    let smid = if field(3).is_empty() {
        None
    } else {
        Some(parse_single_digit(field(3)).ok_or_else(|| Error::bare("smid must be a single digit"))?)
    };

    let partial_key = PartialKey { smid, parts, part_index };

    if part_index >= parts {
        return Err(Error::with_partial("part_index out of range", partial_key));
    }
    if smid.is_none() != (parts == 1) {
        return Err(Error::with_partial("SMID presence disagrees with parts", partial_key));
    }

    let channel_field = field(4);
    let channel = if channel_field.is_empty() {
        None
    } else if channel_field.len() == 1 {
        match channel_field[0] {
            b'A' | b'1' => Some('A'),
            b'B' | b'2' => Some('B'),
            b'*' => Some('*'),
            _ => return Err(Error::with_partial("channel not recognized", partial_key)),
        }
    } else {
        return Err(Error::with_partial("channel field too long", partial_key));
    };

    let payload_field_bounds = bounds[5];
    let payload = (1 + payload_field_bounds.0)..(1 + payload_field_bounds.1);

    let padding = parse_single_digit(field(6)).ok_or_else(|| Error::with_partial("padding must be a single digit", partial_key))?;
    if padding > 5 {
        return Err(Error::with_partial("padding out of range", partial_key));
    }

    Ok(Sentence {
        text,
        identifier,
        parts,
        part_index,
        smid,
        channel,
        payload,
        padding,
        checksum,
        received_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn checksum_passes_on_matching_text() {
        let text = b"!BSVDM,1,1,,A,14S:Eb001ePRmHBTAAFnrmV60PRk,0*1F\r\n".to_vec();
        let sentence = parse(text, now()).unwrap();
        assert_eq!(sentence.checksum, ChecksumVerdict::Passed);
        assert_eq!(&sentence.identifier, b"BSVDM");
        assert_eq!(sentence.parts, 1);
        assert_eq!(sentence.part_index, 0);
        assert_eq!(sentence.smid, None);
        assert_eq!(sentence.channel, Some('A'));
        assert_eq!(sentence.padding, 0);
        assert_eq!(sentence.payload_bytes(), b"14S:Eb001ePRmHBTAAFnrmV60PRk");
    }

    #[test]
    fn checksum_fails_on_mismatched_hex() {
        let text = b"!BSVDM,1,1,,A,14S:Eb001ePRmHBTAAFnrmV60PRk,0*1E\r\n".to_vec();
        let sentence = parse(text, now()).unwrap();
        assert_eq!(sentence.checksum, ChecksumVerdict::Failed);
    }

    #[test]
    fn checksum_absent_when_no_star() {
        let text = b"!AIVDM,1,1,,A,14S:Eb001ePRmHBTAAFnrmV60PRk,0\r\n".to_vec();
        let sentence = parse(text, now()).unwrap();
        assert_eq!(sentence.checksum, ChecksumVerdict::Absent);
    }

    #[test]
    fn lowercase_hex_checksum_is_not_accepted() {
        let text = b"!BSVDM,1,1,,A,14S:Eb001ePRmHBTAAFnrmV60PRk,0*1f\r\n".to_vec();
        let sentence = parse(text, now()).unwrap();
        assert_eq!(sentence.checksum, ChecksumVerdict::Failed);
    }

    #[test]
    fn multipart_sentence_carries_smid() {
        let text = b"!AIVDM,2,1,8,B,88888888880,2*36\r\n".to_vec();
        let sentence = parse(text, now()).unwrap();
        assert_eq!(sentence.parts, 2);
        assert_eq!(sentence.part_index, 0);
        assert_eq!(sentence.smid, Some(8));
    }

    #[test]
    fn channel_digits_remap_to_letters() {
        let text = b"!AIVDM,1,1,,1,14S:Eb001ePRmHBTAAFnrmV60PRk,0*1D\r\n".to_vec();
        let sentence = parse(text, now()).unwrap();
        assert_eq!(sentence.channel, Some('A'));
    }

    #[test]
    fn unknown_identifier_is_malformed() {
        let text = b"!ZZVDM,1,1,,A,14S:Eb001ePRmHBTAAFnrmV60PRk,0*00\r\n".to_vec();
        let err = parse(text, now()).unwrap_err();
        assert_eq!(err.reason, "identifier not in whitelist");
        assert!(err.partial.is_none());
    }

    #[test]
    fn single_part_with_smid_is_malformed_with_partial_key() {
        let text = b"!AIVDM,1,1,3,A,14S:Eb001ePRmHBTAAFnrmV60PRk,0*00\r\n".to_vec();
        let err = parse(text, now()).unwrap_err();
        assert_eq!(err.reason, "SMID presence disagrees with parts");
        assert_eq!(
            err.partial,
            Some(PartialKey {
                smid: Some(3),
                parts: 1,
                part_index: 0,
            })
        );
    }

    #[test]
    fn part_index_out_of_range_is_malformed() {
        let text = b"!AIVDM,2,3,5,A,14S:Eb001ePRmHBTAAFnrmV60PRk,0*00\r\n".to_vec();
        let err = parse(text, now()).unwrap_err();
        assert_eq!(err.reason, "part_index out of range");
        assert!(err.partial.is_some());
    }

    #[test]
    fn padding_above_five_is_malformed() {
        let text = b"!AIVDM,1,1,,A,14S:Eb001ePRmHBTAAFnrmV60PRk,8*00\r\n".to_vec();
        let err = parse(text, now()).unwrap_err();
        assert_eq!(err.reason, "padding out of range");
    }

    #[test]
    fn too_short_is_malformed() {
        let text = b"!AIVDM,1\r\n".to_vec();
        let err = parse(text, now()).unwrap_err();
        assert_eq!(err.reason, "sentence length out of range");
    }
}
