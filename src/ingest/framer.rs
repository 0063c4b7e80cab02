//! Extracts one NMEA sentence at a time out of a raw, possibly fragmented
//! byte stream, carrying any partial sentence forward across reads.

/// Result of a single framing attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameResult {
    /// A complete sentence was extracted. `bytes` always ends in `\r\n`
    /// (synthesized if the source didn't send one) and is a fresh
    /// allocation, never a view into the input. `consumed` is how many
    /// bytes of `input` (not counting any carried-over prefix) were used.
    Sentence { bytes: Vec<u8>, consumed: usize },
    /// No sentence boundary was found; `carry_over` should be passed back
    /// into the next call alongside the next freshly read chunk.
    Incomplete { carry_over: Vec<u8>, consumed: usize },
}

/// Extracts the first sentence from `input`, given the `carry_over` left
/// behind by a previous incomplete attempt (or `None` on a fresh read).
///
/// See component design §4.1 for the framing rules; the short version: if
/// there's no carry-over, noise before the first `!` is discarded. The
/// next sentence boundary is whichever of the next `!` or the next `\n`
/// comes first. A `\n` terminator is kept (with a `\r` synthesized if
/// missing); a `!` boundary means the sentence had no terminator at all,
/// so one is synthesized and the `!` is left for the next call.
pub fn extract(carry_over: Option<Vec<u8>>, input: &[u8]) -> FrameResult {
    let mut noise_discarded = 0usize;
    let (carry_len, working) = match carry_over {
        Some(carry) => {
            let carry_len = carry.len();
            let mut working = carry;
            working.extend_from_slice(input);
            (carry_len, working)
        }
        None => match input.iter().position(|&b| b == b'!') {
            Some(idx) => {
                noise_discarded = idx;
                (0, input[idx..].to_vec())
            }
            None => {
                return FrameResult::Incomplete {
                    carry_over: Vec::new(),
                    consumed: input.len(),
                }
            }
        },
    };

    let next_bang = working.iter().skip(1).position(|&b| b == b'!').map(|i| i + 1);
    let next_newline = working.iter().position(|&b| b == b'\n');

    let boundary = match (next_bang, next_newline) {
        (None, None) => None,
        (Some(b), None) => Some((b, Boundary::Bang)),
        (None, Some(n)) => Some((n, Boundary::Newline)),
        (Some(b), Some(n)) if b < n => Some((b, Boundary::Bang)),
        (Some(_), Some(n)) => Some((n, Boundary::Newline)),
    };

    match boundary {
        None => FrameResult::Incomplete {
            carry_over: working,
            consumed: input.len(),
        },
        Some((idx, Boundary::Newline)) => {
            let mut bytes: Vec<u8> = working[..idx].to_vec();
            if bytes.last() == Some(&b'\r') {
                bytes.push(b'\n');
            } else {
                bytes.push(b'\r');
                bytes.push(b'\n');
            }
            let consumed_in_working = idx + 1;
            FrameResult::Sentence {
                bytes,
                consumed: noise_discarded + consumed_in_working.saturating_sub(carry_len),
            }
        }
        Some((idx, Boundary::Bang)) => {
            let mut bytes: Vec<u8> = working[..idx].to_vec();
            bytes.extend_from_slice(b"\r\n");
            FrameResult::Sentence {
                bytes,
                consumed: noise_discarded + idx.saturating_sub(carry_len),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Bang,
    Newline,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carry_over_completes_with_newline() {
        let carry = b"!BSVDM,2,2,8,B,88888888880,2*36".to_vec();
        let result = extract(Some(carry), b"\r\n!BSVD");
        assert_eq!(
            result,
            FrameResult::Sentence {
                bytes: b"!BSVDM,2,2,8,B,88888888880,2*36\r\n".to_vec(),
                consumed: 2,
            }
        );
    }

    #[test]
    fn split_across_bang() {
        let input = b"!BSVDM,1,1,,A,14S:Eb001ePRmHBTAAFnrmV60PRk,0*1F!";
        let result = extract(None, input);
        assert_eq!(
            result,
            FrameResult::Sentence {
                bytes: b"!BSVDM,1,1,,A,14S:Eb001ePRmHBTAAFnrmV60PRk,0*1F\r\n".to_vec(),
                consumed: 47,
            }
        );
    }

    #[test]
    fn discards_noise_before_first_bang() {
        let input = b"garbage!GOOD,1,1,,A,x,0*00\r\n";
        let result = extract(None, input);
        match result {
            FrameResult::Sentence { bytes, consumed } => {
                assert_eq!(bytes, b"!GOOD,1,1,,A,x,0*00\r\n".to_vec());
                assert_eq!(consumed, input.len());
            }
            other => panic!("expected a sentence, got {:?}", other),
        }
    }

    #[test]
    fn no_bang_anywhere_is_incomplete_and_discarded() {
        let input = b"nothing to see here";
        let result = extract(None, input);
        assert_eq!(
            result,
            FrameResult::Incomplete {
                carry_over: Vec::new(),
                consumed: input.len(),
            }
        );
    }

    #[test]
    fn incomplete_without_terminator_buffers_everything() {
        let input = b"!AIVDM,1,1,,A,partial";
        let result = extract(None, input);
        assert_eq!(
            result,
            FrameResult::Incomplete {
                carry_over: input.to_vec(),
                consumed: input.len(),
            }
        );
    }

    #[test]
    fn already_crlf_terminated_is_not_double_terminated() {
        let input = b"!AIVDM,1,1,,A,x,0*00\r\n";
        let result = extract(None, input);
        assert_eq!(
            result,
            FrameResult::Sentence {
                bytes: input.to_vec(),
                consumed: input.len(),
            }
        );
    }

    #[test]
    fn emitted_bytes_never_alias_input() {
        let input = b"!AIVDM,1,1,,A,x,0*00\r\n".to_vec();
        if let FrameResult::Sentence { bytes, .. } = extract(None, &input) {
            assert_ne!(bytes.as_ptr(), input.as_ptr());
        } else {
            panic!("expected a sentence");
        }
    }
}
