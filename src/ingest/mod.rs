//! Turns a raw byte stream from a source connector into [`Message`]s.
//!
//! `Pipeline` owns one [`framer`] carry-over buffer and one
//! [`assembler::Assembler`] per source, matching the spec's requirement
//! that sentence order is only preserved *within* a source. Feeding bytes
//! through [`Pipeline::feed`] in a loop drains every sentence the chunk
//! completed.

pub mod assembler;
pub mod framer;
pub mod sentence;

use chrono::{DateTime, Duration, Utc};

pub use assembler::{Message, Outcome as AssembleOutcome};
pub use sentence::Sentence;

/// Default bound on how long an in-flight multi-sentence message may take
/// to complete before its slot is treated as stale.
pub const DEFAULT_MAX_MESSAGE_TIMESPAN: Duration = Duration::seconds(2);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Malformed(#[from] sentence::Error),
}

/// Outcome of feeding one chunk of bytes through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A complete message was assembled.
    Message(Message),
    /// A sentence was extracted but dropped (checksum failure, assembly
    /// collision, malformed structure, ...). Counters live in the caller.
    Dropped,
}

/// Per-source framing + parsing + assembly pipeline.
pub struct Pipeline {
    carry_over: Option<Vec<u8>>,
    assembler: assembler::Assembler,
}

impl Pipeline {
    pub fn new(source: impl Into<String>, max_message_timespan: Duration) -> Self {
        Self {
            carry_over: None,
            assembler: assembler::Assembler::new(source, max_message_timespan),
        }
    }

    /// Feeds one freshly read chunk through framing/parsing/assembly,
    /// draining every sentence boundary the chunk completed.
    ///
    /// Returns events in arrival order; a chunk that completes no sentence
    /// (still buffering) produces an empty vector.
    pub fn feed(&mut self, mut input: &[u8], received_at: DateTime<Utc>) -> Vec<Event> {
        let mut events = Vec::new();
        loop {
            match framer::extract(self.carry_over.take(), input) {
                framer::FrameResult::Incomplete { carry_over, consumed } => {
                    self.carry_over = if carry_over.is_empty() { None } else { Some(carry_over) };
                    input = &input[consumed..];
                    break;
                }
                framer::FrameResult::Sentence { bytes, consumed } => {
                    events.push(self.accept_text(bytes, received_at));
                    if consumed == 0 {
                        // A sentence was fully satisfied by the prior carry-over
                        // alone; nothing in this chunk has been consumed yet.
                        // Re-run framing on the untouched remainder rather than
                        // spinning without making progress.
                        if input.is_empty() {
                            break;
                        }
                        continue;
                    }
                    input = &input[consumed..];
                    if input.is_empty() {
                        break;
                    }
                }
            }
        }
        events
    }

    fn accept_text(&mut self, text: Vec<u8>, received_at: DateTime<Utc>) -> Event {
        match sentence::parse(text, received_at) {
            Ok(sentence) => match self.assembler.accept(sentence) {
                assembler::Outcome::Emitted(message) => Event::Message(message),
                assembler::Outcome::Pending | assembler::Outcome::Dropped(_) => Event::Dropped,
            },
            Err(_malformed) => Event::Dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc) + Duration::seconds(seconds)
    }

    #[test]
    fn single_chunk_with_complete_sentence_emits_a_message() {
        let mut pipeline = Pipeline::new("src-a", Duration::seconds(2));
        let input = b"!AIVDM,1,1,,A,14S:Eb001ePRmHBTAAFnrmV60PRk,0*16\r\n";
        let events = pipeline.feed(input, at(0));
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::Message(_)));
    }

    #[test]
    fn two_sentences_in_one_chunk_both_drain() {
        let mut pipeline = Pipeline::new("src-a", Duration::seconds(2));
        let input = b"!AIVDM,1,1,,A,14S:Eb001ePRmHBTAAFnrmV60PRk,0*16\r\n!AIVDM,1,1,,A,14S:Eb001ePRmHBTAAFnrmV60PRk,0*16\r\n";
        let events = pipeline.feed(input, at(0));
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(e, Event::Message(_))));
    }

    #[test]
    fn split_sentence_across_two_feeds_still_assembles() {
        let mut pipeline = Pipeline::new("src-a", Duration::seconds(2));
        let first = pipeline.feed(b"!AIVDM,1,1,,A,14S:Eb00", at(0));
        assert!(first.is_empty());
        let second = pipeline.feed(b"1ePRmHBTAAFnrmV60PRk,0*16\r\n", at(1));
        assert_eq!(second.len(), 1);
        assert!(matches!(second[0], Event::Message(_)));
    }

    #[test]
    fn garbage_sentence_drops_without_panicking() {
        let mut pipeline = Pipeline::new("src-a", Duration::seconds(2));
        let events = pipeline.feed(b"!NOPE,garbage\r\n", at(0));
        assert_eq!(events, vec![Event::Dropped]);
    }
}
