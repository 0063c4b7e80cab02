//! Joins single- and multi-sentence AIS transmissions into [`Message`]s,
//! keyed by SMID.
//!
//! Eleven fixed slots (SMID 0-9, plus one for sentences that carry no SMID
//! at all) bound memory use regardless of how many in-flight messages a
//! source is juggling. Each slot is a tagged `Empty | Filling` value rather
//! than the "parts == 0 means empty" sentinel a C implementation might use.

use chrono::{DateTime, Duration, Utc};

use super::sentence::{ChecksumVerdict, Sentence};

/// Number of SMID slots: 0-9 plus one for "no SMID".
const SLOT_COUNT: usize = 11;
const NO_SMID_SLOT: usize = 10;

fn slot_index(smid: Option<u8>) -> usize {
    match smid {
        Some(s) => s as usize,
        None => NO_SMID_SLOT,
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Empty,
    Filling {
        parts: u8,
        sentences: Vec<Option<Sentence>>,
        remaining: u8,
        started: DateTime<Utc>,
    },
}

/// A complete, ordered multi-sentence AIS transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub source: String,
    pub sentences: Vec<Sentence>,
    pub started: DateTime<Utc>,
    pub ended: DateTime<Utc>,
}

impl Message {
    /// Concatenation of every sentence's armored payload slice.
    pub fn armored_payload(&self) -> Vec<u8> {
        self.sentences.iter().flat_map(|s| s.payload_bytes().iter().copied()).collect()
    }

    /// The 6-bit AIS message type (0-63), decoded from the first character
    /// of the first sentence's payload. `None` if that payload is empty or
    /// outside the armored character range.
    pub fn type_byte(&self) -> Option<u8> {
        let first = self.sentences.first()?.payload_bytes().first().copied()?;
        match first {
            48..=87 => Some(first - 48),
            96..=119 => Some(first - 56),
            _ => None,
        }
    }

    /// Raw bytes as they should be rebroadcast to subscribers: every
    /// sentence's verbatim text, in part-index order.
    pub fn raw_text(&self) -> Vec<u8> {
        self.sentences.iter().flat_map(|s| s.text.iter().copied()).collect()
    }
}

/// Why a sentence produced no message. All non-fatal; callers typically
/// just bump a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    ChecksumFailed,
    /// The slot this sentence belonged to had a different `parts`.
    Collision,
    /// The live slot was older than `MaxMessageTimespan`.
    TooOld,
    /// This part_index was already filled in the live slot.
    DuplicatePart,
    /// Structurally invalid in a way `Sentence::parse` should already have
    /// rejected; kept as a defensive backstop.
    Rejected(&'static str),
}

/// Result of feeding one sentence to the assembler.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A complete message was assembled.
    Emitted(Message),
    /// The sentence was consumed but didn't complete anything yet.
    Pending,
    /// No message resulted; see `DropReason` for why.
    Dropped(DropReason),
}

/// Assembles sentences from a single source into messages.
pub struct Assembler {
    source: String,
    slots: Vec<Slot>,
    max_timespan: Duration,
}

impl Assembler {
    pub fn new(source: impl Into<String>, max_timespan: Duration) -> Self {
        Self {
            source: source.into(),
            slots: (0..SLOT_COUNT).map(|_| Slot::Empty).collect(),
            max_timespan,
        }
    }

    pub fn accept(&mut self, sentence: Sentence) -> Outcome {
        if sentence.checksum == ChecksumVerdict::Failed {
            let idx = slot_index(sentence.smid);
            if let Slot::Filling {
                parts,
                sentences,
                started,
                ..
            } = &self.slots[idx]
            {
                let same_parts = *parts == sentence.parts;
                let not_aged = sentence.received_at.signed_duration_since(*started) <= self.max_timespan;
                let part_unfilled = (sentence.part_index as usize) < sentences.len()
                    && sentences[sentence.part_index as usize].is_none();
                if same_parts && not_aged && part_unfilled {
                    self.slots[idx] = Slot::Empty;
                }
            }
            return Outcome::Dropped(DropReason::ChecksumFailed);
        }

        if sentence.parts == 1 {
            let started = sentence.received_at;
            let ended = sentence.received_at;
            return Outcome::Emitted(Message {
                source: self.source.clone(),
                sentences: vec![sentence],
                started,
                ended,
            });
        }

        if sentence.part_index >= sentence.parts {
            return Outcome::Dropped(DropReason::Rejected("part_index out of range"));
        }

        let idx = slot_index(sentence.smid);
        let arrived_at = sentence.received_at;
        let slot = std::mem::replace(&mut self.slots[idx], Slot::Empty);

        let (new_slot, outcome) = match slot {
            Slot::Empty => {
                let parts = sentence.parts;
                let part_index = sentence.part_index as usize;
                let started = sentence.received_at;
                let mut sentences = vec![None; parts as usize];
                sentences[part_index] = Some(sentence);
                let remaining = parts - 1;
                (Slot::Filling { parts, sentences, remaining, started }, Outcome::Pending)
            }
            Slot::Filling { parts, mut sentences, remaining, started } => {
                let parts_mismatch = parts != sentence.parts;
                let too_old = arrived_at.signed_duration_since(started) > self.max_timespan;
                let already_filled = (sentence.part_index as usize) < sentences.len()
                    && sentences[sentence.part_index as usize].is_some();

                if parts_mismatch || too_old || already_filled {
                    let reason = if parts_mismatch {
                        DropReason::Collision
                    } else if too_old {
                        DropReason::TooOld
                    } else {
                        DropReason::DuplicatePart
                    };
                    let new_parts = sentence.parts;
                    let part_index = sentence.part_index as usize;
                    let new_started = sentence.received_at;
                    let mut new_sentences = vec![None; new_parts as usize];
                    new_sentences[part_index] = Some(sentence);
                    let new_remaining = new_parts - 1;
                    (
                        Slot::Filling {
                            parts: new_parts,
                            sentences: new_sentences,
                            remaining: new_remaining,
                            started: new_started,
                        },
                        Outcome::Dropped(reason),
                    )
                } else {
                    sentences[sentence.part_index as usize] = Some(sentence);
                    let remaining = remaining - 1;
                    if remaining == 0 {
                        let complete: Vec<Sentence> = sentences.into_iter().map(|s| s.expect("all parts filled")).collect();
                        let message = Message {
                            source: self.source.clone(),
                            sentences: complete,
                            started,
                            ended: arrived_at,
                        };
                        (Slot::Empty, Outcome::Emitted(message))
                    } else {
                        (Slot::Filling { parts, sentences, remaining, started }, Outcome::Pending)
                    }
                }
            }
        };
        self.slots[idx] = new_slot;
        outcome
    }
}
