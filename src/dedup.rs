//! Rolling duplicate detector for messages seen from overlapping sources.
//!
//! Two hash sets of first-sentence text behind a single mutex. A background
//! timer task calls [`DuplicateFilter::rotate`] every `min_keep_alive`: the
//! active set is retired and the pending set (built up since the last
//! rotation) takes its place. A message is a duplicate if its key is
//! already in the active set; a miss inserts into both sets, so the key
//! survives the next rotation. Rotation is deliberately not triggered from
//! [`is_duplicate`] itself - the probe path stays a pure set lookup with no
//! wall-clock reasoning.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::ingest::Message;

struct Sets {
    active: HashSet<Vec<u8>>,
    pending: HashSet<Vec<u8>>,
}

/// Shareable across many producer tasks; every operation is a single
/// mutex-guarded set lookup/insert, never blocking on I/O.
pub struct DuplicateFilter {
    sets: Mutex<Sets>,
}

impl DuplicateFilter {
    pub fn new() -> Self {
        Self {
            sets: Mutex::new(Sets {
                active: HashSet::new(),
                pending: HashSet::new(),
            }),
        }
    }

    fn key(message: &Message) -> &[u8] {
        message.sentences.first().map(|s| s.text.as_slice()).unwrap_or(&[])
    }

    /// Returns `true` iff an identical first-sentence text was already seen
    /// within the active window. On a miss, records the key so a later
    /// duplicate within `2 * min_keep_alive` is still caught.
    pub fn is_duplicate(&self, message: &Message) -> bool {
        let key = Self::key(message);
        let mut sets = self.sets.lock().expect("duplicate filter mutex poisoned");
        if sets.active.contains(key) {
            return true;
        }
        sets.active.insert(key.to_vec());
        sets.pending.insert(key.to_vec());
        false
    }

    /// Retires the active set in favor of the pending one. Called by a
    /// background timer every `min_keep_alive`; never from the probe path.
    pub fn rotate(&self) {
        let mut sets = self.sets.lock().expect("duplicate filter mutex poisoned");
        sets.active = std::mem::take(&mut sets.pending);
    }
}

impl Default for DuplicateFilter {
    fn default() -> Self {
        Self::new()
    }
}
