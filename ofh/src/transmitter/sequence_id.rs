//! Per-eAxC eCPRI Sequence Identifiers

use common::types::Eaxc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};

/// Generates the 8-bit eCPRI `SEQ_ID` of each eAxC
///
/// The set of eAxCs is fixed at construction; each one wraps independently.
pub struct SequenceIdGenerator {
    counters: HashMap<Eaxc, AtomicU8>,
}

impl SequenceIdGenerator {
    pub fn new(eaxcs: &[Eaxc]) -> Self {
        Self {
            counters: eaxcs.iter().map(|eaxc| (*eaxc, AtomicU8::new(0))).collect(),
        }
    }

    /// Next sequence identifier of `eaxc`
    pub fn generate(&self, eaxc: Eaxc) -> u8 {
        match self.counters.get(&eaxc) {
            Some(counter) => counter.fetch_add(1, Ordering::Relaxed),
            None => {
                debug_assert!(false, "eAxC {} not configured for sequence generation", eaxc);
                0
            }
        }
    }
}
