//! TDD Patterns and OFDM Symbol Ranges
//!
//! Resolves which OFDM symbols of a slot are active for downlink or uplink
//! under a TDD UL/DL configuration (3GPP TS 38.331 TDD-UL-DL-ConfigCommon).

use crate::types::{CyclicPrefix, TypesError};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Half-open range of OFDM symbols `[start, stop)` inside one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OfdmSymbolRange {
    start: u32,
    stop: u32,
}

impl OfdmSymbolRange {
    /// Create a range starting at `start` spanning `length` symbols
    pub fn new(start: u32, length: u32) -> Self {
        Self {
            start,
            stop: start + length,
        }
    }

    /// Create a range validated against the slot size
    pub fn within_slot(start: u32, length: u32, nof_symbols_per_slot: u32) -> Result<Self, TypesError> {
        let range = Self::new(start, length);
        if range.stop > nof_symbols_per_slot {
            return Err(TypesError::InvalidSymbolRange {
                start: range.start,
                stop: range.stop,
                nof_symbols: nof_symbols_per_slot,
            });
        }
        Ok(range)
    }

    /// First symbol of the range
    pub fn start(&self) -> u32 {
        self.start
    }

    /// One past the last symbol of the range
    pub fn stop(&self) -> u32 {
        self.stop
    }

    /// Number of symbols in the range
    pub fn length(&self) -> u32 {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.stop
    }

    pub fn contains(&self, symbol: u32) -> bool {
        symbol >= self.start && symbol < self.stop
    }

    /// Iterate over the symbol indices of the range
    pub fn symbols(&self) -> Range<u32> {
        self.start..self.stop
    }
}

impl std::fmt::Display for OfdmSymbolRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.stop)
    }
}

/// One TDD pattern period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TddPattern {
    /// Period length in slots
    pub dl_ul_tx_period_nof_slots: u32,
    /// Full downlink slots at the start of the period
    pub nof_dl_slots: u32,
    /// Downlink symbols in the slot following the last full downlink slot
    pub nof_dl_symbols: u32,
    /// Full uplink slots at the end of the period
    pub nof_ul_slots: u32,
    /// Uplink symbols at the end of the slot preceding the first full uplink slot
    pub nof_ul_symbols: u32,
}

impl TddPattern {
    fn validate(&self, nof_symbols_per_slot: u32) -> Result<(), TypesError> {
        if self.dl_ul_tx_period_nof_slots == 0 {
            return Err(TypesError::InvalidTddPattern("empty period".to_string()));
        }
        if self.nof_dl_slots + self.nof_ul_slots > self.dl_ul_tx_period_nof_slots {
            return Err(TypesError::InvalidTddPattern(format!(
                "{} DL slots and {} UL slots exceed a period of {} slots",
                self.nof_dl_slots, self.nof_ul_slots, self.dl_ul_tx_period_nof_slots
            )));
        }
        if self.nof_dl_symbols >= nof_symbols_per_slot || self.nof_ul_symbols >= nof_symbols_per_slot {
            return Err(TypesError::InvalidTddPattern(format!(
                "partial slot symbols ({} DL, {} UL) must be below {}",
                self.nof_dl_symbols, self.nof_ul_symbols, nof_symbols_per_slot
            )));
        }
        Ok(())
    }

    fn dl_symbols(&self, slot_in_period: u32, nof_symbols_per_slot: u32) -> OfdmSymbolRange {
        if slot_in_period < self.nof_dl_slots {
            return OfdmSymbolRange::new(0, nof_symbols_per_slot);
        }
        if slot_in_period == self.nof_dl_slots {
            return OfdmSymbolRange::new(0, self.nof_dl_symbols);
        }
        OfdmSymbolRange::default()
    }

    fn ul_symbols(&self, slot_in_period: u32, nof_symbols_per_slot: u32) -> OfdmSymbolRange {
        let first_ul_slot = self.dl_ul_tx_period_nof_slots - self.nof_ul_slots;
        if slot_in_period >= first_ul_slot {
            return OfdmSymbolRange::new(0, nof_symbols_per_slot);
        }
        if self.nof_ul_symbols > 0 && slot_in_period + 1 == first_ul_slot {
            return OfdmSymbolRange::new(nof_symbols_per_slot - self.nof_ul_symbols, self.nof_ul_symbols);
        }
        OfdmSymbolRange::default()
    }
}

/// TDD UL/DL configuration made of one or two patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TddUlDlConfig {
    pub pattern1: TddPattern,
    #[serde(default)]
    pub pattern2: Option<TddPattern>,
}

impl TddUlDlConfig {
    /// Create a configuration, checking the patterns against the slot size
    pub fn new(
        pattern1: TddPattern,
        pattern2: Option<TddPattern>,
        cp: CyclicPrefix,
    ) -> Result<Self, TypesError> {
        let config = Self { pattern1, pattern2 };
        config.validate(cp)?;
        Ok(config)
    }

    /// Check that the patterns are consistent with the given cyclic prefix
    pub fn validate(&self, cp: CyclicPrefix) -> Result<(), TypesError> {
        let nof_symbols = cp.nof_symbols_per_slot();
        self.pattern1.validate(nof_symbols)?;
        if let Some(pattern2) = &self.pattern2 {
            pattern2.validate(nof_symbols)?;
        }
        Ok(())
    }

    /// Total period of the configuration in slots
    pub fn nof_slots_per_period(&self) -> u32 {
        self.pattern1.dl_ul_tx_period_nof_slots
            + self.pattern2.map_or(0, |p| p.dl_ul_tx_period_nof_slots)
    }

    fn locate(&self, slot_index: u32) -> (&TddPattern, u32) {
        let slot_in_period = slot_index % self.nof_slots_per_period();
        match &self.pattern2 {
            Some(pattern2) if slot_in_period >= self.pattern1.dl_ul_tx_period_nof_slots => {
                (pattern2, slot_in_period - self.pattern1.dl_ul_tx_period_nof_slots)
            }
            _ => (&self.pattern1, slot_in_period),
        }
    }

    /// Downlink-active symbols of the slot with the given index
    pub fn active_dl_symbols(&self, slot_index: u32, cp: CyclicPrefix) -> OfdmSymbolRange {
        let (pattern, slot) = self.locate(slot_index);
        pattern.dl_symbols(slot, cp.nof_symbols_per_slot())
    }

    /// Uplink-active symbols of the slot with the given index
    pub fn active_ul_symbols(&self, slot_index: u32, cp: CyclicPrefix) -> OfdmSymbolRange {
        let (pattern, slot) = self.locate(slot_index);
        pattern.ul_symbols(slot, cp.nof_symbols_per_slot())
    }
}
