//! Slot and Symbol Timing Points
//!
//! A slot point identifies one slot of the system frame number (SFN) cycle
//! for a given numerology. Arithmetic wraps every 1024 frames, and the
//! difference between two points is the shortest signed distance on that
//! circle.

use crate::types::MAX_NUMEROLOGY;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

/// Number of system frames before the SFN wraps
pub const NOF_SFNS: u32 = 1024;

/// Number of subframes per 10 ms frame
pub const NOF_SUBFRAMES_PER_FRAME: u32 = 10;

/// Shortest signed distance of `a - b` on a circle of `period` elements
fn circular_distance(a: u32, b: u32, period: u32) -> i32 {
    let diff = (a as i64 - b as i64).rem_euclid(period as i64);
    if diff >= (period / 2) as i64 {
        (diff - period as i64) as i32
    } else {
        diff as i32
    }
}

/// Slot timing identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotPoint {
    numerology: u8,
    count: u32,
}

impl SlotPoint {
    /// Create a slot point from SFN and slot index within the frame
    pub fn new(numerology: u8, sfn: u32, slot_index: u32) -> Self {
        assert!(numerology <= MAX_NUMEROLOGY, "Invalid numerology {}", numerology);
        let slots_per_frame = NOF_SUBFRAMES_PER_FRAME << numerology;
        assert!(sfn < NOF_SFNS, "Invalid SFN {}", sfn);
        assert!(
            slot_index < slots_per_frame,
            "Invalid slot index {} for numerology {}",
            slot_index,
            numerology
        );

        Self {
            numerology,
            count: sfn * slots_per_frame + slot_index,
        }
    }

    /// Create a slot point from a system slot count, wrapping at the SFN period
    pub fn from_count(numerology: u8, count: u32) -> Self {
        assert!(numerology <= MAX_NUMEROLOGY, "Invalid numerology {}", numerology);
        let period = NOF_SFNS * (NOF_SUBFRAMES_PER_FRAME << numerology);
        Self {
            numerology,
            count: count % period,
        }
    }

    /// Numerology of this slot point
    pub fn numerology(&self) -> u8 {
        self.numerology
    }

    /// Slots per 1 ms subframe
    pub fn nof_slots_per_subframe(&self) -> u32 {
        1 << self.numerology
    }

    /// Slots per 10 ms frame
    pub fn nof_slots_per_frame(&self) -> u32 {
        NOF_SUBFRAMES_PER_FRAME * self.nof_slots_per_subframe()
    }

    /// Slots in a whole SFN cycle
    pub fn nof_slots_per_system_frame(&self) -> u32 {
        NOF_SFNS * self.nof_slots_per_frame()
    }

    /// Slot count since SFN 0, slot 0
    pub fn system_slot(&self) -> u32 {
        self.count
    }

    /// System frame number
    pub fn sfn(&self) -> u32 {
        self.count / self.nof_slots_per_frame()
    }

    /// Slot index within the frame
    pub fn slot_index(&self) -> u32 {
        self.count % self.nof_slots_per_frame()
    }

    /// Subframe index within the frame
    pub fn subframe_index(&self) -> u32 {
        self.slot_index() / self.nof_slots_per_subframe()
    }

    /// Slot index within the subframe
    pub fn subframe_slot_index(&self) -> u32 {
        self.slot_index() % self.nof_slots_per_subframe()
    }
}

impl Add<i32> for SlotPoint {
    type Output = SlotPoint;

    fn add(self, rhs: i32) -> SlotPoint {
        let period = self.nof_slots_per_system_frame() as i64;
        let count = (self.count as i64 + rhs as i64).rem_euclid(period);
        SlotPoint {
            numerology: self.numerology,
            count: count as u32,
        }
    }
}

impl Sub<i32> for SlotPoint {
    type Output = SlotPoint;

    fn sub(self, rhs: i32) -> SlotPoint {
        self + (-rhs)
    }
}

impl Sub<SlotPoint> for SlotPoint {
    type Output = i32;

    fn sub(self, rhs: SlotPoint) -> i32 {
        assert_eq!(
            self.numerology, rhs.numerology,
            "Slot points with different numerologies are not comparable"
        );
        circular_distance(self.count, rhs.count, self.nof_slots_per_system_frame())
    }
}

impl PartialOrd for SlotPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.numerology != other.numerology {
            return None;
        }
        Some((*self - *other).cmp(&0))
    }
}

impl fmt::Display for SlotPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.sfn(), self.slot_index())
    }
}

/// Symbol timing identifier: a slot point plus the OFDM symbol inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotSymbolPoint {
    slot: SlotPoint,
    symbol_index: u32,
    nof_symbols: u32,
}

impl SlotSymbolPoint {
    /// Create a symbol point
    pub fn new(slot: SlotPoint, symbol_index: u32, nof_symbols: u32) -> Self {
        assert!(nof_symbols > 0, "Invalid number of symbols per slot");
        assert!(
            symbol_index < nof_symbols,
            "Invalid symbol index {} for {} symbols per slot",
            symbol_index,
            nof_symbols
        );
        Self {
            slot,
            symbol_index,
            nof_symbols,
        }
    }

    /// Create a symbol point from a system symbol count
    pub fn from_symbol_count(numerology: u8, count: u64, nof_symbols: u32) -> Self {
        let nof_symbols_u64 = nof_symbols as u64;
        let slot = SlotPoint::from_count(numerology, (count / nof_symbols_u64) as u32);
        Self::new(slot, (count % nof_symbols_u64) as u32, nof_symbols)
    }

    /// Slot of this symbol
    pub fn slot(&self) -> SlotPoint {
        self.slot
    }

    /// Symbol index within the slot
    pub fn symbol_index(&self) -> u32 {
        self.symbol_index
    }

    /// Symbols per slot
    pub fn nof_symbols(&self) -> u32 {
        self.nof_symbols
    }

    /// Symbols in a whole SFN cycle
    pub fn nof_symbols_per_system_frame(&self) -> u32 {
        self.slot.nof_slots_per_system_frame() * self.nof_symbols
    }

    /// Symbol count since SFN 0, slot 0, symbol 0
    pub fn system_symbol(&self) -> u32 {
        self.slot.system_slot() * self.nof_symbols + self.symbol_index
    }
}

impl Add<i32> for SlotSymbolPoint {
    type Output = SlotSymbolPoint;

    fn add(self, rhs: i32) -> SlotSymbolPoint {
        let period = self.nof_symbols_per_system_frame() as i64;
        let count = (self.system_symbol() as i64 + rhs as i64).rem_euclid(period);
        SlotSymbolPoint::from_symbol_count(self.slot.numerology(), count as u64, self.nof_symbols)
    }
}

impl Sub<i32> for SlotSymbolPoint {
    type Output = SlotSymbolPoint;

    fn sub(self, rhs: i32) -> SlotSymbolPoint {
        self + (-rhs)
    }
}

impl Sub<SlotSymbolPoint> for SlotSymbolPoint {
    type Output = i32;

    fn sub(self, rhs: SlotSymbolPoint) -> i32 {
        assert_eq!(self.nof_symbols, rhs.nof_symbols, "Symbol points with different slot sizes");
        assert_eq!(
            self.slot.numerology(),
            rhs.slot.numerology(),
            "Symbol points with different numerologies"
        );
        circular_distance(
            self.system_symbol(),
            rhs.system_symbol(),
            self.nof_symbols_per_system_frame(),
        )
    }
}

impl fmt::Display for SlotSymbolPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.slot, self.symbol_index)
    }
}
