//! Common Utilities
//!
//! Timing conversions and debugging helpers used across the fronthaul stack

use crate::types::{CyclicPrefix, SubcarrierSpacing};
use std::time::Duration;
use tracing::trace;

/// Convert a byte slice to hex string for debugging
pub fn bytes_to_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Duration of one OFDM symbol, cyclic prefix included, averaged over a slot
pub fn symbol_duration(scs: SubcarrierSpacing, cp: CyclicPrefix) -> Duration {
    let symbols_per_ms = cp.nof_symbols_per_slot() as u64 * scs.slots_per_subframe() as u64;
    Duration::from_nanos(1_000_000 / symbols_per_ms)
}

/// Number of whole symbols contained in `duration`
pub fn duration_to_symbols_floor(duration: Duration, scs: SubcarrierSpacing, cp: CyclicPrefix) -> u32 {
    let symbols_per_ms = cp.nof_symbols_per_slot() as u128 * scs.slots_per_subframe() as u128;
    let symbols = duration.as_nanos() * symbols_per_ms / 1_000_000;
    trace!("{:?} spans {} whole symbols at {} kHz", duration, symbols, scs.as_khz());
    symbols as u32
}

/// Number of symbols needed to cover `duration`
pub fn duration_to_symbols_ceil(duration: Duration, scs: SubcarrierSpacing, cp: CyclicPrefix) -> u32 {
    let symbols_per_ms = cp.nof_symbols_per_slot() as u128 * scs.slots_per_subframe() as u128;
    let scaled = duration.as_nanos() * symbols_per_ms;
    scaled.div_ceil(1_000_000) as u32
}

/// Time utilities for slot/frame calculations
pub mod time {
    use crate::types::SubcarrierSpacing;
    use std::time::Duration;

    /// Slot duration for the given subcarrier spacing
    pub fn slot_duration(scs: SubcarrierSpacing) -> Duration {
        Duration::from_nanos(1_000_000 / scs.slots_per_subframe() as u64)
    }

    /// Number of slots per frame (10ms)
    pub fn slots_per_frame(scs: SubcarrierSpacing) -> u32 {
        10 * scs.slots_per_subframe()
    }
}
