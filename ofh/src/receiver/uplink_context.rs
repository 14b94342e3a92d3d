//! Uplink Slot Contexts
//!
//! Each uplink slot requested by the layers above registers the grid the
//! received samples go to. The receiver fills it and tracks, per symbol,
//! which PRBs every uplink eAxC has delivered, so repeated sections never
//! complete a symbol early.

use crate::resource_grid::{ResourceGridWriter, SharedResourceGrid};
use common::types::SectorId;
use common::{OfdmSymbolRange, SlotPoint};
use num_complex::Complex32;
use parking_lot::Mutex;
use tracing::debug;

/// Set of PRBs received for one port and symbol
#[derive(Debug, Clone, Default)]
struct PrbMask {
    words: Vec<u64>,
    count: u32,
}

impl PrbMask {
    fn new(nof_prb: u32) -> Self {
        Self {
            words: vec![0; (nof_prb as usize).div_ceil(64)],
            count: 0,
        }
    }

    /// Mark `[start, start + len)`, ignoring PRBs beyond the mask
    fn insert_range(&mut self, start: u32, len: u32) {
        let capacity = self.words.len() as u32 * 64;
        for prb in start..start.saturating_add(len).min(capacity) {
            let (word, bit) = ((prb / 64) as usize, prb % 64);
            if self.words[word] & (1 << bit) == 0 {
                self.words[word] |= 1 << bit;
                self.count += 1;
            }
        }
    }

    fn count(&self) -> u32 {
        self.count
    }
}

/// Reception state of one uplink slot
struct UplinkContext {
    slot: SlotPoint,
    sector: SectorId,
    grid: SharedResourceGrid,
    symbol_range: OfdmSymbolRange,
    /// PRBs received, indexed by [port][symbol]
    prbs_received: Vec<Vec<PrbMask>>,
    /// Symbols already reported complete
    completed: Vec<bool>,
}

impl UplinkContext {
    fn is_complete(&self) -> bool {
        self.symbol_range.symbols().all(|symbol| self.completed[symbol as usize])
    }
}

/// Result of writing received PRBs
#[derive(Debug, Clone)]
pub enum UplinkWriteOutcome {
    /// No uplink request registered for the slot
    NoContext,
    /// Symbol outside the requested symbol range
    OutsideSymbolRange,
    /// PRBs written; `completed` is set once the symbol is complete on every port
    Written {
        sector: SectorId,
        completed: Option<SharedResourceGrid>,
    },
}

/// Identifies an expired context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UplinkContextRef {
    pub slot: SlotPoint,
    pub sector: SectorId,
}

/// Ring of uplink contexts indexed by slot
pub struct UplinkContextRepository {
    ring: Vec<Mutex<Option<UplinkContext>>>,
    nof_ports: usize,
    nof_symbols: usize,
    nof_prb: u32,
}

impl UplinkContextRepository {
    pub fn new(nof_slots: usize, nof_ports: usize, nof_symbols: usize, nof_prb: u32) -> Self {
        assert!(nof_slots > 0, "Uplink context repository needs at least one slot");
        assert!(nof_ports > 0, "Uplink context repository needs at least one port");
        Self {
            ring: (0..nof_slots).map(|_| Mutex::new(None)).collect(),
            nof_ports,
            nof_symbols,
            nof_prb,
        }
    }

    fn position(&self, slot: SlotPoint) -> &Mutex<Option<UplinkContext>> {
        &self.ring[slot.system_slot() as usize % self.ring.len()]
    }

    /// Register the grid receiving the samples of `slot`
    pub fn add(&self, slot: SlotPoint, sector: SectorId, grid: SharedResourceGrid, symbol_range: OfdmSymbolRange) {
        let mut position = self.position(slot).lock();
        if let Some(previous) = position.as_ref() {
            if previous.slot != slot && !previous.is_complete() {
                debug!("Replacing incomplete uplink context of slot {} with slot {}", previous.slot, slot);
            }
        }

        let stop = symbol_range.stop().min(self.nof_symbols as u32);
        let start = symbol_range.start().min(stop);
        *position = Some(UplinkContext {
            slot,
            sector,
            grid,
            symbol_range: OfdmSymbolRange::new(start, stop - start),
            prbs_received: vec![vec![PrbMask::new(self.nof_prb); self.nof_symbols]; self.nof_ports],
            completed: vec![false; self.nof_symbols],
        });
    }

    /// Whether a context is registered for `slot`
    pub fn contains(&self, slot: SlotPoint) -> bool {
        self.position(slot).lock().as_ref().is_some_and(|c| c.slot == slot)
    }

    /// Write received samples of one port and symbol
    pub fn write(
        &self,
        slot: SlotPoint,
        port: usize,
        symbol: u32,
        start_prb: u32,
        samples: &[Complex32],
    ) -> UplinkWriteOutcome {
        let mut position = self.position(slot).lock();
        let Some(context) = position.as_mut().filter(|c| c.slot == slot) else {
            return UplinkWriteOutcome::NoContext;
        };
        if !context.symbol_range.contains(symbol) || port >= self.nof_ports {
            return UplinkWriteOutcome::OutsideSymbolRange;
        }

        let subc_offset = start_prb as usize * crate::NOF_SUBCARRIERS_PER_RB;
        context.grid.lock().put(port, symbol as usize, subc_offset, samples);

        let symbol = symbol as usize;
        context.prbs_received[port][symbol]
            .insert_range(start_prb, (samples.len() / crate::NOF_SUBCARRIERS_PER_RB) as u32);

        let complete = !context.completed[symbol]
            && context
                .prbs_received
                .iter()
                .all(|per_symbol| per_symbol[symbol].count() >= self.nof_prb);
        if complete {
            context.completed[symbol] = true;
        }

        UplinkWriteOutcome::Written {
            sector: context.sector,
            completed: complete.then(|| context.grid.clone()),
        }
    }

    /// Drop the context of `slot`, reporting it if it was never completed
    pub fn expire(&self, slot: SlotPoint) -> Option<UplinkContextRef> {
        let mut position = self.position(slot).lock();
        if position.as_ref().is_some_and(|c| c.slot == slot) {
            if let Some(context) = position.take() {
                if !context.is_complete() {
                    return Some(UplinkContextRef {
                        slot: context.slot,
                        sector: context.sector,
                    });
                }
            }
        }
        None
    }
}
