//! Test-Pattern Slot Driver
//!
//! Stands in for the upper PHY: every TTI boundary reported by the Radio Unit
//! is queued to a dedicated thread, which hands a test-pattern downlink grid
//! to every sector and, optionally, requests the uplink symbols of the slot.

use common::SlotPoint;
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use num_complex::Complex32;
use ofh::{ResourceGrid, ResourceGridContext, ResourceGridReader, UplinkRxSymbolContext, UplinkSymbolNotifier};
use ru::{RadioUnit, RuErrorContext, RuErrorNotifier, RuOfh, RuTimingNotifier};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Slot events counted by the driver
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotEventStats {
    pub ttis: u64,
    pub ttis_dropped: u64,
    pub late_downlink: u64,
    pub late_uplink: u64,
    pub uplink_symbols: u64,
}

/// Receives the Radio Unit timing, error and uplink events
pub struct SlotEventNotifier {
    tti_sender: Sender<SlotPoint>,
    ttis: AtomicU64,
    ttis_dropped: AtomicU64,
    late_downlink: AtomicU64,
    late_uplink: AtomicU64,
    uplink_symbols: AtomicU64,
}

impl SlotEventNotifier {
    pub fn new(tti_sender: Sender<SlotPoint>) -> Self {
        Self {
            tti_sender,
            ttis: AtomicU64::new(0),
            ttis_dropped: AtomicU64::new(0),
            late_downlink: AtomicU64::new(0),
            late_uplink: AtomicU64::new(0),
            uplink_symbols: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> SlotEventStats {
        SlotEventStats {
            ttis: self.ttis.load(Ordering::Relaxed),
            ttis_dropped: self.ttis_dropped.load(Ordering::Relaxed),
            late_downlink: self.late_downlink.load(Ordering::Relaxed),
            late_uplink: self.late_uplink.load(Ordering::Relaxed),
            uplink_symbols: self.uplink_symbols.load(Ordering::Relaxed),
        }
    }
}

impl RuTimingNotifier for SlotEventNotifier {
    fn on_tti_boundary(&self, slot: SlotPoint) {
        self.ttis.fetch_add(1, Ordering::Relaxed);
        // Called from the timing thread: never block it.
        match self.tti_sender.try_send(slot) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.ttis_dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Slot driver is behind, skipping slot {}", slot);
            }
            Err(TrySendError::Disconnected(_)) => {
                self.ttis_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn on_ul_half_slot_boundary(&self, slot: SlotPoint) {
        trace!("Uplink half slot {}", slot);
    }

    fn on_ul_full_slot_boundary(&self, slot: SlotPoint) {
        trace!("Uplink full slot {}", slot);
    }
}

impl RuErrorNotifier for SlotEventNotifier {
    fn on_late_downlink_message(&self, context: &RuErrorContext) {
        self.late_downlink.fetch_add(1, Ordering::Relaxed);
        warn!("Sector {}: late downlink slot {}", context.sector, context.slot);
    }

    fn on_late_uplink_message(&self, context: &RuErrorContext) {
        self.late_uplink.fetch_add(1, Ordering::Relaxed);
        warn!("Sector {}: late uplink request for slot {}", context.sector, context.slot);
    }
}

impl UplinkSymbolNotifier for SlotEventNotifier {
    fn on_new_uplink_symbol(&self, context: &UplinkRxSymbolContext, grid: &dyn ResourceGridReader) {
        self.uplink_symbols.fetch_add(1, Ordering::Relaxed);
        trace!(
            "Sector {}: uplink symbol {} of slot {}, first RE {}",
            context.sector,
            context.symbol,
            context.slot,
            grid.get(0, context.symbol as usize, 0)
        );
    }
}

/// Grid dimensions of one sector
#[derive(Debug, Clone, Copy)]
pub struct SectorGridConfig {
    pub nof_symbols: usize,
    pub nof_subc: usize,
    pub nof_ul_ports: usize,
}

/// Build the downlink test pattern: QPSK points cycling across subcarriers
pub fn test_pattern_grid(nof_symbols: usize, nof_subc: usize, amplitude: f32) -> ResourceGrid {
    let points = [
        Complex32::new(amplitude, amplitude),
        Complex32::new(-amplitude, amplitude),
        Complex32::new(-amplitude, -amplitude),
        Complex32::new(amplitude, -amplitude),
    ];

    let mut grid = ResourceGrid::new(1, nof_symbols, nof_subc);
    for symbol in 0..nof_symbols {
        let values: Vec<Complex32> = (0..nof_subc).map(|subc| points[(subc + symbol) % points.len()]).collect();
        ofh::ResourceGridWriter::put(&mut grid, 0, symbol, 0, &values);
    }
    grid
}

/// Feeds the Radio Unit one slot at a time
pub struct SlotDriver {
    ru: Arc<RuOfh>,
    dl_grids: Vec<ResourceGrid>,
    sectors: Vec<SectorGridConfig>,
    request_uplink: bool,
}

impl SlotDriver {
    pub fn new(ru: Arc<RuOfh>, sectors: Vec<SectorGridConfig>, amplitude: f32, request_uplink: bool) -> Self {
        let dl_grids = sectors
            .iter()
            .map(|sector| test_pattern_grid(sector.nof_symbols, sector.nof_subc, amplitude))
            .collect();
        Self {
            ru,
            dl_grids,
            sectors,
            request_uplink,
        }
    }

    fn handle_slot(&self, slot: SlotPoint) {
        for (sector, (grid, dims)) in self.dl_grids.iter().zip(&self.sectors).enumerate() {
            let context = ResourceGridContext { slot, sector };
            self.ru.get_downlink_plane_handler().handle_dl_data(&context, grid);

            if self.request_uplink {
                let ul_grid = ResourceGrid::new_shared(dims.nof_ul_ports, dims.nof_symbols, dims.nof_subc);
                self.ru.get_uplink_plane_handler().handle_new_uplink_slot(&context, ul_grid);
            }
        }
    }

    /// Serve queued slots until `running` is cleared
    pub fn run(self, slots: Receiver<SlotPoint>, running: Arc<AtomicBool>) {
        info!("Slot driver started for {} sectors", self.sectors.len());
        let mut nof_slots = 0u64;

        while running.load(Ordering::Acquire) {
            match slots.recv_timeout(Duration::from_millis(100)) {
                Ok(slot) => {
                    self.handle_slot(slot);
                    nof_slots += 1;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        debug!("Slot driver stopped after {} slots", nof_slots);
    }
}
