//! Transmission and Reception Window Checkers
//!
//! Both checkers follow the OTA symbol clock and classify a slot (transmit
//! side) or a received symbol (receive side) against a window expressed in
//! symbols relative to OTA. The downlink transmit window and the uplink
//! reception window are configured independently.

use crate::timing::OtaSymbolBoundaryNotifier;
use common::types::{CyclicPrefix, SubcarrierSpacing};
use common::{duration_to_symbols_ceil, duration_to_symbols_floor, SlotPoint, SlotSymbolPoint};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::warn;

/// No OTA symbol received yet
const NO_OTA_SYMBOL: u64 = u64::MAX;

/// O-RAN T1a transmission bounds of the DU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxWindowDurations {
    pub t1a_max_cp_dl: Duration,
    pub t1a_min_cp_dl: Duration,
    pub t1a_max_cp_ul: Duration,
    pub t1a_min_cp_ul: Duration,
    pub t1a_max_up: Duration,
    pub t1a_min_up: Duration,
}

/// Transmission window bounds, in symbols before OTA
///
/// `*_start` is the earliest and `*_end` the latest symbol, counted backwards
/// from the OTA symbol, at which a message may be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxWindowTimingParameters {
    pub sym_cp_dl_start: u32,
    pub sym_cp_dl_end: u32,
    pub sym_cp_ul_start: u32,
    pub sym_cp_ul_end: u32,
    pub sym_up_dl_start: u32,
    pub sym_up_dl_end: u32,
}

impl TxWindowTimingParameters {
    /// Convert T1a durations, rounding the window inwards
    pub fn from_durations(durations: &TxWindowDurations, scs: SubcarrierSpacing, cp: CyclicPrefix) -> Self {
        Self {
            sym_cp_dl_start: duration_to_symbols_ceil(durations.t1a_max_cp_dl, scs, cp),
            sym_cp_dl_end: duration_to_symbols_floor(durations.t1a_min_cp_dl, scs, cp),
            sym_cp_ul_start: duration_to_symbols_ceil(durations.t1a_max_cp_ul, scs, cp),
            sym_cp_ul_end: duration_to_symbols_floor(durations.t1a_min_cp_ul, scs, cp),
            sym_up_dl_start: duration_to_symbols_ceil(durations.t1a_max_up, scs, cp),
            sym_up_dl_end: duration_to_symbols_floor(durations.t1a_min_up, scs, cp),
        }
    }
}

/// Reception window bounds, in symbols after the packet's nominal symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxWindowTimingParameters {
    pub sym_start: u32,
    pub sym_end: u32,
}

impl RxWindowTimingParameters {
    /// Convert the Ta4 bounds of the RU to symbols
    pub fn from_durations(ta4_min: Duration, ta4_max: Duration, scs: SubcarrierSpacing, cp: CyclicPrefix) -> Self {
        Self {
            sym_start: duration_to_symbols_floor(ta4_min, scs, cp),
            sym_end: duration_to_symbols_ceil(ta4_max, scs, cp),
        }
    }
}

/// OTA symbol holder shared by both checkers
struct OtaTracker {
    numerology: u8,
    nof_symbols_per_slot: u32,
    symbol: AtomicU64,
}

impl OtaTracker {
    fn new(scs: SubcarrierSpacing, cp: CyclicPrefix) -> Self {
        Self {
            numerology: scs.numerology(),
            nof_symbols_per_slot: cp.nof_symbols_per_slot(),
            symbol: AtomicU64::new(NO_OTA_SYMBOL),
        }
    }

    fn update(&self, symbol_point: SlotSymbolPoint) {
        self.symbol.store(symbol_point.system_symbol() as u64, Ordering::Release);
    }

    fn current(&self) -> Option<SlotSymbolPoint> {
        match self.symbol.load(Ordering::Acquire) {
            NO_OTA_SYMBOL => None,
            count => Some(SlotSymbolPoint::from_symbol_count(
                self.numerology,
                count,
                self.nof_symbols_per_slot,
            )),
        }
    }
}

/// Transmit window checker
///
/// A slot is late when fewer than `nof_symbols_before_ota` symbols remain
/// between the current OTA symbol and the slot's first symbol, and early when
/// the slot lies more than `max_advance_symbols` ahead of OTA.
pub struct TxWindowChecker {
    nof_symbols_before_ota: u32,
    max_advance_symbols: u32,
    ota: OtaTracker,
    nof_late: AtomicU64,
}

impl TxWindowChecker {
    pub fn new(
        nof_symbols_before_ota: u32,
        max_advance_symbols: u32,
        scs: SubcarrierSpacing,
        cp: CyclicPrefix,
    ) -> Self {
        assert!(
            max_advance_symbols >= nof_symbols_before_ota,
            "Look-ahead horizon ({}) shorter than the required advance ({})",
            max_advance_symbols,
            nof_symbols_before_ota
        );
        Self {
            nof_symbols_before_ota,
            max_advance_symbols,
            ota: OtaTracker::new(scs, cp),
            nof_late: AtomicU64::new(0),
        }
    }

    /// Symbols a downlink slot must be ready before OTA
    ///
    /// `floor(processing_time / symbol_duration) + sym_cp_dl_end`, and at
    /// least one symbol beyond the last point at which the message
    /// transmitter still picks up the slot's first symbol.
    pub fn nof_symbols_before_ota(
        processing_time: Duration,
        tx_params: &TxWindowTimingParameters,
        scs: SubcarrierSpacing,
        cp: CyclicPrefix,
    ) -> u32 {
        let last_transmission = tx_params.sym_cp_dl_end.max(tx_params.sym_up_dl_end);
        (duration_to_symbols_floor(processing_time, scs, cp) + tx_params.sym_cp_dl_end).max(last_transmission + 1)
    }

    /// Symbols an uplink request must be made before OTA
    ///
    /// `floor(processing_time / symbol_duration) + sym_cp_ul_end`, and at
    /// least one symbol beyond the last uplink C-Plane transmission point.
    pub fn nof_symbols_before_ota_ul(
        processing_time: Duration,
        tx_params: &TxWindowTimingParameters,
        scs: SubcarrierSpacing,
        cp: CyclicPrefix,
    ) -> u32 {
        (duration_to_symbols_floor(processing_time, scs, cp) + tx_params.sym_cp_ul_end).max(tx_params.sym_cp_ul_end + 1)
    }

    /// Default look-ahead horizon: one radio frame
    pub fn default_max_advance(scs: SubcarrierSpacing, cp: CyclicPrefix) -> u32 {
        common::time::slots_per_frame(scs) * cp.nof_symbols_per_slot()
    }

    /// Symbols from the current OTA symbol to the first symbol of `slot`
    fn distance(&self, slot: SlotPoint) -> Option<i32> {
        let ota = self.ota.current()?;
        let start = SlotSymbolPoint::new(slot, 0, self.ota.nof_symbols_per_slot);
        Some(start - ota)
    }

    /// Whether `slot` can no longer be transmitted on time
    pub fn is_late(&self, slot: SlotPoint) -> bool {
        let Some(distance) = self.distance(slot) else {
            return false;
        };

        if distance < self.nof_symbols_before_ota as i32 {
            self.nof_late.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Late slot {}: {} symbols before OTA, {} required",
                slot, distance, self.nof_symbols_before_ota
            );
            return true;
        }
        false
    }

    /// Whether `slot` lies beyond the look-ahead horizon
    pub fn is_early(&self, slot: SlotPoint) -> bool {
        self.distance(slot)
            .is_some_and(|distance| distance > self.max_advance_symbols as i32)
    }

    /// Slots rejected as late so far
    pub fn nof_late(&self) -> u64 {
        self.nof_late.load(Ordering::Relaxed)
    }

    /// Last OTA symbol seen, if any
    pub fn ota_symbol(&self) -> Option<SlotSymbolPoint> {
        self.ota.current()
    }
}

impl OtaSymbolBoundaryNotifier for TxWindowChecker {
    fn on_new_symbol(&self, symbol_point: SlotSymbolPoint) {
        self.ota.update(symbol_point);
    }
}

/// Reception window statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxWindowStats {
    pub on_time: u64,
    pub early: u64,
    pub late: u64,
}

/// Receive window checker
///
/// A packet for symbol `P` is on time when
/// `P + sym_start <= OTA <= P + sym_end`.
pub struct RxWindowChecker {
    params: RxWindowTimingParameters,
    ota: OtaTracker,
    on_time: AtomicU64,
    early: AtomicU64,
    late: AtomicU64,
}

impl RxWindowChecker {
    pub fn new(params: RxWindowTimingParameters, scs: SubcarrierSpacing, cp: CyclicPrefix) -> Self {
        assert!(
            params.sym_start <= params.sym_end,
            "Invalid reception window [{}, {}]",
            params.sym_start,
            params.sym_end
        );
        Self {
            params,
            ota: OtaTracker::new(scs, cp),
            on_time: AtomicU64::new(0),
            early: AtomicU64::new(0),
            late: AtomicU64::new(0),
        }
    }

    pub fn params(&self) -> RxWindowTimingParameters {
        self.params
    }

    /// Classify a received symbol and update the statistics
    ///
    /// Returns true when the symbol arrived inside the reception window.
    pub fn update_rx_window_statistics(&self, symbol_point: SlotSymbolPoint) -> bool {
        let Some(ota) = self.ota.current() else {
            self.on_time.fetch_add(1, Ordering::Relaxed);
            return true;
        };

        let elapsed = ota - symbol_point;
        if elapsed < self.params.sym_start as i32 {
            self.early.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        if elapsed > self.params.sym_end as i32 {
            self.late.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.on_time.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub fn stats(&self) -> RxWindowStats {
        RxWindowStats {
            on_time: self.on_time.load(Ordering::Relaxed),
            early: self.early.load(Ordering::Relaxed),
            late: self.late.load(Ordering::Relaxed),
        }
    }

    /// Last OTA symbol seen, if any
    pub fn ota_symbol(&self) -> Option<SlotSymbolPoint> {
        self.ota.current()
    }
}

impl OtaSymbolBoundaryNotifier for RxWindowChecker {
    fn on_new_symbol(&self, symbol_point: SlotSymbolPoint) {
        self.ota.update(symbol_point);
    }
}
