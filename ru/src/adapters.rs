//! Open Fronthaul to Radio Unit adapters

use crate::{RuErrorContext, RuErrorNotifier, RuTimingNotifier};
use common::SlotSymbolPoint;
use ofh::{ErrorContext, ErrorNotifier, OtaSymbolBoundaryNotifier};
use std::sync::Arc;
use tracing::trace;

/// Turns OTA symbol boundaries into slot timing events
///
/// TTI boundaries are reported on symbol 0, shifted forward by the DU-RU slot
/// offset so the layers above work ahead of the air interface. Uplink half
/// and full slot boundaries are reported on the last symbol of each half.
pub struct RuOfhTimingNotifier {
    nof_slot_offset_du_ru: u32,
    half_slot_symbol: u32,
    full_slot_symbol: u32,
    notifier: Arc<dyn RuTimingNotifier>,
}

impl RuOfhTimingNotifier {
    pub fn new(nof_slot_offset_du_ru: u32, nof_symbols_per_slot: u32, notifier: Arc<dyn RuTimingNotifier>) -> Self {
        assert!(nof_symbols_per_slot >= 2, "Invalid number of symbols per slot {}", nof_symbols_per_slot);

        Self {
            nof_slot_offset_du_ru,
            half_slot_symbol: nof_symbols_per_slot / 2 - 1,
            full_slot_symbol: nof_symbols_per_slot - 1,
            notifier,
        }
    }
}

impl OtaSymbolBoundaryNotifier for RuOfhTimingNotifier {
    fn on_new_symbol(&self, symbol_point: SlotSymbolPoint) {
        let symbol = symbol_point.symbol_index();
        let slot = symbol_point.slot();

        if symbol == 0 {
            let tti = slot + self.nof_slot_offset_du_ru as i32;
            trace!("TTI boundary {} at OTA slot {}", tti, slot);
            self.notifier.on_tti_boundary(tti);
        }
        if symbol == self.half_slot_symbol {
            self.notifier.on_ul_half_slot_boundary(slot);
        }
        if symbol == self.full_slot_symbol {
            self.notifier.on_ul_full_slot_boundary(slot);
        }
    }
}

/// Forwards sector error events to the Radio Unit error notifier
pub struct RuOfhErrorHandler {
    notifier: Arc<dyn RuErrorNotifier>,
}

impl RuOfhErrorHandler {
    pub fn new(notifier: Arc<dyn RuErrorNotifier>) -> Self {
        Self { notifier }
    }
}

impl ErrorNotifier for RuOfhErrorHandler {
    fn on_late_downlink_message(&self, context: &ErrorContext) {
        self.notifier.on_late_downlink_message(&RuErrorContext {
            slot: context.slot,
            sector: context.sector,
        });
    }

    fn on_late_uplink_message(&self, context: &ErrorContext) {
        self.notifier.on_late_uplink_message(&RuErrorContext {
            slot: context.slot,
            sector: context.sector,
        });
    }
}
