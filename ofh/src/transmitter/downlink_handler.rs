//! Downlink Handler
//!
//! Entry point of a downlink resource grid into the fronthaul pipeline. The
//! same grid is broadcast to every downlink eAxC of the sector.

use super::data_flow_cplane::{DataFlowCplane, DataFlowCplaneType1Context};
use super::data_flow_uplane::{DataFlowUplane, DataFlowUplaneResourceGridContext};
use crate::frame_pool::FramePool;
use crate::notifier::{ErrorContext, ErrorNotifier};
use crate::resource_grid::{ResourceGridContext, ResourceGridReader};
use crate::serdes::{DataDirection, FilterIndex};
use crate::window::TxWindowChecker;
use common::types::{CyclicPrefix, Eaxc};
use common::{OfdmSymbolRange, TddUlDlConfig};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Accepts downlink resource grids from the layers above
pub trait DownlinkHandler: Send + Sync {
    /// Encode the grid of `context.slot` for transmission
    fn handle_dl_data(&self, context: &ResourceGridContext, grid: &dyn ResourceGridReader);
}

/// Downlink handler configuration
#[derive(Debug, Clone)]
pub struct DownlinkHandlerConfig {
    pub cp: CyclicPrefix,
    pub tdd_config: Option<TddUlDlConfig>,
    /// Downlink eAxCs, in transmission order
    pub dl_eaxc: Vec<Eaxc>,
}

/// Downlink handler dependencies
pub struct DownlinkHandlerDependencies {
    pub window_checker: Arc<TxWindowChecker>,
    pub frame_pool: Arc<FramePool>,
    pub data_flow_cplane: Box<dyn DataFlowCplane>,
    pub data_flow_uplane: Box<dyn DataFlowUplane>,
    pub error_notifier: Arc<dyn ErrorNotifier>,
}

/// Downlink handler sending the same grid port to every downlink eAxC
pub struct DownlinkHandlerBroadcast {
    config: DownlinkHandlerConfig,
    window_checker: Arc<TxWindowChecker>,
    frame_pool: Arc<FramePool>,
    data_flow_cplane: Box<dyn DataFlowCplane>,
    data_flow_uplane: Box<dyn DataFlowUplane>,
    error_notifier: Arc<dyn ErrorNotifier>,
}

impl DownlinkHandlerBroadcast {
    pub fn new(config: DownlinkHandlerConfig, dependencies: DownlinkHandlerDependencies) -> Self {
        assert!(!config.dl_eaxc.is_empty(), "Downlink handler requires at least one eAxC");

        Self {
            config,
            window_checker: dependencies.window_checker,
            frame_pool: dependencies.frame_pool,
            data_flow_cplane: dependencies.data_flow_cplane,
            data_flow_uplane: dependencies.data_flow_uplane,
            error_notifier: dependencies.error_notifier,
        }
    }

    fn active_symbols(&self, context: &ResourceGridContext, grid: &dyn ResourceGridReader) -> OfdmSymbolRange {
        if let Some(tdd) = &self.config.tdd_config {
            return tdd.active_dl_symbols(context.slot.slot_index(), self.config.cp);
        }

        let nof_symbols_per_slot = self.config.cp.nof_symbols_per_slot();
        if grid.nof_symbols() as u32 > nof_symbols_per_slot {
            warn!(
                "Sector {}: grid of slot {} has {} symbols, sending the first {}",
                context.sector,
                context.slot,
                grid.nof_symbols(),
                nof_symbols_per_slot
            );
        }
        OfdmSymbolRange::new(0, (grid.nof_symbols() as u32).min(nof_symbols_per_slot))
    }
}

impl DownlinkHandler for DownlinkHandlerBroadcast {
    fn handle_dl_data(&self, context: &ResourceGridContext, grid: &dyn ResourceGridReader) {
        // Whatever was enqueued for this slot before is stale from now on.
        self.frame_pool.clear_slot(context.slot);

        if self.window_checker.is_late(context.slot) {
            debug!("Sector {}: dropping late downlink slot {}", context.sector, context.slot);
            self.error_notifier.on_late_downlink_message(&ErrorContext {
                slot: context.slot,
                sector: context.sector,
            });
            return;
        }

        if self.window_checker.is_early(context.slot) {
            warn!(
                "Sector {}: dropping downlink slot {} beyond the look-ahead horizon",
                context.sector, context.slot
            );
            return;
        }

        let symbol_range = self.active_symbols(context, grid);
        if symbol_range.is_empty() {
            trace!("Sector {}: no downlink symbols in slot {}", context.sector, context.slot);
            return;
        }

        for eaxc in &self.config.dl_eaxc {
            self.data_flow_cplane.enqueue_section_type_1_message(&DataFlowCplaneType1Context {
                slot: context.slot,
                eaxc: *eaxc,
                direction: DataDirection::Downlink,
                filter_type: FilterIndex::StandardChannelFilter,
                symbol_range,
            });

            self.data_flow_uplane.enqueue_section_type_1_message(
                &DataFlowUplaneResourceGridContext {
                    slot: context.slot,
                    sector: context.sector,
                    eaxc: *eaxc,
                    port: 0,
                    symbol_range,
                },
                grid,
            );
        }
    }
}
