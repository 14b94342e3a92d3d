//! Uplink Request Handler
//!
//! Asks the RU for the uplink symbols of a slot by sending uplink C-Plane
//! messages, and registers the grid the receiver writes the data into.

use super::data_flow_cplane::{DataFlowCplane, DataFlowCplaneType1Context};
use crate::frame_pool::FramePool;
use crate::notifier::{ErrorContext, ErrorNotifier};
use crate::receiver::UplinkContextRepository;
use crate::resource_grid::{ResourceGridContext, ResourceGridReader, SharedResourceGrid};
use crate::serdes::{DataDirection, FilterIndex};
use crate::window::TxWindowChecker;
use common::types::{CyclicPrefix, Eaxc};
use common::{OfdmSymbolRange, TddUlDlConfig};
use std::sync::Arc;
use tracing::{debug, trace};

/// Accepts uplink slot requests from the layers above
pub trait UplinkRequestHandler: Send + Sync {
    /// Request the uplink data of `context.slot`, to be written into `grid`
    fn handle_new_uplink_slot(&self, context: &ResourceGridContext, grid: SharedResourceGrid);
}

/// Uplink request handler configuration
#[derive(Debug, Clone)]
pub struct UplinkRequestHandlerConfig {
    pub cp: CyclicPrefix,
    pub tdd_config: Option<TddUlDlConfig>,
    /// Uplink eAxCs, in request order
    pub ul_eaxc: Vec<Eaxc>,
}

/// Uplink request handler dependencies
pub struct UplinkRequestHandlerDependencies {
    pub window_checker: Arc<TxWindowChecker>,
    pub frame_pool: Arc<FramePool>,
    pub data_flow_cplane: Box<dyn DataFlowCplane>,
    pub ul_context_repository: Arc<UplinkContextRepository>,
    pub error_notifier: Arc<dyn ErrorNotifier>,
}

/// Uplink request handler implementation
pub struct UplinkRequestHandlerImpl {
    config: UplinkRequestHandlerConfig,
    window_checker: Arc<TxWindowChecker>,
    frame_pool: Arc<FramePool>,
    data_flow_cplane: Box<dyn DataFlowCplane>,
    ul_context_repository: Arc<UplinkContextRepository>,
    error_notifier: Arc<dyn ErrorNotifier>,
}

impl UplinkRequestHandlerImpl {
    pub fn new(config: UplinkRequestHandlerConfig, dependencies: UplinkRequestHandlerDependencies) -> Self {
        assert!(!config.ul_eaxc.is_empty(), "Uplink request handler requires at least one eAxC");

        Self {
            config,
            window_checker: dependencies.window_checker,
            frame_pool: dependencies.frame_pool,
            data_flow_cplane: dependencies.data_flow_cplane,
            ul_context_repository: dependencies.ul_context_repository,
            error_notifier: dependencies.error_notifier,
        }
    }
}

impl UplinkRequestHandler for UplinkRequestHandlerImpl {
    fn handle_new_uplink_slot(&self, context: &ResourceGridContext, grid: SharedResourceGrid) {
        self.frame_pool.clear_slot(context.slot);

        if self.window_checker.is_late(context.slot) {
            debug!("Sector {}: dropping late uplink request for slot {}", context.sector, context.slot);
            self.error_notifier.on_late_uplink_message(&ErrorContext {
                slot: context.slot,
                sector: context.sector,
            });
            return;
        }

        let symbol_range = match &self.config.tdd_config {
            Some(tdd) => tdd.active_ul_symbols(context.slot.slot_index(), self.config.cp),
            None => {
                let nof_symbols = ResourceGridReader::nof_symbols(&*grid.lock()) as u32;
                OfdmSymbolRange::new(0, nof_symbols.min(self.config.cp.nof_symbols_per_slot()))
            }
        };
        if symbol_range.is_empty() {
            trace!("Sector {}: no uplink symbols in slot {}", context.sector, context.slot);
            return;
        }

        self.ul_context_repository
            .add(context.slot, context.sector, grid, symbol_range);

        for eaxc in &self.config.ul_eaxc {
            self.data_flow_cplane.enqueue_section_type_1_message(&DataFlowCplaneType1Context {
                slot: context.slot,
                eaxc: *eaxc,
                direction: DataDirection::Uplink,
                filter_type: FilterIndex::StandardChannelFilter,
                symbol_range,
            });
        }
    }
}
