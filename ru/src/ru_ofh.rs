//! Open Fronthaul Radio Unit
//!
//! `RuOfh` owns every sector of the cell site and a shared handle to the
//! OTA timing manager. At construction it binds the sectors' error events to
//! the Radio Unit error notifier and registers, in this order, the timing
//! adapter and each sector's transmitter and receiver with the timing
//! manager.

use crate::adapters::{RuOfhErrorHandler, RuOfhTimingNotifier};
use crate::controller::RuOfhController;
use crate::handlers::{RuDownlinkPlaneHandlerProxy, RuUplinkPlaneHandlerProxy};
use crate::{RadioUnit, RuController, RuDownlinkPlaneHandler, RuErrorNotifier, RuTimingNotifier, RuUplinkPlaneHandler};
use common::types::SectorId;
use ofh::{ErrorNotifier, OtaSymbolBoundaryNotifier, Sector, TimingManager};
use std::sync::Arc;
use tracing::info;

/// Radio Unit configuration
#[derive(Debug, Clone, Copy)]
pub struct RuOfhConfig {
    /// Slots the TTI boundary runs ahead of the air interface
    pub nof_slot_offset_du_ru: u32,
    pub nof_symbols_per_slot: u32,
}

/// Radio Unit dependencies
pub struct RuOfhDependencies {
    pub timing_notifier: Arc<dyn RuTimingNotifier>,
    pub error_notifier: Arc<dyn RuErrorNotifier>,
    pub sectors: Vec<Sector>,
    pub timing_manager: Arc<dyn TimingManager>,
}

/// Open Fronthaul Radio Unit
pub struct RuOfh {
    sectors: Arc<[Sector]>,
    controller: RuOfhController,
    downlink_handler: RuDownlinkPlaneHandlerProxy,
    uplink_handler: RuUplinkPlaneHandlerProxy,
}

impl RuOfh {
    pub fn new(config: RuOfhConfig, dependencies: RuOfhDependencies) -> Self {
        assert!(!dependencies.sectors.is_empty(), "Radio Unit requires at least one sector");
        for (index, sector) in dependencies.sectors.iter().enumerate() {
            assert!(
                dependencies.sectors[..index]
                    .iter()
                    .all(|other| other.sector_id() != sector.sector_id()),
                "Sector {} configured twice",
                sector.sector_id()
            );
        }

        let sectors: Arc<[Sector]> = dependencies.sectors.into();

        let error_handler: Arc<dyn ErrorNotifier> = Arc::new(RuOfhErrorHandler::new(dependencies.error_notifier));
        let timing_notifier = Arc::new(RuOfhTimingNotifier::new(
            config.nof_slot_offset_du_ru,
            config.nof_symbols_per_slot,
            dependencies.timing_notifier,
        ));

        let mut notifiers: Vec<Arc<dyn OtaSymbolBoundaryNotifier>> = vec![timing_notifier];
        for sector in sectors.iter() {
            notifiers.push(sector.get_transmitter().get_ota_symbol_boundary_notifier());
            notifiers.push(sector.get_receiver_ota_notifier());
            sector.set_error_notifier(error_handler.clone());
        }
        dependencies
            .timing_manager
            .get_ota_symbol_boundary_notifier_manager()
            .subscribe(notifiers);

        info!(
            "Created Open Fronthaul Radio Unit: {} sectors, DU-RU slot offset {}",
            sectors.len(),
            config.nof_slot_offset_du_ru
        );

        Self {
            controller: RuOfhController::new(dependencies.timing_manager, sectors.clone()),
            downlink_handler: RuDownlinkPlaneHandlerProxy::new(sectors.clone()),
            uplink_handler: RuUplinkPlaneHandlerProxy::new(sectors.clone()),
            sectors,
        }
    }

    pub fn nof_sectors(&self) -> usize {
        self.sectors.len()
    }

    /// Sector at `index` in configuration order
    pub fn sector(&self, index: usize) -> Option<&Sector> {
        self.sectors.get(index)
    }

    /// Sector configured with `sector_id`
    pub fn sector_by_id(&self, sector_id: SectorId) -> Option<&Sector> {
        self.sectors.iter().find(|sector| sector.sector_id() == sector_id)
    }
}

impl RadioUnit for RuOfh {
    fn get_controller(&self) -> &dyn RuController {
        &self.controller
    }

    fn get_downlink_plane_handler(&self) -> &dyn RuDownlinkPlaneHandler {
        &self.downlink_handler
    }

    fn get_uplink_plane_handler(&self) -> &dyn RuUplinkPlaneHandler {
        &self.uplink_handler
    }
}
