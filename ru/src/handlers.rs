//! Sector dispatch of the Radio Unit plane handlers

use crate::{RuDownlinkPlaneHandler, RuUplinkPlaneHandler};
use common::types::SectorId;
use ofh::{ResourceGridContext, ResourceGridReader, Sector, SharedResourceGrid};
use std::sync::Arc;
use tracing::warn;

fn find_sector(sectors: &[Sector], sector_id: SectorId) -> Option<&Sector> {
    sectors.iter().find(|sector| sector.sector_id() == sector_id)
}

/// Routes downlink grids to the sector named in their context
pub struct RuDownlinkPlaneHandlerProxy {
    sectors: Arc<[Sector]>,
}

impl RuDownlinkPlaneHandlerProxy {
    pub fn new(sectors: Arc<[Sector]>) -> Self {
        Self { sectors }
    }
}

impl RuDownlinkPlaneHandler for RuDownlinkPlaneHandlerProxy {
    fn handle_dl_data(&self, context: &ResourceGridContext, grid: &dyn ResourceGridReader) {
        match find_sector(&self.sectors, context.sector) {
            Some(sector) => sector.get_transmitter().get_downlink_handler().handle_dl_data(context, grid),
            None => warn!(
                "Downlink grid for slot {} names unknown sector {}",
                context.slot, context.sector
            ),
        }
    }
}

/// Routes uplink requests to the sector named in their context
pub struct RuUplinkPlaneHandlerProxy {
    sectors: Arc<[Sector]>,
}

impl RuUplinkPlaneHandlerProxy {
    pub fn new(sectors: Arc<[Sector]>) -> Self {
        Self { sectors }
    }
}

impl RuUplinkPlaneHandler for RuUplinkPlaneHandlerProxy {
    fn handle_new_uplink_slot(&self, context: &ResourceGridContext, grid: SharedResourceGrid) {
        match find_sector(&self.sectors, context.sector) {
            Some(sector) => sector
                .get_transmitter()
                .get_uplink_request_handler()
                .handle_new_uplink_slot(context, grid),
            None => warn!(
                "Uplink request for slot {} names unknown sector {}",
                context.slot, context.sector
            ),
        }
    }
}
