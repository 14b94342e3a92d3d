//! Radio Unit Library
//!
//! This crate exposes the Open Fronthaul sectors of a cell site as a single
//! Radio Unit: one downlink plane handler, one uplink plane handler and one
//! controller, all backed by a shared OTA timing source.

pub mod adapters;
pub mod controller;
pub mod handlers;
pub mod ru_ofh;

pub use adapters::{RuOfhErrorHandler, RuOfhTimingNotifier};
pub use controller::RuOfhController;
pub use handlers::{RuDownlinkPlaneHandlerProxy, RuUplinkPlaneHandlerProxy};
pub use ru_ofh::{RuOfh, RuOfhConfig, RuOfhDependencies};

use common::types::SectorId;
use common::SlotPoint;
use ofh::{ResourceGridContext, ResourceGridReader, SharedResourceGrid};

/// Downlink data entry point of the Radio Unit
pub trait RuDownlinkPlaneHandler: Send + Sync {
    /// Transmit the downlink grid of `context.slot` on sector `context.sector`
    fn handle_dl_data(&self, context: &ResourceGridContext, grid: &dyn ResourceGridReader);
}

/// Uplink request entry point of the Radio Unit
pub trait RuUplinkPlaneHandler: Send + Sync {
    /// Request the uplink data of `context.slot`, to be written into `grid`
    fn handle_new_uplink_slot(&self, context: &ResourceGridContext, grid: SharedResourceGrid);
}

/// Starts and stops the Radio Unit
pub trait RuController: Send + Sync {
    fn start(&self);

    fn stop(&self);
}

/// Slot timing events delivered to the layers above the Radio Unit
pub trait RuTimingNotifier: Send + Sync {
    /// A new TTI begins; `slot` already includes the DU-RU slot offset
    fn on_tti_boundary(&self, slot: SlotPoint);

    /// The first half of the uplink slot is over the air
    fn on_ul_half_slot_boundary(&self, slot: SlotPoint);

    /// The whole uplink slot is over the air
    fn on_ul_full_slot_boundary(&self, slot: SlotPoint);
}

/// Slot and sector of a Radio Unit error event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuErrorContext {
    pub slot: SlotPoint,
    pub sector: SectorId,
}

/// Error events of the Radio Unit
pub trait RuErrorNotifier: Send + Sync {
    fn on_late_downlink_message(&self, context: &RuErrorContext);

    fn on_late_uplink_message(&self, context: &RuErrorContext);
}

/// A Radio Unit as seen by the scheduler
pub trait RadioUnit: Send + Sync {
    fn get_controller(&self) -> &dyn RuController;

    fn get_downlink_plane_handler(&self) -> &dyn RuDownlinkPlaneHandler;

    fn get_uplink_plane_handler(&self) -> &dyn RuUplinkPlaneHandler;
}
