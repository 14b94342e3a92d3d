//! Pipeline Event Notifiers
//!
//! Events the layers above must observe (late data, received uplink symbols)
//! are delivered through these injected notifiers.

use crate::resource_grid::ResourceGridReader;
use common::types::SectorId;
use common::SlotPoint;
use parking_lot::RwLock;
use std::sync::Arc;

/// Slot and sector of a dropped message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorContext {
    pub slot: SlotPoint,
    pub sector: SectorId,
}

/// Receives timing errors detected by the pipeline
pub trait ErrorNotifier: Send + Sync {
    /// A downlink resource grid arrived too late to be transmitted
    fn on_late_downlink_message(&self, context: &ErrorContext);

    /// An uplink request arrived too late to be transmitted
    fn on_late_uplink_message(&self, context: &ErrorContext);
}

/// Error notifier that discards every event
#[derive(Debug, Default)]
pub struct NullErrorNotifier;

impl ErrorNotifier for NullErrorNotifier {
    fn on_late_downlink_message(&self, _context: &ErrorContext) {}

    fn on_late_uplink_message(&self, _context: &ErrorContext) {}
}

/// Error notifier that can be rebound after the sector is built
pub struct ErrorNotifierProxy {
    inner: RwLock<Arc<dyn ErrorNotifier>>,
}

impl ErrorNotifierProxy {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Arc::new(NullErrorNotifier)),
        }
    }

    /// Route subsequent events to `notifier`
    pub fn set_error_notifier(&self, notifier: Arc<dyn ErrorNotifier>) {
        *self.inner.write() = notifier;
    }
}

impl Default for ErrorNotifierProxy {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorNotifier for ErrorNotifierProxy {
    fn on_late_downlink_message(&self, context: &ErrorContext) {
        self.inner.read().on_late_downlink_message(context);
    }

    fn on_late_uplink_message(&self, context: &ErrorContext) {
        self.inner.read().on_late_uplink_message(context);
    }
}

/// Identifies one fully received uplink OFDM symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UplinkRxSymbolContext {
    pub slot: SlotPoint,
    pub sector: SectorId,
    pub symbol: u32,
}

/// Receives uplink symbols once every uplink eAxC has delivered them
pub trait UplinkSymbolNotifier: Send + Sync {
    fn on_new_uplink_symbol(&self, context: &UplinkRxSymbolContext, grid: &dyn ResourceGridReader);
}
