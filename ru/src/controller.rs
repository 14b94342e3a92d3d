//! Radio Unit controller

use crate::RuController;
use ofh::{Sector, TimingManager};
use std::sync::Arc;
use tracing::info;

/// Starts the sectors before the OTA clock and stops the clock first
///
/// Every sector is ready to receive and transmit by the time the first
/// symbol boundary is notified, and no boundary is notified to a sector that
/// is shutting down.
pub struct RuOfhController {
    timing_manager: Arc<dyn TimingManager>,
    sectors: Arc<[Sector]>,
}

impl RuOfhController {
    pub fn new(timing_manager: Arc<dyn TimingManager>, sectors: Arc<[Sector]>) -> Self {
        Self {
            timing_manager,
            sectors,
        }
    }
}

impl RuController for RuOfhController {
    fn start(&self) {
        for sector in self.sectors.iter() {
            sector.get_controller().start();
        }
        self.timing_manager.get_controller().start();
        info!("Radio Unit started with {} sectors", self.sectors.len());
    }

    fn stop(&self) {
        self.timing_manager.get_controller().stop();
        for sector in self.sectors.iter() {
            sector.get_controller().stop();
        }
        info!("Radio Unit stopped");
    }
}
