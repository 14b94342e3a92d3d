//! Open Fronthaul (O-RAN 7.2x) Pipeline Library
//!
//! This crate implements the real-time fronthaul pipeline of the gNB: it turns
//! downlink resource grids into Control-Plane and User-Plane Ethernet frames
//! ahead of the over-the-air (OTA) deadline, and writes received uplink
//! User-Plane frames back into resource grids.

pub mod frame_pool;
pub mod notifier;
pub mod receiver;
pub mod resource_grid;
pub mod sector;
pub mod serdes;
pub mod timing;
pub mod transmitter;
pub mod window;

pub use frame_pool::{FrameKey, FramePool, FramePoolConfig, FramePoolStats, Plane, PooledFrame};
pub use notifier::{ErrorContext, ErrorNotifier, ErrorNotifierProxy, UplinkRxSymbolContext, UplinkSymbolNotifier};
pub use resource_grid::{
    ResourceGrid, ResourceGridContext, ResourceGridReader, ResourceGridWriter, SharedResourceGrid,
};
pub use sector::{create_sector, Sector, SectorConfig, SectorDependencies};
pub use serdes::{DataDirection, FilterIndex};
pub use timing::{
    Controller, OtaSymbolBoundaryNotifier, OtaSymbolBoundaryNotifierManager, RealtimeTimingConfig,
    RealtimeTimingWorker, TimingManager,
};
pub use window::{RxWindowChecker, RxWindowTimingParameters, TxWindowChecker, TxWindowTimingParameters};

use thiserror::Error;

/// Number of subcarriers in one physical resource block
pub const NOF_SUBCARRIERS_PER_RB: usize = 12;

/// Errors of the fronthaul pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OfhError {
    #[error("Truncated {what}: need {needed} bytes, got {available}")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("Unexpected EtherType 0x{0:04x}")]
    UnexpectedEtherType(u16),

    #[error("Unsupported eCPRI revision {0}")]
    UnsupportedEcpriRevision(u8),

    #[error("Unsupported eCPRI message type {0}")]
    UnsupportedMessageType(u8),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Frame pool exhausted")]
    PoolExhausted,
}
