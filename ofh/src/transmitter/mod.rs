//! Fronthaul Transmitter
//!
//! Per-sector transmit path: the downlink handler and the uplink request
//! handler encode into their frame pools, and the message transmitter sends
//! the pools' contents on the OTA clock.

pub mod data_flow_cplane;
pub mod data_flow_uplane;
pub mod downlink_handler;
pub mod message_transmitter;
pub mod sequence_id;
pub mod uplink_request_handler;

pub use data_flow_cplane::{DataFlowCplane, DataFlowCplaneImpl, DataFlowCplaneType1Context};
pub use data_flow_uplane::{DataFlowUplane, DataFlowUplaneConfig, DataFlowUplaneImpl, DataFlowUplaneResourceGridContext};
pub use downlink_handler::{DownlinkHandler, DownlinkHandlerBroadcast, DownlinkHandlerConfig, DownlinkHandlerDependencies};
pub use message_transmitter::{MessageTransmitter, TransmissionSource, TransmissionWindow};
pub use uplink_request_handler::{
    UplinkRequestHandler, UplinkRequestHandlerConfig, UplinkRequestHandlerDependencies, UplinkRequestHandlerImpl,
};

use crate::frame_pool::{FramePool, FramePoolConfig, FramePoolStats, Plane};
use crate::notifier::ErrorNotifier;
use crate::receiver::UplinkContextRepository;
use crate::serdes::ethernet::EthernetHeader;
use crate::timing::OtaSymbolBoundaryNotifier;
use crate::window::{TxWindowChecker, TxWindowTimingParameters};
use common::types::{CyclicPrefix, Eaxc, SectorId, SubcarrierSpacing};
use common::{SlotSymbolPoint, TddUlDlConfig};
use interfaces::EthernetGateway;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Transmitter configuration
#[derive(Debug, Clone)]
pub struct TransmitterConfig {
    pub sector: SectorId,
    pub scs: SubcarrierSpacing,
    pub cp: CyclicPrefix,
    pub tdd_config: Option<TddUlDlConfig>,
    pub dl_eaxc: Vec<Eaxc>,
    pub ul_eaxc: Vec<Eaxc>,
    pub nof_prb: u16,
    pub eth_header: EthernetHeader,
    pub iq_scaling: f32,
    pub mtu: usize,
    pub tx_timing: TxWindowTimingParameters,
    /// Time the downlink path needs between accepting a grid and sending it
    pub dl_processing_time: Duration,
    /// Time the uplink request path needs between accepting a request and sending it
    pub ul_processing_time: Duration,
    /// Look-ahead horizon of the downlink window checker, in symbols
    pub max_advance_symbols: u32,
    pub frame_pool: FramePoolConfig,
}

/// Transmitter dependencies
pub struct TransmitterDependencies {
    pub gateway: Arc<dyn EthernetGateway>,
    pub error_notifier: Arc<dyn ErrorNotifier>,
    pub ul_context_repository: Arc<UplinkContextRepository>,
}

/// Fans one OTA symbol out to the transmitter's listeners
///
/// Window checkers are updated before the message transmitter runs.
struct TransmitterOtaNotifier {
    notifiers: Vec<Arc<dyn OtaSymbolBoundaryNotifier>>,
}

impl OtaSymbolBoundaryNotifier for TransmitterOtaNotifier {
    fn on_new_symbol(&self, symbol_point: SlotSymbolPoint) {
        for notifier in &self.notifiers {
            notifier.on_new_symbol(symbol_point);
        }
    }
}

/// Per-sector transmitter
pub struct Transmitter {
    downlink_handler: DownlinkHandlerBroadcast,
    uplink_request_handler: UplinkRequestHandlerImpl,
    dl_window_checker: Arc<TxWindowChecker>,
    ul_window_checker: Arc<TxWindowChecker>,
    dl_frame_pool: Arc<FramePool>,
    ul_frame_pool: Arc<FramePool>,
    message_transmitter: Arc<MessageTransmitter>,
    ota_notifier: Arc<TransmitterOtaNotifier>,
}

impl Transmitter {
    pub fn new(config: TransmitterConfig, dependencies: TransmitterDependencies) -> Self {
        let nof_symbols_before_ota_dl =
            TxWindowChecker::nof_symbols_before_ota(config.dl_processing_time, &config.tx_timing, config.scs, config.cp);
        let nof_symbols_before_ota_ul = TxWindowChecker::nof_symbols_before_ota_ul(
            config.ul_processing_time,
            &config.tx_timing,
            config.scs,
            config.cp,
        );

        let dl_window_checker = Arc::new(TxWindowChecker::new(
            nof_symbols_before_ota_dl,
            config.max_advance_symbols,
            config.scs,
            config.cp,
        ));
        let ul_window_checker = Arc::new(TxWindowChecker::new(
            nof_symbols_before_ota_ul,
            config.max_advance_symbols.max(nof_symbols_before_ota_ul),
            config.scs,
            config.cp,
        ));

        // Separate pools, so a new downlink grid never clears uplink requests of the same slot.
        let dl_frame_pool = Arc::new(FramePool::new(config.frame_pool));
        let ul_frame_pool = Arc::new(FramePool::new(config.frame_pool));

        let downlink_handler = DownlinkHandlerBroadcast::new(
            DownlinkHandlerConfig {
                cp: config.cp,
                tdd_config: config.tdd_config,
                dl_eaxc: config.dl_eaxc.clone(),
            },
            DownlinkHandlerDependencies {
                window_checker: dl_window_checker.clone(),
                frame_pool: dl_frame_pool.clone(),
                data_flow_cplane: Box::new(DataFlowCplaneImpl::new(
                    dl_frame_pool.clone(),
                    config.eth_header,
                    config.nof_prb,
                    &config.dl_eaxc,
                )),
                data_flow_uplane: Box::new(DataFlowUplaneImpl::new(
                    dl_frame_pool.clone(),
                    DataFlowUplaneConfig {
                        eth_header: config.eth_header,
                        nof_prb: config.nof_prb,
                        iq_scaling: config.iq_scaling,
                        mtu: config.mtu,
                    },
                    &config.dl_eaxc,
                )),
                error_notifier: dependencies.error_notifier.clone(),
            },
        );

        let uplink_request_handler = UplinkRequestHandlerImpl::new(
            UplinkRequestHandlerConfig {
                cp: config.cp,
                tdd_config: config.tdd_config,
                ul_eaxc: config.ul_eaxc.clone(),
            },
            UplinkRequestHandlerDependencies {
                window_checker: ul_window_checker.clone(),
                frame_pool: ul_frame_pool.clone(),
                data_flow_cplane: Box::new(DataFlowCplaneImpl::new(
                    ul_frame_pool.clone(),
                    config.eth_header,
                    config.nof_prb,
                    &config.ul_eaxc,
                )),
                ul_context_repository: dependencies.ul_context_repository,
                error_notifier: dependencies.error_notifier,
            },
        );

        let timing = &config.tx_timing;
        let message_transmitter = Arc::new(MessageTransmitter::new(
            vec![
                TransmissionSource {
                    frame_pool: dl_frame_pool.clone(),
                    plane: Plane::Control,
                    window: TransmissionWindow::new(timing.sym_cp_dl_start, timing.sym_cp_dl_end),
                },
                TransmissionSource {
                    frame_pool: dl_frame_pool.clone(),
                    plane: Plane::User,
                    window: TransmissionWindow::new(timing.sym_up_dl_start, timing.sym_up_dl_end),
                },
                TransmissionSource {
                    frame_pool: ul_frame_pool.clone(),
                    plane: Plane::Control,
                    window: TransmissionWindow::new(timing.sym_cp_ul_start, timing.sym_cp_ul_end),
                },
            ],
            dependencies.gateway,
        ));

        let ota_notifier = Arc::new(TransmitterOtaNotifier {
            notifiers: vec![
                dl_window_checker.clone() as Arc<dyn OtaSymbolBoundaryNotifier>,
                ul_window_checker.clone(),
                message_transmitter.clone(),
            ],
        });

        debug!(
            "Sector {}: transmitter ready, downlink needs {} symbols before OTA, uplink requests {}, last send {} symbols before OTA",
            config.sector,
            nof_symbols_before_ota_dl,
            nof_symbols_before_ota_ul,
            message_transmitter.last_transmission_point()
        );

        Self {
            downlink_handler,
            uplink_request_handler,
            dl_window_checker,
            ul_window_checker,
            dl_frame_pool,
            ul_frame_pool,
            message_transmitter,
            ota_notifier,
        }
    }

    pub fn get_downlink_handler(&self) -> &dyn DownlinkHandler {
        &self.downlink_handler
    }

    pub fn get_uplink_request_handler(&self) -> &dyn UplinkRequestHandler {
        &self.uplink_request_handler
    }

    /// OTA listener to subscribe to the timing manager
    pub fn get_ota_symbol_boundary_notifier(&self) -> Arc<dyn OtaSymbolBoundaryNotifier> {
        self.ota_notifier.clone()
    }

    pub fn dl_window_checker(&self) -> &TxWindowChecker {
        &self.dl_window_checker
    }

    pub fn ul_window_checker(&self) -> &TxWindowChecker {
        &self.ul_window_checker
    }

    /// Pool holding the downlink C-Plane and U-Plane frames
    pub fn dl_frame_pool(&self) -> &FramePool {
        &self.dl_frame_pool
    }

    /// Pool holding the uplink C-Plane frames
    pub fn ul_frame_pool(&self) -> &FramePool {
        &self.ul_frame_pool
    }

    pub fn frame_pool_stats(&self) -> (FramePoolStats, FramePoolStats) {
        (self.dl_frame_pool.stats(), self.ul_frame_pool.stats())
    }

    pub fn frames_sent(&self) -> u64 {
        self.message_transmitter.frames_sent()
    }
}
