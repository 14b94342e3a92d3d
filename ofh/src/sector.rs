//! Fronthaul Sector
//!
//! A sector bundles the transmitter and receiver of one cell, together with
//! the controller of its Ethernet receive path. `create_sector` validates the
//! configuration and wires every component.

use crate::frame_pool::{FramePoolConfig, DEFAULT_NOF_SLOTS};
use crate::notifier::{ErrorNotifier, ErrorNotifierProxy, UplinkSymbolNotifier};
use crate::receiver::{Receiver, ReceiverConfig, ReceiverDependencies, UplinkContextRepository};
use crate::serdes::ethernet::{EthernetHeader, MacAddress};
use crate::serdes::uplane::max_prbs_per_frame;
use crate::serdes::ecpri::ECPRI_HEADER_SIZE;
use crate::timing::{Controller, OtaSymbolBoundaryNotifier};
use crate::transmitter::{Transmitter, TransmitterConfig, TransmitterDependencies};
use crate::window::{RxWindowTimingParameters, TxWindowChecker, TxWindowDurations, TxWindowTimingParameters};
use crate::OfhError;
use common::types::{CyclicPrefix, Eaxc, SectorId, SubcarrierSpacing};
use common::TddUlDlConfig;
use interfaces::{EthernetGateway, EthernetReceiver, FrameNotifier};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Largest carrier, in PRBs
pub const MAX_NOF_PRBS: u16 = 275;

/// Sector configuration
#[derive(Debug, Clone)]
pub struct SectorConfig {
    pub sector_id: SectorId,
    pub scs: SubcarrierSpacing,
    pub cp: CyclicPrefix,
    pub tdd_config: Option<TddUlDlConfig>,
    pub dl_eaxc: Vec<Eaxc>,
    pub ul_eaxc: Vec<Eaxc>,
    pub nof_prb: u16,
    pub ru_mac: MacAddress,
    pub du_mac: MacAddress,
    pub vlan_id: Option<u16>,
    pub pcp: u8,
    pub mtu: usize,
    pub iq_scaling: f32,
    pub tx_window: TxWindowDurations,
    pub dl_processing_time: Duration,
    pub ul_processing_time: Duration,
    pub rx_window: RxWindowTimingParameters,
    /// Downlink look-ahead horizon in symbols; one frame when unset
    pub max_advance_symbols: Option<u32>,
    /// Frame buffers of each frame pool
    pub nof_frame_buffers: usize,
}

/// Sector dependencies
pub struct SectorDependencies {
    pub gateway: Arc<dyn EthernetGateway>,
    /// Receive path; a sector without one never receives uplink data
    pub ethernet_receiver: Option<Arc<dyn EthernetReceiver>>,
    pub uplink_notifier: Arc<dyn UplinkSymbolNotifier>,
}

/// Starts and stops the Ethernet receive path of a sector
pub struct SectorController {
    sector_id: SectorId,
    ethernet_receiver: Option<Arc<dyn EthernetReceiver>>,
    receiver: Arc<Receiver>,
}

impl Controller for SectorController {
    fn start(&self) {
        if let Some(ethernet_receiver) = &self.ethernet_receiver {
            match ethernet_receiver.start(self.receiver.clone() as Arc<dyn FrameNotifier>) {
                Ok(()) => info!("Sector {}: receive path started", self.sector_id),
                Err(e) => error!("Sector {}: failed to start the receive path: {}", self.sector_id, e),
            }
        }
    }

    fn stop(&self) {
        if let Some(ethernet_receiver) = &self.ethernet_receiver {
            ethernet_receiver.stop();
            info!("Sector {}: receive path stopped", self.sector_id);
        }
    }
}

/// One fronthaul sector
pub struct Sector {
    sector_id: SectorId,
    transmitter: Transmitter,
    receiver: Arc<Receiver>,
    controller: SectorController,
    error_notifier: Arc<ErrorNotifierProxy>,
}

impl Sector {
    pub fn sector_id(&self) -> SectorId {
        self.sector_id
    }

    pub fn get_transmitter(&self) -> &Transmitter {
        &self.transmitter
    }

    pub fn get_receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// OTA listener of the receive path
    pub fn get_receiver_ota_notifier(&self) -> Arc<dyn OtaSymbolBoundaryNotifier> {
        self.receiver.clone()
    }

    /// Frame sink of the receive path, for callers feeding frames directly
    pub fn get_frame_notifier(&self) -> Arc<dyn FrameNotifier> {
        self.receiver.clone()
    }

    pub fn get_controller(&self) -> &dyn Controller {
        &self.controller
    }

    /// Route late-message events of this sector to `notifier`
    pub fn set_error_notifier(&self, notifier: Arc<dyn ErrorNotifier>) {
        self.error_notifier.set_error_notifier(notifier);
    }
}

fn validate(config: &SectorConfig) -> Result<(), OfhError> {
    let invalid = |msg: String| Err(OfhError::InvalidConfiguration(format!("sector {}: {}", config.sector_id, msg)));

    if config.dl_eaxc.is_empty() {
        return invalid("empty downlink eAxC list".to_string());
    }
    if config.ul_eaxc.is_empty() {
        return invalid("empty uplink eAxC list".to_string());
    }

    let dl: HashSet<Eaxc> = config.dl_eaxc.iter().copied().collect();
    let ul: HashSet<Eaxc> = config.ul_eaxc.iter().copied().collect();
    if dl.len() != config.dl_eaxc.len() || ul.len() != config.ul_eaxc.len() {
        return invalid("duplicated eAxC".to_string());
    }
    if let Some(eaxc) = dl.intersection(&ul).next() {
        return invalid(format!("eAxC {} used for both downlink and uplink", eaxc));
    }

    if config.nof_prb == 0 || config.nof_prb > MAX_NOF_PRBS {
        return invalid(format!("{} PRBs", config.nof_prb));
    }
    if !(config.iq_scaling.is_finite() && config.iq_scaling > 0.0) {
        return invalid(format!("IQ scaling {}", config.iq_scaling));
    }
    if config.pcp > 7 {
        return invalid(format!("priority code point {}", config.pcp));
    }
    if config.vlan_id.is_some_and(|vid| vid > 0x0fff) {
        return invalid("VLAN identifier out of range".to_string());
    }

    let eth_header = EthernetHeader::ecpri(config.ru_mac, config.du_mac, config.vlan_id, config.pcp);
    let header_size = eth_header.size() + ECPRI_HEADER_SIZE;
    if max_prbs_per_frame(config.mtu, header_size) == 0 {
        return invalid(format!("MTU {} cannot carry a single PRB", config.mtu));
    }

    if let Some(tdd) = &config.tdd_config {
        tdd.validate(config.cp)
            .map_err(|e| OfhError::InvalidConfiguration(format!("sector {}: {}", config.sector_id, e)))?;
    }

    let tx = &config.tx_window;
    for (plane, max, min) in [
        ("downlink C-Plane", tx.t1a_max_cp_dl, tx.t1a_min_cp_dl),
        ("uplink C-Plane", tx.t1a_max_cp_ul, tx.t1a_min_cp_ul),
        ("U-Plane", tx.t1a_max_up, tx.t1a_min_up),
    ] {
        if max < min {
            return invalid(format!("{} transmission window closes ({:?}) before it opens ({:?})", plane, min, max));
        }
    }

    if config.rx_window.sym_start > config.rx_window.sym_end {
        return invalid("reception window start after its end".to_string());
    }
    Ok(())
}

/// Build a sector from its configuration
pub fn create_sector(config: SectorConfig, dependencies: SectorDependencies) -> Result<Sector, OfhError> {
    validate(&config)?;

    let nof_symbols_per_slot = config.cp.nof_symbols_per_slot();
    let tx_timing = TxWindowTimingParameters::from_durations(&config.tx_window, config.scs, config.cp);
    let max_advance_symbols = config
        .max_advance_symbols
        .unwrap_or_else(|| TxWindowChecker::default_max_advance(config.scs, config.cp));
    let nof_symbols_before_ota =
        TxWindowChecker::nof_symbols_before_ota(config.dl_processing_time, &tx_timing, config.scs, config.cp);
    if nof_symbols_before_ota > max_advance_symbols {
        return Err(OfhError::InvalidConfiguration(format!(
            "sector {}: downlink needs {} symbols before OTA, beyond the {} symbol horizon",
            config.sector_id, nof_symbols_before_ota, max_advance_symbols
        )));
    }

    // Keep every slot inside the look-ahead horizon in its own ring position.
    let nof_slots = DEFAULT_NOF_SLOTS.max((max_advance_symbols / nof_symbols_per_slot) as usize + 2);

    let eth_header = EthernetHeader::ecpri(config.ru_mac, config.du_mac, config.vlan_id, config.pcp);
    let error_notifier = Arc::new(ErrorNotifierProxy::new());
    let ul_context_repository = Arc::new(UplinkContextRepository::new(
        nof_slots,
        config.ul_eaxc.len(),
        nof_symbols_per_slot as usize,
        config.nof_prb as u32,
    ));

    let transmitter = Transmitter::new(
        TransmitterConfig {
            sector: config.sector_id,
            scs: config.scs,
            cp: config.cp,
            tdd_config: config.tdd_config,
            dl_eaxc: config.dl_eaxc.clone(),
            ul_eaxc: config.ul_eaxc.clone(),
            nof_prb: config.nof_prb,
            eth_header,
            iq_scaling: config.iq_scaling,
            mtu: config.mtu,
            tx_timing,
            dl_processing_time: config.dl_processing_time,
            ul_processing_time: config.ul_processing_time,
            max_advance_symbols,
            frame_pool: FramePoolConfig {
                nof_slots,
                nof_buffers: config.nof_frame_buffers,
                mtu: config.mtu,
            },
        },
        TransmitterDependencies {
            gateway: dependencies.gateway,
            error_notifier: error_notifier.clone(),
            ul_context_repository: ul_context_repository.clone(),
        },
    );

    let receiver = Arc::new(Receiver::new(
        ReceiverConfig {
            sector: config.sector_id,
            scs: config.scs,
            cp: config.cp,
            ul_eaxc: config.ul_eaxc.clone(),
            nof_prb: config.nof_prb,
            iq_scaling: config.iq_scaling,
            rx_window: config.rx_window,
        },
        ReceiverDependencies {
            uplink_notifier: dependencies.uplink_notifier,
            ul_context_repository,
        },
    ));

    info!(
        "Created sector {}: {} PRBs, DL eAxC {:?}, UL eAxC {:?}, RU {}",
        config.sector_id, config.nof_prb, config.dl_eaxc, config.ul_eaxc, config.ru_mac
    );

    Ok(Sector {
        sector_id: config.sector_id,
        transmitter,
        controller: SectorController {
            sector_id: config.sector_id,
            ethernet_receiver: dependencies.ethernet_receiver,
            receiver: receiver.clone(),
        },
        receiver,
        error_notifier,
    })
}
