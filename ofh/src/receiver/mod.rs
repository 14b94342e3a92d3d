//! Fronthaul Receiver
//!
//! Decodes uplink User-Plane frames coming from the RU and writes their IQ
//! samples into the grids registered by the uplink request handler. Frames
//! outside the reception window, or for eAxCs and slots nobody asked for,
//! are dropped and counted.

pub mod uplink_context;

pub use uplink_context::{UplinkContextRef, UplinkContextRepository, UplinkWriteOutcome};

use crate::notifier::{UplinkRxSymbolContext, UplinkSymbolNotifier};
use crate::serdes::ecpri::{EcpriHeader, EcpriMessageType};
use crate::serdes::ethernet::EthernetHeader;
use crate::serdes::uplane::UplaneMessageView;
use crate::serdes::DataDirection;
use crate::timing::OtaSymbolBoundaryNotifier;
use crate::window::{RxWindowChecker, RxWindowStats, RxWindowTimingParameters};
use crate::{OfhError, NOF_SUBCARRIERS_PER_RB};
use common::types::{CyclicPrefix, Eaxc, SectorId, SubcarrierSpacing};
use common::{SlotPoint, SlotSymbolPoint};
use interfaces::FrameNotifier;
use num_complex::Complex32;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Receiver configuration
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    pub sector: SectorId,
    pub scs: SubcarrierSpacing,
    pub cp: CyclicPrefix,
    /// Uplink eAxCs; the position of an eAxC is the grid port it is written to
    pub ul_eaxc: Vec<Eaxc>,
    pub nof_prb: u16,
    pub iq_scaling: f32,
    pub rx_window: RxWindowTimingParameters,
}

/// Receiver dependencies
pub struct ReceiverDependencies {
    pub uplink_notifier: Arc<dyn UplinkSymbolNotifier>,
    pub ul_context_repository: Arc<UplinkContextRepository>,
}

/// Receiver statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Frames written into a grid
    pub frames_accepted: u64,
    /// Frames that failed to decode or were not uplink IQ data
    pub frames_malformed: u64,
    /// Frames for an eAxC not configured for uplink
    pub frames_unknown_eaxc: u64,
    /// Frames for a slot or symbol nobody requested
    pub frames_unrequested: u64,
    /// Symbols reported to the uplink notifier
    pub symbols_notified: u64,
    /// Slots that expired before every symbol arrived
    pub incomplete_slots: u64,
    pub window: RxWindowStats,
}

#[derive(Default)]
struct ReceiverCounters {
    frames_accepted: AtomicU64,
    frames_malformed: AtomicU64,
    frames_unknown_eaxc: AtomicU64,
    frames_unrequested: AtomicU64,
    symbols_notified: AtomicU64,
    incomplete_slots: AtomicU64,
}

/// Per-sector uplink receiver
pub struct Receiver {
    config: ReceiverConfig,
    window_checker: RxWindowChecker,
    ul_context_repository: Arc<UplinkContextRepository>,
    uplink_notifier: Arc<dyn UplinkSymbolNotifier>,
    scratch: Mutex<Vec<Complex32>>,
    counters: ReceiverCounters,
}

impl Receiver {
    pub fn new(config: ReceiverConfig, dependencies: ReceiverDependencies) -> Self {
        assert!(!config.ul_eaxc.is_empty(), "Receiver requires at least one uplink eAxC");

        Self {
            window_checker: RxWindowChecker::new(config.rx_window, config.scs, config.cp),
            ul_context_repository: dependencies.ul_context_repository,
            uplink_notifier: dependencies.uplink_notifier,
            scratch: Mutex::new(vec![Complex32::new(0.0, 0.0); config.nof_prb as usize * NOF_SUBCARRIERS_PER_RB]),
            counters: ReceiverCounters::default(),
            config,
        }
    }

    pub fn stats(&self) -> ReceiverStats {
        ReceiverStats {
            frames_accepted: self.counters.frames_accepted.load(Ordering::Relaxed),
            frames_malformed: self.counters.frames_malformed.load(Ordering::Relaxed),
            frames_unknown_eaxc: self.counters.frames_unknown_eaxc.load(Ordering::Relaxed),
            frames_unrequested: self.counters.frames_unrequested.load(Ordering::Relaxed),
            symbols_notified: self.counters.symbols_notified.load(Ordering::Relaxed),
            incomplete_slots: self.counters.incomplete_slots.load(Ordering::Relaxed),
            window: self.window_checker.stats(),
        }
    }

    pub fn window_checker(&self) -> &RxWindowChecker {
        &self.window_checker
    }

    /// Reference the received SFN bits are resolved against
    fn reference_slot(&self) -> SlotPoint {
        match self.window_checker.ota_symbol() {
            Some(ota) => ota.slot(),
            None => SlotPoint::new(self.config.scs.numerology(), 0, 0),
        }
    }

    fn process_frame(&self, frame: &[u8]) -> Result<(), OfhError> {
        let (_, payload) = EthernetHeader::decode(frame)?;
        let (ecpri, body) = EcpriHeader::decode(payload)?;
        if ecpri.message_type != EcpriMessageType::IqData {
            return Err(OfhError::UnsupportedMessageType(ecpri.message_type as u8));
        }

        let Some(port) = self.config.ul_eaxc.iter().position(|eaxc| *eaxc == ecpri.eaxc) else {
            self.counters.frames_unknown_eaxc.fetch_add(1, Ordering::Relaxed);
            debug!("Sector {}: dropping frame for unknown eAxC {}", self.config.sector, ecpri.eaxc);
            return Ok(());
        };

        let message = UplaneMessageView::decode(body)?;
        if message.radio_header.direction != DataDirection::Uplink {
            return Err(OfhError::MalformedMessage("downlink User-Plane message received".to_string()));
        }

        let nof_symbols = self.config.cp.nof_symbols_per_slot();
        let symbol = message.radio_header.start_symbol as u32;
        if symbol >= nof_symbols {
            return Err(OfhError::MalformedMessage(format!("symbol {} out of slot", symbol)));
        }
        let slot = message.radio_header.resolve_slot(self.reference_slot())?;
        let symbol_point = SlotSymbolPoint::new(slot, symbol, nof_symbols);

        if !self.window_checker.update_rx_window_statistics(symbol_point) {
            debug!(
                "Sector {}: eAxC {} symbol {} outside the reception window",
                self.config.sector, ecpri.eaxc, symbol_point
            );
            return Ok(());
        }

        let mut scratch = self.scratch.lock();
        let nof_subc = message.nof_subcarriers().min(scratch.len());
        message.read_iq(&mut scratch[..nof_subc], self.config.iq_scaling);

        let outcome = self.ul_context_repository.write(
            slot,
            port,
            symbol,
            message.section.start_prb as u32,
            &scratch[..nof_subc],
        );
        drop(scratch);

        match outcome {
            UplinkWriteOutcome::NoContext | UplinkWriteOutcome::OutsideSymbolRange => {
                self.counters.frames_unrequested.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Sector {}: no uplink request for eAxC {} at {}",
                    self.config.sector, ecpri.eaxc, symbol_point
                );
            }
            UplinkWriteOutcome::Written { sector, completed } => {
                self.counters.frames_accepted.fetch_add(1, Ordering::Relaxed);
                if let Some(grid) = completed {
                    self.counters.symbols_notified.fetch_add(1, Ordering::Relaxed);
                    trace!("Sector {}: uplink symbol {} complete", sector, symbol_point);
                    let context = UplinkRxSymbolContext { slot, sector, symbol };
                    self.uplink_notifier.on_new_uplink_symbol(&context, &*grid.lock());
                }
            }
        }
        Ok(())
    }
}

impl FrameNotifier for Receiver {
    fn on_new_frame(&self, frame: &[u8]) {
        if let Err(e) = self.process_frame(frame) {
            self.counters.frames_malformed.fetch_add(1, Ordering::Relaxed);
            debug!("Sector {}: dropping received frame: {}", self.config.sector, e);
        }
    }
}

impl OtaSymbolBoundaryNotifier for Receiver {
    fn on_new_symbol(&self, symbol_point: SlotSymbolPoint) {
        self.window_checker.on_new_symbol(symbol_point);

        // Once the window has closed on a slot's last symbol, nothing more can arrive for it.
        let horizon = symbol_point - self.config.rx_window.sym_end as i32;
        if horizon.symbol_index() != 0 {
            return;
        }
        let expired = horizon.slot() - 1;
        if let Some(context) = self.ul_context_repository.expire(expired) {
            self.counters.incomplete_slots.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Sector {}: uplink slot {} expired before all symbols were received",
                context.sector, context.slot
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_grid::{ResourceGrid, ResourceGridReader};
    use crate::serdes::ethernet::MacAddress;
    use crate::serdes::uplane::{encode_uplane_message, UplaneSectionHeader};
    use crate::serdes::{FilterIndex, RadioHeader};
    use bytes::BytesMut;

    #[derive(Default)]
    struct SymbolRecorder {
        symbols: Mutex<Vec<(UplinkRxSymbolContext, Complex32)>>,
    }

    impl UplinkSymbolNotifier for SymbolRecorder {
        fn on_new_uplink_symbol(&self, context: &UplinkRxSymbolContext, grid: &dyn ResourceGridReader) {
            let value = grid.get(0, context.symbol as usize, 0);
            self.symbols.lock().push((*context, value));
        }
    }

    const NOF_PRB: u16 = 4;

    fn receiver() -> (Receiver, Arc<UplinkContextRepository>, Arc<SymbolRecorder>) {
        let repository = Arc::new(UplinkContextRepository::new(20, 2, 14, NOF_PRB as u32));
        let recorder = Arc::new(SymbolRecorder::default());
        let receiver = Receiver::new(
            ReceiverConfig {
                sector: 0,
                scs: SubcarrierSpacing::Scs30,
                cp: CyclicPrefix::Normal,
                ul_eaxc: vec![Eaxc(8), Eaxc(9)],
                nof_prb: NOF_PRB,
                iq_scaling: 1.0,
                rx_window: RxWindowTimingParameters { sym_start: 0, sym_end: 4 },
            },
            ReceiverDependencies {
                uplink_notifier: recorder.clone(),
                ul_context_repository: repository.clone(),
            },
        );
        (receiver, repository, recorder)
    }

    fn uplink_frame(eaxc: u16, slot: SlotPoint, symbol: u32, value: f32) -> Vec<u8> {
        let mut buf = BytesMut::new();
        EthernetHeader::ecpri(MacAddress([1; 6]), MacAddress([2; 6]), None, 0).encode(&mut buf);
        let iq_bytes = NOF_PRB as usize * crate::serdes::uplane::IQ_BYTES_PER_PRB;
        EcpriHeader {
            message_type: EcpriMessageType::IqData,
            payload_size: (4 + 8 + iq_bytes) as u16,
            eaxc: Eaxc(eaxc),
            seq_id: 0,
        }
        .encode(&mut buf);
        encode_uplane_message(
            &mut buf,
            &RadioHeader::new(DataDirection::Uplink, FilterIndex::StandardChannelFilter, slot, symbol),
            &UplaneSectionHeader {
                section_id: 0,
                start_prb: 0,
                nof_prb: NOF_PRB,
            },
            &vec![Complex32::new(value, 0.0); NOF_PRB as usize * NOF_SUBCARRIERS_PER_RB],
            1.0,
        );
        buf.to_vec()
    }

    #[test]
    fn test_symbol_notified_when_every_eaxc_arrived() {
        let (receiver, repository, recorder) = receiver();
        let slot = SlotPoint::new(1, 100, 6);
        repository.add(slot, 0, ResourceGrid::new_shared(2, 14, 48), common::OfdmSymbolRange::new(0, 14));
        receiver.on_new_symbol(SlotSymbolPoint::new(slot, 3, 14));

        receiver.on_new_frame(&uplink_frame(8, slot, 2, 0.5));
        assert!(recorder.symbols.lock().is_empty());
        receiver.on_new_frame(&uplink_frame(9, slot, 2, 0.25));

        let symbols = recorder.symbols.lock();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].0, UplinkRxSymbolContext { slot, sector: 0, symbol: 2 });
        assert!((symbols[0].1.re - 0.5).abs() < 1e-3);
        assert_eq!(receiver.stats().frames_accepted, 2);
        assert_eq!(receiver.stats().symbols_notified, 1);
    }

    #[test]
    fn test_drops_are_counted() {
        let (receiver, repository, recorder) = receiver();
        let slot = SlotPoint::new(1, 100, 6);
        repository.add(slot, 0, ResourceGrid::new_shared(2, 14, 48), common::OfdmSymbolRange::new(0, 8));
        receiver.on_new_symbol(SlotSymbolPoint::new(slot, 10, 14));

        // Unknown eAxC.
        receiver.on_new_frame(&uplink_frame(3, slot, 9, 1.0));
        // Late: six symbols after its nominal time.
        receiver.on_new_frame(&uplink_frame(8, slot, 4, 1.0));
        // Early: not yet on air.
        receiver.on_new_frame(&uplink_frame(8, slot, 12, 1.0));
        // Symbol never requested.
        receiver.on_new_frame(&uplink_frame(8, slot, 9, 1.0));
        // Garbage.
        receiver.on_new_frame(&[0u8; 10]);

        let stats = receiver.stats();
        assert_eq!(stats.frames_unknown_eaxc, 1);
        assert_eq!(stats.window.late, 1);
        assert_eq!(stats.window.early, 1);
        assert_eq!(stats.frames_unrequested, 1);
        assert_eq!(stats.frames_malformed, 1);
        assert_eq!(stats.frames_accepted, 0);
        assert!(recorder.symbols.lock().is_empty());
    }

    #[test]
    fn test_incomplete_slot_expires() {
        let (receiver, repository, _) = receiver();
        let slot = SlotPoint::new(1, 100, 6);
        repository.add(slot, 0, ResourceGrid::new_shared(2, 14, 48), common::OfdmSymbolRange::new(0, 14));

        // The window closes on the last symbol four symbols into the next slot.
        receiver.on_new_symbol(SlotSymbolPoint::new(slot + 1, 3, 14));
        assert!(repository.contains(slot));
        receiver.on_new_symbol(SlotSymbolPoint::new(slot + 1, 4, 14));
        assert!(!repository.contains(slot));
        assert_eq!(receiver.stats().incomplete_slots, 1);
    }
}
