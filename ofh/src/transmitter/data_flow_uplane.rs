//! User-Plane Data Flow
//!
//! Reads one antenna port of a downlink resource grid and encodes it as
//! User-Plane messages: one message per symbol, split across several frames
//! when the carrier does not fit in one MTU.

use super::sequence_id::SequenceIdGenerator;
use crate::frame_pool::{FrameKey, FramePool, Plane};
use crate::resource_grid::ResourceGridReader;
use crate::serdes::ecpri::{EcpriHeader, EcpriMessageType, ECPRI_COMMON_HEADER_SIZE, ECPRI_HEADER_SIZE};
use crate::serdes::ethernet::{EthernetHeader, ETH_MIN_FRAME_SIZE};
use crate::serdes::uplane::{
    encode_uplane_message, max_prbs_per_frame, UplaneSectionHeader, IQ_BYTES_PER_PRB, UPLANE_SECTION_HEADER_SIZE,
};
use crate::serdes::{DataDirection, FilterIndex, RadioHeader, RADIO_HEADER_SIZE};
use crate::NOF_SUBCARRIERS_PER_RB;
use common::types::{Eaxc, SectorId};
use common::{OfdmSymbolRange, SlotPoint};
use num_complex::Complex32;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{trace, warn};

/// Section identifier matching the Control-Plane section
pub const UPLANE_SECTION_ID: u16 = 0;

/// Parameters of the User-Plane messages of one eAxC in one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataFlowUplaneResourceGridContext {
    pub slot: SlotPoint,
    pub sector: SectorId,
    pub eaxc: Eaxc,
    /// Resource grid port carried by the eAxC
    pub port: usize,
    pub symbol_range: OfdmSymbolRange,
}

/// User-Plane encoder
pub trait DataFlowUplane: Send + Sync {
    /// Enqueue the IQ data of the context's port and symbols
    fn enqueue_section_type_1_message(&self, context: &DataFlowUplaneResourceGridContext, grid: &dyn ResourceGridReader);
}

/// User-Plane encoder configuration
#[derive(Debug, Clone, Copy)]
pub struct DataFlowUplaneConfig {
    pub eth_header: EthernetHeader,
    pub nof_prb: u16,
    pub iq_scaling: f32,
    pub mtu: usize,
}

/// User-Plane encoder writing into a frame pool
pub struct DataFlowUplaneImpl {
    frame_pool: Arc<FramePool>,
    config: DataFlowUplaneConfig,
    prbs_per_frame: usize,
    sequence_ids: SequenceIdGenerator,
    scratch: Mutex<Vec<Complex32>>,
}

impl DataFlowUplaneImpl {
    pub fn new(frame_pool: Arc<FramePool>, config: DataFlowUplaneConfig, eaxcs: &[Eaxc]) -> Self {
        let prbs_per_frame = max_prbs_per_frame(config.mtu, config.eth_header.size() + ECPRI_HEADER_SIZE);
        assert!(prbs_per_frame > 0, "MTU of {} bytes cannot carry a single PRB", config.mtu);
        assert!(
            config.mtu <= frame_pool.mtu(),
            "MTU {} exceeds the frame pool buffer size {}",
            config.mtu,
            frame_pool.mtu()
        );

        Self {
            frame_pool,
            prbs_per_frame,
            sequence_ids: SequenceIdGenerator::new(eaxcs),
            scratch: Mutex::new(vec![Complex32::new(0.0, 0.0); config.nof_prb as usize * NOF_SUBCARRIERS_PER_RB]),
            config,
        }
    }

    /// PRBs carried by one frame
    pub fn prbs_per_frame(&self) -> usize {
        self.prbs_per_frame
    }
}

impl DataFlowUplane for DataFlowUplaneImpl {
    fn enqueue_section_type_1_message(&self, context: &DataFlowUplaneResourceGridContext, grid: &dyn ResourceGridReader) {
        if context.port >= grid.nof_ports() {
            warn!(
                "Sector {}: port {} not present in a grid of {} ports",
                context.sector,
                context.port,
                grid.nof_ports()
            );
            return;
        }
        if context.symbol_range.stop() as usize > grid.nof_symbols() {
            warn!(
                "Sector {}: symbols {} exceed a grid of {} symbols",
                context.sector,
                context.symbol_range,
                grid.nof_symbols()
            );
            return;
        }

        let mut scratch = self.scratch.lock();
        let nof_subc = scratch.len().min(grid.nof_subc());
        let nof_prb = self.config.nof_prb as usize;

        let key = FrameKey::new(context.eaxc, DataDirection::Downlink, Plane::User);
        let mut writer = self.frame_pool.get_buffer(context.slot, key);

        for symbol in context.symbol_range.symbols() {
            scratch.fill(Complex32::new(0.0, 0.0));
            grid.get_symbol(&mut scratch[..nof_subc], context.port, symbol as usize, 0);

            let radio_header = RadioHeader::new(
                DataDirection::Downlink,
                FilterIndex::StandardChannelFilter,
                context.slot,
                symbol,
            );

            let mut start_prb = 0;
            while start_prb < nof_prb {
                let frame_prbs = self.prbs_per_frame.min(nof_prb - start_prb);
                let Ok(frame) = writer.next_frame(symbol) else {
                    return;
                };

                let payload_size = ECPRI_HEADER_SIZE - ECPRI_COMMON_HEADER_SIZE
                    + RADIO_HEADER_SIZE
                    + UPLANE_SECTION_HEADER_SIZE
                    + frame_prbs * IQ_BYTES_PER_PRB;

                self.config.eth_header.encode(frame);
                EcpriHeader {
                    message_type: EcpriMessageType::IqData,
                    payload_size: payload_size as u16,
                    eaxc: context.eaxc,
                    seq_id: self.sequence_ids.generate(context.eaxc),
                }
                .encode(frame);

                let first = start_prb * NOF_SUBCARRIERS_PER_RB;
                let last = first + frame_prbs * NOF_SUBCARRIERS_PER_RB;
                encode_uplane_message(
                    frame,
                    &radio_header,
                    &UplaneSectionHeader {
                        section_id: UPLANE_SECTION_ID,
                        start_prb: start_prb as u16,
                        nof_prb: frame_prbs as u16,
                    },
                    &scratch[first..last],
                    self.config.iq_scaling,
                );

                if frame.len() < ETH_MIN_FRAME_SIZE {
                    frame.resize(ETH_MIN_FRAME_SIZE, 0);
                }
                start_prb += frame_prbs;
            }
        }

        trace!(
            "U-Plane eAxC {} port {} slot {} symbols {}: {} frames",
            context.eaxc,
            context.port,
            context.slot,
            context.symbol_range,
            writer.nof_frames()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_pool::FramePoolConfig;
    use crate::resource_grid::ResourceGrid;
    use crate::serdes::ethernet::MacAddress;
    use crate::serdes::uplane::UplaneMessageView;

    fn data_flow(pool: Arc<FramePool>, nof_prb: u16, mtu: usize) -> DataFlowUplaneImpl {
        DataFlowUplaneImpl::new(
            pool,
            DataFlowUplaneConfig {
                eth_header: EthernetHeader::ecpri(MacAddress([2; 6]), MacAddress([4; 6]), None, 0),
                nof_prb,
                iq_scaling: 1.0,
                mtu,
            },
            &[Eaxc(0)],
        )
    }

    fn decode(frame: &[u8]) -> (EcpriHeader, UplaneMessageView<'_>) {
        let (_, payload) = EthernetHeader::decode(frame).unwrap();
        let (ecpri, body) = EcpriHeader::decode(payload).unwrap();
        (ecpri, UplaneMessageView::decode(body).unwrap())
    }

    #[test]
    fn test_one_frame_per_symbol() {
        let pool = Arc::new(FramePool::new(FramePoolConfig::default()));
        let flow = data_flow(pool.clone(), 51, 9000);
        let mut grid = ResourceGrid::new(1, 14, 51 * NOF_SUBCARRIERS_PER_RB);
        grid.fill_symbol(0, 4, Complex32::new(0.25, 0.0));

        let slot = SlotPoint::new(1, 9, 9);
        flow.enqueue_section_type_1_message(
            &DataFlowUplaneResourceGridContext {
                slot,
                sector: 0,
                eaxc: Eaxc(0),
                port: 0,
                symbol_range: OfdmSymbolRange::new(3, 3),
            },
            &grid,
        );

        let frames = pool.frames(slot, FrameKey::new(Eaxc(0), DataDirection::Downlink, Plane::User));
        assert_eq!(frames.len(), 3);

        let symbols: Vec<u8> = frames.iter().map(|f| decode(f).1.radio_header.start_symbol).collect();
        assert_eq!(symbols, vec![3, 4, 5]);

        let (ecpri, view) = decode(&frames[1]);
        assert_eq!(ecpri.message_type, EcpriMessageType::IqData);
        assert_eq!(ecpri.seq_id, 1);
        assert_eq!(view.section.nof_prb, 51);
        let mut out = vec![Complex32::new(0.0, 0.0); view.nof_subcarriers()];
        view.read_iq(&mut out, 1.0);
        assert!(out.iter().all(|re| (re.re - 0.25).abs() < 1e-3 && re.im == 0.0));
    }

    #[test]
    fn test_carrier_split_by_mtu() {
        let pool = Arc::new(FramePool::new(FramePoolConfig::default()));
        let flow = data_flow(pool.clone(), 51, 1500);
        assert_eq!(flow.prbs_per_frame(), 30);

        let grid = ResourceGrid::new(1, 14, 51 * NOF_SUBCARRIERS_PER_RB);
        let slot = SlotPoint::new(0, 1, 1);
        flow.enqueue_section_type_1_message(
            &DataFlowUplaneResourceGridContext {
                slot,
                sector: 0,
                eaxc: Eaxc(0),
                port: 0,
                symbol_range: OfdmSymbolRange::new(0, 1),
            },
            &grid,
        );

        let frames = pool.frames(slot, FrameKey::new(Eaxc(0), DataDirection::Downlink, Plane::User));
        assert_eq!(frames.len(), 2);
        let (_, first) = decode(&frames[0]);
        let (_, second) = decode(&frames[1]);
        assert_eq!((first.section.start_prb, first.section.nof_prb), (0, 30));
        assert_eq!((second.section.start_prb, second.section.nof_prb), (30, 21));
        assert!(frames.iter().all(|f| f.len() <= 1500));
    }

    #[test]
    fn test_missing_port_is_skipped() {
        let pool = Arc::new(FramePool::new(FramePoolConfig::default()));
        let flow = data_flow(pool.clone(), 11, 9000);
        let grid = ResourceGrid::new(1, 14, 11 * NOF_SUBCARRIERS_PER_RB);
        let slot = SlotPoint::new(0, 0, 0);
        flow.enqueue_section_type_1_message(
            &DataFlowUplaneResourceGridContext {
                slot,
                sector: 0,
                eaxc: Eaxc(0),
                port: 1,
                symbol_range: OfdmSymbolRange::new(0, 14),
            },
            &grid,
        );
        assert_eq!(pool.nof_entries(slot), 0);
    }
}
