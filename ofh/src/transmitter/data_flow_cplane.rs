//! Control-Plane Data Flow
//!
//! Encodes section type 1 messages into the frame pool.

use super::sequence_id::SequenceIdGenerator;
use crate::frame_pool::{FrameKey, FramePool, Plane};
use crate::serdes::cplane::{CplaneSectionType1, CPLANE_TYPE1_MESSAGE_SIZE, RE_MASK_ALL};
use crate::serdes::ecpri::{EcpriHeader, EcpriMessageType, ECPRI_COMMON_HEADER_SIZE, ECPRI_HEADER_SIZE};
use crate::serdes::ethernet::{EthernetHeader, ETH_MIN_FRAME_SIZE};
use crate::serdes::{DataDirection, FilterIndex, RadioHeader};
use common::types::Eaxc;
use common::{OfdmSymbolRange, SlotPoint};
use std::sync::Arc;
use tracing::{trace, warn};

/// Section identifier used for the single full-bandwidth section
pub const CPLANE_SECTION_ID: u16 = 0;

/// Parameters of one section type 1 message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataFlowCplaneType1Context {
    pub slot: SlotPoint,
    pub eaxc: Eaxc,
    pub direction: DataDirection,
    pub filter_type: FilterIndex,
    pub symbol_range: OfdmSymbolRange,
}

/// Control-Plane encoder
pub trait DataFlowCplane: Send + Sync {
    /// Enqueue a section type 1 message for the context's slot and eAxC
    fn enqueue_section_type_1_message(&self, context: &DataFlowCplaneType1Context);
}

/// Control-Plane encoder writing into a frame pool
pub struct DataFlowCplaneImpl {
    frame_pool: Arc<FramePool>,
    eth_header: EthernetHeader,
    nof_prb: u16,
    sequence_ids: SequenceIdGenerator,
}

impl DataFlowCplaneImpl {
    pub fn new(frame_pool: Arc<FramePool>, eth_header: EthernetHeader, nof_prb: u16, eaxcs: &[Eaxc]) -> Self {
        Self {
            frame_pool,
            eth_header,
            nof_prb,
            sequence_ids: SequenceIdGenerator::new(eaxcs),
        }
    }
}

impl DataFlowCplane for DataFlowCplaneImpl {
    fn enqueue_section_type_1_message(&self, context: &DataFlowCplaneType1Context) {
        if context.symbol_range.is_empty() {
            trace!("No symbols to describe for eAxC {} in slot {}", context.eaxc, context.slot);
            return;
        }

        let section = CplaneSectionType1 {
            radio_header: RadioHeader::new(
                context.direction,
                context.filter_type,
                context.slot,
                context.symbol_range.start(),
            ),
            section_id: CPLANE_SECTION_ID,
            start_prb: 0,
            nof_prb: self.nof_prb,
            nof_symbols: context.symbol_range.length().min(u8::MAX as u32) as u8,
            re_mask: RE_MASK_ALL,
            beam_id: 0,
        };
        if let Err(e) = section.validate() {
            warn!(
                "Dropping C-Plane message for eAxC {} in slot {} (symbols {}): {}",
                context.eaxc, context.slot, context.symbol_range, e
            );
            return;
        }

        let key = FrameKey::new(context.eaxc, context.direction, Plane::Control);
        let mut writer = self.frame_pool.get_buffer(context.slot, key);
        let Ok(frame) = writer.next_frame(context.symbol_range.start()) else {
            return;
        };

        self.eth_header.encode(frame);
        EcpriHeader {
            message_type: EcpriMessageType::RealTimeControl,
            payload_size: (ECPRI_HEADER_SIZE - ECPRI_COMMON_HEADER_SIZE + CPLANE_TYPE1_MESSAGE_SIZE) as u16,
            eaxc: context.eaxc,
            seq_id: self.sequence_ids.generate(context.eaxc),
        }
        .encode(frame);
        if section.encode(frame).is_err() {
            writer.discard_last();
            return;
        }

        if frame.len() < ETH_MIN_FRAME_SIZE {
            frame.resize(ETH_MIN_FRAME_SIZE, 0);
        }

        trace!(
            "C-Plane {:?} eAxC {} slot {} symbols {}",
            context.direction,
            context.eaxc,
            context.slot,
            context.symbol_range
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_pool::FramePoolConfig;
    use crate::serdes::ethernet::MacAddress;

    fn data_flow(pool: Arc<FramePool>) -> DataFlowCplaneImpl {
        let eth = EthernetHeader::ecpri(MacAddress([2; 6]), MacAddress([4; 6]), Some(2), 7);
        DataFlowCplaneImpl::new(pool, eth, 273, &[Eaxc(0), Eaxc(1)])
    }

    fn decode(frame: &[u8]) -> (EcpriHeader, CplaneSectionType1) {
        let (_, payload) = EthernetHeader::decode(frame).unwrap();
        let (ecpri, body) = EcpriHeader::decode(payload).unwrap();
        (ecpri, CplaneSectionType1::decode(body).unwrap())
    }

    #[test]
    fn test_enqueue_section_type1() {
        let pool = Arc::new(FramePool::new(FramePoolConfig::default()));
        let flow = data_flow(pool.clone());
        let slot = SlotPoint::new(1, 100, 3);
        let context = DataFlowCplaneType1Context {
            slot,
            eaxc: Eaxc(1),
            direction: DataDirection::Downlink,
            filter_type: FilterIndex::StandardChannelFilter,
            symbol_range: OfdmSymbolRange::new(2, 10),
        };
        flow.enqueue_section_type_1_message(&context);
        flow.enqueue_section_type_1_message(&context);

        let frames = pool.frames(slot, FrameKey::new(Eaxc(1), DataDirection::Downlink, Plane::Control));
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].len(), ETH_MIN_FRAME_SIZE);

        let (ecpri, section) = decode(&frames[0]);
        assert_eq!(ecpri.message_type, EcpriMessageType::RealTimeControl);
        assert_eq!(ecpri.eaxc, Eaxc(1));
        assert_eq!(ecpri.seq_id, 0);
        assert_eq!(section.radio_header.direction, DataDirection::Downlink);
        assert_eq!(section.radio_header.start_symbol, 2);
        assert_eq!(section.nof_symbols, 10);
        assert_eq!(section.radio_header.resolve_slot(slot).unwrap(), slot);

        let (ecpri, _) = decode(&frames[1]);
        assert_eq!(ecpri.seq_id, 1);
    }

    #[test]
    fn test_range_longer_than_slot_enqueues_nothing() {
        let pool = Arc::new(FramePool::new(FramePoolConfig::default()));
        let flow = data_flow(pool.clone());
        let slot = SlotPoint::new(1, 0, 0);
        flow.enqueue_section_type_1_message(&DataFlowCplaneType1Context {
            slot,
            eaxc: Eaxc(0),
            direction: DataDirection::Downlink,
            filter_type: FilterIndex::StandardChannelFilter,
            symbol_range: OfdmSymbolRange::new(0, 16),
        });
        assert_eq!(pool.nof_entries(slot), 0);
        assert_eq!(pool.stats().available, FramePoolConfig::default().nof_buffers);
    }

    #[test]
    fn test_empty_range_enqueues_nothing() {
        let pool = Arc::new(FramePool::new(FramePoolConfig::default()));
        let flow = data_flow(pool.clone());
        let slot = SlotPoint::new(1, 0, 0);
        flow.enqueue_section_type_1_message(&DataFlowCplaneType1Context {
            slot,
            eaxc: Eaxc(0),
            direction: DataDirection::Uplink,
            filter_type: FilterIndex::StandardChannelFilter,
            symbol_range: OfdmSymbolRange::new(14, 0),
        });
        assert_eq!(pool.nof_entries(slot), 0);
    }
}
