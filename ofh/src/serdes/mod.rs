//! Open Fronthaul Wire Format
//!
//! Encoders and decoders for the frames exchanged with the Radio Unit:
//! Ethernet II (optionally VLAN tagged) carrying eCPRI, carrying the O-RAN
//! radio application layer (Control-Plane section type 1 and User-Plane IQ
//! data with 16-bit fixed point samples).

pub mod cplane;
pub mod ecpri;
pub mod ethernet;
pub mod uplane;

pub use cplane::CplaneSectionType1;
pub use ecpri::{EcpriHeader, EcpriMessageType};
pub use ethernet::{EthernetHeader, MacAddress};
pub use uplane::{UplaneMessageView, UplaneSectionHeader};

use crate::OfhError;
use bytes::BufMut;
use common::SlotPoint;
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

/// O-RAN payload version carried in every radio application header
pub const PAYLOAD_VERSION: u8 = 1;

/// Size of the common radio application header in bytes
pub const RADIO_HEADER_SIZE: usize = 4;

/// Data direction, as encoded on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataDirection {
    Uplink = 0,
    Downlink = 1,
}

/// Filter index of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterIndex {
    StandardChannelFilter = 0,
    UlPrachPreamble1p25khz = 1,
    UlPrachPreamble5khz = 2,
    UlPrachPreamble0p625khz = 3,
    UlPrachPreamble7p5khz = 4,
}

impl FilterIndex {
    fn from_u8(value: u8) -> Result<Self, OfhError> {
        match value {
            0 => Ok(FilterIndex::StandardChannelFilter),
            1 => Ok(FilterIndex::UlPrachPreamble1p25khz),
            2 => Ok(FilterIndex::UlPrachPreamble5khz),
            3 => Ok(FilterIndex::UlPrachPreamble0p625khz),
            4 => Ok(FilterIndex::UlPrachPreamble7p5khz),
            _ => Err(OfhError::MalformedMessage(format!("reserved filter index {}", value))),
        }
    }
}

/// Common radio application header shared by C-Plane and U-Plane messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioHeader {
    pub direction: DataDirection,
    pub filter_index: FilterIndex,
    /// Eight least significant bits of the SFN
    pub frame_id: u8,
    pub subframe_id: u8,
    /// Slot index within the subframe
    pub slot_id: u8,
    pub start_symbol: u8,
}

impl RadioHeader {
    /// Build the header of a message starting at `start_symbol` of `slot`
    pub fn new(direction: DataDirection, filter_index: FilterIndex, slot: SlotPoint, start_symbol: u32) -> Self {
        Self {
            direction,
            filter_index,
            frame_id: (slot.sfn() & 0xff) as u8,
            subframe_id: slot.subframe_index() as u8,
            slot_id: slot.subframe_slot_index() as u8,
            start_symbol: start_symbol as u8,
        }
    }

    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(((self.direction as u8) << 7) | (PAYLOAD_VERSION << 4) | (self.filter_index as u8 & 0x0f));
        buf.put_u8(self.frame_id);
        buf.put_u16(
            ((self.subframe_id as u16 & 0x0f) << 12)
                | ((self.slot_id as u16 & 0x3f) << 6)
                | (self.start_symbol as u16 & 0x3f),
        );
    }

    pub(crate) fn parse(input: &[u8]) -> IResult<&[u8], (u8, u8, u16)> {
        let (input, flags) = be_u8(input)?;
        let (input, frame_id) = be_u8(input)?;
        let (input, timing) = be_u16(input)?;
        Ok((input, (flags, frame_id, timing)))
    }

    pub fn decode(data: &[u8]) -> Result<(Self, &[u8]), OfhError> {
        let (rest, (flags, frame_id, timing)) = Self::parse(data).map_err(|_| OfhError::Truncated {
            what: "radio application header",
            needed: RADIO_HEADER_SIZE,
            available: data.len(),
        })?;

        let version = (flags >> 4) & 0x07;
        if version != PAYLOAD_VERSION {
            return Err(OfhError::MalformedMessage(format!("payload version {}", version)));
        }

        let direction = if flags & 0x80 != 0 {
            DataDirection::Downlink
        } else {
            DataDirection::Uplink
        };

        Ok((
            Self {
                direction,
                filter_index: FilterIndex::from_u8(flags & 0x0f)?,
                frame_id,
                subframe_id: (timing >> 12) as u8,
                slot_id: ((timing >> 6) & 0x3f) as u8,
                start_symbol: (timing & 0x3f) as u8,
            },
            rest,
        ))
    }

    /// Recover the full slot point, taking the SFN high bits from `reference`
    ///
    /// The candidate closest to `reference` is chosen, so frames straddling an
    /// SFN wrap resolve to the right cycle.
    pub fn resolve_slot(&self, reference: SlotPoint) -> Result<SlotPoint, OfhError> {
        let slots_per_subframe = reference.nof_slots_per_subframe();
        if self.subframe_id >= 10 || self.slot_id as u32 >= slots_per_subframe {
            return Err(OfhError::MalformedMessage(format!(
                "subframe {} slot {} invalid for numerology {}",
                self.subframe_id,
                self.slot_id,
                reference.numerology()
            )));
        }

        let slot_index = self.subframe_id as u32 * slots_per_subframe + self.slot_id as u32;
        let base_sfn = (reference.sfn() & !0xff) | self.frame_id as u32;
        let candidate = SlotPoint::new(
            reference.numerology(),
            base_sfn % common::slot_point::NOF_SFNS,
            slot_index,
        );

        let slots_per_cycle = 256 * reference.nof_slots_per_frame() as i32;
        let distance = candidate - reference;
        let resolved = if distance > slots_per_cycle / 2 {
            candidate - slots_per_cycle
        } else if distance < -slots_per_cycle / 2 {
            candidate + slots_per_cycle
        } else {
            candidate
        };
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_radio_header_layout() {
        let slot = SlotPoint::new(1, 300, 7);
        let header = RadioHeader::new(DataDirection::Downlink, FilterIndex::StandardChannelFilter, slot, 5);
        let mut buf = BytesMut::new();
        header.encode(&mut buf);

        // Downlink, payload version 1, filter 0; frame 300 mod 256; subframe 3, slot 1, symbol 5.
        assert_eq!(&buf[..], &[0x90, 44, 0x30, 0x45]);

        let (decoded, rest) = RadioHeader::decode(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, header);
        assert_eq!(decoded.resolve_slot(SlotPoint::new(1, 301, 0)).unwrap(), slot);
    }

    #[test]
    fn test_resolve_slot_across_sfn_wrap() {
        let slot = SlotPoint::new(0, 1023, 9);
        let header = RadioHeader::new(DataDirection::Uplink, FilterIndex::StandardChannelFilter, slot, 0);
        // The OTA reference has already wrapped to SFN 0.
        let reference = SlotPoint::new(0, 0, 1);
        assert_eq!(header.resolve_slot(reference).unwrap(), slot);
    }

    #[test]
    fn test_radio_header_rejects_bad_version() {
        let data = [0x80, 0, 0, 0];
        assert!(matches!(RadioHeader::decode(&data), Err(OfhError::MalformedMessage(_))));
        assert!(matches!(RadioHeader::decode(&data[..2]), Err(OfhError::Truncated { .. })));
    }
}
