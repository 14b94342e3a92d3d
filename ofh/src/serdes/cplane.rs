//! Control-Plane Section Type 1
//!
//! Section type 1 describes the PRBs and symbols of the User-Plane data that
//! follows it. One message carries exactly one section covering the whole
//! carrier bandwidth over a contiguous symbol range.

use super::{RadioHeader, RADIO_HEADER_SIZE};
use crate::OfhError;
use bytes::BufMut;
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

/// Section type carried in the common C-Plane header
pub const SECTION_TYPE_1: u8 = 1;

/// Size of the section type 1 common header, radio header included
pub const CPLANE_TYPE1_COMMON_HEADER_SIZE: usize = RADIO_HEADER_SIZE + 4;

/// Size of one section type 1 section
pub const CPLANE_TYPE1_SECTION_SIZE: usize = 8;

/// Size of a complete single-section type 1 message
pub const CPLANE_TYPE1_MESSAGE_SIZE: usize = CPLANE_TYPE1_COMMON_HEADER_SIZE + CPLANE_TYPE1_SECTION_SIZE;

/// Largest symbol count a section may describe
pub const MAX_NOF_SYMBOLS: u8 = 14;

/// Every subcarrier of the PRB is addressed
pub const RE_MASK_ALL: u16 = 0x0fff;

/// Single-section C-Plane section type 1 message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CplaneSectionType1 {
    pub radio_header: RadioHeader,
    pub section_id: u16,
    pub start_prb: u16,
    /// Number of PRBs; encoded as 0 ("all PRBs") above 255
    pub nof_prb: u16,
    pub nof_symbols: u8,
    pub re_mask: u16,
    pub beam_id: u16,
}

impl CplaneSectionType1 {
    /// Reject sections the 4-bit numSymbol field cannot carry
    pub fn validate(&self) -> Result<(), OfhError> {
        if self.nof_symbols == 0 || self.nof_symbols > MAX_NOF_SYMBOLS {
            return Err(OfhError::MalformedMessage(format!(
                "section of {} symbols, expected 1 to {}",
                self.nof_symbols, MAX_NOF_SYMBOLS
            )));
        }
        Ok(())
    }

    /// Encode the message; nothing is written if the section is invalid
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<(), OfhError> {
        self.validate()?;
        self.radio_header.encode(buf);

        // numberOfSections, sectionType, udCompHdr (16-bit fixed point), reserved.
        buf.put_u8(1);
        buf.put_u8(SECTION_TYPE_1);
        buf.put_u8(0);
        buf.put_u8(0);

        buf.put_u16(((self.section_id & 0x0fff) << 4) | ((self.start_prb >> 8) & 0x03));
        buf.put_u8((self.start_prb & 0xff) as u8);
        buf.put_u8(if self.nof_prb > 255 { 0 } else { self.nof_prb as u8 });
        buf.put_u16(((self.re_mask & 0x0fff) << 4) | self.nof_symbols as u16);
        buf.put_u16(self.beam_id & 0x7fff);
        Ok(())
    }

    fn parse_section(input: &[u8]) -> IResult<&[u8], (u16, u8, u8, u16, u16)> {
        let (input, id_and_start) = be_u16(input)?;
        let (input, start_low) = be_u8(input)?;
        let (input, num_prbc) = be_u8(input)?;
        let (input, mask_and_symbols) = be_u16(input)?;
        let (input, beam) = be_u16(input)?;
        Ok((input, (id_and_start, start_low, num_prbc, mask_and_symbols, beam)))
    }

    pub fn decode(data: &[u8]) -> Result<Self, OfhError> {
        if data.len() < CPLANE_TYPE1_MESSAGE_SIZE {
            return Err(OfhError::Truncated {
                what: "C-Plane section type 1",
                needed: CPLANE_TYPE1_MESSAGE_SIZE,
                available: data.len(),
            });
        }

        let (radio_header, rest) = RadioHeader::decode(data)?;
        let (nof_sections, section_type) = (rest[0], rest[1]);
        if section_type != SECTION_TYPE_1 {
            return Err(OfhError::MalformedMessage(format!("section type {}", section_type)));
        }
        if nof_sections != 1 {
            return Err(OfhError::MalformedMessage(format!("{} sections in one message", nof_sections)));
        }

        let (_, (id_and_start, start_low, num_prbc, mask_and_symbols, beam)) =
            Self::parse_section(&rest[4..]).map_err(|_| OfhError::Truncated {
                what: "C-Plane section",
                needed: CPLANE_TYPE1_SECTION_SIZE,
                available: rest.len().saturating_sub(4),
            })?;

        Ok(Self {
            radio_header,
            section_id: id_and_start >> 4,
            start_prb: ((id_and_start & 0x03) << 8) | start_low as u16,
            nof_prb: num_prbc as u16,
            nof_symbols: (mask_and_symbols & 0x0f) as u8,
            re_mask: mask_and_symbols >> 4,
            beam_id: beam & 0x7fff,
        })
    }
}
