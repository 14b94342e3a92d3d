//! User-Plane IQ Data Messages
//!
//! Each message carries one symbol of one eAxC: the radio application
//! header, a single section header and the PRBs' IQ samples as big-endian
//! 16-bit fixed point pairs.

use super::{RadioHeader, RADIO_HEADER_SIZE};
use crate::{OfhError, NOF_SUBCARRIERS_PER_RB};
use bytes::BufMut;
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;
use num_complex::Complex32;

/// Size of one U-Plane section header
pub const UPLANE_SECTION_HEADER_SIZE: usize = 4;

/// Bytes of IQ data per PRB (12 subcarriers, 16-bit I and Q)
pub const IQ_BYTES_PER_PRB: usize = NOF_SUBCARRIERS_PER_RB * 4;

/// Fixed point full scale
const IQ_FULL_SCALE: f32 = i16::MAX as f32;

/// U-Plane section header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UplaneSectionHeader {
    pub section_id: u16,
    pub start_prb: u16,
    /// Number of PRBs; encoded as 0 above 255 and then derived from the payload
    pub nof_prb: u16,
}

impl UplaneSectionHeader {
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u16(((self.section_id & 0x0fff) << 4) | ((self.start_prb >> 8) & 0x03));
        buf.put_u8((self.start_prb & 0xff) as u8);
        buf.put_u8(if self.nof_prb > 255 { 0 } else { self.nof_prb as u8 });
    }

    fn parse(input: &[u8]) -> IResult<&[u8], (u16, u8, u8)> {
        let (input, id_and_start) = be_u16(input)?;
        let (input, start_low) = be_u8(input)?;
        let (input, num_prbu) = be_u8(input)?;
        Ok((input, (id_and_start, start_low, num_prbu)))
    }
}

/// Maximum number of PRBs one frame can carry given the bytes already used by headers
pub fn max_prbs_per_frame(mtu: usize, header_size: usize) -> usize {
    mtu.saturating_sub(header_size + RADIO_HEADER_SIZE + UPLANE_SECTION_HEADER_SIZE) / IQ_BYTES_PER_PRB
}

fn quantize(value: f32, scaling: f32) -> i16 {
    (value * scaling * IQ_FULL_SCALE)
        .round()
        .clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Encode a U-Plane message body: radio header, section header and samples
///
/// `samples` must hold whole PRBs.
pub fn encode_uplane_message(
    buf: &mut impl BufMut,
    radio_header: &RadioHeader,
    section: &UplaneSectionHeader,
    samples: &[Complex32],
    iq_scaling: f32,
) {
    debug_assert_eq!(samples.len() % NOF_SUBCARRIERS_PER_RB, 0);

    radio_header.encode(buf);
    section.encode(buf);
    for sample in samples {
        buf.put_i16(quantize(sample.re, iq_scaling));
        buf.put_i16(quantize(sample.im, iq_scaling));
    }
}

/// Zero-copy view over a received U-Plane message body
#[derive(Debug, Clone, Copy)]
pub struct UplaneMessageView<'a> {
    pub radio_header: RadioHeader,
    pub section: UplaneSectionHeader,
    iq: &'a [u8],
}

impl<'a> UplaneMessageView<'a> {
    /// Decode the message body following the eCPRI header
    pub fn decode(data: &'a [u8]) -> Result<Self, OfhError> {
        let (radio_header, rest) = RadioHeader::decode(data)?;
        let (payload, (id_and_start, start_low, num_prbu)) =
            UplaneSectionHeader::parse(rest).map_err(|_| OfhError::Truncated {
                what: "U-Plane section header",
                needed: UPLANE_SECTION_HEADER_SIZE,
                available: rest.len(),
            })?;

        let nof_prb = if num_prbu == 0 {
            (payload.len() / IQ_BYTES_PER_PRB) as u16
        } else {
            num_prbu as u16
        };
        let iq_size = nof_prb as usize * IQ_BYTES_PER_PRB;
        if payload.len() < iq_size {
            return Err(OfhError::Truncated {
                what: "U-Plane IQ payload",
                needed: iq_size,
                available: payload.len(),
            });
        }

        Ok(Self {
            radio_header,
            section: UplaneSectionHeader {
                section_id: id_and_start >> 4,
                start_prb: ((id_and_start & 0x03) << 8) | start_low as u16,
                nof_prb,
            },
            iq: &payload[..iq_size],
        })
    }

    /// Number of subcarriers carried by the message
    pub fn nof_subcarriers(&self) -> usize {
        self.section.nof_prb as usize * NOF_SUBCARRIERS_PER_RB
    }

    /// First subcarrier carried by the message
    pub fn start_subcarrier(&self) -> usize {
        self.section.start_prb as usize * NOF_SUBCARRIERS_PER_RB
    }

    /// Convert the fixed point samples into `out`
    ///
    /// Converts `min(out.len(), nof_subcarriers())` samples and returns that count.
    pub fn read_iq(&self, out: &mut [Complex32], iq_scaling: f32) -> usize {
        let scale = 1.0 / (IQ_FULL_SCALE * iq_scaling);
        let mut count = 0;
        for (dst, pair) in out.iter_mut().zip(self.iq.chunks_exact(4)) {
            let re = i16::from_be_bytes([pair[0], pair[1]]);
            let im = i16::from_be_bytes([pair[2], pair[3]]);
            *dst = Complex32::new(re as f32 * scale, im as f32 * scale);
            count += 1;
        }
        count
    }
}
