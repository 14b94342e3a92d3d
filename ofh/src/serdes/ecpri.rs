//! eCPRI Common Header
//!
//! Only the two message types used by the O-RAN fronthaul are supported:
//! IQ data (User-Plane) and real-time control (Control-Plane). Both carry
//! the same 4-byte `PC_ID`/`SEQ_ID` block after the common header.

use crate::OfhError;
use bytes::BufMut;
use common::types::Eaxc;
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

/// Supported eCPRI protocol revision
pub const ECPRI_REVISION: u8 = 1;

/// Size of the common header plus the `PC_ID`/`SEQ_ID` block
pub const ECPRI_HEADER_SIZE: usize = 8;

/// Size of the eCPRI common header alone
pub const ECPRI_COMMON_HEADER_SIZE: usize = 4;

/// E-bit set, subsequence 0: every message fits in a single eCPRI message
const SEQ_ID_LAST: u8 = 0x80;

/// eCPRI message type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcpriMessageType {
    /// User-Plane IQ data
    IqData = 0,
    /// Control-Plane real-time control
    RealTimeControl = 2,
}

impl TryFrom<u8> for EcpriMessageType {
    type Error = OfhError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EcpriMessageType::IqData),
            2 => Ok(EcpriMessageType::RealTimeControl),
            other => Err(OfhError::UnsupportedMessageType(other)),
        }
    }
}

/// eCPRI header of one fronthaul message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcpriHeader {
    pub message_type: EcpriMessageType,
    /// Bytes following the common header, `PC_ID`/`SEQ_ID` included
    pub payload_size: u16,
    pub eaxc: Eaxc,
    pub seq_id: u8,
}

impl EcpriHeader {
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(ECPRI_REVISION << 4);
        buf.put_u8(self.message_type as u8);
        buf.put_u16(self.payload_size);
        buf.put_u16(self.eaxc.value());
        buf.put_u8(self.seq_id);
        buf.put_u8(SEQ_ID_LAST);
    }

    /// Patch the payload size of an already encoded header
    ///
    /// `header` must start at the first eCPRI byte.
    pub fn set_payload_size(header: &mut [u8], payload_size: u16) {
        header[2..4].copy_from_slice(&payload_size.to_be_bytes());
    }

    fn parse(input: &[u8]) -> IResult<&[u8], (u8, u8, u16, u16, u8, u8)> {
        let (input, revision) = be_u8(input)?;
        let (input, message_type) = be_u8(input)?;
        let (input, payload_size) = be_u16(input)?;
        let (input, eaxc) = be_u16(input)?;
        let (input, seq_id) = be_u8(input)?;
        let (input, sub_seq) = be_u8(input)?;
        Ok((input, (revision, message_type, payload_size, eaxc, seq_id, sub_seq)))
    }

    /// Decode the header, returning the message body trimmed to the payload size
    pub fn decode(data: &[u8]) -> Result<(Self, &[u8]), OfhError> {
        let (body, (revision, message_type, payload_size, eaxc, seq_id, _)) =
            Self::parse(data).map_err(|_| OfhError::Truncated {
                what: "eCPRI header",
                needed: ECPRI_HEADER_SIZE,
                available: data.len(),
            })?;

        let revision = revision >> 4;
        if revision != ECPRI_REVISION {
            return Err(OfhError::UnsupportedEcpriRevision(revision));
        }
        let message_type = EcpriMessageType::try_from(message_type)?;

        let body_size = (payload_size as usize).checked_sub(ECPRI_HEADER_SIZE - ECPRI_COMMON_HEADER_SIZE);
        let body_size = match body_size {
            Some(size) if size <= body.len() => size,
            _ => {
                return Err(OfhError::Truncated {
                    what: "eCPRI payload",
                    needed: payload_size as usize + ECPRI_COMMON_HEADER_SIZE,
                    available: data.len(),
                })
            }
        };

        Ok((
            Self {
                message_type,
                payload_size,
                eaxc: Eaxc(eaxc),
                seq_id,
            },
            &body[..body_size],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_ecpri_header_layout() {
        let header = EcpriHeader {
            message_type: EcpriMessageType::RealTimeControl,
            payload_size: 20,
            eaxc: Eaxc(0x0102),
            seq_id: 7,
        };
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(&buf[..], &[0x10, 0x02, 0x00, 20, 0x01, 0x02, 7, 0x80]);
    }

    #[test]
    fn test_decode_trims_padding() {
        let header = EcpriHeader {
            message_type: EcpriMessageType::IqData,
            payload_size: 6,
            eaxc: Eaxc(3),
            seq_id: 0,
        };
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        buf.extend_from_slice(&[1, 2, 0, 0, 0]);

        let (decoded, body) = EcpriHeader::decode(&buf).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(body, &[1, 2]);
    }

    #[test]
    fn test_decode_errors() {
        let mut buf = BytesMut::new();
        EcpriHeader {
            message_type: EcpriMessageType::IqData,
            payload_size: 100,
            eaxc: Eaxc(0),
            seq_id: 0,
        }
        .encode(&mut buf);
        assert!(matches!(EcpriHeader::decode(&buf), Err(OfhError::Truncated { .. })));

        let mut bad_type = buf.clone();
        bad_type[1] = 5;
        assert_eq!(EcpriHeader::decode(&bad_type), Err(OfhError::UnsupportedMessageType(5)));

        let mut bad_revision = buf.clone();
        bad_revision[0] = 0x20;
        assert_eq!(EcpriHeader::decode(&bad_revision), Err(OfhError::UnsupportedEcpriRevision(2)));
    }
}
