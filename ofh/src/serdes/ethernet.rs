//! Ethernet II / 802.1Q Framing

use crate::OfhError;
use bytes::BufMut;
use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::IResult;
use std::fmt;
use std::str::FromStr;

/// EtherType of eCPRI
pub const ECPRI_ETH_TYPE: u16 = 0xaefe;

/// Tag protocol identifier of an 802.1Q VLAN tag
pub const VLAN_TPID: u16 = 0x8100;

/// Untagged Ethernet header size
pub const ETH_HEADER_SIZE: usize = 14;

/// Size of one 802.1Q tag
pub const VLAN_TAG_SIZE: usize = 4;

/// Minimum Ethernet frame size, frame check sequence excluded
pub const ETH_MIN_FRAME_SIZE: usize = 60;

/// 48-bit MAC address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress(pub [u8; 6]);

impl FromStr for MacAddress {
    type Err = OfhError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in bytes.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| OfhError::InvalidConfiguration(format!("MAC address '{}' too short", s)))?;
            *byte = u8::from_str_radix(part, 16)
                .map_err(|_| OfhError::InvalidConfiguration(format!("invalid MAC address '{}'", s)))?;
        }
        if parts.next().is_some() {
            return Err(OfhError::InvalidConfiguration(format!("MAC address '{}' too long", s)));
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}

/// Ethernet header, with an optional VLAN tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub dst: MacAddress,
    pub src: MacAddress,
    /// VLAN tag control information (PCP and VLAN identifier)
    pub vlan_tci: Option<u16>,
    pub eth_type: u16,
}

impl EthernetHeader {
    /// eCPRI header with an optional VLAN identifier and priority
    pub fn ecpri(dst: MacAddress, src: MacAddress, vlan_id: Option<u16>, pcp: u8) -> Self {
        Self {
            dst,
            src,
            vlan_tci: vlan_id.map(|vid| ((pcp as u16 & 0x07) << 13) | (vid & 0x0fff)),
            eth_type: ECPRI_ETH_TYPE,
        }
    }

    /// Encoded size in bytes
    pub fn size(&self) -> usize {
        if self.vlan_tci.is_some() {
            ETH_HEADER_SIZE + VLAN_TAG_SIZE
        } else {
            ETH_HEADER_SIZE
        }
    }

    /// VLAN identifier, when tagged
    pub fn vlan_id(&self) -> Option<u16> {
        self.vlan_tci.map(|tci| tci & 0x0fff)
    }

    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_slice(&self.dst.0);
        buf.put_slice(&self.src.0);
        if let Some(tci) = self.vlan_tci {
            buf.put_u16(VLAN_TPID);
            buf.put_u16(tci);
        }
        buf.put_u16(self.eth_type);
    }

    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, dst) = take(6usize)(input)?;
        let (input, src) = take(6usize)(input)?;
        let (input, tpid_or_type) = be_u16(input)?;
        let (input, vlan_tci, eth_type) = if tpid_or_type == VLAN_TPID {
            let (input, tci) = be_u16(input)?;
            let (input, eth_type) = be_u16(input)?;
            (input, Some(tci), eth_type)
        } else {
            (input, None, tpid_or_type)
        };

        let mut header = Self {
            dst: MacAddress::default(),
            src: MacAddress::default(),
            vlan_tci,
            eth_type,
        };
        header.dst.0.copy_from_slice(dst);
        header.src.0.copy_from_slice(src);
        Ok((input, header))
    }

    /// Decode an eCPRI frame header, returning the remaining payload
    pub fn decode(frame: &[u8]) -> Result<(Self, &[u8]), OfhError> {
        let (payload, header) = Self::parse(frame).map_err(|_| OfhError::Truncated {
            what: "Ethernet header",
            needed: ETH_HEADER_SIZE,
            available: frame.len(),
        })?;

        if header.eth_type != ECPRI_ETH_TYPE {
            return Err(OfhError::UnexpectedEtherType(header.eth_type));
        }
        Ok((header, payload))
    }
}
