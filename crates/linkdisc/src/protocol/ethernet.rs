// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ethernet II framing (optional single 802.1Q tag).
//!
//! ```text
//! +----------+----------+-----------------+-----------+---------+
//! | dst (6)  | src (6)  | [0x8100 TCI](4) | type (2)  | payload |
//! +----------+----------+-----------------+-----------+---------+
//! ```

use super::constants::{
    ETH_ADDR_LEN, ETH_HEADER_LEN, ETH_MIN_FRAME_LEN, ETH_TYPE_VLAN, VLAN_TAG_LEN,
};
use super::{MacAddress, ParseError};

/// Parsed (or to-be-serialized) Ethernet frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetFrame {
    pub destination: MacAddress,
    pub source: MacAddress,
    /// 12-bit VLAN id when the frame carried an 802.1Q tag.
    pub vlan_id: Option<u16>,
    pub ether_type: u16,
    pub payload: Vec<u8>,
}

impl EthernetFrame {
    pub fn new(
        destination: MacAddress,
        source: MacAddress,
        ether_type: u16,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            destination,
            source,
            vlan_id: None,
            ether_type,
            payload,
        }
    }

    /// Encode to wire bytes, zero-padding to the Ethernet minimum.
    pub fn serialize(&self) -> Vec<u8> {
        let header_len = ETH_HEADER_LEN + self.vlan_id.map_or(0, |_| VLAN_TAG_LEN);
        let mut buf = Vec::with_capacity((header_len + self.payload.len()).max(ETH_MIN_FRAME_LEN));

        buf.extend_from_slice(self.destination.as_bytes());
        buf.extend_from_slice(self.source.as_bytes());
        if let Some(vid) = self.vlan_id {
            buf.extend_from_slice(&ETH_TYPE_VLAN.to_be_bytes());
            buf.extend_from_slice(&(vid & 0x0fff).to_be_bytes());
        }
        buf.extend_from_slice(&self.ether_type.to_be_bytes());
        buf.extend_from_slice(&self.payload);

        if buf.len() < ETH_MIN_FRAME_LEN {
            buf.resize(ETH_MIN_FRAME_LEN, 0);
        }
        buf
    }

    /// Decode wire bytes. Padding stays in `payload`; upper layers stop at
    /// their own terminator.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < ETH_HEADER_LEN {
            return Err(ParseError::TruncatedData {
                needed: ETH_HEADER_LEN,
                available: data.len(),
            });
        }

        let destination = MacAddress::from_slice(&data[0..ETH_ADDR_LEN])?;
        let source = MacAddress::from_slice(&data[ETH_ADDR_LEN..2 * ETH_ADDR_LEN])?;
        let mut offset = 2 * ETH_ADDR_LEN;
        let mut ether_type = read_u16(data, offset);
        offset += 2;

        let mut vlan_id = None;
        if ether_type == ETH_TYPE_VLAN {
            if data.len() < ETH_HEADER_LEN + VLAN_TAG_LEN {
                return Err(ParseError::TruncatedData {
                    needed: ETH_HEADER_LEN + VLAN_TAG_LEN,
                    available: data.len(),
                });
            }
            vlan_id = Some(read_u16(data, offset) & 0x0fff);
            ether_type = read_u16(data, offset + 2);
            offset += VLAN_TAG_LEN;
        }

        Ok(Self {
            destination,
            source,
            vlan_id,
            ether_type,
            payload: data[offset..].to_vec(),
        })
    }
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::ETH_TYPE_LLDP;

    #[test]
    fn test_serialize_pads_to_minimum() {
        let frame = EthernetFrame::new(
            MacAddress::BROADCAST,
            MacAddress::DEFAULT_FINGERPRINT,
            ETH_TYPE_LLDP,
            vec![1, 2, 3],
        );
        let bytes = frame.serialize();
        assert_eq!(bytes.len(), ETH_MIN_FRAME_LEN);
        assert_eq!(&bytes[0..6], &[0xff; 6]);
        assert_eq!(&bytes[12..14], &[0x88, 0xcc]);
        assert_eq!(&bytes[14..17], &[1, 2, 3]);
        assert!(bytes[17..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_parse_header_fields() {
        let frame = EthernetFrame::new(
            MacAddress::PROBE_MULTICAST,
            MacAddress::new([0x02, 0xeb, 1, 2, 3, 4]),
            ETH_TYPE_LLDP,
            vec![0xaa; 50],
        );
        let parsed = EthernetFrame::parse(&frame.serialize()).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_parse_vlan_tagged() {
        let mut frame = EthernetFrame::new(
            MacAddress::BROADCAST,
            MacAddress::DEFAULT_FINGERPRINT,
            0x8942,
            vec![0u8; 46],
        );
        frame.vlan_id = Some(42);

        let bytes = frame.serialize();
        assert_eq!(&bytes[12..14], &[0x81, 0x00]);

        let parsed = EthernetFrame::parse(&bytes).unwrap();
        assert_eq!(parsed.vlan_id, Some(42));
        assert_eq!(parsed.ether_type, 0x8942);
    }

    #[test]
    fn test_parse_truncated() {
        assert_eq!(
            EthernetFrame::parse(&[0u8; 10]),
            Err(ParseError::TruncatedData {
                needed: ETH_HEADER_LEN,
                available: 10
            })
        );

        // VLAN ether-type with no room for the tag
        let mut data = vec![0u8; ETH_HEADER_LEN];
        data[12] = 0x81;
        assert!(EthernetFrame::parse(&data).is_err());
    }
}
