// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! LLDPDU type-length-value encoding (IEEE 802.1AB Sec.8.4).
//!
//! Each TLV starts with a 16-bit big-endian header: 7-bit type, 9-bit length.
//! An LLDPDU is a sequence of TLVs terminated by an End TLV (type 0, length 0).

use super::constants::{
    ORG_TLV_PREFIX_LEN, TLV_END, TLV_HEADER_LEN, TLV_MAX_VALUE_LEN, TLV_ORG_SPECIFIC,
};
use super::ParseError;

/// A single LLDP TLV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    tlv_type: u8,
    value: Vec<u8>,
}

impl Tlv {
    /// Create a TLV, rejecting types above 127 and values over 511 bytes.
    pub fn new(tlv_type: u8, value: Vec<u8>) -> Result<Self, ParseError> {
        if tlv_type > TLV_ORG_SPECIFIC {
            return Err(ParseError::InvalidTlv(format!("type {} out of range", tlv_type)));
        }
        if value.len() > TLV_MAX_VALUE_LEN {
            return Err(ParseError::InvalidTlv(format!(
                "type {} value too long ({} bytes)",
                tlv_type,
                value.len()
            )));
        }
        Ok(Self { tlv_type, value })
    }

    /// Organizationally specific TLV: OUI + subtype + info string.
    pub fn org_specific(oui: [u8; 3], subtype: u8, info: &[u8]) -> Result<Self, ParseError> {
        let mut value = Vec::with_capacity(ORG_TLV_PREFIX_LEN + info.len());
        value.extend_from_slice(&oui);
        value.push(subtype);
        value.extend_from_slice(info);
        Self::new(TLV_ORG_SPECIFIC, value)
    }

    pub fn tlv_type(&self) -> u8 {
        self.tlv_type
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        // Length is bounded by `new`, so it fits in 9 bits.
        let header = (u16::from(self.tlv_type) << 9) | (self.value.len() as u16);
        buf.extend_from_slice(&header.to_be_bytes());
        buf.extend_from_slice(&self.value);
    }
}

/// Ordered TLV list of one LLDP data unit (End TLV implied).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lldpdu {
    tlvs: Vec<Tlv>,
}

impl Lldpdu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tlv: Tlv) {
        self.tlvs.push(tlv);
    }

    pub fn tlvs(&self) -> &[Tlv] {
        &self.tlvs
    }

    /// First TLV of the given type.
    pub fn find(&self, tlv_type: u8) -> Option<&Tlv> {
        self.tlvs.iter().find(|t| t.tlv_type == tlv_type)
    }

    /// Info string of the first org-specific TLV matching `oui`/`subtype`.
    pub fn org_specific(&self, oui: [u8; 3], subtype: u8) -> Option<&[u8]> {
        self.tlvs
            .iter()
            .filter(|t| t.tlv_type == TLV_ORG_SPECIFIC && t.value.len() >= ORG_TLV_PREFIX_LEN)
            .find(|t| t.value[0..3] == oui && t.value[3] == subtype)
            .map(|t| &t.value[ORG_TLV_PREFIX_LEN..])
    }

    /// Encode all TLVs followed by the End TLV.
    pub fn encode(&self) -> Vec<u8> {
        let len: usize = self
            .tlvs
            .iter()
            .map(|t| TLV_HEADER_LEN + t.value.len())
            .sum();
        let mut buf = Vec::with_capacity(len + TLV_HEADER_LEN);
        for tlv in &self.tlvs {
            tlv.write_to(&mut buf);
        }
        buf.extend_from_slice(&[0, 0]);
        buf
    }

    /// Decode TLVs up to the End TLV. Bytes after it (frame padding) are
    /// ignored; a buffer that ends cleanly on a TLV boundary without an End
    /// TLV is accepted as well.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut tlvs = Vec::new();
        let mut offset = 0;

        while offset < data.len() {
            if offset + TLV_HEADER_LEN > data.len() {
                return Err(ParseError::TruncatedData {
                    needed: offset + TLV_HEADER_LEN,
                    available: data.len(),
                });
            }
            let header = u16::from_be_bytes([data[offset], data[offset + 1]]);
            let tlv_type = (header >> 9) as u8;
            let len = usize::from(header & 0x01ff);
            offset += TLV_HEADER_LEN;

            if tlv_type == TLV_END {
                break;
            }
            if offset + len > data.len() {
                return Err(ParseError::TruncatedData {
                    needed: offset + len,
                    available: data.len(),
                });
            }

            tlvs.push(Tlv {
                tlv_type,
                value: data[offset..offset + len].to_vec(),
            });
            offset += len;
        }

        Ok(Self { tlvs })
    }
}
