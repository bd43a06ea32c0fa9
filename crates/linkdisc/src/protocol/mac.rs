// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! 48-bit MAC addresses.

use super::constants::ETH_ADDR_LEN;
use super::ParseError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// IEEE 802 MAC address.
///
/// Parsed from `aa:bb:cc:dd:ee:ff` or `aa-bb-cc-dd-ee-ff` (any case) and
/// always displayed lowercase with colons, so string comparison of two
/// formatted addresses is case-insensitive by construction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MacAddress([u8; ETH_ADDR_LEN]);

impl MacAddress {
    pub const BROADCAST: MacAddress = MacAddress([0xff; ETH_ADDR_LEN]);

    /// Reserved multicast destination of primary (LLDP) probes.
    pub const PROBE_MULTICAST: MacAddress = MacAddress([0xa5, 0x23, 0x05, 0x00, 0x00, 0x01]);

    /// Placeholder fingerprint used until cluster identity is known.
    pub const DEFAULT_FINGERPRINT: MacAddress =
        MacAddress([0xde, 0xad, 0xbe, 0xef, 0xba, 0x11]);

    pub const fn new(bytes: [u8; ETH_ADDR_LEN]) -> Self {
        Self(bytes)
    }

    /// Build from the first six bytes of `data`.
    pub fn from_slice(data: &[u8]) -> Result<Self, ParseError> {
        let bytes: [u8; ETH_ADDR_LEN] = data
            .get(..ETH_ADDR_LEN)
            .and_then(|s| s.try_into().ok())
            .ok_or(ParseError::TruncatedData {
                needed: ETH_ADDR_LEN,
                available: data.len(),
            })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; ETH_ADDR_LEN] {
        &self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// I/G bit set (group address).
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// U/L bit set.
    pub fn is_locally_administered(&self) -> bool {
        self.0[0] & 0x02 != 0
    }
}

impl FromStr for MacAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split([':', '-']).collect();
        if parts.len() != ETH_ADDR_LEN {
            return Err(ParseError::InvalidMac(s.to_string()));
        }

        let mut bytes = [0u8; ETH_ADDR_LEN];
        for (slot, part) in bytes.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(ParseError::InvalidMac(s.to_string()));
            }
            *slot =
                u8::from_str_radix(part, 16).map_err(|_| ParseError::InvalidMac(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({})", self)
    }
}

impl From<[u8; ETH_ADDR_LEN]> for MacAddress {
    fn from(bytes: [u8; ETH_ADDR_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
