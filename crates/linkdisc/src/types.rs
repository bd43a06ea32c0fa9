// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Core network model: devices, ports, connect points and links.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque device identifier (e.g. `of:0000000000000001`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Chassis identity advertised in the LLDP chassis TLV.
///
/// Only the low 48 bits travel on the wire (MAC address subtype).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChassisId(pub u64);

impl ChassisId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChassisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Port number, scoped to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortNumber(pub u64);

impl PortNumber {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for PortNumber {
    fn from(n: u64) -> Self {
        Self(n)
    }
}

impl fmt::Display for PortNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One end of a physical link: a port on a device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectPoint {
    pub device_id: DeviceId,
    pub port: PortNumber,
}

impl ConnectPoint {
    pub fn new(device_id: impl Into<DeviceId>, port: impl Into<PortNumber>) -> Self {
        Self {
            device_id: device_id.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for ConnectPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device_id, self.port)
    }
}

/// Unordered pair of connect points used for staleness tracking.
///
/// `LinkKey::new(a, b) == LinkKey::new(b, a)`: endpoints are stored sorted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkKey {
    low: ConnectPoint,
    high: ConnectPoint,
}

impl LinkKey {
    pub fn new(a: ConnectPoint, b: ConnectPoint) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Both endpoints, in canonical order.
    pub fn endpoints(&self) -> (&ConnectPoint, &ConnectPoint) {
        (&self.low, &self.high)
    }

    pub fn contains(&self, cp: &ConnectPoint) -> bool {
        self.low == *cp || self.high == *cp
    }

    pub fn touches_device(&self, device_id: &DeviceId) -> bool {
        self.low.device_id == *device_id || self.high.device_id == *device_id
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}}}", self.low, self.high)
    }
}

/// Link classification derived from the received probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkType {
    /// Our own LLDP probe, received directly from a neighbouring switch.
    Direct,
    /// Our own BDDP probe, forwarded through a broadcast domain.
    Indirect,
    /// A probe we did not originate (foreign cluster or unknown fingerprint).
    Edge,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Direct => "DIRECT",
            Self::Indirect => "INDIRECT",
            Self::Edge => "EDGE",
        };
        f.write_str(s)
    }
}

/// Unit reported to the topology store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkDescription {
    pub src: ConnectPoint,
    pub dst: ConnectPoint,
    pub link_type: LinkType,
}

impl LinkDescription {
    pub fn new(src: ConnectPoint, dst: ConnectPoint, link_type: LinkType) -> Self {
        Self {
            src,
            dst,
            link_type,
        }
    }

    pub fn key(&self) -> LinkKey {
        LinkKey::new(self.src.clone(), self.dst.clone())
    }
}

impl fmt::Display for LinkDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.src, self.dst, self.link_type)
    }
}

/// Infrastructure device as seen by the discovery layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub chassis_id: ChassisId,
}

impl Device {
    pub fn new(id: impl Into<DeviceId>, chassis_id: u64) -> Self {
        Self {
            id: id.into(),
            chassis_id: ChassisId(chassis_id),
        }
    }
}

/// Device port with its administrative state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub number: PortNumber,
    pub enabled: bool,
}

impl Port {
    pub fn new(number: u64, enabled: bool) -> Self {
        Self {
            number: PortNumber(number),
            enabled,
        }
    }
}
