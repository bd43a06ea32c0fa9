// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovery probe payload and frame builders.
//!
//! A probe is an LLDPDU carrying, in order:
//!
//! | TLV            | Value                                         |
//! |----------------|-----------------------------------------------|
//! | Chassis ID     | subtype 4 (MAC), low 48 bits of chassis id    |
//! | Port ID        | subtype 2 (component), big-endian port number |
//! | TTL            | 120 seconds                                   |
//! | Org (name)     | OUI a4:23:05, subtype 1, probe marker string  |
//! | Org (device)   | OUI a4:23:05, subtype 2, device id (UTF-8)    |
//! | End            |                                               |
//!
//! The same payload is sent in two framings: primary probes go to the
//! reserved multicast address with the LLDP ether-type, broadcast-domain
//! probes go to `ff:ff:ff:ff:ff:ff` with the BDDP ether-type so that they
//! cross learning switches which would not forward the multicast one.

use super::constants::{
    CHASSIS_SUBTYPE_MAC, ETH_TYPE_BDDP, ETH_TYPE_LLDP, PORT_SUBTYPE_COMPONENT, PROBE_DEVICE_SUBTYPE,
    PROBE_NAME, PROBE_NAME_SUBTYPE, PROBE_OUI, PROBE_TTL_SECS, TLV_CHASSIS_ID, TLV_MAX_VALUE_LEN,
    TLV_PORT_ID, TLV_TTL,
};
use super::lldp::{Lldpdu, Tlv};
use super::{EthernetFrame, MacAddress, ParseError};
use crate::types::{ChassisId, DeviceId, PortNumber};

/// Decoded discovery payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryProbe {
    device: String,
    chassis_id: ChassisId,
    port: PortNumber,
}

impl DiscoveryProbe {
    pub fn new(device_id: &DeviceId, chassis_id: ChassisId, port: PortNumber) -> Self {
        Self {
            device: device_id.as_str().to_string(),
            chassis_id,
            port,
        }
    }

    /// Device identity as carried on the wire (may be empty on malformed probes).
    pub fn device_string(&self) -> &str {
        &self.device
    }

    pub fn chassis_id(&self) -> ChassisId {
        self.chassis_id
    }

    pub fn port(&self) -> PortNumber {
        self.port
    }

    /// Encode into an LLDPDU.
    pub fn to_lldpdu(&self) -> Result<Lldpdu, ParseError> {
        let mut pdu = Lldpdu::new();

        let mut chassis = Vec::with_capacity(7);
        chassis.push(CHASSIS_SUBTYPE_MAC);
        chassis.extend_from_slice(&self.chassis_id.value().to_be_bytes()[2..]);
        pdu.push(Tlv::new(TLV_CHASSIS_ID, chassis)?);

        let mut port = vec![PORT_SUBTYPE_COMPONENT];
        match u32::try_from(self.port.as_u64()) {
            Ok(p) => port.extend_from_slice(&p.to_be_bytes()),
            Err(_) => port.extend_from_slice(&self.port.as_u64().to_be_bytes()),
        }
        pdu.push(Tlv::new(TLV_PORT_ID, port)?);

        pdu.push(Tlv::new(TLV_TTL, PROBE_TTL_SECS.to_be_bytes().to_vec())?);
        pdu.push(Tlv::org_specific(
            PROBE_OUI,
            PROBE_NAME_SUBTYPE,
            PROBE_NAME.as_bytes(),
        )?);
        pdu.push(Tlv::org_specific(
            PROBE_OUI,
            PROBE_DEVICE_SUBTYPE,
            self.device.as_bytes(),
        )?);

        Ok(pdu)
    }

    /// Interpret an LLDPDU as a discovery probe.
    ///
    /// Returns `None` unless the name TLV carries the probe marker and a
    /// port TLV is present. A missing device TLV yields an empty device string.
    pub fn from_lldpdu(pdu: &Lldpdu) -> Option<Self> {
        let name = pdu.org_specific(PROBE_OUI, PROBE_NAME_SUBTYPE)?;
        if name != PROBE_NAME.as_bytes() {
            return None;
        }

        let port = pdu.find(TLV_PORT_ID).and_then(|t| decode_port(t.value()))?;

        let chassis_id = pdu
            .find(TLV_CHASSIS_ID)
            .and_then(|t| decode_chassis(t.value()))
            .unwrap_or_default();

        let device = pdu
            .org_specific(PROBE_OUI, PROBE_DEVICE_SUBTYPE)
            .map(|d| String::from_utf8_lossy(d).into_owned())
            .unwrap_or_default();

        Some(Self {
            device,
            chassis_id,
            port,
        })
    }

    /// Extract the probe from a parsed frame, if it is one.
    pub fn from_frame(frame: &EthernetFrame) -> Option<Self> {
        if frame.ether_type != ETH_TYPE_LLDP && frame.ether_type != ETH_TYPE_BDDP {
            return None;
        }
        let pdu = Lldpdu::parse(&frame.payload).ok()?;
        Self::from_lldpdu(&pdu)
    }
}

fn decode_port(value: &[u8]) -> Option<PortNumber> {
    let (&subtype, digits) = value.split_first()?;
    if subtype != PORT_SUBTYPE_COMPONENT || digits.is_empty() || digits.len() > 8 {
        return None;
    }
    let port = digits
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    Some(PortNumber(port))
}

fn decode_chassis(value: &[u8]) -> Option<ChassisId> {
    let (&subtype, mac) = value.split_first()?;
    if subtype != CHASSIS_SUBTYPE_MAC || mac.len() != 6 {
        return None;
    }
    let id = mac.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    Some(ChassisId(id))
}

/// Builds probe frames for one device.
#[derive(Debug, Clone)]
pub struct ProbeBuilder {
    device_id: DeviceId,
    chassis_id: ChassisId,
}

impl ProbeBuilder {
    /// Fails when the device id cannot fit in a single TLV.
    pub fn new(device_id: DeviceId, chassis_id: ChassisId) -> Result<Self, ParseError> {
        // OUI + subtype share the TLV with the device string.
        let max = TLV_MAX_VALUE_LEN - 4;
        if device_id.as_str().len() > max {
            return Err(ParseError::InvalidTlv(format!(
                "device id longer than {} bytes",
                max
            )));
        }
        Ok(Self {
            device_id,
            chassis_id,
        })
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Primary probe: reserved multicast destination, LLDP ether-type.
    pub fn build_lldp(
        &self,
        port: Option<PortNumber>,
        fingerprint: MacAddress,
    ) -> Option<EthernetFrame> {
        self.build(port, fingerprint, MacAddress::PROBE_MULTICAST, ETH_TYPE_LLDP)
    }

    /// Broadcast-domain probe: broadcast destination, BDDP ether-type.
    pub fn build_bddp(
        &self,
        port: Option<PortNumber>,
        fingerprint: MacAddress,
    ) -> Option<EthernetFrame> {
        self.build(port, fingerprint, MacAddress::BROADCAST, ETH_TYPE_BDDP)
    }

    fn build(
        &self,
        port: Option<PortNumber>,
        fingerprint: MacAddress,
        destination: MacAddress,
        ether_type: u16,
    ) -> Option<EthernetFrame> {
        let port = port?;
        let probe = DiscoveryProbe::new(&self.device_id, self.chassis_id, port);
        match probe.to_lldpdu() {
            Ok(pdu) => Some(EthernetFrame::new(
                destination,
                fingerprint,
                ether_type,
                pdu.encode(),
            )),
            Err(e) => {
                log::debug!(
                    "[probe] Failed to encode probe for {}@{}: {}",
                    port,
                    self.device_id,
                    e
                );
                None
            }
        }
    }
}
