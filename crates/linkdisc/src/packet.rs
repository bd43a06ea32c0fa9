// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Packet-out / packet-in envelopes exchanged with the transport.

use crate::protocol::EthernetFrame;
use crate::types::{ConnectPoint, DeviceId, PortNumber};

/// Frame to transmit out of one port of a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPacket {
    pub device_id: DeviceId,
    pub output: PortNumber,
    pub data: Vec<u8>,
}

impl OutboundPacket {
    pub fn new(device_id: DeviceId, output: PortNumber, frame: &EthernetFrame) -> Self {
        Self {
            device_id,
            output,
            data: frame.serialize(),
        }
    }

    /// Re-parse the serialized frame.
    pub fn parsed(&self) -> Option<EthernetFrame> {
        EthernetFrame::parse(&self.data).ok()
    }
}

/// Frame received by a device, tagged with where it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundPacket {
    pub received_from: ConnectPoint,
    pub data: Vec<u8>,
}

impl InboundPacket {
    pub fn new(received_from: ConnectPoint, data: Vec<u8>) -> Self {
        Self {
            received_from,
            data,
        }
    }

    /// Structured view of the frame, `None` if it is not valid Ethernet.
    pub fn parsed(&self) -> Option<EthernetFrame> {
        match EthernetFrame::parse(&self.data) {
            Ok(frame) => Some(frame),
            Err(e) => {
                log::trace!(
                    "[packet] Unparseable frame from {}: {}",
                    self.received_from,
                    e
                );
                None
            }
        }
    }
}
