// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Collaborator contracts consumed by a discovery agent.

use crate::packet::OutboundPacket;
use crate::protocol::MacAddress;
use crate::types::{DeviceId, LinkDescription, LinkKey};
use std::time::Duration;
use thiserror::Error;

/// Device ownership among controller nodes.
pub trait MastershipService: Send + Sync {
    /// Must be cheap: queried once per round and on every port add.
    fn is_local_master(&self, device_id: &DeviceId) -> bool;
}

/// Frame transmission (fire-and-forget).
pub trait PacketService: Send + Sync {
    fn emit(&self, packet: OutboundPacket);
}

/// Topology store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// Device or port vanished concurrently with discovery.
    #[error("invalid topology state: {0}")]
    InvalidState(String),

    #[error("link rejected: {0}")]
    Rejected(String),
}

/// Topology store the discovered links are reported to.
pub trait LinkProviderService: Send + Sync {
    fn link_detected(&self, link: &LinkDescription) -> Result<(), TopologyError>;

    fn link_vanished(&self, link: &LinkDescription) -> Result<(), TopologyError>;
}

/// Everything an agent needs from its surroundings.
pub trait LinkDiscoveryContext: Send + Sync {
    fn mastership_service(&self) -> &dyn MastershipService;

    /// `None` while the transport is unavailable; probes are skipped.
    fn packet_service(&self) -> Option<&dyn PacketService>;

    fn provider_service(&self) -> &dyn LinkProviderService;

    /// Refresh staleness bookkeeping for a link.
    fn touch_link(&self, key: LinkKey);

    /// Cluster fingerprint, [`MacAddress::DEFAULT_FINGERPRINT`] until known.
    fn fingerprint(&self) -> MacAddress;

    fn probe_rate(&self) -> Duration;

    /// Also send broadcast-domain (BDDP) probes.
    fn use_bddp(&self) -> bool;
}
