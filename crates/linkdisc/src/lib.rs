// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # linkdisc - LLDP/BDDP link discovery for SDN controllers
//!
//! Each switch managed by a controller node gets a [`LinkDiscovery`] agent.
//! The agent periodically sends a probe out of every port of the switch; a
//! probe that comes back in on another port proves a link between the two.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use linkdisc::{
//!     DeviceEvent, DiscoveryConfig, LinkProvider, LinkProviderServices, TopologyStore,
//! };
//! # use linkdisc::{DeviceId, MastershipService, StaticClusterMetadata};
//! # use std::sync::Arc;
//! # struct AllMaster;
//! # impl MastershipService for AllMaster {
//! #     fn is_local_master(&self, _: &DeviceId) -> bool { true }
//! # }
//!
//! # fn main() -> Result<(), linkdisc::AgentError> {
//! let store = Arc::new(TopologyStore::new());
//! let provider = LinkProvider::new(
//!     DiscoveryConfig::default(),
//!     LinkProviderServices {
//!         mastership: Arc::new(AllMaster),
//!         packet: None,
//!         topology: store.clone(),
//!         cluster: Arc::new(StaticClusterMetadata::default()),
//!     },
//! )?;
//! provider.activate();
//! provider.handle_device_event(DeviceEvent::DeviceAdded {
//!     device: linkdisc::Device::new("of:0000000000000001", 1),
//!     ports: vec![linkdisc::Port::new(1, true)],
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +-------------------------------------------------------------------+
//! |  provider   LinkProvider: device/port events, packet routing,     |
//! |             stale link expiry                                     |
//! +-------------------------------------------------------------------+
//! |  discovery  LinkDiscovery (per device) | PortRegistry | Timer     |
//! +-------------------------------------------------------------------+
//! |  protocol   Ethernet framing | LLDPDU TLVs | discovery probes     |
//! +-------------------------------------------------------------------+
//! ```
//!
//! ## Link classification
//!
//! | Probe source MAC        | Ether-type | Link       |
//! |-------------------------|------------|------------|
//! | our cluster fingerprint | `0x88cc`   | `DIRECT`   |
//! | our cluster fingerprint | `0x8942`   | `INDIRECT` |
//! | anything else           | either     | `EDGE`     |

/// Cluster identity and probe fingerprint.
pub mod cluster;
/// Discovery settings.
pub mod config;
/// Per-device discovery agents and their collaborators.
pub mod discovery;
mod error;
/// Link event fan-out.
pub mod event;
/// Packet envelopes exchanged with the transport.
pub mod packet;
/// Wire formats: Ethernet, LLDP, discovery probes.
pub mod protocol;
/// Node-level agent ownership.
pub mod provider;
/// In-process link store.
pub mod topology;
/// Network identifiers and link descriptions.
pub mod types;

pub use cluster::{fingerprint_mac, ClusterMetadata, ClusterMetadataService, StaticClusterMetadata};
pub use config::{ConfigError, DiscoveryConfig};
pub use discovery::{
    LinkDiscovery, LinkDiscoveryContext, LinkProviderService, MastershipService, PacketService,
    Timer, TopologyError,
};
pub use error::AgentError;
pub use event::{EventDispatcher, LinkEvent, SubscriptionId};
pub use packet::{InboundPacket, OutboundPacket};
pub use protocol::{DiscoveryProbe, EthernetFrame, MacAddress, ParseError, ProbeBuilder};
pub use provider::{DeviceEvent, LinkProvider, LinkProviderServices, StaleLinkTracker};
pub use topology::TopologyStore;
pub use types::{
    ChassisId, ConnectPoint, Device, DeviceId, LinkDescription, LinkKey, LinkType, Port,
    PortNumber,
};
