// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-device probing and link classification.

mod context;
mod link_discovery;
mod ports;
pub mod timer;


pub use context::{
    LinkDiscoveryContext, LinkProviderService, MastershipService, PacketService, TopologyError,
};
pub use link_discovery::{DiscoveryStats, DiscoveryStatsSnapshot, LinkDiscovery};
pub use ports::PortRegistry;
pub use timer::{Timeout, Timer};
