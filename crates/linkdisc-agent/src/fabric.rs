// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Simulated switch fabric: wires, mastership.

use crate::config::AgentConfig;
use linkdisc::protocol::constants::ETH_TYPE_BDDP;
use linkdisc::{
    ConnectPoint, DeviceId, InboundPacket, MastershipService, OutboundPacket, PacketService,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Medium {
    Cable,
    Legacy,
}

/// Delivers every emitted frame to the far end of its wire.
///
/// Emission happens on timer threads; delivered frames are queued on an
/// unbounded channel consumed by the agent's packet-in task.
pub struct LoopbackFabric {
    wires: HashMap<ConnectPoint, (ConnectPoint, Medium)>,
    deliver: UnboundedSender<InboundPacket>,
    emitted: AtomicU64,
    delivered: AtomicU64,
}

impl LoopbackFabric {
    pub fn new(config: &AgentConfig, deliver: UnboundedSender<InboundPacket>) -> Self {
        let mut wires = HashMap::new();
        for link in &config.links {
            let medium = if link.legacy {
                Medium::Legacy
            } else {
                Medium::Cable
            };
            let (a, b) = (link.a.connect_point(), link.b.connect_point());
            wires.insert(a.clone(), (b.clone(), medium));
            wires.insert(b, (a, medium));
        }
        Self {
            wires,
            deliver,
            emitted: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
        }
    }

    /// (emitted, delivered) frame counts.
    pub fn counters(&self) -> (u64, u64) {
        (
            self.emitted.load(Ordering::Relaxed),
            self.delivered.load(Ordering::Relaxed),
        )
    }
}

impl PacketService for LoopbackFabric {
    fn emit(&self, packet: OutboundPacket) {
        self.emitted.fetch_add(1, Ordering::Relaxed);

        let from = ConnectPoint::new(packet.device_id.clone(), packet.output);
        let Some((to, medium)) = self.wires.get(&from) else {
            tracing::trace!("{} is not wired, frame dropped", from);
            return;
        };
        // Legacy switches flood broadcasts but do not forward LLDP.
        if *medium == Medium::Legacy
            && packet.parsed().map(|f| f.ether_type) != Some(ETH_TYPE_BDDP)
        {
            return;
        }

        if self
            .deliver
            .send(InboundPacket::new(to.clone(), packet.data))
            .is_ok()
        {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// This node masters a fixed set of devices.
pub struct StaticMastership {
    mastered: HashSet<DeviceId>,
}

impl StaticMastership {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            mastered: config
                .devices
                .iter()
                .filter(|d| d.master)
                .map(|d| DeviceId::new(d.id.as_str()))
                .collect(),
        }
    }
}

impl MastershipService for StaticMastership {
    fn is_local_master(&self, device_id: &DeviceId) -> bool {
        self.mastered.contains(device_id)
    }
}
