// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Node-level owner of the discovery agents.
//!
//! The provider turns device/port events into agent lifecycle calls, routes
//! inbound frames to the agent of the receiving device and vanishes links
//! that stop being confirmed.
//!
//! ```text
//!   DeviceEvent ──▶ LinkProvider ──▶ LinkDiscovery (one per device)
//!                       │                  │
//!   InboundPacket ──────┘                  ├──▶ PacketService   (probes)
//!                                          └──▶ LinkProviderService (links)
//!   expire_stale_links() ──▶ StaleLinkTracker ──▶ link_vanished()
//! ```

mod stale;

pub use stale::StaleLinkTracker;

use crate::cluster::{fingerprint_mac, ClusterMetadata, ClusterMetadataService};
use crate::config::DiscoveryConfig;
use crate::discovery::{
    LinkDiscovery, LinkDiscoveryContext, LinkProviderService, MastershipService, PacketService,
    Timer, TopologyError,
};
use crate::error::AgentError;
use crate::packet::InboundPacket;
use crate::protocol::MacAddress;
use crate::types::{ConnectPoint, Device, DeviceId, LinkDescription, LinkKey, LinkType, Port, PortNumber};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Infrastructure change notifications fed to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    DeviceAdded {
        device: Device,
        ports: Vec<Port>,
    },
    DeviceAvailabilityChanged {
        device: Device,
        available: bool,
        ports: Vec<Port>,
    },
    DeviceRemoved(DeviceId),
    PortAdded {
        device_id: DeviceId,
        port: Port,
    },
    PortUpdated {
        device_id: DeviceId,
        port: Port,
    },
    PortRemoved {
        device_id: DeviceId,
        port: PortNumber,
    },
    MastershipChanged(DeviceId),
}

/// Collaborators wired into every agent.
#[derive(Clone)]
pub struct LinkProviderServices {
    pub mastership: Arc<dyn MastershipService>,
    /// `None` disables probe transmission (links can still be learned).
    pub packet: Option<Arc<dyn PacketService>>,
    pub topology: Arc<dyn LinkProviderService>,
    pub cluster: Arc<dyn ClusterMetadataService>,
}

/// Fingerprint together with the metadata it was derived from.
struct FingerprintCache {
    metadata: Option<ClusterMetadata>,
    mac: MacAddress,
}

struct ProviderContext {
    services: LinkProviderServices,
    stale: StaleLinkTracker,
    fingerprint: RwLock<FingerprintCache>,
    probe_rate: Duration,
    use_bddp: bool,
}

impl ProviderContext {
    fn derive_fingerprint(&self, metadata: Option<ClusterMetadata>) -> MacAddress {
        let mac = fingerprint_mac(metadata.as_ref());
        let mut cache = self.fingerprint.write();
        if cache.mac != mac {
            log::info!("[provider] Cluster fingerprint {} -> {}", cache.mac, mac);
        }
        *cache = FingerprintCache { metadata, mac };
        mac
    }
}

impl LinkDiscoveryContext for ProviderContext {
    fn mastership_service(&self) -> &dyn MastershipService {
        self.services.mastership.as_ref()
    }

    fn packet_service(&self) -> Option<&dyn PacketService> {
        self.services.packet.as_deref()
    }

    fn provider_service(&self) -> &dyn LinkProviderService {
        self.services.topology.as_ref()
    }

    fn touch_link(&self, key: LinkKey) {
        self.stale.touch(key);
    }

    /// Follows the current cluster membership; rehashed only when it changes.
    fn fingerprint(&self) -> MacAddress {
        let metadata = self.services.cluster.cluster_metadata();
        {
            let cache = self.fingerprint.read();
            if cache.metadata == metadata {
                return cache.mac;
            }
        }
        self.derive_fingerprint(metadata)
    }

    fn probe_rate(&self) -> Duration {
        self.probe_rate
    }

    fn use_bddp(&self) -> bool {
        self.use_bddp
    }
}

/// Owns one [`LinkDiscovery`] per available device.
pub struct LinkProvider {
    config: DiscoveryConfig,
    context: Arc<ProviderContext>,
    timer: Arc<Timer>,
    discoverers: DashMap<DeviceId, Arc<LinkDiscovery>>,
    active: AtomicBool,
}

impl LinkProvider {
    /// Validate `config` and start the shared timer. Call [`activate`]
    /// before feeding events.
    ///
    /// [`activate`]: LinkProvider::activate
    pub fn new(
        config: DiscoveryConfig,
        services: LinkProviderServices,
    ) -> Result<Arc<Self>, AgentError> {
        config.validate()?;

        let context = Arc::new(ProviderContext {
            services,
            stale: StaleLinkTracker::new(),
            fingerprint: RwLock::new(FingerprintCache {
                metadata: None,
                mac: MacAddress::DEFAULT_FINGERPRINT,
            }),
            probe_rate: config.probe_rate(),
            use_bddp: config.use_bddp,
        });
        let timer = Arc::new(Timer::new("linkdisc", config.timer_workers));

        Ok(Arc::new(Self {
            config,
            context,
            timer,
            discoverers: DashMap::new(),
            active: AtomicBool::new(false),
        }))
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn activate(&self) {
        if !self.config.enabled {
            log::info!("[provider] Link discovery disabled by configuration");
            return;
        }
        if self.active.swap(true, Ordering::AcqRel) {
            log::warn!("[provider] Already active");
            return;
        }
        let fingerprint = self.context.fingerprint();
        log::info!(
            "[provider] Activated (probe rate {:?}, bddp {}, fingerprint {})",
            self.config.probe_rate(),
            self.config.use_bddp,
            fingerprint
        );
    }

    /// Stop and forget every agent.
    pub fn deactivate(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        for entry in self.discoverers.iter() {
            if !entry.value().is_stopped() {
                entry.value().stop();
            }
        }
        self.discoverers.clear();
        log::info!("[provider] Deactivated");
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Current cluster fingerprint stamped on outgoing probes.
    pub fn fingerprint(&self) -> MacAddress {
        self.context.fingerprint()
    }

    pub fn discovery(&self, device_id: &DeviceId) -> Option<Arc<LinkDiscovery>> {
        self.discoverers
            .get(device_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn device_count(&self) -> usize {
        self.discoverers.len()
    }

    /// Links with a last-seen record.
    pub fn tracked_link_count(&self) -> usize {
        self.context.stale.len()
    }

    pub fn handle_device_event(&self, event: DeviceEvent) -> Result<(), AgentError> {
        if !self.config.enabled || !self.is_active() {
            log::trace!("[provider] Inactive, ignoring {:?}", event);
            return Ok(());
        }

        match event {
            DeviceEvent::DeviceAdded { device, ports }
            | DeviceEvent::DeviceAvailabilityChanged {
                device,
                available: true,
                ports,
            } => self.update_device(device, &ports)?,
            DeviceEvent::DeviceAvailabilityChanged {
                device,
                available: false,
                ..
            } => self.remove_device(&device.id),
            DeviceEvent::DeviceRemoved(device_id) => self.remove_device(&device_id),
            DeviceEvent::PortAdded { device_id, port }
            | DeviceEvent::PortUpdated { device_id, port } => {
                if port.enabled {
                    self.add_port(&device_id, port.number);
                } else {
                    self.remove_port(&device_id, port.number);
                }
            }
            DeviceEvent::PortRemoved { device_id, port } => self.remove_port(&device_id, port),
            DeviceEvent::MastershipChanged(device_id) => {
                // Agents re-check mastership every round.
                log::trace!("[provider] Mastership changed for {}", device_id);
            }
        }
        Ok(())
    }

    /// Route an inbound frame to the agent of the device it arrived on.
    ///
    /// Returns `true` if the frame was a discovery probe and was consumed.
    pub fn process_packet(&self, packet: &InboundPacket) -> bool {
        if !self.is_active() {
            return false;
        }
        // Release the shard lock before handling.
        let Some(agent) = self.discovery(&packet.received_from.device_id) else {
            return false;
        };
        agent.handle_lldp(packet)
    }

    /// Vanish links not confirmed within `stale_link_age_ms`. Returns the
    /// number of links expired.
    pub fn expire_stale_links(&self) -> usize {
        let expired = self.context.stale.expire(self.config.stale_link_age());
        for key in &expired {
            log::debug!("[provider] Link {} is stale", key);
            self.vanish(key);
        }
        expired.len()
    }

    fn update_device(&self, device: Device, ports: &[Port]) -> Result<(), AgentError> {
        let device_id = device.id.clone();
        let agent = match self.discovery(&device_id) {
            Some(agent) => {
                if agent.is_stopped() {
                    agent.start();
                }
                agent
            }
            None => {
                let context = Arc::clone(&self.context) as Arc<dyn LinkDiscoveryContext>;
                let agent = LinkDiscovery::new(device, context, Arc::clone(&self.timer))
                    .map_err(|source| AgentError::Probe {
                        device: device_id.clone(),
                        source,
                    })?;
                let agent = match self.discoverers.entry(device_id.clone()) {
                    dashmap::mapref::entry::Entry::Occupied(entry) => {
                        // Lost a creation race; keep the registered one.
                        agent.stop();
                        Arc::clone(entry.get())
                    }
                    dashmap::mapref::entry::Entry::Vacant(entry) => {
                        entry.insert(Arc::clone(&agent));
                        agent
                    }
                };
                log::debug!("[provider] Discovery started for {}", device_id);
                agent
            }
        };

        for port in ports.iter().filter(|p| p.enabled) {
            agent.add_port(port.number);
        }
        Ok(())
    }

    fn remove_device(&self, device_id: &DeviceId) {
        if let Some((_, agent)) = self.discoverers.remove(device_id) {
            if !agent.is_stopped() {
                agent.stop();
            }
            log::debug!("[provider] Discovery stopped for {}", device_id);
        }
        for key in self.context.stale.remove_device(device_id) {
            self.vanish(&key);
        }
    }

    fn add_port(&self, device_id: &DeviceId, port: PortNumber) {
        match self.discovery(device_id) {
            Some(agent) => agent.add_port(port),
            None => log::trace!("[provider] No discovery for {}, port {} ignored", device_id, port),
        }
    }

    fn remove_port(&self, device_id: &DeviceId, port: PortNumber) {
        if let Some(agent) = self.discovery(device_id) {
            agent.remove_port(port);
        }
        let cp = ConnectPoint::new(device_id.clone(), port);
        for key in self.context.stale.remove_connect_point(&cp) {
            self.vanish(&key);
        }
    }

    /// Vanish both directions of `key`. Stores match on endpoints; the link
    /// type carried here is not significant.
    fn vanish(&self, key: &LinkKey) {
        let (a, b) = key.endpoints();
        for (src, dst) in [(a, b), (b, a)] {
            let link = LinkDescription::new(src.clone(), dst.clone(), LinkType::Direct);
            match self.context.services.topology.link_vanished(&link) {
                Ok(()) => {}
                Err(TopologyError::InvalidState(reason)) => {
                    log::debug!("[provider] Vanish of {} skipped: {}", link, reason);
                }
                Err(e) => log::warn!("[provider] Vanish of {} failed: {}", link, e),
            }
        }
    }
}

impl Drop for LinkProvider {
    fn drop(&mut self) {
        self.deactivate();
        self.timer.stop();
    }
}

impl std::fmt::Debug for LinkProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkProvider")
            .field("active", &self.is_active())
            .field("devices", &self.device_count())
            .field("config", &self.config)
            .finish()
    }
}
