// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-device link discovery agent.
//!
//! Every `probe_rate` the agent sends an LLDP probe (and optionally a BDDP
//! probe) out of each registered port, provided this node masters the
//! device. Probes received back are classified and reported as links:
//!
//! | Source MAC == our fingerprint | Ether-type | Link type  |
//! |-------------------------------|------------|------------|
//! | no (or fingerprint unknown)   | any        | `Edge`     |
//! | yes                           | LLDP       | `Direct`   |
//! | yes                           | BDDP       | `Indirect` |
//!
//! All registered ports are probed every round; there is no fast/slow split.

use super::context::{LinkDiscoveryContext, TopologyError};
use super::ports::PortRegistry;
use super::timer::{Timeout, Timer};
use crate::packet::{InboundPacket, OutboundPacket};
use crate::protocol::constants::ETH_TYPE_LLDP;
use crate::protocol::{DiscoveryProbe, MacAddress, ParseError, ProbeBuilder};
use crate::types::{ConnectPoint, Device, DeviceId, LinkDescription, LinkKey, LinkType, PortNumber};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Scheduler state; start, stop and the round's reschedule step all run
/// under this one lock.
struct SchedulerState {
    stopped: bool,
    timeout: Option<Timeout>,
    /// Bumped on every start so rounds from an earlier run exit quietly.
    generation: u64,
}

/// Counters for one agent.
#[derive(Debug, Default)]
pub struct DiscoveryStats {
    rounds: AtomicU64,
    probes_sent: AtomicU64,
    links_reported: AtomicU64,
    report_races: AtomicU64,
}

/// Point-in-time copy of [`DiscoveryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryStatsSnapshot {
    pub rounds: u64,
    pub probes_sent: u64,
    pub links_reported: u64,
    pub report_races: u64,
}

impl DiscoveryStats {
    pub fn snapshot(&self) -> DiscoveryStatsSnapshot {
        DiscoveryStatsSnapshot {
            rounds: self.rounds.load(Ordering::Relaxed),
            probes_sent: self.probes_sent.load(Ordering::Relaxed),
            links_reported: self.links_reported.load(Ordering::Relaxed),
            report_races: self.report_races.load(Ordering::Relaxed),
        }
    }
}

/// Discovery agent for one physical switch.
pub struct LinkDiscovery {
    device: Device,
    context: Arc<dyn LinkDiscoveryContext>,
    timer: Arc<Timer>,
    probes: ProbeBuilder,
    ports: PortRegistry,
    state: Mutex<SchedulerState>,
    stats: DiscoveryStats,
    self_ref: Weak<LinkDiscovery>,
}

impl LinkDiscovery {
    /// Create the agent and start it; the first round runs immediately.
    ///
    /// Fails only if the device id is too long to fit in a probe.
    pub fn new(
        device: Device,
        context: Arc<dyn LinkDiscoveryContext>,
        timer: Arc<Timer>,
    ) -> Result<Arc<Self>, ParseError> {
        let probes = ProbeBuilder::new(device.id.clone(), device.chassis_id)?;

        let agent = Arc::new_cyclic(|self_ref| Self {
            device,
            context,
            timer,
            probes,
            ports: PortRegistry::new(),
            state: Mutex::new(SchedulerState {
                stopped: true,
                timeout: None,
                generation: 0,
            }),
            stats: DiscoveryStats::default(),
            self_ref: self_ref.clone(),
        });

        agent.start();
        log::debug!(
            "[link_discovery] Started discovery manager for switch {}",
            agent.device.id
        );
        Ok(agent)
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device.id
    }

    /// Resume probing with an immediate round. No-op (with a warning) when
    /// already running.
    ///
    /// A pending round cancelled behind our back counts as stopped, so the
    /// chain is rearmed.
    pub fn start(&self) {
        let mut state = self.state.lock();
        let cancelled = state.timeout.as_ref().is_some_and(Timeout::is_cancelled);
        if state.stopped || cancelled {
            if !state.stopped {
                log::debug!(
                    "[link_discovery] Rearming discovery for {} after a cancelled round",
                    self.device.id
                );
            }
            state.stopped = false;
            state.generation = state.generation.wrapping_add(1);
            let generation = state.generation;
            let timeout = self.schedule_round(Duration::ZERO, generation);
            if timeout.is_cancelled() {
                log::warn!(
                    "[link_discovery] Timer is stopped, discovery for {} cannot run",
                    self.device.id
                );
            }
            state.timeout = Some(timeout);
        } else {
            log::warn!(
                "[link_discovery] Discovery for {} started multiple times?",
                self.device.id
            );
        }
    }

    /// Cancel the pending round. A round already executing finishes but does
    /// not reschedule. No-op (with a warning) when already stopped.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if !state.stopped {
            state.stopped = true;
            if let Some(timeout) = state.timeout.take() {
                timeout.cancel();
            }
        } else {
            log::warn!(
                "[link_discovery] Discovery for {} stopped multiple times?",
                self.device.id
            );
        }
    }

    /// Stopped, or the pending round was cancelled behind our back
    /// (e.g. the timer service shut down).
    pub fn is_stopped(&self) -> bool {
        let state = self.state.lock();
        state.stopped || state.timeout.as_ref().is_some_and(Timeout::is_cancelled)
    }

    /// Register a port. A new port on a device we master is probed right
    /// away instead of waiting for the next round.
    pub fn add_port(&self, port: PortNumber) {
        let new_port = self.ports.add(port);
        let is_master = self
            .context
            .mastership_service()
            .is_local_master(&self.device.id);
        if new_port && is_master {
            log::debug!(
                "[link_discovery] Sending initial probe to port {}@{}",
                port,
                self.device.id
            );
            self.send_probes(port);
        }
    }

    pub fn remove_port(&self, port: PortNumber) {
        self.ports.remove(port);
    }

    pub fn contains_port(&self, port: PortNumber) -> bool {
        self.ports.contains(port)
    }

    /// Ports currently under discovery.
    pub fn ports(&self) -> Vec<PortNumber> {
        self.ports.snapshot()
    }

    pub fn stats(&self) -> DiscoveryStatsSnapshot {
        self.stats.snapshot()
    }

    /// Emit the LLDP probe, and the BDDP probe when enabled, out of `port`.
    pub fn send_probes(&self, port: PortNumber) {
        let Some(packet_service) = self.context.packet_service() else {
            return;
        };
        log::trace!(
            "[link_discovery] Sending probes out of {}@{}",
            port,
            self.device.id
        );

        let fingerprint = self.context.fingerprint();
        if let Some(frame) = self.probes.build_lldp(Some(port), fingerprint) {
            packet_service.emit(OutboundPacket::new(self.device.id.clone(), port, &frame));
            self.stats.probes_sent.fetch_add(1, Ordering::Relaxed);
        }
        if self.context.use_bddp() {
            if let Some(frame) = self.probes.build_bddp(Some(port), fingerprint) {
                packet_service.emit(OutboundPacket::new(self.device.id.clone(), port, &frame));
                self.stats.probes_sent.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Interpret an inbound frame.
    ///
    /// Returns `false` when the frame is not one of our discovery probes (or
    /// carries no device identity) so other consumers may process it, `true`
    /// once a link description was built, even if reporting it lost a race
    /// with a topology change.
    pub fn handle_lldp(&self, packet: &InboundPacket) -> bool {
        let Some(eth) = packet.parsed() else {
            return false;
        };
        let Some(probe) = DiscoveryProbe::from_frame(&eth) else {
            return false;
        };

        let link_type = if self.not_my(eth.source) {
            LinkType::Edge
        } else if eth.ether_type == ETH_TYPE_LLDP {
            LinkType::Direct
        } else {
            LinkType::Indirect
        };

        let id_string = probe.device_string();
        if id_string.is_empty() {
            return false;
        }

        // Where the probe claims to come from vs. where it physically arrived.
        let src = ConnectPoint::new(DeviceId::from(id_string), probe.port());
        let dst = packet.received_from.clone();
        let link = LinkDescription::new(src.clone(), dst.clone(), link_type);

        match self.context.provider_service().link_detected(&link) {
            Ok(()) => {
                self.stats.links_reported.fetch_add(1, Ordering::Relaxed);
                log::trace!("[link_discovery] Link detected: {}", link);
            }
            Err(TopologyError::InvalidState(reason)) => {
                self.stats.report_races.fetch_add(1, Ordering::Relaxed);
                log::debug!(
                    "[link_discovery] Link {} raced a topology change: {}",
                    link,
                    reason
                );
            }
            Err(e) => {
                log::warn!("[link_discovery] Link {} not reported: {}", link, e);
            }
        }

        self.context.touch_link(LinkKey::new(src, dst));
        true
    }

    /// True if the frame was *not* sent by this cluster.
    fn not_my(&self, source: MacAddress) -> bool {
        let ours = self.context.fingerprint();
        // Clustering not initialized yet: never claim a probe as our own.
        if ours == MacAddress::DEFAULT_FINGERPRINT {
            return true;
        }
        source != ours
    }

    fn schedule_round(&self, delay: Duration, generation: u64) -> Timeout {
        let agent = self.self_ref.clone();
        self.timer.new_timeout(delay, move || {
            if let Some(agent) = agent.upgrade() {
                agent.run(generation);
            }
        })
    }

    /// One probe round, then reschedule while still running.
    fn run(&self, generation: u64) {
        {
            let state = self.state.lock();
            if state.stopped || state.generation != generation {
                return;
            }
        }

        if self
            .context
            .mastership_service()
            .is_local_master(&self.device.id)
        {
            log::trace!("[link_discovery] Sending probes from {}", self.device.id);
            for port in self.ports.snapshot() {
                self.send_probes(port);
            }
        }
        self.stats.rounds.fetch_add(1, Ordering::Relaxed);

        let mut state = self.state.lock();
        if !state.stopped && state.generation == generation {
            state.timeout = Some(self.schedule_round(self.context.probe_rate(), generation));
        }
    }
}

impl Drop for LinkDiscovery {
    fn drop(&mut self) {
        if let Some(timeout) = self.state.get_mut().timeout.take() {
            timeout.cancel();
        }
    }
}

impl std::fmt::Debug for LinkDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkDiscovery")
            .field("device", &self.device.id)
            .field("ports", &self.ports.len())
            .field("stopped", &self.state.lock().stopped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::context::{LinkProviderService, MastershipService, PacketService};

    struct Idle;

    impl MastershipService for Idle {
        fn is_local_master(&self, _device_id: &DeviceId) -> bool {
            false
        }
    }

    impl LinkProviderService for Idle {
        fn link_detected(&self, _link: &LinkDescription) -> Result<(), TopologyError> {
            Ok(())
        }

        fn link_vanished(&self, _link: &LinkDescription) -> Result<(), TopologyError> {
            Ok(())
        }
    }

    impl LinkDiscoveryContext for Idle {
        fn mastership_service(&self) -> &dyn MastershipService {
            self
        }

        fn packet_service(&self) -> Option<&dyn PacketService> {
            None
        }

        fn provider_service(&self) -> &dyn LinkProviderService {
            self
        }

        fn touch_link(&self, _key: LinkKey) {}

        fn fingerprint(&self) -> MacAddress {
            MacAddress::DEFAULT_FINGERPRINT
        }

        fn probe_rate(&self) -> Duration {
            Duration::from_secs(3600)
        }

        fn use_bddp(&self) -> bool {
            false
        }
    }

    fn wait_for(cond: impl Fn() -> bool) -> bool {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while std::time::Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    #[test]
    fn test_start_rearms_cancelled_round() {
        let timer = Arc::new(Timer::new("test", 1));
        let agent =
            LinkDiscovery::new(Device::new("of:1", 1), Arc::new(Idle), Arc::clone(&timer)).unwrap();
        assert!(wait_for(|| agent.stats().rounds >= 1 && timer.pending_count() == 1));

        let pending = agent.state.lock().timeout.clone().unwrap();
        assert!(pending.cancel());
        assert!(agent.is_stopped());
        assert_eq!(timer.pending_count(), 0);

        agent.start();
        assert!(!agent.is_stopped());
        assert!(wait_for(|| agent.stats().rounds >= 2 && timer.pending_count() == 1));
    }

    #[test]
    fn test_start_on_stopped_timer_stays_stopped() {
        let timer = Arc::new(Timer::new("test", 1));
        let agent =
            LinkDiscovery::new(Device::new("of:1", 1), Arc::new(Idle), Arc::clone(&timer)).unwrap();
        timer.stop();
        assert!(agent.is_stopped());

        agent.start();
        assert!(agent.is_stopped());
        assert_eq!(timer.pending_count(), 0);
    }
}
