// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end discovery over an in-memory switch fabric.

use linkdisc::protocol::constants::ETH_TYPE_BDDP;
use linkdisc::{
    fingerprint_mac, ChassisId, ClusterMetadata, ConnectPoint, Device, DeviceEvent, DeviceId,
    DiscoveryConfig, EthernetFrame, InboundPacket, LinkDescription, LinkEvent, LinkProvider,
    LinkProviderService, LinkProviderServices, LinkType, MacAddress, MastershipService,
    OutboundPacket, PacketService, Port, PortNumber, ProbeBuilder, StaticClusterMetadata,
    TopologyStore,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Medium {
    /// Point-to-point cable: every frame crosses.
    Cable,
    /// Non-OpenFlow switch in between: only broadcast (BDDP) probes cross.
    Legacy,
}

/// Wiring plus a queue of frames in flight.
#[derive(Default)]
struct Fabric {
    wires: Mutex<HashMap<ConnectPoint, (ConnectPoint, Medium)>>,
    in_flight: Mutex<VecDeque<InboundPacket>>,
    emitted: AtomicUsize,
}

impl Fabric {
    fn connect(&self, a: ConnectPoint, b: ConnectPoint, medium: Medium) {
        let mut wires = self.wires.lock();
        wires.insert(a.clone(), (b.clone(), medium));
        wires.insert(b, (a, medium));
    }

    /// Deliver everything in flight; returns how many frames were consumed.
    fn pump(&self, provider: &LinkProvider) -> usize {
        let batch: Vec<InboundPacket> = self.in_flight.lock().drain(..).collect();
        batch
            .iter()
            .filter(|packet| provider.process_packet(packet))
            .count()
    }

    fn drop_in_flight(&self) {
        self.in_flight.lock().clear();
    }
}

impl PacketService for Fabric {
    fn emit(&self, packet: OutboundPacket) {
        self.emitted.fetch_add(1, Ordering::SeqCst);
        let from = ConnectPoint::new(packet.device_id.clone(), packet.output);
        let Some((to, medium)) = self.wires.lock().get(&from).cloned() else {
            return;
        };
        let is_bddp = packet.parsed().map(|f| f.ether_type) == Some(ETH_TYPE_BDDP);
        if medium == Medium::Cable || is_bddp {
            self.in_flight
                .lock()
                .push_back(InboundPacket::new(to, packet.data));
        }
    }
}

struct Mastership(AtomicBool);

impl MastershipService for Mastership {
    fn is_local_master(&self, _device_id: &DeviceId) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct Harness {
    provider: Arc<LinkProvider>,
    store: Arc<TopologyStore>,
    fabric: Arc<Fabric>,
    events: Arc<Mutex<Vec<LinkEvent>>>,
}

fn cluster() -> ClusterMetadata {
    ClusterMetadata::new("fabric-test", vec!["node-1".into(), "node-2".into()])
}

fn cp(dev: &str, port: u64) -> ConnectPoint {
    ConnectPoint::new(dev, port)
}

fn harness(config: DiscoveryConfig, master: bool, metadata: Option<ClusterMetadata>) -> Harness {
    let store = Arc::new(TopologyStore::new());
    let fabric = Arc::new(Fabric::default());
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    store
        .events()
        .subscribe(move |e: &LinkEvent| sink.lock().push(e.clone()));

    let provider = LinkProvider::new(
        config,
        LinkProviderServices {
            mastership: Arc::new(Mastership(AtomicBool::new(master))),
            packet: Some(Arc::clone(&fabric) as Arc<dyn PacketService>),
            topology: Arc::clone(&store) as Arc<dyn LinkProviderService>,
            cluster: Arc::new(StaticClusterMetadata::new(metadata)),
        },
    )
    .unwrap();
    provider.activate();

    Harness {
        provider,
        store,
        fabric,
        events,
    }
}

/// Rounds effectively only run once; probes come from port additions.
fn quiet() -> DiscoveryConfig {
    DiscoveryConfig {
        probe_rate_ms: 3_600_000,
        stale_link_age_ms: 3_600_000,
        timer_workers: 2,
        ..Default::default()
    }
}

impl Harness {
    fn add_switch(&self, id: &str, chassis: u64, ports: &[u64]) {
        for port in ports {
            self.store.add_connect_point(cp(id, *port));
        }
        self.provider
            .handle_device_event(DeviceEvent::DeviceAdded {
                device: Device::new(id, chassis),
                ports: ports.iter().map(|p| Port::new(*p, true)).collect(),
            })
            .unwrap();
    }

    fn link(&self, src: ConnectPoint, dst: ConnectPoint) -> Option<LinkType> {
        self.store.get(&src, &dst).map(|l| l.link_type)
    }
}

fn wait_for(limit: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

#[test]
fn test_cable_yields_direct_links_both_ways() {
    let h = harness(quiet(), true, Some(cluster()));
    h.fabric.connect(cp("of:1", 1), cp("of:2", 1), Medium::Cable);
    h.add_switch("of:1", 1, &[1]);
    h.add_switch("of:2", 2, &[1]);

    assert!(h.fabric.pump(&h.provider) > 0);

    assert_eq!(h.link(cp("of:1", 1), cp("of:2", 1)), Some(LinkType::Direct));
    assert_eq!(h.link(cp("of:2", 1), cp("of:1", 1)), Some(LinkType::Direct));
    assert_eq!(h.store.link_count(), 2);
    assert_eq!(h.provider.tracked_link_count(), 1);
}

#[test]
fn test_legacy_segment_yields_indirect_links() {
    let h = harness(quiet(), true, Some(cluster()));
    h.fabric.connect(cp("of:1", 2), cp("of:3", 1), Medium::Legacy);
    h.add_switch("of:1", 1, &[2]);
    h.add_switch("of:3", 3, &[1]);

    h.fabric.pump(&h.provider);

    assert_eq!(h.link(cp("of:1", 2), cp("of:3", 1)), Some(LinkType::Indirect));
    assert_eq!(h.link(cp("of:3", 1), cp("of:1", 2)), Some(LinkType::Indirect));
}

#[test]
fn test_legacy_segment_invisible_without_bddp() {
    let config = DiscoveryConfig {
        use_bddp: false,
        ..quiet()
    };
    let h = harness(config, true, Some(cluster()));
    h.fabric.connect(cp("of:1", 2), cp("of:3", 1), Medium::Legacy);
    h.add_switch("of:1", 1, &[2]);
    h.add_switch("of:3", 3, &[1]);

    assert_eq!(h.fabric.pump(&h.provider), 0);
    assert_eq!(h.store.link_count(), 0);
}

#[test]
fn test_mixed_fabric() {
    let h = harness(quiet(), true, Some(cluster()));
    h.fabric.connect(cp("of:1", 1), cp("of:2", 1), Medium::Cable);
    h.fabric.connect(cp("of:2", 2), cp("of:3", 1), Medium::Cable);
    h.fabric.connect(cp("of:1", 2), cp("of:3", 2), Medium::Legacy);
    h.add_switch("of:1", 1, &[1, 2]);
    h.add_switch("of:2", 2, &[1, 2]);
    h.add_switch("of:3", 3, &[1, 2]);

    h.fabric.pump(&h.provider);

    let links = h.store.links();
    assert_eq!(links.len(), 6);
    let direct = links
        .iter()
        .filter(|l| l.link_type == LinkType::Direct)
        .count();
    assert_eq!(direct, 4);
    assert_eq!(h.link(cp("of:3", 2), cp("of:1", 2)), Some(LinkType::Indirect));
}

#[test]
fn test_probe_from_foreign_cluster_is_edge() {
    let h = harness(quiet(), true, Some(cluster()));
    h.add_switch("of:1", 1, &[3]);

    let foreign = fingerprint_mac(Some(&ClusterMetadata::new("other", vec![])));
    assert_ne!(foreign, h.provider.fingerprint());
    let frame = ProbeBuilder::new(DeviceId::from("ext:9"), ChassisId(9))
        .unwrap()
        .build_lldp(Some(PortNumber(4)), foreign)
        .unwrap();

    assert!(h
        .provider
        .process_packet(&InboundPacket::new(cp("of:1", 3), frame.serialize())));
    assert_eq!(h.link(cp("ext:9", 4), cp("of:1", 3)), Some(LinkType::Edge));
}

#[test]
fn test_uninitialized_cluster_reports_edges() {
    let h = harness(quiet(), true, None);
    assert_eq!(h.provider.fingerprint(), MacAddress::DEFAULT_FINGERPRINT);
    h.fabric.connect(cp("of:1", 1), cp("of:2", 1), Medium::Cable);
    h.add_switch("of:1", 1, &[1]);
    h.add_switch("of:2", 2, &[1]);

    h.fabric.pump(&h.provider);

    assert_eq!(h.link(cp("of:1", 1), cp("of:2", 1)), Some(LinkType::Edge));
    assert_eq!(h.link(cp("of:2", 1), cp("of:1", 1)), Some(LinkType::Edge));
}

#[test]
fn test_not_master_sends_nothing() {
    let config = DiscoveryConfig {
        probe_rate_ms: 10,
        stale_link_age_ms: 1000,
        timer_workers: 1,
        ..Default::default()
    };
    let h = harness(config, false, Some(cluster()));
    h.fabric.connect(cp("of:1", 1), cp("of:2", 1), Medium::Cable);
    h.add_switch("of:1", 1, &[1]);
    h.add_switch("of:2", 2, &[1]);

    let agent = h.provider.discovery(&DeviceId::from("of:1")).unwrap();
    assert!(wait_for(Duration::from_secs(5), || agent.stats().rounds >= 3));
    assert_eq!(h.fabric.emitted.load(Ordering::SeqCst), 0);
    assert_eq!(h.fabric.pump(&h.provider), 0);
}

#[test]
fn test_periodic_rounds_keep_probing() {
    let config = DiscoveryConfig {
        probe_rate_ms: 10,
        stale_link_age_ms: 1000,
        timer_workers: 2,
        ..Default::default()
    };
    let h = harness(config, true, Some(cluster()));
    h.add_switch("of:1", 1, &[1, 2]);

    // 2 ports x (LLDP + BDDP) per round, plus the initial port probes.
    assert!(wait_for(Duration::from_secs(5), || h
        .fabric
        .emitted
        .load(Ordering::SeqCst)
        >= 16));
}

#[test]
fn test_port_removal_vanishes_link() {
    let h = harness(quiet(), true, Some(cluster()));
    h.fabric.connect(cp("of:1", 1), cp("of:2", 1), Medium::Cable);
    h.add_switch("of:1", 1, &[1]);
    h.add_switch("of:2", 2, &[1]);
    h.fabric.pump(&h.provider);
    assert_eq!(h.store.link_count(), 2);

    h.provider
        .handle_device_event(DeviceEvent::PortRemoved {
            device_id: DeviceId::from("of:2"),
            port: PortNumber(1),
        })
        .unwrap();

    assert_eq!(h.store.link_count(), 0);
    assert_eq!(h.provider.tracked_link_count(), 0);
    let vanished = h
        .events
        .lock()
        .iter()
        .filter(|e| matches!(e, LinkEvent::LinkVanished(_)))
        .count();
    assert_eq!(vanished, 2);
}

#[test]
fn test_device_removal_vanishes_links() {
    let h = harness(quiet(), true, Some(cluster()));
    h.fabric.connect(cp("of:1", 1), cp("of:2", 1), Medium::Cable);
    h.fabric.connect(cp("of:2", 2), cp("of:3", 1), Medium::Cable);
    h.add_switch("of:1", 1, &[1]);
    h.add_switch("of:2", 2, &[1, 2]);
    h.add_switch("of:3", 3, &[1]);
    h.fabric.pump(&h.provider);
    assert_eq!(h.store.link_count(), 4);

    h.provider
        .handle_device_event(DeviceEvent::DeviceRemoved(DeviceId::from("of:1")))
        .unwrap();

    assert!(h.provider.discovery(&DeviceId::from("of:1")).is_none());
    assert_eq!(
        h.store.links(),
        vec![
            LinkDescription::new(cp("of:2", 2), cp("of:3", 1), LinkType::Direct),
            LinkDescription::new(cp("of:3", 1), cp("of:2", 2), LinkType::Direct),
        ]
    );
}

#[test]
fn test_stale_links_expire() {
    let config = DiscoveryConfig {
        probe_rate_ms: 20,
        stale_link_age_ms: 60,
        timer_workers: 1,
        ..Default::default()
    };
    let h = harness(config, true, Some(cluster()));
    h.fabric.connect(cp("of:1", 1), cp("of:2", 1), Medium::Cable);
    h.add_switch("of:1", 1, &[1]);
    h.add_switch("of:2", 2, &[1]);
    h.fabric.pump(&h.provider);
    assert_eq!(h.store.link_count(), 2);

    // Cable cut: probes keep leaving but never arrive.
    thread::sleep(Duration::from_millis(150));
    h.fabric.drop_in_flight();

    assert_eq!(h.provider.expire_stale_links(), 1);
    assert_eq!(h.store.link_count(), 0);
    assert_eq!(h.provider.expire_stale_links(), 0);
}

#[test]
fn test_non_probe_frames_pass_through() {
    let h = harness(quiet(), true, Some(cluster()));
    h.add_switch("of:1", 1, &[1]);

    let arp = EthernetFrame::new(
        MacAddress::BROADCAST,
        MacAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]),
        0x0806,
        vec![0; 28],
    );
    assert!(!h
        .provider
        .process_packet(&InboundPacket::new(cp("of:1", 1), arp.serialize())));
    assert!(!h
        .provider
        .process_packet(&InboundPacket::new(cp("of:1", 1), vec![1, 2, 3])));
}

#[test]
fn test_link_to_unknown_port_is_tolerated() {
    let h = harness(quiet(), true, Some(cluster()));
    h.fabric.connect(cp("of:1", 1), cp("of:2", 1), Medium::Cable);
    h.add_switch("of:1", 1, &[1]);
    h.add_switch("of:2", 2, &[1]);
    // The store learns about of:2/1 disappearing before the probe lands.
    h.store.remove_connect_point(&cp("of:2", 1));

    // Still consumed: the race is not the frame's fault.
    assert!(h.fabric.pump(&h.provider) > 0);
    assert_eq!(h.store.link_count(), 0);
}

#[test]
fn test_deactivate_then_packets_ignored() {
    let h = harness(quiet(), true, Some(cluster()));
    h.fabric.connect(cp("of:1", 1), cp("of:2", 1), Medium::Cable);
    h.add_switch("of:1", 1, &[1]);
    h.add_switch("of:2", 2, &[1]);

    h.provider.deactivate();
    assert_eq!(h.fabric.pump(&h.provider), 0);
    assert_eq!(h.store.link_count(), 0);
}

#[test]
fn test_concurrent_port_churn() {
    let config = DiscoveryConfig {
        probe_rate_ms: 5,
        stale_link_age_ms: 1000,
        timer_workers: 4,
        ..Default::default()
    };
    let h = Arc::new(harness(config, true, Some(cluster())));
    for port in 1..=8 {
        h.fabric
            .connect(cp("of:1", port), cp("of:2", port), Medium::Cable);
    }
    h.add_switch("of:1", 1, &[]);
    h.add_switch("of:2", 2, &(1..=8).collect::<Vec<_>>());

    let churn = {
        let h = Arc::clone(&h);
        thread::spawn(move || {
            for round in 0..200u64 {
                let port = Port::new(round % 8 + 1, round % 3 != 0);
                h.provider
                    .handle_device_event(DeviceEvent::PortUpdated {
                        device_id: DeviceId::from("of:1"),
                        port,
                    })
                    .unwrap();
                h.fabric.pump(&h.provider);
            }
        })
    };
    for _ in 0..50 {
        h.fabric.pump(&h.provider);
        thread::sleep(Duration::from_millis(1));
    }
    churn.join().unwrap();

    let agent = h.provider.discovery(&DeviceId::from("of:1")).unwrap();
    assert!(agent.ports().len() <= 8);
    for link in h.store.links() {
        assert_ne!(link.link_type, LinkType::Edge);
        assert_eq!(link.src.port, link.dst.port);
    }
}
