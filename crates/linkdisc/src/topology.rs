// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process link store.
//!
//! Links are stored per direction, `(src, dst)`. A link is only accepted
//! while its endpoints are live; the source of an `Edge` link belongs to a
//! foreign network and is not checked. An `Indirect` report never replaces
//! a `Direct` link in the same direction.

use crate::discovery::{LinkProviderService, TopologyError};
use crate::event::{EventDispatcher, LinkEvent};
use crate::types::{ConnectPoint, DeviceId, LinkDescription, LinkType};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};

type Direction = (ConnectPoint, ConnectPoint);

/// Link table plus the connect points currently known to exist.
#[derive(Debug, Default)]
pub struct TopologyStore {
    links: DashMap<Direction, LinkDescription>,
    live: DashSet<ConnectPoint>,
    events: EventDispatcher<LinkEvent>,
}

impl TopologyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listener registry for link events.
    pub fn events(&self) -> &EventDispatcher<LinkEvent> {
        &self.events
    }

    pub fn add_connect_point(&self, cp: ConnectPoint) {
        self.live.insert(cp);
    }

    /// Forget a connect point and vanish every link ending on it.
    pub fn remove_connect_point(&self, cp: &ConnectPoint) {
        self.live.remove(cp);
        self.purge(|(src, dst)| src == cp || dst == cp);
    }

    /// Forget every connect point of a device and the links touching it.
    pub fn remove_device(&self, device_id: &DeviceId) {
        self.live.retain(|cp| &cp.device_id != device_id);
        self.purge(|(src, dst)| &src.device_id == device_id || &dst.device_id == device_id);
    }

    pub fn is_live(&self, cp: &ConnectPoint) -> bool {
        self.live.contains(cp)
    }

    pub fn get(&self, src: &ConnectPoint, dst: &ConnectPoint) -> Option<LinkDescription> {
        self.links
            .get(&(src.clone(), dst.clone()))
            .map(|entry| entry.value().clone())
    }

    /// All links, sorted by source then destination.
    pub fn links(&self) -> Vec<LinkDescription> {
        let mut links: Vec<LinkDescription> =
            self.links.iter().map(|entry| entry.value().clone()).collect();
        links.sort_by(|a, b| (&a.src, &a.dst).cmp(&(&b.src, &b.dst)));
        links
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    fn purge(&self, matches: impl Fn(&Direction) -> bool) {
        let doomed: Vec<Direction> = self
            .links
            .iter()
            .filter(|entry| matches(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        for key in doomed {
            if let Some((_, link)) = self.links.remove(&key) {
                log::debug!("[topology] Link removed with endpoint: {}", link);
                self.events.post(&LinkEvent::LinkVanished(link));
            }
        }
    }
}

impl LinkProviderService for TopologyStore {
    fn link_detected(&self, link: &LinkDescription) -> Result<(), TopologyError> {
        if link.src == link.dst {
            return Err(TopologyError::Rejected(format!("self-loop on {}", link.src)));
        }
        if !self.is_live(&link.dst) {
            return Err(TopologyError::InvalidState(format!(
                "{} is not a live connect point",
                link.dst
            )));
        }
        if link.link_type != LinkType::Edge && !self.is_live(&link.src) {
            return Err(TopologyError::InvalidState(format!(
                "{} is not a live connect point",
                link.src
            )));
        }

        let key = (link.src.clone(), link.dst.clone());
        let announce = match self.links.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(link.clone());
                true
            }
            Entry::Occupied(mut entry) => {
                let current = entry.get().link_type;
                // BDDP also crosses direct cables; never downgrade.
                let keep = current == link.link_type
                    || (current == LinkType::Direct && link.link_type == LinkType::Indirect);
                if !keep {
                    entry.insert(link.clone());
                }
                !keep
            }
        };
        if !announce {
            return Ok(());
        }
        log::debug!("[topology] Link detected: {}", link);
        self.events.post(&LinkEvent::LinkDetected(link.clone()));
        Ok(())
    }

    fn link_vanished(&self, link: &LinkDescription) -> Result<(), TopologyError> {
        if let Some((_, removed)) = self.links.remove(&(link.src.clone(), link.dst.clone())) {
            log::debug!("[topology] Link vanished: {}", removed);
            self.events.post(&LinkEvent::LinkVanished(removed));
        }
        Ok(())
    }
}
