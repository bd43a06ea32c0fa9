// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Last-seen bookkeeping for discovered links.

use crate::types::{ConnectPoint, DeviceId, LinkKey};
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Time each link was last confirmed by a probe.
#[derive(Debug, Default)]
pub struct StaleLinkTracker {
    seen: DashMap<LinkKey, Instant>,
}

impl StaleLinkTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch(&self, key: LinkKey) {
        self.seen.insert(key, Instant::now());
    }

    pub fn contains(&self, key: &LinkKey) -> bool {
        self.seen.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Remove and return links not confirmed within `max_age`.
    pub fn expire(&self, max_age: Duration) -> Vec<LinkKey> {
        let now = Instant::now();
        let candidates: Vec<LinkKey> = self
            .seen
            .iter()
            .filter(|entry| now.saturating_duration_since(*entry.value()) > max_age)
            .map(|entry| entry.key().clone())
            .collect();

        // A touch racing with the scan keeps the link alive.
        candidates
            .into_iter()
            .filter(|key| {
                self.seen
                    .remove_if(key, |_, seen| now.saturating_duration_since(*seen) > max_age)
                    .is_some()
            })
            .collect()
    }

    pub fn remove_device(&self, device_id: &DeviceId) -> Vec<LinkKey> {
        self.remove_matching(|key| key.touches_device(device_id))
    }

    pub fn remove_connect_point(&self, cp: &ConnectPoint) -> Vec<LinkKey> {
        self.remove_matching(|key| key.contains(cp))
    }

    fn remove_matching(&self, matches: impl Fn(&LinkKey) -> bool) -> Vec<LinkKey> {
        let keys: Vec<LinkKey> = self
            .seen
            .iter()
            .filter(|entry| matches(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        keys.into_iter()
            .filter(|key| self.seen.remove(key).is_some())
            .collect()
    }
}
