// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Concurrent set of ports under discovery for one device.

use crate::types::PortNumber;
use dashmap::DashSet;

/// Ports currently probed on a device.
///
/// Mutated by port events while probe rounds iterate a snapshot; every
/// operation is independently atomic (sharded `DashSet`, no global lock), so
/// a snapshot may or may not observe an add/remove racing with it.
#[derive(Debug, Default)]
pub struct PortRegistry {
    ports: DashSet<PortNumber>,
}

impl PortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the port was not already registered.
    pub fn add(&self, port: PortNumber) -> bool {
        self.ports.insert(port)
    }

    /// Returns `true` if the port was registered.
    pub fn remove(&self, port: PortNumber) -> bool {
        self.ports.remove(&port).is_some()
    }

    pub fn contains(&self, port: PortNumber) -> bool {
        self.ports.contains(&port)
    }

    /// Point-in-time copy for iteration outside any shard lock.
    pub fn snapshot(&self) -> Vec<PortNumber> {
        self.ports.iter().map(|p| *p).collect()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}
