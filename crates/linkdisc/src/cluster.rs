// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cluster identity and the probe source-MAC fingerprint derived from it.
//!
//! Every node of a cluster stamps its probes with the same locally
//! administered MAC, so a probe sent by *any* node is recognised as ours:
//!
//! ```text
//! 02:eb:XX:XX:XX:XX   XX = first 4 bytes of MD5(name || sorted node ids)
//! ```

use crate::protocol::MacAddress;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Prefix of every derived fingerprint (locally administered, unicast).
const FINGERPRINT_PREFIX: [u8; 2] = [0x02, 0xeb];

/// Name and membership of the controller cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMetadata {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<String>,
}

impl ClusterMetadata {
    pub fn new(name: impl Into<String>, nodes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            nodes,
        }
    }
}

/// Source of cluster metadata; `None` until clustering is initialized.
pub trait ClusterMetadataService: Send + Sync {
    fn cluster_metadata(&self) -> Option<ClusterMetadata>;
}

/// Fixed metadata, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticClusterMetadata(Option<ClusterMetadata>);

impl StaticClusterMetadata {
    pub fn new(metadata: Option<ClusterMetadata>) -> Self {
        Self(metadata)
    }
}

impl ClusterMetadataService for StaticClusterMetadata {
    fn cluster_metadata(&self) -> Option<ClusterMetadata> {
        self.0.clone()
    }
}

/// Fingerprint MAC for a cluster, [`MacAddress::DEFAULT_FINGERPRINT`] when
/// the cluster is unknown.
pub fn fingerprint_mac(metadata: Option<&ClusterMetadata>) -> MacAddress {
    let Some(metadata) = metadata else {
        return MacAddress::DEFAULT_FINGERPRINT;
    };

    let mut nodes: Vec<&str> = metadata.nodes.iter().map(String::as_str).collect();
    nodes.sort_unstable();

    let mut hasher = Md5::new();
    hasher.update(metadata.name.as_bytes());
    for node in nodes {
        // Separator keeps ("ab", "c") and ("a", "bc") apart.
        hasher.update([0u8]);
        hasher.update(node.as_bytes());
    }
    let digest = hasher.finalize();

    let mut mac = [0u8; 6];
    mac[..2].copy_from_slice(&FINGERPRINT_PREFIX);
    mac[2..].copy_from_slice(&digest[..4]);
    MacAddress::new(mac)
}
