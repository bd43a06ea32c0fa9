// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Agent configuration: discovery settings plus the simulated fabric.

use linkdisc::{ClusterMetadata, ConfigError, ConnectPoint, DiscoveryConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentConfigError {
    #[error(transparent)]
    Discovery(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid fabric: {0}")]
    Fabric(String),
}

/// Simulated switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: String,
    pub chassis_id: u64,
    #[serde(default)]
    pub ports: Vec<u64>,
    /// Whether this node masters the device.
    #[serde(default = "default_true")]
    pub master: bool,
}

/// Wire between two ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub a: Endpoint,
    pub b: Endpoint,
    /// A non-OpenFlow switch sits in between; only BDDP crosses.
    #[serde(default)]
    pub legacy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub device: String,
    pub port: u64,
}

impl Endpoint {
    pub fn new(device: &str, port: u64) -> Self {
        Self {
            device: device.to_string(),
            port,
        }
    }

    pub fn connect_point(&self) -> ConnectPoint {
        ConnectPoint::new(self.device.as_str(), self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Unset: clustering not initialized, every link is reported as EDGE.
    #[serde(default)]
    pub cluster_name: Option<String>,

    #[serde(default)]
    pub cluster_nodes: Vec<String>,

    /// How often stale links are expired (milliseconds).
    #[serde(default = "default_expiry_interval")]
    pub expiry_interval_ms: u64,

    #[serde(default)]
    pub devices: Vec<DeviceConfig>,

    #[serde(default)]
    pub links: Vec<LinkConfig>,
}

fn default_true() -> bool {
    true
}

fn default_expiry_interval() -> u64 {
    1000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            cluster_name: None,
            cluster_nodes: Vec::new(),
            expiry_interval_ms: default_expiry_interval(),
            devices: Vec::new(),
            links: Vec::new(),
        }
    }
}

impl AgentConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AgentConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), AgentConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Three switches: two cabled together, one behind a legacy segment.
    pub fn example() -> Self {
        let device = |id: &str, chassis_id: u64, ports: &[u64]| DeviceConfig {
            id: id.to_string(),
            chassis_id,
            ports: ports.to_vec(),
            master: true,
        };
        Self {
            cluster_name: Some("linkdisc-demo".into()),
            cluster_nodes: vec!["node-1".into()],
            devices: vec![
                device("of:0000000000000001", 1, &[1, 2, 3]),
                device("of:0000000000000002", 2, &[1, 2]),
                device("of:0000000000000003", 3, &[1]),
            ],
            links: vec![
                LinkConfig {
                    a: Endpoint::new("of:0000000000000001", 1),
                    b: Endpoint::new("of:0000000000000002", 1),
                    legacy: false,
                },
                LinkConfig {
                    a: Endpoint::new("of:0000000000000001", 2),
                    b: Endpoint::new("of:0000000000000003", 1),
                    legacy: true,
                },
            ],
            ..Default::default()
        }
    }

    pub fn cluster_metadata(&self) -> Option<ClusterMetadata> {
        self.cluster_name
            .as_ref()
            .map(|name| ClusterMetadata::new(name.clone(), self.cluster_nodes.clone()))
    }

    pub fn expiry_interval(&self) -> Duration {
        Duration::from_millis(self.expiry_interval_ms)
    }

    pub fn validate(&self) -> Result<(), AgentConfigError> {
        self.discovery.validate()?;

        if self.expiry_interval_ms == 0 {
            return Err(AgentConfigError::Fabric(
                "expiry_interval_ms must be > 0".into(),
            ));
        }

        let mut ids = HashSet::new();
        let mut ports = HashSet::new();
        for device in &self.devices {
            if device.id.is_empty() {
                return Err(AgentConfigError::Fabric("empty device id".into()));
            }
            if !ids.insert(device.id.as_str()) {
                return Err(AgentConfigError::Fabric(format!(
                    "duplicate device {}",
                    device.id
                )));
            }
            for port in &device.ports {
                ports.insert(Endpoint::new(&device.id, *port));
            }
        }

        let mut wired = HashSet::new();
        for (i, link) in self.links.iter().enumerate() {
            if link.a == link.b {
                return Err(AgentConfigError::Fabric(format!(
                    "link {} connects a port to itself",
                    i
                )));
            }
            for end in [&link.a, &link.b] {
                if !ports.contains(end) {
                    return Err(AgentConfigError::Fabric(format!(
                        "link {} uses unknown port {}/{}",
                        i, end.device, end.port
                    )));
                }
                if !wired.insert(end.clone()) {
                    return Err(AgentConfigError::Fabric(format!(
                        "port {}/{} is wired more than once",
                        end.device, end.port
                    )));
                }
            }
        }
        Ok(())
    }
}
