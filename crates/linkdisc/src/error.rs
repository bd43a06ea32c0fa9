// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::config::ConfigError;
use crate::protocol::ParseError;
use crate::types::DeviceId;
use thiserror::Error;

/// Errors raised while managing discovery agents.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot build probes for {device}: {source}")]
    Probe {
        device: DeviceId,
        #[source]
        source: ParseError,
    },
}
