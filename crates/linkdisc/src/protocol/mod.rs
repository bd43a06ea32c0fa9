// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovery frame codec.
//!
//! - [`EthernetFrame`]: Ethernet II framing with optional 802.1Q tag
//! - [`lldp`]: generic LLDPDU TLV encoding
//! - [`DiscoveryProbe`] / [`ProbeBuilder`]: the controller probe payload and
//!   its LLDP/BDDP framings

pub mod constants;
mod ethernet;
pub mod lldp;
mod mac;
mod probe;

pub use ethernet::EthernetFrame;
pub use mac::MacAddress;
pub use probe::{DiscoveryProbe, ProbeBuilder};

use thiserror::Error;

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("truncated data: need {needed} bytes, have {available}")]
    TruncatedData { needed: usize, available: usize },

    #[error("invalid TLV: {0}")]
    InvalidTlv(String),

    #[error("invalid MAC address: {0}")]
    InvalidMac(String),
}
