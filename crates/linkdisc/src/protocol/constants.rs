// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire constants for discovery frames (IEEE 802.3 / 802.1AB).

// Ether-types
pub const ETH_TYPE_LLDP: u16 = 0x88cc;
/// Broadcast-domain discovery (BDDP) ether-type.
pub const ETH_TYPE_BDDP: u16 = 0x8942;
pub const ETH_TYPE_VLAN: u16 = 0x8100;

// Ethernet framing
pub const ETH_ADDR_LEN: usize = 6;
pub const ETH_HEADER_LEN: usize = 14;
pub const VLAN_TAG_LEN: usize = 4;
/// Minimum frame length without FCS; shorter frames are zero-padded.
pub const ETH_MIN_FRAME_LEN: usize = 60;

// LLDP TLV types (802.1AB Sec.8.4)
pub const TLV_END: u8 = 0;
pub const TLV_CHASSIS_ID: u8 = 1;
pub const TLV_PORT_ID: u8 = 2;
pub const TLV_TTL: u8 = 3;
pub const TLV_ORG_SPECIFIC: u8 = 127;

pub const TLV_HEADER_LEN: usize = 2;
/// 9-bit length field.
pub const TLV_MAX_VALUE_LEN: usize = 511;

pub const CHASSIS_SUBTYPE_MAC: u8 = 4;
pub const PORT_SUBTYPE_COMPONENT: u8 = 2;
pub const PROBE_TTL_SECS: u16 = 120;

// Controller organizationally-specific TLVs
pub const PROBE_OUI: [u8; 3] = [0xa4, 0x23, 0x05];
pub const PROBE_NAME_SUBTYPE: u8 = 1;
pub const PROBE_DEVICE_SUBTYPE: u8 = 2;
/// Marker carried in the name TLV; frames without it are not ours to interpret.
pub const PROBE_NAME: &str = "ONOS Discovery";

/// OUI (3) + subtype (1) prefix of every org-specific TLV value.
pub const ORG_TLV_PREFIX_LEN: usize = 4;
