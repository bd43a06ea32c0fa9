// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! linkdisc-dump - Decode link discovery probe frames
//!
//! Reads hex-encoded Ethernet frames (arguments or stdin, one per line) and
//! shows the Ethernet header, the LLDPDU TLVs and the decoded probe fields.
//! `--make` does the reverse and prints a probe frame as hex.

use clap::Parser;
use colored::*;
use linkdisc::protocol::lldp::{Lldpdu, Tlv};
use linkdisc::protocol::constants::{
    ETH_TYPE_BDDP, ETH_TYPE_LLDP, TLV_CHASSIS_ID, TLV_END, TLV_ORG_SPECIFIC, TLV_PORT_ID, TLV_TTL,
};
use linkdisc::{ChassisId, DeviceId, DiscoveryProbe, EthernetFrame, MacAddress, PortNumber, ProbeBuilder};
use std::io::BufRead;

/// Decode LLDP/BDDP discovery probes
#[derive(Parser, Debug)]
#[command(name = "linkdisc-dump")]
#[command(version = "0.1.0")]
#[command(about = "Decode link discovery probe frames (hex-encoded Ethernet)")]
struct Args {
    /// Hex-encoded frames (whitespace, ':' and '-' separators are ignored)
    frames: Vec<String>,

    /// Read frames from stdin, one per line
    #[arg(long)]
    stdin: bool,

    /// Build a probe for DEVICE/PORT and print it as hex instead of decoding
    #[arg(long, value_name = "DEVICE/PORT")]
    make: Option<String>,

    /// With --make: build the BDDP variant
    #[arg(long)]
    bddp: bool,

    /// With --make: source MAC (cluster fingerprint)
    #[arg(long, default_value = "de:ad:be:ef:ba:11")]
    source: String,

    /// Quiet mode - one line per frame
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(ref target) = args.make {
        println!("{}", hex::encode(make_probe(target, args)?.serialize()));
        return Ok(());
    }

    let mut inputs = args.frames.clone();
    if args.stdin {
        for line in std::io::stdin().lock().lines() {
            let line = line?;
            if !line.trim().is_empty() {
                inputs.push(line);
            }
        }
    }
    if inputs.is_empty() {
        return Err("no frames given (pass hex arguments or --stdin)".into());
    }

    for (i, input) in inputs.iter().enumerate() {
        match hex::decode(input) {
            Ok(bytes) => dump_frame(i + 1, &bytes, args.quiet),
            Err(e) => println!("{} {}", format!("[{}]", i + 1).yellow(), e.red()),
        }
    }
    Ok(())
}

fn make_probe(target: &str, args: &Args) -> Result<EthernetFrame, Box<dyn std::error::Error>> {
    let (device, port) = target
        .rsplit_once('/')
        .ok_or_else(|| format!("expected DEVICE/PORT, got '{}'", target))?;
    let port: u64 = port.parse()?;
    let source: MacAddress = args.source.parse()?;

    let builder = ProbeBuilder::new(DeviceId::from(device), ChassisId(0))?;
    let frame = if args.bddp {
        builder.build_bddp(Some(PortNumber(port)), source)
    } else {
        builder.build_lldp(Some(PortNumber(port)), source)
    };
    frame.ok_or_else(|| "probe could not be built".into())
}

fn dump_frame(index: usize, bytes: &[u8], quiet: bool) {
    let tag = format!("[{}]", index);

    let frame = match EthernetFrame::parse(bytes) {
        Ok(frame) => frame,
        Err(e) => {
            println!("{} {} {}", tag.yellow(), "not Ethernet:".red(), e);
            return;
        }
    };

    let probe = DiscoveryProbe::from_frame(&frame);
    if quiet {
        match probe {
            Some(p) => println!(
                "{} {} {} {}/{} from {}",
                tag,
                ether_type_name(frame.ether_type),
                "probe".green(),
                p.device_string(),
                p.port(),
                frame.source
            ),
            None => println!(
                "{} {} {}",
                tag,
                ether_type_name(frame.ether_type),
                "not a discovery probe".dimmed()
            ),
        }
        return;
    }

    println!();
    println!("{} {} bytes", tag.yellow().bold(), bytes.len());
    println!("    Destination: {}", describe_mac(frame.destination));
    println!("    Source:      {}", describe_mac(frame.source));
    if let Some(vlan) = frame.vlan_id {
        println!("    VLAN:        {}", vlan);
    }
    println!(
        "    Ether-type:  0x{:04x} ({})",
        frame.ether_type,
        ether_type_name(frame.ether_type)
    );

    if frame.ether_type != ETH_TYPE_LLDP && frame.ether_type != ETH_TYPE_BDDP {
        println!("    {}", "not a discovery probe (ether-type)".dimmed());
        return;
    }

    match Lldpdu::parse(&frame.payload) {
        Ok(pdu) => {
            println!("    {}", "TLVs:".cyan().bold());
            for tlv in pdu.tlvs() {
                println!("      {}", describe_tlv(tlv));
            }
        }
        Err(e) => {
            println!("    {} {}", "malformed LLDPDU:".red(), e);
            return;
        }
    }

    match probe {
        Some(p) if !p.device_string().is_empty() => {
            println!("    {}", "Discovery probe:".green().bold());
            println!("      Device:  {}", p.device_string().green());
            println!("      Port:    {}", p.port());
            println!("      Chassis: {}", p.chassis_id());
        }
        Some(_) => println!("    {}", "probe without device identity".yellow()),
        None => println!("    {}", "LLDPDU lacks the discovery markers".dimmed()),
    }
}

fn ether_type_name(ether_type: u16) -> &'static str {
    match ether_type {
        ETH_TYPE_LLDP => "LLDP",
        ETH_TYPE_BDDP => "BDDP",
        0x0800 => "IPv4",
        0x0806 => "ARP",
        0x86dd => "IPv6",
        _ => "other",
    }
}

fn describe_mac(mac: MacAddress) -> String {
    let note = if mac == MacAddress::PROBE_MULTICAST {
        " (probe multicast)"
    } else if mac.is_broadcast() {
        " (broadcast)"
    } else if mac == MacAddress::DEFAULT_FINGERPRINT {
        " (uninitialized fingerprint)"
    } else {
        ""
    };
    format!("{}{}", mac, note.dimmed())
}

fn describe_tlv(tlv: &Tlv) -> String {
    let value = tlv.value();
    let name = match tlv.tlv_type() {
        TLV_END => "End",
        TLV_CHASSIS_ID => "Chassis ID",
        TLV_PORT_ID => "Port ID",
        TLV_TTL => "TTL",
        TLV_ORG_SPECIFIC => "Org-specific",
        _ => "Unknown",
    };

    let detail = match tlv.tlv_type() {
        TLV_TTL if value.len() == 2 => format!("{}s", u16::from_be_bytes([value[0], value[1]])),
        TLV_ORG_SPECIFIC if value.len() >= 4 => {
            let info = &value[4..];
            let text = match std::str::from_utf8(info) {
                Ok(s) if !s.is_empty() => format!(" \"{}\"", s),
                _ => String::new(),
            };
            format!(
                "oui {} subtype {}{}",
                hex::encode(&value[..3]),
                value[3],
                text
            )
        }
        _ => hex::encode(value),
    };

    format!(
        "{:<13} len {:>3}  {}",
        format!("{} ({})", name, tlv.tlv_type()),
        value.len(),
        detail
    )
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes
            .as_ref()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    /// Separators (whitespace, ':', '-') and a `0x` prefix are ignored.
    pub fn decode(s: &str) -> Result<Vec<u8>, String> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let digits: Vec<char> = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
            .collect();
        if digits.len() % 2 != 0 {
            return Err("odd number of hex digits".into());
        }
        digits
            .chunks(2)
            .map(|pair| {
                let byte: String = pair.iter().collect();
                u8::from_str_radix(&byte, 16).map_err(|_| format!("invalid hex '{}'", byte))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_decode_separators() {
        assert_eq!(hex::decode("0xa5:23-05 00").unwrap(), vec![0xa5, 0x23, 0x05, 0x00]);
        assert!(hex::decode("abc").is_err());
        assert!(hex::decode("zz").is_err());
    }

    #[test]
    fn test_make_probe_decodes_back() {
        let args = Args::parse_from(["linkdisc-dump", "--make", "of:0000000000000001/7", "--bddp"]);
        let frame = make_probe(args.make.as_deref().unwrap(), &args).unwrap();
        assert_eq!(frame.ether_type, ETH_TYPE_BDDP);

        let bytes = hex::decode(&hex::encode(frame.serialize())).unwrap();
        let parsed = EthernetFrame::parse(&bytes).unwrap();
        let probe = DiscoveryProbe::from_frame(&parsed).unwrap();
        assert_eq!(probe.device_string(), "of:0000000000000001");
        assert_eq!(probe.port(), PortNumber(7));
    }

    #[test]
    fn test_make_probe_rejects_bad_target() {
        let args = Args::parse_from(["linkdisc-dump", "--make", "of:1"]);
        assert!(make_probe("of:1", &args).is_err());
        assert!(make_probe("of:1/x", &args).is_err());
    }

    #[test]
    fn test_describe_tlv() {
        let ttl = Tlv::new(TLV_TTL, vec![0, 120]).unwrap();
        assert!(describe_tlv(&ttl).contains("120s"));

        let name = Tlv::org_specific([0xa4, 0x23, 0x05], 1, b"ONOS Discovery").unwrap();
        let line = describe_tlv(&name);
        assert!(line.contains("a42305"));
        assert!(line.contains("\"ONOS Discovery\""));
    }
}
