// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! linkdisc agent
//!
//! Runs link discovery against a simulated switch fabric described in a
//! JSON file, logs every link event and prints the discovered topology on
//! exit.
//!
//! # Usage
//!
//! ```bash
//! # Built-in three-switch demo fabric
//! linkdisc-agent
//!
//! # Custom fabric, faster probing, stop after 30 s
//! linkdisc-agent --config fabric.json --probe-rate 500 --duration 30
//!
//! # Write the demo fabric to a file to start from
//! linkdisc-agent gen-config --output fabric.json
//! ```

use clap::{Parser, Subcommand};
use linkdisc::{
    ConnectPoint, Device, DeviceEvent, InboundPacket, LinkEvent, LinkProvider,
    LinkProviderService, LinkProviderServices, LinkType, PacketService, Port,
    StaticClusterMetadata, TopologyStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod fabric;

use config::AgentConfig;
use fabric::{LoopbackFabric, StaticMastership};

/// LLDP/BDDP link discovery over a simulated fabric
#[derive(Parser, Debug)]
#[command(name = "linkdisc-agent")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Fabric configuration file (JSON format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Probe interval in milliseconds (overrides the config file)
    #[arg(long)]
    probe_rate: Option<u64>,

    /// Do not send BDDP probes
    #[arg(long)]
    no_bddp: bool,

    /// Log level or filter directive (trace, debug, info, linkdisc=trace, ...)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Stop after this many seconds instead of waiting for Ctrl+C
    #[arg(short, long)]
    duration: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the demo fabric configuration
    GenConfig {
        #[arg(short, long, default_value = "fabric.json")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // The tracing-log bridge also picks up the library's `log` records.
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    if let Some(cmd) = args.command {
        return match cmd {
            Commands::GenConfig { output } => {
                AgentConfig::example().to_file(&output)?;
                println!("Wrote {}", output.display());
                Ok(())
            }
            Commands::Validate { config } => {
                let config = AgentConfig::from_file(&config)?;
                println!(
                    "Configuration valid: {} device(s), {} link(s)",
                    config.devices.len(),
                    config.links.len()
                );
                Ok(())
            }
        };
    }

    let config = build_config(&args)?;
    print_banner(&config);

    let store = Arc::new(TopologyStore::new());
    store.events().subscribe(|event: &LinkEvent| match event {
        LinkEvent::LinkDetected(link) => info!("Link detected: {}", link),
        LinkEvent::LinkVanished(link) => info!("Link vanished: {}", link),
    });

    let (packet_tx, mut packet_rx) = mpsc::unbounded_channel::<InboundPacket>();
    let fabric = Arc::new(LoopbackFabric::new(&config, packet_tx));

    let provider = LinkProvider::new(
        config.discovery.clone(),
        LinkProviderServices {
            mastership: Arc::new(StaticMastership::new(&config)),
            packet: Some(Arc::clone(&fabric) as Arc<dyn PacketService>),
            topology: Arc::clone(&store) as Arc<dyn LinkProviderService>,
            cluster: Arc::new(StaticClusterMetadata::new(config.cluster_metadata())),
        },
    )?;
    provider.activate();

    // Packet-in path: frames leaving one port arrive on the far end.
    let packet_in = {
        let provider = Arc::clone(&provider);
        tokio::spawn(async move {
            while let Some(packet) = packet_rx.recv().await {
                if !provider.process_packet(&packet) {
                    debug!("Frame on {} not consumed", packet.received_from);
                }
            }
        })
    };

    for device in &config.devices {
        let ports: Vec<Port> = device.ports.iter().map(|p| Port::new(*p, true)).collect();
        for port in &ports {
            store.add_connect_point(ConnectPoint::new(device.id.as_str(), port.number));
        }
        provider.handle_device_event(DeviceEvent::DeviceAdded {
            device: Device::new(device.id.as_str(), device.chassis_id),
            ports,
        })?;
    }

    let expiry = {
        let provider = Arc::clone(&provider);
        let period = config.expiry_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let expired = provider.expire_stale_links();
                if expired > 0 {
                    warn!("{} stale link(s) expired", expired);
                }
            }
        })
    };

    match args.duration {
        Some(secs) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
                _ = tokio::time::sleep(Duration::from_secs(secs)) => info!("Run time elapsed"),
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
            info!("Shutdown signal received");
        }
    }

    provider.deactivate();
    expiry.abort();
    packet_in.abort();

    print_topology(&store, &fabric);
    Ok(())
}

fn build_config(args: &Args) -> Result<AgentConfig, config::AgentConfigError> {
    let mut config = match args.config {
        Some(ref path) => {
            info!("Loading config from {:?}", path);
            AgentConfig::from_file(path)?
        }
        None => AgentConfig::example(),
    };

    if let Some(rate) = args.probe_rate {
        config.discovery.probe_rate_ms = rate;
        // Keep the stale age consistent with a slower rate.
        config.discovery.stale_link_age_ms = config
            .discovery
            .stale_link_age_ms
            .max(rate.saturating_mul(3));
    }
    if args.no_bddp {
        config.discovery.use_bddp = false;
    }
    config.validate()?;
    Ok(config)
}

fn print_banner(config: &AgentConfig) {
    info!("+----------------------------------------------------+");
    info!(
        "|       linkdisc agent v{}                        |",
        env!("CARGO_PKG_VERSION")
    );
    info!("+----------------------------------------------------+");
    info!("|  Devices:    {:37} |", config.devices.len());
    info!("|  Wires:      {:37} |", config.links.len());
    info!(
        "|  Probe rate: {:37} |",
        format!("{}ms", config.discovery.probe_rate_ms)
    );
    info!(
        "|  BDDP:       {:37} |",
        if config.discovery.use_bddp {
            "enabled"
        } else {
            "disabled"
        }
    );
    info!(
        "|  Cluster:    {:37} |",
        config.cluster_name.as_deref().unwrap_or("<uninitialized>")
    );
    info!("+----------------------------------------------------+");
}

fn print_topology(store: &TopologyStore, fabric: &LoopbackFabric) {
    let links = store.links();
    let (emitted, delivered) = fabric.counters();

    println!();
    println!("Discovered Topology ({} link(s))", links.len());
    println!("==============================");
    for link in &links {
        let kind = match link.link_type {
            LinkType::Direct => "DIRECT  ",
            LinkType::Indirect => "INDIRECT",
            LinkType::Edge => "EDGE    ",
        };
        println!("  {}  {} -> {}", kind, link.src, link.dst);
    }
    println!();
    println!("Frames: {} emitted, {} delivered", emitted, delivered);
}
