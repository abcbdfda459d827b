//! NexStar Mount Check
//!
//! A standalone tool to check communication with a NexStar or StarSense hand
//! controller: runs the firmware discovery, reads the current position and
//! optionally performs a goto.
//!
//! Usage:
//!   cargo run --example mount_check -- --port /dev/ttyUSB0
//!   cargo run --example mount_check -- --tcp 192.168.4.1:2000 --goto-ra 5.5 --goto-dec -5.4
//!   cargo run --example mount_check -- --demo --goto-ra 5.5 --goto-dec -5.4
//!
//! Set `RUST_LOG=nexstar_core=debug` to see every exchange.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use nexstar_core::prelude::*;
use nexstar_core::protocol::TcpTransport;

#[derive(Parser, Debug)]
#[command(about = "Query a NexStar / StarSense hand controller")]
struct Args {
    /// Serial port of the hand controller
    #[arg(short, long, env = "NEXSTAR_PORT")]
    port: Option<String>,

    /// Connect to a serial-over-TCP bridge instead (host:port)
    #[arg(long, conflicts_with = "port")]
    tcp: Option<String>,

    /// Talk to the built-in simulator
    #[arg(long, conflicts_with_all = ["port", "tcp"])]
    demo: bool,

    /// JSON configuration file (connection settings and slew policy)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read timeout in milliseconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// List serial ports and exit
    #[arg(long)]
    list: bool,

    /// Goto target RA in hours
    #[arg(long, requires = "goto_dec", allow_negative_numbers = true)]
    goto_ra: Option<f64>,

    /// Goto target DEC in degrees
    #[arg(long, requires = "goto_ra", allow_negative_numbers = true)]
    goto_dec: Option<f64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.list {
        for port in Connection::list_ports() {
            match (port.vid, port.pid) {
                (Some(vid), Some(pid)) => println!("{} [{:04x}:{:04x}]", port.name, vid, pid),
                _ => println!("{}", port.name),
            }
        }
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => MountConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => MountConfig::default(),
    };
    if let Some(port) = &args.port {
        config.connection.port_name = port.clone();
    }
    if let Some(timeout) = args.timeout {
        config.connection.timeout_ms = timeout;
    }

    let timeout = config.connection.timeout();
    let mut mount = config.into_mount(ModelCatalog::builtin());

    if args.demo {
        mount.connect_with(Box::new(SimulatedMount::new()))?;
    } else if let Some(addr) = &args.tcp {
        let transport = TcpTransport::connect(addr, timeout)
            .with_context(|| format!("connecting to {}", addr))?;
        mount.connect_with(Box::new(transport))?;
    } else if mount.connection().config().port_name.is_empty() {
        bail!("no port given; use --port, --tcp or --demo");
    } else {
        mount.connect().context("opening hand controller")?;
    }

    let info = mount.firmware_info()?;
    println!("{}", info);
    println!("Aligned: {}", mount.check_aligned()?);
    println!("Tracking: {:?}", mount.get_track_mode()?);

    let eq = mount.get_ra_dec()?;
    let hz = mount.get_az_alt()?;
    println!("RA {:.4}h DEC {:.4}", eq.ra_hours, eq.dec_degrees);
    println!("Az {:.4} Alt {:.4}", hz.azimuth, hz.altitude);

    if let (Some(ra), Some(dec)) = (args.goto_ra, args.goto_dec) {
        let reached = mount.goto_ra_dec(ra, dec)?;
        let eq = mount.get_ra_dec()?;
        println!(
            "Goto {}: RA {:.4}h DEC {:.4}",
            if reached { "complete" } else { "stopped short" },
            eq.ra_hours,
            eq.dec_degrees
        );
    }

    let (tx_bytes, rx_bytes, tx_frames, rx_frames) = mount.connection().get_counters();
    println!(
        "Sent {} bytes in {} frames, received {} bytes in {} frames",
        tx_bytes, tx_frames, rx_bytes, rx_frames
    );

    mount.disconnect();
    Ok(())
}
