//! Gazebo FDM bridge.
//!
//! Binds the local FDM port, then runs lockstep ticks against the Gazebo
//! plugin with a fixed servo output until Ctrl+C (or `--ticks`).
//!
//! Usage:
//!   cargo run -p gazebo_sitl --bin gazebo_bridge -- [OPTIONS]

use std::net::IpAddr;
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};
use gazebo_sitl::trace::init_tracing;
use gazebo_sitl::{ActuatorCommands, BridgeConfig, GazeboBridge, SimulatorError};

#[derive(Debug, Parser)]
#[command(name = "gazebo_bridge", version, about = "Lockstep UDP bridge to the Gazebo physics engine")]
struct Args {
    /// JSON configuration file. Flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local address to bind for FDM packets.
    #[arg(long)]
    bind: Option<IpAddr>,

    /// Local UDP port for FDM packets.
    #[arg(long)]
    port: Option<u16>,

    /// Address of the Gazebo plugin.
    #[arg(long)]
    gazebo_addr: Option<IpAddr>,

    /// UDP port the Gazebo plugin listens on.
    #[arg(long)]
    gazebo_port: Option<u16>,

    /// Wait per receive attempt, in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Give up a tick after this many resends (default: never).
    #[arg(long)]
    max_resends: Option<u32>,

    /// Reject packets with NaN fields or non-unit quaternions.
    #[arg(long)]
    validate: bool,

    /// Raw servo value sent on every channel.
    #[arg(long, default_value_t = 1000)]
    servo: u16,

    /// Stop after this many ticks.
    #[arg(long)]
    ticks: Option<u64>,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn into_config(self) -> Result<BridgeConfig, SimulatorError> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::load(path)?,
            None => BridgeConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(port) = self.port {
            config.local_port = port;
        }
        if let Some(addr) = self.gazebo_addr {
            config.peer_addr = addr;
        }
        if let Some(port) = self.gazebo_port {
            config.peer_port = port;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.recv_timeout_ms = timeout_ms;
        }
        if self.max_resends.is_some() {
            config.max_resends = self.max_resends;
        }
        if self.validate {
            config.validate_state = true;
        }
        config.check()?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let commands = ActuatorCommands::uniform(args.servo);
    let max_ticks = args.ticks;

    let config = args.into_config().unwrap_or_else(|e| {
        tracing::error!("{e}");
        process::exit(1);
    });

    tracing::info!(
        local = %config.local_endpoint(),
        gazebo = %config.peer_endpoint(),
        "starting Gazebo bridge"
    );

    let mut bridge = match GazeboBridge::connect(config) {
        Ok(bridge) => bridge,
        Err(e @ SimulatorError::BindFailed { .. }) => {
            tracing::error!("{e}");
            eprintln!("Aborting launch...");
            process::exit(1);
        }
        Err(e) => {
            tracing::error!("{e}");
            process::exit(1);
        }
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut connected = false;
    let mut frame_rate_hz: Option<f64> = None;

    loop {
        if max_ticks.is_some_and(|max| bridge.stats().ticks >= max) {
            break;
        }

        let result = tokio::select! {
            _ = &mut ctrl_c => None,
            result = bridge.step(&commands) => Some(result),
        };
        let Some(result) = result else {
            tracing::info!("shutdown requested");
            break;
        };

        match result {
            Ok(report) => {
                if !connected {
                    connected = true;
                    tracing::info!("Gazebo connection established");
                }
                if let Some(rate) = report.frame_rate_hz() {
                    frame_rate_hz = Some(rate);
                }
                let stats = bridge.stats();
                if stats.ticks.is_multiple_of(1000) {
                    tracing::info!(
                        ticks = stats.ticks,
                        sim_time_s = report.sim_time_us as f64 / 1.0e6,
                        frame_rate_hz,
                        resends = stats.resends,
                        drained = stats.drained,
                        "bridge running"
                    );
                }
            }
            Err(SimulatorError::MalformedState(reason)) => {
                tracing::warn!(%reason, "keeping last good state");
            }
            Err(e) => {
                tracing::warn!("step failed: {e}");
            }
        }
    }

    let stats = bridge.stats();
    tracing::info!(
        ticks = stats.ticks,
        resends = stats.resends,
        drained = stats.drained,
        resets = stats.resets,
        rejected = stats.rejected,
        sim_time_us = bridge.state().time_now_us(),
        "bridge stopped"
    );
}
