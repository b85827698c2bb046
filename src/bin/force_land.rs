//! force_land - standalone safety command.
//!
//! Lands the drone from a remote connection without entering the parking
//! sequence. Useful when a mission process died or the aircraft must come
//! down now.

use anyhow::Result;
use clap::Parser;
use std::time::Duration;

use parkpilot::{connect, force_land, MissionConfig, Mode};

#[derive(Parser, Debug)]
#[command(author, version, about = "Land the drone immediately")]
struct Args {
    /// Which aircraft to land.
    #[arg(long, value_enum, env = "PARKPILOT_MODE", default_value = "physical")]
    mode: Mode,

    /// How long to wait for the landing confirmation.
    #[arg(long, env = "PARKPILOT_LAND_TIMEOUT_SECS", default_value = "30")]
    timeout_secs: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let cfg = MissionConfig::load()?;

    let target = args.mode.connection_target(&cfg);
    log::info!("connecting to drone at {}", target);
    let mut link = connect(target)?;

    force_land(link.as_mut(), Duration::from_secs(args.timeout_secs))
}
