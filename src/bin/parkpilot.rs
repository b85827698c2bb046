//! parkpilot - fly the parking mission.
//!
//! Connects to the selected aircraft, flies the fixed sequence (takeoff,
//! observe, photograph, locate, park, dwell, return, land), and exits
//! nonzero if the mission aborted. Against the simulator the photo
//! pipeline is replaced by a canned observation; against the physical
//! drone the capture is downloaded over HTTP and run through the
//! configured detector.

use anyhow::Result;
use clap::Parser;

use parkpilot::{
    connect, MediaClient, Mission, MissionConfig, Mode, SpotDetector, SpotLocator, StubDetector,
    SurveyPipeline,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Fly the drone to the nearest open parking spot"
)]
struct Args {
    /// Which aircraft to fly.
    #[arg(long, value_enum, env = "PARKPILOT_MODE", default_value = "physical")]
    mode: Mode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let cfg = MissionConfig::load()?;

    let target = args.mode.connection_target(&cfg);
    log::info!("connecting to drone at {}", target);
    let mut link = connect(target)?;

    let mut survey = if args.mode.vision_capable() {
        Some(build_survey(&cfg, target)?)
    } else {
        None
    };

    let mut mission = Mission::new(&cfg);
    let report = mission.run(link.as_mut(), survey.as_mut())?;
    if let Some(parked_at) = report.parked_at {
        log::info!(
            "parked at ({:.7}, {:.7}) and returned home",
            parked_at.latitude_deg,
            parked_at.longitude_deg
        );
    }
    Ok(())
}

fn build_survey(cfg: &MissionConfig, target: &str) -> Result<SurveyPipeline> {
    let media = MediaClient::for_target(target)?;
    let locator = SpotLocator::new(build_detector(cfg)?, cfg.vision.clone());
    Ok(SurveyPipeline {
        media: Box::new(media),
        locator: Box::new(locator),
    })
}

fn build_detector(cfg: &MissionConfig) -> Result<Box<dyn SpotDetector>> {
    #[cfg(feature = "backend-tract")]
    if let Some(model_path) = &cfg.vision.model_path {
        let (width, height) = cfg.vision.detect_size();
        let detector = parkpilot::TractDetector::new(model_path, width, height)?;
        return Ok(Box::new(detector));
    }
    #[cfg(not(feature = "backend-tract"))]
    if cfg.vision.model_path.is_some() {
        log::warn!("model path configured but the backend-tract feature is disabled");
    }
    log::warn!("no detection model available; using the stub detector");
    Ok(Box::new(StubDetector::new()))
}
