use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::geo::GroundScale;

const DEFAULT_SIM_TARGET: &str = "tcp://10.202.0.1:44444";
const DEFAULT_PHYSICAL_TARGET: &str = "tcp://192.168.42.1:44444";
const DEFAULT_OBSERVATION_ALTITUDE_M: f64 = 1.8;
const DEFAULT_PARKING_HOVER_ALTITUDE_M: f64 = 0.25;
const DEFAULT_HOVER_TIMEOUT_SECS: u64 = 5;
const DEFAULT_MOVE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SETTLE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DWELL_SECS: u64 = 5;
const DEFAULT_CAPTURE_YAW_DEG: f64 = -15.0;
const DEFAULT_YAW_RESET_FACTOR: f64 = -1.0;
const DEFAULT_GIMBAL_PITCH_DEG: f64 = -45.0;
const DEFAULT_GIMBAL_ROLL_DEG: f64 = 0.0;
const DEFAULT_DOWNLOAD_DIR: &str = ".";
const DEFAULT_FILE_NAME: &str = "capture.jpg";
const DEFAULT_FRAME_WIDTH: u32 = 4608;
const DEFAULT_FRAME_HEIGHT: u32 = 3456;
const DEFAULT_DETECT_SCALE: f64 = 0.5;
const DEFAULT_TARGET_CLASS: i64 = 0;

#[derive(Debug, Deserialize, Default)]
struct MissionConfigFile {
    connection: Option<ConnectionConfigFile>,
    flight: Option<FlightConfigFile>,
    media: Option<MediaConfigFile>,
    vision: Option<VisionConfigFile>,
    scale: Option<GroundScale>,
}

#[derive(Debug, Deserialize, Default)]
struct ConnectionConfigFile {
    sim_target: Option<String>,
    physical_target: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct FlightConfigFile {
    observation_altitude_m: Option<f64>,
    parking_hover_altitude_m: Option<f64>,
    hover_timeout_secs: Option<u64>,
    move_timeout_secs: Option<u64>,
    settle_timeout_secs: Option<u64>,
    dwell_secs: Option<u64>,
    capture_yaw_deg: Option<f64>,
    yaw_reset_factor: Option<f64>,
    gimbal_pitch_deg: Option<f64>,
    gimbal_roll_deg: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct MediaConfigFile {
    download_dir: Option<PathBuf>,
    file_name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct VisionConfigFile {
    model_path: Option<PathBuf>,
    frame_width: Option<u32>,
    frame_height: Option<u32>,
    detect_scale: Option<f64>,
    target_class: Option<i64>,
}

/// Which aircraft the mission runs against.
///
/// Only the physical drone has a functioning camera; the simulator flies
/// the same mission with a canned observation instead of the photo
/// pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    Sim,
    Physical,
}

impl Mode {
    pub fn connection_target<'a>(&self, cfg: &'a MissionConfig) -> &'a str {
        match self {
            Mode::Sim => &cfg.connection.sim_target,
            Mode::Physical => &cfg.connection.physical_target,
        }
    }

    pub fn vision_capable(&self) -> bool {
        matches!(self, Mode::Physical)
    }
}

/// Explicit configuration shared by the sequencer and the locator.
///
/// Loaded once at startup and passed by reference; nothing reads
/// process-wide state after `load` returns.
#[derive(Debug, Clone)]
pub struct MissionConfig {
    pub connection: ConnectionSettings,
    pub flight: FlightSettings,
    pub media: MediaSettings,
    pub vision: VisionSettings,
    pub scale: GroundScale,
}

#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub sim_target: String,
    pub physical_target: String,
}

#[derive(Debug, Clone)]
pub struct FlightSettings {
    /// Altitude for photographing the lot.
    pub observation_altitude_m: f64,
    /// Altitude held above the chosen parking spot.
    pub parking_hover_altitude_m: f64,
    /// How long to wait for the hovering confirmation after takeoff.
    pub hover_timeout: Duration,
    /// How long to wait for a move-to arrival confirmation.
    pub move_timeout: Duration,
    /// How long to wait for camera, gimbal, and photo confirmations.
    pub settle_timeout: Duration,
    /// Hold time at the parking spot before returning home.
    pub dwell: Duration,
    /// Heading rotation applied before the capture (the gimbal has no yaw
    /// axis, so the whole vehicle turns).
    pub capture_yaw_deg: f64,
    /// Multiple of the recorded capture yaw applied during recovery.
    pub yaw_reset_factor: f64,
    pub gimbal_pitch_deg: f64,
    pub gimbal_roll_deg: f64,
}

#[derive(Debug, Clone)]
pub struct MediaSettings {
    pub download_dir: PathBuf,
    pub file_name: String,
}

#[derive(Debug, Clone)]
pub struct VisionSettings {
    /// Local ONNX model path for the tract backend.
    pub model_path: Option<PathBuf>,
    /// Full capture frame size, before detection scaling.
    pub frame_width: u32,
    pub frame_height: u32,
    /// Resize factor applied before inference.
    pub detect_scale: f64,
    /// Class id of an open parking spot in the trained model.
    pub target_class: i64,
}

impl VisionSettings {
    /// Detector input size: the capture frame scaled for inference.
    pub fn detect_size(&self) -> (u32, u32) {
        let width = (self.frame_width as f64 * self.detect_scale).round() as u32;
        let height = (self.frame_height as f64 * self.detect_scale).round() as u32;
        (width.max(1), height.max(1))
    }
}

impl MissionConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PARKPILOT_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MissionConfigFile) -> Self {
        let connection = ConnectionSettings {
            sim_target: file
                .connection
                .as_ref()
                .and_then(|c| c.sim_target.clone())
                .unwrap_or_else(|| DEFAULT_SIM_TARGET.to_string()),
            physical_target: file
                .connection
                .and_then(|c| c.physical_target)
                .unwrap_or_else(|| DEFAULT_PHYSICAL_TARGET.to_string()),
        };
        let f = file.flight.unwrap_or_default();
        let flight = FlightSettings {
            observation_altitude_m: f
                .observation_altitude_m
                .unwrap_or(DEFAULT_OBSERVATION_ALTITUDE_M),
            parking_hover_altitude_m: f
                .parking_hover_altitude_m
                .unwrap_or(DEFAULT_PARKING_HOVER_ALTITUDE_M),
            hover_timeout: Duration::from_secs(
                f.hover_timeout_secs.unwrap_or(DEFAULT_HOVER_TIMEOUT_SECS),
            ),
            move_timeout: Duration::from_secs(
                f.move_timeout_secs.unwrap_or(DEFAULT_MOVE_TIMEOUT_SECS),
            ),
            settle_timeout: Duration::from_secs(
                f.settle_timeout_secs.unwrap_or(DEFAULT_SETTLE_TIMEOUT_SECS),
            ),
            dwell: Duration::from_secs(f.dwell_secs.unwrap_or(DEFAULT_DWELL_SECS)),
            capture_yaw_deg: f.capture_yaw_deg.unwrap_or(DEFAULT_CAPTURE_YAW_DEG),
            yaw_reset_factor: f.yaw_reset_factor.unwrap_or(DEFAULT_YAW_RESET_FACTOR),
            gimbal_pitch_deg: f.gimbal_pitch_deg.unwrap_or(DEFAULT_GIMBAL_PITCH_DEG),
            gimbal_roll_deg: f.gimbal_roll_deg.unwrap_or(DEFAULT_GIMBAL_ROLL_DEG),
        };
        let m = file.media.unwrap_or_default();
        let media = MediaSettings {
            download_dir: m
                .download_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR)),
            file_name: m.file_name.unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
        };
        let v = file.vision.unwrap_or_default();
        let vision = VisionSettings {
            model_path: v.model_path,
            frame_width: v.frame_width.unwrap_or(DEFAULT_FRAME_WIDTH),
            frame_height: v.frame_height.unwrap_or(DEFAULT_FRAME_HEIGHT),
            detect_scale: v.detect_scale.unwrap_or(DEFAULT_DETECT_SCALE),
            target_class: v.target_class.unwrap_or(DEFAULT_TARGET_CLASS),
        };
        Self {
            connection,
            flight,
            media,
            vision,
            scale: file.scale.unwrap_or_default(),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(target) = std::env::var("PARKPILOT_SIM_TARGET") {
            if !target.trim().is_empty() {
                self.connection.sim_target = target;
            }
        }
        if let Ok(target) = std::env::var("PARKPILOT_PHYSICAL_TARGET") {
            if !target.trim().is_empty() {
                self.connection.physical_target = target;
            }
        }
        if let Ok(path) = std::env::var("PARKPILOT_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.vision.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(dir) = std::env::var("PARKPILOT_DOWNLOAD_DIR") {
            if !dir.trim().is_empty() {
                self.media.download_dir = PathBuf::from(dir);
            }
        }
        if let Ok(dwell) = std::env::var("PARKPILOT_DWELL_SECS") {
            let seconds: u64 = dwell
                .parse()
                .map_err(|_| anyhow!("PARKPILOT_DWELL_SECS must be an integer number of seconds"))?;
            self.flight.dwell = Duration::from_secs(seconds);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.flight.observation_altitude_m <= 0.0 {
            return Err(anyhow!("observation altitude must be greater than zero"));
        }
        if self.flight.parking_hover_altitude_m <= 0.0 {
            return Err(anyhow!("parking hover altitude must be greater than zero"));
        }
        if self.flight.hover_timeout.is_zero()
            || self.flight.move_timeout.is_zero()
            || self.flight.settle_timeout.is_zero()
        {
            return Err(anyhow!("confirmation timeouts must be greater than zero"));
        }
        if self.vision.frame_width == 0 || self.vision.frame_height == 0 {
            return Err(anyhow!("frame dimensions must be greater than zero"));
        }
        if !(self.vision.detect_scale > 0.0 && self.vision.detect_scale <= 1.0) {
            return Err(anyhow!("detect scale must be in (0, 1]"));
        }
        for (name, ratio) in [
            ("inches_per_pixel", self.scale.inches_per_pixel),
            ("meters_per_inch", self.scale.meters_per_inch),
            ("degrees_per_meter", self.scale.degrees_per_meter),
        ] {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(anyhow!("{} must be a positive finite ratio", name));
            }
        }
        Ok(())
    }
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self::from_file(MissionConfigFile::default())
    }
}

fn read_config_file(path: &Path) -> Result<MissionConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
