//! Drone command channel.
//!
//! This module is the boundary to the flight-control SDK. Every command is
//! a request/acknowledgment pair: the caller issues one command, then
//! blocks until the paired state-change event arrives or an explicit
//! timeout elapses. There is exactly one in-flight command at a time and
//! no mid-command cancellation; the only abort mechanism is a failed
//! confirmation.
//!
//! Connection targets are URLs. `tcp://host:port` speaks the JSON-lines
//! protocol in [`wire`] to a ground-SDK endpoint; `stub://name` runs an
//! in-process synthetic drone that confirms every command (used by the
//! simulator profile and by tests).

mod stub;
mod tcp;
pub mod wire;

pub use stub::StubLink;
pub use tcp::TcpLink;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::geo::GeoPosition;

/// Outcome of one blocking confirmation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum Ack {
    /// The paired state-change event arrived and reported success.
    Confirmed,
    /// The drone reported the command failed or was refused.
    Rejected(String),
    /// The timeout elapsed before the paired event arrived.
    TimedOut,
}

impl Ack {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Ack::Confirmed)
    }

    /// Convert a non-confirmation into an error naming the action.
    pub fn require(self, action: &str) -> Result<()> {
        match self {
            Ack::Confirmed => Ok(()),
            Ack::Rejected(reason) => Err(anyhow!("{} rejected: {}", action, reason)),
            Ack::TimedOut => Err(anyhow!("{} confirmation timed out", action)),
        }
    }
}

/// Heading constraint for an absolute move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientationMode {
    None,
    ToTarget,
    HeadingStart,
    HeadingDuring,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMode {
    Photo,
    Recording,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoMode {
    Single,
    Burst,
    Bracketing,
    TimeLapse,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoFormat {
    Rectilinear,
    FullFrame,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoFileFormat {
    Jpeg,
    DngJpeg,
}

/// Photo-capture parameters, applied before triggering a capture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhotoSettings {
    pub mode: PhotoMode,
    pub format: PhotoFormat,
    pub file_format: PhotoFileFormat,
    /// Burst profile id, only consulted in burst mode.
    pub burst: String,
    /// Bracketing preset id, only consulted in bracketing mode.
    pub bracketing: String,
    pub capture_interval_s: f64,
}

impl Default for PhotoSettings {
    fn default() -> Self {
        Self {
            mode: PhotoMode::Single,
            format: PhotoFormat::Rectilinear,
            file_format: PhotoFileFormat::Jpeg,
            burst: "burst_14_over_1s".to_string(),
            bracketing: "preset_1ev".to_string(),
            capture_interval_s: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOfReference {
    Absolute,
    Relative,
}

/// Position-mode gimbal target. The mount has pitch and roll axes only;
/// yaw is achieved by rotating the whole vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GimbalTarget {
    pub pitch_deg: f64,
    pub pitch_frame: FrameOfReference,
    pub roll_deg: f64,
    pub roll_frame: FrameOfReference,
}

impl GimbalTarget {
    pub fn pointing_down(pitch_deg: f64, roll_deg: f64) -> Self {
        Self {
            pitch_deg,
            pitch_frame: FrameOfReference::Absolute,
            roll_deg,
            roll_frame: FrameOfReference::Relative,
        }
    }

    /// Neutral pitch and roll, used before the recovery heading reset.
    pub fn level() -> Self {
        Self::pointing_down(0.0, 0.0)
    }
}

/// Relative translation plus heading rotation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelativeMove {
    pub dx_m: f64,
    pub dy_m: f64,
    pub dz_m: f64,
    pub dyaw_rad: f64,
}

impl RelativeMove {
    /// Pure heading rotation, in degrees.
    pub fn yaw_deg(deg: f64) -> Self {
        Self {
            dx_m: 0.0,
            dy_m: 0.0,
            dz_m: 0.0,
            dyaw_rad: deg.to_radians(),
        }
    }
}

/// The SDK boundary.
///
/// Each method issues one command and blocks until its paired state-change
/// event arrives or `timeout` elapses, reporting the outcome as a typed
/// [`Ack`]. Implementations outside this crate adapt a vendor SDK;
/// in-crate, [`TcpLink`] speaks the wire protocol and [`StubLink`] is the
/// synthetic drone.
pub trait DroneLink {
    /// Identifies the link kind in logs.
    fn name(&self) -> &'static str;

    /// Take off; confirmed when the vehicle reports a hovering state.
    fn take_off(&mut self, timeout: Duration) -> Result<Ack>;

    /// Land; confirmed when the vehicle reports a landed state.
    fn land(&mut self, timeout: Duration) -> Result<Ack>;

    /// Absolute move; confirmed only on arrival at exactly `target`.
    fn move_to(
        &mut self,
        target: GeoPosition,
        orientation: OrientationMode,
        timeout: Duration,
    ) -> Result<Ack>;

    /// Relative translation and heading rotation.
    fn move_by(&mut self, delta: RelativeMove, timeout: Duration) -> Result<Ack>;

    fn set_camera_mode(&mut self, mode: CameraMode, timeout: Duration) -> Result<Ack>;

    fn set_photo_mode(&mut self, settings: &PhotoSettings, timeout: Duration) -> Result<Ack>;

    /// Trigger a capture; confirmed when the photo-saved signal arrives.
    fn trigger_photo(&mut self, timeout: Duration) -> Result<Ack>;

    fn set_gimbal_target(&mut self, target: GimbalTarget, timeout: Duration) -> Result<Ack>;

    /// Current position fix.
    fn position(&mut self) -> Result<GeoPosition>;

    /// Release the channel. Idempotent; later calls are no-ops.
    fn disconnect(&mut self) -> Result<()>;
}

/// Open a drone link for a connection target URL.
///
/// Scheme dispatch: `tcp://` for the wire protocol, `stub://` for the
/// synthetic in-process drone. Connection failure here is fatal - there is
/// no aircraft to recover.
pub fn connect(target: &str) -> Result<Box<dyn DroneLink>> {
    let url = Url::parse(target)
        .map_err(|e| anyhow!("invalid connection target '{}': {}", target, e))?;
    match url.scheme() {
        "stub" => Ok(Box::new(StubLink::new())),
        "tcp" => Ok(Box::new(TcpLink::connect(&url)?)),
        other => bail!(
            "unsupported connection scheme '{}'; expected tcp or stub",
            other
        ),
    }
}
