//! Wire protocol for the TCP link.
//!
//! One JSON document per line in each direction. Requests carry a sequence
//! number and a tagged command; the ground endpoint answers with tagged
//! state-change events, echoing the sequence number of the command that
//! triggered them. Events may also arrive spontaneously (telemetry), in
//! which case `seq` is absent; a waiter skips whatever it is not waiting
//! for.

use serde::{Deserialize, Serialize};

use super::{CameraMode, GimbalTarget, OrientationMode, PhotoSettings};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub seq: u64,
    #[serde(flatten)]
    pub command: Command,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    TakeOff,
    Land,
    MoveTo {
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_m: f64,
        orientation_mode: OrientationMode,
        heading_deg: f64,
    },
    MoveBy {
        dx_m: f64,
        dy_m: f64,
        dz_m: f64,
        dyaw_rad: f64,
    },
    SetCameraMode {
        cam_id: u8,
        mode: CameraMode,
    },
    SetPhotoMode {
        cam_id: u8,
        settings: PhotoSettings,
    },
    TakePhoto {
        cam_id: u8,
    },
    SetGimbalTarget {
        gimbal_id: u8,
        target: GimbalTarget,
    },
    GetPosition,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    #[serde(flatten)]
    pub event: Event,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlyingState {
    Landed,
    TakingOff,
    Hovering,
    Flying,
    Landing,
    Emergency,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveStatus {
    Running,
    Done,
    Canceled,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoResult {
    PhotoTaken,
    PhotoSaved,
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    FlyingStateChanged {
        state: FlyingState,
    },
    MoveToChanged {
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_m: f64,
        status: MoveStatus,
    },
    MoveByEnded {
        dyaw_rad: f64,
        status: MoveStatus,
    },
    CameraModeChanged {
        cam_id: u8,
        mode: CameraMode,
    },
    PhotoModeChanged {
        cam_id: u8,
    },
    PhotoProgress {
        result: PhotoResult,
    },
    GimbalTargetReached {
        gimbal_id: u8,
    },
    Position {
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_m: f64,
    },
    CommandRejected {
        reason: String,
    },
}
