//! Synthetic in-process drone.
//!
//! Selected by `stub://` connection targets. Confirms every command
//! immediately while tracking commanded position, heading, and flying
//! state, so the full mission sequence can run without an aircraft or a
//! simulator endpoint.

use anyhow::Result;
use std::time::Duration;

use super::wire::FlyingState;
use super::{
    Ack, CameraMode, DroneLink, GimbalTarget, OrientationMode, PhotoSettings, RelativeMove,
};
use crate::geo::GeoPosition;

// Spawn point matching the simulator's default world origin.
const SPAWN_LATITUDE_DEG: f64 = 48.878922;
const SPAWN_LONGITUDE_DEG: f64 = 2.367782;
const TAKEOFF_ALTITUDE_M: f64 = 1.0;

pub struct StubLink {
    position: GeoPosition,
    heading_rad: f64,
    state: FlyingState,
    camera_mode: CameraMode,
    photos_taken: u32,
    connected: bool,
}

impl StubLink {
    pub fn new() -> Self {
        Self {
            position: GeoPosition {
                latitude_deg: SPAWN_LATITUDE_DEG,
                longitude_deg: SPAWN_LONGITUDE_DEG,
                altitude_m: 0.0,
            },
            heading_rad: 0.0,
            state: FlyingState::Landed,
            camera_mode: CameraMode::Recording,
            photos_taken: 0,
            connected: true,
        }
    }

    pub fn flying_state(&self) -> FlyingState {
        self.state
    }

    pub fn heading_rad(&self) -> f64 {
        self.heading_rad
    }

    pub fn camera_mode(&self) -> CameraMode {
        self.camera_mode
    }

    pub fn photos_taken(&self) -> u32 {
        self.photos_taken
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

impl Default for StubLink {
    fn default() -> Self {
        Self::new()
    }
}

impl DroneLink for StubLink {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn take_off(&mut self, _timeout: Duration) -> Result<Ack> {
        self.state = FlyingState::Hovering;
        self.position.altitude_m = TAKEOFF_ALTITUDE_M;
        Ok(Ack::Confirmed)
    }

    fn land(&mut self, _timeout: Duration) -> Result<Ack> {
        self.state = FlyingState::Landed;
        self.position.altitude_m = 0.0;
        Ok(Ack::Confirmed)
    }

    fn move_to(
        &mut self,
        target: GeoPosition,
        _orientation: OrientationMode,
        _timeout: Duration,
    ) -> Result<Ack> {
        self.state = FlyingState::Hovering;
        self.position = target;
        Ok(Ack::Confirmed)
    }

    fn move_by(&mut self, delta: RelativeMove, _timeout: Duration) -> Result<Ack> {
        self.heading_rad += delta.dyaw_rad;
        self.position.altitude_m -= delta.dz_m;
        Ok(Ack::Confirmed)
    }

    fn set_camera_mode(&mut self, mode: CameraMode, _timeout: Duration) -> Result<Ack> {
        self.camera_mode = mode;
        Ok(Ack::Confirmed)
    }

    fn set_photo_mode(&mut self, _settings: &PhotoSettings, _timeout: Duration) -> Result<Ack> {
        Ok(Ack::Confirmed)
    }

    fn trigger_photo(&mut self, _timeout: Duration) -> Result<Ack> {
        self.photos_taken += 1;
        Ok(Ack::Confirmed)
    }

    fn set_gimbal_target(&mut self, _target: GimbalTarget, _timeout: Duration) -> Result<Ack> {
        Ok(Ack::Confirmed)
    }

    fn position(&mut self) -> Result<GeoPosition> {
        Ok(self.position)
    }

    fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }
}
