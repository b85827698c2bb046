//! Mission Sequencer.
//!
//! Drives one parking mission as a fixed, strictly sequential series of
//! command/acknowledgment steps. Each step is a precondition for the next
//! and nothing is retried: the first failed confirmation unwinds to the
//! recovery path, which returns home when a home fix was recorded,
//! reverses any recorded capture yaw, and always attempts a landing.
//! A landing failure during recovery is fatal and surfaces to the caller.
//!
//! The sequencer owns the single mission-state record. It is created and
//! fully initialized before the first blocking call, so the recovery path
//! can inspect it no matter how early the mission aborted.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::MissionConfig;
use crate::drone::{
    CameraMode, DroneLink, GimbalTarget, OrientationMode, PhotoSettings, RelativeMove,
};
use crate::geo::{GeoPosition, PixelOffset};
use crate::vision::{SpotFix, SpotSource};

// Canned observation for camera-less targets, taken from a training set.
const FALLBACK_OFFSET_HORIZONTAL: f64 = 1936.1716;
const FALLBACK_OFFSET_VERTICAL: f64 = 1787.3828;
const FALLBACK_DISTANCE: f64 = 786.4168;

/// Where captured images come from. Implemented by
/// [`crate::media::MediaClient`] over HTTP and by test stubs.
pub trait MediaSource {
    /// Fetch the most recently stored capture into
    /// `dest_dir/file_name` and return the written path.
    fn download_latest(&self, dest_dir: &Path, file_name: &str) -> Result<PathBuf>;
}

/// The capture-and-locate half of the mission, present only for
/// vision-capable targets.
pub struct SurveyPipeline {
    pub media: Box<dyn MediaSource>,
    pub locator: Box<dyn SpotSource>,
}

/// Everything the recovery path may need, recorded as the mission
/// progresses. Fields stay `None` until the corresponding step confirms.
#[derive(Debug, Default)]
struct MissionState {
    home: Option<GeoPosition>,
    yaw_applied_deg: Option<f64>,
    image_path: Option<PathBuf>,
    target: Option<SpotFix>,
}

/// What one mission run produced.
#[derive(Clone, Debug)]
pub struct MissionReport {
    pub parked_at: Option<GeoPosition>,
    pub spot: Option<SpotFix>,
    pub image: Option<PathBuf>,
    pub landed: bool,
}

pub struct Mission<'a> {
    cfg: &'a MissionConfig,
    state: MissionState,
}

impl<'a> Mission<'a> {
    pub fn new(cfg: &'a MissionConfig) -> Self {
        Self {
            cfg,
            state: MissionState::default(),
        }
    }

    /// Fly the full mission over an already-connected link.
    ///
    /// The connection is released exactly once before this returns,
    /// whatever the outcome.
    pub fn run(
        &mut self,
        link: &mut dyn DroneLink,
        survey: Option<&mut SurveyPipeline>,
    ) -> Result<MissionReport> {
        self.state = MissionState::default();

        let flight = self.fly(link, survey);
        if let Err(e) = &flight {
            log::warn!("mission aborted: {:#}; entering recovery", e);
        }
        let recovery = self.recover(link);
        if let Err(e) = link.disconnect() {
            log::warn!("drone disconnect failed: {:#}", e);
        }

        match (flight, recovery) {
            (Ok(parked_at), Ok(())) => {
                log::info!("mission complete, drone landed");
                Ok(MissionReport {
                    parked_at: Some(parked_at),
                    spot: self.state.target,
                    image: self.state.image_path.clone(),
                    landed: true,
                })
            }
            (Err(flight_err), Ok(())) => {
                Err(flight_err.context("mission aborted; recovery landed the drone"))
            }
            (Ok(_), Err(land_err)) => Err(land_err),
            (Err(flight_err), Err(land_err)) => Err(land_err.context(format!(
                "landing failed while recovering from: {:#}",
                flight_err
            ))),
        }
    }

    /// Steps 1-9: takeoff through the dwell at the parking spot.
    /// Returns the parked position.
    fn fly(
        &mut self,
        link: &mut dyn DroneLink,
        survey: Option<&mut SurveyPipeline>,
    ) -> Result<GeoPosition> {
        let flight = &self.cfg.flight;

        log::info!("taking off");
        link.take_off(flight.hover_timeout)?.require("takeoff")?;

        let start = link.position().context("read position after takeoff")?;
        log::info!(
            "ascending to observation altitude {:.2} m",
            flight.observation_altitude_m
        );
        link.move_to(
            start.at_altitude(flight.observation_altitude_m),
            OrientationMode::None,
            flight.move_timeout,
        )?
        .require("ascent to observation altitude")?;

        let home = link.position().context("read home position")?;
        self.state.home = Some(home);

        let fix = match survey {
            Some(survey) => self.observe(link, survey)?,
            None => {
                log::info!("target has no camera; using the canned observation");
                SpotFix {
                    offset: PixelOffset {
                        horizontal: FALLBACK_OFFSET_HORIZONTAL,
                        vertical: FALLBACK_OFFSET_VERTICAL,
                    },
                    distance: FALLBACK_DISTANCE,
                }
            }
        };
        self.state.target = Some(fix);

        let delta = self.cfg.scale.pixel_offset_to_gps_delta(fix.offset);
        let current = link.position().context("read position before parking move")?;
        let spot = current.offset_by(&delta, flight.parking_hover_altitude_m);
        log::info!(
            "parking spot fix: {:.1} px from reference, moving to ({:.7}, {:.7})",
            fix.distance,
            spot.latitude_deg,
            spot.longitude_deg
        );
        link.move_to(spot, OrientationMode::None, flight.move_timeout)?
            .require("move to parking spot")?;

        log::info!("holding at the spot for {:?}", flight.dwell);
        std::thread::sleep(flight.dwell);

        Ok(spot)
    }

    /// Steps 5-7: camera setup, capture, download, spot location.
    fn observe(
        &mut self,
        link: &mut dyn DroneLink,
        survey: &mut SurveyPipeline,
    ) -> Result<SpotFix> {
        let flight = &self.cfg.flight;

        link.set_camera_mode(CameraMode::Photo, flight.settle_timeout)?
            .require("camera mode")?;
        link.set_photo_mode(&PhotoSettings::default(), flight.settle_timeout)?
            .require("photo settings")?;
        // The camera occasionally falls back to recording mode after a
        // settings update; re-assert photo mode before trusting it.
        link.set_camera_mode(CameraMode::Photo, flight.settle_timeout)?
            .require("camera mode re-assert")?;

        link.set_gimbal_target(
            GimbalTarget::pointing_down(flight.gimbal_pitch_deg, flight.gimbal_roll_deg),
            flight.settle_timeout,
        )?
        .require("gimbal positioning")?;

        // The gimbal has no yaw axis: rotate the whole vehicle and record
        // the applied amount for the recovery heading reset.
        link.move_by(
            RelativeMove::yaw_deg(flight.capture_yaw_deg),
            flight.settle_timeout,
        )?
        .require("capture yaw rotation")?;
        self.state.yaw_applied_deg = Some(flight.capture_yaw_deg);

        log::info!("capturing the lot");
        link.trigger_photo(flight.settle_timeout)?
            .require("photo capture")?;

        let image_path = survey
            .media
            .download_latest(&self.cfg.media.download_dir, &self.cfg.media.file_name)
            .context("download capture")?;
        log::info!("capture downloaded to {}", image_path.display());
        self.state.image_path = Some(image_path.clone());

        survey
            .locator
            .locate(&image_path)
            .context("locate parking spot")
    }

    /// Step 10: unconditional recovery. Return-home and heading reset are
    /// best-effort; the landing is mandatory and its failure surfaces.
    fn recover(&mut self, link: &mut dyn DroneLink) -> Result<()> {
        let flight = &self.cfg.flight;

        if let Some(home) = self.state.home {
            let above_home = home.at_altitude(flight.parking_hover_altitude_m * 2.0);
            log::info!("returning home");
            match link.move_to(above_home, OrientationMode::None, flight.move_timeout) {
                Ok(ack) if ack.is_confirmed() => {}
                Ok(ack) => log::warn!("return home not confirmed: {:?}", ack),
                Err(e) => log::warn!("return home failed: {:#}", e),
            }
        }

        if let Some(yaw_applied_deg) = self.state.yaw_applied_deg {
            let reset_deg = flight.yaw_reset_factor * yaw_applied_deg;
            log::info!("resetting heading by {:.1} deg", reset_deg);
            if let Err(e) = reset_heading(link, reset_deg, flight.settle_timeout) {
                log::warn!("heading reset failed: {:#}", e);
            }
        }

        log::info!("landing");
        link.land(flight.move_timeout)?.require("landing")
    }
}

fn reset_heading(link: &mut dyn DroneLink, yaw_deg: f64, timeout: Duration) -> Result<()> {
    link.set_gimbal_target(GimbalTarget::level(), timeout)?
        .require("gimbal reset")?;
    link.move_by(RelativeMove::yaw_deg(yaw_deg), timeout)?
        .require("heading reset")?;
    Ok(())
}

/// Standalone safety command: land the drone without entering the parking
/// sequence. The connection is released before returning.
pub fn force_land(link: &mut dyn DroneLink, timeout: Duration) -> Result<()> {
    log::info!("force landing");
    let landing = link.land(timeout).and_then(|ack| ack.require("landing"));
    if let Err(e) = link.disconnect() {
        log::warn!("drone disconnect failed: {:#}", e);
    }
    landing
}
