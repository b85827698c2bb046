//! End-to-end mission sequencing against a scripted drone link.
//!
//! The mock link confirms (or times out) every command and records what
//! was issued, so the tests can assert the fixed command order, the
//! recovery behavior under failure injection, and that the connection is
//! released exactly once per mission.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parkpilot::drone::{
    CameraMode, GimbalTarget, OrientationMode, PhotoSettings, RelativeMove,
};
use parkpilot::{
    Ack, DroneLink, GeoPosition, MediaSource, Mission, MissionConfig, NoSpotFound, PixelOffset,
    SpotFix, SpotSource, SurveyPipeline,
};

#[derive(Clone, Debug, PartialEq)]
enum Issued {
    TakeOff,
    MoveTo { altitude_m: f64 },
    MoveBy { dyaw_rad: f64 },
    SetCameraMode,
    SetPhotoMode,
    TakePhoto,
    SetGimbalTarget,
    Land,
}

/// Scripted drone: confirms everything unless told to time out a specific
/// move-to altitude.
struct MockLink {
    issued: Vec<Issued>,
    position: GeoPosition,
    timeout_move_to_altitude: Option<f64>,
    disconnects: u32,
}

impl MockLink {
    fn new() -> Self {
        Self {
            issued: Vec::new(),
            position: GeoPosition {
                latitude_deg: 48.878922,
                longitude_deg: 2.367782,
                altitude_m: 0.0,
            },
            timeout_move_to_altitude: None,
            disconnects: 0,
        }
    }

    fn timing_out_at_altitude(altitude_m: f64) -> Self {
        Self {
            timeout_move_to_altitude: Some(altitude_m),
            ..Self::new()
        }
    }

    fn issued_moves_to_altitude(&self, altitude_m: f64) -> usize {
        self.issued
            .iter()
            .filter(|c| matches!(c, Issued::MoveTo { altitude_m: a } if *a == altitude_m))
            .count()
    }

    fn count(&self, wanted: &Issued) -> usize {
        self.issued.iter().filter(|c| *c == wanted).count()
    }
}

impl DroneLink for MockLink {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn take_off(&mut self, _timeout: Duration) -> Result<Ack> {
        self.issued.push(Issued::TakeOff);
        self.position.altitude_m = 1.0;
        Ok(Ack::Confirmed)
    }

    fn land(&mut self, _timeout: Duration) -> Result<Ack> {
        self.issued.push(Issued::Land);
        Ok(Ack::Confirmed)
    }

    fn move_to(
        &mut self,
        target: GeoPosition,
        _orientation: OrientationMode,
        _timeout: Duration,
    ) -> Result<Ack> {
        self.issued.push(Issued::MoveTo {
            altitude_m: target.altitude_m,
        });
        if self.timeout_move_to_altitude == Some(target.altitude_m) {
            return Ok(Ack::TimedOut);
        }
        self.position = target;
        Ok(Ack::Confirmed)
    }

    fn move_by(&mut self, delta: RelativeMove, _timeout: Duration) -> Result<Ack> {
        self.issued.push(Issued::MoveBy {
            dyaw_rad: delta.dyaw_rad,
        });
        Ok(Ack::Confirmed)
    }

    fn set_camera_mode(&mut self, _mode: CameraMode, _timeout: Duration) -> Result<Ack> {
        self.issued.push(Issued::SetCameraMode);
        Ok(Ack::Confirmed)
    }

    fn set_photo_mode(&mut self, _settings: &PhotoSettings, _timeout: Duration) -> Result<Ack> {
        self.issued.push(Issued::SetPhotoMode);
        Ok(Ack::Confirmed)
    }

    fn trigger_photo(&mut self, _timeout: Duration) -> Result<Ack> {
        self.issued.push(Issued::TakePhoto);
        Ok(Ack::Confirmed)
    }

    fn set_gimbal_target(&mut self, _target: GimbalTarget, _timeout: Duration) -> Result<Ack> {
        self.issued.push(Issued::SetGimbalTarget);
        Ok(Ack::Confirmed)
    }

    fn position(&mut self) -> Result<GeoPosition> {
        Ok(self.position)
    }

    fn disconnect(&mut self) -> Result<()> {
        self.disconnects += 1;
        Ok(())
    }
}

struct StubMedia {
    path: PathBuf,
}

impl MediaSource for StubMedia {
    fn download_latest(&self, _dest_dir: &Path, _file_name: &str) -> Result<PathBuf> {
        Ok(self.path.clone())
    }
}

struct StubSpot {
    result: Result<SpotFix, NoSpotFound>,
}

impl SpotSource for StubSpot {
    fn locate(&mut self, _image_path: &Path) -> Result<SpotFix> {
        self.result.clone().map_err(anyhow::Error::new)
    }
}

fn test_config() -> MissionConfig {
    let mut cfg = MissionConfig::default();
    cfg.flight.dwell = Duration::ZERO;
    cfg
}

fn survey_returning(result: Result<SpotFix, NoSpotFound>) -> SurveyPipeline {
    SurveyPipeline {
        media: Box::new(StubMedia {
            path: PathBuf::from("capture.jpg"),
        }),
        locator: Box::new(StubSpot { result }),
    }
}

fn canned_fix() -> SpotFix {
    SpotFix {
        offset: PixelOffset {
            horizontal: 1936.17,
            vertical: 1787.38,
        },
        distance: 786.42,
    }
}

#[test]
fn successful_mission_issues_commands_in_fixed_order() {
    let cfg = test_config();
    let mut link = MockLink::new();
    let mut survey = survey_returning(Ok(canned_fix()));

    let report = Mission::new(&cfg)
        .run(&mut link, Some(&mut survey))
        .expect("mission succeeds");
    assert!(report.landed);
    assert!(report.parked_at.is_some());

    let capture_yaw = RelativeMove::yaw_deg(cfg.flight.capture_yaw_deg).dyaw_rad;
    let reset_yaw =
        RelativeMove::yaw_deg(cfg.flight.yaw_reset_factor * cfg.flight.capture_yaw_deg).dyaw_rad;
    let expected = vec![
        Issued::TakeOff,
        Issued::MoveTo { altitude_m: 1.8 },
        Issued::SetCameraMode,
        Issued::SetPhotoMode,
        Issued::SetCameraMode,
        Issued::SetGimbalTarget,
        Issued::MoveBy {
            dyaw_rad: capture_yaw,
        },
        Issued::TakePhoto,
        Issued::MoveTo { altitude_m: 0.25 },
        Issued::MoveTo { altitude_m: 0.5 },
        Issued::SetGimbalTarget,
        Issued::MoveBy {
            dyaw_rad: reset_yaw,
        },
        Issued::Land,
    ];
    assert_eq!(link.issued, expected);

    assert_eq!(link.count(&Issued::TakeOff), 1);
    assert_eq!(link.count(&Issued::Land), 1);
    assert_eq!(link.disconnects, 1);
}

#[test]
fn camera_less_mission_skips_photo_pipeline_and_heading_reset() {
    let cfg = test_config();
    let mut link = MockLink::new();

    let report = Mission::new(&cfg)
        .run(&mut link, None)
        .expect("mission succeeds");
    assert!(report.landed);

    let expected = vec![
        Issued::TakeOff,
        Issued::MoveTo { altitude_m: 1.8 },
        Issued::MoveTo { altitude_m: 0.25 },
        Issued::MoveTo { altitude_m: 0.5 },
        Issued::Land,
    ];
    assert_eq!(link.issued, expected);
    assert_eq!(link.disconnects, 1);
}

#[test]
fn parking_target_applies_the_scale_chain_to_the_fix() {
    let cfg = test_config();
    let mut link = MockLink::new();
    let mut survey = survey_returning(Ok(canned_fix()));

    let report = Mission::new(&cfg)
        .run(&mut link, Some(&mut survey))
        .expect("mission succeeds");

    let parked = report.parked_at.expect("parked position");
    let home = GeoPosition {
        latitude_deg: 48.878922,
        longitude_deg: 2.367782,
        altitude_m: 1.8,
    };
    let delta = cfg.scale.pixel_offset_to_gps_delta(canned_fix().offset);
    assert!((parked.latitude_deg - (home.latitude_deg + delta.latitude_deg)).abs() < 1e-12);
    assert!((parked.longitude_deg - (home.longitude_deg + delta.longitude_deg)).abs() < 1e-12);
    assert_eq!(parked.altitude_m, 0.25);
}

#[test]
fn ascend_timeout_lands_without_a_park_move() {
    let cfg = test_config();
    let mut link = MockLink::timing_out_at_altitude(1.8);
    let mut survey = survey_returning(Ok(canned_fix()));

    let err = Mission::new(&cfg)
        .run(&mut link, Some(&mut survey))
        .expect_err("mission aborts");
    assert!(err.to_string().contains("recovery landed the drone"));

    // The ascend was attempted, then recovery landed. No photo pipeline,
    // no park move, no return home (none was recorded yet).
    assert_eq!(link.issued_moves_to_altitude(1.8), 1);
    assert_eq!(link.issued_moves_to_altitude(0.25), 0);
    assert_eq!(link.issued_moves_to_altitude(0.5), 0);
    assert_eq!(link.count(&Issued::TakePhoto), 0);
    assert_eq!(link.count(&Issued::Land), 1);
    assert_eq!(link.disconnects, 1);
}

#[test]
fn no_spot_found_aborts_to_recovery_with_heading_reset() {
    let cfg = test_config();
    let mut link = MockLink::new();
    let mut survey = survey_returning(Err(NoSpotFound));

    let err = Mission::new(&cfg)
        .run(&mut link, Some(&mut survey))
        .expect_err("mission aborts");
    assert!(err
        .chain()
        .any(|cause| cause.downcast_ref::<NoSpotFound>().is_some()));

    // The capture yaw was applied before the locator failed, so recovery
    // must reverse it and land; the park move never happens.
    assert_eq!(link.issued_moves_to_altitude(0.25), 0);
    assert_eq!(link.issued_moves_to_altitude(0.5), 1);
    let reset_yaw =
        RelativeMove::yaw_deg(cfg.flight.yaw_reset_factor * cfg.flight.capture_yaw_deg).dyaw_rad;
    assert_eq!(
        link.count(&Issued::MoveBy {
            dyaw_rad: reset_yaw
        }),
        1
    );
    assert_eq!(link.count(&Issued::Land), 1);
    assert_eq!(link.disconnects, 1);
}

#[test]
fn force_land_lands_and_disconnects_once() {
    let mut link = MockLink::new();
    parkpilot::force_land(&mut link, Duration::from_secs(30)).expect("landing succeeds");
    assert_eq!(link.issued, vec![Issued::Land]);
    assert_eq!(link.disconnects, 1);
}
