use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use parkpilot::MissionConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "PARKPILOT_CONFIG",
        "PARKPILOT_SIM_TARGET",
        "PARKPILOT_PHYSICAL_TARGET",
        "PARKPILOT_MODEL_PATH",
        "PARKPILOT_DOWNLOAD_DIR",
        "PARKPILOT_DWELL_SECS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = MissionConfig::load().expect("load config");

    assert_eq!(cfg.connection.sim_target, "tcp://10.202.0.1:44444");
    assert_eq!(cfg.connection.physical_target, "tcp://192.168.42.1:44444");
    assert_eq!(cfg.flight.observation_altitude_m, 1.8);
    assert_eq!(cfg.flight.parking_hover_altitude_m, 0.25);
    assert_eq!(cfg.flight.hover_timeout, Duration::from_secs(5));
    assert_eq!(cfg.flight.dwell, Duration::from_secs(5));
    assert_eq!(cfg.flight.capture_yaw_deg, -15.0);
    assert_eq!(cfg.media.file_name, "capture.jpg");
    assert_eq!(cfg.vision.detect_size(), (2304, 1728));
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "connection": {
            "sim_target": "stub://bench",
            "physical_target": "tcp://192.168.53.1:44444"
        },
        "flight": {
            "observation_altitude_m": 2.5,
            "dwell_secs": 3,
            "capture_yaw_deg": -20.0
        },
        "media": {
            "download_dir": "/tmp/captures",
            "file_name": "lot.jpg"
        },
        "vision": {
            "frame_width": 1920,
            "frame_height": 1080,
            "detect_scale": 0.25,
            "target_class": 1
        },
        "scale": {
            "inches_per_pixel": 0.04
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("PARKPILOT_CONFIG", file.path());
    std::env::set_var("PARKPILOT_SIM_TARGET", "stub://override");
    std::env::set_var("PARKPILOT_DWELL_SECS", "9");
    std::env::set_var("PARKPILOT_MODEL_PATH", "/opt/models/spots.onnx");

    let cfg = MissionConfig::load().expect("load config");

    // Env wins over file; file wins over defaults.
    assert_eq!(cfg.connection.sim_target, "stub://override");
    assert_eq!(cfg.connection.physical_target, "tcp://192.168.53.1:44444");
    assert_eq!(cfg.flight.observation_altitude_m, 2.5);
    assert_eq!(cfg.flight.dwell, Duration::from_secs(9));
    assert_eq!(cfg.flight.capture_yaw_deg, -20.0);
    assert_eq!(cfg.flight.parking_hover_altitude_m, 0.25);
    assert_eq!(cfg.media.download_dir.to_str(), Some("/tmp/captures"));
    assert_eq!(cfg.media.file_name, "lot.jpg");
    assert_eq!(
        cfg.vision.model_path.as_deref().and_then(|p| p.to_str()),
        Some("/opt/models/spots.onnx")
    );
    assert_eq!(cfg.vision.target_class, 1);
    assert_eq!(cfg.vision.detect_size(), (480, 270));
    assert_eq!(cfg.scale.inches_per_pixel, 0.04);
    // Untouched scale ratios keep their calibrated defaults.
    assert_eq!(cfg.scale.meters_per_inch, 0.0254);

    clear_env();
}

#[test]
fn rejects_out_of_range_detect_scale() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{ "vision": { "detect_scale": 0.0 } }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("PARKPILOT_CONFIG", file.path());

    let err = MissionConfig::load().expect_err("invalid scale");
    assert!(err.to_string().contains("detect scale"));

    clear_env();
}

#[test]
fn rejects_non_numeric_dwell_override() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PARKPILOT_DWELL_SECS", "soon");

    let err = MissionConfig::load().expect_err("invalid dwell");
    assert!(err.to_string().contains("PARKPILOT_DWELL_SECS"));

    clear_env();
}
