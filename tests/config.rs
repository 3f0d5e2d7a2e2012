use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use face_report::config::AppConfig;
use face_report::ReportFormat;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "FACE_REPORT_CONFIG",
        "FACE_REPORT_MIN_CONFIDENCE",
        "FACE_REPORT_FORMAT",
        "FACE_REPORT_DIR",
        "FACE_REPORT_FRAME_WIDTH",
        "FACE_REPORT_MODEL",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let toml = r#"
        min_confidence = 0.6
        format = "xlsx"
        reports_dir = "/var/lib/face-report"

        [detector]
        model_path = "models/res10_300x300.onnx"
        input_size = 300

        [camera]
        device = "/dev/video1"
        target_fps = 15
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    std::env::set_var("FACE_REPORT_CONFIG", file.path());
    std::env::set_var("FACE_REPORT_FORMAT", "json");
    std::env::set_var("FACE_REPORT_FRAME_WIDTH", "640");

    let cfg = AppConfig::load().expect("load config");
    assert_eq!(cfg.min_confidence, 0.6);
    assert_eq!(cfg.format, ReportFormat::Json);
    assert_eq!(cfg.reports_dir, PathBuf::from("/var/lib/face-report"));
    assert_eq!(cfg.frame_width, 640);
    assert_eq!(
        cfg.detector.model_path,
        Some(PathBuf::from("models/res10_300x300.onnx"))
    );
    assert_eq!(cfg.camera.device, "/dev/video1");
    assert_eq!(cfg.camera.target_fps, 15);
    assert_eq!(cfg.camera.width, 640);

    clear_env();
}

#[test]
fn defaults_apply_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = AppConfig::load().expect("load defaults");
    assert_eq!(cfg.min_confidence, 0.5);
    assert_eq!(cfg.format, ReportFormat::Csv);
    assert_eq!(cfg.reports_dir, PathBuf::from("reports"));
    assert_eq!(cfg.frame_width, 400);
    assert!(cfg.detector.model_path.is_none());
}

#[test]
fn rejects_unknown_format_from_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("FACE_REPORT_FORMAT", "parquet");
    let err = AppConfig::load().expect_err("unknown format must fail");
    assert!(err.to_string().contains("parquet"));

    clear_env();
}

#[test]
fn rejects_out_of_range_confidence_from_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("FACE_REPORT_MIN_CONFIDENCE", "1.2");
    assert!(AppConfig::load().is_err());

    std::env::set_var("FACE_REPORT_MIN_CONFIDENCE", "high");
    assert!(AppConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_unknown_keys_in_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"confidence = 0.4\n").expect("write config");
    std::env::set_var("FACE_REPORT_CONFIG", file.path());

    let err = AppConfig::load().expect_err("unknown key must fail");
    assert!(err.to_string().contains("invalid config file"));

    clear_env();
}
