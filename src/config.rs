use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::ingest::CameraConfig;
use crate::pipeline::DEFAULT_FRAME_WIDTH;
use crate::report::{ReportFormat, DEFAULT_REPORTS_DIR};

const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;
const DEFAULT_INPUT_SIZE: u32 = 300;
const DEFAULT_MEAN_BGR: [f32; 3] = [104.0, 177.0, 123.0];

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AppConfigFile {
    min_confidence: Option<f64>,
    format: Option<String>,
    reports_dir: Option<PathBuf>,
    frame_width: Option<u32>,
    detector: Option<DetectorConfigFile>,
    camera: Option<CameraConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    model_path: Option<PathBuf>,
    input_size: Option<u32>,
    mean: Option<[f32; 3]>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CameraConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub min_confidence: f64,
    pub format: ReportFormat,
    pub reports_dir: PathBuf,
    pub frame_width: u32,
    pub detector: DetectorSettings,
    pub camera: CameraConfig,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub model_path: Option<PathBuf>,
    pub input_size: u32,
    /// Per-channel mean subtracted from BGR input.
    pub mean_bgr: [f32; 3],
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            format: ReportFormat::default(),
            reports_dir: PathBuf::from(DEFAULT_REPORTS_DIR),
            frame_width: DEFAULT_FRAME_WIDTH,
            detector: DetectorSettings {
                model_path: None,
                input_size: DEFAULT_INPUT_SIZE,
                mean_bgr: DEFAULT_MEAN_BGR,
            },
            camera: CameraConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the TOML file named by `FACE_REPORT_CONFIG`, then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FACE_REPORT_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let format = match file.format.as_deref() {
            Some(format) => format.parse()?,
            None => defaults.format,
        };
        let detector = file.detector.unwrap_or_default();
        let camera = file.camera.unwrap_or_default();
        Ok(Self {
            min_confidence: file.min_confidence.unwrap_or(defaults.min_confidence),
            format,
            reports_dir: file.reports_dir.unwrap_or(defaults.reports_dir),
            frame_width: file.frame_width.unwrap_or(defaults.frame_width),
            detector: DetectorSettings {
                model_path: detector.model_path,
                input_size: detector.input_size.unwrap_or(defaults.detector.input_size),
                mean_bgr: detector.mean.unwrap_or(defaults.detector.mean_bgr),
            },
            camera: CameraConfig {
                device: camera.device.unwrap_or(defaults.camera.device),
                target_fps: camera.target_fps.unwrap_or(defaults.camera.target_fps),
                width: camera.width.unwrap_or(defaults.camera.width),
                height: camera.height.unwrap_or(defaults.camera.height),
            },
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("FACE_REPORT_MIN_CONFIDENCE") {
            self.min_confidence = value
                .trim()
                .parse()
                .map_err(|_| anyhow!("FACE_REPORT_MIN_CONFIDENCE must be a number in 0..=1"))?;
        }
        if let Ok(format) = std::env::var("FACE_REPORT_FORMAT") {
            if !format.trim().is_empty() {
                self.format = format.parse()?;
            }
        }
        if let Ok(dir) = std::env::var("FACE_REPORT_DIR") {
            if !dir.trim().is_empty() {
                self.reports_dir = PathBuf::from(dir);
            }
        }
        if let Ok(width) = std::env::var("FACE_REPORT_FRAME_WIDTH") {
            self.frame_width = width
                .trim()
                .parse()
                .map_err(|_| anyhow!("FACE_REPORT_FRAME_WIDTH must be an integer pixel width"))?;
        }
        if let Ok(model) = std::env::var("FACE_REPORT_MODEL") {
            if !model.trim().is_empty() {
                self.detector.model_path = Some(PathBuf::from(model));
            }
        }
        Ok(())
    }

    /// Check ranges. Called by `load` and again after CLI overrides.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(anyhow!(
                "min_confidence must be within 0..=1, got {}",
                self.min_confidence
            ));
        }
        if self.frame_width == 0 {
            return Err(anyhow!("frame_width must be greater than zero"));
        }
        if self.detector.input_size == 0 {
            return Err(anyhow!("detector input_size must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
