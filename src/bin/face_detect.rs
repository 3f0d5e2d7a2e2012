//! face_detect - detect faces in a video or camera stream and write a report
//!
//! This binary:
//! 1. Loads layered configuration (file, env, flags)
//! 2. Opens a video file, or the camera when no video is given
//! 3. Runs the detector on every frame and tracks detection events
//! 4. On end of a video file, writes the report to reports/face_detection_<date>.<ext>

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use face_report::{
    open_source, run, AppConfig, DetectorBackend, PipelineConfig, ReportConfig, ReportFormat,
    ReportTable, ReportWriter, StubBackend,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// tract when a model is configured, stub otherwise.
    Auto,
    Stub,
    Tract,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the video file (or a stub:// clip). Camera if none.
    #[arg(short, long)]
    video: Option<String>,
    /// Path to the ONNX face detection model.
    #[arg(short, long, env = "FACE_REPORT_MODEL")]
    model: Option<PathBuf>,
    /// Minimum probability to filter weak detections.
    #[arg(short, long)]
    confidence: Option<f64>,
    /// Format of the output report (csv|xlsx|json).
    #[arg(short, long)]
    format: Option<String>,
    /// Detector backend.
    #[arg(long, value_enum, default_value_t = Backend::Auto)]
    backend: Backend,
    /// Camera device used when no video is given.
    #[arg(long)]
    camera: Option<String>,
    /// Directory reports are written to.
    #[arg(long)]
    reports_dir: Option<PathBuf>,
    /// Width frames are resized to before inference.
    #[arg(long)]
    frame_width: Option<u32>,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, value_enum, default_value_t = ui::UiMode::Auto, value_name = "MODE")]
    ui: ui::UiMode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = ui::Ui::new(
        args.ui,
        std::io::stderr().is_terminal(),
        std::io::stdout().is_terminal(),
    );

    let cfg = resolve_config(&args)?;
    log::debug!("Arguments parsed: {:?}", args);
    log::debug!("Configuration resolved: {:?}", cfg);

    let mut detector = {
        let stage = ui.stage("Load detector");
        let mut detector = build_detector(args.backend, &cfg)?;
        detector.warm_up()?;
        stage.note(detector.name());
        detector
    };

    let mut source = {
        let stage = ui.stage("Open source");
        let mut source = open_source(args.video.as_deref(), &cfg.camera)?;
        source.connect()?;
        stage.note(source.describe());
        source
    };

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::SeqCst);
        })
        .expect("error setting Ctrl-C handler");
    }

    let pipeline_cfg = PipelineConfig {
        min_confidence: cfg.min_confidence,
        frame_width: cfg.frame_width,
        max_frames: args.max_frames,
    };
    let output = {
        let stage = ui.stage("Process frames");
        let output = run(&mut source, &mut detector, &pipeline_cfg, &stop)?;
        stage.note(format!(
            "{} frames, {} events",
            output.summary.frames, output.summary.events
        ));
        output
    };

    if !output.should_report() {
        log::info!("live session ended; no report is written for camera runs");
        return Ok(());
    }

    let path = {
        let stage = ui.stage("Write report");
        let writer = ReportWriter::new(ReportConfig {
            reports_dir: cfg.reports_dir.clone(),
        })?;
        let table = ReportTable::build(&output.log);
        let path = writer.write(&table, cfg.format)?;
        stage.note(path.display().to_string());
        path
    };
    println!("report written to {}", path.display());
    Ok(())
}

/// Layer CLI flags over `AppConfig::load()`. Fails on a bad format before any I/O.
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut cfg = AppConfig::load()?;
    if let Some(confidence) = args.confidence {
        cfg.min_confidence = confidence;
    }
    if let Some(format) = &args.format {
        cfg.format = format.parse::<ReportFormat>()?;
    }
    if let Some(model) = &args.model {
        cfg.detector.model_path = Some(model.clone());
    }
    if let Some(device) = &args.camera {
        cfg.camera.device = device.clone();
    }
    if let Some(dir) = &args.reports_dir {
        cfg.reports_dir = dir.clone();
    }
    if let Some(width) = args.frame_width {
        cfg.frame_width = width;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn build_detector(backend: Backend, cfg: &AppConfig) -> Result<Box<dyn DetectorBackend>> {
    let backend = match backend {
        Backend::Auto if cfg.detector.model_path.is_some() => Backend::Tract,
        Backend::Auto => Backend::Stub,
        other => other,
    };
    match backend {
        Backend::Stub => {
            log::warn!("using the stub detector; detections are synthetic");
            Ok(Box::new(StubBackend::new()))
        }
        Backend::Tract => load_tract(cfg),
        Backend::Auto => Err(anyhow!("detector backend was not resolved")),
    }
}

#[cfg(feature = "backend-tract")]
fn load_tract(cfg: &AppConfig) -> Result<Box<dyn DetectorBackend>> {
    let model_path = cfg
        .detector
        .model_path
        .as_ref()
        .ok_or_else(|| anyhow!("the tract backend needs --model or FACE_REPORT_MODEL"))?;
    log::info!("Loading model from file {}", model_path.display());
    Ok(Box::new(face_report::TractBackend::new(
        model_path,
        cfg.detector.input_size,
        cfg.detector.mean_bgr,
    )?))
}

#[cfg(not(feature = "backend-tract"))]
fn load_tract(_cfg: &AppConfig) -> Result<Box<dyn DetectorBackend>> {
    Err(anyhow!(
        "the tract backend requires building with the backend-tract feature"
    ))
}
