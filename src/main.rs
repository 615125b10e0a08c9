//! Proctoring monitor: enrolls the examinee, then watches identity and head pose.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use proctor_monitor::{
    app::{CancellationToken, LogSink, ProctorMonitor, StatusSink},
    config::Config,
    enrollment::capture_reference_images,
    vision::{
        camera::{CameraSource, VideoSource},
        display::WindowSink,
    },
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use
    #[arg(long, default_value = "0")]
    cam: i32,

    /// Video file to monitor instead of the camera
    #[arg(short, long)]
    video: Option<String>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Folder holding the reference images
    #[arg(short, long)]
    reference_dir: Option<PathBuf>,

    /// Capture fresh reference images from the camera before enrolling
    #[arg(long)]
    capture: bool,

    /// Number of reference images to capture
    #[arg(short, long)]
    samples: Option<usize>,

    /// Identity match threshold
    #[arg(short = 't', long)]
    threshold: Option<f64>,

    /// Run without a display window, logging flagged faces only
    #[arg(long)]
    headless: bool,

    /// Write the example configuration to stdout and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).with_context(|| format!("failed to load {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(folder) = &args.reference_dir {
        config.enrollment.reference_folder = folder.clone();
    }
    if let Some(samples) = args.samples {
        config.enrollment.samples = samples;
    }
    if let Some(threshold) = args.threshold {
        config.identity.match_threshold = threshold;
    }
    config.enrollment.capture |= args.capture;
    if args.headless {
        config.display.show_window = false;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug { "debug" } else { "info" };
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(filter));

    if args.print_config {
        print!("{}", proctor_monitor::config::EXAMPLE_CONFIG);
        return Ok(());
    }

    let config = load_config(&args)?;
    let video_source = match &args.video {
        Some(path) => VideoSource::File(path.clone()),
        None => VideoSource::Camera(args.cam),
    };

    let enrollment = &config.enrollment;
    if enrollment.capture {
        let camera = CameraSource::open(&VideoSource::Camera(args.cam))?;
        capture_reference_images(
            camera,
            &enrollment.reference_folder,
            enrollment.samples,
            enrollment.capture_interval(),
        )?;
    }

    let mut monitor = ProctorMonitor::from_config(&config)?;
    let enrolled = monitor
        .load_reference_images(&enrollment.reference_folder)
        .context("could not load reference images")?;
    info!("Reference images loaded: {} encodings", enrolled);

    let cancel = CancellationToken::new();
    let mut sink: Box<dyn StatusSink> = if config.display.show_window {
        Box::new(WindowSink::open(&config.display.window_title, cancel.clone())?)
    } else {
        Box::new(LogSink)
    };

    let source = CameraSource::open(&video_source)?;
    let summary = monitor.run(source, sink.as_mut(), &cancel)?;
    info!(
        "Monitoring finished ({}): {} frames, {} face records",
        summary.exit_cause, summary.frames_processed, summary.records_emitted
    );

    Ok(())
}
