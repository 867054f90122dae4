//! Command-line arguments and logging setup shared by the binaries.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::calibration::CalibrationPlan;
use crate::validation::{CameraSource, Resolution};

/// Capture a set of calibration images from a camera.
#[derive(Parser, Debug)]
#[command(name = "capture-calibration", version, about, long_about = None)]
pub struct CalibrateArgs {
    /// Number of images to capture for camera calibration
    pub num_images: u32,

    /// Resolution of the images as width,height
    #[arg(long, default_value = "2560,1440")]
    pub resolution: Resolution,

    /// Camera source: integer index, or device path
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub camera: CameraSource,

    /// Directory the images are written to
    #[arg(long, default_value = "calibration_images")]
    pub output_dir: PathBuf,

    /// Pause before each shot, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub interval_ms: u64,

    /// Frames discarded while the camera settles
    #[arg(long, default_value_t = 5)]
    pub warmup_frames: u32,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl CalibrateArgs {
    /// Capture plan described by these arguments.
    pub fn plan(&self) -> CalibrationPlan {
        CalibrationPlan {
            output_dir: self.output_dir.clone(),
            interval: Duration::from_millis(self.interval_ms),
            warmup_frames: self.warmup_frames,
            ..CalibrationPlan::default()
        }
    }
}

/// Preview a webcam and save frames with a key press.
#[derive(Parser, Debug)]
#[command(name = "take-picture", version, about, long_about = None)]
pub struct TakePictureArgs {
    /// Camera index; asked for interactively when omitted
    #[arg(long)]
    pub camera: Option<u32>,

    /// Directory saved photos are written to
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Install the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
