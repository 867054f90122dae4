//! Timed capture of calibration image sets from a V4L2 camera.
//!
//! Shots are spaced out so the calibration target can be moved between them.
//! Nothing here estimates camera parameters; the images are written to disk
//! for a separate calibration step.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::device::{negotiate_format, V4L2Device};
use crate::orchestrator::CalibrationCapture;
use crate::traits::{CameraDevice, CaptureStream, Frame, Result};
use crate::validation::CaptureRequest;

/// Buffers queued while capturing calibration shots.
const BUFFER_COUNT: u32 = 4;

/// How a calibration image set is taken and stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationPlan {
    /// Directory the images are written to. Created if missing.
    pub output_dir: PathBuf,
    /// Pause before each shot.
    pub interval: Duration,
    /// Frames thrown away after the stream starts, while exposure settles.
    pub warmup_frames: u32,
    /// File name prefix; images are named `<prefix>_<NN>.jpg`.
    pub file_prefix: String,
}

impl Default for CalibrationPlan {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("calibration_images"),
            interval: Duration::from_secs(2),
            warmup_frames: 5,
            file_prefix: "calib".to_owned(),
        }
    }
}

impl CalibrationPlan {
    /// Path of the 1-based `shot`.
    pub fn image_path(&self, shot: u32) -> PathBuf {
        self.output_dir.join(format!("{}_{shot:02}.jpg", self.file_prefix))
    }
}

/// Take the images described by `request` from an already open `device`.
pub fn capture_calibration_images<D: CameraDevice>(
    device: &mut D,
    request: &CaptureRequest,
    plan: &CalibrationPlan,
) -> Result<Vec<PathBuf>> {
    let format = negotiate_format(device, request.width(), request.height())?;
    fs::create_dir_all(&plan.output_dir)?;

    let mut stream = device.create_stream(BUFFER_COUNT)?;
    for _ in 0..plan.warmup_frames {
        stream.next_frame()?;
    }
    debug!(frames = plan.warmup_frames, "warm-up finished");

    let total = request.num_images();
    let mut written = Vec::new();
    for shot in 1..=total {
        countdown(plan.interval, shot, total);

        let frame = latest_frame(&mut stream, BUFFER_COUNT)?;
        debug!(shot, sequence = frame.metadata.sequence, "frame taken");
        let image = frame.to_rgb_image(&format)?;
        let path = plan.image_path(shot);
        image.save(&path)?;

        info!(shot, total, path = %path.display(), "saved calibration image");
        written.push(path);
    }

    Ok(written)
}

/// Read `count` frames and keep the last one.
///
/// The driver keeps filling every queued buffer while nobody reads, so after
/// a pause the first `count - 1` dequeued frames predate it.
fn latest_frame<S: CaptureStream>(stream: &mut S, count: u32) -> Result<Frame> {
    let mut frame = stream.next_frame()?;
    for _ in 1..count {
        frame = stream.next_frame()?;
    }
    Ok(frame)
}

/// Sleep for `interval`, logging once per remaining second.
fn countdown(interval: Duration, shot: u32, total: u32) {
    let mut remaining = interval;
    while !remaining.is_zero() {
        let step = remaining.min(Duration::from_secs(1));
        info!(shot, total, seconds_left = remaining.as_secs_f32().ceil(), "next shot in");
        thread::sleep(step);
        remaining -= step;
    }
}

/// [`CalibrationCapture`] that opens the requested source as a V4L2 device.
#[derive(Debug, Clone, Default)]
pub struct V4l2Calibration {
    plan: CalibrationPlan,
}

impl V4l2Calibration {
    /// Use `plan` for every capture.
    pub const fn new(plan: CalibrationPlan) -> Self {
        Self { plan }
    }

    /// Directory images are written to.
    pub fn output_dir(&self) -> &Path {
        &self.plan.output_dir
    }
}

impl CalibrationCapture for V4l2Calibration {
    fn capture(&mut self, request: &CaptureRequest) -> Result<Vec<PathBuf>> {
        let mut device = V4L2Device::open_source(request.source())?;
        info!(card = %device.capabilities().card, "capturing from camera");
        capture_calibration_images(&mut device, request, &self.plan)
    }
}
