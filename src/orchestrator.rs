//! Front end that validates calibration parameters and hands them to a
//! capture capability.

use std::path::PathBuf;

use tracing::info;

use crate::cli::CalibrateArgs;
use crate::traits::Result;
use crate::validation::CaptureRequest;

/// Something that can take a batch of calibration images.
pub trait CalibrationCapture {
    /// Take `request.num_images()` images and return where they were written.
    fn capture(&mut self, request: &CaptureRequest) -> Result<Vec<PathBuf>>;
}

/// Validate `args` and invoke `delegate` exactly once.
///
/// Errors from the delegate are returned unchanged.
pub fn run_orchestrator<C: CalibrationCapture>(
    args: &CalibrateArgs,
    delegate: &mut C,
) -> Result<Vec<PathBuf>> {
    let request = CaptureRequest::new(args.num_images, args.resolution, args.camera.clone())?;
    info!(
        num_images = request.num_images(),
        resolution = %request.resolution(),
        source = %request.source(),
        "capturing calibration images"
    );

    let written = delegate.capture(&request)?;
    info!(count = written.len(), "calibration capture finished");
    Ok(written)
}
