//! Calib-Capture: camera image capture for calibration workflows
//!
//! Two front ends share this library:
//!
//! - `capture-calibration` validates a capture request and hands it to a
//!   [`CalibrationCapture`] implementation, by default [`V4l2Calibration`].
//! - `take-picture` previews a webcam and saves the current frame on demand,
//!   driven by [`InteractiveCapture`].
//!
//! Camera access goes through the [`CameraDevice`] and [`CaptureStream`]
//! traits so both flows can be exercised against mock devices.

pub mod calibration;
pub mod cli;
pub mod device;
pub mod interactive;
pub mod orchestrator;
pub mod preview;
pub mod traits;
pub mod validation;

#[cfg(test)]
pub mod mock;

pub use calibration::{CalibrationPlan, V4l2Calibration};
pub use device::V4L2Device;
pub use interactive::{CloseReason, InteractiveCapture, LoopState};
pub use orchestrator::{run_orchestrator, CalibrationCapture};
pub use preview::{KeyEvent, PistonPreview, PreviewWindow};
pub use traits::{
    CameraDevice, CameraError, CaptureStream, DeviceCapabilities, Format, FourCC, Frame,
    FrameMetadata,
};
pub use validation::{CameraSource, CaptureRequest, InputError, Resolution};
