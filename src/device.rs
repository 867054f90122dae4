//! V4L2 device implementation using the v4l crate.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream as V4lCaptureStream;
use v4l::video::Capture;
use v4l::Device;

use crate::traits::{
    CameraDevice, CameraError, CaptureStream, DeviceCapabilities, Format, FourCC, Frame,
    FrameMetadata, Result,
};
use crate::validation::CameraSource;

/// V4L2 device implementation wrapping the v4l crate.
///
/// The device node is released when the value is dropped.
pub struct V4L2Device {
    device: Device,
    capabilities: DeviceCapabilities,
}

impl V4L2Device {
    /// Open a V4L2 device by index (e.g., 0 for /dev/video0).
    pub fn open(index: u32) -> Result<Self> {
        let device = Device::new(index as usize).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                CameraError::DeviceNotFound(i64::from(index))
            } else {
                CameraError::DeviceOpenFailed(err.to_string())
            }
        })?;
        Self::from_device(device)
    }

    /// Open a V4L2 device node by path (e.g., `/dev/video2`).
    pub fn with_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let device = Device::with_path(path).map_err(|err| {
            CameraError::DeviceOpenFailed(format!("{}: {err}", path.display()))
        })?;
        Self::from_device(device)
    }

    /// Open whatever a user-supplied camera source points at.
    ///
    /// Integer sources are device indices, tokens must name a device node.
    /// Network locators have no V4L2 counterpart and are rejected.
    pub fn open_source(source: &CameraSource) -> Result<Self> {
        match source {
            CameraSource::Index(index) => {
                let index =
                    u32::try_from(*index).map_err(|_| CameraError::DeviceNotFound(*index))?;
                Self::open(index)
            }
            CameraSource::Token(token) if is_device_path(token) => Self::with_path(token),
            CameraSource::Token(token) => Err(CameraError::UnsupportedSource(token.clone())),
        }
    }

    fn from_device(device: Device) -> Result<Self> {
        let caps = device
            .query_caps()
            .map_err(|err| CameraError::DeviceOpenFailed(err.to_string()))?;

        let capabilities = DeviceCapabilities {
            driver: caps.driver,
            card: caps.card,
            bus_info: caps.bus,
            can_capture: caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE),
            can_stream: caps.capabilities.contains(v4l::capability::Flags::STREAMING),
        };

        if !capabilities.can_capture {
            return Err(CameraError::DeviceOpenFailed(format!(
                "{} does not support video capture",
                capabilities.card
            )));
        }

        debug!(card = %capabilities.card, driver = %capabilities.driver, "opened device");

        Ok(Self {
            device,
            capabilities,
        })
    }
}

impl Drop for V4L2Device {
    fn drop(&mut self) {
        debug!(card = %self.capabilities.card, "released device");
    }
}

fn is_device_path(token: &str) -> bool {
    token.starts_with("/dev/") || Path::new(token).exists()
}

fn to_format(fmt: &v4l::Format) -> Format {
    Format {
        width: fmt.width,
        height: fmt.height,
        fourcc: FourCC::from(fmt.fourcc),
        stride: fmt.stride,
        size: fmt.size,
    }
}

impl CameraDevice for V4L2Device {
    type Stream<'a> = V4L2Stream<'a>;

    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn format(&self) -> Result<Format> {
        let fmt = self
            .device
            .format()
            .map_err(|err| CameraError::StreamError(err.to_string()))?;

        Ok(to_format(&fmt))
    }

    fn set_format(&mut self, format: &Format) -> Result<Format> {
        let mut fmt = self
            .device
            .format()
            .map_err(|err| CameraError::StreamError(err.to_string()))?;

        fmt.width = format.width;
        fmt.height = format.height;
        fmt.fourcc = format.fourcc.into();

        let fmt = self
            .device
            .set_format(&fmt)
            .map_err(|err| CameraError::StreamError(err.to_string()))?;

        Ok(to_format(&fmt))
    }

    fn create_stream(&mut self, buffer_count: u32) -> Result<Self::Stream<'_>> {
        let stream = Stream::with_buffers(&self.device, Type::VideoCapture, buffer_count)
            .map_err(|err| CameraError::StreamError(err.to_string()))?;

        Ok(V4L2Stream { stream })
    }
}

/// V4L2 capture stream wrapping mmap-based streaming.
pub struct V4L2Stream<'a> {
    stream: Stream<'a>,
}

impl CaptureStream for V4L2Stream<'_> {
    fn next_frame(&mut self) -> Result<Frame> {
        let (buf, meta) = self
            .stream
            .next()
            .map_err(|err| CameraError::StreamError(err.to_string()))?;

        // V4L2 timestamps are non-negative in practice
        #[allow(clippy::cast_sign_loss)]
        let secs = meta.timestamp.sec.max(0) as u64;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let nanos = (meta.timestamp.usec.max(0) as u32).saturating_mul(1000);

        Ok(Frame {
            data: buf.to_vec(),
            metadata: FrameMetadata {
                sequence: meta.sequence,
                timestamp: Duration::new(secs, nanos),
                bytes_used: meta.bytesused,
            },
        })
    }
}

/// Ask the device for YUYV at `width`x`height` and return what it applied.
///
/// Drivers may round the size or substitute another pixel format. A different
/// size is accepted with a warning; a pixel format that cannot be decoded is
/// an error.
pub fn negotiate_format<D: CameraDevice>(
    device: &mut D,
    width: u32,
    height: u32,
) -> Result<Format> {
    let requested = Format::new(width, height, FourCC::YUYV);
    let actual = device.set_format(&requested)?;

    if !actual.fourcc.is_decodable() {
        return Err(CameraError::FormatNotSupported(actual));
    }
    if actual.width != width || actual.height != height {
        warn!(
            requested_width = width,
            requested_height = height,
            width = actual.width,
            height = actual.height,
            "driver adjusted the capture resolution"
        );
    }

    debug!(width = actual.width, height = actual.height, fourcc = %actual.fourcc, "format negotiated");
    Ok(actual)
}
