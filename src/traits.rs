//! Core traits and types for the camera abstraction.

use image::{ImageFormat, RgbImage};
use std::time::Duration;
use thiserror::Error;

use crate::validation::InputError;

/// Pixel format representation (e.g., YUYV, MJPG, RGB3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Create a new `FourCC` from a 4-byte array.
    #[must_use]
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    /// YUYV pixel format (4:2:2 packed).
    pub const YUYV: Self = Self::new(b"YUYV");
    /// MJPEG pixel format (Motion JPEG).
    pub const MJPG: Self = Self::new(b"MJPG");
    /// RGB3 pixel format (24-bit RGB).
    pub const RGB3: Self = Self::new(b"RGB3");

    /// Whether [`Frame::to_rgb_image`] can decode this pixel format.
    #[must_use]
    pub fn is_decodable(self) -> bool {
        self == Self::YUYV || self == Self::MJPG || self == Self::RGB3
    }
}

impl std::fmt::Display for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl From<v4l::FourCC> for FourCC {
    fn from(fourcc: v4l::FourCC) -> Self {
        Self(fourcc.repr)
    }
}

impl From<FourCC> for v4l::FourCC {
    fn from(fourcc: FourCC) -> Self {
        Self::new(&fourcc.0)
    }
}

/// Video format specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format.
    pub fourcc: FourCC,
    /// Bytes per line (stride).
    pub stride: u32,
    /// Total frame size in bytes.
    pub size: u32,
}

impl Format {
    /// Create a new format specification.
    ///
    /// Stride and size are derived from the pixel format. For compressed
    /// formats the driver reports the real numbers once the format is applied.
    /// Sizes past `u32::MAX` saturate; drivers clamp such requests anyway.
    #[must_use]
    pub const fn new(width: u32, height: u32, fourcc: FourCC) -> Self {
        let bytes_per_pixel = if fourcc.0[0] == b'R' { 3 } else { 2 };
        let stride = width.saturating_mul(bytes_per_pixel);
        let size = stride.saturating_mul(height);
        Self {
            width,
            height,
            fourcc,
            stride,
            size,
        }
    }
}

/// Device capability flags.
#[derive(Debug, Clone, Default)]
pub struct DeviceCapabilities {
    /// Driver name.
    pub driver: String,
    /// Card/device name.
    pub card: String,
    /// Bus information.
    pub bus_info: String,
    /// Whether the device can capture video.
    pub can_capture: bool,
    /// Whether the device supports streaming.
    pub can_stream: bool,
}

/// Metadata for a captured frame.
#[derive(Debug, Clone)]
pub struct FrameMetadata {
    /// Frame sequence number.
    pub sequence: u32,
    /// Capture timestamp.
    pub timestamp: Duration,
    /// Actual bytes used in the frame buffer.
    pub bytes_used: u32,
}

/// A captured video frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw frame data.
    pub data: Vec<u8>,
    /// Frame metadata.
    pub metadata: FrameMetadata,
}

impl Frame {
    /// RGB value of the YUYV pixel at (`x`, `y`) in a frame `width` pixels wide.
    ///
    /// Returns `None` if the pixel lies outside the buffer.
    #[must_use]
    pub fn pixel_at(&self, x: u32, y: u32, width: u32) -> Option<(u8, u8, u8)> {
        if x >= width {
            return None;
        }

        // [Y0 U Y1 V]: each pair of pixels shares U and V
        let pair_x = x & !1;
        let offset = y.checked_mul(width)?.checked_add(pair_x)?.checked_mul(2)?;
        let offset = usize::try_from(offset).ok()?;
        let &[y0, u, y1, v] = self.data.get(offset..offset.checked_add(4)?)? else {
            return None;
        };

        let luma = if x % 2 == 0 { y0 } else { y1 };
        Some(yuv_to_rgb(luma, u, v))
    }

    /// Decode the raw buffer into an RGB image.
    ///
    /// Rows are read `format.stride` bytes apart so padded buffers decode
    /// correctly. MJPG frames are decoded from the first `bytes_used` bytes.
    pub fn to_rgb_image(&self, format: &Format) -> Result<RgbImage> {
        match format.fourcc {
            FourCC::YUYV => self.decode_packed(format, 2, |quad, out| {
                if let [y0, u, y1, v] = *quad {
                    let (r, g, b) = yuv_to_rgb(y0, u, v);
                    out.extend_from_slice(&[r, g, b]);
                    let (r, g, b) = yuv_to_rgb(y1, u, v);
                    out.extend_from_slice(&[r, g, b]);
                }
            }),
            FourCC::RGB3 => self.decode_packed(format, 3, |chunk, out| {
                out.extend_from_slice(chunk);
            }),
            FourCC::MJPG => {
                let used = usize::try_from(self.metadata.bytes_used).unwrap_or(usize::MAX);
                let jpeg = self.data.get(..used).unwrap_or(&self.data);
                Ok(image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg)?.to_rgb8())
            }
            _ => Err(CameraError::FormatNotSupported(format.clone())),
        }
    }

    fn decode_packed<F>(
        &self,
        format: &Format,
        bytes_per_pixel: usize,
        mut emit: F,
    ) -> Result<RgbImage>
    where
        F: FnMut(&[u8], &mut Vec<u8>),
    {
        let width = format.width as usize;
        let height = format.height as usize;
        let row_bytes = width.saturating_mul(bytes_per_pixel);
        let stride = (format.stride as usize).max(row_bytes);
        // YUYV carries two pixels per 4-byte group
        let group = if bytes_per_pixel == 2 { 4 } else { 3 };

        let needed = stride
            .checked_mul(height.saturating_sub(1))
            .and_then(|bytes| bytes.checked_add(row_bytes));
        if !matches!(needed, Some(bytes) if self.data.len() >= bytes) {
            return Err(self.too_short(format));
        }

        let mut rgb = Vec::with_capacity(width * height * 3);
        for (row_idx, row) in self.data.chunks(stride).take(height).enumerate() {
            let pixels = row.get(..row_bytes).ok_or_else(|| {
                CameraError::StreamError(format!(
                    "row {row_idx} holds {} bytes, expected {row_bytes}",
                    row.len()
                ))
            })?;
            for chunk in pixels.chunks_exact(group) {
                emit(chunk, &mut rgb);
            }
        }

        RgbImage::from_raw(format.width, format.height, rgb).ok_or_else(|| self.too_short(format))
    }

    fn too_short(&self, format: &Format) -> CameraError {
        CameraError::StreamError(format!(
            "frame buffer of {} bytes is too short for {}x{} {}",
            self.data.len(),
            format.width,
            format.height,
            format.fourcc
        ))
    }
}

/// Convert YUV values to RGB.
///
/// Uses the ITU-R BT.601 conversion formula.
#[must_use]
#[allow(clippy::many_single_char_names)]
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y_f = f32::from(y);
    let u_f = f32::from(u) - 128.0;
    let v_f = f32::from(v) - 128.0;

    let r = 1.402f32.mul_add(v_f, y_f);
    let g = 0.714_14f32.mul_add(-v_f, 0.344_14f32.mul_add(-u_f, y_f));
    let b = 1.772f32.mul_add(u_f, y_f);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamp = |val: f32| -> u8 { val.clamp(0.0, 255.0) as u8 };

    (clamp(r), clamp(g), clamp(b))
}

/// Error type for camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// Device with given index was not found.
    #[error("Device {0} not found")]
    DeviceNotFound(i64),
    /// Failed to open device.
    #[error("Failed to open device: {0}")]
    DeviceOpenFailed(String),
    /// The camera source cannot be opened by this backend.
    #[error("Unsupported camera source: {0}")]
    UnsupportedSource(String),
    /// Requested format is not supported.
    #[error("Format not supported: {}x{} {}", .0.width, .0.height, .0.fourcc)]
    FormatNotSupported(Format),
    /// Error during streaming operation.
    #[error("Stream error: {0}")]
    StreamError(String),
    /// Frame could not be decoded or encoded.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    /// Preview window failure.
    #[error("Window error: {0}")]
    Window(String),
    /// Malformed user input.
    #[error(transparent)]
    Input(#[from] InputError),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for camera operations.
pub type Result<T> = std::result::Result<T, CameraError>;

/// Abstraction over camera device operations.
pub trait CameraDevice {
    /// The stream type returned by `create_stream`.
    type Stream<'a>: CaptureStream
    where
        Self: 'a;

    /// Get device capabilities.
    fn capabilities(&self) -> &DeviceCapabilities;

    /// Get current format.
    fn format(&self) -> Result<Format>;

    /// Set capture format. Returns the actual format set by the driver.
    fn set_format(&mut self, format: &Format) -> Result<Format>;

    /// Create a capture stream with the specified number of buffers.
    fn create_stream(&mut self, buffer_count: u32) -> Result<Self::Stream<'_>>;
}

/// Abstraction over capture stream operations.
pub trait CaptureStream {
    /// Capture the next frame from the stream.
    fn next_frame(&mut self) -> Result<Frame>;
}
