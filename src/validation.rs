//! Parsing and validation of user-supplied capture parameters.
//!
//! Everything here runs before any device is touched, so malformed input is
//! reported without side effects.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while validating user input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    /// Resolution text is not two positive comma-separated integers.
    #[error("invalid resolution '{0}': expected WIDTH,HEIGHT with positive integers")]
    InvalidResolution(String),
    /// Image count must be at least one.
    #[error("number of images must be greater than zero")]
    InvalidImageCount,
    /// Interactive camera index answer is not an integer.
    #[error("invalid camera index '{0}': expected a non-negative integer")]
    InvalidCameraIndex(String),
}

/// Capture resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Create a resolution, rejecting zero dimensions.
    pub fn new(width: u32, height: u32) -> Result<Self, InputError> {
        if width == 0 || height == 0 {
            return Err(InputError::InvalidResolution(format!("{width},{height}")));
        }
        Ok(Self { width, height })
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 2560,
            height: 1440,
        }
    }
}

impl FromStr for Resolution {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InputError::InvalidResolution(s.to_owned());

        let mut parts = s.split(',');
        let (Some(width), Some(height), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };

        let width = width.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = height.trim().parse::<u32>().map_err(|_| invalid())?;
        Self::new(width, height).map_err(|_| invalid())
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Where frames come from.
///
/// A token that reads as an integer literal selects a device by index;
/// anything else is kept verbatim as a device path or stream locator.
/// Literals outside the `i64` range are kept as tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraSource {
    /// Numeric device index.
    Index(i64),
    /// Device path or URL.
    Token(String),
}

impl Default for CameraSource {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl FromStr for CameraSource {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parse_int_literal(s).map_or_else(|| Self::Token(s.to_owned()), Self::Index))
    }
}

/// Integer literal with optional sign and single `_` separators between digits.
fn parse_int_literal(text: &str) -> Option<i64> {
    let text = text.trim();
    let digits = text
        .strip_prefix('-')
        .or_else(|| text.strip_prefix('+'))
        .unwrap_or(text);

    let well_formed = !digits.is_empty()
        && !digits.starts_with('_')
        && !digits.ends_with('_')
        && !digits.contains("__")
        && digits.bytes().all(|b| b.is_ascii_digit() || b == b'_');
    if !well_formed {
        return None;
    }

    text.replace('_', "").parse().ok()
}

impl fmt::Display for CameraSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Token(token) => f.write_str(token),
        }
    }
}

/// A validated request for a batch of calibration images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    num_images: u32,
    resolution: Resolution,
    source: CameraSource,
}

impl CaptureRequest {
    /// Build a request; `num_images` must be positive.
    pub fn new(
        num_images: u32,
        resolution: Resolution,
        source: CameraSource,
    ) -> Result<Self, InputError> {
        if num_images == 0 {
            return Err(InputError::InvalidImageCount);
        }
        Ok(Self {
            num_images,
            resolution,
            source,
        })
    }

    /// Number of images to take.
    pub const fn num_images(&self) -> u32 {
        self.num_images
    }

    /// Requested image width.
    pub const fn width(&self) -> u32 {
        self.resolution.width
    }

    /// Requested image height.
    pub const fn height(&self) -> u32 {
        self.resolution.height
    }

    /// Requested resolution.
    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Camera to capture from.
    pub const fn source(&self) -> &CameraSource {
        &self.source
    }
}

/// Parse the answer to the camera index prompt.
pub fn parse_camera_index(line: &str) -> Result<u32, InputError> {
    let trimmed = line.trim();
    trimmed
        .parse::<u32>()
        .map_err(|_| InputError::InvalidCameraIndex(trimmed.to_owned()))
}
