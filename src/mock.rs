//! Mock device and preview window for testing without hardware.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use image::RgbImage;

use crate::preview::{KeyEvent, PreviewWindow};
use crate::traits::{
    CameraDevice, CameraError, CaptureStream, DeviceCapabilities, Format, FourCC, Frame,
    FrameMetadata, Result,
};

/// Shared view of what happened to a [`MockDevice`] after it was moved away.
#[derive(Debug, Clone, Default)]
pub struct MockTracker {
    reads: Rc<Cell<u32>>,
    released: Rc<Cell<bool>>,
}

impl MockTracker {
    /// Number of successful frame reads.
    pub fn reads(&self) -> u32 {
        self.reads.get()
    }

    /// Whether the device has been dropped.
    pub fn released(&self) -> bool {
        self.released.get()
    }
}

/// Mock device for testing without hardware.
pub struct MockDevice {
    capabilities: DeviceCapabilities,
    format: Format,
    driver_format: Option<Format>,
    frame_limit: Option<u32>,
    frame_count: u32,
    tracker: MockTracker,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevice {
    /// Create a new mock device with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            capabilities: DeviceCapabilities {
                driver: "mock".to_owned(),
                card: "Mock Camera".to_owned(),
                bus_info: "mock:0".to_owned(),
                can_capture: true,
                can_stream: true,
            },
            format: Format::new(640, 480, FourCC::YUYV),
            driver_format: None,
            frame_limit: None,
            frame_count: 0,
            tracker: MockTracker::default(),
        }
    }

    /// Set the format for this mock device.
    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Make `set_format` apply `format` whatever was requested.
    #[must_use]
    pub fn with_driver_format(mut self, format: Format) -> Self {
        self.driver_format = Some(format);
        self
    }

    /// End the stream after `limit` frames.
    #[must_use]
    pub const fn with_frame_limit(mut self, limit: u32) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// Handle for observing reads and release after the device is moved.
    pub fn tracker(&self) -> MockTracker {
        self.tracker.clone()
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.tracker.released.set(true);
    }
}

impl CameraDevice for MockDevice {
    type Stream<'a> = MockStream<'a>;

    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn format(&self) -> Result<Format> {
        Ok(self.format.clone())
    }

    fn set_format(&mut self, format: &Format) -> Result<Format> {
        self.format = self.driver_format.clone().unwrap_or_else(|| format.clone());
        Ok(self.format.clone())
    }

    fn create_stream(&mut self, _buffer_count: u32) -> Result<Self::Stream<'_>> {
        Ok(MockStream {
            device: self,
            pattern: TestPattern::ColorBars,
        })
    }
}

/// Test pattern types for mock frame generation.
#[derive(Debug, Clone, Copy)]
pub enum TestPattern {
    /// SMPTE color bars pattern.
    ColorBars,
    /// Horizontal gradient from dark to light.
    Gradient,
    /// Solid color with specified Y, U, V values.
    Solid(u8, u8, u8),
}

/// Mock capture stream for testing.
pub struct MockStream<'a> {
    device: &'a mut MockDevice,
    pattern: TestPattern,
}

impl MockStream<'_> {
    /// Set the test pattern for frame generation.
    #[must_use]
    pub fn with_pattern(mut self, pattern: TestPattern) -> Self {
        self.pattern = pattern;
        self
    }
}

impl CaptureStream for MockStream<'_> {
    fn next_frame(&mut self) -> Result<Frame> {
        if self.device.frame_limit.is_some_and(|limit| self.device.frame_count >= limit) {
            return Err(CameraError::StreamError("end of stream".to_owned()));
        }

        let format = &self.device.format;
        let data = generate_test_frame(format, self.pattern);

        let seq = self.device.frame_count;
        self.device.frame_count += 1;
        self.device.tracker.reads.set(self.device.frame_count);

        Ok(Frame {
            data,
            metadata: FrameMetadata {
                sequence: seq,
                timestamp: Duration::from_millis(u64::from(seq) * 33), // ~30fps
                bytes_used: format.size,
            },
        })
    }
}

/// Generate test frame data based on pattern.
fn generate_test_frame(format: &Format, pattern: TestPattern) -> Vec<u8> {
    // YUYV = 2 bytes/pixel
    let size = (format.width as usize) * (format.height as usize) * 2;
    let mut data = vec![0u8; size];

    match pattern {
        TestPattern::ColorBars => generate_color_bars(&mut data, format.width),
        TestPattern::Gradient => generate_gradient(&mut data, format.width),
        TestPattern::Solid(y, u, v) => fill_pairs(&mut data, |_| (y, u, v)),
    }

    data
}

/// Write one `(Y, U, V)` value per YUYV pixel pair; the closure receives the pair's x.
fn fill_pairs<F>(data: &mut [u8], mut yuv_at: F)
where
    F: FnMut(usize) -> (u8, u8, u8),
{
    for (pair, quad) in data.chunks_exact_mut(4).enumerate() {
        let (y, u, v) = yuv_at(pair * 2);
        quad.copy_from_slice(&[y, u, y, v]);
    }
}

/// Generate YUYV color bars pattern.
fn generate_color_bars(data: &mut [u8], width: u32) {
    // White, Yellow, Cyan, Green, Magenta, Red, Blue, Black
    let bars: [(u8, u8, u8); 8] = [
        (235, 128, 128),
        (210, 16, 146),
        (170, 166, 16),
        (145, 54, 34),
        (106, 202, 222),
        (81, 90, 240),
        (41, 240, 110),
        (16, 128, 128),
    ];
    let width = width as usize;
    let bar_width = (width / 8).max(1);

    fill_pairs(data, |x| {
        let bar_idx = ((x % width) / bar_width).min(7);
        bars.get(bar_idx).copied().unwrap_or((16, 128, 128))
    });
}

/// Generate YUYV horizontal gradient pattern.
fn generate_gradient(data: &mut [u8], width: u32) {
    let width = width as usize;
    fill_pairs(data, |x| {
        #[allow(clippy::cast_possible_truncation)]
        let luma = (((x % width) * 255) / width) as u8;
        (luma, 128, 128)
    });
}

/// Preview window that replays a script of key events.
///
/// Once the script runs out it answers with `q` so loops always end.
#[derive(Debug, Default)]
pub struct ScriptedWindow {
    keys: VecDeque<Option<KeyEvent>>,
    shown: Vec<(u32, u32)>,
    close_calls: u32,
}

impl ScriptedWindow {
    /// Create a window that reports `keys` in order, one per poll.
    pub fn new<I: IntoIterator<Item = Option<KeyEvent>>>(keys: I) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Dimensions of every image shown so far.
    pub fn shown(&self) -> &[(u32, u32)] {
        &self.shown
    }

    /// How many times the window was closed.
    pub const fn close_calls(&self) -> u32 {
        self.close_calls
    }
}

impl PreviewWindow for ScriptedWindow {
    fn show(&mut self, image: &RgbImage) -> Result<()> {
        self.shown.push(image.dimensions());
        Ok(())
    }

    fn poll_key(&mut self, _wait: Duration) -> Result<Option<KeyEvent>> {
        Ok(self.keys.pop_front().unwrap_or(Some(KeyEvent::Char('q'))))
    }

    fn close(&mut self) {
        self.close_calls += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_device_creation() {
        let device = MockDevice::new();
        assert_eq!(device.capabilities().driver, "mock");
        assert!(device.capabilities().can_capture);
        assert!(device.capabilities().can_stream);
    }

    #[test]
    fn test_mock_device_format() {
        let mut device = MockDevice::new();
        let format = device.format().expect("format should succeed");
        assert_eq!(format.width, 640);
        assert_eq!(format.height, 480);

        let new_format = Format::new(1280, 720, FourCC::YUYV);
        let actual = device.set_format(&new_format).expect("set_format should succeed");
        assert_eq!(actual.width, 1280);
        assert_eq!(actual.height, 720);
    }

    #[test]
    fn test_mock_stream_capture() {
        let mut device = MockDevice::new();
        let mut stream = device.create_stream(4).expect("create_stream should succeed");

        let frame1 = stream.next_frame().expect("next_frame should succeed");
        assert_eq!(frame1.metadata.sequence, 0);
        assert!(!frame1.data.is_empty());

        let frame2 = stream.next_frame().expect("next_frame should succeed");
        assert_eq!(frame2.metadata.sequence, 1);
    }

    #[test]
    fn test_mock_stream_ends_at_limit() {
        let mut device = MockDevice::new().with_frame_limit(2);
        let tracker = device.tracker();
        {
            let mut stream = device.create_stream(4).expect("create_stream should succeed");
            assert!(stream.next_frame().is_ok());
            assert!(stream.next_frame().is_ok());
            assert!(stream.next_frame().is_err());
        }
        assert_eq!(tracker.reads(), 2);
        assert!(!tracker.released());
        drop(device);
        assert!(tracker.released());
    }

    #[test]
    fn test_color_bars_pattern() {
        let format = Format::new(640, 480, FourCC::YUYV);
        let data = generate_test_frame(&format, TestPattern::ColorBars);

        assert_eq!(data.len(), (640 * 480 * 2) as usize);
        // First bar is white
        assert_eq!(data[0], 235);
        // Last bar is black
        assert_eq!(data[639 * 2], 16);
    }

    #[test]
    fn test_gradient_pattern() {
        let format = Format::new(640, 480, FourCC::YUYV);
        let data = generate_test_frame(&format, TestPattern::Gradient);

        assert!(data[0] < 10);

        let last_row_start = (479 * 640 * 2) as usize;
        let last_pixel_y = data[last_row_start + 638 * 2];
        assert!(last_pixel_y > 200);
    }

    #[test]
    fn test_solid_pattern() {
        let format = Format::new(64, 64, FourCC::YUYV);
        let data = generate_test_frame(&format, TestPattern::Solid(128, 64, 192));

        assert_eq!(&data[..4], &[128, 64, 128, 192]);
    }

    #[test]
    fn test_scripted_window_defaults_to_quit() {
        let mut window = ScriptedWindow::new([None]);
        assert_eq!(window.poll_key(Duration::ZERO).expect("poll"), None);
        assert_eq!(
            window.poll_key(Duration::ZERO).expect("poll"),
            Some(KeyEvent::Char('q'))
        );
    }
}
