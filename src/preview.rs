//! On-screen preview of the live feed with keyboard polling.

use std::time::{Duration, Instant};

use image::{DynamicImage, RgbImage};
use piston_window::{
    clear, image as render_image, Button, EventLoop, G2dTexture, G2dTextureContext, Key,
    PistonWindow, PressEvent, Texture, TextureSettings, WindowSettings,
};
use tracing::debug;

use crate::traits::{CameraError, Result};

/// Upper bound on redraws while waiting for a key.
const MAX_FPS: u64 = 60;

/// Something the user did in the preview window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// A printable key was pressed.
    Char(char),
    /// The window was closed from the window manager.
    WindowClosed,
}

/// A window that shows frames and reports key presses.
pub trait PreviewWindow {
    /// Replace the displayed image.
    fn show(&mut self, image: &RgbImage) -> Result<()>;

    /// Wait at most `wait` for a key press.
    fn poll_key(&mut self, wait: Duration) -> Result<Option<KeyEvent>>;

    /// Dismiss the window. Safe to call repeatedly, or before anything was shown.
    fn close(&mut self);
}

/// Preview window backed by `piston_window`.
///
/// The native window is created on the first [`PreviewWindow::show`] so it
/// can be sized to the camera's frames. A shown frame is drawn at least once
/// before [`PreviewWindow::poll_key`] gives up waiting.
pub struct PistonPreview {
    title: String,
    pending_draw: bool,
    texture: Option<G2dTexture>,
    texture_context: Option<G2dTextureContext>,
    window: Option<PistonWindow>,
}

impl PistonPreview {
    /// Create a preview with the given window title.
    #[must_use]
    pub fn new<T: Into<String>>(title: T) -> Self {
        Self {
            title: title.into(),
            pending_draw: false,
            texture: None,
            texture_context: None,
            window: None,
        }
    }

    fn ensure_window(&mut self, width: u32, height: u32) -> Result<()> {
        if self.window.is_some() {
            return Ok(());
        }

        let mut window = WindowSettings::new(self.title.as_str(), [width, height])
            .resizable(false)
            .exit_on_esc(false)
            .build::<PistonWindow>()
            .map_err(|err| CameraError::Window(err.to_string()))?;
        window.set_max_fps(MAX_FPS);

        debug!(width, height, title = %self.title, "opened preview window");
        self.texture_context = Some(window.create_texture_context());
        self.window = Some(window);
        Ok(())
    }
}

impl PreviewWindow for PistonPreview {
    fn show(&mut self, image: &RgbImage) -> Result<()> {
        let (width, height) = image.dimensions();
        self.ensure_window(width, height)?;

        let Some(context) = self.texture_context.as_mut() else {
            return Ok(());
        };
        let rgba = DynamicImage::ImageRgb8(image.clone()).to_rgba8();
        let texture = Texture::from_image(context, &rgba, &TextureSettings::new())
            .map_err(|err| CameraError::Window(format!("{err:?}")))?;
        self.texture = Some(texture);
        self.pending_draw = true;
        Ok(())
    }

    fn poll_key(&mut self, wait: Duration) -> Result<Option<KeyEvent>> {
        let Some(window) = self.window.as_mut() else {
            return Ok(None);
        };

        let deadline = Instant::now() + wait;
        while let Some(event) = window.next() {
            if let Some(texture) = self.texture.as_ref() {
                let drawn = window.draw_2d(&event, |context, graphics, _device| {
                    clear([0.0, 0.0, 0.0, 1.0], graphics);
                    render_image(texture, context.transform, graphics);
                });
                if drawn.is_some() {
                    self.pending_draw = false;
                }
            }

            if let Some(Button::Keyboard(key)) = event.press_args() {
                return Ok(key_char(key).map(KeyEvent::Char));
            }
            if wait_is_over(self.pending_draw, Instant::now(), deadline) {
                return Ok(None);
            }
        }

        Ok(Some(KeyEvent::WindowClosed))
    }

    fn close(&mut self) {
        self.pending_draw = false;
        self.texture = None;
        self.texture_context = None;
        if self.window.take().is_some() {
            debug!(title = %self.title, "closed preview window");
        }
    }
}

/// Whether a key wait can stop: the deadline passed and the last frame is on screen.
fn wait_is_over(pending_draw: bool, now: Instant, deadline: Instant) -> bool {
    !pending_draw && now >= deadline
}

/// Printable character for a piston key, if it has one.
fn key_char(key: Key) -> Option<char> {
    u32::try_from(key.code())
        .ok()
        .and_then(char::from_u32)
        .filter(char::is_ascii_graphic)
}
