//! Live preview loop that saves frames on request.
//!
//! The loop is a small state machine:
//!
//! ```text
//! Opening --open ok--> Streaming --'q' / read failure--> Closed
//!    |                                                     ^
//!    +----------------------open failed--------------------+
//! ```
//!
//! Whatever the path, the device is released and the window dismissed on
//! the way to `Closed`. Asking the user which camera to use happens before
//! the loop starts, see [`prompt_camera_index`].

use std::io::{self, BufRead, Stdout, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::device::negotiate_format;
use crate::preview::{KeyEvent, PreviewWindow};
use crate::traits::{CameraDevice, CameraError, CaptureStream, Result};
use crate::validation::parse_camera_index;

/// How long each iteration waits for a key press.
pub const KEY_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Buffers queued while previewing.
const BUFFER_COUNT: u32 = 4;

const CAMERA_PROMPT: &str = "Choose 0 for internal webcam or 1 for USB webcam and press Enter: ";
const OPEN_FAILED_MESSAGE: &str = "Error: Could not open webcam.";
const INSTRUCTIONS: &str = "Press 'S' to save and 'Q' to quit";
const SAVED_MESSAGE: &str = "Photo saved!";

/// What a key press asks the loop to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Write the current frame to disk.
    Save,
    /// Stop streaming.
    Quit,
    /// Keep going.
    Continue,
}

impl Action {
    /// Map a key event to an action; letters are case-insensitive.
    pub const fn from_key(key: KeyEvent) -> Self {
        match key {
            KeyEvent::Char('s' | 'S') => Self::Save,
            KeyEvent::Char('q' | 'Q') | KeyEvent::WindowClosed => Self::Quit,
            KeyEvent::Char(_) => Self::Continue,
        }
    }
}

/// Loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the device to open.
    Opening,
    /// Reading and displaying frames.
    Streaming,
    /// Device released, window dismissed.
    Closed,
}

/// Why the loop reached [`LoopState::Closed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The user pressed quit or closed the window.
    Quit,
    /// A frame could not be read or decoded: unplugged camera or end of stream.
    StreamEnded,
    /// The device could not be opened.
    OpenFailed,
}

/// File a saved frame from camera `index` is written to.
///
/// The name is fixed per camera, so saving again overwrites the last shot.
pub fn snapshot_path(dir: &Path, index: u32) -> PathBuf {
    dir.join(format!("captured_photo_{index}.jpg"))
}

/// Ask on `output` which camera to use and read the answer from `input`.
pub fn prompt_camera_index<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<u32> {
    output.write_all(CAMERA_PROMPT.as_bytes())?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(parse_camera_index(&line)?)
}

/// Preview loop for one camera.
///
/// User-facing messages go to `O`, stdout unless [`with_console`](Self::with_console)
/// says otherwise.
pub struct InteractiveCapture<W: PreviewWindow, O: Write = Stdout> {
    camera_index: u32,
    output_dir: PathBuf,
    window: W,
    console: O,
    state: LoopState,
    saves: u32,
}

impl<W: PreviewWindow> InteractiveCapture<W> {
    /// Preview camera `camera_index` in `window`, saving into the working directory.
    pub fn new(camera_index: u32, window: W) -> Self {
        Self {
            camera_index,
            output_dir: PathBuf::from("."),
            window,
            console: io::stdout(),
            state: LoopState::Opening,
            saves: 0,
        }
    }
}

impl<W: PreviewWindow, O: Write> InteractiveCapture<W, O> {
    /// Print messages to `console` instead.
    pub fn with_console<C: Write>(self, console: C) -> InteractiveCapture<W, C> {
        InteractiveCapture {
            camera_index: self.camera_index,
            output_dir: self.output_dir,
            window: self.window,
            console,
            state: self.state,
            saves: self.saves,
        }
    }

    /// Save frames into `dir` instead.
    #[must_use]
    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Current state.
    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// Number of frames saved so far.
    pub const fn saves(&self) -> u32 {
        self.saves
    }

    /// Where a save writes to.
    pub fn snapshot_path(&self) -> PathBuf {
        snapshot_path(&self.output_dir, self.camera_index)
    }

    /// The preview window.
    pub const fn window(&self) -> &W {
        &self.window
    }

    /// Where messages are printed.
    pub const fn console(&self) -> &O {
        &self.console
    }

    /// Open the camera with `open` and run until quit or end of stream.
    ///
    /// `open` is called once with the camera index. The device is dropped and
    /// the window closed before this returns, on success and on error alike.
    pub fn run<D, F>(&mut self, open: F) -> Result<CloseReason>
    where
        D: CameraDevice,
        F: FnOnce(u32) -> Result<D>,
    {
        self.state = LoopState::Opening;

        let outcome = match open(self.camera_index) {
            Ok(mut device) => {
                self.state = LoopState::Streaming;
                info!(index = self.camera_index, card = %device.capabilities().card, "streaming");
                let outcome = self.stream(&mut device);
                drop(device);
                outcome
            }
            Err(err) => {
                warn!(index = self.camera_index, error = %err, "could not open camera");
                writeln!(self.console, "{OPEN_FAILED_MESSAGE}")
                    .map(|()| CloseReason::OpenFailed)
                    .map_err(CameraError::from)
            }
        };

        self.window.close();
        self.state = LoopState::Closed;
        debug!(?outcome, saves = self.saves, "capture loop closed");
        outcome
    }

    fn stream<D: CameraDevice>(&mut self, device: &mut D) -> Result<CloseReason> {
        let current = device.format()?;
        let format = negotiate_format(device, current.width, current.height)?;
        let path = self.snapshot_path();

        writeln!(self.console, "{INSTRUCTIONS}")?;

        let mut stream = device.create_stream(BUFFER_COUNT)?;
        loop {
            let frame = match stream.next_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    info!(error = %err, "frame read failed, stopping");
                    return Ok(CloseReason::StreamEnded);
                }
            };

            let image = match frame.to_rgb_image(&format) {
                Ok(image) => image,
                Err(err) => {
                    info!(
                        error = %err,
                        sequence = frame.metadata.sequence,
                        "frame decode failed, stopping"
                    );
                    return Ok(CloseReason::StreamEnded);
                }
            };
            self.window.show(&image)?;

            let action = self
                .window
                .poll_key(KEY_POLL_INTERVAL)?
                .map_or(Action::Continue, Action::from_key);
            match action {
                Action::Save => {
                    image.save(&path)?;
                    self.saves += 1;
                    info!(path = %path.display(), "saved frame");
                    writeln!(self.console, "{SAVED_MESSAGE}")?;
                }
                Action::Quit => return Ok(CloseReason::Quit),
                Action::Continue => {}
            }
        }
    }
}
