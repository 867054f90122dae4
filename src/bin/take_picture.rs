//! Preview a webcam and save snapshots: 'S' saves, 'Q' quits.

use std::io;

use calib_capture::cli::{init_logging, TakePictureArgs};
use calib_capture::interactive::prompt_camera_index;
use calib_capture::{CloseReason, InteractiveCapture, PistonPreview, V4L2Device};
use clap::Parser;

const WINDOW_TITLE: &str = "Webcam Feed";

fn main() {
    let args = TakePictureArgs::parse();
    init_logging(&args.log_level);

    match run(&args) {
        Ok(CloseReason::OpenFailed) => std::process::exit(1),
        Ok(_) => {}
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}

fn run(args: &TakePictureArgs) -> calib_capture::traits::Result<CloseReason> {
    let camera_index = match args.camera {
        Some(index) => index,
        None => prompt_camera_index(&mut io::stdin().lock(), &mut io::stdout())?,
    };

    let mut capture = InteractiveCapture::new(camera_index, PistonPreview::new(WINDOW_TITLE))
        .with_output_dir(args.output_dir.clone());
    capture.run(V4L2Device::open)
}
