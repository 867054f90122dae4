//! Capture a set of calibration images from a camera.

use calib_capture::cli::{init_logging, CalibrateArgs};
use calib_capture::{run_orchestrator, V4l2Calibration};
use clap::Parser;

fn main() {
    let args = CalibrateArgs::parse();
    init_logging(&args.log_level);

    if let Err(err) = run(&args) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(args: &CalibrateArgs) -> calib_capture::traits::Result<()> {
    let mut delegate = V4l2Calibration::new(args.plan());
    let written = run_orchestrator(args, &mut delegate)?;

    println!(
        "Captured {} calibration images in {}",
        written.len(),
        delegate.output_dir().display()
    );
    Ok(())
}
