use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use apogee_camera::write_frame;
use apogee_tools::cli::CommonArgs;
use chrono::Local;
use clap::Parser;

/// Take a single exposure and save it as FITS
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Exposure time (s)
    #[arg(long = "t", default_value_t = 0.001)]
    exposure: f64,

    /// Output file
    #[arg(short, long, default_value = "test.fits")]
    output: PathBuf,

    /// Ignore the camera's recommended exposure range
    #[arg(long = "override")]
    override_limits: bool,

    /// Replace the output file if it exists
    #[arg(long)]
    overwrite: bool,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let exposure = Duration::try_from_secs_f64(args.exposure)
        .with_context(|| format!("Invalid exposure time {}", args.exposure))?;

    let (mut cam, _) = args.common.open_camera(true)?;
    let exp_start = Local::now();
    let frame = cam.capture(exposure, true, args.override_limits)?;
    write_frame(&frame, &args.output, args.overwrite)
        .with_context(|| format!("Writing {}", args.output.display()))?;
    println!(
        "[{}] Saved {}, exposure {:.3} s",
        exp_start.format("%H:%M:%S"),
        args.output.display(),
        exposure.as_secs_f32()
    );
    cam.disconnect()?;
    Ok(())
}
