use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::{Context, Result};
use apogee_tools::{
    calibration::{estimate_rate, exposure_ladder, run_pairs},
    cli::CommonArgs,
};
use clap::Parser;

/// Capture exposure pairs over a range of times for gain calibration
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Min exposure (s) used for the ADU estimate
    #[arg(long = "mi", default_value_t = 0.002)]
    min_exp: f64,

    /// Max exposure (s) used for the ADU estimate
    #[arg(long = "ma", default_value_t = 100.0)]
    max_exp: f64,

    /// Output directory, defaults to `savedir` from the configuration
    #[arg(long)]
    outdir: Option<PathBuf>,

    /// Replace existing frames
    #[arg(long)]
    overwrite: bool,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let running = Arc::new(AtomicBool::new(true));
    // ctrl + c handler to stop the sequence between exposures
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
            println!("\nCtrl + C received!");
        })
        .context("Error setting Ctrl-C handler")?;
    }

    let (mut cam, cfg) = args.common.open_camera(true)?;
    let outdir = args.outdir.unwrap_or_else(|| PathBuf::from(&cfg.savedir));

    let est = estimate_rate(&mut cam)?;
    println!(
        "At minimum exposure time of {}s, number of ADUs will be ~{}.",
        args.min_exp,
        est.adu_at(args.min_exp)
    );
    println!(
        "At maximum exposure time of {}s, number of ADUs will be ~{}.",
        args.max_exp,
        est.adu_at(args.max_exp)
    );
    println!(
        "If full well is determined by the ADC ({}bit), there are {} levels available for digitisation.",
        est.adc_bits,
        est.full_scale()
    );

    let files = run_pairs(&mut cam, &exposure_ladder(), &outdir, args.overwrite, &running)?;
    println!("Wrote {} frame(s) to {}", files.len(), outdir.display());
    cam.disconnect()?;
    Ok(())
}
