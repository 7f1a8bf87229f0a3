use anyhow::Result;
use apogee_tools::cli::CommonArgs;
use clap::Parser;

/// Set the cooler setpoint
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Set point (deg C)
    #[arg(long = "sp", allow_negative_numbers = true)]
    setpoint: f64,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let (mut cam, _) = args.common.open_camera(false)?;
    cam.set_cooler_setpoint(args.setpoint)?;
    println!("{}", cam.cooler_status()?);
    cam.disconnect()?;
    Ok(())
}
