use anyhow::Result;
use apogee_tools::cli::CommonArgs;
use clap::Parser;

/// Print the camera and cooler status
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let (mut cam, _) = args.common.open_camera(false)?;
    if let Some(desc) = cam.descriptor() {
        println!("camera:\t\t{}", desc);
    }
    let (min, max) = cam.exposure_limits()?;
    println!("exposure:\t{} - {} s", min, max);
    println!("{}", cam.cooler_status()?);
    cam.disconnect()?;
    Ok(())
}
