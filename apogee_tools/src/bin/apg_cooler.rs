use anyhow::Result;
use apogee_tools::cli::CommonArgs;
use clap::{builder::BoolishValueParser, Parser};

/// Switch the camera cooler on or off
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Cooler state (1/0, on/off, true/false)
    #[arg(long = "s", default_value = "1", value_parser = BoolishValueParser::new())]
    mode: bool,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let (mut cam, _) = args.common.open_camera(false)?;
    cam.set_cooler(args.mode)?;
    println!("Cooler {}", if args.mode { "on" } else { "off" });
    cam.disconnect()?;
    Ok(())
}
