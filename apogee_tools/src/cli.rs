//! Arguments and camera setup shared by the command line tools.

use std::path::PathBuf;

use anyhow::{Context, Result};
use apogee_camera::{sim::SimulatedDriver, ApogeeDriver, CameraUnitApogee};
use clap::Args;
use log::info;

use crate::config::ApogeeConfig;

/// Options accepted by every tool.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// INI configuration file, created with defaults if missing
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Camera index, overrides the configuration file
    #[arg(long)]
    pub camera: Option<usize>,

    /// Use a simulated camera instead of USB hardware
    #[arg(long)]
    pub simulate: bool,
}

impl CommonArgs {
    pub fn load_config(&self) -> Result<ApogeeConfig> {
        let mut cfg = match &self.config {
            Some(path) => ApogeeConfig::load_or_create(path)?,
            None => ApogeeConfig::default(),
        };
        if let Some(index) = self.camera {
            cfg.camera_index = index;
        }
        Ok(cfg)
    }

    pub fn driver(&self) -> Result<Box<dyn ApogeeDriver>> {
        if self.simulate {
            info!("Using simulated camera");
            return Ok(Box::new(SimulatedDriver::default()));
        }
        hardware_driver()
    }

    /// Connect to the configured camera and apply the configured ADC settings.
    ///
    /// `init` resets readout speed, gain and offset, as does `init = true` in the
    /// configuration file. Explicit `[adc]` values are applied afterwards.
    pub fn open_camera(&self, init: bool) -> Result<(CameraUnitApogee, ApogeeConfig)> {
        let cfg = self.load_config()?;
        let mut drv = self.driver()?;
        let mut cam = CameraUnitApogee::open(drv.as_mut(), cfg.camera_index, init || cfg.init)
            .with_context(|| format!("Connecting to camera {}", cfg.camera_index))?
            .with_poll_config(cfg.poll);
        if let Some(speed) = cfg.readout_speed {
            cam.set_readout_speed(speed)?;
        }
        if let Some(gain) = cfg.gain {
            cam.set_adc_gain(gain)?;
        }
        if let Some(offset) = cfg.offset {
            cam.set_adc_offset(offset)?;
        }
        Ok((cam, cfg))
    }
}

#[cfg(feature = "hardware")]
fn hardware_driver() -> Result<Box<dyn ApogeeDriver>> {
    Ok(Box::new(apogee_camera::LibApogeeDriver))
}

#[cfg(not(feature = "hardware"))]
fn hardware_driver() -> Result<Box<dyn ApogeeDriver>> {
    anyhow::bail!("Built without hardware support, rebuild with `--features hardware` or pass --simulate")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use apogee_camera::{CardValue, ReadoutSpeed};
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn simulated_camera_with_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("apogee.ini");
        fs::write(&path, "[adc]\nspeed = fast\ngain = 100\n").unwrap();
        let args = CommonArgs {
            config: Some(path),
            camera: None,
            simulate: true,
        };
        let (mut cam, cfg) = args.open_camera(false).unwrap();
        assert_eq!(cfg.readout_speed, Some(ReadoutSpeed::Fast));
        let frame = cam
            .capture(std::time::Duration::from_millis(10), true, false)
            .unwrap();
        assert_eq!(frame.metadata.adc_bits(), Some(12));
        assert_eq!(
            frame.metadata.get("ADGAIN").unwrap().value,
            CardValue::Float(100.0)
        );
    }

    #[test]
    fn camera_index_checked() {
        let args = CommonArgs {
            config: None,
            camera: Some(4),
            simulate: true,
        };
        assert!(args.open_camera(false).is_err());
    }

    #[cfg(not(feature = "hardware"))]
    #[test]
    fn hardware_needs_feature() {
        assert!(CommonArgs::default().driver().is_err());
    }
}
