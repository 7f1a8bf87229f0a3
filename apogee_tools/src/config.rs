use std::{path::Path, time::Duration};

use anyhow::{anyhow, Context, Result};
use apogee_camera::{PollConfig, ReadoutSpeed};
use configparser::ini::Ini;

#[derive(Debug, Clone, PartialEq)]
pub struct ApogeeConfig {
    pub progname: String,
    pub camera_index: usize,
    pub init: bool,
    pub savedir: String,
    pub poll: PollConfig,
    pub readout_speed: Option<ReadoutSpeed>,
    pub gain: Option<i64>,
    pub offset: Option<i64>,
}

impl Default for ApogeeConfig {
    fn default() -> Self {
        Self {
            progname: "ApogeeCam".to_string(),
            camera_index: 0,
            init: false,
            savedir: ".".to_string(),
            poll: PollConfig::default(),
            readout_speed: None, // leave the camera setting alone
            gain: None,
            offset: None,
        }
    }
}

impl ApogeeConfig {
    pub fn from_ini(path: &Path) -> Result<ApogeeConfig> {
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|e| anyhow!("Reading {}: {}", path.display(), e))?;
        let mut cfg = ApogeeConfig::default();

        // program name
        if let Some(name) = config.get("program", "name") {
            cfg.progname = name;
        }

        // camera section
        if let Some(index) = config.getuint("camera", "index").map_err(|e| anyhow!(e))? {
            cfg.camera_index = index as usize;
        }
        if let Some(init) = config.getbool("camera", "init").map_err(|e| anyhow!(e))? {
            cfg.init = init;
        }

        // capture section
        if let Some(savedir) = config.get("capture", "savedir") {
            cfg.savedir = savedir;
        }
        if let Some(ms) = config
            .getuint("capture", "poll_initial_ms")
            .map_err(|e| anyhow!(e))?
        {
            cfg.poll.initial_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = config
            .getuint("capture", "poll_max_ms")
            .map_err(|e| anyhow!(e))?
        {
            cfg.poll.max_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = config
            .getfloat("capture", "readout_timeout_s")
            .map_err(|e| anyhow!(e))?
        {
            cfg.poll.readout_timeout = Duration::try_from_secs_f64(secs)
                .with_context(|| format!("Invalid readout_timeout_s {}", secs))?;
        }

        // adc section
        if let Some(speed) = config.get("adc", "speed") {
            cfg.readout_speed = Some(speed.parse()?);
        }
        cfg.gain = config.getint("adc", "gain").map_err(|e| anyhow!(e))?;
        cfg.offset = config.getint("adc", "offset").map_err(|e| anyhow!(e))?;
        Ok(cfg)
    }

    pub fn to_ini(&self, path: &Path) -> Result<()> {
        let mut config = Ini::new();
        config.set("program", "name", Some(self.progname.clone()));
        config.set("camera", "index", Some(self.camera_index.to_string()));
        config.set("camera", "init", Some(self.init.to_string()));
        config.set("capture", "savedir", Some(self.savedir.clone()));
        config.set(
            "capture",
            "poll_initial_ms",
            Some(self.poll.initial_interval.as_millis().to_string()),
        );
        config.set(
            "capture",
            "poll_max_ms",
            Some(self.poll.max_interval.as_millis().to_string()),
        );
        config.set(
            "capture",
            "readout_timeout_s",
            Some(self.poll.readout_timeout.as_secs_f64().to_string()),
        );
        if let Some(speed) = self.readout_speed {
            config.set("adc", "speed", Some(speed.to_string()));
        }
        if let Some(gain) = self.gain {
            config.set("adc", "gain", Some(gain.to_string()));
        }
        if let Some(offset) = self.offset {
            config.set("adc", "offset", Some(offset.to_string()));
        }
        config
            .write(path)
            .with_context(|| format!("Writing {}", path.display()))?;
        Ok(())
    }

    /// Load `path`, or write the defaults there if it does not exist yet.
    pub fn load_or_create(path: &Path) -> Result<ApogeeConfig> {
        if path.exists() {
            return ApogeeConfig::from_ini(path);
        }
        println!(
            "Config file {:?} not found, writing defaults",
            path.as_os_str()
        );
        let cfg = ApogeeConfig::default();
        cfg.to_ini(path)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn ini_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("apogee.ini");
        let cfg = ApogeeConfig {
            progname: "bench".to_string(),
            camera_index: 1,
            init: true,
            savedir: "/tmp/frames".to_string(),
            poll: PollConfig {
                initial_interval: Duration::from_millis(2),
                max_interval: Duration::from_millis(500),
                readout_timeout: Duration::from_secs_f64(12.5),
            },
            readout_speed: Some(ReadoutSpeed::Fast),
            gain: Some(200),
            offset: Some(30),
        };
        cfg.to_ini(&path).unwrap();
        assert_eq!(ApogeeConfig::from_ini(&path).unwrap(), cfg);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("apogee.ini");
        fs::write(&path, "[camera]\nindex = 2\n").unwrap();
        let cfg = ApogeeConfig::from_ini(&path).unwrap();
        assert_eq!(cfg.camera_index, 2);
        assert_eq!(cfg.poll, PollConfig::default());
        assert_eq!(cfg.gain, None);
    }

    #[test]
    fn bad_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("apogee.ini");
        fs::write(&path, "[adc]\nspeed = turbo\n").unwrap();
        assert!(ApogeeConfig::from_ini(&path).is_err());
        fs::write(&path, "[camera]\nindex = first\n").unwrap();
        assert!(ApogeeConfig::from_ini(&path).is_err());
    }

    #[test]
    fn missing_file_written_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.ini");
        let cfg = ApogeeConfig::load_or_create(&path).unwrap();
        assert_eq!(cfg, ApogeeConfig::default());
        assert!(path.exists());
        assert_eq!(ApogeeConfig::from_ini(&path).unwrap(), cfg);
    }
}
