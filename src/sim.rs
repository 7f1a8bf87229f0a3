//! In-memory camera backend.
//!
//! Used by the test suite and by the command line tools' `--simulate` switch.
//! Every device call is appended to a shared [`CallLog`].

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use log::debug;

use crate::{
    AdcResolution, AdcSpeed, ApogeeDevice, ApogeeDriver, CoolerStatus, DeviceDescriptor, Error,
    FanMode, ImagingStatus, Result,
};

/// Device call recorded by the simulator.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Close,
    StartExposure { seconds: f64, light: bool },
    StopExposure,
    ImagingStatus,
    Image,
    SetCoolerSetpoint(f64),
    SetCooler(bool),
    SetAdcSpeed(AdcSpeed),
    SetAdcGain { gain: u16, speed: AdcSpeed, channel: i32 },
    SetAdcOffset { offset: u16, speed: AdcSpeed, channel: i32 },
}

/// Shared record of [`DeviceCall`]s.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<DeviceCall>>>);

impl CallLog {
    fn lock(&self) -> MutexGuard<'_, Vec<DeviceCall>> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, call: DeviceCall) {
        self.lock().push(call);
    }

    /// Snapshot of all calls so far.
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.lock().clone()
    }

    /// Number of calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&DeviceCall) -> bool) -> usize {
        self.lock().iter().filter(|c| pred(c)).count()
    }
}

/// Properties of a simulated camera.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub model: String,
    pub cols: usize,
    pub rows: usize,
    pub min_exposure: f64,
    pub max_exposure: f64,
    pub temp_ccd: f64,
    pub temp_heatsink: f64,
    pub setpoint: f64,
    pub cooler_drive: f64,
    pub fan_mode: FanMode,
    /// Pixel level of a zero-length exposure.
    pub bias: u16,
    /// Signal accumulated per second of exposure, in ADU.
    pub flux: f64,
    /// Statuses returned by successive polls once an exposure has started.
    pub status_script: Vec<ImagingStatus>,
    /// Status returned after the script is used up.
    pub settle_status: ImagingStatus,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            model: "Alta-U2000 (simulated)".to_owned(),
            cols: 16,
            rows: 12,
            min_exposure: 0.00002,
            max_exposure: 10485.75,
            temp_ccd: -19.8,
            temp_heatsink: 21.5,
            setpoint: -20.0,
            cooler_drive: 42.0,
            fan_mode: FanMode::Low,
            bias: 1000,
            flux: 250.0,
            status_script: vec![ImagingStatus::Exposing, ImagingStatus::ImagingActive],
            settle_status: ImagingStatus::ImageReady,
        }
    }
}

/// Driver enumerating a fixed set of simulated cameras.
#[derive(Debug, Clone)]
pub struct SimulatedDriver {
    cameras: Vec<SimConfig>,
    log: CallLog,
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new(vec![SimConfig::default()])
    }
}

impl SimulatedDriver {
    pub fn new(cameras: Vec<SimConfig>) -> Self {
        Self {
            cameras,
            log: CallLog::default(),
        }
    }

    /// Call log shared by every device this driver opens.
    pub fn call_log(&self) -> CallLog {
        self.log.clone()
    }
}

impl ApogeeDriver for SimulatedDriver {
    fn list_devices(&mut self) -> Result<Vec<DeviceDescriptor>> {
        Ok(self
            .cameras
            .iter()
            .enumerate()
            .map(|(index, cfg)| DeviceDescriptor {
                index,
                model: cfg.model.clone(),
                discovery: format!("<d>address={},interface=sim,deviceType=camera</d>", index),
            })
            .collect())
    }

    fn connect_device(&mut self, desc: &DeviceDescriptor) -> Result<Box<dyn ApogeeDevice>> {
        let cfg = self
            .cameras
            .get(desc.index)
            .cloned()
            .ok_or(Error::InvalidIndex {
                index: desc.index,
                count: self.cameras.len(),
            })?;
        debug!("Opening simulated camera {}", desc);
        Ok(Box::new(SimulatedDevice::new(cfg, self.log.clone())))
    }
}

/// One simulated camera handle.
#[derive(Debug)]
pub struct SimulatedDevice {
    cfg: SimConfig,
    log: CallLog,
    script: VecDeque<ImagingStatus>,
    exposure: Option<f64>,
    cooler_on: bool,
    speed: AdcSpeed,
    gains: HashMap<(AdcSpeed, i32), u16>,
    offsets: HashMap<(AdcSpeed, i32), u16>,
    closed: bool,
}

impl SimulatedDevice {
    pub fn new(cfg: SimConfig, log: CallLog) -> Self {
        Self {
            cfg,
            log,
            script: VecDeque::new(),
            exposure: None,
            cooler_on: true,
            speed: AdcSpeed::Normal,
            gains: HashMap::new(),
            offsets: HashMap::new(),
            closed: false,
        }
    }

    fn check_open(&self, call: &'static str) -> Result<()> {
        if self.closed {
            Err(Error::sdk(call, "connection closed"))
        } else {
            Ok(())
        }
    }

    fn resolution(&self) -> AdcResolution {
        match self.speed {
            AdcSpeed::Fast => AdcResolution::TwelveBit,
            _ => AdcResolution::SixteenBit,
        }
    }
}

impl ApogeeDevice for SimulatedDevice {
    fn close(&mut self) -> Result<()> {
        self.check_open("CloseConnection")?;
        self.log.push(DeviceCall::Close);
        self.closed = true;
        Ok(())
    }

    fn start_exposure(&mut self, seconds: f64, light: bool) -> Result<()> {
        self.check_open("StartExposure")?;
        self.log.push(DeviceCall::StartExposure { seconds, light });
        self.script = self.cfg.status_script.iter().copied().collect();
        self.exposure = Some(seconds);
        Ok(())
    }

    fn stop_exposure(&mut self) -> Result<()> {
        self.check_open("StopExposure")?;
        self.log.push(DeviceCall::StopExposure);
        self.exposure = None;
        Ok(())
    }

    fn imaging_status(&mut self) -> Result<ImagingStatus> {
        self.check_open("GetImagingStatus")?;
        self.log.push(DeviceCall::ImagingStatus);
        if self.exposure.is_none() {
            return Ok(ImagingStatus::Idle);
        }
        Ok(self.script.pop_front().unwrap_or(self.cfg.settle_status))
    }

    fn image(&mut self) -> Result<Vec<u16>> {
        self.check_open("GetImage")?;
        self.log.push(DeviceCall::Image);
        let seconds = self
            .exposure
            .take()
            .ok_or_else(|| Error::sdk("GetImage", "no exposure to read out"))?;
        let full_scale = ((1u32 << self.resolution().bits()) - 1) as f64;
        let level = self.cfg.bias as f64 + self.cfg.flux * seconds;
        Ok((0..self.cfg.cols * self.cfg.rows)
            .map(|i| (level + (i % 7) as f64).min(full_scale) as u16)
            .collect())
    }

    fn max_img_cols(&mut self) -> Result<usize> {
        Ok(self.cfg.cols)
    }

    fn max_img_rows(&mut self) -> Result<usize> {
        Ok(self.cfg.rows)
    }

    fn min_exposure_time(&mut self) -> Result<f64> {
        Ok(self.cfg.min_exposure)
    }

    fn max_exposure_time(&mut self) -> Result<f64> {
        Ok(self.cfg.max_exposure)
    }

    fn temp_ccd(&mut self) -> Result<f64> {
        Ok(self.cfg.temp_ccd)
    }

    fn temp_heatsink(&mut self) -> Result<f64> {
        Ok(self.cfg.temp_heatsink)
    }

    fn cooler_setpoint(&mut self) -> Result<f64> {
        Ok(self.cfg.setpoint)
    }

    fn set_cooler_setpoint(&mut self, deg: f64) -> Result<()> {
        self.check_open("SetCoolerSetPoint")?;
        self.log.push(DeviceCall::SetCoolerSetpoint(deg));
        self.cfg.setpoint = deg;
        Ok(())
    }

    fn cooler_drive(&mut self) -> Result<f64> {
        Ok(if self.cooler_on {
            self.cfg.cooler_drive
        } else {
            0.0
        })
    }

    fn cooler_status(&mut self) -> Result<CoolerStatus> {
        if !self.cooler_on {
            return Ok(CoolerStatus::Off);
        }
        if (self.cfg.temp_ccd - self.cfg.setpoint).abs() <= 0.5 {
            Ok(CoolerStatus::AtSetPoint)
        } else {
            Ok(CoolerStatus::RampingToSetPoint)
        }
    }

    fn set_cooler(&mut self, on: bool) -> Result<()> {
        self.check_open("SetCooler")?;
        self.log.push(DeviceCall::SetCooler(on));
        self.cooler_on = on;
        Ok(())
    }

    fn fan_mode(&mut self) -> Result<FanMode> {
        Ok(self.cfg.fan_mode)
    }

    fn adc_resolution(&mut self) -> Result<AdcResolution> {
        Ok(self.resolution())
    }

    fn adc_speed(&mut self) -> Result<AdcSpeed> {
        Ok(self.speed)
    }

    fn set_adc_speed(&mut self, speed: AdcSpeed) -> Result<()> {
        self.check_open("SetCcdAdcSpeed")?;
        self.log.push(DeviceCall::SetAdcSpeed(speed));
        self.speed = speed;
        Ok(())
    }

    fn adc_gain(&mut self, speed: AdcSpeed, channel: i32) -> Result<u16> {
        Ok(self.gains.get(&(speed, channel)).copied().unwrap_or(0))
    }

    fn set_adc_gain(&mut self, gain: u16, speed: AdcSpeed, channel: i32) -> Result<()> {
        self.check_open("SetAdcGain")?;
        self.log.push(DeviceCall::SetAdcGain {
            gain,
            speed,
            channel,
        });
        self.gains.insert((speed, channel), gain);
        Ok(())
    }

    fn adc_offset(&mut self, speed: AdcSpeed, channel: i32) -> Result<u16> {
        Ok(self.offsets.get(&(speed, channel)).copied().unwrap_or(0))
    }

    fn set_adc_offset(&mut self, offset: u16, speed: AdcSpeed, channel: i32) -> Result<()> {
        self.check_open("SetAdcOffset")?;
        self.log.push(DeviceCall::SetAdcOffset {
            offset,
            speed,
            channel,
        });
        self.offsets.insert((speed, channel), offset);
        Ok(())
    }
}
