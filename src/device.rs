//! Vendor SDK boundary.
//!
//! [`ApogeeDriver`] enumerates and opens cameras, [`ApogeeDevice`] is one open
//! handle. The facade only talks to these traits, so it runs unchanged over
//! libapogee or over [`crate::sim`].

use std::fmt::{self, Display, Formatter};

use crate::{AdcResolution, AdcSpeed, CoolerStatus, FanMode, ImagingStatus, Result};

/// A camera found during USB enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Enumeration index.
    pub index: usize,
    /// Camera model as reported by discovery.
    pub model: String,
    /// Backend-specific discovery string used to open the camera.
    pub discovery: String,
}

impl Display for DeviceDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.index, self.model)
    }
}

/// Enumerates cameras and opens connections.
pub trait ApogeeDriver {
    /// List the USB cameras currently attached.
    fn list_devices(&mut self) -> Result<Vec<DeviceDescriptor>>;

    /// Open and initialise the camera described by `desc`.
    fn connect_device(&mut self, desc: &DeviceDescriptor) -> Result<Box<dyn ApogeeDevice>>;
}

/// One open camera handle.
///
/// Temperatures are in degrees Celsius, times in seconds. ADC gain and offset
/// are addressed by ADC speed and channel, as the SDK does.
pub trait ApogeeDevice {
    /// Close the connection. The handle must not be used afterwards.
    fn close(&mut self) -> Result<()>;

    /// Start an exposure. `light` opens the shutter.
    fn start_exposure(&mut self, seconds: f64, light: bool) -> Result<()>;
    /// Abort the exposure in progress.
    fn stop_exposure(&mut self) -> Result<()>;
    /// Current imaging status.
    fn imaging_status(&mut self) -> Result<ImagingStatus>;
    /// Download the image of the last exposure, row-major.
    fn image(&mut self) -> Result<Vec<u16>>;

    /// Sensor columns.
    fn max_img_cols(&mut self) -> Result<usize>;
    /// Sensor rows.
    fn max_img_rows(&mut self) -> Result<usize>;
    /// Shortest recommended exposure.
    fn min_exposure_time(&mut self) -> Result<f64>;
    /// Longest recommended exposure.
    fn max_exposure_time(&mut self) -> Result<f64>;

    /// CCD temperature.
    fn temp_ccd(&mut self) -> Result<f64>;
    /// Heatsink temperature.
    fn temp_heatsink(&mut self) -> Result<f64>;
    /// Cooler setpoint.
    fn cooler_setpoint(&mut self) -> Result<f64>;
    /// Set the cooler setpoint.
    fn set_cooler_setpoint(&mut self, deg: f64) -> Result<()>;
    /// Cooler drive in percent.
    fn cooler_drive(&mut self) -> Result<f64>;
    /// Cooler regulation state.
    fn cooler_status(&mut self) -> Result<CoolerStatus>;
    /// Switch the cooler on or off.
    fn set_cooler(&mut self, on: bool) -> Result<()>;
    /// Fan speed.
    fn fan_mode(&mut self) -> Result<FanMode>;

    /// Resolution of the active ADC.
    fn adc_resolution(&mut self) -> Result<AdcResolution>;
    /// Active ADC speed.
    fn adc_speed(&mut self) -> Result<AdcSpeed>;
    /// Select the ADC speed.
    fn set_adc_speed(&mut self, speed: AdcSpeed) -> Result<()>;
    /// ADC gain for `speed` and `channel`.
    fn adc_gain(&mut self, speed: AdcSpeed, channel: i32) -> Result<u16>;
    /// Set the ADC gain for `speed` and `channel`.
    fn set_adc_gain(&mut self, gain: u16, speed: AdcSpeed, channel: i32) -> Result<()>;
    /// ADC offset for `speed` and `channel`.
    fn adc_offset(&mut self, speed: AdcSpeed, channel: i32) -> Result<u16>;
    /// Set the ADC offset for `speed` and `channel`.
    fn set_adc_offset(&mut self, offset: u16, speed: AdcSpeed, channel: i32) -> Result<()>;
}
