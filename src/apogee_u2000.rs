//! Camera facade for Apogee Alta U-series cameras.

use std::{
    fmt::{self, Display, Formatter},
    thread::sleep,
    time::{Duration, Instant},
};

use chrono::{DateTime, Local};
use log::{debug, info, warn};
use ndarray::{Array2, ArrayD, IxDyn};

use crate::{
    ApogeeDevice, ApogeeDriver, CoolerStatus, DeviceDescriptor, Error, ImagingStatus,
    ReadoutSpeed, Result,
};

/// Largest ADC gain accepted by the camera.
pub const ADC_GAIN_MAX: i64 = 1023;
/// Largest ADC offset accepted by the camera.
pub const ADC_OFFSET_MAX: i64 = 255;
/// ADC channel addressed by gain and offset calls.
const ADC_CHANNEL: i32 = 0;

/// Status polling schedule while waiting for an image.
///
/// Polling starts at `initial_interval` and doubles up to `max_interval`. The
/// capture gives up once the exposure time plus `readout_timeout` has elapsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollConfig {
    /// First sleep between status polls.
    pub initial_interval: Duration,
    /// Longest sleep between status polls.
    pub max_interval: Duration,
    /// Time allowed for readout on top of the exposure.
    pub readout_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_secs(1),
            readout_timeout: Duration::from_secs(60),
        }
    }
}

/// Value of a metadata card.
#[derive(Debug, Clone, PartialEq)]
pub enum CardValue {
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
}

impl Display for CardValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CardValue::Int(v) => write!(f, "{}", v),
            CardValue::Float(v) => write!(f, "{}", v),
            CardValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// One `key = value / comment` metadata entry.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCard {
    /// FITS keyword.
    pub key: &'static str,
    /// Card value.
    pub value: CardValue,
    /// Description written as the card comment.
    pub comment: &'static str,
}

/// Ordered instrument metadata of one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameMetadata {
    cards: Vec<HeaderCard>,
}

impl FrameMetadata {
    fn push(&mut self, key: &'static str, value: CardValue, comment: &'static str) {
        self.cards.push(HeaderCard {
            key,
            value,
            comment,
        });
    }

    /// Look up a card by keyword.
    pub fn get(&self, key: &str) -> Option<&HeaderCard> {
        self.cards.iter().find(|c| c.key == key)
    }

    /// Cards in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &HeaderCard> {
        self.cards.iter()
    }

    /// Keywords in insertion order.
    pub fn keys(&self) -> Vec<&'static str> {
        self.cards.iter().map(|c| c.key).collect()
    }

    /// Number of cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// `true` if there are no cards.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// ADC resolution in bits, if recorded.
    pub fn adc_bits(&self) -> Option<u32> {
        match self.get("ADCBITS")?.value {
            CardValue::Int(v) => u32::try_from(v).ok(),
            _ => None,
        }
    }
}

/// A captured image with its metadata.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Pixel data, 1-D as read back or rows x columns when reshaped.
    pub data: ArrayD<u16>,
    /// Instrument metadata.
    pub metadata: FrameMetadata,
}

/// Cooler summary for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoolerReport {
    /// CCD temperature in degrees Celsius.
    pub ccd_temp: f64,
    /// Cooler setpoint in degrees Celsius.
    pub setpoint: f64,
    /// Regulation state.
    pub status: CoolerStatus,
}

impl Display for CoolerReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "CCD temp:\t{}", self.ccd_temp)?;
        writeln!(f, "setpoint:\t{}", self.setpoint)?;
        write!(f, "status:\t\t{}", self.status)
    }
}

/// Control and capture for a single Apogee camera.
///
/// The facade owns at most one device handle. Every operation fails with
/// [`Error::CameraClosed`] until [`CameraUnitApogee::connect`] succeeds, and the
/// handle is closed on [`CameraUnitApogee::disconnect`] or when the facade is dropped.
pub struct CameraUnitApogee {
    device: Option<Box<dyn ApogeeDevice>>,
    descriptor: Option<DeviceDescriptor>,
    poll: PollConfig,
}

impl Default for CameraUnitApogee {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CameraUnitApogee {
    fn drop(&mut self) {
        if let Some(mut dev) = self.device.take() {
            if let Err(e) = dev.close() {
                warn!("Failed to close camera: {}", e);
            }
        }
    }
}

impl CameraUnitApogee {
    /// Create an unconnected facade.
    pub fn new() -> Self {
        Self {
            device: None,
            descriptor: None,
            poll: PollConfig::default(),
        }
    }

    /// Create a facade and connect to the camera at `index`.
    ///
    /// # Errors
    ///  - [`Error::NoCamerasAvailable`] - No camera was enumerated.
    ///  - [`Error::InvalidIndex`] - `index` is beyond the enumerated cameras.
    pub fn open(driver: &mut dyn ApogeeDriver, index: usize, init: bool) -> Result<Self> {
        let mut cam = Self::new();
        cam.connect(driver, index, init)?;
        Ok(cam)
    }

    /// Replace the status polling schedule used by [`CameraUnitApogee::capture`].
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Current status polling schedule.
    pub fn poll_config(&self) -> &PollConfig {
        &self.poll
    }

    /// Set the status polling schedule.
    pub fn set_poll_config(&mut self, poll: PollConfig) {
        self.poll = poll;
    }

    /// `true` while a camera handle is held.
    pub fn is_connected(&self) -> bool {
        self.device.is_some()
    }

    /// Descriptor of the connected camera.
    pub fn descriptor(&self) -> Option<&DeviceDescriptor> {
        self.descriptor.as_ref()
    }

    fn device(&mut self) -> Result<&mut (dyn ApogeeDevice + 'static)> {
        self.device.as_deref_mut().ok_or(Error::CameraClosed)
    }

    /// Enumerate USB cameras and connect to the one at `index`.
    ///
    /// An existing connection is closed first. With `init`, the readout speed
    /// is set to normal and the ADC gain and offset to zero.
    ///
    /// # Errors
    ///  - [`Error::NoCamerasAvailable`] - No camera was enumerated.
    ///  - [`Error::InvalidIndex`] - `index` is beyond the enumerated cameras.
    pub fn connect(
        &mut self,
        driver: &mut dyn ApogeeDriver,
        index: usize,
        init: bool,
    ) -> Result<()> {
        let devices = driver.list_devices()?;
        if devices.is_empty() {
            return Err(Error::NoCamerasAvailable);
        }
        let desc = devices.get(index).ok_or(Error::InvalidIndex {
            index,
            count: devices.len(),
        })?;
        if self.device.is_some() {
            self.disconnect()?;
        }
        let dev = driver.connect_device(desc)?;
        info!("Connected to camera {}", desc);
        self.device = Some(dev);
        self.descriptor = Some(desc.clone());

        if init {
            self.set_readout_speed(ReadoutSpeed::Normal)?;
            self.set_adc_gain(0)?;
            self.set_adc_offset(0)?;
        }
        Ok(())
    }

    /// Close the camera handle.
    ///
    /// # Errors
    ///  - [`Error::CameraClosed`] - No camera is connected.
    pub fn disconnect(&mut self) -> Result<()> {
        let mut dev = self.device.take().ok_or(Error::CameraClosed)?;
        if let Some(desc) = self.descriptor.take() {
            info!("Disconnecting camera {}", desc);
        }
        dev.close()
    }

    /// Expose, read back and annotate a frame.
    ///
    /// # Arguments
    ///  * `exposure` - Exposure time.
    ///  * `reshape` - Reshape the pixels to rows x columns of the sensor.
    ///  * `override_limits` - Skip the camera's min/max exposure check.
    ///
    /// # Errors
    ///  - [`Error::CameraClosed`] - No camera is connected.
    ///  - [`Error::InvalidValue`] - Exposure outside the camera limits, checked before the
    ///    exposure starts.
    ///  - [`Error::ExposureFailed`] - The camera reported a connection, data or pattern error.
    ///  - [`Error::TimedOut`] - The image was not ready within exposure + readout timeout.
    ///  - [`Error::InvalidShape`] - The image does not match the sensor geometry.
    pub fn capture(
        &mut self,
        exposure: Duration,
        reshape: bool,
        override_limits: bool,
    ) -> Result<Frame> {
        let poll = self.poll;
        let dev = self.device()?;
        let seconds = exposure.as_secs_f64();

        if !override_limits {
            let min = dev.min_exposure_time()?;
            let max = dev.max_exposure_time()?;
            if seconds > max || seconds < min {
                return Err(Error::InvalidValue(format!(
                    "Exposure time {} s violates camera's min/max recommended exposure times ({} - {} s)",
                    seconds, min, max
                )));
            }
        }

        let exp_start = Local::now();
        dev.start_exposure(seconds, true)?;
        wait_image_ready(dev, exposure, &poll)?;

        let read_start = Instant::now();
        let pixels = dev.image()?;
        let rate = readout_rate(pixels.len(), read_start.elapsed());
        debug!("Read {} pixels at {} Hz", pixels.len(), rate);

        let data = if reshape {
            let rows = dev.max_img_rows()?;
            let cols = dev.max_img_cols()?;
            reshape_pixels(pixels, rows, cols)?
        } else {
            let len = pixels.len();
            ArrayD::from_shape_vec(IxDyn(&[len]), pixels).map_err(|_| Error::InvalidShape {
                len,
                rows: 1,
                cols: len,
            })?
        };

        let metadata = frame_metadata(dev, exposure, exp_start, rate)?;
        Ok(Frame { data, metadata })
    }

    /// Set the ADC gain of the active ADC speed.
    ///
    /// # Errors
    ///  - [`Error::CameraClosed`] - No camera is connected.
    ///  - [`Error::InvalidValue`] - Gain outside 0 - 1023.
    pub fn set_adc_gain(&mut self, gain: i64) -> Result<()> {
        let dev = self.device()?;
        if !(0..=ADC_GAIN_MAX).contains(&gain) {
            return Err(Error::InvalidValue(format!(
                "Invalid gain setting {}, must be between 0 and {}",
                gain, ADC_GAIN_MAX
            )));
        }
        let speed = dev.adc_speed()?;
        dev.set_adc_gain(gain as u16, speed, ADC_CHANNEL)?;
        info!("Set ADC gain to {}", gain);
        Ok(())
    }

    /// Set the ADC offset of the active ADC speed.
    ///
    /// # Errors
    ///  - [`Error::CameraClosed`] - No camera is connected.
    ///  - [`Error::InvalidValue`] - Offset outside 0 - 255.
    pub fn set_adc_offset(&mut self, offset: i64) -> Result<()> {
        let dev = self.device()?;
        if !(0..=ADC_OFFSET_MAX).contains(&offset) {
            return Err(Error::InvalidValue(format!(
                "Invalid offset setting {}, must be between 0 and {}",
                offset, ADC_OFFSET_MAX
            )));
        }
        let speed = dev.adc_speed()?;
        dev.set_adc_offset(offset as u16, speed, ADC_CHANNEL)?;
        info!("Set ADC offset to {}", offset);
        Ok(())
    }

    /// Set the readout speed by name, `"normal"` (16 bit) or `"fast"` (12 bit).
    ///
    /// # Errors
    ///  - [`Error::CameraClosed`] - No camera is connected.
    ///  - [`Error::InvalidMode`] - Unknown name. The camera is not touched.
    pub fn set_ro_speed(&mut self, speed: &str) -> Result<()> {
        self.device()?;
        let speed = speed.parse::<ReadoutSpeed>()?;
        self.set_readout_speed(speed)
    }

    /// Set the readout speed.
    pub fn set_readout_speed(&mut self, speed: ReadoutSpeed) -> Result<()> {
        self.device()?.set_adc_speed(speed.into())?;
        info!("Set readout speed to {}", speed);
        Ok(())
    }

    /// Set the cooler setpoint in degrees Celsius.
    pub fn set_cooler_setpoint(&mut self, setpoint: f64) -> Result<()> {
        self.device()?.set_cooler_setpoint(setpoint)?;
        info!("Set cooler setpoint to {} C", setpoint);
        Ok(())
    }

    /// Switch the cooler on or off.
    pub fn set_cooler(&mut self, on: bool) -> Result<()> {
        self.device()?.set_cooler(on)?;
        info!("Cooler {}", if on { "on" } else { "off" });
        Ok(())
    }

    /// CCD temperature, setpoint and cooler state.
    pub fn cooler_status(&mut self) -> Result<CoolerReport> {
        let dev = self.device()?;
        Ok(CoolerReport {
            ccd_temp: dev.temp_ccd()?,
            setpoint: dev.cooler_setpoint()?,
            status: dev.cooler_status()?,
        })
    }

    /// Recommended exposure range of the camera in seconds.
    pub fn exposure_limits(&mut self) -> Result<(f64, f64)> {
        let dev = self.device()?;
        Ok((dev.min_exposure_time()?, dev.max_exposure_time()?))
    }
}

/// Poll the imaging status until the image is ready.
fn wait_image_ready(
    dev: &mut dyn ApogeeDevice,
    exposure: Duration,
    poll: &PollConfig,
) -> Result<()> {
    let deadline = exposure.saturating_add(poll.readout_timeout);
    let start = Instant::now();
    let mut interval = poll
        .initial_interval
        .max(Duration::from_micros(1))
        .min(poll.max_interval);
    loop {
        let status = dev.imaging_status()?;
        if status == ImagingStatus::ImageReady {
            return Ok(());
        }
        if status.is_error() {
            warn!("Capture failed with camera status {} ({})", status.code(), status);
            return Err(Error::ExposureFailed(status));
        }
        let elapsed = start.elapsed();
        if elapsed >= deadline {
            if let Err(e) = dev.stop_exposure() {
                warn!("Failed to stop exposure: {}", e);
            }
            return Err(Error::TimedOut(elapsed));
        }
        debug!("Camera status {}, next poll in {:?}", status, interval);
        sleep(interval.min(deadline - elapsed));
        interval = (interval * 2).min(poll.max_interval);
    }
}

/// Pixels per second, rounded. Zero when the read took no measurable time.
fn readout_rate(pixels: usize, read_time: Duration) -> f64 {
    let secs = read_time.as_secs_f64();
    if secs > 0.0 {
        (pixels as f64 / secs).round()
    } else {
        0.0
    }
}

fn reshape_pixels(pixels: Vec<u16>, rows: usize, cols: usize) -> Result<ArrayD<u16>> {
    let len = pixels.len();
    if len != rows * cols {
        return Err(Error::InvalidShape { len, rows, cols });
    }
    Array2::from_shape_vec((rows, cols), pixels)
        .map(|a| a.into_dyn())
        .map_err(|_| Error::InvalidShape { len, rows, cols })
}

fn frame_metadata(
    dev: &mut dyn ApogeeDevice,
    exposure: Duration,
    exp_start: DateTime<Local>,
    readout_rate: f64,
) -> Result<FrameMetadata> {
    let speed = dev.adc_speed()?;
    let mut meta = FrameMetadata::default();
    meta.push(
        "CCDTEMP0",
        CardValue::Float(dev.temp_ccd()?),
        "CCD temperature (deg)",
    );
    meta.push(
        "CCDTEMP1",
        CardValue::Float(dev.temp_heatsink()?),
        "heatsink temperature (deg)",
    );
    meta.push(
        "ADCBITS",
        CardValue::Int(dev.adc_resolution()?.bits() as i64),
        "resolution of ADC (bits)",
    );
    meta.push(
        "SETPOINT",
        CardValue::Float(dev.cooler_setpoint()?),
        "cooler setpoint (deg)",
    );
    meta.push(
        "COOLPOW",
        CardValue::Float(dev.cooler_drive()?),
        "cooler power (%)",
    );
    meta.push(
        "COOLSTAT",
        CardValue::Text(dev.cooler_status()?.to_string()),
        "cooler status flag",
    );
    meta.push(
        "FANMODE",
        CardValue::Text(dev.fan_mode()?.to_string()),
        "fan status flag",
    );
    meta.push(
        "ADGAIN",
        CardValue::Float(dev.adc_gain(speed, ADC_CHANNEL)? as f64),
        "ADC gain",
    );
    meta.push(
        "ADOFFSET",
        CardValue::Float(dev.adc_offset(speed, ADC_CHANNEL)? as f64),
        "ADC offset",
    );
    meta.push(
        "DATETIME",
        CardValue::Text(exp_start.format("%Y-%m-%d %H:%M:%S%.6f").to_string()),
        "frame datetime",
    );
    meta.push(
        "READOUTS",
        CardValue::Float(readout_rate),
        "pixel readout rate (Hz)",
    );
    meta.push(
        "EXPTIME",
        CardValue::Float(exposure.as_secs_f64()),
        "exposure time (s)",
    );
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{DeviceCall, SimConfig, SimulatedDriver};
    use crate::AdcSpeed;

    const KEYS: [&str; 12] = [
        "CCDTEMP0", "CCDTEMP1", "ADCBITS", "SETPOINT", "COOLPOW", "COOLSTAT", "FANMODE", "ADGAIN",
        "ADOFFSET", "DATETIME", "READOUTS", "EXPTIME",
    ];

    fn fast_poll() -> PollConfig {
        PollConfig {
            initial_interval: Duration::from_micros(100),
            max_interval: Duration::from_millis(2),
            readout_timeout: Duration::from_millis(50),
        }
    }

    fn open(cfg: SimConfig) -> (CameraUnitApogee, SimulatedDriver) {
        let mut drv = SimulatedDriver::new(vec![cfg]);
        let cam = CameraUnitApogee::open(&mut drv, 0, false)
            .unwrap()
            .with_poll_config(fast_poll());
        (cam, drv)
    }

    #[test]
    fn operations_require_connection() {
        let mut cam = CameraUnitApogee::new();
        assert!(matches!(cam.set_adc_gain(10), Err(Error::CameraClosed)));
        assert!(matches!(cam.set_adc_offset(10), Err(Error::CameraClosed)));
        assert!(matches!(cam.set_ro_speed("fast"), Err(Error::CameraClosed)));
        assert!(matches!(cam.set_cooler(true), Err(Error::CameraClosed)));
        assert!(matches!(cam.set_cooler_setpoint(-20.0), Err(Error::CameraClosed)));
        assert!(matches!(cam.cooler_status(), Err(Error::CameraClosed)));
        assert!(matches!(
            cam.capture(Duration::from_secs(1), true, false),
            Err(Error::CameraClosed)
        ));
        assert!(matches!(cam.disconnect(), Err(Error::CameraClosed)));
    }

    #[test]
    fn connect_errors() {
        let mut empty = SimulatedDriver::new(vec![]);
        assert!(matches!(
            CameraUnitApogee::open(&mut empty, 0, false),
            Err(Error::NoCamerasAvailable)
        ));
        let mut one = SimulatedDriver::default();
        assert!(matches!(
            CameraUnitApogee::open(&mut one, 3, false),
            Err(Error::InvalidIndex { index: 3, count: 1 })
        ));
    }

    #[test]
    fn connect_with_init_applies_defaults() {
        let mut drv = SimulatedDriver::default();
        let log = drv.call_log();
        let cam = CameraUnitApogee::open(&mut drv, 0, true).unwrap();
        assert!(cam.is_connected());
        let calls = log.calls();
        assert!(calls.contains(&DeviceCall::SetAdcSpeed(AdcSpeed::Normal)));
        assert!(calls.contains(&DeviceCall::SetAdcGain {
            gain: 0,
            speed: AdcSpeed::Normal,
            channel: 0
        }));
        assert!(calls.contains(&DeviceCall::SetAdcOffset {
            offset: 0,
            speed: AdcSpeed::Normal,
            channel: 0
        }));
    }

    #[test]
    fn gain_range() {
        let (mut cam, drv) = open(SimConfig::default());
        let log = drv.call_log();
        for bad in [-1, 1024, 5000, i64::MIN] {
            assert!(matches!(cam.set_adc_gain(bad), Err(Error::InvalidValue(_))));
        }
        assert_eq!(log.count(|c| matches!(c, DeviceCall::SetAdcGain { .. })), 0);
        for good in [0, 1, 512, 1023] {
            cam.set_adc_gain(good).unwrap();
            assert_eq!(
                log.calls().last(),
                Some(&DeviceCall::SetAdcGain {
                    gain: good as u16,
                    speed: AdcSpeed::Normal,
                    channel: 0
                })
            );
        }
    }

    #[test]
    fn offset_range() {
        let (mut cam, drv) = open(SimConfig::default());
        let log = drv.call_log();
        for bad in [-1, 256, 1023] {
            assert!(matches!(cam.set_adc_offset(bad), Err(Error::InvalidValue(_))));
        }
        assert_eq!(log.count(|c| matches!(c, DeviceCall::SetAdcOffset { .. })), 0);
        for good in [0, 128, 255] {
            cam.set_adc_offset(good).unwrap();
            assert_eq!(
                log.calls().last(),
                Some(&DeviceCall::SetAdcOffset {
                    offset: good as u16,
                    speed: AdcSpeed::Normal,
                    channel: 0
                })
            );
        }
    }

    #[test]
    fn readout_speed_names() {
        let (mut cam, drv) = open(SimConfig::default());
        let log = drv.call_log();
        let before = log.calls().len();
        assert!(matches!(cam.set_ro_speed("turbo"), Err(Error::InvalidMode(_))));
        assert!(matches!(cam.set_ro_speed("Normal"), Err(Error::InvalidMode(_))));
        assert_eq!(log.calls().len(), before);
        cam.set_ro_speed("fast").unwrap();
        assert_eq!(log.calls().last(), Some(&DeviceCall::SetAdcSpeed(AdcSpeed::Fast)));
        cam.set_ro_speed("normal").unwrap();
        assert_eq!(log.calls().last(), Some(&DeviceCall::SetAdcSpeed(AdcSpeed::Normal)));
    }

    #[test]
    fn exposure_limits_checked_before_exposing() {
        let (mut cam, drv) = open(SimConfig {
            min_exposure: 0.01,
            max_exposure: 10.0,
            ..SimConfig::default()
        });
        let log = drv.call_log();
        for bad in [Duration::ZERO, Duration::from_millis(5), Duration::from_secs(11)] {
            assert!(matches!(
                cam.capture(bad, true, false),
                Err(Error::InvalidValue(_))
            ));
        }
        assert_eq!(log.count(|c| matches!(c, DeviceCall::StartExposure { .. })), 0);

        cam.capture(Duration::ZERO, true, true).unwrap();
        assert_eq!(log.count(|c| matches!(c, DeviceCall::StartExposure { .. })), 1);
    }

    #[test]
    fn error_status_stops_polling() {
        let (mut cam, drv) = open(SimConfig {
            status_script: vec![
                ImagingStatus::Exposing,
                ImagingStatus::ImagingActive,
                ImagingStatus::DataError,
                ImagingStatus::ImageReady,
            ],
            ..SimConfig::default()
        });
        let log = drv.call_log();
        let res = cam.capture(Duration::from_millis(10), true, false);
        assert!(matches!(
            res,
            Err(Error::ExposureFailed(ImagingStatus::DataError))
        ));
        assert_eq!(log.count(|c| *c == DeviceCall::ImagingStatus), 3);
        assert_eq!(log.count(|c| *c == DeviceCall::Image), 0);
    }

    #[test]
    fn every_error_status_fails() {
        for status in [
            ImagingStatus::ConnectionError,
            ImagingStatus::DataError,
            ImagingStatus::PatternError,
        ] {
            let (mut cam, _drv) = open(SimConfig {
                status_script: vec![status],
                ..SimConfig::default()
            });
            let err = cam.capture(Duration::from_millis(10), true, false).unwrap_err();
            assert!(err.to_string().contains(&status.code().to_string()));
        }
    }

    #[test]
    fn unresponsive_camera_times_out() {
        let (mut cam, drv) = open(SimConfig {
            settle_status: ImagingStatus::Exposing,
            ..SimConfig::default()
        });
        let log = drv.call_log();
        let res = cam.capture(Duration::from_millis(10), true, false);
        assert!(matches!(res, Err(Error::TimedOut(_))));
        assert_eq!(log.count(|c| *c == DeviceCall::StopExposure), 1);
        assert!(log.count(|c| *c == DeviceCall::ImagingStatus) > 1);
    }

    #[test]
    fn huge_exposure_with_override_does_not_overflow() {
        let (mut cam, _drv) = open(SimConfig::default());
        let frame = cam.capture(Duration::MAX, true, true).unwrap();
        assert_eq!(
            frame.metadata.get("EXPTIME").unwrap().value,
            CardValue::Float(Duration::MAX.as_secs_f64())
        );
    }

    #[test]
    fn capture_metadata() {
        let cfg = SimConfig::default();
        let (mut cam, _drv) = open(cfg.clone());
        let frame = cam.capture(Duration::from_millis(500), true, false).unwrap();
        assert_eq!(frame.data.shape(), &[cfg.rows, cfg.cols]);
        assert_eq!(frame.metadata.keys(), KEYS.to_vec());
        for card in frame.metadata.iter() {
            assert!(!card.comment.is_empty());
        }
        assert_eq!(frame.metadata.adc_bits(), Some(16));
        assert_eq!(
            frame.metadata.get("EXPTIME").unwrap().value,
            CardValue::Float(0.5)
        );
        assert_eq!(
            frame.metadata.get("CCDTEMP0").unwrap().value,
            CardValue::Float(cfg.temp_ccd)
        );
        assert_eq!(
            frame.metadata.get("COOLSTAT").unwrap().value,
            CardValue::Text("AT_SETPOINT".to_owned())
        );
        assert_eq!(
            frame.metadata.get("FANMODE").unwrap().value,
            CardValue::Text("LOW".to_owned())
        );
        assert!(matches!(
            frame.metadata.get("READOUTS").unwrap().value,
            CardValue::Float(v) if v >= 0.0 && v.fract() == 0.0
        ));
    }

    #[test]
    fn adc_bits_follow_resolution() {
        let (mut cam, _drv) = open(SimConfig::default());
        cam.set_ro_speed("fast").unwrap();
        let frame = cam.capture(Duration::from_millis(500), false, false).unwrap();
        assert_eq!(frame.metadata.adc_bits(), Some(12));
        assert_eq!(frame.data.ndim(), 1);
    }

    #[test]
    fn gain_reported_for_active_speed() {
        let (mut cam, _drv) = open(SimConfig::default());
        cam.set_ro_speed("fast").unwrap();
        cam.set_adc_gain(300).unwrap();
        cam.set_adc_offset(40).unwrap();
        let frame = cam.capture(Duration::from_millis(100), true, false).unwrap();
        assert_eq!(
            frame.metadata.get("ADGAIN").unwrap().value,
            CardValue::Float(300.0)
        );
        assert_eq!(
            frame.metadata.get("ADOFFSET").unwrap().value,
            CardValue::Float(40.0)
        );
    }

    #[test]
    fn cooler_controls() {
        let (mut cam, drv) = open(SimConfig::default());
        let log = drv.call_log();
        cam.set_cooler_setpoint(-25.5).unwrap();
        cam.set_cooler(false).unwrap();
        let calls = log.calls();
        assert!(calls.contains(&DeviceCall::SetCoolerSetpoint(-25.5)));
        assert!(calls.contains(&DeviceCall::SetCooler(false)));
        let report = cam.cooler_status().unwrap();
        assert_eq!(report.setpoint, -25.5);
        assert_eq!(report.status, CoolerStatus::Off);
        assert!(report.to_string().contains("status:\t\tOFF"));
    }

    #[test]
    fn disconnect_and_drop_close_handle() {
        let (mut cam, drv) = open(SimConfig::default());
        let log = drv.call_log();
        cam.disconnect().unwrap();
        assert!(!cam.is_connected());
        assert_eq!(log.count(|c| *c == DeviceCall::Close), 1);
        drop(cam);
        assert_eq!(log.count(|c| *c == DeviceCall::Close), 1);

        let (cam, drv) = open(SimConfig::default());
        let log = drv.call_log();
        drop(cam);
        assert_eq!(log.count(|c| *c == DeviceCall::Close), 1);
    }

    #[test]
    fn reshape_checks_geometry() {
        assert!(matches!(
            reshape_pixels(vec![0; 10], 3, 4),
            Err(Error::InvalidShape {
                len: 10,
                rows: 3,
                cols: 4
            })
        ));
        let a = reshape_pixels((0..12).collect(), 3, 4).unwrap();
        assert_eq!(a.shape(), &[3, 4]);
        assert_eq!(a[[1, 0]], 4);
    }

    #[test]
    fn readout_rate_rounds() {
        assert_eq!(readout_rate(1000, Duration::from_millis(3)), 333333.0);
        assert_eq!(readout_rate(1000, Duration::ZERO), 0.0);
    }
}
