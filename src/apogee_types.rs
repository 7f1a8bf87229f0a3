//! Apogee SDK enumerations and their display translation.
//!
//! Raw values follow the `Apg` namespace of libapogee, so the hardware backend
//! converts with [`TryFrom<i32>`] and the rest of the crate only sees typed values.

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use crate::Error;

/// Imaging state reported while an exposure is in progress.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImagingStatus {
    /// USB connection to the camera failed.
    ConnectionError = -3,
    /// Image data transfer failed.
    DataError = -2,
    /// Test pattern verification failed.
    PatternError = -1,
    /// Camera idle.
    Idle = 0,
    /// Exposure in progress.
    Exposing = 1,
    /// Readout in progress.
    ImagingActive = 2,
    /// Image ready for download.
    ImageReady = 3,
    /// Sensor flushing.
    Flushing = 4,
    /// Waiting for an external trigger.
    WaitingOnTrigger = 5,
}

impl ImagingStatus {
    /// Raw SDK status code.
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// `true` for the three statuses that abort a capture.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ImagingStatus::ConnectionError | ImagingStatus::DataError | ImagingStatus::PatternError
        )
    }
}

impl TryFrom<i32> for ImagingStatus {
    type Error = Error;

    fn try_from(val: i32) -> Result<Self, Self::Error> {
        match val {
            -3 => Ok(ImagingStatus::ConnectionError),
            -2 => Ok(ImagingStatus::DataError),
            -1 => Ok(ImagingStatus::PatternError),
            0 => Ok(ImagingStatus::Idle),
            1 => Ok(ImagingStatus::Exposing),
            2 => Ok(ImagingStatus::ImagingActive),
            3 => Ok(ImagingStatus::ImageReady),
            4 => Ok(ImagingStatus::Flushing),
            5 => Ok(ImagingStatus::WaitingOnTrigger),
            _ => Err(Error::InvalidMode(format!("Invalid imaging status: {}", val))),
        }
    }
}

impl Display for ImagingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ImagingStatus::ConnectionError => write!(f, "ConnectionError"),
            ImagingStatus::DataError => write!(f, "DataError"),
            ImagingStatus::PatternError => write!(f, "PatternError"),
            ImagingStatus::Idle => write!(f, "Idle"),
            ImagingStatus::Exposing => write!(f, "Exposing"),
            ImagingStatus::ImagingActive => write!(f, "ImagingActive"),
            ImagingStatus::ImageReady => write!(f, "ImageReady"),
            ImagingStatus::Flushing => write!(f, "Flushing"),
            ImagingStatus::WaitingOnTrigger => write!(f, "WaitingOnTrigger"),
        }
    }
}

/// Thermoelectric cooler state.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoolerStatus {
    /// Cooler off.
    Off = 0,
    /// Ramping towards the setpoint.
    RampingToSetPoint = 1,
    /// Holding the setpoint.
    AtSetPoint = 2,
    /// Waiting on a firmware revision check.
    Revision = 3,
    /// Regulation suspended during readout.
    Suspended = 4,
}

impl TryFrom<i32> for CoolerStatus {
    type Error = Error;

    fn try_from(val: i32) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(CoolerStatus::Off),
            1 => Ok(CoolerStatus::RampingToSetPoint),
            2 => Ok(CoolerStatus::AtSetPoint),
            3 => Ok(CoolerStatus::Revision),
            4 => Ok(CoolerStatus::Suspended),
            _ => Err(Error::InvalidMode(format!("Invalid cooler status: {}", val))),
        }
    }
}

impl Display for CoolerStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CoolerStatus::Off => write!(f, "OFF"),
            CoolerStatus::RampingToSetPoint => write!(f, "RAMPING"),
            CoolerStatus::AtSetPoint => write!(f, "AT_SETPOINT"),
            CoolerStatus::Revision => write!(f, "WAITING"),
            CoolerStatus::Suspended => write!(f, "SUSPENDED"),
        }
    }
}

/// Camera fan speed.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FanMode {
    /// Fan off.
    Off = 0,
    /// Low speed.
    Low = 1,
    /// Medium speed.
    Medium = 2,
    /// High speed.
    High = 3,
}

impl TryFrom<i32> for FanMode {
    type Error = Error;

    fn try_from(val: i32) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(FanMode::Off),
            1 => Ok(FanMode::Low),
            2 => Ok(FanMode::Medium),
            3 => Ok(FanMode::High),
            _ => Err(Error::InvalidMode(format!("Invalid fan mode: {}", val))),
        }
    }
}

impl Display for FanMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FanMode::Off => write!(f, "OFF"),
            FanMode::Low => write!(f, "LOW"),
            FanMode::Medium => write!(f, "MEDIUM"),
            FanMode::High => write!(f, "HIGH"),
        }
    }
}

/// Digitization resolution of the CCD ADC.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdcResolution {
    /// 16-bit ADC, used at normal readout speed.
    SixteenBit = 0,
    /// 12-bit ADC, used at fast readout speed.
    TwelveBit = 1,
}

impl AdcResolution {
    /// Number of bits per digitized pixel.
    pub fn bits(&self) -> u32 {
        match self {
            AdcResolution::SixteenBit => 16,
            AdcResolution::TwelveBit => 12,
        }
    }
}

impl TryFrom<i32> for AdcResolution {
    type Error = Error;

    fn try_from(val: i32) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(AdcResolution::SixteenBit),
            1 => Ok(AdcResolution::TwelveBit),
            _ => Err(Error::InvalidMode(format!("Invalid ADC resolution: {}", val))),
        }
    }
}

/// ADC speed as understood by the SDK.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdcSpeed {
    /// Speed not reported.
    Unknown = 0,
    /// Normal (16-bit) readout.
    Normal = 1,
    /// Fast (12-bit) readout.
    Fast = 2,
    /// Video mode.
    Video = 3,
}

impl TryFrom<i32> for AdcSpeed {
    type Error = Error;

    fn try_from(val: i32) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(AdcSpeed::Unknown),
            1 => Ok(AdcSpeed::Normal),
            2 => Ok(AdcSpeed::Fast),
            3 => Ok(AdcSpeed::Video),
            _ => Err(Error::InvalidMode(format!("Invalid ADC speed: {}", val))),
        }
    }
}

/// Readout speed selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReadoutSpeed {
    /// 16-bit readout.
    #[default]
    Normal,
    /// 12-bit readout.
    Fast,
}

impl From<ReadoutSpeed> for AdcSpeed {
    fn from(value: ReadoutSpeed) -> Self {
        match value {
            ReadoutSpeed::Normal => AdcSpeed::Normal,
            ReadoutSpeed::Fast => AdcSpeed::Fast,
        }
    }
}

impl FromStr for ReadoutSpeed {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(ReadoutSpeed::Normal),
            "fast" => Ok(ReadoutSpeed::Fast),
            _ => Err(Error::InvalidMode(format!(
                "Readout speed value not recognised: {:?}",
                s
            ))),
        }
    }
}

impl Display for ReadoutSpeed {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ReadoutSpeed::Normal => write!(f, "normal"),
            ReadoutSpeed::Fast => write!(f, "fast"),
        }
    }
}
