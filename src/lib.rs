#![cfg(not(windows))]
//! Control and capture for Apogee Alta USB CCD cameras.
//!
//! [`CameraUnitApogee`] connects to a camera through an [`ApogeeDriver`], sets
//! up the ADC and cooler, and captures [`Frame`]s carrying instrument metadata
//! that [`write_frame`] stores as FITS. The libapogee backend is built with the
//! `libapogee` feature; [`sim`] provides an in-memory camera.
mod apogee_types;
mod apogee_u2000;
mod device;
mod error;
mod fits;
pub mod sim;

#[cfg(feature = "libapogee")]
mod apogee_ffi;
#[cfg(feature = "libapogee")]
mod apogee_handle;

pub use apogee_types::{
    AdcResolution, AdcSpeed, CoolerStatus, FanMode, ImagingStatus, ReadoutSpeed,
};
pub use apogee_u2000::{
    CameraUnitApogee, CardValue, CoolerReport, Frame, FrameMetadata, HeaderCard, PollConfig,
    ADC_GAIN_MAX, ADC_OFFSET_MAX,
};
pub use device::{ApogeeDevice, ApogeeDriver, DeviceDescriptor};
pub use error::{Error, Result};
pub use fits::{read_image, write_frame};

#[cfg(feature = "libapogee")]
pub use apogee_handle::{ApogeeHandle, LibApogeeDriver};
