use std::time::Duration;

use thiserror::Error;

use crate::ImagingStatus;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the camera facade and its backends.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No Apogee USB camera was found during enumeration.
    #[error("No USB devices found")]
    NoCamerasAvailable,
    /// The requested camera index is beyond the enumerated devices.
    #[error("Camera index {index} is out of range, {count} device(s) found")]
    InvalidIndex {
        /// Requested index.
        index: usize,
        /// Number of enumerated devices.
        count: usize,
    },
    /// The operation requires a connected camera.
    #[error("No camera initialised")]
    CameraClosed,
    /// A numeric parameter is outside its valid range.
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    /// A named mode is not recognised.
    #[error("Invalid mode: {0}")]
    InvalidMode(String),
    /// The camera reported an error status while exposing.
    #[error("Capture failed. Error in camera status = {}", .0.code())]
    ExposureFailed(ImagingStatus),
    /// The image did not become ready before the deadline.
    #[error("Capture timed out after {0:?}")]
    TimedOut(Duration),
    /// Pixel count does not match the sensor geometry.
    #[error("Cannot reshape {len} pixels into {rows} x {cols}")]
    InvalidShape {
        /// Number of pixels read back.
        len: usize,
        /// Sensor rows.
        rows: usize,
        /// Sensor columns.
        cols: usize,
    },
    /// A vendor SDK call failed.
    #[error("Error calling {call}(): {message}")]
    Sdk {
        /// Name of the failing call.
        call: &'static str,
        /// Message reported by the SDK.
        message: String,
    },
    /// FITS file error.
    #[error("FITS error: {0}")]
    Fits(#[from] fitsio::errors::Error),
    /// I/O error.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an [`Error::Sdk`] for the named vendor call.
    pub fn sdk(call: &'static str, message: impl Into<String>) -> Self {
        Error::Sdk {
            call,
            message: message.into(),
        }
    }
}
