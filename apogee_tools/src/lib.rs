//! Shared pieces of the Apogee command line tools.
pub mod calibration;
pub mod cli;
pub mod config;
