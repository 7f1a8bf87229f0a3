//! Bias/rate estimate and the exposure-pair sequence used for gain calibration.

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use anyhow::{Context, Result};
use apogee_camera::{write_frame, CameraUnitApogee};
use chrono::Local;
use ndarray::ArrayD;

/// Short exposures, doubling from 2 ms.
pub const SHORT_EXPOSURES: [f64; 10] = [
    0.002, 0.004, 0.008, 0.016, 0.032, 0.064, 0.128, 0.256, 0.512, 1.024,
];
/// Medium exposures in seconds.
pub const MEDIUM_EXPOSURES: [f64; 9] = [2.0, 4.0, 6.0, 8.0, 10.0, 20.0, 30.0, 40.0, 50.0];
/// Long exposures in seconds.
pub const LONG_EXPOSURES: [f64; 5] = [55.0, 58.0, 61.0, 64.0, 67.0];
/// Frames taken at each exposure.
pub const FRAMES_PER_EXPOSURE: usize = 2;

/// Every exposure of the sequence, in capture order.
pub fn exposure_ladder() -> Vec<f64> {
    SHORT_EXPOSURES
        .iter()
        .chain(MEDIUM_EXPOSURES.iter())
        .chain(LONG_EXPOSURES.iter())
        .copied()
        .collect()
}

/// `f_<exposure>_<index>.fits`, with the exposure printed in its shortest form.
pub fn pair_file_name(exposure: f64, index: usize) -> String {
    format!("f_{}_{}.fits", exposure, index)
}

/// Percentile with linear interpolation between the closest ranks.
pub fn percentile(data: &ArrayD<u16>, q: f64) -> Option<f64> {
    if data.is_empty() || !(0.0..=100.0).contains(&q) {
        return None;
    }
    let mut sorted: Vec<u16> = data.iter().copied().collect();
    sorted.sort_unstable();
    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] as f64 + (sorted[hi] as f64 - sorted[lo] as f64) * frac)
}

pub fn mean(data: &ArrayD<u16>) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().map(|&v| v as f64).sum::<f64>() / data.len() as f64)
}

/// Signal rate derived from a bias frame and a one second frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateEstimate {
    /// 99.5th percentile of the zero-length frame.
    pub bias: f64,
    /// Mean of the one second frame.
    pub one_second: f64,
    /// ADC resolution in bits.
    pub adc_bits: u32,
}

impl RateEstimate {
    pub fn rate(&self) -> f64 {
        self.one_second - self.bias
    }

    /// Expected ADUs after `exposure` seconds.
    pub fn adu_at(&self, exposure: f64) -> f64 {
        self.rate() * exposure
    }

    /// Digitisation levels available at this ADC resolution.
    pub fn full_scale(&self) -> f64 {
        2f64.powi(self.adc_bits as i32)
    }
}

/// Capture the bias and one second frames and derive the signal rate.
pub fn estimate_rate(cam: &mut CameraUnitApogee) -> Result<RateEstimate> {
    let bias_frame = cam
        .capture(Duration::ZERO, true, true)
        .context("Capturing bias frame")?;
    let bias = percentile(&bias_frame.data, 99.5).context("Empty bias frame")?;
    let frame = cam
        .capture(Duration::from_secs(1), true, false)
        .context("Capturing one second frame")?;
    let one_second = mean(&frame.data).context("Empty one second frame")?;
    let adc_bits = frame
        .metadata
        .adc_bits()
        .context("Frame has no ADCBITS card")?;
    Ok(RateEstimate {
        bias,
        one_second,
        adc_bits,
    })
}

/// Capture [`FRAMES_PER_EXPOSURE`] frames at every exposure and write them to `outdir`.
///
/// `running` is checked before each exposure; clearing it ends the sequence
/// early. Returns the files written.
pub fn run_pairs(
    cam: &mut CameraUnitApogee,
    exposures: &[f64],
    outdir: &Path,
    overwrite: bool,
    running: &AtomicBool,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(outdir)
        .with_context(|| format!("Creating directory {}", outdir.display()))?;
    let mut written = Vec::new();
    for &exposure in exposures {
        let duration = Duration::try_from_secs_f64(exposure)
            .with_context(|| format!("Invalid exposure {}", exposure))?;
        for i in 0..FRAMES_PER_EXPOSURE {
            if !running.load(Ordering::SeqCst) {
                println!("Sequence interrupted after {} frame(s)", written.len());
                return Ok(written);
            }
            let frame = cam
                .capture(duration, true, false)
                .with_context(|| format!("Capturing {} s frame {}", exposure, i))?;
            let path = outdir.join(pair_file_name(exposure, i));
            write_frame(&frame, &path, overwrite)
                .with_context(|| format!("Writing {}", path.display()))?;
            println!(
                "[{}] Saved {}",
                Local::now().format("%H:%M:%S"),
                path.display()
            );
            written.push(path);
        }
    }
    Ok(written)
}
