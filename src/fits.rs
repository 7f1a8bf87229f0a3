//! FITS output for captured frames.

use std::path::Path;

use fitsio::{
    hdu::HduInfo,
    images::{ImageDescription, ImageType},
    FitsFile,
};
use log::debug;
use ndarray::{ArrayD, IxDyn};

use crate::{CardValue, Error, Frame, Result};

/// Write `frame` as the primary HDU of a new FITS file.
///
/// Pixels are stored as unsigned 16-bit integers. NAXIS1 is the column count
/// and NAXIS2 the row count of a reshaped frame. One header card follows per
/// metadata entry, in capture order.
///
/// # Errors
///  - [`Error::Fits`] - The file exists and `overwrite` is not set, or cfitsio failed.
pub fn write_frame<P: AsRef<Path>>(frame: &Frame, path: P, overwrite: bool) -> Result<()> {
    let path = path.as_ref();
    // row-major shape, fitsio reverses it into NAXISn order
    let desc = ImageDescription {
        data_type: ImageType::UnsignedShort,
        dimensions: frame.data.shape(),
    };

    let mut file = FitsFile::create(path).with_custom_primary(&desc);
    if overwrite {
        file = file.overwrite();
    }
    let mut fptr = file.open()?;
    let hdu = fptr.primary_hdu()?;

    let pixels: Vec<u16> = frame.data.iter().copied().collect();
    hdu.write_image(&mut fptr, &pixels)?;

    for card in frame.metadata.iter() {
        match &card.value {
            CardValue::Int(v) => hdu.write_key(&mut fptr, card.key, (*v, card.comment))?,
            CardValue::Float(v) => hdu.write_key(&mut fptr, card.key, (*v, card.comment))?,
            CardValue::Text(v) => hdu.write_key(&mut fptr, card.key, (v.clone(), card.comment))?,
        }
    }
    debug!("Wrote {} ({:?})", path.display(), frame.data.shape());
    Ok(())
}

/// Read the primary image of a FITS file written by [`write_frame`].
///
/// The array has the same shape as the frame that was written.
pub fn read_image<P: AsRef<Path>>(path: P) -> Result<ArrayD<u16>> {
    let mut fptr = FitsFile::open(path.as_ref())?;
    let hdu = fptr.primary_hdu()?;
    let shape = match &hdu.info {
        HduInfo::ImageInfo { shape, .. } => shape.clone(),
        _ => {
            return Err(Error::InvalidValue(format!(
                "Primary HDU of {} is not an image",
                path.as_ref().display()
            )))
        }
    };
    let pixels: Vec<u16> = hdu.read_image(&mut fptr)?;
    let len = pixels.len();
    ArrayD::from_shape_vec(IxDyn(&shape), pixels).map_err(|_| Error::InvalidShape {
        len,
        rows: shape.first().copied().unwrap_or(0),
        cols: shape.last().copied().unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fitsio::headers::HeaderValue;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        sim::{SimConfig, SimulatedDriver},
        CameraUnitApogee,
    };

    fn capture(reshape: bool) -> Frame {
        let mut drv = SimulatedDriver::new(vec![SimConfig::default()]);
        let mut cam = CameraUnitApogee::open(&mut drv, 0, true).unwrap();
        cam.capture(Duration::from_secs(2), reshape, false).unwrap()
    }

    /// Every metadata card must come back with its value and comment.
    fn assert_header_matches(path: &Path, frame: &Frame) {
        let mut fptr = FitsFile::open(path).unwrap();
        let hdu = fptr.primary_hdu().unwrap();
        assert_eq!(frame.metadata.len(), 12);
        for card in frame.metadata.iter() {
            let comment = match &card.value {
                CardValue::Int(v) => {
                    let hv = hdu.read_key::<HeaderValue<i64>>(&mut fptr, card.key).unwrap();
                    assert_eq!(hv.value, *v, "{}", card.key);
                    hv.comment
                }
                CardValue::Float(v) => {
                    let hv = hdu.read_key::<HeaderValue<f64>>(&mut fptr, card.key).unwrap();
                    assert!(
                        (hv.value - v).abs() <= 1e-9 * v.abs().max(1.0),
                        "{}: {} != {}",
                        card.key,
                        hv.value,
                        v
                    );
                    hv.comment
                }
                CardValue::Text(v) => {
                    let hv = hdu
                        .read_key::<HeaderValue<String>>(&mut fptr, card.key)
                        .unwrap();
                    assert_eq!(&hv.value, v, "{}", card.key);
                    hv.comment
                }
            };
            assert_eq!(comment.as_deref(), Some(card.comment), "{}", card.key);
        }
    }

    #[test]
    fn frame_written_with_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frame.fits");
        let frame = capture(true);
        assert_eq!(frame.data.shape(), &[12, 16]);
        write_frame(&frame, &path, false).unwrap();

        let data = read_image(&path).unwrap();
        assert_eq!(data, frame.data);

        let mut fptr = FitsFile::open(&path).unwrap();
        let hdu = fptr.primary_hdu().unwrap();
        assert_eq!(hdu.read_key::<i64>(&mut fptr, "NAXIS1").unwrap(), 16);
        assert_eq!(hdu.read_key::<i64>(&mut fptr, "NAXIS2").unwrap(), 12);
        assert_header_matches(&path, &frame);
    }

    #[test]
    fn flat_frame_and_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flat.fits");
        let frame = capture(false);
        write_frame(&frame, &path, false).unwrap();
        assert!(matches!(
            write_frame(&frame, &path, false),
            Err(Error::Fits(_))
        ));
        write_frame(&frame, &path, true).unwrap();
        let data = read_image(&path).unwrap();
        assert_eq!(data.shape(), &[16 * 12]);
        assert_eq!(data, frame.data);
        assert_header_matches(&path, &frame);
    }
}
