use std::{
    ffi::{c_char, CStr, CString},
    ptr,
};

use log::{debug, warn};

use crate::{
    apogee_ffi::*, AdcResolution, AdcSpeed, ApogeeDevice, ApogeeDriver, CoolerStatus,
    DeviceDescriptor, Error, FanMode, ImagingStatus, Result,
};

const DISCOVERY_BUF_LEN: usize = 64 * 1024;
const ERROR_BUF_LEN: usize = 512;

fn last_error() -> String {
    let mut buf = vec![0 as c_char; ERROR_BUF_LEN];
    unsafe {
        apg_last_error(buf.as_mut_ptr(), buf.len());
        CStr::from_ptr(buf.as_ptr()).to_string_lossy().into_owned()
    }
}

macro_rules! APGCALL {
    ($func:ident($($arg:expr),*)) => {
        {
            #[allow(clippy::macro_metavars_in_unsafe)]
            let res = unsafe { $func($($arg),*) };
            if res != APG_OK as _ {
                let err = Error::sdk(stringify!($func), last_error());
                warn!("{}", err);
                return Err(err);
            }
        }
    };
}

/// Value of `key=` in a discovery string.
fn discovery_field<'a>(desc: &'a str, key: &str) -> Option<&'a str> {
    desc.trim_start_matches("<d>")
        .trim_end_matches("</d>")
        .split(',')
        .find_map(|kv| kv.strip_prefix(key)?.strip_prefix('='))
}

fn parse_discovery(found: &str) -> Vec<DeviceDescriptor> {
    found
        .lines()
        .filter(|l| !l.trim().is_empty())
        .enumerate()
        .map(|(index, line)| DeviceDescriptor {
            index,
            model: discovery_field(line, "model")
                .or_else(|| discovery_field(line, "id").map(|_| "Alta"))
                .unwrap_or("Apogee")
                .to_owned(),
            discovery: line.trim().to_owned(),
        })
        .collect()
}

/// USB driver backed by libapogee.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibApogeeDriver;

impl ApogeeDriver for LibApogeeDriver {
    fn list_devices(&mut self) -> Result<Vec<DeviceDescriptor>> {
        let mut buf = vec![0 as c_char; DISCOVERY_BUF_LEN];
        let mut count = 0usize;
        APGCALL!(apg_find_usb_devices(buf.as_mut_ptr(), buf.len(), &mut count));
        let found = unsafe { CStr::from_ptr(buf.as_ptr()) }.to_string_lossy();
        let devs = parse_discovery(&found);
        if devs.len() != count {
            warn!(
                "Discovery reported {} camera(s), parsed {}",
                count,
                devs.len()
            );
        }
        Ok(devs)
    }

    fn connect_device(&mut self, desc: &DeviceDescriptor) -> Result<Box<dyn ApogeeDevice>> {
        Ok(Box::new(ApogeeHandle::open(desc)?))
    }
}

/// Open libapogee camera. Closed on drop if still open.
#[derive(Debug)]
pub struct ApogeeHandle {
    cam: *mut apg_cam,
}

impl Drop for ApogeeHandle {
    fn drop(&mut self) {
        if self.cam.is_null() {
            return;
        }
        if let Err(e) = self.close() {
            warn!("Failed to close camera: {}", e);
        }
    }
}

impl ApogeeHandle {
    fn open(desc: &DeviceDescriptor) -> Result<Self> {
        let discovery = CString::new(desc.discovery.as_str())
            .map_err(|e| Error::InvalidValue(format!("Discovery string: {}", e)))?;
        let mut cam: *mut apg_cam = ptr::null_mut();
        APGCALL!(apg_connect(discovery.as_ptr(), &mut cam));
        debug!("Opened {}", desc);
        Ok(Self { cam })
    }

    fn cam(&self, call: &'static str) -> Result<*mut apg_cam> {
        if self.cam.is_null() {
            Err(Error::sdk(call, "camera connection is closed"))
        } else {
            Ok(self.cam)
        }
    }

    fn get_f64(
        &self,
        call: &'static str,
        f: unsafe extern "C" fn(*mut apg_cam, *mut f64) -> i32,
    ) -> Result<f64> {
        let cam = self.cam(call)?;
        let mut val = 0.0;
        if unsafe { f(cam, &mut val) } != APG_OK as i32 {
            let err = Error::sdk(call, last_error());
            warn!("{}", err);
            return Err(err);
        }
        Ok(val)
    }

    fn get_i32(
        &self,
        call: &'static str,
        f: unsafe extern "C" fn(*mut apg_cam, *mut i32) -> i32,
    ) -> Result<i32> {
        let cam = self.cam(call)?;
        let mut val = 0;
        if unsafe { f(cam, &mut val) } != APG_OK as i32 {
            let err = Error::sdk(call, last_error());
            warn!("{}", err);
            return Err(err);
        }
        Ok(val)
    }

    fn get_u16(
        &self,
        call: &'static str,
        f: unsafe extern "C" fn(*mut apg_cam, *mut u16) -> i32,
    ) -> Result<u16> {
        let cam = self.cam(call)?;
        let mut val = 0;
        if unsafe { f(cam, &mut val) } != APG_OK as i32 {
            let err = Error::sdk(call, last_error());
            warn!("{}", err);
            return Err(err);
        }
        Ok(val)
    }
}

impl ApogeeDevice for ApogeeHandle {
    fn close(&mut self) -> Result<()> {
        let cam = self.cam("apg_close")?;
        self.cam = ptr::null_mut();
        APGCALL!(apg_close(cam));
        Ok(())
    }

    fn start_exposure(&mut self, seconds: f64, light: bool) -> Result<()> {
        let cam = self.cam("apg_start_exposure")?;
        APGCALL!(apg_start_exposure(cam, seconds, light as i32));
        Ok(())
    }

    fn stop_exposure(&mut self) -> Result<()> {
        let cam = self.cam("apg_stop_exposure")?;
        APGCALL!(apg_stop_exposure(cam, 0));
        Ok(())
    }

    fn imaging_status(&mut self) -> Result<ImagingStatus> {
        self.get_i32("apg_get_imaging_status", apg_get_imaging_status)?
            .try_into()
    }

    fn image(&mut self) -> Result<Vec<u16>> {
        let len = self.max_img_cols()? * self.max_img_rows()?;
        let cam = self.cam("apg_get_image")?;
        let mut data = vec![0u16; len];
        let mut written = 0usize;
        APGCALL!(apg_get_image(cam, data.as_mut_ptr(), data.len(), &mut written));
        data.truncate(written);
        Ok(data)
    }

    fn max_img_cols(&mut self) -> Result<usize> {
        Ok(self.get_u16("apg_get_max_img_cols", apg_get_max_img_cols)? as usize)
    }

    fn max_img_rows(&mut self) -> Result<usize> {
        Ok(self.get_u16("apg_get_max_img_rows", apg_get_max_img_rows)? as usize)
    }

    fn min_exposure_time(&mut self) -> Result<f64> {
        self.get_f64("apg_get_min_exposure_time", apg_get_min_exposure_time)
    }

    fn max_exposure_time(&mut self) -> Result<f64> {
        self.get_f64("apg_get_max_exposure_time", apg_get_max_exposure_time)
    }

    fn temp_ccd(&mut self) -> Result<f64> {
        self.get_f64("apg_get_temp_ccd", apg_get_temp_ccd)
    }

    fn temp_heatsink(&mut self) -> Result<f64> {
        self.get_f64("apg_get_temp_heatsink", apg_get_temp_heatsink)
    }

    fn cooler_setpoint(&mut self) -> Result<f64> {
        self.get_f64("apg_get_cooler_setpoint", apg_get_cooler_setpoint)
    }

    fn set_cooler_setpoint(&mut self, deg: f64) -> Result<()> {
        let cam = self.cam("apg_set_cooler_setpoint")?;
        APGCALL!(apg_set_cooler_setpoint(cam, deg));
        Ok(())
    }

    fn cooler_drive(&mut self) -> Result<f64> {
        self.get_f64("apg_get_cooler_drive", apg_get_cooler_drive)
    }

    fn cooler_status(&mut self) -> Result<CoolerStatus> {
        self.get_i32("apg_get_cooler_status", apg_get_cooler_status)?
            .try_into()
    }

    fn set_cooler(&mut self, on: bool) -> Result<()> {
        let cam = self.cam("apg_set_cooler")?;
        APGCALL!(apg_set_cooler(cam, on as i32));
        Ok(())
    }

    fn fan_mode(&mut self) -> Result<FanMode> {
        self.get_i32("apg_get_fan_mode", apg_get_fan_mode)?
            .try_into()
    }

    fn adc_resolution(&mut self) -> Result<AdcResolution> {
        self.get_i32("apg_get_ccd_adc_resolution", apg_get_ccd_adc_resolution)?
            .try_into()
    }

    fn adc_speed(&mut self) -> Result<AdcSpeed> {
        self.get_i32("apg_get_ccd_adc_speed", apg_get_ccd_adc_speed)?
            .try_into()
    }

    fn set_adc_speed(&mut self, speed: AdcSpeed) -> Result<()> {
        let cam = self.cam("apg_set_ccd_adc_speed")?;
        APGCALL!(apg_set_ccd_adc_speed(cam, speed as i32));
        Ok(())
    }

    fn adc_gain(&mut self, speed: AdcSpeed, channel: i32) -> Result<u16> {
        let cam = self.cam("apg_get_adc_gain")?;
        let mut gain = 0u16;
        APGCALL!(apg_get_adc_gain(cam, speed as i32, channel, &mut gain));
        Ok(gain)
    }

    fn set_adc_gain(&mut self, gain: u16, speed: AdcSpeed, channel: i32) -> Result<()> {
        let cam = self.cam("apg_set_adc_gain")?;
        APGCALL!(apg_set_adc_gain(cam, gain, speed as i32, channel));
        Ok(())
    }

    fn adc_offset(&mut self, speed: AdcSpeed, channel: i32) -> Result<u16> {
        let cam = self.cam("apg_get_adc_offset")?;
        let mut offset = 0u16;
        APGCALL!(apg_get_adc_offset(cam, speed as i32, channel, &mut offset));
        Ok(offset)
    }

    fn set_adc_offset(&mut self, offset: u16, speed: AdcSpeed, channel: i32) -> Result<()> {
        let cam = self.cam("apg_set_adc_offset")?;
        APGCALL!(apg_set_adc_offset(cam, offset, speed as i32, channel));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_strings() {
        let found = "<d>address=0,interface=usb,deviceType=camera,id=0x49,firmwareRev=0x21,model=AltaU-2000</d>\n\
                     <d>address=1,interface=usb,deviceType=camera,id=0x49,firmwareRev=0x21</d>\n";
        let devs = parse_discovery(found);
        assert_eq!(devs.len(), 2);
        assert_eq!(devs[0].model, "AltaU-2000");
        assert_eq!(devs[1].model, "Alta");
        assert_eq!(devs[1].index, 1);
        assert_eq!(discovery_field(&devs[1].discovery, "address"), Some("1"));
        assert_eq!(discovery_field(&devs[1].discovery, "firmwareRev"), Some("0x21"));
        assert_eq!(discovery_field(&devs[1].discovery, "serial"), None);
    }
}
