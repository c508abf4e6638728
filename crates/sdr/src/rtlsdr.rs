// Copyright 2025-2026 CEMAXECUTER LLC

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;

use crate::{nearest_gain, Gain, SdrError, Tuner};

/// rtlsdr_set_freq_correction returns this when the value is unchanged
const RTLSDR_PPM_UNCHANGED: c_int = -2;

type RtlsdrDev = c_void;

extern "C" {
    fn rtlsdr_get_device_count() -> u32;
    fn rtlsdr_get_device_name(index: u32) -> *const c_char;
    fn rtlsdr_open(dev: *mut *mut RtlsdrDev, index: u32) -> c_int;
    fn rtlsdr_close(dev: *mut RtlsdrDev) -> c_int;
    fn rtlsdr_set_sample_rate(dev: *mut RtlsdrDev, rate: u32) -> c_int;
    fn rtlsdr_set_center_freq(dev: *mut RtlsdrDev, freq: u32) -> c_int;
    fn rtlsdr_set_tuner_gain_mode(dev: *mut RtlsdrDev, manual: c_int) -> c_int;
    fn rtlsdr_get_tuner_gains(dev: *mut RtlsdrDev, gains: *mut c_int) -> c_int;
    fn rtlsdr_set_tuner_gain(dev: *mut RtlsdrDev, gain: c_int) -> c_int;
    fn rtlsdr_set_freq_correction(dev: *mut RtlsdrDev, ppm: c_int) -> c_int;
    fn rtlsdr_set_direct_sampling(dev: *mut RtlsdrDev, on: c_int) -> c_int;
    fn rtlsdr_set_offset_tuning(dev: *mut RtlsdrDev, on: c_int) -> c_int;
    fn rtlsdr_reset_buffer(dev: *mut RtlsdrDev) -> c_int;
    fn rtlsdr_read_sync(
        dev: *mut RtlsdrDev,
        buf: *mut c_void,
        len: c_int,
        n_read: *mut c_int,
    ) -> c_int;
}

fn check(code: c_int, call: &'static str) -> Result<(), SdrError> {
    if code < 0 {
        Err(SdrError::Driver { call, code })
    } else {
        Ok(())
    }
}

/// Open-time options that stay fixed for the whole run
#[derive(Debug, Clone, Copy, Default)]
pub struct RtlSdrOptions {
    /// 0 = off, 1 = I branch, 2 = Q branch
    pub direct_sampling: u8,
    pub offset_tuning: bool,
}

/// Information about a detected RTL-SDR dongle
#[derive(Debug, Clone)]
pub struct RtlSdrInfo {
    pub index: u32,
    pub name: String,
}

/// List all dongles librtlsdr can see.
pub fn list_devices() -> Vec<RtlSdrInfo> {
    unsafe {
        let count = rtlsdr_get_device_count();
        (0..count)
            .map(|index| RtlSdrInfo {
                index,
                name: device_name(index),
            })
            .collect()
    }
}

unsafe fn device_name(index: u32) -> String {
    let name = rtlsdr_get_device_name(index);
    if name.is_null() {
        String::new()
    } else {
        CStr::from_ptr(name).to_string_lossy().into_owned()
    }
}

/// Opened RTL2832U handle. Closed on drop.
pub struct RtlSdr {
    dev: *mut RtlsdrDev,
    name: String,
    /// Supported tuner gains in tenths of a dB
    gains: Vec<i32>,
}

impl RtlSdr {
    /// Find and open the dongle at `index`.
    pub fn open(index: u32, options: &RtlSdrOptions) -> Result<Self, SdrError> {
        let count = unsafe { rtlsdr_get_device_count() };
        if count == 0 {
            return Err(SdrError::NotFound);
        }
        if index >= count {
            return Err(SdrError::NoSuchDevice { index, count });
        }

        let mut dev: *mut RtlsdrDev = ptr::null_mut();
        let r = unsafe { rtlsdr_open(&mut dev, index) };
        if r < 0 || dev.is_null() {
            return Err(SdrError::Open { index, code: r });
        }

        // From here on Drop closes the handle if a later step fails
        let mut sdr = Self {
            dev,
            name: unsafe { device_name(index) },
            gains: Vec::new(),
        };
        sdr.gains = sdr.query_gains();
        log::info!("using device #{}: {}", index, sdr.name);

        if options.direct_sampling != 0 {
            let mode = c_int::from(options.direct_sampling);
            check(
                unsafe { rtlsdr_set_direct_sampling(sdr.dev, mode) },
                "rtlsdr_set_direct_sampling",
            )?;
            log::info!("direct sampling mode {} enabled", options.direct_sampling);
        }

        if options.offset_tuning {
            check(
                unsafe { rtlsdr_set_offset_tuning(sdr.dev, 1) },
                "rtlsdr_set_offset_tuning",
            )?;
            log::info!("offset tuning enabled");
        }

        Ok(sdr)
    }

    fn query_gains(&self) -> Vec<i32> {
        unsafe {
            let count = rtlsdr_get_tuner_gains(self.dev, ptr::null_mut());
            if count <= 0 {
                return Vec::new();
            }
            let mut gains = vec![0 as c_int; count as usize];
            let count = rtlsdr_get_tuner_gains(self.dev, gains.as_mut_ptr());
            gains.truncate(count.max(0) as usize);
            gains
        }
    }

    pub fn gains(&self) -> &[i32] {
        &self.gains
    }
}

impl Tuner for RtlSdr {
    fn set_sample_rate(&mut self, rate: u32) -> Result<(), SdrError> {
        check(
            unsafe { rtlsdr_set_sample_rate(self.dev, rate) },
            "rtlsdr_set_sample_rate",
        )
    }

    fn set_center_freq(&mut self, freq: u32) -> Result<(), SdrError> {
        check(
            unsafe { rtlsdr_set_center_freq(self.dev, freq) },
            "rtlsdr_set_center_freq",
        )
    }

    fn set_gain(&mut self, gain: Gain) -> Result<(), SdrError> {
        match gain {
            Gain::Auto => check(
                unsafe { rtlsdr_set_tuner_gain_mode(self.dev, 0) },
                "rtlsdr_set_tuner_gain_mode",
            ),
            Gain::Manual(target) => {
                let gain = nearest_gain(&self.gains, target);
                check(
                    unsafe { rtlsdr_set_tuner_gain_mode(self.dev, 1) },
                    "rtlsdr_set_tuner_gain_mode",
                )?;
                check(
                    unsafe { rtlsdr_set_tuner_gain(self.dev, gain) },
                    "rtlsdr_set_tuner_gain",
                )?;
                log::debug!(
                    "tuner gain {:.1} dB (requested {:.1})",
                    gain as f32 / 10.0,
                    target as f32 / 10.0
                );
                Ok(())
            }
        }
    }

    fn set_freq_correction(&mut self, ppm: i32) -> Result<(), SdrError> {
        if ppm == 0 {
            return Ok(());
        }
        let r = unsafe { rtlsdr_set_freq_correction(self.dev, ppm) };
        if r == RTLSDR_PPM_UNCHANGED {
            return Ok(());
        }
        check(r, "rtlsdr_set_freq_correction")
    }

    fn reset_buffer(&mut self) -> Result<(), SdrError> {
        check(
            unsafe { rtlsdr_reset_buffer(self.dev) },
            "rtlsdr_reset_buffer",
        )
    }

    fn read_sync(&mut self, buf: &mut [u8]) -> Result<usize, SdrError> {
        let len = c_int::try_from(buf.len()).map_err(|_| SdrError::Driver {
            call: "rtlsdr_read_sync",
            code: -1,
        })?;
        let mut n_read: c_int = 0;
        let ptr = buf.as_mut_ptr() as *mut c_void;
        check(
            unsafe { rtlsdr_read_sync(self.dev, ptr, len, &mut n_read) },
            "rtlsdr_read_sync",
        )?;
        Ok(n_read.max(0) as usize)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for RtlSdr {
    fn drop(&mut self) {
        unsafe {
            rtlsdr_close(self.dev);
        }
        log::info!("closed {}", self.name);
    }
}
