// Copyright 2025-2026 CEMAXECUTER LLC

pub mod csv;
pub mod store;

use ps_dsp::Power;
use ps_sdr::BandSpec;

pub use store::{PowerStore, StoreError, StoredRow};

/// Local wall-clock format used in the `Time` column
pub const TIME_FORMAT: &str = "%d %b %Y %H:%M:%S";

/// Current local time in [`TIME_FORMAT`].
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIME_FORMAT).to_string()
}

/// One band's measurement from one sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerReading {
    pub time: String,
    pub frequency: i64,
    /// Written to the `Bandwidth` column. Holds the band's sample rate, not
    /// its bandwidth exponent, to stay compatible with existing `Data` tables.
    pub bandwidth: i64,
    /// RMS power in dBFS
    pub power: f64,
    pub bandwidth_exp: u32,
    /// RMS power with DC removed; reported, never stored
    pub rms_dc: f64,
}

impl PowerReading {
    pub fn new(time: String, band: &BandSpec, power: &Power) -> Self {
        Self {
            time,
            frequency: i64::from(band.frequency),
            bandwidth: i64::from(band.rate),
            power: power.rms_db,
            bandwidth_exp: band.bandwidth_exp,
            rms_dc: power.rms_dc_db,
        }
    }
}
