// Copyright 2025-2026 CEMAXECUTER LLC

pub mod file;
pub mod session;

#[cfg(feature = "rtlsdr")]
pub mod rtlsdr;

use std::io;

use thiserror::Error;

pub use session::DeviceSession;

/// Largest accepted bandwidth exponent (capture of 2^30 bytes)
pub const MAX_BANDWIDTH_EXP: u32 = 30;

/// Gain value in the band list that selects automatic gain
pub const AUTO_GAIN: i32 = -100;

/// One entry of the tuning table, as read from the band list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandSpec {
    /// Centre frequency in Hz
    pub frequency: u32,
    /// Sample rate in S/s (the "step" column of the band list)
    pub rate: u32,
    /// Capture length is 2^bandwidth_exp bytes
    pub bandwidth_exp: u32,
    /// Tuner gain in tenths of a dB; [`AUTO_GAIN`] selects automatic gain
    pub gain: i32,
}

impl BandSpec {
    /// Number of raw bytes captured for this band.
    pub fn buf_len(&self) -> usize {
        1usize << self.bandwidth_exp
    }

    pub fn gain(&self) -> Gain {
        if self.gain == AUTO_GAIN {
            Gain::Auto
        } else {
            Gain::Manual(self.gain)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gain {
    Auto,
    /// Tenths of a dB
    Manual(i32),
}

/// Pick the supported gain closest to `target` (tenths of a dB).
/// Ties resolve to the earlier entry; an empty list yields 0.
pub fn nearest_gain(gains: &[i32], target: i32) -> i32 {
    gains
        .iter()
        .copied()
        .min_by_key(|&g| (i64::from(target) - i64::from(g)).abs())
        .unwrap_or(0)
}

#[derive(Debug, Error)]
pub enum SdrError {
    #[error("no supported devices found")]
    NotFound,

    #[error("device #{index} requested but only {count} present")]
    NoSuchDevice { index: u32, count: u32 },

    #[error("failed to open device #{index} ({code})")]
    Open { index: u32, code: i32 },

    #[error("built without rtlsdr support, use a replay file instead")]
    Unsupported,

    #[error("{call} failed ({code})")]
    Driver { call: &'static str, code: i32 },

    #[error("replay read error")]
    Replay(#[from] io::Error),

    #[error("tuning table not configured")]
    NotConfigured,

    #[error("tuning table already configured")]
    AlreadyConfigured,

    #[error("band index {index} out of range (table has {len} entries)")]
    BandIndex { index: usize, len: usize },

    #[error("failed to tune band {index}")]
    Tune {
        index: usize,
        #[source]
        source: Box<SdrError>,
    },

    #[error("bad retune on band {index}: flushed {got} of {expected} bytes")]
    Retune { index: usize, expected: usize, got: usize },

    #[error("band {index} sampled while tuned to {tuned:?}")]
    NotTuned { index: usize, tuned: Option<usize> },

    #[error("dropped samples on band {index}: read {got} of {expected} bytes")]
    ShortRead { index: usize, expected: usize, got: usize },
}

/// Driver-level control of a single opened tuner.
///
/// Implementations release the underlying device when dropped, so a tuner
/// held by a [`DeviceSession`] is closed on every exit path.
pub trait Tuner {
    fn set_sample_rate(&mut self, rate: u32) -> Result<(), SdrError>;

    fn set_center_freq(&mut self, freq: u32) -> Result<(), SdrError>;

    fn set_gain(&mut self, gain: Gain) -> Result<(), SdrError>;

    /// Frequency correction in parts per million
    fn set_freq_correction(&mut self, ppm: i32) -> Result<(), SdrError> {
        let _ = ppm;
        Ok(())
    }

    /// Discard anything buffered before the next read
    fn reset_buffer(&mut self) -> Result<(), SdrError>;

    /// Blocking read of interleaved unsigned 8-bit I/Q into `buf`.
    /// Returns the number of bytes actually read.
    fn read_sync(&mut self, buf: &mut [u8]) -> Result<usize, SdrError>;

    /// Human-readable device name for logs
    fn name(&self) -> &str;
}
