use std::fmt;

/// Frequency span and timing of one capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandGeometry {
    pub low_hz: f64,
    pub high_hz: f64,
    /// Width of one FFT bin if the capture were transformed
    pub bin_hz: f64,
    /// Wall-clock length of the capture
    pub duration_ms: f64,
}

impl BandGeometry {
    /// `buf_len` counts raw bytes, i.e. two per complex sample.
    pub fn new(freq: u32, rate: u32, buf_len: usize) -> Self {
        let freq = f64::from(freq);
        let rate = f64::from(rate);
        let half_span = rate / 2.0;
        Self {
            low_hz: freq - half_span,
            high_hz: freq + half_span,
            bin_hz: rate / buf_len as f64,
            duration_ms: 1000.0 * 0.5 * buf_len as f64 / rate,
        }
    }
}

impl fmt::Display for BandGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}-{:.2} MHz, bin {:.2} kHz, {:.2} ms",
            self.low_hz / 1e6,
            self.high_hz / 1e6,
            self.bin_hz / 1e3,
            self.duration_ms
        )
    }
}
