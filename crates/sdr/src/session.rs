// Copyright 2025-2026 CEMAXECUTER LLC

//! Device session: the single owner of an opened tuner for one run.
//!
//! The session holds the tuning table and only lets a band be sampled while
//! the tuner is programmed for that same band, so the index used to tune, the
//! index used to read and the index used to label the reading cannot drift
//! apart.

use std::thread;
use std::time::Duration;

use crate::{BandSpec, SdrError, Tuner};

/// Bytes read and thrown away after every retune
pub const BUFFER_DUMP: usize = 1 << 12;

/// Time allowed for the tuner PLL to settle after a frequency change
pub const SETTLE_TIME: Duration = Duration::from_millis(5);

pub struct DeviceSession<T: Tuner> {
    tuner: T,
    table: Option<Vec<BandSpec>>,
    tuned: Option<usize>,
    ppm: i32,
    settle: Duration,
}

impl<T: Tuner> DeviceSession<T> {
    /// Take ownership of an opened tuner.
    pub fn open(tuner: T) -> Self {
        log::info!("session opened on {}", tuner.name());
        Self {
            tuner,
            table: None,
            tuned: None,
            ppm: 0,
            settle: SETTLE_TIME,
        }
    }

    pub fn with_ppm(mut self, ppm: i32) -> Self {
        self.ppm = ppm;
        self
    }

    pub fn with_settle_time(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Install the tuning table. Allowed once per session.
    pub fn configure(&mut self, table: Vec<BandSpec>) -> Result<(), SdrError> {
        if self.table.is_some() {
            return Err(SdrError::AlreadyConfigured);
        }
        log::info!("tuning table configured with {} bands", table.len());
        self.table = Some(table);
        Ok(())
    }

    /// The configured tuning table (empty before `configure`).
    pub fn table(&self) -> &[BandSpec] {
        self.table.as_deref().unwrap_or(&[])
    }

    pub fn band(&self, index: usize) -> Result<&BandSpec, SdrError> {
        let table = self.table.as_ref().ok_or(SdrError::NotConfigured)?;
        table.get(index).ok_or(SdrError::BandIndex {
            index,
            len: table.len(),
        })
    }

    /// Index of the band the tuner is currently programmed for.
    pub fn tuned(&self) -> Option<usize> {
        self.tuned
    }

    /// Program the tuner for the band at `index` and flush the stale samples
    /// captured while it was settling.
    pub fn tune(&mut self, index: usize) -> Result<(), SdrError> {
        let band = *self.band(index)?;
        self.tuned = None;

        log::debug!(
            "band {}: {} Hz, {} S/s, 2^{} bytes, gain {:?}",
            index,
            band.frequency,
            band.rate,
            band.bandwidth_exp,
            band.gain()
        );

        self.program(&band).map_err(|e| SdrError::Tune {
            index,
            source: Box::new(e),
        })?;

        thread::sleep(self.settle);

        let mut dump = vec![0u8; BUFFER_DUMP];
        let got = self.tuner.read_sync(&mut dump).map_err(|e| SdrError::Tune {
            index,
            source: Box::new(e),
        })?;
        if got != BUFFER_DUMP {
            return Err(SdrError::Retune {
                index,
                expected: BUFFER_DUMP,
                got,
            });
        }

        self.tuned = Some(index);
        Ok(())
    }

    fn program(&mut self, band: &BandSpec) -> Result<(), SdrError> {
        self.tuner.set_gain(band.gain())?;
        self.tuner.set_freq_correction(self.ppm)?;
        self.tuner.reset_buffer()?;
        self.tuner.set_sample_rate(band.rate)?;
        self.tuner.set_center_freq(band.frequency)
    }

    /// Capture `2^bandwidth_exp` bytes for the tuned band and hand them to
    /// `reduce`. The capture buffer does not outlive this call.
    pub fn sample<R, F>(&mut self, index: usize, reduce: F) -> Result<R, SdrError>
    where
        F: FnOnce(&[u8]) -> R,
    {
        let expected = self.band(index)?.buf_len();
        if self.tuned != Some(index) {
            return Err(SdrError::NotTuned {
                index,
                tuned: self.tuned,
            });
        }

        let mut buf = vec![0u8; expected];
        let got = self.tuner.read_sync(&mut buf)?;
        if got != expected {
            return Err(SdrError::ShortRead {
                index,
                expected,
                got,
            });
        }

        Ok(reduce(&buf))
    }

    /// Release the tuner. Dropping the session has the same effect.
    pub fn close(self) {
        log::info!("closing {}", self.tuner.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Gain, AUTO_GAIN};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Set when the owning tuner is dropped
    #[derive(Default)]
    struct Released(Rc<Cell<bool>>);

    impl Drop for Released {
        fn drop(&mut self) {
            self.0.set(true);
        }
    }

    /// Scripted tuner that records every driver call.
    #[derive(Default)]
    struct MockTuner {
        calls: Rc<RefCell<Vec<String>>>,
        released: Released,
        fill: u8,
        /// Bytes missing from every sample read
        short_by: usize,
        /// Bytes missing from every retune flush
        dump_short_by: usize,
        fail_freq: bool,
    }

    impl Tuner for MockTuner {
        fn set_sample_rate(&mut self, rate: u32) -> Result<(), SdrError> {
            self.calls.borrow_mut().push(format!("rate {}", rate));
            Ok(())
        }

        fn set_center_freq(&mut self, freq: u32) -> Result<(), SdrError> {
            if self.fail_freq {
                return Err(SdrError::Driver {
                    call: "set_center_freq",
                    code: -1,
                });
            }
            self.calls.borrow_mut().push(format!("freq {}", freq));
            Ok(())
        }

        fn set_gain(&mut self, gain: Gain) -> Result<(), SdrError> {
            self.calls.borrow_mut().push(format!("gain {:?}", gain));
            Ok(())
        }

        fn set_freq_correction(&mut self, ppm: i32) -> Result<(), SdrError> {
            self.calls.borrow_mut().push(format!("ppm {}", ppm));
            Ok(())
        }

        fn reset_buffer(&mut self) -> Result<(), SdrError> {
            self.calls.borrow_mut().push("reset".to_string());
            Ok(())
        }

        fn read_sync(&mut self, buf: &mut [u8]) -> Result<usize, SdrError> {
            self.calls.borrow_mut().push(format!("read {}", buf.len()));
            buf.fill(self.fill);
            let short = if buf.len() == BUFFER_DUMP {
                self.dump_short_by
            } else {
                self.short_by
            };
            Ok(buf.len().saturating_sub(short))
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn band(frequency: u32, rate: u32, bandwidth_exp: u32, gain: i32) -> BandSpec {
        BandSpec {
            frequency,
            rate,
            bandwidth_exp,
            gain,
        }
    }

    fn session(tuner: MockTuner) -> DeviceSession<MockTuner> {
        DeviceSession::open(tuner).with_settle_time(Duration::ZERO)
    }

    #[test]
    fn test_configure_once() {
        let mut s = session(MockTuner::default());
        assert!(s.table().is_empty());
        s.configure(vec![band(100_000_000, 20, 4, 1)]).unwrap();
        assert_eq!(s.table().len(), 1);
        assert!(matches!(
            s.configure(vec![]),
            Err(SdrError::AlreadyConfigured)
        ));
    }

    #[test]
    fn test_tune_requires_table() {
        let mut s = session(MockTuner::default());
        assert!(matches!(s.tune(0), Err(SdrError::NotConfigured)));
    }

    #[test]
    fn test_tune_out_of_range() {
        let mut s = session(MockTuner::default());
        s.configure(vec![band(100_000_000, 20, 4, 1)]).unwrap();
        match s.tune(1) {
            Err(SdrError::BandIndex { index, len }) => {
                assert_eq!(index, 1);
                assert_eq!(len, 1);
            }
            other => panic!("expected BandIndex, got {:?}", other.err()),
        }
        assert_eq!(s.tuned(), None);
    }

    #[test]
    fn test_tune_programs_band_in_order() {
        let tuner = MockTuner::default();
        let calls = tuner.calls.clone();
        let mut s = session(tuner).with_ppm(3);
        s.configure(vec![
            band(100_000_000, 20, 4, 1),
            band(433_920_000, 2_048_000, 10, AUTO_GAIN),
        ])
        .unwrap();

        s.tune(1).unwrap();
        assert_eq!(s.tuned(), Some(1));
        assert_eq!(
            *calls.borrow(),
            vec![
                "gain Auto".to_string(),
                "ppm 3".to_string(),
                "reset".to_string(),
                "rate 2048000".to_string(),
                "freq 433920000".to_string(),
                format!("read {}", BUFFER_DUMP),
            ]
        );
    }

    #[test]
    fn test_sample_uses_band_buffer_size() {
        let mut s = session(MockTuner {
            fill: 200,
            ..Default::default()
        });
        s.configure(vec![band(100_000_000, 20, 4, 1), band(1, 1, 0, 0)])
            .unwrap();

        s.tune(0).unwrap();
        let (len, first) = s.sample(0, |buf| (buf.len(), buf[0])).unwrap();
        assert_eq!(len, 16);
        assert_eq!(first, 200);

        // exponent 0 is a single byte
        s.tune(1).unwrap();
        assert_eq!(s.sample(1, |buf| buf.len()).unwrap(), 1);
    }

    #[test]
    fn test_sample_rejects_other_band() {
        let mut s = session(MockTuner::default());
        s.configure(vec![band(1, 1, 4, 0), band(2, 1, 4, 0)]).unwrap();

        assert!(matches!(
            s.sample(0, |buf| buf.len()),
            Err(SdrError::NotTuned { index: 0, tuned: None })
        ));

        s.tune(0).unwrap();
        assert!(matches!(
            s.sample(1, |buf| buf.len()),
            Err(SdrError::NotTuned {
                index: 1,
                tuned: Some(0)
            })
        ));
    }

    #[test]
    fn test_short_read_is_error() {
        let mut s = session(MockTuner {
            short_by: 1,
            ..Default::default()
        });
        s.configure(vec![band(1, 1, 4, 0)]).unwrap();
        s.tune(0).unwrap();

        match s.sample(0, |buf| buf.len()) {
            Err(SdrError::ShortRead {
                index,
                expected,
                got,
            }) => {
                assert_eq!(index, 0);
                assert_eq!(expected, 16);
                assert_eq!(got, 15);
            }
            other => panic!("expected ShortRead, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_retune_is_error() {
        let mut s = session(MockTuner {
            dump_short_by: 512,
            ..Default::default()
        });
        s.configure(vec![band(1, 1, 4, 0)]).unwrap();

        assert!(matches!(
            s.tune(0),
            Err(SdrError::Retune {
                index: 0,
                got: 3584,
                ..
            })
        ));
        assert_eq!(s.tuned(), None);
    }

    #[test]
    fn test_driver_failure_is_tune_error() {
        let mut s = session(MockTuner {
            fail_freq: true,
            ..Default::default()
        });
        s.configure(vec![band(1, 1, 4, 0)]).unwrap();

        match s.tune(0) {
            Err(SdrError::Tune { index, source }) => {
                assert_eq!(index, 0);
                assert!(matches!(*source, SdrError::Driver { .. }));
            }
            other => panic!("expected Tune, got {:?}", other),
        }
    }

    #[test]
    fn test_tuner_released_on_close_and_on_error() {
        let tuner = MockTuner::default();
        let released = tuner.released.0.clone();
        let s = session(tuner);
        s.close();
        assert!(released.get());

        let tuner = MockTuner {
            short_by: 4,
            ..Default::default()
        };
        let released = tuner.released.0.clone();
        let run = || -> Result<usize, SdrError> {
            let mut s = session(tuner);
            s.configure(vec![band(1, 1, 4, 0)])?;
            s.tune(0)?;
            s.sample(0, |buf| buf.len())
        };
        assert!(run().is_err());
        assert!(released.get());
    }
}
