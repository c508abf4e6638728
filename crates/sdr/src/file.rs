// Copyright 2025-2026 CEMAXECUTER LLC

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};

use crate::{Gain, SdrError, Tuner};

/// IQ sample format for replay input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Complex uint8 (CU8): what an RTL2832U delivers natively
    Cu8,
    /// Complex int8 (CS8): pairs of i8, as written by HackRF tools
    Ci8,
}

/// Replays a raw IQ capture through the [`Tuner`] interface.
///
/// Tuning calls only update the reported state. Reads are served from the
/// file and wrap back to the start at end of file, so a short capture can
/// feed any number of bands.
pub struct FileTuner {
    path: String,
    format: SampleFormat,
    reader: BufReader<File>,
    sample_rate: u32,
    center_freq: u32,
    gain: Gain,
}

impl FileTuner {
    pub fn open(path: impl Into<String>, format: SampleFormat) -> Result<Self, SdrError> {
        let path = path.into();
        let file = File::open(&path)?;
        log::info!("replaying IQ from {} ({:?})", path, format);

        Ok(Self {
            path,
            format,
            reader: BufReader::with_capacity(1024 * 1024, file),
            sample_rate: 0,
            center_freq: 0,
            gain: Gain::Auto,
        })
    }

    /// Fill `buf` from the file, rewinding at end of file.
    /// Returns fewer bytes than requested only for an empty file.
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        let mut rewound = false;

        while filled < buf.len() {
            let n = self.reader.read(&mut buf[filled..])?;
            if n == 0 {
                if rewound {
                    break;
                }
                self.reader.seek(SeekFrom::Start(0))?;
                rewound = true;
                continue;
            }
            rewound = false;
            filled += n;
        }

        Ok(filled)
    }
}

impl Tuner for FileTuner {
    fn set_sample_rate(&mut self, rate: u32) -> Result<(), SdrError> {
        self.sample_rate = rate;
        Ok(())
    }

    fn set_center_freq(&mut self, freq: u32) -> Result<(), SdrError> {
        self.center_freq = freq;
        log::debug!(
            "replay {} as {} Hz, {} S/s, gain {:?}",
            self.path,
            self.center_freq,
            self.sample_rate,
            self.gain
        );
        Ok(())
    }

    fn set_gain(&mut self, gain: Gain) -> Result<(), SdrError> {
        self.gain = gain;
        Ok(())
    }

    fn reset_buffer(&mut self) -> Result<(), SdrError> {
        Ok(())
    }

    fn read_sync(&mut self, buf: &mut [u8]) -> Result<usize, SdrError> {
        let n = self.fill(buf)?;
        if self.format == SampleFormat::Ci8 {
            // Shift signed samples onto the unsigned 127.5 midpoint
            for b in &mut buf[..n] {
                *b = b.wrapping_add(128);
            }
        }
        Ok(n)
    }

    fn name(&self) -> &str {
        &self.path
    }
}
