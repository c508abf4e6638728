// Copyright 2025-2026 CEMAXECUTER LLC

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;

use ps_dsp::{rms_power, BandGeometry};
use ps_output::csv::ReadingWriter;
use ps_output::{timestamp_now, PowerReading, PowerStore, StoreError};
use ps_sdr::file::{FileTuner, SampleFormat};
use ps_sdr::{BandSpec, DeviceSession, SdrError, Tuner};

use crate::config::{self, ConfigError};

/// Where IQ samples come from.
#[derive(Debug, Clone)]
#[cfg_attr(not(feature = "rtlsdr"), allow(dead_code))]
pub enum Source {
    Live {
        device_index: u32,
        direct_sampling: u8,
        offset_tuning: bool,
    },
    Replay {
        path: PathBuf,
        format: SampleFormat,
    },
}

#[derive(Debug, Clone)]
pub struct SweepOptions {
    pub freq_list: PathBuf,
    pub database: PathBuf,
    pub source: Source,
    pub ppm: i32,
    /// Full passes over the band table before the single store write
    pub sweeps: u32,
    /// CSV report destination; `-` is stdout
    pub csv: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sdr(#[from] SdrError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to write report {path}")]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Load the band list, sweep it and store the readings. Returns the number
/// of rows written.
pub fn run(opts: &SweepOptions) -> Result<usize, SweepError> {
    let bands = config::load_band_specs(&opts.freq_list)?;
    log::info!(
        "loaded {} bands from {}",
        bands.len(),
        opts.freq_list.display()
    );

    if bands.is_empty() {
        log::warn!("band list is empty, nothing to sweep");
        let store = PowerStore::open(&opts.database)?;
        return Ok(store.append(&[])?);
    }

    match &opts.source {
        Source::Replay { path, format } => {
            let tuner = FileTuner::open(path.to_string_lossy().into_owned(), *format)?;
            sweep_and_store(tuner, bands, opts)
        }
        #[cfg(feature = "rtlsdr")]
        Source::Live {
            device_index,
            direct_sampling,
            offset_tuning,
        } => {
            use ps_sdr::rtlsdr::{self, RtlSdr, RtlSdrOptions};

            for dev in rtlsdr::list_devices() {
                log::debug!("found device #{}: {}", dev.index, dev.name);
            }
            let options = RtlSdrOptions {
                direct_sampling: *direct_sampling,
                offset_tuning: *offset_tuning,
            };
            let tuner = RtlSdr::open(*device_index, &options)?;
            log::debug!("supported gains: {:?}", tuner.gains());
            sweep_and_store(tuner, bands, opts)
        }
        #[cfg(not(feature = "rtlsdr"))]
        Source::Live { .. } => Err(SdrError::Unsupported.into()),
    }
}

fn sweep_and_store<T: Tuner>(
    tuner: T,
    bands: Vec<BandSpec>,
    opts: &SweepOptions,
) -> Result<usize, SweepError> {
    let mut session = DeviceSession::open(tuner).with_ppm(opts.ppm);
    session.configure(bands)?;

    let start = Instant::now();
    let mut readings = Vec::new();
    for pass in 0..opts.sweeps {
        log::debug!("sweep {}/{}", pass + 1, opts.sweeps);
        readings.extend(sweep(&mut session)?);
    }
    log::info!(
        "{} readings in {:.2} s",
        readings.len(),
        start.elapsed().as_secs_f64()
    );

    if let Some(path) = &opts.csv {
        write_report(path, &readings)?;
    }

    let store = PowerStore::open(&opts.database)?;
    let written = store.append(&readings)?;
    log::info!(
        "wrote {} rows to {} ({} total)",
        written,
        store.path().display(),
        store.row_count()?
    );
    store.close();

    session.close();
    Ok(written)
}

/// One pass over the configured table, in table order.
pub fn sweep<T: Tuner>(session: &mut DeviceSession<T>) -> Result<Vec<PowerReading>, SdrError> {
    let bands = session.table().to_vec();
    let mut readings = Vec::with_capacity(bands.len());

    for (index, band) in bands.iter().enumerate() {
        session.tune(index)?;
        let power = session.sample(index, rms_power)?;

        log::debug!(
            "band {}: {} Hz, {} -> {:.2} dB ({:.2} dB without DC)",
            index,
            band.frequency,
            BandGeometry::new(band.frequency, band.rate, band.buf_len()),
            power.rms_db,
            power.rms_dc_db
        );
        readings.push(PowerReading::new(timestamp_now(), band, &power));
    }

    Ok(readings)
}

fn write_report(path: &Path, readings: &[PowerReading]) -> Result<(), SweepError> {
    let report_err = |source: io::Error| SweepError::Report {
        path: path.to_path_buf(),
        source,
    };

    let out: Box<dyn Write> = if path == Path::new("-") {
        Box::new(io::stdout().lock())
    } else {
        Box::new(BufWriter::new(File::create(path).map_err(report_err)?))
    };

    let mut writer = ReadingWriter::new(out).map_err(report_err)?;
    writer.write_all(readings).map_err(report_err)?;
    log::debug!("report: {} lines to {}", writer.lines(), path.display());
    Ok(())
}
