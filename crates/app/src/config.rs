// Copyright 2025-2026 CEMAXECUTER LLC

//! Band list loader.
//!
//! One band per line: `frequency,rate,bandwidth_exp,gain`. Values are decimal
//! reals truncated toward zero. Blank lines are skipped; anything else that
//! does not parse aborts the whole load.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use ps_sdr::{BandSpec, MAX_BANDWIDTH_EXP};
use thiserror::Error;

const FIELDS: [&str; 4] = ["frequency", "rate", "bandwidth_exp", "gain"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot open band list {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error reading band list")]
    Read(#[from] io::Error),

    #[error("line {line}: expected 4 comma-separated fields, found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("line {line}: {field} '{value}' is not a number")]
    Parse {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("line {line}: {field} {value} out of range")]
    Range {
        line: usize,
        field: &'static str,
        value: f64,
    },
}

pub fn load_band_specs(path: &Path) -> Result<Vec<BandSpec>, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parse_band_specs(BufReader::new(file))
}

pub fn parse_band_specs<R: BufRead>(reader: R) -> Result<Vec<BandSpec>, ConfigError> {
    let mut bands = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let number = i + 1;
        if line.trim().is_empty() {
            continue;
        }
        bands.push(parse_line(number, &line)?);
    }

    Ok(bands)
}

fn parse_line(line: usize, text: &str) -> Result<BandSpec, ConfigError> {
    let raw: Vec<&str> = text.split(',').collect();
    if raw.len() != FIELDS.len() {
        return Err(ConfigError::FieldCount {
            line,
            found: raw.len(),
        });
    }

    let mut values = [0.0f64; 4];
    for (slot, (field, value)) in values.iter_mut().zip(FIELDS.iter().zip(raw)) {
        let value = value.trim();
        *slot = value.parse::<f64>().map_err(|_| ConfigError::Parse {
            line,
            field: *field,
            value: value.to_string(),
        })?;
    }

    let [frequency, rate, bandwidth_exp, gain] = values;
    Ok(BandSpec {
        frequency: to_u32(line, FIELDS[0], frequency, u32::MAX)?,
        rate: to_u32(line, FIELDS[1], rate, u32::MAX)?,
        bandwidth_exp: to_u32(line, FIELDS[2], bandwidth_exp, MAX_BANDWIDTH_EXP)?,
        gain: to_i32(line, FIELDS[3], gain)?,
    })
}

fn to_u32(line: usize, field: &'static str, value: f64, max: u32) -> Result<u32, ConfigError> {
    let t = value.trunc();
    if !t.is_finite() || t < 0.0 || t > f64::from(max) {
        return Err(ConfigError::Range { line, field, value });
    }
    Ok(t as u32)
}

fn to_i32(line: usize, field: &'static str, value: f64) -> Result<i32, ConfigError> {
    let t = value.trunc();
    if !t.is_finite() || t < f64::from(i32::MIN) || t > f64::from(i32::MAX) {
        return Err(ConfigError::Range { line, field, value });
    }
    Ok(t as i32)
}
