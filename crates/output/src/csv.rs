// Copyright 2025-2026 CEMAXECUTER LLC

use std::io::{self, Write};

use crate::PowerReading;

pub const CSV_HEADER: &str = "time,frequency,bandwidth_exp,rate,rms_db,rms_dc_db";

/// CSV report writer: one line per reading, header first.
pub struct ReadingWriter<W: Write> {
    writer: W,
    lines: usize,
}

impl<W: Write> ReadingWriter<W> {
    /// Create a new writer and emit the header line.
    pub fn new(mut writer: W) -> io::Result<Self> {
        writeln!(writer, "{}", CSV_HEADER)?;
        writer.flush()?;
        Ok(Self { writer, lines: 0 })
    }

    pub fn write(&mut self, r: &PowerReading) -> io::Result<()> {
        writeln!(
            self.writer,
            "{},{},{},{},{:.2},{:.2}",
            r.time, r.frequency, r.bandwidth_exp, r.bandwidth, r.power, r.rms_dc
        )?;
        self.lines += 1;
        Ok(())
    }

    pub fn write_all(&mut self, readings: &[PowerReading]) -> io::Result<()> {
        for r in readings {
            self.write(r)?;
        }
        self.writer.flush()
    }

    /// Readings written so far (header excluded)
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(power: f64, rms_dc: f64) -> PowerReading {
        PowerReading {
            time: "18 Oct 2026 10:20:00".to_string(),
            frequency: 100_000_000,
            bandwidth: 2_048_000,
            power,
            bandwidth_exp: 14,
            rms_dc,
        }
    }

    #[test]
    fn test_header_only() {
        let writer = ReadingWriter::new(Vec::new()).unwrap();
        assert_eq!(writer.lines(), 0);
        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(out, format!("{}\n", CSV_HEADER));
    }

    #[test]
    fn test_lines() {
        let mut writer = ReadingWriter::new(Vec::new()).unwrap();
        writer
            .write_all(&[reading(-3.456, -20.0), reading(f64::NEG_INFINITY, f64::NEG_INFINITY)])
            .unwrap();
        assert_eq!(writer.lines(), 2);

        let out = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "18 Oct 2026 10:20:00,100000000,14,2048000,-3.46,-20.00");
        assert_eq!(lines[2], "18 Oct 2026 10:20:00,100000000,14,2048000,-inf,-inf");
    }
}
