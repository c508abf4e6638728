mod config;
mod pipeline;

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use ps_sdr::file::SampleFormat;

use pipeline::{Source, SweepOptions};

#[derive(Parser, Debug)]
#[command(name = "rtl-power-sweep")]
#[command(about = "Sweep an RTL-SDR across a band list and log RMS power to SQLite")]
struct Cli {
    /// Band list, one `frequency,rate,bandwidth_exp,gain` per line
    #[arg(short = 'f', long, default_value = "freq_list.txt")]
    freq_list: PathBuf,

    /// SQLite database to append readings to
    #[arg(short = 'o', long, default_value = "test.db")]
    database: PathBuf,

    /// RTL-SDR device index
    #[arg(short = 'd', long, default_value = "0")]
    device_index: u32,

    /// Frequency correction in ppm
    #[arg(short = 'p', long, default_value = "0", allow_hyphen_values = true)]
    ppm: i32,

    /// Enable offset tuning
    #[arg(long)]
    offset_tuning: bool,

    /// Direct sampling: 0 = off, 1 = I branch, 2 = Q branch
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..=2))]
    direct_sampling: u8,

    /// Raw IQ capture to replay instead of live hardware
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Sample format of the replay file: cu8, ci8
    #[arg(long, default_value = "cu8")]
    replay_format: String,

    /// Full sweeps to run before writing
    #[arg(
        short = 'n',
        long,
        default_value = "1",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    sweeps: u32,

    /// Also write a CSV report ("-" for stdout)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let source = match cli.replay {
        Some(path) => {
            let format = match cli.replay_format.as_str() {
                "cu8" => SampleFormat::Cu8,
                "ci8" => SampleFormat::Ci8,
                other => {
                    log::error!("unknown sample format: {} (use cu8 or ci8)", other);
                    std::process::exit(1);
                }
            };
            Source::Replay { path, format }
        }
        None => Source::Live {
            device_index: cli.device_index,
            direct_sampling: cli.direct_sampling,
            offset_tuning: cli.offset_tuning,
        },
    };

    let opts = SweepOptions {
        freq_list: cli.freq_list,
        database: cli.database,
        source,
        ppm: cli.ppm,
        sweeps: cli.sweeps,
        csv: cli.csv,
    };

    if let Err(e) = pipeline::run(&opts) {
        log::error!("{}", e);
        let mut cause = e.source();
        while let Some(c) = cause {
            log::error!("  caused by: {}", c);
            cause = c.source();
        }
        std::process::exit(1);
    }
}
