//! FT8 receive session: read baseband I/Q from stdin, decode 15-second
//! windows, print spots, report to PSK Reporter.

use clap::Parser;
use std::io;
use std::process::ExitCode;

use rustyspot::tracing_init::init_tracing;
use rustyspot::window::ft8::{Ft8Pass, CADENCE};
use rustyspot::window::{run_session, SessionConfig};

#[derive(Parser)]
#[command(
    name = "ft8window",
    about = "Decode FT8 from interleaved little-endian f32 I/Q samples on stdin (3200 Hz)"
)]
struct Args {
    /// Reporter callsign for spot submission
    #[arg(long = "call_sign")]
    call_sign: String,

    /// Reporter Maidenhead locator (AA00)
    #[arg(long = "grid_location")]
    grid_location: String,

    /// FFT size (a power of two, nominally 512)
    fft_size: usize,

    /// Number of spectrum peaks to examine per window
    number_of_peaks: usize,

    /// Window dump file prefix; empty disables dumps
    file_prefix: String,

    /// Dial frequency in Hz
    dial_freq_hz: f64,
}

fn validate(args: &Args) -> Result<(), String> {
    if !args.fft_size.is_power_of_two() || args.fft_size < 64 {
        return Err(format!(
            "fft_size must be a power of two >= 64, got {}",
            args.fft_size
        ));
    }
    if args.number_of_peaks == 0 {
        return Err("number_of_peaks must be at least 1".to_string());
    }
    let grid: Vec<char> = args.grid_location.chars().collect();
    if grid.len() < 4
        || !grid[0].is_ascii_uppercase()
        || !grid[1].is_ascii_uppercase()
        || !grid[2].is_ascii_digit()
        || !grid[3].is_ascii_digit()
    {
        return Err(format!(
            "grid_location must look like AA00, got {}",
            args.grid_location
        ));
    }
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    if let Err(reason) = validate(&args) {
        eprintln!("configuration error: {reason}");
        return ExitCode::from(2);
    }

    let cfg = SessionConfig {
        fft_size: args.fft_size,
        peak_count: args.number_of_peaks,
        file_prefix: args.file_prefix.clone(),
        dial_freq_hz: args.dial_freq_hz,
        reporter_call: args.call_sign.clone(),
        reporter_grid: args.grid_location.clone(),
    };

    let pass = Ft8Pass::new(cfg);
    match run_session(CADENCE, &args.file_prefix, io::stdin().lock(), pass) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("session failed: {e}");
            ExitCode::FAILURE
        }
    }
}
