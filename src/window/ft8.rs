//! The FT8 decode pass: one 14-second window in, spot reports out.

use rayon::prelude::*;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::constants::FT8_SYMBOL_COUNT;
use crate::crc::crc14_check;
use crate::dsp::{
    edge_bins, pick_peaks, window_bins, FftLadder, SampleRecord, SpotCandidate,
};
use crate::ldpc::bp_decode;
use crate::message::{tones_to_llr, unpack77, CallsignHashCache};
use crate::report::{spot_date, spot_time_slot, PskReporter};
use crate::source::epoch_seconds;

use super::{Cadence, CapturedWindow, DecodePass, SessionConfig, SpotLedger};

/// Baseband width, Hz; also the sample rate.
const BASE_BAND: usize = 3200;
/// Sub-sample shifts held by the FFT grid.
const SHIFTS: usize = 512;
/// Step through the shifts during the candidate scan.
const SHIFT_STEP: usize = 10;
/// FFT slots per shift.
const FFTS_PER_SHIFT: usize = 92;
/// The central band excluded from peak search and noise estimation, Hz.
const EXCLUDED_BAND_HZ: f32 = 2800.0;
/// Ratio of USB bandwidth (2500 Hz) to one FT8 signal (50 Hz), in dB.
const SNR_CALIBRATION_DB: f32 = 17.0;

/// Minimum Costas positions (of 21) that must match before FEC runs.
const MIN_COSTAS_SCORE: usize = 6;
const LDPC_ITERATIONS: usize = 15;

/// FT8 ingest timing: 15-second slots, 14 s captured.
pub const CADENCE: Cadence = Cadence {
    rate_hz: BASE_BAND,
    capture_seconds: 14,
    period_seconds: 15,
};

struct Hit {
    message: String,
    freq_hz: f64,
    snr_db: f32,
    shift: i64,
}

pub struct Ft8Pass {
    cfg: SessionConfig,
    ladder: FftLadder,
    hash_cache: Mutex<CallsignHashCache>,
    reporter: PskReporter,
}

impl Ft8Pass {
    pub fn new(cfg: SessionConfig) -> Ft8Pass {
        let ladder = FftLadder::new(cfg.fft_size, SHIFTS, FFTS_PER_SHIFT);
        let reporter = PskReporter::new(&cfg.reporter_call, &cfg.reporter_grid);
        Ft8Pass {
            cfg,
            ladder,
            hash_cache: Mutex::new(CallsignHashCache::new()),
            reporter,
        }
    }

    fn scan_peak(&self, peak_bin: usize, snr_db: f32) -> Vec<Hit> {
        let size = self.cfg.fft_size;
        let delta_freq = BASE_BAND as f32 / size as f32;
        let delta_time = size as f32 / BASE_BAND as f32;
        let bins = window_bins(peak_bin, size);
        let mut hits = Vec::new();

        for shift in (0..SHIFTS).step_by(SHIFT_STEP) {
            let mut records = Vec::with_capacity(FFTS_PER_SHIFT);
            for t in 0..FFTS_PER_SHIFT {
                match SampleRecord::from_spectrum(self.ladder.slot(shift, t), &bins, t, delta_time)
                {
                    Some(record) => records.push(record),
                    None => break,
                }
            }
            let candidate = SpotCandidate::new_ft8(peak_bin, records, delta_freq, size);
            if !candidate.is_valid() {
                continue;
            }

            let records = candidate.records();
            let symbol_sets = records.len() - FT8_SYMBOL_COUNT + 1;
            for symbol_set in 0..symbol_sets {
                let subset = &records[symbol_set..symbol_set + FT8_SYMBOL_COUNT];
                let Some((tokens, _slope)) = SpotCandidate::tokenize_ft8(subset) else {
                    continue;
                };

                let Ok((_, llr, costas)) = tones_to_llr(&tokens) else {
                    continue;
                };
                if costas < MIN_COSTAS_SCORE {
                    continue;
                }
                debug!(peak_bin, shift, symbol_set, costas, "sync accepted");

                let Some(codeword) = bp_decode(&llr, LDPC_ITERATIONS) else {
                    continue;
                };
                if codeword[..77].not_any() {
                    continue;
                }
                if !crc14_check(&codeword[..91]) {
                    debug!(peak_bin, shift, "parity passed but CRC did not");
                    continue;
                }

                let unpacked = {
                    let mut cache = self.hash_cache.lock().expect("hash cache lock");
                    unpack77(&codeword[..77], &mut cache)
                };
                let Ok(message) = unpacked else {
                    continue;
                };

                let freq_hz = self.cfg.dial_freq_hz + 1500.0 + candidate.frequency() as f64;
                info!(
                    "decode: {message} at {freq_hz:.0} Hz, bin {peak_bin}, shift {shift}, symbol set {symbol_set}"
                );
                hits.push(Hit {
                    message,
                    freq_hz,
                    snr_db,
                    shift: (symbol_set * size + shift) as i64,
                });
            }
        }
        hits
    }
}

impl DecodePass for Ft8Pass {
    fn decode(&mut self, window: &CapturedWindow) {
        let size = self.cfg.fft_size;
        self.ladder.run(&window.samples);
        let accumulated = self.ladder.accumulate_magnitude();
        let eligible = edge_bins(size, EXCLUDED_BAND_HZ, BASE_BAND as f32);
        let peaks = pick_peaks(
            &accumulated,
            self.cfg.peak_count,
            &eligible,
            SNR_CALIBRATION_DB,
        );

        let hits: Vec<Hit> = peaks
            .par_iter()
            .flat_map(|peak| self.scan_peak(peak.bin, peak.snr_db))
            .collect();

        let mut ledger: SpotLedger<()> = SpotLedger::new(3.0);
        for hit in &hits {
            ledger.record(&hit.message, hit.freq_hz, hit.snr_db, hit.shift, ());
        }

        let seconds_per_shift = 1.0 / BASE_BAND as f32;
        let date = spot_date(window.start_time);
        let time = spot_time_slot(window.start_time);
        let now = epoch_seconds();

        for (id, entry) in ledger.entries().iter().enumerate() {
            if entry.occurrence <= 1 {
                continue;
            }
            let delta_time =
                entry.shift_acc as f32 * seconds_per_shift / entry.occurrence as f32 - 0.5;
            println!(
                "{date} {time}: Msg {id}: {}, was seen {} times at {:.0} Hz with best SNR of {:.3} dB, and delta time of {delta_time:.1}",
                entry.key, entry.occurrence, entry.freq_hz, entry.snr_db
            );
            self.reporter
                .report(&entry.key, entry.freq_hz, window.start_time, now);
        }
    }
}
