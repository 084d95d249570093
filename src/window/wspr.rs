//! The WSPR decode pass: one 116-second window in, spot reports out.

use rayon::prelude::*;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::constants::WSPR_SYMBOL_COUNT;
use crate::dsp::{
    all_bins, pick_peaks, window_bins, FftLadder, SampleRecord, SpotCandidate,
};
use crate::report::{spot_date, spot_time, WsprNet, WsprSpot};
use crate::wspr::{deinterleave, fano, unpack_message, WsprHashTable};

use super::{Cadence, CapturedWindow, DecodePass, SessionConfig, SpotLedger};

/// Baseband width, Hz; also the sample rate.
const BASE_BAND: usize = 375;
/// Sub-sample shifts held by the FFT grid.
const SHIFTS: usize = 375;
/// Step through the shifts during the candidate scan.
const SHIFT_STEP: usize = 10;
/// FFT slots per shift (all of them exist only at shift 0).
const FFTS_PER_SHIFT: usize = 164;
/// Ratio of receiver bandwidth to one WSPR tone, in dB.
const SNR_CALIBRATION_DB: f32 = 26.2;

const FANO_DELTA: i64 = 60;
const FANO_MAX_CYCLES: u64 = 10_000;

/// WSPR ingest timing: two-minute periods, 116 s captured.
pub const CADENCE: Cadence = Cadence {
    rate_hz: BASE_BAND,
    capture_seconds: 116,
    period_seconds: 120,
};

/// Token remappings tried per candidate: the identity, and the mirror
/// permutation that recovers spectrum-inverted signals. The sign flips
/// the frequency offset accordingly.
const TOKEN_REMAPS: [([u8; 4], f32); 2] = [([0, 1, 2, 3], 1.0), ([0, 2, 3, 1], -1.0)];

struct Hit {
    callsign: String,
    grid: String,
    power_dbm: i32,
    freq_hz: f64,
    snr_db: f32,
    shift: i64,
    slope: f32,
}

pub struct WsprPass {
    cfg: SessionConfig,
    ladder: FftLadder,
    hash_table: Mutex<WsprHashTable>,
    reporter: WsprNet,
}

impl WsprPass {
    pub fn new(cfg: SessionConfig) -> WsprPass {
        let ladder = FftLadder::new(cfg.fft_size, SHIFTS, FFTS_PER_SHIFT);
        let reporter = WsprNet::new(&cfg.reporter_call, &cfg.reporter_grid);
        WsprPass {
            cfg,
            ladder,
            hash_table: Mutex::new(WsprHashTable::default()),
            reporter,
        }
    }

    /// Scan one peak bin across all sampled shifts and symbol offsets.
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
            let candidate = SpotCandidate::new_wspr(peak_bin, records, delta_freq, size);
            if !candidate.is_valid() {
                continue;
            }

            let records = candidate.records();
            let symbol_sets = records.len() - WSPR_SYMBOL_COUNT + 1;
            for symbol_set in 0..symbol_sets {
                let subset = &records[symbol_set..symbol_set + WSPR_SYMBOL_COUNT];
                let Some((tokens, slope)) = SpotCandidate::tokenize_wspr(subset) else {
                    continue;
                };

                for (remap, sign) in TOKEN_REMAPS {
                    let mut symbols = [0u8; WSPR_SYMBOL_COUNT];
                    for (i, &token) in tokens.iter().enumerate() {
                        symbols[i] = remap[token as usize] << 6;
                    }
                    deinterleave(&mut symbols);

                    let Some(result) = fano(&symbols, 81, FANO_DELTA, FANO_MAX_CYCLES) else {
                        debug!(peak_bin, shift, symbol_set, "Fano did not converge");
                        continue;
                    };
                    if result.data.iter().all(|&b| b == 0) {
                        continue;
                    }

                    let unpacked = {
                        let mut table = self.hash_table.lock().expect("hash table lock");
                        unpack_message(&result.data, &mut table)
                    };
                    let Ok(message) = unpacked else {
                        continue;
                    };
                    if !message.printable {
                        debug!("implausible payload dropped: {}", message.text);
                        continue;
                    }

                    let freq_hz = self.cfg.dial_freq_hz
                        + 1500.0
                        + (sign * candidate.frequency() + 3.0 * delta_freq) as f64;
                    info!(
                        "spot: {} at {freq_hz:.0} Hz, bin {peak_bin}, shift {shift}, symbol set {symbol_set}",
                        message.text
                    );
                    hits.push(Hit {
                        callsign: message.callsign,
                        grid: message.grid,
                        power_dbm: message.power_dbm,
                        freq_hz,
                        snr_db,
                        shift: (symbol_set * size + shift) as i64,
                        slope,
                    });
                    break; // next symbol set
                }
            }
        }
        hits
    }
}

impl DecodePass for WsprPass {
    fn decode(&mut self, window: &CapturedWindow) {
        let size = self.cfg.fft_size;
        self.ladder.run(&window.samples);
        let accumulated = self.ladder.accumulate_magnitude();
        let peaks = pick_peaks(
            &accumulated,
            self.cfg.peak_count,
            &all_bins(size),
            SNR_CALIBRATION_DB,
        );

        let hits: Vec<Hit> = peaks
            .par_iter()
            .flat_map(|peak| self.scan_peak(peak.bin, peak.snr_db))
            .collect();

        let mut ledger: SpotLedger<Hit> = SpotLedger::new(3.0);
        for hit in hits {
            let key = hit.callsign.clone();
            ledger.record(&key, hit.freq_hz, hit.snr_db, hit.shift, hit);
        }

        let seconds_per_shift = 1.0 / BASE_BAND as f32;
        let slope_to_drift =
            (BASE_BAND as f32 / size as f32) / (size as f32 / BASE_BAND as f32) * 60.0;
        let date = spot_date(window.start_time);
        let time = spot_time(window.start_time);

        for (id, entry) in ledger.entries().iter().enumerate() {
            if entry.occurrence <= 1 {
                continue;
            }
            let watts = 10f64.powf(entry.info.power_dbm as f64 / 10.0) / 1000.0;
            let delta_time =
                entry.shift_acc as f32 * seconds_per_shift / entry.occurrence as f32 - 2.0;
            let drift = entry.info.slope * slope_to_drift;
            println!(
                "{date} {time}: Candidate {id} ({}) was seen {} times at {:.0} Hz with best SNR of {:.3} dB,\n with transmitter power of {watts:.3} W, location of {}, drift of {drift:.2}, and delta time of {delta_time:.1}",
                entry.key, entry.occurrence, entry.freq_hz, entry.snr_db, entry.info.grid
            );
            self.reporter.report_spot(&WsprSpot {
                callsign: entry.key.clone(),
                grid: entry.info.grid.clone(),
                power_dbm: entry.info.power_dbm,
                freq_hz: entry.freq_hz,
                snr_db: entry.snr_db,
                delta_time,
                drift,
                date: date.clone(),
                time: time.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_matches_the_mode() {
        assert_eq!(CADENCE.capture_samples(), 116 * 375 * 2);
        assert_eq!(CADENCE.period_seconds, 120);
    }

    #[test]
    fn remap_rows_are_permutations() {
        for (remap, _) in TOKEN_REMAPS {
            let mut seen = [false; 4];
            for &v in &remap {
                seen[v as usize] = true;
            }
            assert!(seen.iter().all(|&s| s));
        }
    }
}
