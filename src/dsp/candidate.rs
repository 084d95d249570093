//! Spot candidates: per-peak centroid time series and tokenisation.
//!
//! Around every peak bin an 11-bin frequency window is tracked through
//! time. Each time slot yields a magnitude-weighted centroid; a candidate
//! is worth decoding when the series covers a full transmission, and a
//! line fitted to the centroids locates the tone ladder and the
//! transmitter drift.

use num_complex::Complex32;
use tracing::debug;

use crate::constants::{WSPR_SYNC, WSPR_SYMBOL_COUNT};

use super::regression::Regression;

/// Width of the tracked frequency window, in bins.
pub const WINDOW: usize = 11;

/// One time slot of the tracked window around a peak.
#[derive(Debug, Clone)]
pub struct SampleRecord {
    /// Magnitude-weighted mean bin offset within the window.
    pub centroid: f32,
    /// Total magnitude across the window.
    pub magnitude: f32,
    /// Per-bin magnitudes, `WINDOW` of them.
    pub mag_slice: Vec<f32>,
    /// Per-bin complex spectrum samples.
    pub samples: Vec<Complex32>,
    pub time_stamp: usize,
    pub time_seconds: f32,
}

impl SampleRecord {
    /// Extract the window around a peak from one FFT slot. Returns `None`
    /// when the slot carries no usable energy (total magnitude <= 1.0), in
    /// which case no centroid exists.
    pub fn from_spectrum(
        spectrum: &[Complex32],
        bins: &[usize; WINDOW],
        time_stamp: usize,
        delta_time: f32,
    ) -> Option<SampleRecord> {
        let mut mag_slice = Vec::with_capacity(WINDOW);
        let mut samples = Vec::with_capacity(WINDOW);
        let mut total = 0.0f32;
        let mut weighted = 0.0f32;
        for (offset, &bin) in bins.iter().enumerate() {
            let value = spectrum[bin];
            let m = value.norm();
            mag_slice.push(m);
            samples.push(value);
            total += m;
            weighted += offset as f32 * m;
        }
        if total <= 1.0 {
            return None;
        }
        Some(SampleRecord {
            centroid: weighted / total,
            magnitude: total,
            mag_slice,
            samples,
            time_stamp,
            time_seconds: time_stamp as f32 * delta_time,
        })
    }
}

/// The bin indices of the window centred on `peak_bin`, wrapping at the
/// spectrum edges.
pub fn window_bins(peak_bin: usize, fft_size: usize) -> [usize; WINDOW] {
    let mut bins = [0usize; WINDOW];
    let offset = (WINDOW / 2) as isize;
    for i in -offset..=offset {
        let bin = (peak_bin as isize + i).rem_euclid(fft_size as isize) as usize;
        bins[(i + offset) as usize] = bin;
    }
    bins
}

#[derive(Debug, Clone)]
pub struct SpotCandidate {
    id: usize,
    records: Vec<SampleRecord>,
    valid: bool,
    slope: f32,
    y_intercept: f32,
    freq: f32,
}

impl SpotCandidate {
    /// Candidate for a WSPR peak. The frequency estimate folds the fitted
    /// intercept into the (signed) bin offset of the peak.
    pub fn new_wspr(
        id: usize,
        records: Vec<SampleRecord>,
        delta_freq: f32,
        fft_size: usize,
    ) -> SpotCandidate {
        let valid = longest_run(&records) > WSPR_SYMBOL_COUNT - 1;
        let mut candidate = SpotCandidate {
            id,
            records,
            valid,
            slope: 0.0,
            y_intercept: 0.0,
            freq: 0.0,
        };
        if valid {
            let fit = Regression::fit(&candidate.centroids());
            candidate.slope = fit.slope;
            candidate.y_intercept = fit.y_intercept;
            let bin = if id > fft_size / 2 - 1 {
                id as f32 - fft_size as f32
            } else {
                id as f32
            };
            candidate.freq = (fit.y_intercept + bin) * delta_freq;
        }
        candidate
    }

    /// Candidate for an FT8 peak; valid from 79 contiguous slots. The
    /// frequency estimate is taken from the window's low edge.
    pub fn new_ft8(
        id: usize,
        records: Vec<SampleRecord>,
        delta_freq: f32,
        fft_size: usize,
    ) -> SpotCandidate {
        let valid = longest_run(&records) > 78;
        let mut candidate = SpotCandidate {
            id,
            records,
            valid,
            slope: 0.0,
            y_intercept: 0.0,
            freq: 0.0,
        };
        if valid {
            let fit = Regression::fit(&candidate.centroids());
            candidate.slope = fit.slope;
            candidate.y_intercept = fit.y_intercept;
            let bins = id as f32 - (WINDOW / 2) as f32;
            candidate.freq = if id > fft_size / 2 - 1 {
                (bins - fft_size as f32) * delta_freq
            } else {
                bins * delta_freq
            };
        }
        candidate
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    pub fn slope(&self) -> f32 {
        self.slope
    }

    pub fn y_intercept(&self) -> f32 {
        self.y_intercept
    }

    /// Baseband frequency offset of the candidate, Hz.
    pub fn frequency(&self) -> f32 {
        self.freq
    }

    fn centroids(&self) -> Vec<f32> {
        self.records.iter().map(|r| r.centroid).collect()
    }

    /// WSPR tokenisation of a 162-slot subset.
    ///
    /// The fitted intercept (biased 1.5 bins low) anchors tone 0; each
    /// slot advances the baseline by the fitted slope. The interleaved
    /// sync vector restricts every slot to two of the four tones, and
    /// per-bin means are subtracted to suppress narrowband interferers.
    pub fn tokenize_wspr(subset: &[SampleRecord]) -> Option<(Vec<u8>, f32)> {
        if subset.len() < WSPR_SYMBOL_COUNT {
            return None;
        }
        let averages = magnitude_averages(subset);
        let centroids: Vec<f32> = subset.iter().map(|r| r.centroid).collect();
        let fit = Regression::fit(&centroids);
        let mut base = fit.y_intercept - 1.5;

        let mut tokens = Vec::with_capacity(WSPR_SYMBOL_COUNT);
        for (sync_index, record) in subset.iter().enumerate().take(WSPR_SYMBOL_COUNT) {
            let slice_zero = (base - 0.5) as isize;
            if slice_zero < 0 || slice_zero + 3 >= WINDOW as isize {
                debug!(slope = fit.slope, base, "tone ladder leaves the window");
                return None;
            }
            let at = |i: isize| {
                let idx = (slice_zero + i) as usize;
                record.mag_slice[idx] - averages[idx]
            };
            let token = if WSPR_SYNC[sync_index] == 1 {
                if at(1) < at(3) {
                    3
                } else {
                    1
                }
            } else if at(0) < at(2) {
                2
            } else {
                0
            };
            tokens.push(token);
            base += fit.slope;
        }
        Some((tokens, fit.slope))
    }

    /// FT8 tokenisation of a 79-slot subset: the loudest of eight adjacent
    /// bins above the drifting baseline, per-bin means subtracted.
    pub fn tokenize_ft8(subset: &[SampleRecord]) -> Option<(Vec<u8>, f32)> {
        if subset.is_empty() {
            return None;
        }
        let averages = magnitude_averages(subset);
        let centroids: Vec<f32> = subset.iter().map(|r| r.centroid).collect();
        let fit = Regression::fit(&centroids);
        let mut base = fit.y_intercept - 3.5;

        let mut tokens = Vec::with_capacity(subset.len());
        for record in subset {
            let slice_zero = (base - 0.5) as isize;
            if slice_zero < 0 || slice_zero + 7 >= WINDOW as isize {
                debug!(slope = fit.slope, base, "tone ladder leaves the window");
                return None;
            }
            let levels: Vec<f32> = (0..8)
                .map(|i| {
                    let idx = (slice_zero + i) as usize;
                    record.mag_slice[idx] - averages[idx]
                })
                .collect();
            // a tone wins only when strictly louder than every other bin;
            // unresolvable slots fall through to tone 7
            let token = (0..7)
                .find(|&k| {
                    levels
                        .iter()
                        .enumerate()
                        .all(|(j, &v)| j == k || levels[k] > v)
                })
                .unwrap_or(7) as u8;
            tokens.push(token);
            base += fit.slope;
        }
        Some((tokens, fit.slope))
    }
}

fn magnitude_averages(subset: &[SampleRecord]) -> Vec<f32> {
    let mut averages = vec![0.0f32; WINDOW];
    for record in subset {
        for (i, &m) in record.mag_slice.iter().enumerate() {
            averages[i] += m;
        }
    }
    for avg in averages.iter_mut() {
        *avg /= subset.len() as f32;
    }
    averages
}

fn longest_run(records: &[SampleRecord]) -> usize {
    let mut longest = 0usize;
    let mut current = 0usize;
    let mut last: isize = -2;
    for record in records {
        if record.time_stamp as isize == last + 1 {
            current += 1;
        } else {
            current = 1;
        }
        last = record.time_stamp as isize;
        if current > longest {
            longest = current;
        }
    }
    longest
}
