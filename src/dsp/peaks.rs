//! Peak picking and SNR estimation over the accumulated spectrum.

use tracing::debug;

/// One candidate bin from the accumulated spectrum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub bin: usize,
    pub magnitude: f32,
    pub snr_db: f32,
}

/// 30th-percentile magnitude of the supplied bins.
pub fn noise_floor(magnitudes: &[f32]) -> f32 {
    if magnitudes.is_empty() {
        return 0.0;
    }
    let mut sorted = magnitudes.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted[(0.30 * sorted.len() as f32) as usize]
}

/// Pick the `count` strongest bins among `eligible` and attach an SNR
/// estimate referenced to the 30th-percentile noise floor of the same
/// region. `calibration_db` absorbs the bandwidth ratio between the
/// receiver passband and one modulation tone (17.0 dB for FT8, 26.2 dB
/// for WSPR).
pub fn pick_peaks(
    accumulated: &[f32],
    count: usize,
    eligible: &[usize],
    calibration_db: f32,
) -> Vec<Peak> {
    let region: Vec<f32> = eligible.iter().map(|&bin| accumulated[bin]).collect();
    let noise = noise_floor(&region);
    let noise_db = 20.0 * noise.max(f32::MIN_POSITIVE).log10();
    debug!(noise, noise_db, bins = region.len(), "noise floor");

    let mut ranked: Vec<(usize, f32)> = eligible
        .iter()
        .map(|&bin| (bin, accumulated[bin]))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(count);

    ranked
        .into_iter()
        .map(|(bin, magnitude)| Peak {
            bin,
            magnitude,
            snr_db: 20.0 * magnitude.max(f32::MIN_POSITIVE).log10() - noise_db - calibration_db,
        })
        .collect()
}

/// Every bin of a spectrum; the WSPR peak search region.
pub fn all_bins(size: usize) -> Vec<usize> {
    (0..size).collect()
}

/// Bins outside the central band of the spectrum. The FT8 search excludes
/// the middle `excluded_hz` of the `base_band_hz` baseband, which in the
/// FFT's layout is the highest-|frequency| region.
pub fn edge_bins(size: usize, excluded_hz: f32, base_band_hz: f32) -> Vec<usize> {
    let region = (excluded_hz * size as f32 / base_band_hz) as usize;
    let bound0 = (size - region) / 2;
    let bound1 = (size + region) / 2;
    (0..size)
        .filter(|&bin| bin < bound0 || bin > bound1)
        .collect()
}
