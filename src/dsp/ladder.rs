//! The FFT ladder: a grid of FFTs over (sub-sample shift, time slot).
//!
//! For every sub-sample shift the window is cut into consecutive blocks of
//! `size` I/Q samples and transformed; the resulting spectra feed the peak
//! search (shift 0) and the per-candidate centroid extraction (all shifts).

use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;
use tracing::debug;

pub struct FftLadder {
    size: usize,
    shifts: usize,
    ffts_per_shift: usize,
    fft: Arc<dyn Fft<f32>>,
    /// (shift, slot, bin) -> spectrum sample, one contiguous allocation.
    grid: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl FftLadder {
    pub fn new(size: usize, shifts: usize, ffts_per_shift: usize) -> FftLadder {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex32::default(); fft.get_inplace_scratch_len()];
        debug!(
            size,
            shifts,
            ffts_per_shift,
            bytes = size * shifts * ffts_per_shift * std::mem::size_of::<Complex32>(),
            "allocating FFT grid"
        );
        FftLadder {
            size,
            shifts,
            ffts_per_shift,
            fft,
            grid: vec![Complex32::default(); size * shifts * ffts_per_shift],
            scratch,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn shifts(&self) -> usize {
        self.shifts
    }

    pub fn ffts_per_shift(&self) -> usize {
        self.ffts_per_shift
    }

    /// Transform one captured window of interleaved I/Q floats.
    ///
    /// At each shift the ladder consumes as many full blocks as the
    /// remaining samples allow, up to `ffts_per_shift`; slots beyond that
    /// stay zero.
    pub fn run(&mut self, iq: &[f32]) {
        self.grid.fill(Complex32::default());
        for shift in 0..self.shifts {
            if shift * 2 >= iq.len() {
                break;
            }
            let samples = &iq[shift * 2..];
            let slots = (samples.len() / (2 * self.size)).min(self.ffts_per_shift);
            for slot in 0..slots {
                let base = (shift * self.ffts_per_shift + slot) * self.size;
                let buffer = &mut self.grid[base..base + self.size];
                for (bin, value) in buffer.iter_mut().enumerate() {
                    let at = (slot * self.size + bin) * 2;
                    *value = Complex32::new(samples[at], samples[at + 1]);
                }
                self.fft.process_with_scratch(buffer, &mut self.scratch);
            }
        }
    }

    /// Spectrum of one (shift, slot) cell.
    pub fn slot(&self, shift: usize, slot: usize) -> &[Complex32] {
        let base = (shift * self.ffts_per_shift + slot) * self.size;
        &self.grid[base..base + self.size]
    }

    /// Per-bin magnitude summed over all time slots at shift 0; the input
    /// to peak picking and the noise floor.
    pub fn accumulate_magnitude(&self) -> Vec<f32> {
        let mut acc = vec![0.0f32; self.size];
        for slot in 0..self.ffts_per_shift {
            let spectrum = self.slot(0, slot);
            for (bin, value) in spectrum.iter().enumerate() {
                acc[bin] += value.norm();
            }
        }
        acc
    }
}
