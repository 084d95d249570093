//! Signal-analysis stages: FFT ladder, peak picking, candidate
//! construction and symbol tokenisation.

mod candidate;
mod ladder;
mod peaks;
mod regression;

pub use candidate::{window_bins, SampleRecord, SpotCandidate, WINDOW};
pub use ladder::FftLadder;
pub use peaks::{all_bins, edge_bins, noise_floor, pick_peaks, Peak};
pub use regression::Regression;
