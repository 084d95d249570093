//! Window capture and decode orchestration.
//!
//! One producer reads the sample source and captures cadence-aligned
//! windows; one worker decodes them. A bounded queue of two windows sits
//! between the two so a slow decode never stalls ingestion; when the queue
//! is full the newest window is dropped.

pub mod ft8;
pub mod wspr;

use crossbeam_channel::{bounded, TrySendError};
use std::io::{self, Read};
use std::path::Path;
use std::thread;
use tracing::{debug, info, warn};

use crate::source::{epoch_seconds, write_window_dump, SampleSource};

/// Session parameters shared by both decode binaries.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub fft_size: usize,
    pub peak_count: usize,
    pub file_prefix: String,
    pub dial_freq_hz: f64,
    pub reporter_call: String,
    pub reporter_grid: String,
}

/// One captured window of interleaved I/Q floats, stamped with its start
/// time (seconds since the epoch).
pub struct CapturedWindow {
    pub start_time: u64,
    pub samples: Vec<f32>,
}

/// Ingest timing of a mode.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    pub rate_hz: usize,
    pub capture_seconds: usize,
    pub period_seconds: usize,
}

impl Cadence {
    /// Floats per captured window (interleaved I and Q).
    pub fn capture_samples(&self) -> usize {
        self.rate_hz * self.capture_seconds * 2
    }

    /// Floats discarded between the capture and the next period.
    pub fn discard_samples(&self) -> usize {
        self.rate_hz * (self.period_seconds - self.capture_seconds) * 2
    }
}

/// A mode-specific decoder consuming captured windows.
pub trait DecodePass: Send {
    fn decode(&mut self, window: &CapturedWindow);
}

/// Run a capture/decode session until the sample source is exhausted.
///
/// The producer (this thread) captures and enqueues; the worker thread
/// decodes. Windows decode strictly in capture order. On end of input the
/// queue is drained before returning.
pub fn run_session<R, P>(
    cadence: Cadence,
    file_prefix: &str,
    reader: R,
    mut pass: P,
) -> io::Result<()>
where
    R: Read,
    P: DecodePass,
{
    let mut source = SampleSource::new(reader);
    let base_time = epoch_seconds();
    let capture = cadence.capture_samples();
    let (tx, rx) = bounded::<CapturedWindow>(2);

    thread::scope(|scope| -> io::Result<()> {
        let worker = scope.spawn(move || {
            for window in rx.iter() {
                let started = epoch_seconds();
                pass.decode(&window);
                debug!(
                    window_start = window.start_time,
                    decode_seconds = epoch_seconds() - started,
                    "window decoded"
                );
            }
        });

        source.align_to_cadence(cadence.period_seconds as u64)?;
        loop {
            let start = epoch_seconds();
            info!("collecting {capture} samples at {}", start - base_time);
            let mut samples = vec![0f32; capture];
            let got = source.read_samples(&mut samples)?;
            if got < capture {
                info!("sample source exhausted, draining the queue");
                break;
            }

            if !file_prefix.is_empty() {
                let label = start.saturating_sub(base_time);
                let path = format!("{file_prefix}{label}.bin");
                if let Err(e) = write_window_dump(Path::new(&path), &samples) {
                    warn!("window dump to {path} failed: {e}");
                }
            }

            match tx.try_send(CapturedWindow {
                start_time: start,
                samples,
            }) {
                Ok(()) => debug!("window queued"),
                Err(TrySendError::Full(_)) => {
                    warn!("decode queue full, dropping this window");
                }
                Err(TrySendError::Disconnected(_)) => break,
            }

            source.discard(cadence.discard_samples())?;
        }

        drop(tx);
        worker.join().expect("decode worker panicked");
        Ok(())
    })
}

/// Per-window spot deduplication.
///
/// Entries merge when the key matches and the frequency lies within the
/// tolerance: the occurrence count grows, the normalised shift
/// accumulates, and the best SNR wins. The metadata of the first decode
/// is kept.
pub struct SpotLedger<T> {
    tolerance_hz: f64,
    entries: Vec<SpotEntry<T>>,
}

pub struct SpotEntry<T> {
    pub key: String,
    pub freq_hz: f64,
    pub occurrence: u32,
    pub shift_acc: i64,
    pub snr_db: f32,
    pub info: T,
}

impl<T> SpotLedger<T> {
    pub fn new(tolerance_hz: f64) -> SpotLedger<T> {
        SpotLedger {
            tolerance_hz,
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, key: &str, freq_hz: f64, snr_db: f32, shift: i64, info: T) {
        for entry in self.entries.iter_mut() {
            if entry.key == key && (entry.freq_hz - freq_hz).abs() < self.tolerance_hz {
                entry.occurrence += 1;
                entry.shift_acc += shift;
                if snr_db > entry.snr_db {
                    entry.snr_db = snr_db;
                }
                return;
            }
        }
        self.entries.push(SpotEntry {
            key: key.to_string(),
            freq_hz,
            occurrence: 1,
            shift_acc: shift,
            snr_db,
            info,
        });
    }

    pub fn entries(&self) -> &[SpotEntry<T>] {
        &self.entries
    }
}
