//! Baseband sample source and window capture.
//!
//! The decode binaries read interleaved little-endian `f32` I/Q pairs from
//! stdin at the mode's baseband rate. Capture aligns to the mode cadence
//! by discarding samples until the wall clock crosses a period boundary.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

pub fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub struct SampleSource<R: Read> {
    reader: R,
}

impl<R: Read> SampleSource<R> {
    pub fn new(reader: R) -> SampleSource<R> {
        SampleSource { reader }
    }

    /// Fill `buf` with floats. An empty read sleeps one second and retries
    /// once so a stalled upstream pipe gets a chance to refill; a second
    /// empty read reports however much arrived.
    pub fn read_samples(&mut self, buf: &mut [f32]) -> io::Result<usize> {
        let mut filled = 0usize;
        let mut retried = false;
        let mut bytes = [0u8; 4096];
        while filled < buf.len() {
            let want = ((buf.len() - filled) * 4).min(bytes.len());
            // fill whole floats; short reads splitting a float mid-way are
            // re-read until the chunk completes or the pipe ends
            let mut have = 0usize;
            while have < want {
                let got = self.reader.read(&mut bytes[have..want])?;
                if got == 0 {
                    break;
                }
                have += got;
            }
            if have == 0 {
                if retried {
                    break;
                }
                warn!("input read was empty, sleeping before retry");
                thread::sleep(Duration::from_secs(1));
                retried = true;
                continue;
            }
            retried = false;
            let mut cursor = &bytes[..have - have % 4];
            while !cursor.is_empty() {
                buf[filled] = cursor.read_f32::<LittleEndian>()?;
                filled += 1;
            }
        }
        Ok(filled)
    }

    /// Discard `count` floats (for the unused tail of each period).
    pub fn discard(&mut self, count: usize) -> io::Result<()> {
        let mut remaining = count;
        let mut sink = [0f32; 512];
        while remaining > 0 {
            let chunk = remaining.min(sink.len());
            let got = self.read_samples(&mut sink[..chunk])?;
            if got == 0 {
                break;
            }
            remaining -= got;
        }
        Ok(())
    }

    /// Consume I/Q pairs until the wall clock sits on a period boundary,
    /// so the first captured window starts at the top of a slot.
    pub fn align_to_cadence(&mut self, period_seconds: u64) -> io::Result<()> {
        if epoch_seconds() % period_seconds == 0 {
            // already on the boundary: skip into the window so the next
            // boundary starts a clean capture
            thread::sleep(Duration::from_secs(2));
        }
        let mut pair = [0f32; 2];
        while epoch_seconds() % period_seconds != 0 {
            if self.read_samples(&mut pair)? == 0 {
                break;
            }
        }
        debug!("aligned to {period_seconds} s cadence");
        Ok(())
    }
}

/// Write a captured window to disk: a 14-byte reserved header, a 4-byte
/// type word, an 8-byte frequency word, then the raw samples.
pub fn write_window_dump(path: &Path, samples: &[f32]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(&[0u8; 14])?;
    out.write_u32::<LittleEndian>(0)?;
    out.write_u64::<LittleEndian>(0)?;
    for &sample in samples {
        out.write_f32::<LittleEndian>(sample)?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn float_bytes(values: &[f32]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for &v in values {
            bytes.write_f32::<LittleEndian>(v).unwrap();
        }
        bytes
    }

    #[test]
    fn reads_interleaved_floats() {
        let data = float_bytes(&[1.0, -2.0, 3.5, 0.25]);
        let mut source = SampleSource::new(Cursor::new(data));
        let mut buf = [0f32; 4];
        assert_eq!(source.read_samples(&mut buf).unwrap(), 4);
        assert_eq!(buf, [1.0, -2.0, 3.5, 0.25]);
    }

    #[test]
    fn short_input_reports_partial_fill() {
        let data = float_bytes(&[9.0, 8.0]);
        let mut source = SampleSource::new(Cursor::new(data));
        let mut buf = [0f32; 6];
        assert_eq!(source.read_samples(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[9.0, 8.0]);
    }

    #[test]
    fn discard_skips_ahead() {
        let data = float_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut source = SampleSource::new(Cursor::new(data));
        source.discard(3).unwrap();
        let mut buf = [0f32; 2];
        assert_eq!(source.read_samples(&mut buf).unwrap(), 2);
        assert_eq!(buf, [4.0, 5.0]);
    }

    #[test]
    fn dump_layout() {
        let dir = std::env::temp_dir().join("rustyspot-dump-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("w0.bin");
        write_window_dump(&path, &[1.0f32, 2.0]).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 14 + 4 + 8 + 8);
        assert!(bytes[..26].iter().all(|&b| b == 0));
        std::fs::remove_file(&path).unwrap();
    }
}
