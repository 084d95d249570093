//! PSK Reporter spot submission.
//!
//! Spots go out as IPFIX-style UDP datagrams: a 16-byte header, the
//! receiver and sender record templates, one receiver record, then one
//! sender record per pending spot. The pending queue is flushed at most
//! every five minutes, and each callsign is reported at most once per
//! hour.

use byteorder::{BigEndian, WriteBytesExt};
use std::collections::{HashMap, VecDeque};
use std::net::{ToSocketAddrs, UdpSocket};
use tracing::{debug, info, warn};

const REPORT_HOST: &str = "report.pskreporter.info:4739";
const VERSION: &str = "0.1ft8window";
const MODE: &str = "FT8";

/// Seconds between batch flushes.
const FLUSH_INTERVAL: u64 = 300;
/// Seconds a callsign stays suppressed after being reported.
const SUPPRESS_INTERVAL: u64 = 3600;

/// Packet header template: version 10, length and export time patched in,
/// sequence number and correlation ID after that.
const PSK_HEADER: [u8; 16] = [
    0x00, 0x0A, 0x00, 0xAC, 0x47, 0x95, 0x32, 0x72, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
    0x00,
];

/// Receiver record template set (callsign, locator, decoder version).
const RECEIVER_FMT: [u8; 36] = [
    0x00, 0x03, 0x00, 0x24, 0x99, 0x92, 0x00, 0x03, 0x00, 0x00, 0x80, 0x02, 0xFF, 0xFF, 0x00,
    0x00, 0x76, 0x8F, 0x80, 0x04, 0xFF, 0xFF, 0x00, 0x00, 0x76, 0x8F, 0x80, 0x08, 0xFF, 0xFF,
    0x00, 0x00, 0x76, 0x8F, 0x00, 0x00,
];

/// Sender record template set (callsign, frequency, mode, information
/// source, flow start).
const SENDER_FMT: [u8; 44] = [
    0x00, 0x02, 0x00, 0x2C, 0x99, 0x93, 0x00, 0x05, 0x80, 0x01, 0xFF, 0xFF, 0x00, 0x00, 0x76,
    0x8F, 0x80, 0x05, 0x00, 0x04, 0x00, 0x00, 0x76, 0x8F, 0x80, 0x0A, 0xFF, 0xFF, 0x00, 0x00,
    0x76, 0x8F, 0x80, 0x0B, 0x00, 0x01, 0x00, 0x00, 0x76, 0x8F, 0x00, 0x96, 0x00, 0x04,
];

const RECEIVER_DATA_HEADER: [u8; 4] = [0x99, 0x92, 0x00, 0x00];
const SENDER_DATA_HEADER: [u8; 4] = [0x99, 0x93, 0x00, 0x00];

struct PendingSpot {
    sender: String,
    freq_hz: u32,
    time_start: u32,
}

pub struct PskReporter {
    socket: Option<UdpSocket>,
    reporter_call: String,
    reporter_locator: String,
    sequence: u32,
    correlation_id: u32,
    /// Callsign -> epoch of the last queued report.
    observed: HashMap<String, u64>,
    pending: VecDeque<PendingSpot>,
    last_flush: u64,
}

impl PskReporter {
    /// Resolve and connect the reporting socket. Resolution walks every
    /// address the lookup returns; with no usable address the reporter
    /// stays in a disconnected state and only logs.
    pub fn new(reporter_call: &str, reporter_locator: &str) -> PskReporter {
        let socket = Self::connect();
        if socket.is_none() {
            warn!("no connection to {REPORT_HOST}; spots will not be reported");
        }
        PskReporter {
            socket,
            reporter_call: reporter_call.to_string(),
            reporter_locator: reporter_locator.to_string(),
            sequence: 0,
            correlation_id: rand::random(),
            observed: HashMap::new(),
            pending: VecDeque::new(),
            last_flush: 0,
        }
    }

    fn connect() -> Option<UdpSocket> {
        let addrs = match REPORT_HOST.to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                warn!("address lookup for {REPORT_HOST} failed: {e}");
                return None;
            }
        };
        for addr in addrs {
            let bind = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
            if let Ok(socket) = UdpSocket::bind(bind) {
                if socket.connect(addr).is_ok() {
                    debug!("reporting to {addr}");
                    return Some(socket);
                }
            }
        }
        None
    }

    /// Queue a decoded message for reporting when it is a plain
    /// `CQ <call> <grid>` style transmission, then flush if due.
    ///
    /// `freq_hz` is the absolute frequency, `time_start` the window start
    /// epoch, `now` the current epoch.
    pub fn report(&mut self, message: &str, freq_hz: f64, time_start: u64, now: u64) {
        let tokens: Vec<&str> = message.split_whitespace().collect();
        if tokens.first() != Some(&"CQ") {
            debug!("not a CQ, not reported: {message}");
        } else if tokens.len() < 3 {
            debug!("too few message tokens to report: {message}");
        } else {
            let locator = tokens[tokens.len() - 1];
            let sender = tokens[tokens.len() - 2];
            let locator_ok = locator.len() >= 4
                && locator[..2].chars().all(|c| c.is_ascii_uppercase())
                && locator[2..4].chars().all(|c| c.is_ascii_digit());
            if !locator_ok {
                debug!("locator did not parse, not reported: {message}");
            } else if sender.len() <= 3 || sender.starts_with('<') {
                debug!("suspect sender callsign, not reported: {message}");
            } else if self.observed.contains_key(sender) {
                info!("suppressing a spot report of {sender}");
            } else {
                self.observed.insert(sender.to_string(), now);
                info!(
                    "will report {sender} at {freq_hz:.0} Hz, signal time {time_start}"
                );
                self.pending.push_back(PendingSpot {
                    sender: sender.to_string(),
                    freq_hz: freq_hz as u32,
                    time_start: time_start as u32,
                });
            }
            self.observed
                .retain(|_, &mut seen| seen + SUPPRESS_INTERVAL >= now);
        }

        if now > self.last_flush + FLUSH_INTERVAL && !self.pending.is_empty() {
            self.flush(now);
        }
    }

    /// Build and send one datagram carrying every pending spot. Pending
    /// entries survive a send failure and ride the next flush.
    pub fn flush(&mut self, now: u64) {
        self.last_flush = now;
        self.sequence += 1;
        let packet = self.build_packet(now);

        match &self.socket {
            Some(socket) => match socket.send(&packet) {
                Ok(bytes) => {
                    info!(
                        "sent {bytes} bytes carrying {} spots",
                        self.pending.len()
                    );
                    self.pending.clear();
                }
                Err(e) => warn!("spot report send failed, keeping queue: {e}"),
            },
            None => warn!("no reporting socket, keeping {} spots", self.pending.len()),
        }
    }

    fn build_packet(&self, now: u64) -> Vec<u8> {
        let mut packet = Vec::with_capacity(512);
        packet.extend_from_slice(&PSK_HEADER);
        packet[4..8].copy_from_slice(&(now as u32).to_be_bytes());
        packet[8..12].copy_from_slice(&self.sequence.to_be_bytes());
        packet[12..16].copy_from_slice(&self.correlation_id.to_be_bytes());
        packet.extend_from_slice(&RECEIVER_FMT);
        packet.extend_from_slice(&SENDER_FMT);

        // receiver record
        let mut receiver = Vec::with_capacity(64);
        receiver.extend_from_slice(&RECEIVER_DATA_HEADER);
        push_string(&mut receiver, &self.reporter_call);
        push_string(&mut receiver, &self.reporter_locator);
        push_string(&mut receiver, VERSION);
        pad_to_word(&mut receiver);
        let len = receiver.len() as u16;
        receiver[2..4].copy_from_slice(&len.to_be_bytes());
        packet.extend_from_slice(&receiver);

        // sender records
        let mut senders = Vec::with_capacity(32 * self.pending.len());
        senders.extend_from_slice(&SENDER_DATA_HEADER);
        for spot in &self.pending {
            push_string(&mut senders, &spot.sender);
            senders.write_u32::<BigEndian>(spot.freq_hz).unwrap();
            push_string(&mut senders, MODE);
            senders.push(1); // information source: automatic
            senders.write_u32::<BigEndian>(spot.time_start).unwrap();
        }
        pad_to_word(&mut senders);
        let len = senders.len() as u16;
        senders[2..4].copy_from_slice(&len.to_be_bytes());
        packet.extend_from_slice(&senders);

        let total = packet.len() as u16;
        packet[2..4].copy_from_slice(&total.to_be_bytes());
        packet
    }

    /// Number of spots waiting for the next flush.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn push_string(buf: &mut Vec<u8>, text: &str) {
    buf.push(text.len() as u8);
    buf.extend_from_slice(text.as_bytes());
}

fn pad_to_word(buf: &mut Vec<u8>) {
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reporter() -> PskReporter {
        // keep unit tests off the network
        PskReporter {
            socket: None,
            reporter_call: "KG5YJE/1".to_string(),
            reporter_locator: "EM13".to_string(),
            sequence: 0,
            correlation_id: 0x11223344,
            observed: HashMap::new(),
            pending: VecDeque::new(),
            last_flush: 0,
        }
    }

    #[test]
    fn only_cq_messages_are_queued() {
        let mut r = reporter();
        r.report("KG5YJE K1ABC -10", 14_074_000.0, 1000, 1000);
        assert_eq!(r.pending_len(), 0);
        r.report("CQ K1ABC EM13", 14_074_000.0, 1000, 1000);
        assert_eq!(r.pending_len(), 1);
    }

    #[test]
    fn bad_locator_or_sender_is_rejected() {
        let mut r = reporter();
        r.report("CQ K1ABC 9Z99", 14_074_000.0, 1000, 1000);
        r.report("CQ <hash> EM13", 14_074_000.0, 1000, 1000);
        r.report("CQ DX EM13", 14_074_000.0, 1000, 1000);
        assert_eq!(r.pending_len(), 0);
    }

    #[test]
    fn repeated_callsigns_are_suppressed_for_an_hour() {
        let mut r = reporter();
        r.report("CQ K1ABC EM13", 14_074_000.0, 1000, 1000);
        r.report("CQ K1ABC EM13", 14_074_000.0, 1015, 1015);
        assert_eq!(r.pending_len(), 1);

        // an hour later the suppression entry has been evicted
        let later = 1000 + SUPPRESS_INTERVAL + 1;
        r.report("CQ W9XYZ FN42", 14_074_000.0, later, later);
        r.report("CQ K1ABC EM13", 14_074_000.0, later, later);
        assert_eq!(r.pending_len(), 3);
    }

    #[test]
    fn packet_layout() {
        let mut r = reporter();
        r.report("CQ K1ABC EM13", 14_074_123.0, 1005, 1000);
        let packet = r.build_packet(2000);

        // header: version 10, patched length, export time, sequence, id
        assert_eq!(&packet[..2], &[0x00, 0x0A]);
        let total = u16::from_be_bytes([packet[2], packet[3]]) as usize;
        assert_eq!(total, packet.len());
        assert_eq!(&packet[4..8], &2000u32.to_be_bytes());
        assert_eq!(&packet[12..16], &0x11223344u32.to_be_bytes());

        // templates follow verbatim
        assert_eq!(&packet[16..52], &RECEIVER_FMT);
        assert_eq!(&packet[52..96], &SENDER_FMT);

        // receiver record starts with its set id and is word aligned
        assert_eq!(&packet[96..98], &[0x99, 0x92]);
        let rec_len = u16::from_be_bytes([packet[98], packet[99]]) as usize;
        assert_eq!(rec_len % 4, 0);

        // sender record set holds the callsign, frequency and start time
        let s = 96 + rec_len;
        assert_eq!(&packet[s..s + 2], &[0x99, 0x93]);
        let body = &packet[s + 4..];
        assert_eq!(body[0] as usize, "K1ABC".len());
        assert_eq!(&body[1..6], b"K1ABC");
        assert_eq!(&body[6..10], &14_074_123u32.to_be_bytes());
        assert_eq!(body[10] as usize, 3);
        assert_eq!(&body[11..14], b"FT8");
        assert_eq!(body[14], 1);
        assert_eq!(&body[15..19], &1005u32.to_be_bytes());
    }

    #[test]
    fn flush_without_socket_keeps_pending() {
        let mut r = reporter();
        r.report("CQ K1ABC EM13", 14_074_000.0, 1000, 1000);
        r.flush(2000);
        assert_eq!(r.pending_len(), 1);
    }
}
