//! Callsign packing and unpacking (c28 and c58 fields).
//!
//! Implements the standard 28-bit callsign encoding: reserved tokens,
//! directed CQ, a 22-bit hash window for non-standard calls, and the
//! six-character A1/A2/A3/A4 pattern, plus the 58-bit 11-character
//! base-38 form used by the non-standard message type.

use crate::constants::{A1, A2, A3, A4, A5, HASH_MULTIPLIER, MAX22, NTOKENS};

use super::error::DecodeError;
use super::hash_cache::CallsignHashCache;

fn index_in(alphabet: &str, ch: char) -> Option<u64> {
    alphabet.find(ch).map(|i| i as u64)
}

/// WSJT-X callsign hash: pad to 11 characters, read as a base-38 number
/// over A5, multiply, and keep the top `m` bits.
fn ihashcall(callsign: &str, m: u32) -> u32 {
    let mut padded = callsign.trim().to_uppercase();
    while padded.len() < 11 {
        padded.push(' ');
    }
    padded.truncate(11);

    let mut x: u64 = 0;
    for ch in padded.chars() {
        let j = index_in(A5, ch).unwrap_or(0);
        x = x.wrapping_mul(38).wrapping_add(j);
    }
    (x.wrapping_mul(HASH_MULTIPLIER) >> (64 - m)) as u32
}

pub fn hash10(callsign: &str) -> u16 {
    ihashcall(callsign, 10) as u16
}

pub fn hash12(callsign: &str) -> u16 {
    ihashcall(callsign, 12) as u16
}

pub fn hash22(callsign: &str) -> u32 {
    ihashcall(callsign, 22)
}

/// Pack a callsign into its 28-bit value.
///
/// Handles the reserved tokens, directed CQ (`CQ 000`..`CQ 999`,
/// `CQ A`..`CQ ZZZZ`), bracketed non-standard calls (22-bit hash), and the
/// standard six-character pattern. Slash suffixes `/P` and `/R` are
/// stripped (they travel in the r1 flag); a prefix before the slash is
/// stripped to the base call.
pub fn pack_callsign(callsign: &str) -> Result<u32, DecodeError> {
    match callsign {
        "DE" => return Ok(0),
        "QRZ" => return Ok(1),
        "CQ" => return Ok(2),
        _ => {}
    }

    if let Some(suffix) = callsign.strip_prefix("CQ ") {
        return pack_directed_cq(suffix);
    }

    if callsign.starts_with('<') && callsign.ends_with('>') {
        let inner = &callsign[1..callsign.len() - 1];
        return Ok(NTOKENS + hash22(inner));
    }

    let mut base_call = callsign;
    if callsign.contains('/') {
        let parts: Vec<&str> = callsign.split('/').collect();
        if parts.len() != 2 {
            return Err(DecodeError::BadChar {
                field: "c28",
                ch: '/',
            });
        }
        base_call = if parts[1].eq_ignore_ascii_case("P") || parts[1].eq_ignore_ascii_case("R") {
            parts[0]
        } else {
            parts[1]
        };
    }

    let call = base_call.to_uppercase();
    let chars: Vec<char> = call.chars().collect();
    let n = chars.len();
    if !(3..=6).contains(&n) {
        return Err(DecodeError::ShortInput {
            field: "c28",
            needed: 3,
            got: n,
        });
    }

    // the area digit sits in position 2 or 3
    let iarea = (1..n)
        .rev()
        .find(|&i| chars[i].is_ascii_digit())
        .filter(|&i| i <= 2)
        .ok_or(DecodeError::OutOfRange {
            field: "c28",
            value: 0,
        })?;

    let nplet = chars[..iarea].iter().filter(|c| c.is_ascii_alphabetic()).count();
    let npdig = chars[..iarea].iter().filter(|c| c.is_ascii_digit()).count();
    let nslet = chars[iarea + 1..]
        .iter()
        .filter(|c| c.is_ascii_alphabetic())
        .count();
    if nplet == 0 || npdig >= iarea || nslet > 3 {
        return Err(DecodeError::OutOfRange {
            field: "c28",
            value: 0,
        });
    }

    // right-pad to six characters, shifting one-letter prefixes right so
    // the digit lands in position 2
    let padded = if iarea == 1 {
        format!(" {call:<5}")
    } else {
        format!("{call:<6}")
    };
    let c: Vec<char> = padded.chars().collect();

    let bad = |ch| DecodeError::BadChar { field: "c28", ch };
    let i1 = index_in(A1, c[0]).ok_or_else(|| bad(c[0]))?;
    let i2 = index_in(A2, c[1]).ok_or_else(|| bad(c[1]))?;
    let i3 = index_in(A3, c[2]).ok_or_else(|| bad(c[2]))?;
    let i4 = index_in(A4, c[3]).ok_or_else(|| bad(c[3]))?;
    let i5 = index_in(A4, c[4]).ok_or_else(|| bad(c[4]))?;
    let i6 = index_in(A4, c[5]).ok_or_else(|| bad(c[5]))?;

    let n28 = ((((i1 * 36 + i2) * 10 + i3) * 27 + i4) * 27 + i5) * 27 + i6;
    Ok(n28 as u32 + NTOKENS + MAX22)
}

fn pack_directed_cq(suffix: &str) -> Result<u32, DecodeError> {
    if suffix.chars().all(|c| c.is_ascii_digit()) && !suffix.is_empty() {
        let n: u32 = suffix.parse().map_err(|_| DecodeError::OutOfRange {
            field: "c28",
            value: 0,
        })?;
        if n > 999 {
            return Err(DecodeError::OutOfRange {
                field: "c28",
                value: n as u64,
            });
        }
        return Ok(3 + n);
    }

    let upper = suffix.to_uppercase();
    let len = upper.len();
    if len == 0 || len > 4 || !upper.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(DecodeError::OutOfRange {
            field: "c28",
            value: len as u64,
        });
    }
    let mut value = 0u32;
    for (i, ch) in upper.chars().enumerate() {
        let idx = ch as u32 - 'A' as u32 + 1;
        value += idx * 27u32.pow((len - 1 - i) as u32);
    }
    Ok(1003 + value)
}

/// Unpack a 28-bit callsign value.
///
/// Standard callsigns are stored in the hash cache as a side effect; hash
/// references are resolved through the cache and render as `<CALL>`, or
/// `<hash>` when the table has no entry.
pub fn unpack_callsign(n28: u32, cache: &mut CallsignHashCache) -> Result<String, DecodeError> {
    match n28 {
        0 => return Ok("DE".to_string()),
        1 => return Ok("QRZ".to_string()),
        2 => return Ok("CQ".to_string()),
        _ => {}
    }

    if n28 <= 1002 {
        return Ok(format!("CQ {:03}", n28 - 3));
    }

    if n28 < NTOKENS {
        return unpack_directed_cq(n28 - 1003);
    }

    let x = n28 - NTOKENS;
    if x < MAX22 {
        return Ok(match cache.lookup_22(x) {
            Some(call) => format!("<{call}>"),
            None => "<hash>".to_string(),
        });
    }

    let mut n = (x - MAX22) as u64;
    let a4: Vec<char> = A4.chars().collect();
    let mut chars = [' '; 6];
    chars[5] = a4[(n % 27) as usize];
    n /= 27;
    chars[4] = a4[(n % 27) as usize];
    n /= 27;
    chars[3] = a4[(n % 27) as usize];
    n /= 27;
    chars[2] = A3.chars().nth((n % 10) as usize).unwrap_or('0');
    n /= 10;
    let i2 = (n % 36) as usize;
    n /= 36;
    let i1 = n as usize;
    if i1 >= A1.len() {
        return Err(DecodeError::OutOfRange {
            field: "c28",
            value: n28 as u64,
        });
    }
    chars[1] = A2.chars().nth(i2).unwrap();
    chars[0] = A1.chars().nth(i1).unwrap();

    let call: String = chars.iter().collect::<String>().trim().to_string();
    cache.store(&call);
    Ok(call)
}

fn unpack_directed_cq(value: u32) -> Result<String, DecodeError> {
    if value == 0 {
        return Ok("CQ".to_string());
    }
    let len = if value <= 26 {
        1
    } else if value < 27 + 27 * 26 {
        2
    } else if value < 27 + 27 * 26 + 27 * 27 * 26 {
        3
    } else {
        4
    };
    let mut chars = Vec::with_capacity(len);
    let mut remaining = value;
    for i in (0..len).rev() {
        let divisor = 27u32.pow(i as u32);
        let idx = remaining / divisor;
        remaining %= divisor;
        match idx {
            0 => chars.push(' '),
            1..=26 => chars.push((b'A' + idx as u8 - 1) as char),
            _ => {
                return Err(DecodeError::OutOfRange {
                    field: "c28",
                    value: value as u64,
                })
            }
        }
    }
    let suffix: String = chars.iter().collect();
    Ok(format!("CQ {}", suffix.trim_start()))
}

/// Pack an 11-character non-standard callsign into its 58-bit base-38 value.
pub fn pack_c58(callsign: &str) -> Result<u64, DecodeError> {
    if callsign.len() >= 12 {
        return Err(DecodeError::ShortInput {
            field: "c58",
            needed: 11,
            got: callsign.len(),
        });
    }
    let upper = callsign.to_uppercase();
    let mut chars: Vec<char> = upper.chars().collect();
    while chars.len() < 11 {
        chars.push(' ');
    }
    let mut binary = 0u64;
    for &ch in &chars {
        let idx = index_in(A5, ch).ok_or(DecodeError::BadChar { field: "c58", ch })?;
        binary = binary * 38 + idx;
    }
    Ok(binary)
}

/// Unpack a 58-bit base-38 value into an 11-character callsign, trimmed.
pub fn unpack_c58(mut n58: u64) -> String {
    let a5: Vec<char> = A5.chars().collect();
    let mut chars = [' '; 11];
    for i in (0..11).rev() {
        chars[i] = a5[(n58 % 38) as usize];
        n58 /= 38;
    }
    chars.iter().collect::<String>().trim().to_string()
}
