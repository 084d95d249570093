//! Render a decoded 77-bit payload as message text.
//!
//! The message type lives in the trailing i3 field (with n3 selecting the
//! sub-type when i3 is zero). CRC and LDPC checks have already happened by
//! the time a payload reaches this point.

use bitvec::prelude::*;

use crate::constants::FREE_TEXT_ALPHABET;

use super::callsign::{unpack_c58, unpack_callsign};
use super::error::DecodeError;
use super::grid::unpack_grid;
use super::hash_cache::CallsignHashCache;

/// ARRL RTTY Round-Up states and provinces (serial values 8001..).
const RU_STATES: [&str; 65] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY", "NB", "NS", "QC", "ON", "MB", "SK", "AB", "BC", "NWT", "NF",
    "LB", "NU", "YT", "PEI", "DC",
];

/// ARRL Field Day sections (1-based).
const FD_SECTIONS: [&str; 84] = [
    "AB", "AK", "AL", "AR", "AZ", "BC", "CO", "CT", "DE", "EB", "EMA", "ENY", "EPA", "EWA",
    "GA", "GTA", "IA", "ID", "IL", "IN", "KS", "KY", "LA", "LAX", "MAR", "MB", "MDC", "ME",
    "MI", "MN", "MO", "MS", "MT", "NC", "ND", "NE", "NFL", "NH", "NL", "NLI", "NM", "NNJ",
    "NNY", "NT", "NTX", "NV", "OH", "OK", "ONE", "ONN", "ONS", "OR", "ORG", "PAC", "PR", "QC",
    "RI", "SB", "SC", "SCV", "SD", "SDG", "SF", "SFL", "SJV", "SK", "SNJ", "STX", "SV", "TN",
    "UT", "VA", "VI", "VT", "WCF", "WI", "WMA", "WNY", "WPA", "WTX", "WV", "WWA", "WY", "DX",
];

/// MSB-first integer view of `bits[start..start + len]`.
fn un(bits: &BitSlice<u8, Msb0>, start: usize, len: usize) -> u64 {
    bits[start..start + len]
        .iter()
        .fold(0u64, |acc, b| (acc << 1) | *b as u64)
}

fn un128(bits: &BitSlice<u8, Msb0>, start: usize, len: usize) -> u128 {
    bits[start..start + len]
        .iter()
        .fold(0u128, |acc, b| (acc << 1) | *b as u128)
}

/// Unpack the first 77 bits of a decoded payload into message text.
pub fn unpack77(
    bits: &BitSlice<u8, Msb0>,
    cache: &mut CallsignHashCache,
) -> Result<String, DecodeError> {
    if bits.len() < 77 {
        return Err(DecodeError::ShortInput {
            field: "payload77",
            needed: 77,
            got: bits.len(),
        });
    }

    let i3 = un(bits, 74, 3);
    let n3 = un(bits, 71, 3);

    match (i3, n3) {
        (0, 0) => Ok(unpack_free_text(bits)),
        (0, 3) | (0, 4) => unpack_field_day(bits, n3, cache),
        (1, _) | (2, _) | (5, _) => unpack_standard(bits, i3, cache),
        (3, _) => unpack_contest(bits, cache),
        (4, _) => unpack_hash_call(bits, cache),
        _ => Ok(format!("i3={i3} n3={n3}")),
    }
}

/// Free text: 71 bits, 13 characters, base 42, last character in the
/// least-significant position.
fn unpack_free_text(bits: &BitSlice<u8, Msb0>) -> String {
    let alphabet: Vec<char> = FREE_TEXT_ALPHABET.chars().collect();
    let mut x = un128(bits, 0, 71);
    let mut chars = [' '; 13];
    for i in (0..13).rev() {
        chars[i] = alphabet[(x % 42) as usize];
        x /= 42;
    }
    chars.iter().collect::<String>().trim().to_string()
}

/// Standard exchange: `c28 r1 c28 r1 R1 g15 i3`.
fn unpack_standard(
    bits: &BitSlice<u8, Msb0>,
    i3: u64,
    cache: &mut CallsignHashCache,
) -> Result<String, DecodeError> {
    let call1 = unpack_callsign(un(bits, 0, 28) as u32, cache)?;
    let rover1 = bits[28];
    let call2 = unpack_callsign(un(bits, 29, 28) as u32, cache)?;
    let rover2 = bits[57];
    let ack = bits[58];
    let grid = unpack_grid(un(bits, 59, 15) as u32, ack)?;

    let pr = if i3 == 1 { "/R" } else { "/P" };
    let mut msg = String::new();
    msg.push_str(&call1);
    if rover1 {
        msg.push_str(pr);
    }
    msg.push(' ');
    msg.push_str(&call2);
    if rover2 {
        msg.push_str(pr);
    }
    if !grid.is_empty() {
        msg.push(' ');
        msg.push_str(&grid);
    }
    Ok(msg)
}

/// RTTY Round-Up: `t1 c28 c28 R1 r3 s13`.
fn unpack_contest(
    bits: &BitSlice<u8, Msb0>,
    cache: &mut CallsignHashCache,
) -> Result<String, DecodeError> {
    let tu = bits[0];
    let call1 = unpack_callsign(un(bits, 1, 28) as u32, cache)?;
    let call2 = unpack_callsign(un(bits, 29, 28) as u32, cache)?;
    let r = bits[57];
    let rst = 529 + 10 * un(bits, 58, 3);
    let serial = un(bits, 61, 13);

    let exchange = if serial > 8000 && ((serial - 8001) as usize) < RU_STATES.len() {
        RU_STATES[(serial - 8001) as usize].to_string()
    } else {
        format!("{serial:04}")
    };

    let mut msg = String::new();
    if tu {
        msg.push_str("TU; ");
    }
    msg.push_str(&call1);
    msg.push(' ');
    msg.push_str(&call2);
    msg.push(' ');
    if r {
        msg.push_str("R ");
    }
    msg.push_str(&format!("{rst} {exchange}"));
    Ok(msg)
}

/// ARRL Field Day: `c28 c28 R1 n4 k3 S7`.
fn unpack_field_day(
    bits: &BitSlice<u8, Msb0>,
    n3: u64,
    cache: &mut CallsignHashCache,
) -> Result<String, DecodeError> {
    let call1 = unpack_callsign(un(bits, 0, 28) as u32, cache)?;
    let call2 = unpack_callsign(un(bits, 28, 28) as u32, cache)?;
    let r = bits[56];
    let mut transmitters = un(bits, 57, 4);
    if n3 == 4 {
        transmitters += 16;
    }
    let class = un(bits, 61, 3);
    let section = un(bits, 64, 7);

    let mut msg = String::new();
    msg.push_str(&call1);
    msg.push(' ');
    msg.push_str(&call2);
    msg.push(' ');
    if r {
        msg.push_str("R ");
    }
    msg.push_str(&format!(
        "{}{}",
        transmitters + 1,
        (b'A' + class as u8) as char
    ));
    if section >= 1 && (section as usize) <= FD_SECTIONS.len() {
        msg.push(' ');
        msg.push_str(FD_SECTIONS[section as usize - 1]);
    }
    Ok(msg)
}

/// Non-standard callsign exchange: `h12 c58 h1 r2 c1`.
fn unpack_hash_call(
    bits: &BitSlice<u8, Msb0>,
    cache: &mut CallsignHashCache,
) -> Result<String, DecodeError> {
    let n58 = un(bits, 12, 58);
    let call = unpack_c58(n58);
    cache.store(&call);

    if bits[73] {
        return Ok(format!("CQ {call}"));
    }

    let h12 = un(bits, 0, 12) as u16;
    let other = cache
        .lookup_12(h12)
        .map(str::to_string)
        .unwrap_or_else(|| "<hash>".to_string());

    let swap = bits[70];
    let mut msg = if swap {
        format!("{call} {other}")
    } else {
        format!("{other} {call}")
    };
    match un(bits, 71, 2) {
        1 => msg.push_str(" RRR"),
        2 => msg.push_str(" RR73"),
        3 => msg.push_str(" 73"),
        _ => {}
    }
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::compose::{compose_standard, encode_c28, encode_i3, encode_n3};
    use crate::message::compose::{encode_ack, encode_g15, encode_rover};

    fn roundtrip_standard(call1: &str, call2: &str, grid: &str) -> String {
        let payload = compose_standard(call1, "", call2, "", "", grid, 1).unwrap();
        let mut cache = CallsignHashCache::new();
        unpack77(payload.as_bits(), &mut cache).unwrap()
    }

    #[test]
    fn cq_round_trip() {
        assert_eq!(roundtrip_standard("CQ", "KG5YJE", "EM13"), "CQ KG5YJE EM13");
        assert_eq!(roundtrip_standard("K1ABC", "W9XYZ", "RR73"), "K1ABC W9XYZ RR73");
        assert_eq!(roundtrip_standard("CQ", "N0YPR", ""), "CQ N0YPR");
    }

    #[test]
    fn rover_and_report_flags() {
        let payload = compose_standard("K1ABC", "/R", "W9XYZ", "", "R", "-12", 1).unwrap();
        let mut cache = CallsignHashCache::new();
        assert_eq!(
            unpack77(payload.as_bits(), &mut cache).unwrap(),
            "K1ABC/R W9XYZ R-12"
        );
    }

    #[test]
    fn decoded_calls_populate_the_cache() {
        let payload = compose_standard("CQ", "", "KG5YJE", "", "", "EM13", 1).unwrap();
        let mut cache = CallsignHashCache::new();
        unpack77(payload.as_bits(), &mut cache).unwrap();
        assert_eq!(
            cache.lookup_22(crate::message::hash22("KG5YJE")),
            Some("KG5YJE")
        );
    }

    #[test]
    fn unknown_type_renders_type_tag() {
        // i3 = 7 is unassigned
        let payload = compose_standard("CQ", "", "KG5YJE", "", "", "EM13", 7).unwrap();
        let mut cache = CallsignHashCache::new();
        assert_eq!(unpack77(payload.as_bits(), &mut cache).unwrap(), "i3=7 n3=0");
    }

    #[test]
    fn short_input_is_rejected() {
        let field = encode_c28("CQ").unwrap();
        let mut cache = CallsignHashCache::new();
        assert!(matches!(
            unpack77(field.as_bits(), &mut cache),
            Err(DecodeError::ShortInput { .. })
        ));
    }

    #[test]
    fn free_text_unpacks() {
        // encode "TNX BOB 73 GL" by hand: base-42 over 71 bits
        let text = "TNX BOB 73 GL";
        let alphabet: Vec<char> = FREE_TEXT_ALPHABET.chars().collect();
        let mut value: u128 = 0;
        for ch in text.chars() {
            let idx = alphabet.iter().position(|&c| c == ch).unwrap() as u128;
            value = value * 42 + idx;
        }
        let mut bits = bitarr![u8, Msb0; 0; 77];
        for i in 0..71 {
            bits.set(i, (value >> (70 - i)) & 1 != 0);
        }
        // i3 = 0, n3 = 0 already zero
        let mut cache = CallsignHashCache::new();
        assert_eq!(unpack77(&bits[..77], &mut cache).unwrap(), text);
    }

    #[test]
    fn hash_call_exchange() {
        // CQ PJ4/K1ABC  (type 4, CQ flag set)
        let mut bits = bitarr![u8, Msb0; 0; 77];
        let n58 = crate::message::callsign::pack_c58("PJ4/K1ABC").unwrap();
        for i in 0..58 {
            bits.set(12 + i, (n58 >> (57 - i)) & 1 != 0);
        }
        bits.set(73, true); // CQ
        for i in 0..3 {
            bits.set(74 + i, (4u8 >> (2 - i)) & 1 != 0); // i3 = 4
        }
        let mut cache = CallsignHashCache::new();
        assert_eq!(
            unpack77(&bits[..77], &mut cache).unwrap(),
            "CQ PJ4/K1ABC"
        );
        // the full call is now cached for later h12 references
        assert_eq!(
            cache.lookup_12(crate::message::hash12("PJ4/K1ABC")),
            Some("PJ4/K1ABC")
        );
    }

    #[test]
    fn field_encoders_agree_with_unpack_tables() {
        assert_eq!(encode_i3(4).unwrap().value(), 4);
        assert_eq!(encode_n3(3).unwrap().value(), 3);
        assert_eq!(encode_rover("/R").unwrap().value(), 1);
        assert_eq!(encode_ack("R").unwrap().value(), 1);
        assert_eq!(encode_g15("73").unwrap().value(), 32404);
    }
}
