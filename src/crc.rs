//! CRC-14 for FT8 payloads.
//!
//! The checksum is computed over the 77-bit source-encoded message,
//! zero-extended to 82 bits, with polynomial 0x2757 (0x6757 including the
//! implicit leading one).

use bitvec::prelude::*;
use crc::{Algorithm, Crc};

const CRC_POLYNOMIAL: u16 = 0x2757;

const CRC_FT8: Algorithm<u16> = Algorithm {
    width: 14,
    poly: CRC_POLYNOMIAL,
    init: 0x0,
    refin: false,
    refout: false,
    xorout: 0x0,
    check: 0x0,
    residue: 0x0,
};

const FT8_CRC: Crc<u16> = Crc::<u16>::new(&CRC_FT8);

/// Compute the 14-bit CRC of the first 77 bits of `bits`.
pub fn crc14(bits: &BitSlice<u8, Msb0>) -> u16 {
    let mut msg: u128 = 0;
    for (i, bit) in bits.iter().take(77).enumerate() {
        if *bit {
            msg |= 1u128 << (76 - i);
        }
    }

    // Zero-extend 77 -> 82 bits. The u128 byte view adds six further
    // leading zero bits, which do not disturb a zero-initialised CRC.
    let padded = msg << 5;
    let bytes = padded.to_be_bytes();
    FT8_CRC.checksum(&bytes[bytes.len() - 11..])
}

/// Check a 91-bit message (77 payload + 14 CRC).
pub fn crc14_check(bits: &BitSlice<u8, Msb0>) -> bool {
    if bits.len() < 91 {
        return false;
    }
    let calculated = crc14(&bits[..77]);
    let received = bits[77..91]
        .iter()
        .fold(0u16, |acc, b| (acc << 1) | *b as u16);
    calculated == received
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_message_zero_crc() {
        let bits = bitarr![u8, Msb0; 0; 77];
        assert_eq!(crc14(&bits[..77]), 0);
    }

    #[test]
    fn crc_is_14_bits() {
        let mut bits = bitarr![u8, Msb0; 0; 77];
        for i in (0..77).step_by(3) {
            bits.set(i, true);
        }
        let crc = crc14(&bits[..77]);
        assert_ne!(crc, 0);
        assert!(crc < 1 << 14);
    }

    #[test]
    fn appended_crc_validates() {
        // crc14(m || crc14(m)) == 0 expressed through the check function,
        // for a spread of payload patterns.
        for seed in 0u64..32 {
            let mut bits = bitarr![u8, Msb0; 0; 91];
            let mut x = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(1);
            for i in 0..77 {
                x = x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                bits.set(i, x >> 63 != 0);
            }
            let crc = crc14(&bits[..77]);
            for i in 0..14 {
                bits.set(77 + i, (crc >> (13 - i)) & 1 != 0);
            }
            assert!(crc14_check(&bits[..91]), "seed {seed}");

            // flipping any CRC bit must break the check
            let mut broken = bits;
            let bit80 = broken[80];
            broken.set(80, !bit80);
            assert!(!crc14_check(&broken[..91]));
        }
    }

    #[test]
    fn known_vector() {
        // "CQ SOTA N0YPR/R DM42" source encoding and its reference CRC.
        let bits_str =
            "00000000010111100101100110000000010100100110110011100110110001100111110010001";
        let mut bits = bitarr![u8, Msb0; 0; 77];
        for (i, c) in bits_str.chars().enumerate() {
            bits.set(i, c == '1');
        }
        assert_eq!(crc14(&bits[..77]), 0b00001001100101);
    }
}
