//! FT8 frame assembly: Gray mapping, Costas interleaving, tone extraction.
//!
//! A 174-bit codeword becomes 58 data tones (one per Gray-mapped 3-bit
//! triplet) framed by three 7-tone Costas arrays, 79 symbols in all. The
//! equivalent 237-bit view is `costas21 || part1(87) || costas21 ||
//! part2(87) || costas21`.

use bitvec::prelude::*;

use crate::constants::{
    FT8_COSTAS, FT8_DATA_SYMBOL_COUNT, FT8_GRAY_CODE, FT8_GRAY_INVERSE, FT8_SYMBOL_COUNT,
};
use crate::fields::{BitField, Bits};

use super::error::DecodeError;

/// Symbol offsets of the three Costas arrays.
const COSTAS_OFFSETS: [usize; 3] = [0, 36, 72];

fn is_costas_position(index: usize) -> bool {
    COSTAS_OFFSETS
        .iter()
        .any(|&off| index >= off && index < off + 7)
}

/// Map a 174-bit codeword to the 79-tone transmit sequence.
pub fn frame_tones(payload: &BitField) -> Result<[u8; FT8_SYMBOL_COUNT], DecodeError> {
    if payload.len() != 174 {
        return Err(DecodeError::ShortInput {
            field: "frame",
            needed: 174,
            got: payload.len(),
        });
    }

    let bits = payload.as_bits();
    let mut data_tones = [0u8; FT8_DATA_SYMBOL_COUNT];
    for (i, tone) in data_tones.iter_mut().enumerate() {
        let triplet = (bits[3 * i] as u8) << 2 | (bits[3 * i + 1] as u8) << 1
            | bits[3 * i + 2] as u8;
        *tone = FT8_GRAY_CODE[triplet as usize];
    }

    let mut tones = [0u8; FT8_SYMBOL_COUNT];
    let mut data = data_tones.iter();
    for (i, tone) in tones.iter_mut().enumerate() {
        if is_costas_position(i) {
            let off = if i >= 72 {
                i - 72
            } else if i >= 36 {
                i - 36
            } else {
                i
            };
            *tone = FT8_COSTAS[off];
        } else {
            *tone = *data.next().expect("58 data tones");
        }
    }
    Ok(tones)
}

/// The 237-bit on-air view of a codeword, with `part1`/`part2`/`costas21`
/// subfields addressable by name.
pub fn frame237(payload: &BitField) -> Result<BitField, DecodeError> {
    if payload.len() != 174 {
        return Err(DecodeError::ShortInput {
            field: "frame",
            needed: 174,
            got: payload.len(),
        });
    }

    let bits = payload.as_bits();
    let mut mapped: Bits = BitVec::with_capacity(174);
    for i in 0..FT8_DATA_SYMBOL_COUNT {
        let triplet = (bits[3 * i] as u8) << 2 | (bits[3 * i + 1] as u8) << 1
            | bits[3 * i + 2] as u8;
        let tone = FT8_GRAY_CODE[triplet as usize];
        mapped.push(tone & 4 != 0);
        mapped.push(tone & 2 != 0);
        mapped.push(tone & 1 != 0);
    }

    let mut costas_bits: Bits = BitVec::with_capacity(21);
    for tone in FT8_COSTAS {
        costas_bits.push(tone & 4 != 0);
        costas_bits.push(tone & 2 != 0);
        costas_bits.push(tone & 1 != 0);
    }
    let costas =
        BitField::from_bits_tagged(21, costas_bits, &[("costas21", 21)]).expect("21 costas bits");
    let part1 = BitField::from_bits_tagged(87, mapped[..87].to_bitvec(), &[("part1", 87)])
        .expect("87 bits");
    let part2 = BitField::from_bits_tagged(87, mapped[87..].to_bitvec(), &[("part2", 87)])
        .expect("87 bits");

    Ok(costas
        .concat(&part1)
        .concat(&costas)
        .concat(&part2)
        .concat(&costas))
}

/// Count how many of the 21 Costas positions in a 79-tone sequence carry
/// the expected tone. A clean frame scores 21; the decode pipeline
/// requires at least 6.
pub fn costas_score(tones: &[u8]) -> usize {
    let mut score = 0;
    for &off in &COSTAS_OFFSETS {
        for (i, &expected) in FT8_COSTAS.iter().enumerate() {
            if tones.get(off + i) == Some(&expected) {
                score += 1;
            }
        }
    }
    score
}

/// Recover the 174 codeword bits and their hard-decision LLRs from a
/// 79-tone sequence, reversing the Gray map on the 58 data symbols.
///
/// Returns the Costas score alongside so callers can gate on sync quality.
pub fn tones_to_llr(tones: &[u8]) -> Result<(Bits, Vec<f64>, usize), DecodeError> {
    if tones.len() != FT8_SYMBOL_COUNT {
        return Err(DecodeError::ShortInput {
            field: "frame",
            needed: FT8_SYMBOL_COUNT,
            got: tones.len(),
        });
    }

    let score = costas_score(tones);
    let mut bits: Bits = BitVec::with_capacity(174);
    let mut llr = Vec::with_capacity(174);
    for (i, &tone) in tones.iter().enumerate() {
        if is_costas_position(i) {
            continue;
        }
        if tone > 7 {
            return Err(DecodeError::OutOfRange {
                field: "tone",
                value: tone as u64,
            });
        }
        let sym = FT8_GRAY_INVERSE[tone as usize];
        for shift in [4u8, 2, 1] {
            let bit = sym & shift != 0;
            bits.push(bit);
            llr.push(if bit { -4.99 } else { 4.99 });
        }
    }
    debug_assert_eq!(llr.len(), 174);
    Ok((bits, llr, score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::compose::{compose_standard, payload174};

    fn reference_codeword() -> BitField {
        let payload = compose_standard("CQ", "", "KG5YJE", "", "", "EM13", 1).unwrap();
        payload174(&payload).unwrap()
    }

    #[test]
    fn composed_frame_scores_full_costas() {
        let tones = frame_tones(&reference_codeword()).unwrap();
        assert_eq!(costas_score(&tones), 21);
    }

    #[test]
    fn tones_round_trip_to_codeword() {
        let codeword = reference_codeword();
        let tones = frame_tones(&codeword).unwrap();
        let (bits, llr, score) = tones_to_llr(&tones).unwrap();
        assert_eq!(score, 21);
        assert_eq!(bits, codeword.as_bits().to_bitvec());
        assert!(llr.iter().all(|&x| x == 4.99 || x == -4.99));
    }

    #[test]
    fn frame237_structure() {
        let frame = frame237(&reference_codeword()).unwrap();
        assert_eq!(frame.len(), 237);
        // three identical costas blocks
        let c0 = frame.select("costas21", 0).unwrap();
        let c2 = frame.select("costas21", 2).unwrap();
        assert_eq!(c0.as_bits(), c2.as_bits());
        assert_eq!(frame.select("part1", 0).unwrap().len(), 87);
        assert_eq!(frame.select("part2", 0).unwrap().len(), 87);
    }

    #[test]
    fn corrupted_costas_lowers_score() {
        let mut tones = frame_tones(&reference_codeword()).unwrap();
        tones[0] = (tones[0] + 1) % 8;
        tones[36] = (tones[36] + 1) % 8;
        assert_eq!(costas_score(&tones), 19);
    }
}
