//! End-to-end FT8 codec tests against the reference transmission
//! "CQ KG5YJE EM13".

use bitvec::prelude::*;
use rustyspot::crc::crc14_check;
use rustyspot::ldpc::{self, bp_decode};
use rustyspot::message::{
    compose_standard, costas_score, frame_tones, payload174, tones_to_llr, unpack77,
    CallsignHashCache,
};

/// The 79-tone on-air sequence of "CQ KG5YJE EM13".
const REFERENCE_TONES: [u8; 79] = [
    3, 1, 4, 0, 6, 5, 2, // Costas
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 2, 2, 7, 4, 1, 5, 3, 2, 0, 5, 0, 4, 7, 3, 3, 0, 0, 0,
    3, 1, 4, 0, 6, 5, 2, // Costas
    3, 3, 3, 6, 2, 1, 2, 6, 0, 2, 4, 4, 7, 2, 7, 4, 5, 1, 6, 1, 2, 1, 6, 6, 5, 4, 3, 1, 0,
    3, 1, 4, 0, 6, 5, 2, // Costas
];

#[test]
fn reference_tones_decode_to_message() {
    let (bits, llr, costas) = tones_to_llr(&REFERENCE_TONES).unwrap();
    assert_eq!(costas, 21);
    assert_eq!(ldpc::score(&bits), 83);

    let codeword = bp_decode(&llr, 15).expect("clean codeword decodes");
    assert!(crc14_check(&codeword[..91]));

    let mut cache = CallsignHashCache::new();
    let text = unpack77(&codeword[..77], &mut cache).unwrap();
    assert_eq!(text, "CQ KG5YJE EM13");
}

#[test]
fn message_encodes_to_reference_tones() {
    let payload = compose_standard("CQ", "", "KG5YJE", "", "", "EM13", 1).unwrap();
    let codeword = payload174(&payload).unwrap();
    let tones = frame_tones(&codeword).unwrap();
    assert_eq!(tones, REFERENCE_TONES);
    assert_eq!(costas_score(&tones), 21);
}

#[test]
fn corrupted_tones_still_decode() {
    // flip four data tones: BP has to work for its living, and the CRC
    // guards the result
    let mut tones = REFERENCE_TONES;
    tones[8] = (tones[8] + 1) % 8;
    tones[20] = (tones[20] + 3) % 8;
    tones[50] = (tones[50] + 5) % 8;
    tones[70] = (tones[70] + 2) % 8;

    let (_, llr, costas) = tones_to_llr(&tones).unwrap();
    assert!(costas >= 6);
    if let Some(codeword) = bp_decode(&llr, 30) {
        assert!(crc14_check(&codeword[..91]));
        let mut cache = CallsignHashCache::new();
        assert_eq!(
            unpack77(&codeword[..77], &mut cache).unwrap(),
            "CQ KG5YJE EM13"
        );
    }
}

#[test]
fn low_costas_score_detectable() {
    // a tone sequence with scrambled sync must not look synchronised
    let mut tones = REFERENCE_TONES;
    for costas_start in [0usize, 36, 72] {
        for i in 0..7 {
            tones[costas_start + i] = (tones[costas_start + i] + 4) % 8;
        }
    }
    let (_, _, costas) = tones_to_llr(&tones).unwrap();
    assert_eq!(costas, 0);
}

#[test]
fn decoded_callsign_lands_in_hash_cache() {
    let (_, llr, _) = tones_to_llr(&REFERENCE_TONES).unwrap();
    let codeword = bp_decode(&llr, 15).unwrap();
    let mut cache = CallsignHashCache::new();
    unpack77(&codeword[..77], &mut cache).unwrap();
    assert_eq!(
        cache.lookup_22(rustyspot::message::hash22("KG5YJE")),
        Some("KG5YJE")
    );
}

#[test]
fn single_payload_bit_flip_fails_parity() {
    let payload = compose_standard("CQ", "", "KG5YJE", "", "", "EM13", 1).unwrap();
    let codeword = payload174(&payload).unwrap();
    for i in (0..91).step_by(7) {
        let mut broken: BitVec<u8, Msb0> = codeword.as_bits().to_bitvec();
        let old = broken[i];
        broken.set(i, !old);
        assert!(ldpc::score(&broken) < 83);
    }
}
