//! Belief-propagation decoder for the LDPC(174,91) code.

use bitvec::prelude::*;

use super::{score, M, MN, N, NM};

/// Decode 174 log-likelihood ratios into a codeword.
///
/// LLR convention: positive means the bit is probably zero. Demodulated
/// hard symbols enter as ±4.99. Returns the corrected 174-bit vector as
/// soon as all 83 parity checks pass, or `None` when the iteration budget
/// (default 15) is exhausted.
pub fn bp_decode(llr: &[f64], max_iterations: usize) -> Option<BitVec<u8, Msb0>> {
    if llr.len() != N {
        return None;
    }

    // Channel priors as P(bit == 0).
    let mut prior = [0.0f64; N];
    for (i, &x) in llr.iter().enumerate() {
        let ex = x.exp();
        prior[i] = ex / (1.0 + ex);
    }

    // m[j][i]: what check j currently believes about bit i, P(zero).
    // e[j][i]: what check j tells bit i based on the other bits of j.
    let mut m = vec![[0.0f64; N]; M];
    let mut e = vec![[0.0f64; N]; M];
    for j in 0..M {
        for i in 0..N {
            m[j][i] = prior[i];
        }
    }

    for _ in 0..max_iterations {
        for j in 0..M {
            for &i1 in NM[j].iter() {
                let mut a = 1.0;
                for &i2 in NM[j].iter() {
                    if i2 != i1 {
                        a *= 1.0 - 2.0 * (1.0 - m[j][i2]);
                    }
                }
                e[j][i1] = 0.5 + 0.5 * a;
            }
        }

        // Tentative hard decision from the prior and all three incident
        // check messages.
        let mut cw: BitVec<u8, Msb0> = BitVec::with_capacity(N);
        for i in 0..N {
            let mut q0 = prior[i];
            let mut q1 = 1.0 - q0;
            for &j in MN[i].iter() {
                q0 *= e[j][i];
                q1 *= 1.0 - e[j][i];
            }
            let p = if q0 == 0.0 { 1.0 } else { 1.0 / (1.0 + q1 / q0) };
            cw.push(p <= 0.5);
        }
        if score(&cw) == 83 {
            return Some(cw);
        }

        for i in 0..N {
            for &j1 in MN[i].iter() {
                let mut q0 = prior[i];
                let mut q1 = 1.0 - q0;
                for &j2 in MN[i].iter() {
                    if j1 != j2 {
                        q0 *= e[j2][i];
                        q1 *= 1.0 - e[j2][i];
                    }
                }
                let p = if q0 == 0.0 { 1.0 } else { 1.0 / (1.0 + q1 / q0) };
                m[j1][i] = p;
            }
        }
    }

    None
}

/// Convert a hard bit vector into the ±4.99 LLRs the decoder expects.
pub fn hard_llr(bits: &BitSlice<u8, Msb0>) -> Vec<f64> {
    bits.iter().map(|b| if *b { -4.99 } else { 4.99 }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldpc::{encode, K};

    fn random_codeword(seed: u64) -> BitVec<u8, Msb0> {
        let mut msg: BitVec<u8, Msb0> = BitVec::with_capacity(K);
        let mut x = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(11);
        for _ in 0..K {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            msg.push(x >> 63 != 0);
        }
        let mut cw = msg.clone();
        cw.extend_from_bitslice(&encode(&msg));
        cw
    }

    #[test]
    fn clean_codeword_decodes_immediately() {
        let cw = random_codeword(1);
        let out = bp_decode(&hard_llr(&cw), 15).expect("clean decode");
        assert_eq!(out, cw);
    }

    #[test]
    fn corrupted_codeword_recovers_or_fails() {
        // Up to six flipped positions: either the original comes back or
        // the decoder refuses. It must never return a valid codeword with
        // a different message prefix.
        for seed in 0..8u64 {
            let cw = random_codeword(seed);
            for k in 1..=6usize {
                let mut corrupted = cw.clone();
                let mut x = seed.wrapping_add(k as u64).wrapping_mul(0x2545F4914F6CDD1D);
                for _ in 0..k {
                    x = x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    let pos = (x >> 33) as usize % 174;
                    let old = corrupted[pos];
                    corrupted.set(pos, !old);
                }
                if let Some(out) = bp_decode(&hard_llr(&corrupted), 15) {
                    assert_eq!(
                        &out[..K],
                        &cw[..K],
                        "seed {seed} k {k}: decoder invented a different message"
                    );
                }
            }
        }
    }

    #[test]
    fn wrong_length_input_is_rejected() {
        assert!(bp_decode(&[0.0; 10], 15).is_none());
    }
}
