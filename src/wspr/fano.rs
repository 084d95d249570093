//! Soft-decision Fano sequential decoder for the K=32, r=1/2
//! convolutional code (Layland-Lushbaugh polynomials).

use once_cell::sync::Lazy;

/// Layland-Lushbaugh code, non-systematic, non-quick-look-in.
pub const POLY1: u32 = 0xf2d05351;
pub const POLY2: u32 = 0xe4613c47;

fn parity(x: u32) -> u32 {
    x.count_ones() & 1
}

/// Branch symbol pair for an encoder state whose LSB is the newest bit.
fn encode_symbol(state: u32) -> usize {
    ((parity(state & POLY1) << 1) | parity(state & POLY2)) as usize
}

/// Convolutionally encode a packet. Input bytes are read high bit first;
/// each input bit yields two output symbols (0 or 1), POLY1 first.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut symbols = Vec::with_capacity(data.len() * 16);
    let mut state: u32 = 0;
    for &byte in data {
        for i in (0..8).rev() {
            state = (state << 1) | ((byte >> i) & 1) as u32;
            let sym = encode_symbol(state);
            symbols.push((sym >> 1) as u8);
            symbols.push((sym & 1) as u8);
        }
    }
    symbols
}

/// Bit-reversal interleaver: symbol `p` of the encoder stream is
/// transmitted at position `bit_reverse(i)`, skipping indices >= 162.
pub fn interleave(symbols: &mut [u8; 162]) {
    let mut tmp = [0u8; 162];
    let mut p = 0usize;
    let mut i = 0u32;
    while p < 162 {
        let j = (i as u8).reverse_bits() as usize;
        if j < 162 {
            tmp[j] = symbols[p];
            p += 1;
        }
        i += 1;
    }
    symbols.copy_from_slice(&tmp);
}

/// Inverse of [`interleave`].
pub fn deinterleave(symbols: &mut [u8; 162]) {
    let mut tmp = [0u8; 162];
    let mut p = 0usize;
    let mut i = 0u32;
    while p < 162 {
        let j = (i as u8).reverse_bits() as usize;
        if j < 162 {
            tmp[p] = symbols[j];
            p += 1;
        }
        i += 1;
    }
    symbols.copy_from_slice(&tmp);
}

/// Soft metric table indexed by branch bit (0/1) and received symbol value.
///
/// Built once from the channel model: binary-antipodal signalling with
/// additive Gaussian noise, quantised to 256 offset-binary levels (bit 0
/// centred at 64, bit 1 at 191). Each entry is
/// `round(10 * (log2(2 * P0 / (P0 + P1)) - 0.42))`, the bias keeping the
/// expected metric of a random branch negative.
static METTAB: Lazy<[[i32; 256]; 2]> = Lazy::new(|| {
    const BIAS: f64 = 0.42;
    const SIGMA: f64 = 64.0;
    const MEAN0: f64 = 64.0;
    const MEAN1: f64 = 191.0;

    let mut table = [[0i32; 256]; 2];
    for x in 0..256 {
        let xf = x as f64;
        let p0 = (-(xf - MEAN0) * (xf - MEAN0) / (2.0 * SIGMA * SIGMA)).exp();
        let p1 = (-(xf - MEAN1) * (xf - MEAN1) / (2.0 * SIGMA * SIGMA)).exp();
        let metric = (2.0 * p0 / (p0 + p1)).log2();
        table[0][x] = (10.0 * (metric - BIAS)).round() as i32;
    }
    for x in 0..256 {
        table[1][x] = table[0][255 - x];
    }
    table
});

#[derive(Clone, Copy, Default)]
struct Node {
    /// Encoder state up to and including this node's hypothesis bit.
    encstate: u32,
    /// Cumulative metric to this node.
    gamma: i64,
    /// Branch metrics indexed by the transmitted symbol pair.
    metrics: [i32; 4],
    /// Sorted metrics for the two branch hypotheses.
    tm: [i32; 2],
    /// Branch currently being tested (0 = best).
    branch: usize,
}

#[derive(Debug, Clone)]
pub struct FanoResult {
    /// Decoded bytes, `nbits / 8` of them.
    pub data: Vec<u8>,
    /// Final path metric.
    pub metric: i64,
    /// Decoder cycles consumed.
    pub cycles: u64,
    /// Deepest node reached (useful when diagnosing timeouts).
    pub deepest: usize,
}

/// Decode `nbits` bits from `2 * nbits` soft symbols (values 0..=255).
///
/// `delta` is the threshold adjustment, `maxcycles` the per-bit iteration
/// budget. Returns `None` on timeout.
pub fn fano(symbols: &[u8], nbits: usize, delta: i64, maxcycles: u64) -> Option<FanoResult> {
    assert!(symbols.len() >= 2 * nbits, "need two symbols per bit");
    let mettab = &*METTAB;

    let mut nodes = vec![Node::default(); nbits + 1];
    let tail = nbits - 31;

    for (k, node) in nodes[..nbits].iter_mut().enumerate() {
        let s0 = symbols[2 * k] as usize;
        let s1 = symbols[2 * k + 1] as usize;
        node.metrics = [
            mettab[0][s0] + mettab[0][s1],
            mettab[0][s0] + mettab[1][s1],
            mettab[1][s0] + mettab[0][s1],
            mettab[1][s0] + mettab[1][s1],
        ];
    }

    // Root node: sort the two branch hypotheses. Both polynomials are odd,
    // so the 1-branch symbols are the complement of the 0-branch symbols.
    let mut np = 0usize;
    nodes[0].encstate = 0;
    let lsym = encode_symbol(nodes[0].encstate);
    let m0 = nodes[0].metrics[lsym];
    let m1 = nodes[0].metrics[3 ^ lsym];
    if m0 > m1 {
        nodes[0].tm = [m0, m1];
    } else {
        nodes[0].tm = [m1, m0];
        nodes[0].encstate += 1;
    }
    nodes[0].branch = 0;

    let budget = maxcycles * nbits as u64;
    let mut t: i64 = 0;
    nodes[0].gamma = 0;
    let mut deepest = 0usize;
    let mut finished = false;
    let mut cycles = 0u64;

    for i in 1..=budget {
        cycles = i;
        if np > deepest {
            deepest = np;
        }

        // Look forward.
        let ngamma = nodes[np].gamma + nodes[np].tm[nodes[np].branch] as i64;
        if ngamma >= t {
            if nodes[np].gamma < t + delta {
                // First visit to this node; tighten the threshold.
                while ngamma >= t + delta {
                    t += delta;
                }
            }
            nodes[np + 1].gamma = ngamma;
            nodes[np + 1].encstate = nodes[np].encstate << 1;
            np += 1;
            if np == nbits {
                finished = true;
                break;
            }

            let lsym = encode_symbol(nodes[np].encstate);
            if np >= tail {
                // The tail is all zeroes; only the 0-branch exists.
                nodes[np].tm[0] = nodes[np].metrics[lsym];
            } else {
                let m0 = nodes[np].metrics[lsym];
                let m1 = nodes[np].metrics[3 ^ lsym];
                if m0 > m1 {
                    nodes[np].tm = [m0, m1];
                } else {
                    nodes[np].tm = [m1, m0];
                    nodes[np].encstate += 1;
                }
            }
            nodes[np].branch = 0;
            continue;
        }

        // Threshold violated; search backward.
        loop {
            if np == 0 || nodes[np - 1].gamma < t {
                // Can't back up: relax the threshold and retry the best
                // branch from here.
                t -= delta;
                if nodes[np].branch != 0 {
                    nodes[np].branch = 0;
                    nodes[np].encstate ^= 1;
                }
                break;
            }
            np -= 1;
            if np < tail && nodes[np].branch != 1 {
                nodes[np].branch += 1;
                nodes[np].encstate ^= 1;
                break;
            }
        }
    }

    if !finished {
        return None;
    }

    // Every eighth node's encoder state holds one completed byte.
    let mut data = Vec::with_capacity(nbits >> 3);
    let mut idx = 7;
    for _ in 0..(nbits >> 3) {
        data.push(nodes[idx].encstate as u8);
        idx += 8;
    }

    Some(FanoResult {
        data,
        metric: nodes[np].gamma,
        cycles: cycles + 1,
        deepest,
    })
}
