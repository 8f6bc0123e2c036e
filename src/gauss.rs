//! Samplers shared by BLISS-B and Dilithium: uniform-mod-q, discrete Gaussian (CDT
//! back-end), and sparse-ternary challenge/key sampling.
//!
//! The Kyber-specific uniform and centred-binomial samplers in `sampling.rs` are untouched;
//! these are the counterparts needed once a scheme's noise is a genuine discrete Gaussian
//! (BLISS-B, Dilithium-G) or a sparse trinary vector with a fixed Hamming weight (BLISS-B
//! keys, Dilithium/BLISS challenge polynomials).
//!
//! Side-channel knobs named in the architecture (blinding, on-the-fly shuffle, LUT-access
//! obfuscation) are surfaced as the [`SamplerFlags`] bitset; the non-masked reference path
//! runs when none are set.

extern crate alloc;

use alloc::vec::Vec;
use sha3::digest::XofReader;

/// Side-channel hardening knobs for a sampler instance, selected at scheme create-time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SamplerFlags {
    /// Generate samples in pairs and shuffle them before use.
    pub(crate) blinding: bool,
    /// Additionally shuffle the output vector in place once filled.
    pub(crate) shuffle: bool,
}

/// A CDT (cumulative-distribution-table) discrete Gaussian sampler of standard deviation
/// `sigma`, truncated at `tau` standard deviations.
pub(crate) struct GaussianSampler {
    /// `table[m]` is the upper-inclusive `u64` threshold for magnitude `m` (table[0] covers
    /// the value 0; for `m >= 1` the mass is split evenly between +m and -m via a sign bit).
    table: Vec<u64>,
    flags: SamplerFlags,
}

impl GaussianSampler {
    /// Builds the CDT for `N(0, sigma^2)` truncated to `[-tau*sigma, tau*sigma]`.
    #[must_use]
    pub(crate) fn new(sigma: f64, tau: f64, flags: SamplerFlags) -> Self {
        let bound = libm::ceil(sigma * tau) as i64;
        let bound = bound.max(1);
        let rho = |x: i64| libm::exp(-(x as f64) * (x as f64) / (2.0 * sigma * sigma));
        let mut total = rho(0);
        for x in 1..=bound {
            total += 2.0 * rho(x);
        }
        let mut table = Vec::with_capacity(bound as usize + 1);
        let mut cumulative = rho(0) / total;
        table.push(scale_to_u64(cumulative));
        for x in 1..=bound {
            cumulative += 2.0 * rho(x) / total;
            table.push(scale_to_u64(cumulative));
        }
        // Guard against float rounding leaving the last slot short of the maximum.
        if let Some(last) = table.last_mut() {
            *last = u64::MAX;
        }
        Self { table, flags }
    }

    /// Draws one sample by pulling a uniform `u64` (and, for nonzero magnitudes, a sign bit)
    /// from `xof`. When `blinding` is set, two independent samples are drawn and one is
    /// discarded after a data-independent coin flip, matching the "generate in pairs" knob.
    pub(crate) fn sample(&self, xof: &mut impl XofReader) -> i64 {
        let draw = |xof: &mut dyn XofReader| -> i64 {
            let mut buf = [0u8; 8];
            xof.read(&mut buf);
            let r = u64::from_le_bytes(buf);
            let magnitude = match self.table.binary_search(&r) {
                Ok(m) | Err(m) => m as i64,
            };
            if magnitude == 0 {
                return 0;
            }
            let mut sign_byte = [0u8; 1];
            xof.read(&mut sign_byte);
            if sign_byte[0] & 1 == 0 {
                magnitude
            } else {
                -magnitude
            }
        };
        if self.flags.blinding {
            let a = draw(xof);
            let _b = draw(xof); // drawn and discarded: blinding pairs the sampling work
            let mut coin = [0u8; 1];
            xof.read(&mut coin);
            if coin[0] & 1 == 0 {
                a
            } else {
                _b
            }
        } else {
            draw(xof)
        }
    }

    /// Fills `dst` with `dst.len()` independent samples, applying the post-hoc shuffle knob
    /// when configured.
    pub(crate) fn get_vector(&self, xof: &mut impl XofReader, dst: &mut [i64]) {
        for slot in dst.iter_mut() {
            *slot = self.sample(xof);
        }
        if self.flags.shuffle {
            fisher_yates_shuffle(dst, xof);
        }
    }
}

fn scale_to_u64(p: f64) -> u64 {
    let clamped = p.clamp(0.0, 1.0);
    (clamped * (u64::MAX as f64)) as u64
}

fn fisher_yates_shuffle(dst: &mut [i64], xof: &mut impl XofReader) {
    let n = dst.len();
    for i in (1..n).rev() {
        let mut buf = [0u8; 4];
        xof.read(&mut buf);
        let j = (u32::from_le_bytes(buf) as usize) % (i + 1);
        dst.swap(i, j);
    }
}

/// Uniform rejection sampling of one value in `[0, q)` from an XOF byte stream; `bytes_needed`
/// is the number of bytes pulled per trial (the caller picks enough to keep the rejection
/// probability small, e.g. `ceil(log2(q)/8) + 1`).
pub(crate) fn uniform_mod_q(xof: &mut impl XofReader, q: i64, bytes_needed: usize) -> i64 {
    debug_assert!(bytes_needed >= 1 && bytes_needed <= 8);
    // The representable range is 2^(8*bytes_needed), not the full u64 range, whenever fewer
    // than 8 bytes are actually drawn; rejecting against u64::MAX's range left a sliver
    // [range, u64::MAX] never hit but still counted in `bound`'s modular reduction, biasing
    // the low residues of `q`.
    let range: u128 = 1u128 << (8 * bytes_needed);
    let bound: u128 = (range / q as u128) * q as u128;
    loop {
        let mut buf = [0u8; 8];
        xof.read(&mut buf[..bytes_needed]);
        let v = u128::from(u64::from_le_bytes(buf));
        if v < bound {
            return (v % q as u128) as i64;
        }
    }
}

/// Draws a sparse ternary vector of length `n` with exactly `weight` non-zero `{-1,+1}`
/// entries. Mirrors the "place `weight` non-zero coefficients at the top, then Fisher-Yates
/// swap into uniformly chosen earlier positions" construction used for the Module-LWE oracle
/// and reused here for BLISS-B / Dilithium challenge and key sampling.
pub(crate) fn sample_sparse_ternary(xof: &mut impl XofReader, n: usize, weight: usize) -> Vec<(usize, i8)> {
    debug_assert!(weight <= n);
    let mut positions: Vec<usize> = (0..n).collect();
    let mut signs = alloc::vec![0i8; n];
    for slot in signs.iter_mut().take(weight) {
        let mut byte = [0u8; 1];
        xof.read(&mut byte);
        *slot = if byte[0] & 1 == 0 { 1 } else { -1 };
    }
    // Fisher-Yates over the last `weight` slots, pulling a swap partner from [0, n) each time.
    for i in (n - weight..n).rev() {
        let mut buf = [0u8; 4];
        xof.read(&mut buf);
        let j = (u32::from_le_bytes(buf) as usize) % (i + 1);
        positions.swap(i, j);
    }
    positions[n - weight..n].iter().zip(signs[..weight].iter()).map(|(&p, &s)| (p, s)).collect()
}


#[cfg(test)]
mod tests {
    use super::{sample_sparse_ternary, uniform_mod_q, GaussianSampler, SamplerFlags};
    use sha3::digest::{ExtendableOutput, Update, XofReader};
    use sha3::Shake256;

    fn xof_from_seed(seed: u8) -> impl XofReader {
        let mut h = Shake256::default();
        h.update(&[seed]);
        h.finalize_xof()
    }

    #[test]
    fn gaussian_samples_stay_within_tail_cut() {
        let sigma = 20.0;
        let tau = 13.42;
        let sampler = GaussianSampler::new(sigma, tau, SamplerFlags::default());
        let mut xof = xof_from_seed(1);
        let bound = (sigma * tau).ceil() as i64;
        for _ in 0..2000 {
            let s = sampler.sample(&mut xof);
            assert!(s.abs() <= bound);
        }
    }

    #[test]
    fn gaussian_with_blinding_still_respects_bound() {
        let sampler = GaussianSampler::new(10.0, 13.42, SamplerFlags { blinding: true, shuffle: true });
        let mut xof = xof_from_seed(2);
        let bound = (10.0f64 * 13.42).ceil() as i64;
        let mut v = [0i64; 64];
        sampler.get_vector(&mut xof, &mut v);
        assert!(v.iter().all(|x| x.abs() <= bound));
    }

    #[test]
    fn uniform_mod_q_stays_in_range() {
        let mut xof = xof_from_seed(3);
        for _ in 0..1000 {
            let v = uniform_mod_q(&mut xof, 8_380_417, 4);
            assert!((0..8_380_417).contains(&v));
        }
    }

    /// With `q = 7` and a single byte per draw, `256 / 7 = 36` remainder `4`: residues `0..4`
    /// get one extra representable value per 256-value byte range than residues `4..7`. A
    /// `bound` computed against the full `u64::MAX` range (as opposed to the 1-byte range
    /// actually drawn) would silently carry that same skew forward rather than rejecting it,
    /// so this checks the draw frequencies stay close to the `1/7` each residue is entitled to.
    #[test]
    fn uniform_mod_q_with_a_small_byte_budget_is_not_biased() {
        let mut xof = xof_from_seed(5);
        let q = 7;
        let trials = 70_000;
        let mut counts = [0u32; 7];
        for _ in 0..trials {
            let v = uniform_mod_q(&mut xof, q, 1);
            counts[v as usize] += 1;
        }
        let expected = trials as f64 / q as f64;
        for (residue, &count) in counts.iter().enumerate() {
            let deviation = (f64::from(count) - expected).abs() / expected;
            assert!(deviation < 0.05, "residue {residue} occurred {count} times, expected ~{expected} (+/-5%)");
        }
    }

    #[test]
    fn sparse_ternary_has_exact_weight_and_distinct_positions() {
        let mut xof = xof_from_seed(4);
        let sparse = sample_sparse_ternary(&mut xof, 256, 39);
        assert_eq!(sparse.len(), 39);
        let mut positions: alloc::vec::Vec<usize> = sparse.iter().map(|&(p, _)| p).collect();
        positions.sort_unstable();
        positions.dedup();
        assert_eq!(positions.len(), 39);
        assert!(sparse.iter().all(|&(_, s)| s == 1 || s == -1));
    }
}
