//! Dilithium / Dilithium-G signatures: Module-LWE signing with high/low-order decomposition
//! and a `MakeHint`/`UseHint`-compressed hint vector.
//!
//! Both variants share the ring substrate in `ring.rs` (`q = 8_380_417`, `n = 256`) and the
//! decompose/hint helpers in `mlwe_generic.rs` with BLISS-B's `mlwe_generic` usage. Dilithium
//! samples its masking vector `y` uniformly in `(-gamma1, gamma1]`; Dilithium-G instead draws
//! two Gaussian vectors `(y1, y2)` and folds an extra rejection step on top of the shared
//! norm/hint checks, per the architecture's §4.8.

extern crate alloc;

use alloc::vec::Vec;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;

use crate::error_queue::ErrorKind;
use crate::gauss::{sample_sparse_ternary, uniform_mod_q, GaussianSampler, SamplerFlags};
use crate::mlwe_generic::{high_order_bits, low_order_bits, make_hint, use_hint};
use crate::packer::{poly_decode, poly_encode, Compressor, Packer};
use crate::ring::{Reduction, RingParams};
use crate::scheme::{InstanceFlags, SchemeKind, SchemeOps, Stats, RETRY_LIMIT};

const N: usize = 256;
const Q: i64 = 8_380_417;

/// One of the four parameter sets carried from the source's `dilithium_params.c`, indexed
/// 0 ("Weak") through 3 ("Very High"). Dilithium-G reuses the same `(k, l, eta, gamma1,
/// gamma2, beta, omega, weight_of_c)` shape and adds the Gaussian `sigma` it samples `y`
/// with instead of a uniform draw.
#[derive(Clone, Copy)]
struct Params {
    k: usize,
    l: usize,
    eta: i64,
    gamma1: i64,
    gamma2: i64,
    beta: i64,
    omega: usize,
    weight_of_c: usize,
    sigma: f64,
}

const PARAMS: [Params; 4] = [
    Params { k: 3, l: 2, eta: 6, gamma1: 1 << 17, gamma2: (Q - 1) / 88, beta: 6 * 60, omega: 64, weight_of_c: 60, sigma: 60.0 },
    Params { k: 4, l: 3, eta: 5, gamma1: 1 << 19, gamma2: (Q - 1) / 32, beta: 5 * 60, omega: 80, weight_of_c: 60, sigma: 90.0 },
    Params { k: 5, l: 4, eta: 4, gamma1: 1 << 19, gamma2: (Q - 1) / 32, beta: 4 * 60, omega: 96, weight_of_c: 60, sigma: 120.0 },
    Params { k: 6, l: 5, eta: 3, gamma1: 1 << 19, gamma2: (Q - 1) / 32, beta: 3 * 60, omega: 120, weight_of_c: 60, sigma: 150.0 },
];

fn validate_set(set: u32) -> Result<Params, ErrorKind> {
    PARAMS.get(set as usize).copied().ok_or(ErrorKind::InvalidFunctionCall)
}

#[derive(zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
struct Keys {
    rho: [u8; 32],
    s1: Vec<[i64; N]>, // length l
    s2: Vec<[i64; N]>, // length k
    // Public; zeroized anyway since it lives alongside the secret fields in the same struct.
    t1: Vec<[i64; N]>, // length k, high-order bits of t
    t0: Vec<[i64; N]>, // length k, low-order bits of t
}

/// The Dilithium / Dilithium-G scheme's dispatch-table row; `gaussian` selects between the
/// two signing strategies over an otherwise shared parameter table and wire shape.
pub(crate) struct DilithiumScheme {
    ring: RingParams<N>,
    params: Params,
    gaussian: bool,
    gauss: Option<GaussianSampler>,
    coder: Compressor,
    keys: Option<Keys>,
}

impl DilithiumScheme {
    pub(crate) fn new(set: u32, gaussian: bool, flags: &InstanceFlags) -> Result<Self, ErrorKind> {
        let params = validate_set(set)?;
        let sampler_flags = SamplerFlags { blinding: flags.sampler_blinding, shuffle: flags.sampler_shuffle };
        Ok(Self {
            ring: RingParams::new(Q, Reduction::Barrett),
            gauss: gaussian.then(|| GaussianSampler::new(params.sigma, 13.42, sampler_flags)),
            params,
            gaussian,
            coder: if flags.huffman_coding { Compressor::Huffman } else { Compressor::None },
            keys: None,
        })
    }

    fn expand_matrix(&self, rho: &[u8; 32]) -> Vec<Vec<[i64; N]>> {
        let Params { k, l, .. } = self.params;
        (0..k)
            .map(|i| {
                (0..l)
                    .map(|j| {
                        let mut hasher = Shake256::default();
                        hasher.update(rho);
                        hasher.update(b"A");
                        hasher.update(&[i as u8, j as u8]);
                        let mut xof = hasher.finalize_xof();
                        let mut poly = [0i64; N];
                        for c in &mut poly {
                            *c = uniform_mod_q(&mut xof, Q, 4);
                        }
                        poly
                    })
                    .collect()
            })
            .collect()
    }

    fn sample_eta_vector(&self, seed: &[u8; 32], tag: &[u8], count: usize) -> Vec<[i64; N]> {
        let eta = self.params.eta;
        (0..count)
            .map(|row| {
                let mut hasher = Shake256::default();
                hasher.update(seed);
                hasher.update(tag);
                hasher.update(&[row as u8]);
                let mut xof = hasher.finalize_xof();
                let mut poly = [0i64; N];
                for c in &mut poly {
                    *c = uniform_mod_q(&mut xof, 2 * eta + 1, 1) - eta;
                }
                poly
            })
            .collect()
    }

    fn ntt_vec(&self, v: &[[i64; N]]) -> Vec<[i64; N]> {
        v.iter()
            .map(|poly| {
                let mut p = *poly;
                self.ring.ntt(&mut p);
                p
            })
            .collect()
    }

    /// `A . v_ntt`, `v_ntt` already in the NTT domain; result in the standard domain.
    fn mat_vec_mul(&self, a_ntt: &[Vec<[i64; N]>], v_ntt: &[[i64; N]]) -> Vec<[i64; N]> {
        a_ntt
            .iter()
            .map(|row| {
                let mut acc = [0i64; N];
                for (a_ij, v_j) in row.iter().zip(v_ntt.iter()) {
                    let prod = self.ring.pointwise_mul(a_ij, v_j);
                    for (o, p) in acc.iter_mut().zip(prod.iter()) {
                        *o = self.ring.add(*o, *p);
                    }
                }
                self.ring.ntt_inv(&mut acc);
                acc
            })
            .collect()
    }

    fn oracle(&self, rho: &[u8; 32], t1: &[[i64; N]], w1: &[[i64; N]], msg: &[u8]) -> Vec<(usize, i8)> {
        let mut hasher = Shake256::default();
        hasher.update(rho);
        for poly in t1 {
            for &c in poly {
                #[allow(clippy::cast_possible_truncation)]
                hasher.update(&(c as i32).to_le_bytes());
            }
        }
        for poly in w1 {
            for &c in poly {
                #[allow(clippy::cast_possible_truncation)]
                hasher.update(&(c as i32).to_le_bytes());
            }
        }
        hasher.update(msg);
        let mut reader = hasher.finalize_xof();
        sample_sparse_ternary(&mut reader, N, self.params.weight_of_c)
    }
}

impl SchemeOps for DilithiumScheme {
    fn kind(&self) -> SchemeKind {
        if self.gaussian { SchemeKind::DilithiumG } else { SchemeKind::Dilithium }
    }

    fn keygen(&mut self, prng: &mut dyn rand_core::RngCore, stats: &mut Stats) -> Result<(), ErrorKind> {
        stats.keygen_trials += 1;
        let Params { k, l, .. } = self.params;
        let mut rho = [0u8; 32];
        prng.fill_bytes(&mut rho);
        let mut seed = [0u8; 32];
        prng.fill_bytes(&mut seed);

        let s1 = self.sample_eta_vector(&seed, b"s1", l);
        let s2 = self.sample_eta_vector(&seed, b"s2", k);
        let a_ntt = self.expand_matrix(&rho);
        let s1_ntt = self.ntt_vec(&s1);
        let mut t = self.mat_vec_mul(&a_ntt, &s1_ntt);
        for (t_i, s2_i) in t.iter_mut().zip(s2.iter()) {
            for (c, &s) in t_i.iter_mut().zip(s2_i.iter()) {
                *c = self.ring.add(*c, s);
            }
        }
        let mut t1 = Vec::with_capacity(k);
        let mut t0 = Vec::with_capacity(k);
        for t_i in &t {
            let mut hi = [0i64; N];
            let mut lo = [0i64; N];
            for (j, &c) in t_i.iter().enumerate() {
                let (h, l_) = crate::mlwe_generic::pwr2_round(c, 13);
                hi[j] = h;
                lo[j] = l_;
            }
            t1.push(hi);
            t0.push(lo);
        }

        self.keys = Some(Keys { rho, s1, s2, t1, t0 });
        Ok(())
    }

    fn public_key_encode(&self) -> Result<Vec<u8>, ErrorKind> {
        let keys = self.keys.as_ref().ok_or(ErrorKind::General)?;
        let mut packer = Packer::new_writer(4 * N * self.params.k);
        for poly in &keys.t1 {
            poly_encode(&mut packer, &poly.to_vec(), 18, false, self.coder);
        }
        let mut out = packer.get_buffer().to_vec();
        out.extend_from_slice(&keys.rho);
        Ok(out)
    }

    fn private_key_encode(&self) -> Result<Vec<u8>, ErrorKind> {
        let keys = self.keys.as_ref().ok_or(ErrorKind::General)?;
        let eta_bits = 64 - (2 * self.params.eta).leading_zeros().min(63);
        let mut packer = Packer::new_writer(4 * N * (self.params.k + self.params.l));
        for poly in &keys.s1 {
            poly_encode(&mut packer, &poly.to_vec(), eta_bits.max(1), true, self.coder);
        }
        for poly in &keys.s2 {
            poly_encode(&mut packer, &poly.to_vec(), eta_bits.max(1), true, self.coder);
        }
        for poly in &keys.t0 {
            poly_encode(&mut packer, &poly.to_vec(), 14, true, self.coder);
        }
        let mut out = packer.get_buffer().to_vec();
        out.extend_from_slice(&keys.rho);
        Ok(out)
    }

    fn public_key_load(&mut self, bytes: &[u8]) -> Result<(), ErrorKind> {
        let Params { k, .. } = self.params;
        if bytes.len() < 32 {
            return Err(ErrorKind::OutOfBounds);
        }
        let (body, rho_bytes) = bytes.split_at(bytes.len() - 32);
        let mut rho = [0u8; 32];
        rho.copy_from_slice(rho_bytes);
        let mut packer = Packer::new_reader(body);
        let mut t1 = Vec::with_capacity(k);
        for _ in 0..k {
            let mut tmp = alloc::vec![0i64; N];
            poly_decode(&mut packer, &mut tmp, 18, false, self.coder).map_err(|_| ErrorKind::OutOfBounds)?;
            let mut arr = [0i64; N];
            arr.copy_from_slice(&tmp);
            t1.push(arr);
        }
        let s1 = self.keys.as_ref().map_or_else(|| alloc::vec![[0i64; N]; self.params.l], |k_| k_.s1.clone());
        let s2 = self.keys.as_ref().map_or_else(|| alloc::vec![[0i64; N]; self.params.k], |k_| k_.s2.clone());
        let t0 = self.keys.as_ref().map_or_else(|| alloc::vec![[0i64; N]; self.params.k], |k_| k_.t0.clone());
        self.keys = Some(Keys { rho, s1, s2, t1, t0 });
        Ok(())
    }

    fn private_key_load(&mut self, bytes: &[u8]) -> Result<(), ErrorKind> {
        let Params { k, l, .. } = self.params;
        if bytes.len() < 32 {
            return Err(ErrorKind::OutOfBounds);
        }
        let (body, rho_bytes) = bytes.split_at(bytes.len() - 32);
        let mut rho = [0u8; 32];
        rho.copy_from_slice(rho_bytes);
        let eta_bits = (64 - (2 * self.params.eta).leading_zeros().min(63)).max(1);
        let mut packer = Packer::new_reader(body);
        let mut s1 = Vec::with_capacity(l);
        for _ in 0..l {
            let mut tmp = alloc::vec![0i64; N];
            poly_decode(&mut packer, &mut tmp, eta_bits, true, self.coder).map_err(|_| ErrorKind::OutOfBounds)?;
            let mut arr = [0i64; N];
            arr.copy_from_slice(&tmp);
            s1.push(arr);
        }
        let mut s2 = Vec::with_capacity(k);
        for _ in 0..k {
            let mut tmp = alloc::vec![0i64; N];
            poly_decode(&mut packer, &mut tmp, eta_bits, true, self.coder).map_err(|_| ErrorKind::OutOfBounds)?;
            let mut arr = [0i64; N];
            arr.copy_from_slice(&tmp);
            s2.push(arr);
        }
        let mut t0 = Vec::with_capacity(k);
        for _ in 0..k {
            let mut tmp = alloc::vec![0i64; N];
            poly_decode(&mut packer, &mut tmp, 14, true, self.coder).map_err(|_| ErrorKind::OutOfBounds)?;
            let mut arr = [0i64; N];
            arr.copy_from_slice(&tmp);
            t0.push(arr);
        }
        let t1 = self.keys.as_ref().map_or_else(|| alloc::vec![[0i64; N]; k], |k_| k_.t1.clone());
        self.keys = Some(Keys { rho, s1, s2, t1, t0 });
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn sign(&mut self, msg: &[u8], prng: &mut dyn rand_core::RngCore, stats: &mut Stats) -> Result<Vec<u8>, ErrorKind> {
        let keys = self.keys.as_ref().ok_or(ErrorKind::General)?;
        let Params { k, l, gamma1, gamma2, beta, omega, sigma, .. } = self.params;
        let alpha = 2 * gamma2;
        let a_ntt = self.expand_matrix(&keys.rho);

        let mut trial = 0u32;
        loop {
            trial += 1;
            stats.sign_trials += 1;
            if trial > RETRY_LIMIT {
                log::error!("dilithium sign exceeded {RETRY_LIMIT} rejection-sampling retries");
                return Err(ErrorKind::General);
            }

            let mut seed = [0u8; 32];
            prng.fill_bytes(&mut seed);
            let y: Vec<[i64; N]> = if self.gaussian {
                let sampler = self.gauss.as_ref().expect("gaussian sampler present when gaussian=true");
                (0..l)
                    .map(|row| {
                        let mut hasher = Shake256::default();
                        hasher.update(&seed);
                        hasher.update(&[row as u8]);
                        let mut xof = hasher.finalize_xof();
                        let mut poly = [0i64; N];
                        sampler.get_vector(&mut xof, &mut poly);
                        poly
                    })
                    .collect()
            } else {
                (0..l)
                    .map(|row| {
                        let mut hasher = Shake256::default();
                        hasher.update(&seed);
                        hasher.update(&[row as u8]);
                        let mut xof = hasher.finalize_xof();
                        let mut poly = [0i64; N];
                        for c in &mut poly {
                            *c = uniform_mod_q(&mut xof, 2 * gamma1 + 1, 4) - gamma1;
                        }
                        poly
                    })
                    .collect()
            };
            // Dilithium-G folds a second Gaussian vector (dimension k) directly into the
            // commitment, acting as the LWE error term the uniform variant omits.
            let y2: Option<Vec<[i64; N]>> = self.gaussian.then(|| {
                let sampler = self.gauss.as_ref().expect("gaussian sampler present when gaussian=true");
                (0..k)
                    .map(|row| {
                        let mut hasher = Shake256::default();
                        hasher.update(&seed);
                        hasher.update(b"y2");
                        hasher.update(&[row as u8]);
                        let mut xof = hasher.finalize_xof();
                        let mut poly = [0i64; N];
                        sampler.get_vector(&mut xof, &mut poly);
                        poly
                    })
                    .collect()
            });

            let y_ntt = self.ntt_vec(&y);
            let mut w = self.mat_vec_mul(&a_ntt, &y_ntt);
            if let Some(y2) = &y2 {
                for (w_i, y2_i) in w.iter_mut().zip(y2.iter()) {
                    for (c, &e) in w_i.iter_mut().zip(y2_i.iter()) {
                        *c = self.ring.add(*c, e);
                    }
                }
            }
            let w1: Vec<[i64; N]> = w
                .iter()
                .map(|poly| {
                    let mut hi = [0i64; N];
                    for (o, &c) in hi.iter_mut().zip(poly.iter()) {
                        *o = high_order_bits(c, alpha, Q);
                    }
                    hi
                })
                .collect();

            let c = self.oracle(&keys.rho, &keys.t1, &w1, msg);

            let mut z: Vec<[i64; N]> = Vec::with_capacity(l);
            for (row, y_row) in y.iter().enumerate() {
                let cs1 = self.ring.sparse_mul(&c, &keys.s1[row]);
                let mut z_row = [0i64; N];
                for i in 0..N {
                    z_row[i] = y_row[i] + cs1[i];
                }
                z.push(z_row);
            }
            let z_bound = gamma1 - beta;
            if z.iter().flatten().any(|v| v.abs() >= z_bound) {
                continue;
            }

            let mut hint = Vec::with_capacity(k);
            let mut hint_count = 0usize;
            let mut reject = false;
            for row in 0..k {
                let cs2 = self.ring.sparse_mul(&c, &keys.s2[row]);
                let ct0 = self.ring.sparse_mul(&c, &keys.t0[row]);
                let mut row_hint = [false; N];
                for i in 0..N {
                    let w_minus_cs2 = self.ring.reduce(w[row][i] - cs2[i]);
                    let low = low_order_bits(w_minus_cs2, alpha, Q);
                    if low.abs() >= gamma2 - beta {
                        reject = true;
                    }
                    if ct0[i].abs() >= gamma2 - beta {
                        reject = true;
                    }
                    let r = self.ring.reduce(w_minus_cs2 + ct0[i]);
                    let h = make_hint(-ct0[i], r, alpha, Q);
                    row_hint[i] = h;
                    if h {
                        hint_count += 1;
                    }
                }
                hint.push(row_hint);
            }
            if reject || hint_count > omega {
                continue;
            }

            if self.gaussian {
                // Extra rejection step folding the Gaussian commitment's statistical leakage,
                // mirrored on BLISS-B's rejection formula with this family's sigma.
                let cs_num: f64 = z.iter().flatten().map(|v| (*v as f64) * (*v as f64)).sum();
                let sigma2 = sigma * sigma;
                let exp_term = libm::exp(-cs_num / (2.0 * sigma2));
                let mut u_bytes = [0u8; 8];
                prng.fill_bytes(&mut u_bytes);
                let u_draw = (u64::from_le_bytes(u_bytes) as f64) / (u64::MAX as f64);
                if u_draw > exp_term.min(1.0) {
                    continue;
                }
            }

            let mut packer = Packer::new_writer(8 * N * (l + k));
            let z_bits = 32 - (gamma1 as u32).leading_zeros() + 1;
            for row in &z {
                poly_encode(&mut packer, &row.to_vec(), z_bits, true, self.coder);
            }
            for row in &hint {
                for &h in row {
                    packer.write(u32::from(h), 1);
                }
            }
            packer.flush();
            for &(pos, s) in &c {
                #[allow(clippy::cast_possible_truncation)]
                packer.write(pos as u32, 9);
                packer.write(u32::from(s > 0), 1);
            }
            return Ok(packer.get_buffer().to_vec());
        }
    }

    fn verify(&self, msg: &[u8], sig: &[u8]) -> Result<bool, ErrorKind> {
        let keys = self.keys.as_ref().ok_or(ErrorKind::General)?;
        let Params { k, l, gamma1, gamma2, beta, weight_of_c, .. } = self.params;
        let alpha = 2 * gamma2;
        let a_ntt = self.expand_matrix(&keys.rho);

        let z_bits = 32 - (gamma1 as u32).leading_zeros() + 1;
        let mut packer = Packer::new_reader(sig);
        let mut z = Vec::with_capacity(l);
        for _ in 0..l {
            let mut tmp = alloc::vec![0i64; N];
            poly_decode(&mut packer, &mut tmp, z_bits, true, self.coder).map_err(|_| ErrorKind::OutOfBounds)?;
            if tmp.iter().any(|v| v.abs() >= gamma1 - beta) {
                return Ok(false);
            }
            let mut arr = [0i64; N];
            arr.copy_from_slice(&tmp);
            z.push(arr);
        }
        packer.align_read();
        let mut hint = Vec::with_capacity(k);
        for _ in 0..k {
            let mut row = [false; N];
            for slot in &mut row {
                *slot = packer.read(1).map_err(|_| ErrorKind::OutOfBounds)? != 0;
            }
            hint.push(row);
        }
        packer.align_read();
        let mut c = Vec::with_capacity(weight_of_c);
        for _ in 0..weight_of_c {
            let pos = packer.read(9).map_err(|_| ErrorKind::OutOfBounds)? as usize;
            let s: i8 = if packer.read(1).map_err(|_| ErrorKind::OutOfBounds)? != 0 { 1 } else { -1 };
            if pos >= N {
                return Ok(false);
            }
            c.push((pos, s));
        }

        let z_ntt = self.ntt_vec(&z);
        let mut w_prime = self.mat_vec_mul(&a_ntt, &z_ntt);
        for (row, w_row) in w_prime.iter_mut().enumerate() {
            let ct1 = self.ring.sparse_mul(&c, &keys.t1[row]);
            for i in 0..N {
                w_row[i] = self.ring.reduce(w_row[i] - (ct1[i] << 13));
            }
        }
        let w1_prime: Vec<[i64; N]> = w_prime
            .iter()
            .zip(hint.iter())
            .map(|(poly, h)| {
                let mut hi = [0i64; N];
                for i in 0..N {
                    hi[i] = use_hint(h[i], poly[i], alpha, Q);
                }
                hi
            })
            .collect();

        let c_prime = self.oracle(&keys.rho, &keys.t1, &w1_prime, msg);
        Ok(c_prime == c)
    }
}

#[cfg(test)]
mod tests {
    use super::{DilithiumScheme, Params, PARAMS};
    use crate::scheme::{InstanceFlags, SchemeOps, Stats};
    use rand_chacha::rand_core::SeedableRng;

    fn rng(seed: u64) -> rand_chacha::ChaCha8Rng { rand_chacha::ChaCha8Rng::seed_from_u64(seed) }

    #[test]
    fn parameter_table_is_monotone_in_security() {
        for w in PARAMS.windows(2) {
            let Params { k: k0, l: l0, .. } = w[0];
            let Params { k: k1, l: l1, .. } = w[1];
            assert!(k1 >= k0 && l1 >= l0);
        }
    }

    #[test]
    fn keygen_produces_loadable_keys() {
        let flags = InstanceFlags::default();
        let mut scheme = DilithiumScheme::new(0, false, &flags).unwrap();
        let mut stats = Stats::default();
        let mut r = rng(1);
        scheme.keygen(&mut r, &mut stats).unwrap();
        let pk = scheme.public_key_encode().unwrap();
        let sk = scheme.private_key_encode().unwrap();
        assert!(!pk.is_empty());
        assert!(!sk.is_empty());
    }
}
