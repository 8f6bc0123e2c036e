//! Runtime dispatch glue for the Kyber family: wraps the compile-time `ml_kem_{512,768,1024}`
//! parameter-set modules (FIPS 203's FO-transformed KEM) and the shared `k_pke` primitive
//! (plain, CPA-secure Module-LWE encryption) behind the scheme registry's object-safe
//! [`crate::scheme::SchemeOps`] trait, so a runtime `set` id can select a parameter set the
//! way every other scheme in the table does.
//!
//! The ML-KEM fast path in `ml_kem.rs`/`k_pke.rs` is untouched: this module only adapts it to
//! the dynamic dispatch surface, it does not reimplement any lattice arithmetic.

extern crate alloc;

use alloc::vec::Vec;

use crate::error_queue::ErrorKind;
use crate::k_pke::{k_pke_decrypt, k_pke_encrypt, k_pke_key_gen};
use crate::scheme::{SchemeKind, SchemeOps};
use crate::traits::{Decaps, Encaps, KeyGen, SerDes};

/// Adapts the dispatch surface's `&mut dyn RngCore` to the `CryptoRngCore` bound the ML-KEM
/// traits require, without pulling a second PRNG implementation into this module.
struct RngAdapter<'a>(&'a mut dyn rand_core::RngCore);

impl rand_core::RngCore for RngAdapter<'_> {
    fn next_u32(&mut self) -> u32 { self.0.next_u32() }

    fn next_u64(&mut self) -> u64 { self.0.next_u64() }

    fn fill_bytes(&mut self, dest: &mut [u8]) { self.0.fill_bytes(dest) }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> { self.0.try_fill_bytes(dest) }
}

impl rand_core::CryptoRng for RngAdapter<'_> {}

enum KemKeys {
    K512 { ek: Option<crate::ml_kem_512::EncapsKey>, dk: Option<crate::ml_kem_512::DecapsKey> },
    K768 { ek: Option<crate::ml_kem_768::EncapsKey>, dk: Option<crate::ml_kem_768::DecapsKey> },
    K1024 { ek: Option<crate::ml_kem_1024::EncapsKey>, dk: Option<crate::ml_kem_1024::DecapsKey> },
}

/// Kyber KEM: encapsulation/decapsulation dispatch row, backed by the appropriate
/// `ml_kem_{512,768,1024}` module selected by `set` (`1` => 512, `2` => 768, `3` => 1024).
pub(crate) struct KyberKemOps {
    keys: KemKeys,
}

impl KyberKemOps {
    pub(crate) fn new(set: u32) -> Result<Self, ErrorKind> {
        let keys = match set {
            1 => KemKeys::K512 { ek: None, dk: None },
            2 => KemKeys::K768 { ek: None, dk: None },
            3 => KemKeys::K1024 { ek: None, dk: None },
            _ => return Err(ErrorKind::InvalidFunctionCall),
        };
        Ok(Self { keys })
    }
}

impl SchemeOps for KyberKemOps {
    fn kind(&self) -> SchemeKind { SchemeKind::KyberKem }

    fn keygen(&mut self, prng: &mut dyn rand_core::RngCore, stats: &mut crate::scheme::Stats) -> Result<(), ErrorKind> {
        stats.keygen_trials += 1;
        let mut rng = RngAdapter(prng);
        match &mut self.keys {
            KemKeys::K512 { ek, dk } => {
                let (new_ek, new_dk) =
                    crate::ml_kem_512::KG::try_keygen_with_rng(&mut rng).map_err(|_| ErrorKind::General)?;
                *ek = Some(new_ek);
                *dk = Some(new_dk);
            }
            KemKeys::K768 { ek, dk } => {
                let (new_ek, new_dk) =
                    crate::ml_kem_768::KG::try_keygen_with_rng(&mut rng).map_err(|_| ErrorKind::General)?;
                *ek = Some(new_ek);
                *dk = Some(new_dk);
            }
            KemKeys::K1024 { ek, dk } => {
                let (new_ek, new_dk) =
                    crate::ml_kem_1024::KG::try_keygen_with_rng(&mut rng).map_err(|_| ErrorKind::General)?;
                *ek = Some(new_ek);
                *dk = Some(new_dk);
            }
        }
        Ok(())
    }

    fn public_key_encode(&self) -> Result<Vec<u8>, ErrorKind> {
        match &self.keys {
            KemKeys::K512 { ek: Some(ek), .. } => Ok(ek.clone().into_bytes().to_vec()),
            KemKeys::K768 { ek: Some(ek), .. } => Ok(ek.clone().into_bytes().to_vec()),
            KemKeys::K1024 { ek: Some(ek), .. } => Ok(ek.clone().into_bytes().to_vec()),
            _ => Err(ErrorKind::General),
        }
    }

    fn private_key_encode(&self) -> Result<Vec<u8>, ErrorKind> {
        match &self.keys {
            KemKeys::K512 { dk: Some(dk), .. } => Ok(dk.clone().into_bytes().to_vec()),
            KemKeys::K768 { dk: Some(dk), .. } => Ok(dk.clone().into_bytes().to_vec()),
            KemKeys::K1024 { dk: Some(dk), .. } => Ok(dk.clone().into_bytes().to_vec()),
            _ => Err(ErrorKind::General),
        }
    }

    fn public_key_load(&mut self, bytes: &[u8]) -> Result<(), ErrorKind> {
        match &mut self.keys {
            KemKeys::K512 { ek, .. } => {
                let arr: [u8; crate::ml_kem_512::EK_LEN] = bytes.try_into().map_err(|_| ErrorKind::OutOfBounds)?;
                *ek = Some(crate::ml_kem_512::EncapsKey::try_from_bytes(arr).map_err(|_| ErrorKind::General)?);
            }
            KemKeys::K768 { ek, .. } => {
                let arr: [u8; crate::ml_kem_768::EK_LEN] = bytes.try_into().map_err(|_| ErrorKind::OutOfBounds)?;
                *ek = Some(crate::ml_kem_768::EncapsKey::try_from_bytes(arr).map_err(|_| ErrorKind::General)?);
            }
            KemKeys::K1024 { ek, .. } => {
                let arr: [u8; crate::ml_kem_1024::EK_LEN] = bytes.try_into().map_err(|_| ErrorKind::OutOfBounds)?;
                *ek = Some(crate::ml_kem_1024::EncapsKey::try_from_bytes(arr).map_err(|_| ErrorKind::General)?);
            }
        }
        Ok(())
    }

    fn private_key_load(&mut self, bytes: &[u8]) -> Result<(), ErrorKind> {
        match &mut self.keys {
            KemKeys::K512 { dk, .. } => {
                let arr: [u8; crate::ml_kem_512::DK_LEN] = bytes.try_into().map_err(|_| ErrorKind::OutOfBounds)?;
                *dk = Some(crate::ml_kem_512::DecapsKey::try_from_bytes(arr).map_err(|_| ErrorKind::General)?);
            }
            KemKeys::K768 { dk, .. } => {
                let arr: [u8; crate::ml_kem_768::DK_LEN] = bytes.try_into().map_err(|_| ErrorKind::OutOfBounds)?;
                *dk = Some(crate::ml_kem_768::DecapsKey::try_from_bytes(arr).map_err(|_| ErrorKind::General)?);
            }
            KemKeys::K1024 { dk, .. } => {
                let arr: [u8; crate::ml_kem_1024::DK_LEN] = bytes.try_into().map_err(|_| ErrorKind::OutOfBounds)?;
                *dk = Some(crate::ml_kem_1024::DecapsKey::try_from_bytes(arr).map_err(|_| ErrorKind::General)?);
            }
        }
        Ok(())
    }

    fn encapsulate(&self, prng: &mut dyn rand_core::RngCore) -> Result<(Vec<u8>, Vec<u8>), ErrorKind> {
        let mut rng = RngAdapter(prng);
        match &self.keys {
            KemKeys::K512 { ek: Some(ek), .. } => {
                let (ssk, ct) = ek.try_encaps_with_rng(&mut rng).map_err(|_| ErrorKind::General)?;
                Ok((ct.into_bytes().to_vec(), ssk.into_bytes().to_vec()))
            }
            KemKeys::K768 { ek: Some(ek), .. } => {
                let (ssk, ct) = ek.try_encaps_with_rng(&mut rng).map_err(|_| ErrorKind::General)?;
                Ok((ct.into_bytes().to_vec(), ssk.into_bytes().to_vec()))
            }
            KemKeys::K1024 { ek: Some(ek), .. } => {
                let (ssk, ct) = ek.try_encaps_with_rng(&mut rng).map_err(|_| ErrorKind::General)?;
                Ok((ct.into_bytes().to_vec(), ssk.into_bytes().to_vec()))
            }
            _ => Err(ErrorKind::General),
        }
    }

    fn decapsulate(&self, ct: &[u8]) -> Result<Vec<u8>, ErrorKind> {
        match &self.keys {
            KemKeys::K512 { dk: Some(dk), .. } => {
                let arr: [u8; crate::ml_kem_512::CT_LEN] = ct.try_into().map_err(|_| ErrorKind::OutOfBounds)?;
                let ct = crate::ml_kem_512::CipherText::try_from_bytes(arr).map_err(|_| ErrorKind::General)?;
                Ok(dk.try_decaps(&ct).map_err(|_| ErrorKind::General)?.into_bytes().to_vec())
            }
            KemKeys::K768 { dk: Some(dk), .. } => {
                let arr: [u8; crate::ml_kem_768::CT_LEN] = ct.try_into().map_err(|_| ErrorKind::OutOfBounds)?;
                let ct = crate::ml_kem_768::CipherText::try_from_bytes(arr).map_err(|_| ErrorKind::General)?;
                Ok(dk.try_decaps(&ct).map_err(|_| ErrorKind::General)?.into_bytes().to_vec())
            }
            KemKeys::K1024 { dk: Some(dk), .. } => {
                let arr: [u8; crate::ml_kem_1024::CT_LEN] = ct.try_into().map_err(|_| ErrorKind::OutOfBounds)?;
                let ct = crate::ml_kem_1024::CipherText::try_from_bytes(arr).map_err(|_| ErrorKind::General)?;
                Ok(dk.try_decaps(&ct).map_err(|_| ErrorKind::General)?.into_bytes().to_vec())
            }
            _ => Err(ErrorKind::General),
        }
    }
}

#[derive(Clone, Copy)]
struct CpaParams {
    k: usize,
    eta1_64: usize,
    eta2_64: usize,
    du: u32,
    dv: u32,
    ek_len: usize,
    dk_len: usize,
    ct_len: usize,
}

const CPA_PARAMS: [CpaParams; 3] = [
    CpaParams { k: 2, eta1_64: 3 * 64, eta2_64: 2 * 64, du: 10, dv: 4, ek_len: 800, dk_len: 1632, ct_len: 768 },
    CpaParams { k: 3, eta1_64: 2 * 64, eta2_64: 2 * 64, du: 10, dv: 4, ek_len: 1184, dk_len: 2400, ct_len: 1088 },
    CpaParams { k: 4, eta1_64: 2 * 64, eta2_64: 2 * 64, du: 11, dv: 5, ek_len: 1568, dk_len: 3168, ct_len: 1568 },
];

/// Kyber-CPA: the plain (non-FO-transformed) K-PKE encryption primitive exposed directly as a
/// scheme row, for callers that want CPA-secure encryption without the KEM's re-encryption
/// check (the architecture's distinction between `KyberCpaEncryption` and `KyberKem`).
pub(crate) struct KyberCpaOps {
    params: CpaParams,
    ek: Option<Vec<u8>>,
    dk: Option<Vec<u8>>,
}

impl KyberCpaOps {
    pub(crate) fn new(set: u32) -> Result<Self, ErrorKind> {
        let params = CPA_PARAMS.get(set as usize - 1).copied().ok_or(ErrorKind::InvalidFunctionCall)?;
        Ok(Self { params, ek: None, dk: None })
    }
}

impl SchemeOps for KyberCpaOps {
    fn kind(&self) -> SchemeKind { SchemeKind::KyberCpaEncryption }

    fn keygen(&mut self, prng: &mut dyn rand_core::RngCore, stats: &mut crate::scheme::Stats) -> Result<(), ErrorKind> {
        stats.keygen_trials += 1;
        let mut rng = RngAdapter(prng);
        let mut ek = alloc::vec![0u8; self.params.ek_len];
        let mut dk = alloc::vec![0u8; self.params.dk_len];
        match self.params.k {
            2 => k_pke_key_gen::<2, 192>(&mut rng, &mut ek, &mut dk),
            3 => k_pke_key_gen::<3, 128>(&mut rng, &mut ek, &mut dk),
            4 => k_pke_key_gen::<4, 128>(&mut rng, &mut ek, &mut dk),
            _ => return Err(ErrorKind::InvalidFunctionCall),
        }
        .map_err(|_| ErrorKind::General)?;
        self.ek = Some(ek);
        self.dk = Some(dk);
        Ok(())
    }

    fn public_key_encode(&self) -> Result<Vec<u8>, ErrorKind> { self.ek.clone().ok_or(ErrorKind::General) }

    fn private_key_encode(&self) -> Result<Vec<u8>, ErrorKind> { self.dk.clone().ok_or(ErrorKind::General) }

    fn public_key_load(&mut self, bytes: &[u8]) -> Result<(), ErrorKind> {
        if bytes.len() != self.params.ek_len {
            return Err(ErrorKind::OutOfBounds);
        }
        self.ek = Some(bytes.to_vec());
        Ok(())
    }

    fn private_key_load(&mut self, bytes: &[u8]) -> Result<(), ErrorKind> {
        if bytes.len() != self.params.dk_len {
            return Err(ErrorKind::OutOfBounds);
        }
        self.dk = Some(bytes.to_vec());
        Ok(())
    }

    fn encrypt(&self, msg: &[u8], prng: &mut dyn rand_core::RngCore) -> Result<Vec<u8>, ErrorKind> {
        let ek = self.ek.as_ref().ok_or(ErrorKind::General)?;
        if msg.len() != 32 {
            return Err(ErrorKind::OutOfBounds);
        }
        let mut randomness = [0u8; 32];
        prng.fill_bytes(&mut randomness);
        let mut ct = alloc::vec![0u8; self.params.ct_len];
        let CpaParams { k, du, dv, .. } = self.params;
        match k {
            2 => k_pke_encrypt::<2, 192, 128>(du, dv, ek, msg, &randomness, &mut ct),
            3 => k_pke_encrypt::<3, 128, 128>(du, dv, ek, msg, &randomness, &mut ct),
            4 => k_pke_encrypt::<4, 128, 128>(du, dv, ek, msg, &randomness, &mut ct),
            _ => return Err(ErrorKind::InvalidFunctionCall),
        }
        .map_err(|_| ErrorKind::General)?;
        Ok(ct)
    }

    fn decrypt(&self, ct: &[u8]) -> Result<Vec<u8>, ErrorKind> {
        let dk = self.dk.as_ref().ok_or(ErrorKind::General)?;
        if ct.len() != self.params.ct_len {
            return Err(ErrorKind::OutOfBounds);
        }
        let CpaParams { k, du, dv, .. } = self.params;
        let m = match k {
            2 => k_pke_decrypt::<2>(du, dv, dk, ct),
            3 => k_pke_decrypt::<3>(du, dv, dk, ct),
            4 => k_pke_decrypt::<4>(du, dv, dk, ct),
            _ => return Err(ErrorKind::InvalidFunctionCall),
        }
        .map_err(|_| ErrorKind::General)?;
        Ok(m.to_vec())
    }
}
