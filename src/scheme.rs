//! The scheme registry, dispatch guard, and per-instance state described by the
//! architecture: a process-wide table of operation hooks keyed by [`SchemeKind`], and the
//! [`Instance`] that owns everything a running scheme touches (PRNGs, keys, scratch,
//! statistics, error queue).
//!
//! There is deliberately no virtual inheritance or hot-path pattern match here beyond the
//! one `match` that picks a scheme's create-hook: every operation after `create` goes
//! through [`SchemeOps`], a single object-safe trait whose default methods already return
//! `InvalidFunctionCall`, so an "absent" hook is the ordinary trait default rather than a
//! null pointer the caller could forget to check.

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;

use crate::error_queue::{ErrorKind, ErrorQueue};

/// The process-global nonce folded into every PRNG seed at `init_instance` time.
pub(crate) const NONCE: &[u8; 16] = b"SAFEcrypto nonce";

/// Upper bound on rejection-sampling retries before a scheme gives up (§5).
pub const RETRY_LIMIT: u32 = 99_999;

/// Identifies which scheme an [`Instance`] was created for; resolves to one row of the
/// (conceptual) scheme table at create time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchemeKind {
    /// Trivial scheme used only to exercise the dispatch plumbing.
    HelloWorld,
    /// BLISS-B signature.
    Bliss,
    /// Dilithium signature (uniform `y`).
    Dilithium,
    /// Dilithium-G signature (Gaussian `y`).
    DilithiumG,
    /// ring-TESLA signature — table row present, hooks unimplemented in this build.
    RingTesla,
    /// ENS signature — table row present, hooks unimplemented in this build.
    EnsSignature,
    /// ENS signature with message recovery — table row present, hooks unimplemented.
    EnsWithRecovery,
    /// DLP signature — table row present, hooks unimplemented in this build.
    Dlp,
    /// DLP signature with message recovery — table row present, hooks unimplemented.
    DlpWithRecovery,
    /// Falcon signature — table row present, hooks unimplemented in this build.
    Falcon,
    /// Ring-LWE encryption — table row present, hooks unimplemented in this build.
    RlweEncryption,
    /// Kyber CPA-secure public-key encryption.
    KyberCpaEncryption,
    /// ENS KEM — table row present, hooks unimplemented in this build.
    EnsKem,
    /// Kyber KEM (CCA-secure via an FO-style transform).
    KyberKem,
    /// DLP identity-based encryption — table row present, hooks unimplemented.
    DlpIbe,
    /// Elliptic-curve Diffie-Hellman — stub row, per the source's empty-bodied hooks.
    Ecdh,
    /// ECDSA — stub row, per the source's empty-bodied hooks.
    Ecdsa,
}

/// A crude processing-statistics record; schemes update the counters they care about.
#[derive(Clone, Copy, Debug, Default)]
pub struct Stats {
    /// Number of keygen attempts (including rejected/retried trials).
    pub keygen_trials: u64,
    /// Number of sign attempts (including rejected trials).
    pub sign_trials: u64,
    /// Number of successful operations of any kind run on this instance.
    pub successes: u64,
}

/// The single dispatch surface every scheme implements. Every method has a default that
/// records `InvalidFunctionCall` and returns `Err` — a scheme need only override the
/// operations it actually supports, and everything else is automatically "this scheme does
/// not support that call" without a null check anywhere.
pub trait SchemeOps {
    /// Which [`SchemeKind`] this implementation serves (used for sanity checks on load).
    fn kind(&self) -> SchemeKind;

    /// Generates a fresh key pair using the instance's default (PRNG index 0).
    fn keygen(&mut self, prng: &mut dyn rand_core::RngCore, stats: &mut Stats) -> Result<(), ErrorKind> {
        let _ = (prng, stats);
        Err(ErrorKind::InvalidFunctionCall)
    }

    /// Serializes the current public key.
    fn public_key_encode(&self) -> Result<Vec<u8>, ErrorKind> { Err(ErrorKind::InvalidFunctionCall) }

    /// Serializes the current private key.
    fn private_key_encode(&self) -> Result<Vec<u8>, ErrorKind> { Err(ErrorKind::InvalidFunctionCall) }

    /// Loads a public key from its wire encoding.
    fn public_key_load(&mut self, bytes: &[u8]) -> Result<(), ErrorKind> {
        let _ = bytes;
        Err(ErrorKind::InvalidFunctionCall)
    }

    /// Loads a private key from its wire encoding.
    fn private_key_load(&mut self, bytes: &[u8]) -> Result<(), ErrorKind> {
        let _ = bytes;
        Err(ErrorKind::InvalidFunctionCall)
    }

    /// Signs `msg` with the loaded private key.
    fn sign(&mut self, msg: &[u8], prng: &mut dyn rand_core::RngCore, stats: &mut Stats) -> Result<Vec<u8>, ErrorKind> {
        let _ = (msg, prng, stats);
        Err(ErrorKind::InvalidFunctionCall)
    }

    /// Verifies `sig` over `msg` against the loaded public key.
    fn verify(&self, msg: &[u8], sig: &[u8]) -> Result<bool, ErrorKind> {
        let _ = (msg, sig);
        Err(ErrorKind::InvalidFunctionCall)
    }

    /// Encrypts `msg` under the loaded public key.
    fn encrypt(&self, msg: &[u8], prng: &mut dyn rand_core::RngCore) -> Result<Vec<u8>, ErrorKind> {
        let _ = (msg, prng);
        Err(ErrorKind::InvalidFunctionCall)
    }

    /// Decrypts `ct` with the loaded private key.
    fn decrypt(&self, ct: &[u8]) -> Result<Vec<u8>, ErrorKind> {
        let _ = ct;
        Err(ErrorKind::InvalidFunctionCall)
    }

    /// KEM encapsulation against the loaded public key: returns `(ciphertext, shared_key)`.
    fn encapsulate(&self, prng: &mut dyn rand_core::RngCore) -> Result<(Vec<u8>, Vec<u8>), ErrorKind> {
        let _ = prng;
        Err(ErrorKind::InvalidFunctionCall)
    }

    /// KEM decapsulation with the loaded private key.
    fn decapsulate(&self, ct: &[u8]) -> Result<Vec<u8>, ErrorKind> {
        let _ = ct;
        Err(ErrorKind::InvalidFunctionCall)
    }
}

/// A minimal deterministic RNG/XOF adapter used for the instance's PRNG pool: each slot is
/// seeded once (entropy-source bytes plus the global nonce) and then streams from a SHAKE256
/// XOF. Real entropy-source/PRNG-kind selection (AES-CTR-DRBG, ISAAC, ChaCha, ...) is named
/// by the flag words but treated as an external collaborator per the architecture; this is
/// the one concrete implementation the core needs to actually run.
pub(crate) struct ShakeRng {
    reader: <Shake256 as ExtendableOutput>::Reader,
}

impl ShakeRng {
    fn seeded(seed: &[u8], index: u8) -> Self {
        let mut hasher = Shake256::default();
        hasher.update(seed);
        hasher.update(&[index]);
        hasher.update(NONCE);
        Self { reader: hasher.finalize_xof() }
    }
}

impl rand_core::RngCore for ShakeRng {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.reader.read(&mut buf);
        u32::from_le_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.reader.read(&mut buf);
        u64::from_le_bytes(buf)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) { self.reader.read(dest); }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.reader.read(dest);
        Ok(())
    }
}

impl rand_core::CryptoRng for ShakeRng {}

/// Word-0/1/2 flag bits resolved out of the caller's zero-terminated flag-word array.
#[derive(Clone, Copy, Debug, Default)]
pub struct InstanceFlags {
    /// Entropy-coder selection for key/signature packing (word 0, low nibble).
    pub huffman_coding: bool,
    /// Number of PRNG instances to allocate: 1 (constrained) or 4 (full).
    pub num_prngs: u8,
    /// Sample-blinding side-channel knob (word 2).
    pub sampler_blinding: bool,
    /// Sample-shuffle side-channel knob (word 2).
    pub sampler_shuffle: bool,
    /// Whether the scratch buffer is supplied externally via `scratch_external`.
    pub scratch_external: bool,
}

const MORE: u32 = 1 << 31;

/// Parses the zero-terminated, `MORE`-chained flag-word array described in §6.2.
#[must_use]
pub fn parse_flags(words: &[u32]) -> InstanceFlags {
    let mut flags = InstanceFlags { num_prngs: 4, ..InstanceFlags::default() };
    for (i, &word) in words.iter().enumerate() {
        match i {
            0 => flags.huffman_coding = word & 0x1 != 0,
            1 => flags.num_prngs = if word & 0x2 != 0 { 1 } else { 4 },
            2 => {
                flags.sampler_blinding = word & 0x1 != 0;
                flags.sampler_shuffle = word & 0x2 != 0;
                flags.scratch_external = word & 0x4 != 0;
            }
            _ => {}
        }
        if word & MORE == 0 {
            break;
        }
    }
    flags
}

/// Exclusive owner of everything one running scheme touches. See the architecture's
/// `Instance` lifetime: `Created -> (keys loaded/generated) -> (operations*) -> Destroyed`.
pub struct Instance {
    kind: SchemeKind,
    ops: Box<dyn SchemeOps>,
    prngs: Vec<ShakeRng>,
    /// The error queue; public so callers can drain it after a `FAILURE` return.
    pub error_queue: ErrorQueue,
    pub(crate) stats: Stats,
    scratch: Option<Vec<u8>>,
    temp_size: usize,
    temp_ready: bool,
    flags: InstanceFlags,
}

impl Instance {
    /// `init_instance`: allocates PRNGs, an error queue, empty keys, and runs the scheme's
    /// create-hook. `entropy_seed` stands in for the OS-random/`/dev/urandom`/callback
    /// entropy source named by word 1 of the flags (an external collaborator here).
    ///
    /// # Errors
    /// Returns `InvalidFunctionCall` if `set` is out of range for `kind`, wrapped in a queued
    /// error the caller can inspect via `error_queue`.
    pub fn create(kind: SchemeKind, set: u32, flags_words: &[u32], entropy_seed: &[u8]) -> Result<Self, ErrorKind> {
        let flags = parse_flags(flags_words);
        let mut prngs = Vec::with_capacity(flags.num_prngs as usize);
        for i in 0..flags.num_prngs {
            prngs.push(ShakeRng::seeded(entropy_seed, i));
        }
        let ops = create_ops(kind, set, &flags)?;
        let temp_size = ops_scratch_size(kind);
        log::debug!("created {kind:?} instance, set {set}, {} prngs, scratch {temp_size}", flags.num_prngs);
        Ok(Self {
            kind,
            ops,
            prngs,
            error_queue: ErrorQueue::new(),
            stats: Stats::default(),
            scratch: if flags.scratch_external { None } else { Some(alloc::vec![0u8; temp_size]) },
            temp_size,
            temp_ready: !flags.scratch_external,
            flags,
        })
    }

    /// The scheme this instance was created for.
    #[must_use]
    pub fn kind(&self) -> SchemeKind { self.kind }

    /// Bytes required for the scratch buffer (`scratch_size` in §6.1).
    #[must_use]
    pub fn scratch_size(&self) -> usize { self.temp_size }

    /// Supplies an externally-owned scratch buffer; required before any operation when the
    /// instance was created with the `scratch_external` flag.
    ///
    /// # Errors
    /// Returns `OutOfBounds` if `mem.len()` is smaller than `scratch_size()`.
    pub fn scratch_external(&mut self, mem: Vec<u8>) -> Result<(), ErrorKind> {
        if mem.len() < self.temp_size {
            self.error_queue.add_err_code(ErrorKind::OutOfBounds, file!(), i64::from(line!()));
            return Err(ErrorKind::OutOfBounds);
        }
        self.scratch = Some(mem);
        self.temp_ready = true;
        Ok(())
    }

    fn guard(&mut self) -> Result<(), ErrorKind> {
        if !self.temp_ready {
            self.error_queue.add_err_code(ErrorKind::General, file!(), i64::from(line!()));
            return Err(ErrorKind::General);
        }
        Ok(())
    }

    /// Dispatch guard + delegate: validates the instance then calls the scheme's `keygen`.
    ///
    /// # Errors
    /// `General` if the scratch buffer isn't ready yet; otherwise whatever the scheme
    /// reports (commonly `InvalidFunctionCall` if keygen isn't supported for this scheme).
    pub fn keygen(&mut self) -> Result<(), ErrorKind> {
        self.guard()?;
        let prng = &mut self.prngs[0];
        let result = self.ops.keygen(prng, &mut self.stats);
        self.record_failure(&result);
        result
    }

    /// Dispatch guard + delegate: `sign`.
    ///
    /// # Errors
    /// See [`Instance::keygen`].
    pub fn sign(&mut self, msg: &[u8]) -> Result<Vec<u8>, ErrorKind> {
        self.guard()?;
        let prng = &mut self.prngs[0];
        let result = self.ops.sign(msg, prng, &mut self.stats);
        self.record_failure(&result);
        result
    }

    /// Dispatch guard + delegate: `verify`.
    ///
    /// # Errors
    /// See [`Instance::keygen`].
    pub fn verify(&mut self, msg: &[u8], sig: &[u8]) -> Result<bool, ErrorKind> {
        self.guard()?;
        let result = self.ops.verify(msg, sig);
        self.record_failure(&result);
        result
    }

    /// Dispatch guard + delegate: `encrypt`.
    ///
    /// # Errors
    /// See [`Instance::keygen`].
    pub fn encrypt(&mut self, msg: &[u8]) -> Result<Vec<u8>, ErrorKind> {
        self.guard()?;
        let prng = &mut self.prngs[0];
        let result = self.ops.encrypt(msg, prng);
        self.record_failure(&result);
        result
    }

    /// Dispatch guard + delegate: `decrypt`.
    ///
    /// # Errors
    /// See [`Instance::keygen`].
    pub fn decrypt(&mut self, ct: &[u8]) -> Result<Vec<u8>, ErrorKind> {
        self.guard()?;
        let result = self.ops.decrypt(ct);
        self.record_failure(&result);
        result
    }

    /// Dispatch guard + delegate: `encapsulation`.
    ///
    /// # Errors
    /// See [`Instance::keygen`].
    pub fn encapsulation(&mut self) -> Result<(Vec<u8>, Vec<u8>), ErrorKind> {
        self.guard()?;
        let prng = &mut self.prngs[0];
        let result = self.ops.encapsulate(prng);
        self.record_failure(&result);
        result
    }

    /// Dispatch guard + delegate: `decapsulation`.
    ///
    /// # Errors
    /// See [`Instance::keygen`].
    pub fn decapsulation(&mut self, ct: &[u8]) -> Result<Vec<u8>, ErrorKind> {
        self.guard()?;
        let result = self.ops.decapsulate(ct);
        self.record_failure(&result);
        result
    }

    /// `public_key_encode`.
    ///
    /// # Errors
    /// See [`Instance::keygen`].
    pub fn public_key_encode(&mut self) -> Result<Vec<u8>, ErrorKind> {
        self.guard()?;
        let result = self.ops.public_key_encode();
        self.record_failure(&result);
        result
    }

    /// `private_key_encode`.
    ///
    /// # Errors
    /// See [`Instance::keygen`].
    pub fn private_key_encode(&mut self) -> Result<Vec<u8>, ErrorKind> {
        self.guard()?;
        let result = self.ops.private_key_encode();
        self.record_failure(&result);
        result
    }

    /// `public_key_load`.
    ///
    /// # Errors
    /// See [`Instance::keygen`].
    pub fn public_key_load(&mut self, bytes: &[u8]) -> Result<(), ErrorKind> {
        self.guard()?;
        let result = self.ops.public_key_load(bytes);
        self.record_failure(&result);
        result
    }

    /// `private_key_load`.
    ///
    /// # Errors
    /// See [`Instance::keygen`].
    pub fn private_key_load(&mut self, bytes: &[u8]) -> Result<(), ErrorKind> {
        self.guard()?;
        let result = self.ops.private_key_load(bytes);
        self.record_failure(&result);
        result
    }

    /// `processing_stats`: a snapshot of the counters this instance has accumulated.
    #[must_use]
    pub fn processing_stats(&self) -> Stats { self.stats }

    fn record_failure<T>(&mut self, result: &Result<T, ErrorKind>) {
        match result {
            Ok(_) => self.stats.successes += 1,
            Err(kind) => {
                log::error!("{:?} instance reported {kind}", self.kind);
                self.error_queue.add_err_code(*kind, file!(), i64::from(line!()));
            }
        }
    }
}

fn ops_scratch_size(kind: SchemeKind) -> usize {
    // A generous fixed scratch allowance per scheme family; real sizing would come from the
    // resolved parameter set's buffer requirements.
    match kind {
        SchemeKind::Bliss => 8192,
        SchemeKind::Dilithium | SchemeKind::DilithiumG => 16384,
        SchemeKind::KyberKem | SchemeKind::KyberCpaEncryption => 4096,
        _ => 1024,
    }
}

fn create_ops(kind: SchemeKind, set: u32, flags: &InstanceFlags) -> Result<Box<dyn SchemeOps>, ErrorKind> {
    match kind {
        SchemeKind::Bliss => make_bliss(set, flags),
        SchemeKind::Dilithium => make_dilithium(set, false, flags),
        SchemeKind::DilithiumG => make_dilithium(set, true, flags),
        SchemeKind::KyberKem => Ok(Box::new(crate::kyber_dispatch::KyberKemOps::new(set)?)),
        SchemeKind::KyberCpaEncryption => Ok(Box::new(crate::kyber_dispatch::KyberCpaOps::new(set)?)),
        SchemeKind::HelloWorld => Ok(Box::new(HelloWorld)),
        // These rows exist (enumerated SchemeKinds, named table entries) but carry no hooks
        // in this build: the dispatch guard handles them uniformly via SchemeOps' defaults.
        SchemeKind::RingTesla
        | SchemeKind::EnsSignature
        | SchemeKind::EnsWithRecovery
        | SchemeKind::Dlp
        | SchemeKind::DlpWithRecovery
        | SchemeKind::Falcon
        | SchemeKind::RlweEncryption
        | SchemeKind::EnsKem
        | SchemeKind::DlpIbe
        | SchemeKind::Ecdh
        | SchemeKind::Ecdsa => Ok(Box::new(Unsupported(kind))),
    }
}

#[cfg(feature = "bliss")]
fn make_bliss(set: u32, flags: &InstanceFlags) -> Result<Box<dyn SchemeOps>, ErrorKind> {
    crate::bliss::new_bliss_scheme(set, flags)
}

#[cfg(not(feature = "bliss"))]
fn make_bliss(_set: u32, _flags: &InstanceFlags) -> Result<Box<dyn SchemeOps>, ErrorKind> {
    Err(ErrorKind::DisabledAtCompile)
}

#[cfg(any(feature = "dilithium", feature = "dilithium-g"))]
fn make_dilithium(set: u32, gaussian: bool, flags: &InstanceFlags) -> Result<Box<dyn SchemeOps>, ErrorKind> {
    if gaussian && cfg!(not(feature = "dilithium-g")) {
        return Err(ErrorKind::DisabledAtCompile);
    }
    if !gaussian && cfg!(not(feature = "dilithium")) {
        return Err(ErrorKind::DisabledAtCompile);
    }
    Ok(Box::new(crate::dilithium::DilithiumScheme::new(set, gaussian, flags)?))
}

#[cfg(not(any(feature = "dilithium", feature = "dilithium-g")))]
fn make_dilithium(_set: u32, _gaussian: bool, _flags: &InstanceFlags) -> Result<Box<dyn SchemeOps>, ErrorKind> {
    Err(ErrorKind::DisabledAtCompile)
}

struct HelloWorld;
impl SchemeOps for HelloWorld {
    fn kind(&self) -> SchemeKind { SchemeKind::HelloWorld }

    fn keygen(&mut self, _prng: &mut dyn rand_core::RngCore, _stats: &mut Stats) -> Result<(), ErrorKind> { Ok(()) }
}

struct Unsupported(SchemeKind);
impl SchemeOps for Unsupported {
    fn kind(&self) -> SchemeKind { self.0 }
}


#[cfg(test)]
mod tests {
    use super::{Instance, SchemeKind, MORE};

    #[test]
    fn dispatch_guard_fails_for_unimplemented_rows() {
        let mut inst = Instance::create(SchemeKind::Falcon, 1, &[0], b"seed").unwrap();
        assert!(inst.keygen().is_err());
        assert_eq!(inst.error_queue.len(), 1);
    }

    #[test]
    fn helloworld_keygen_succeeds_and_unsupported_ops_fail() {
        let mut inst = Instance::create(SchemeKind::HelloWorld, 1, &[0], b"seed").unwrap();
        assert!(inst.keygen().is_ok());
        assert!(inst.sign(b"hi").is_err());
    }

    #[test]
    fn scratch_external_gates_operations() {
        let flags = [0, 0, 0x4]; // word 2 bit 2 set: scratch external required
        let mut inst = Instance::create(SchemeKind::Bliss, 4, &flags, b"seed").unwrap();
        assert!(inst.keygen().is_err());
        let size = inst.scratch_size();
        inst.scratch_external(alloc::vec![0u8; size]).unwrap();
        assert!(inst.keygen().is_ok());
    }

    #[test]
    fn flag_words_parse_more_chain() {
        use super::parse_flags;
        let words = [0x1 | MORE, 0x2 | MORE, 0x4];
        let flags = parse_flags(&words);
        assert!(flags.huffman_coding);
        assert_eq!(flags.num_prngs, 1);
        assert!(flags.scratch_external);
    }
}
