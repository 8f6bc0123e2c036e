//! Authenticated key exchange: composes a signature [`Instance`] and a KEM [`Instance`] into
//! the architecture's two-message mutual-authentication protocol (§4.9), rather than
//! reimplementing lattice arithmetic of its own. The initiator signs its own fresh KEM
//! encapsulation key and sends it; the responder verifies that signature, encapsulates
//! against the now-authenticated key, and signs the ciphertext it sends back; the initiator
//! verifies that signature and decapsulates. Every step is plain calls into the two composed
//! instances plus a SHAKE256 transcript hash binding the exchange together.

extern crate alloc;

use alloc::vec::Vec;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;

use crate::error_queue::ErrorKind;
use crate::scheme::Instance;

/// State produced by [`ake_2way_init`] and consumed by [`ake_2way_final`]: the initiator's
/// own encoded KEM encapsulation key, kept only in memory between the two calls so the
/// transcript hash can be recomputed without the initiator having to resend it.
pub struct InitiatorState {
    encaps_key: Vec<u8>,
}

/// Initiator step 1: generates a fresh KEM key pair in `kem`, signs the encoded encapsulation
/// key with `sig`, and returns both the encoded key and its signature to send to the
/// responder.
///
/// # Errors
/// Propagates a key-generation or encoding failure from `kem`, or a signing failure from
/// `sig`.
pub fn ake_2way_init(
    sig: &mut Instance, kem: &mut Instance,
) -> Result<(InitiatorState, Vec<u8>, Vec<u8>), ErrorKind> {
    kem.keygen()?;
    let encaps_key = kem.public_key_encode()?;
    let signature = sig.sign(&encaps_key)?;
    Ok((InitiatorState { encaps_key: encaps_key.clone() }, encaps_key, signature))
}

/// Responder step: verifies the initiator's signed encapsulation key against `peer_verifier`
/// (loaded with the initiator's public key), loads that now-authenticated key into `kem` and
/// encapsulates a shared secret against it, and signs the resulting ciphertext with `own_sig`
/// (the responder's own key pair), binding everything into a SHAKE256 transcript hash. Returns
/// `(ciphertext, response_signature, session_key)`: the first two go out to the initiator, the
/// last is this side's copy of the session key [`ake_2way_final`] will independently derive.
///
/// `peer_verifier` and `own_sig` must be two distinct instances of the same signature scheme: a
/// single [`Instance`] holds one loaded key at a time, and verifying the initiator's message
/// needs the initiator's public key while signing the response needs the responder's own
/// private key.
///
/// # Errors
/// Returns `General` if the initiator's signature fails to verify; otherwise propagates the
/// composed instances' errors.
pub fn ake_2way_response(
    own_sig: &mut Instance, peer_verifier: &mut Instance, kem: &mut Instance, peer_encaps_key: &[u8],
    peer_signature: &[u8],
) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>), ErrorKind> {
    if !peer_verifier.verify(peer_encaps_key, peer_signature)? {
        return Err(ErrorKind::General);
    }
    kem.public_key_load(peer_encaps_key)?;
    let (ciphertext, shared_secret) = kem.encapsulation()?;
    let response_signature = own_sig.sign(&ciphertext)?;
    let transcript = transcript_hash(peer_encaps_key, &ciphertext);
    let mut session_key = shared_secret;
    session_key.extend_from_slice(&transcript);
    Ok((ciphertext, response_signature, session_key))
}

/// Initiator step 2: verifies the responder's signed ciphertext against `peer_verifier`
/// (loaded with the responder's public key), decapsulates the shared secret, and folds the
/// same transcript hash the responder computed into it, producing the session key both sides
/// now hold identically.
///
/// # Errors
/// Returns `General` if the responder's signature fails to verify; otherwise propagates the
/// composed instances' errors.
pub fn ake_2way_final(
    peer_verifier: &mut Instance, kem: &mut Instance, state: &InitiatorState, ciphertext: &[u8],
    response_signature: &[u8],
) -> Result<Vec<u8>, ErrorKind> {
    if !peer_verifier.verify(ciphertext, response_signature)? {
        return Err(ErrorKind::General);
    }
    let shared_secret = kem.decapsulation(ciphertext)?;
    let transcript = transcript_hash(&state.encaps_key, ciphertext);
    let mut session_key = shared_secret;
    session_key.extend_from_slice(&transcript);
    Ok(session_key)
}

fn transcript_hash(encaps_key: &[u8], ciphertext: &[u8]) -> [u8; 64] {
    let mut hasher = Shake256::default();
    hasher.update(encaps_key);
    hasher.update(ciphertext);
    let mut out = [0u8; 64];
    hasher.finalize_xof().read(&mut out);
    out
}
