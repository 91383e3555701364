//! VRF signer/verifier contract (spec.md §6: `VRFSigner`/`VRFVerifier`).
//!
//! NOTE: this is a hash-based VRF simulation, not a full EC-VRF (RFC 9381),
//! following the same caveat `luxtensor-crypto::vrf` documents for its own
//! simulated construction. The engine only depends on the trait contract —
//! swap in a real ECVRF implementation behind `VrfSigner`/`VrfVerifier`
//! without touching `tortoise-beacon`.

use crate::error::{CryptoError, Result};
use crate::hash::sha256;

pub trait VrfSigner: Send + Sync {
    /// Produces a 64-byte VRF signature over `alpha`.
    fn vrf_sign(&self, alpha: &[u8]) -> Vec<u8>;
    fn vrf_public_key(&self) -> Vec<u8>;
}

pub trait VrfVerifier: Send + Sync {
    fn vrf_verify(&self, public_key: &[u8], alpha: &[u8], signature: &[u8]) -> Result<()>;
}

/// A deterministic hash-based VRF keypair, derived from a 32-byte seed.
pub struct VrfKeypair {
    secret: [u8; 32],
    public: [u8; 32],
}

impl VrfKeypair {
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let secret = sha256(seed);
        let mut pk_input = [0u8; 64];
        pk_input[..32].copy_from_slice(&secret);
        pk_input[32..].copy_from_slice(b"TORTOISE_BEACON_VRF_PUBKEY_DOM1");
        let public = sha256(&pk_input);
        Self { secret, public }
    }
}

impl VrfSigner for VrfKeypair {
    /// Produces `gamma ‖ proof` where `gamma = H(sk ‖ alpha)` is the VRF
    /// output half and `proof = H(pk ‖ gamma ‖ alpha)` binds the signature
    /// to this keypair, for a total of 64 bytes.
    fn vrf_sign(&self, alpha: &[u8]) -> Vec<u8> {
        let mut gamma_input = Vec::with_capacity(32 + alpha.len());
        gamma_input.extend_from_slice(&self.secret);
        gamma_input.extend_from_slice(alpha);
        let gamma = sha256(&gamma_input);

        let mut proof_input = Vec::with_capacity(64 + alpha.len());
        proof_input.extend_from_slice(&self.public);
        proof_input.extend_from_slice(&gamma);
        proof_input.extend_from_slice(alpha);
        let proof = sha256(&proof_input);

        let mut out = Vec::with_capacity(64);
        out.extend_from_slice(&gamma);
        out.extend_from_slice(&proof);
        out
    }

    fn vrf_public_key(&self) -> Vec<u8> {
        self.public.to_vec()
    }
}

impl VrfSigner for std::sync::Arc<dyn VrfSigner> {
    fn vrf_sign(&self, alpha: &[u8]) -> Vec<u8> {
        (**self).vrf_sign(alpha)
    }

    fn vrf_public_key(&self) -> Vec<u8> {
        (**self).vrf_public_key()
    }
}

impl VrfVerifier for std::sync::Arc<dyn VrfVerifier> {
    fn vrf_verify(&self, public_key: &[u8], alpha: &[u8], signature: &[u8]) -> Result<()> {
        (**self).vrf_verify(public_key, alpha, signature)
    }
}

pub struct HashVrfVerifier;

impl VrfVerifier for HashVrfVerifier {
    fn vrf_verify(&self, public_key: &[u8], alpha: &[u8], signature: &[u8]) -> Result<()> {
        if signature.len() != 64 || public_key.len() != 32 {
            return Err(CryptoError::VrfVerificationFailed);
        }
        let gamma = &signature[..32];
        let proof = &signature[32..];

        let mut proof_input = Vec::with_capacity(64 + alpha.len());
        proof_input.extend_from_slice(public_key);
        proof_input.extend_from_slice(gamma);
        proof_input.extend_from_slice(alpha);
        let expected_proof = sha256(&proof_input);

        let mut diff = 0u8;
        for (a, b) in expected_proof.iter().zip(proof.iter()) {
            diff |= a ^ b;
        }
        if diff != 0 {
            return Err(CryptoError::VrfVerificationFailed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let kp = VrfKeypair::from_seed(&[7u8; 32]);
        let alpha = b"TBP epoch 9";
        let sig = kp.vrf_sign(alpha);
        assert_eq!(sig.len(), 64);
        HashVrfVerifier.vrf_verify(&kp.vrf_public_key(), alpha, &sig).unwrap();
    }

    #[test]
    fn wrong_public_key_rejected() {
        let kp = VrfKeypair::from_seed(&[7u8; 32]);
        let other = VrfKeypair::from_seed(&[8u8; 32]);
        let alpha = b"TBP epoch 9";
        let sig = kp.vrf_sign(alpha);
        assert!(HashVrfVerifier.vrf_verify(&other.vrf_public_key(), alpha, &sig).is_err());
    }

    #[test]
    fn deterministic_for_same_seed_and_alpha() {
        let kp1 = VrfKeypair::from_seed(&[3u8; 32]);
        let kp2 = VrfKeypair::from_seed(&[3u8; 32]);
        assert_eq!(kp1.vrf_sign(b"alpha"), kp2.vrf_sign(b"alpha"));
    }
}
