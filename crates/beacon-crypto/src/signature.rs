use crate::error::{CryptoError, Result};
use secp256k1::{ecdsa::RecoverableSignature, ecdsa::RecoveryId, Message, PublicKey, Secp256k1, SecretKey};
use zeroize::Zeroize;

/// Schnorr-style `Signer`/`VerifyExtractor` pair required by spec.md §6.
/// Implemented over secp256k1 recoverable ECDSA, following
/// `luxtensor-crypto::signature`'s `recover_address` pattern: the verifier
/// does not need the claimed public key up front, it *extracts* it from the
/// signature, exactly like the spec's `VerifyExtractor::Extract`.
pub trait Signer: Send + Sync {
    fn sign(&self, message: &[u8]) -> Vec<u8>;
    fn public_key_bytes(&self) -> Vec<u8>;
}

pub trait VerifyExtractor: Send + Sync {
    /// Recovers the signer's public key from a message + signature, or
    /// fails if the signature does not verify against any recoverable key.
    fn extract(&self, message: &[u8], signature: &[u8]) -> Result<Vec<u8>>;
}

/// Key pair backing the default `Signer`/`VerifyExtractor` implementations.
pub struct KeyPair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        let dummy = [0x01u8; 32];
        if let Ok(dummy_key) = SecretKey::from_slice(&dummy) {
            self.secret_key = dummy_key;
        }
        let mut secret_bytes = self.secret_key.secret_bytes();
        secret_bytes.zeroize();
    }
}

impl KeyPair {
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut rand::rngs::OsRng);
        Self { secret_key, public_key }
    }

    pub fn from_secret(bytes: &[u8; 32]) -> Result<Self> {
        let secret_key =
            SecretKey::from_slice(bytes).map_err(|e| CryptoError::Secp256k1Error(e.to_string()))?;
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Ok(Self { secret_key, public_key })
    }

    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public_key.serialize().to_vec()
    }
}

fn digest(message: &[u8]) -> [u8; 32] {
    crate::hash::sha256(message)
}

impl Signer for KeyPair {
    fn sign(&self, message: &[u8]) -> Vec<u8> {
        let secp = Secp256k1::new();
        let msg = Message::from_digest(digest(message));
        let sig = secp.sign_ecdsa_recoverable(&msg, &self.secret_key);
        let (recovery_id, bytes) = sig.serialize_compact();
        let mut out = Vec::with_capacity(65);
        out.extend_from_slice(&bytes);
        out.push(recovery_id.to_i32() as u8);
        out
    }

    fn public_key_bytes(&self) -> Vec<u8> {
        KeyPair::public_key_bytes(self)
    }
}

impl VerifyExtractor for std::sync::Arc<dyn VerifyExtractor> {
    fn extract(&self, message: &[u8], signature: &[u8]) -> Result<Vec<u8>> {
        (**self).extract(message, signature)
    }
}

impl Signer for std::sync::Arc<dyn Signer> {
    fn sign(&self, message: &[u8]) -> Vec<u8> {
        (**self).sign(message)
    }

    fn public_key_bytes(&self) -> Vec<u8> {
        (**self).public_key_bytes()
    }
}

/// Stateless `VerifyExtractor` — recovers the public key from any
/// 65-byte (r‖s‖v) signature.
pub struct Secp256k1Extractor;

impl VerifyExtractor for Secp256k1Extractor {
    fn extract(&self, message: &[u8], signature: &[u8]) -> Result<Vec<u8>> {
        if signature.len() != 65 {
            return Err(CryptoError::InvalidSignature);
        }
        let secp = Secp256k1::new();
        let msg = Message::from_digest(digest(message));
        let recovery_id = RecoveryId::from_i32(signature[64] as i32)
            .map_err(|_| CryptoError::InvalidSignature)?;
        let sig = RecoverableSignature::from_compact(&signature[..64], recovery_id)
            .map_err(|_| CryptoError::InvalidSignature)?;
        let pubkey = secp
            .recover_ecdsa(&msg, &sig)
            .map_err(|_| CryptoError::InvalidSignature)?;
        Ok(pubkey.serialize().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_extract_round_trips() {
        let kp = KeyPair::generate();
        let msg = b"hello tortoise beacon";
        let sig = kp.sign(msg);
        let extracted = Secp256k1Extractor.extract(msg, &sig).unwrap();
        assert_eq!(extracted, kp.public_key_bytes());
    }

    #[test]
    fn tampered_message_extracts_different_key() {
        let kp = KeyPair::generate();
        let sig = kp.sign(b"original");
        let extracted = Secp256k1Extractor.extract(b"tampered", &sig).unwrap();
        assert_ne!(extracted, kp.public_key_bytes());
    }

    #[test]
    fn malformed_signature_rejected() {
        let extracted = Secp256k1Extractor.extract(b"x", &[0u8; 10]);
        assert!(extracted.is_err());
    }
}
