use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("secp256k1 error: {0}")]
    Secp256k1Error(String),

    #[error("vrf verification failed")]
    VrfVerificationFailed,
}

pub type Result<T> = std::result::Result<T, CryptoError>;
