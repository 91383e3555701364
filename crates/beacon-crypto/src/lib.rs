pub mod error;
pub mod hash;
pub mod signature;
pub mod vrf;

pub use error::{CryptoError, Result};
pub use hash::{sha256, Hash32};
pub use signature::{KeyPair, Secp256k1Extractor, Signer, VerifyExtractor};
pub use vrf::{HashVrfVerifier, VrfKeypair, VrfSigner, VrfVerifier};
