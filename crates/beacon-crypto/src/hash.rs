use sha2::{Digest, Sha256};

pub type Hash32 = [u8; 32];

/// SHA-256, used for the genesis beacon constant and the tally hash
/// (spec.md §4.6).
pub fn sha256(data: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_constant_matches_spec() {
        let h = sha256(b"genesis");
        assert_eq!(
            hex::encode(h),
            "aeebad4a796fcc2e15dc4c6061b45ed9b373f26adfc798ca7d2d8cc58182718e"
        );
    }
}
