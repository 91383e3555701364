use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("zero epoch weight")]
    ZeroEpochWeight,

    #[error("epoch is in the genesis range")]
    GenesisEpoch,

    #[error("invalid node id: expected {expected} bytes, got {actual}")]
    InvalidNodeId { expected: usize, actual: usize },

    #[error("invalid vrf signature length: expected {expected} bytes, got {actual}")]
    InvalidVrfSignature { expected: usize, actual: usize },

    #[error("bit vector length {got} does not match reference order length {expected}")]
    BitVectorLengthMismatch { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, CoreError>;
