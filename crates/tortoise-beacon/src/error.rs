use beacon_core::EpochId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BeaconError {
    #[error("zero epoch weight")]
    ZeroEpochWeight,

    #[error("epoch {0} requested but epochs start at 1")]
    ErrZeroEpoch(EpochId),

    #[error("beacon for epoch {0} has not been calculated")]
    ErrBeaconNotCalculated(EpochId),

    #[error("sync state was never installed before Start()")]
    SyncStateMissing,

    #[error("wire message did not decode to the expected shape")]
    WireDecode,

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("message epoch {got} does not match current epoch {want}")]
    EpochMismatch { want: EpochId, got: EpochId },

    #[error("proposal is not eligible: vrf output did not clear the threshold")]
    NotEligible,

    #[error("proposal classified as rejected (too late or invalid)")]
    ProposalRejected,

    #[error("sender already voted for this round")]
    AlreadyVoted,

    #[error("duplicate proposal from this sender this epoch")]
    DuplicateProposal,

    #[error("bit vector round {round} does not match the round being admitted")]
    WrongRound { round: u32 },

    #[error(transparent)]
    Core(#[from] beacon_core::CoreError),

    #[error(transparent)]
    Crypto(#[from] beacon_crypto::CryptoError),

    #[error("invariant violated: attempted duplicate beacon write for {epoch} with a different value")]
    DuplicateBeaconWrite { epoch: EpochId },

    #[error("invariant violated: unable to load ATX set for epoch {0}")]
    AtxLoadFailed(EpochId),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, BeaconError>;
