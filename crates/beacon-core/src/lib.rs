pub mod config;
pub mod error;
pub mod types;

pub use config::ProtocolConfig;
pub use error::{CoreError, Result};
pub use types::{
    EpochId, FirstVotingMessage, FollowingVotingMessage, NodeId, Proposal, ProposalClass,
    ProposalMessage, RoundId, VrfSignature, VRF_SIGNATURE_LEN,
};

/// Protocol name, bit-exact on the wire (spec.md §6).
pub const PROTOCOL_NAME: &str = "TORTOISE_BEACON_PROTOCOL";

/// VRF proposal message prefix (spec.md §3): `"TBP" ‖ epoch`.
pub const VRF_PROPOSAL_PREFIX: &str = "TBP";

/// Gossip channel names (spec.md §6), bit-exact on the wire.
pub const TB_PROPOSAL_PROTOCOL: &str = "TBProposalProtocol";
pub const TB_FIRST_VOTING_PROTOCOL: &str = "TBFirstVotingProtocol";
pub const TB_FOLLOWING_VOTING_PROTOCOL: &str = "TBFollowingVotingProtocol";
