use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{CoreError, Result};

/// Monotonically increasing epoch counter. `0` and any epoch configured as
/// "genesis" skip the protocol entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpochId(pub u32);

impl EpochId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn prev(self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for EpochId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "epoch#{}", self.0)
    }
}

/// Round identifier. `0` is the proposal phase, `1..=K` are voting rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoundId(pub u32);

impl RoundId {
    pub const PROPOSAL: RoundId = RoundId(0);
    pub const FIRST_VOTING: RoundId = RoundId(1);

    pub fn is_proposal(self) -> bool {
        self.0 == 0
    }

    pub fn is_first_voting(self) -> bool {
        self.0 == 1
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for RoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "round#{}", self.0)
    }
}

/// Opaque node identity, an Ed25519-style public key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(Vec<u8>);

impl NodeId {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// A 64-byte VRF output. The byte length matches the bit width `2^512` used
/// by the eligibility threshold (spec.md §4.1) so eligibility is a uniform
/// Bernoulli trial over the signature space.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VrfSignature(Vec<u8>);

pub const VRF_SIGNATURE_LEN: usize = 64;

impl VrfSignature {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != VRF_SIGNATURE_LEN {
            return Err(CoreError::InvalidVrfSignature {
                expected: VRF_SIGNATURE_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Big-endian interpretation used against the ATX threshold (I3).
    pub fn as_big_uint(&self) -> num_bigint::BigUint {
        num_bigint::BigUint::from_bytes_be(&self.0)
    }
}

/// A proposal's identity is its VRF signature bytes (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub epoch: EpochId,
    pub node: NodeId,
    pub vrf_signature: VrfSignature,
}

impl Proposal {
    /// Canonical wire identity: the VRF signature bytes, used as the ledger
    /// and bit-vector reference-order key (spec.md §3, §9 "Bit-vector
    /// reference order").
    pub fn id(&self) -> &[u8] {
        self.vrf_signature.as_bytes()
    }

    /// Message signed by the VRF: `"TBP" ‖ epoch` (spec.md §3).
    pub fn vrf_message(epoch: EpochId) -> Vec<u8> {
        let mut msg = Vec::with_capacity(3 + 4);
        msg.extend_from_slice(crate::VRF_PROPOSAL_PREFIX.as_bytes());
        msg.extend_from_slice(&epoch.0.to_be_bytes());
        msg
    }
}

impl PartialOrd for Proposal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Proposal {
    /// Lexicographic ascending order over signature bytes — the canonical,
    /// network-wide deterministic order (spec.md §4.2, §9).
    fn cmp(&self, other: &Self) -> Ordering {
        self.id().cmp(other.id())
    }
}

/// A receiving node's classification of a proposal (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalClass {
    Valid,
    PotentiallyValid,
    Rejected,
}

/// First-round vote message: the sender's classification sets (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirstVotingMessage {
    pub epoch: EpochId,
    pub valid_proposals: Vec<Vec<u8>>,
    pub potentially_valid_proposals: Vec<Vec<u8>>,
    pub signature: Vec<u8>,
}

/// Following-round vote message: a bit vector over the reference order
/// (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowingVotingMessage {
    pub epoch: EpochId,
    pub round: RoundId,
    pub votes_bit_vector: Vec<bool>,
    pub signature: Vec<u8>,
}

/// Wire form of a proposal broadcast (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalMessage {
    pub epoch: EpochId,
    pub node: NodeId,
    pub vrf_signature: VrfSignature,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proposal_order_is_lexicographic_on_signature() {
        let a = VrfSignature::from_bytes(vec![0x01; 64]).unwrap();
        let b = VrfSignature::from_bytes(vec![0x02; 64]).unwrap();
        let pa = Proposal { epoch: EpochId(1), node: NodeId::new(vec![1]), vrf_signature: a };
        let pb = Proposal { epoch: EpochId(1), node: NodeId::new(vec![2]), vrf_signature: b };
        assert!(pa < pb);
    }

    #[test]
    fn vrf_signature_rejects_wrong_length() {
        assert!(VrfSignature::from_bytes(vec![0u8; 32]).is_err());
        assert!(VrfSignature::from_bytes(vec![0u8; 64]).is_ok());
    }
}
