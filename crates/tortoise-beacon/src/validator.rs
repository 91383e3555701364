//! Message validator (C4, spec.md §4.4).
//!
//! Implements steps 1-3 and the round-number half of step 6 of the
//! admission pipeline; eligibility/timing (step 4) lives in
//! [`crate::proposal_store`] and duplicate-sender detection (steps 5-6)
//! lives in [`crate::ledger`] — each validated message still has to pass
//! through those before it counts.

use beacon_core::{EpochId, FirstVotingMessage, FollowingVotingMessage, NodeId, Proposal, ProposalMessage, RoundId};
use beacon_crypto::{VerifyExtractor, VrfVerifier};

use crate::error::{BeaconError, Result};

fn encode_len_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

/// Canonical signed body of a [`ProposalMessage`] (everything but the
/// signature itself). Shared with the round driver so the bytes a proposer
/// signs are exactly the bytes a validator re-derives and checks.
pub(crate) fn proposal_body(msg: &ProposalMessage) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&msg.epoch.0.to_be_bytes());
    encode_len_prefixed(&mut buf, msg.node.as_bytes());
    encode_len_prefixed(&mut buf, msg.vrf_signature.as_bytes());
    buf
}

pub(crate) fn first_voting_body(msg: &FirstVotingMessage) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&msg.epoch.0.to_be_bytes());
    buf.extend_from_slice(&(msg.valid_proposals.len() as u32).to_be_bytes());
    for p in &msg.valid_proposals {
        encode_len_prefixed(&mut buf, p);
    }
    buf.extend_from_slice(&(msg.potentially_valid_proposals.len() as u32).to_be_bytes());
    for p in &msg.potentially_valid_proposals {
        encode_len_prefixed(&mut buf, p);
    }
    buf
}

pub(crate) fn following_voting_body(msg: &FollowingVotingMessage) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&msg.epoch.0.to_be_bytes());
    buf.extend_from_slice(&msg.round.0.to_be_bytes());
    buf.extend_from_slice(&(msg.votes_bit_vector.len() as u32).to_be_bytes());
    for bit in &msg.votes_bit_vector {
        buf.push(*bit as u8);
    }
    buf
}

pub struct MessageValidator<E, V> {
    extractor: E,
    vrf_verifier: V,
}

impl<E, V> MessageValidator<E, V>
where
    E: VerifyExtractor,
    V: VrfVerifier,
{
    pub fn new(extractor: E, vrf_verifier: V) -> Self {
        Self { extractor, vrf_verifier }
    }

    /// Steps 1-3 (shape is a precondition of the typed argument, signature,
    /// epoch) plus the VRF check that is logically part of eligibility but
    /// cheap to do alongside signature verification.
    pub fn validate_proposal(
        &self,
        epoch: EpochId,
        msg: &ProposalMessage,
        signature: &[u8],
        sender_vrf_pub_key: &[u8],
    ) -> Result<Proposal> {
        let body = proposal_body(msg);
        let recovered = self.extractor.extract(&body, signature)?;
        if recovered != msg.node.as_bytes() {
            return Err(BeaconError::SignatureInvalid);
        }
        if msg.epoch != epoch {
            return Err(BeaconError::EpochMismatch { want: epoch, got: msg.epoch });
        }
        let alpha = Proposal::vrf_message(epoch);
        self.vrf_verifier
            .vrf_verify(sender_vrf_pub_key, &alpha, msg.vrf_signature.as_bytes())?;
        Ok(Proposal {
            epoch: msg.epoch,
            node: msg.node.clone(),
            vrf_signature: msg.vrf_signature.clone(),
        })
    }

    pub fn validate_first_vote(&self, epoch: EpochId, sender: &NodeId, msg: &FirstVotingMessage) -> Result<()> {
        let body = first_voting_body(msg);
        let recovered = self.extractor.extract(&body, &msg.signature)?;
        if recovered != sender.as_bytes() {
            return Err(BeaconError::SignatureInvalid);
        }
        if msg.epoch != epoch {
            return Err(BeaconError::EpochMismatch { want: epoch, got: msg.epoch });
        }
        Ok(())
    }

    pub fn validate_following_vote(
        &self,
        epoch: EpochId,
        current_round: RoundId,
        sender: &NodeId,
        msg: &FollowingVotingMessage,
    ) -> Result<()> {
        let body = following_voting_body(msg);
        let recovered = self.extractor.extract(&body, &msg.signature)?;
        if recovered != sender.as_bytes() {
            return Err(BeaconError::SignatureInvalid);
        }
        if msg.epoch != epoch {
            return Err(BeaconError::EpochMismatch { want: epoch, got: msg.epoch });
        }
        if msg.round != current_round {
            return Err(BeaconError::WrongRound { round: msg.round.0 });
        }
        Ok(())
    }
}
