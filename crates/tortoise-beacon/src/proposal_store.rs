//! Per-epoch proposal store (C2, spec.md §4.2).
//!
//! One instance lives for exactly one epoch (spec.md §3 "Lifecycle"): built
//! when the epoch's round driver starts, sealed at the proposal deadline,
//! and dropped at the end of `handle_epoch`.

use std::collections::{BTreeSet, HashSet};
use std::time::Instant;

use beacon_core::{EpochId, Proposal, ProposalClass};
use num_bigint::BigUint;

use crate::error::{BeaconError, Result};
use crate::threshold;

pub struct ProposalSnapshot {
    pub valid: Vec<Proposal>,
    pub potentially_valid: Vec<Proposal>,
}

pub struct ProposalStore {
    epoch: EpochId,
    threshold: BigUint,
    deadline: Instant,
    grace_deadline: Instant,
    seen_senders: HashSet<Vec<u8>>,
    valid: BTreeSet<Proposal>,
    potentially_valid: BTreeSet<Proposal>,
}

impl ProposalStore {
    pub fn new(epoch: EpochId, threshold: BigUint, deadline: Instant, grace: std::time::Duration) -> Self {
        Self {
            epoch,
            threshold,
            deadline,
            grace_deadline: deadline + grace,
            seen_senders: HashSet::new(),
            valid: BTreeSet::new(),
            potentially_valid: BTreeSet::new(),
        }
    }

    /// Classifies and inserts a gossip-received proposal (spec.md §4.2, §3
    /// "Proposal classification"). One proposal per sender per epoch; a
    /// repeat from the same node id is rejected regardless of content.
    pub fn classify_and_insert(&mut self, proposal: Proposal, received_at: Instant) -> Result<ProposalClass> {
        if proposal.epoch != self.epoch {
            return Err(BeaconError::EpochMismatch { want: self.epoch, got: proposal.epoch });
        }
        if !self.seen_senders.insert(proposal.node.as_bytes().to_vec()) {
            return Err(BeaconError::DuplicateProposal);
        }
        if !threshold::is_eligible(&proposal.vrf_signature.as_big_uint(), &self.threshold) {
            return Err(BeaconError::NotEligible);
        }
        let class = if received_at <= self.deadline {
            ProposalClass::Valid
        } else if received_at <= self.grace_deadline {
            ProposalClass::PotentiallyValid
        } else {
            return Err(BeaconError::ProposalRejected);
        };
        match class {
            ProposalClass::Valid => {
                self.valid.insert(proposal);
            }
            ProposalClass::PotentiallyValid => {
                self.potentially_valid.insert(proposal);
            }
            ProposalClass::Rejected => unreachable!("rejected never reaches insertion"),
        }
        Ok(class)
    }

    /// The local node's own proposal is admitted as *valid* directly,
    /// bypassing the gossip receipt path (spec.md §4.2 edge case), but it
    /// still has to clear eligibility.
    pub fn insert_local(&mut self, proposal: Proposal) -> Result<()> {
        if proposal.epoch != self.epoch {
            return Err(BeaconError::EpochMismatch { want: self.epoch, got: proposal.epoch });
        }
        if !threshold::is_eligible(&proposal.vrf_signature.as_big_uint(), &self.threshold) {
            return Err(BeaconError::NotEligible);
        }
        self.seen_senders.insert(proposal.node.as_bytes().to_vec());
        self.valid.insert(proposal);
        Ok(())
    }

    /// Ordered lexicographically over signature bytes — the canonical,
    /// network-wide deterministic order (spec.md §4.2, §9).
    pub fn snapshot(&self) -> ProposalSnapshot {
        ProposalSnapshot {
            valid: self.valid.iter().cloned().collect(),
            potentially_valid: self.potentially_valid.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::{NodeId, VrfSignature};
    use num_bigint::BigUint;
    use std::time::Duration;

    fn proposal(epoch: u32, node: u8, sig_byte: u8) -> Proposal {
        Proposal {
            epoch: EpochId(epoch),
            node: NodeId::new(vec![node]),
            vrf_signature: VrfSignature::from_bytes(vec![sig_byte; 64]).unwrap(),
        }
    }

    fn always_eligible_threshold() -> BigUint {
        BigUint::from(1u8) << 512u32
    }

    #[test]
    fn before_deadline_is_valid() {
        let now = Instant::now();
        let mut store = ProposalStore::new(EpochId(1), always_eligible_threshold(), now + Duration::from_secs(10), Duration::from_secs(5));
        let class = store.classify_and_insert(proposal(1, 1, 1), now).unwrap();
        assert_eq!(class, ProposalClass::Valid);
    }

    #[test]
    fn within_grace_is_potentially_valid() {
        let now = Instant::now();
        let deadline = now;
        let mut store = ProposalStore::new(EpochId(1), always_eligible_threshold(), deadline, Duration::from_secs(5));
        let class = store
            .classify_and_insert(proposal(1, 1, 1), deadline + Duration::from_secs(2))
            .unwrap();
        assert_eq!(class, ProposalClass::PotentiallyValid);
    }

    #[test]
    fn past_grace_is_rejected() {
        let now = Instant::now();
        let mut store = ProposalStore::new(EpochId(1), always_eligible_threshold(), now, Duration::from_secs(5));
        let err = store
            .classify_and_insert(proposal(1, 1, 1), now + Duration::from_secs(10))
            .unwrap_err();
        assert!(matches!(err, BeaconError::ProposalRejected));
    }

    #[test]
    fn duplicate_sender_rejected() {
        let now = Instant::now();
        let mut store = ProposalStore::new(EpochId(1), always_eligible_threshold(), now + Duration::from_secs(10), Duration::from_secs(5));
        store.classify_and_insert(proposal(1, 1, 1), now).unwrap();
        let err = store.classify_and_insert(proposal(1, 1, 2), now).unwrap_err();
        assert!(matches!(err, BeaconError::DuplicateProposal));
    }

    #[test]
    fn ineligible_signature_rejected() {
        let now = Instant::now();
        let mut store = ProposalStore::new(EpochId(1), BigUint::from(0u8), now + Duration::from_secs(10), Duration::from_secs(5));
        let err = store.classify_and_insert(proposal(1, 1, 1), now).unwrap_err();
        assert!(matches!(err, BeaconError::NotEligible));
    }

    #[test]
    fn snapshot_is_lexicographically_sorted() {
        let now = Instant::now();
        let mut store = ProposalStore::new(EpochId(1), always_eligible_threshold(), now + Duration::from_secs(10), Duration::from_secs(5));
        store.classify_and_insert(proposal(1, 1, 9), now).unwrap();
        store.classify_and_insert(proposal(1, 2, 1), now).unwrap();
        let snap = store.snapshot();
        assert_eq!(snap.valid.len(), 2);
        assert!(snap.valid[0].vrf_signature.as_bytes() < snap.valid[1].vrf_signature.as_bytes());
    }
}
