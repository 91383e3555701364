//! Vote ledger (C3, spec.md §4.3): a signed, arbitrary-precision accumulator
//! of weighted votes per proposal.
//!
//! Weights can exceed `2^64` once summed across many ATXs (spec.md §9), so
//! margins live in `BigInt` rather than any bounded-width integer.

use std::collections::{HashMap, HashSet};

use beacon_core::{NodeId, RoundId};
use num_bigint::BigInt;
use num_traits::Zero;

use crate::error::{BeaconError, Result};

pub struct FinalClassification {
    pub valid: Vec<Vec<u8>>,
    pub invalid: Vec<Vec<u8>>,
    pub undecided: Vec<Vec<u8>>,
}

pub struct VoteLedger {
    margins: HashMap<Vec<u8>, BigInt>,
    voted_first: HashSet<Vec<u8>>,
    voted_following: HashMap<RoundId, HashSet<Vec<u8>>>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self {
            margins: HashMap::new(),
            voted_first: HashSet::new(),
            voted_following: HashMap::new(),
        }
    }

    /// Round 1 admission: `valid_set` proposals get `+w`; `potentially_valid_set`
    /// proposals get `0` (they neither help nor hurt relative to the local
    /// view at r=1) but are still registered so later rounds can vote on
    /// them (spec.md §4.3).
    pub fn admit_first(
        &mut self,
        sender: &NodeId,
        sender_weight: u64,
        valid_set: &[Vec<u8>],
        potentially_valid_set: &[Vec<u8>],
    ) -> Result<()> {
        if !self.voted_first.insert(sender.as_bytes().to_vec()) {
            return Err(BeaconError::AlreadyVoted);
        }
        let weight = BigInt::from(sender_weight);
        for id in valid_set {
            *self.margins.entry(id.clone()).or_insert_with(BigInt::zero) += &weight;
        }
        for id in potentially_valid_set {
            self.margins.entry(id.clone()).or_insert_with(BigInt::zero);
        }
        Ok(())
    }

    /// Round r≥2 admission: each bit is interpreted against `reference_order`,
    /// the network-wide deterministic ordering fixed at round start (spec.md
    /// §9 "Bit-vector reference order"). Bit set ⇒ `+w`, unset ⇒ `−w`.
    pub fn admit_following(
        &mut self,
        round: RoundId,
        sender: &NodeId,
        sender_weight: u64,
        bit_vector: &[bool],
        reference_order: &[Vec<u8>],
    ) -> Result<()> {
        if bit_vector.len() != reference_order.len() {
            return Err(BeaconError::WrongRound { round: round.0 });
        }
        let voted = self.voted_following.entry(round).or_default();
        if !voted.insert(sender.as_bytes().to_vec()) {
            return Err(BeaconError::AlreadyVoted);
        }
        let weight = BigInt::from(sender_weight);
        for (bit, id) in bit_vector.iter().zip(reference_order.iter()) {
            let entry = self.margins.entry(id.clone()).or_insert_with(BigInt::zero);
            if *bit {
                *entry += &weight;
            } else {
                *entry -= &weight;
            }
        }
        Ok(())
    }

    pub fn margin(&self, id: &[u8]) -> BigInt {
        self.margins.get(id).cloned().unwrap_or_else(BigInt::zero)
    }

    /// Partitions every known proposal by its margin against `voting_threshold`
    /// (spec.md §4.3).
    pub fn final_classification(&self, voting_threshold: &BigInt) -> FinalClassification {
        let mut valid = Vec::new();
        let mut invalid = Vec::new();
        let mut undecided = Vec::new();
        for (id, margin) in &self.margins {
            if margin >= voting_threshold {
                valid.push(id.clone());
            } else if margin <= &-voting_threshold.clone() {
                invalid.push(id.clone());
            } else {
                undecided.push(id.clone());
            }
        }
        valid.sort();
        invalid.sort();
        undecided.sort();
        FinalClassification { valid, invalid, undecided }
    }
}

impl Default for VoteLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(b: u8) -> NodeId {
        NodeId::new(vec![b])
    }

    #[test]
    fn admit_first_credits_valid_and_zeroes_potentially_valid() {
        let mut ledger = VoteLedger::new();
        ledger.admit_first(&node(1), 100, &[vec![1u8]], &[vec![2u8]]).unwrap();
        assert_eq!(ledger.margin(&[1u8]), BigInt::from(100));
        assert_eq!(ledger.margin(&[2u8]), BigInt::from(0));
    }

    #[test]
    fn repeat_sender_in_round_one_is_rejected() {
        let mut ledger = VoteLedger::new();
        ledger.admit_first(&node(1), 100, &[vec![1u8]], &[]).unwrap();
        let before = ledger.margin(&[1u8]);
        let err = ledger.admit_first(&node(1), 100, &[vec![1u8]], &[]).unwrap_err();
        assert!(matches!(err, BeaconError::AlreadyVoted));
        assert_eq!(ledger.margin(&[1u8]), before);
    }

    #[test]
    fn following_round_applies_signed_weights() {
        let mut ledger = VoteLedger::new();
        let order = vec![vec![1u8], vec![2u8]];
        ledger
            .admit_following(RoundId(2), &node(1), 50, &[true, false], &order)
            .unwrap();
        assert_eq!(ledger.margin(&[1u8]), BigInt::from(50));
        assert_eq!(ledger.margin(&[2u8]), BigInt::from(-50));
    }

    #[test]
    fn mismatched_bit_vector_length_rejected() {
        let mut ledger = VoteLedger::new();
        let order = vec![vec![1u8], vec![2u8]];
        let err = ledger
            .admit_following(RoundId(2), &node(1), 50, &[true], &order)
            .unwrap_err();
        assert!(matches!(err, BeaconError::WrongRound { round: 2 }));
    }

    #[test]
    fn final_classification_partitions_by_threshold() {
        let mut ledger = VoteLedger::new();
        ledger
            .admit_first(&node(1), 100, &[vec![1u8], vec![2u8]], &[vec![3u8]])
            .unwrap();
        ledger
            .admit_following(RoundId(2), &node(2), 10, &[false, true], &[vec![1u8], vec![2u8]])
            .unwrap();
        let result = ledger.final_classification(&BigInt::from(50));
        assert!(result.valid.contains(&vec![2u8]));
        assert!(result.undecided.contains(&vec![1u8]) || result.valid.contains(&vec![1u8]));
        assert!(result.undecided.contains(&vec![3u8]));
    }

    proptest::proptest! {
        /// P3: a sender's second first-round admission in the same epoch is
        /// always rejected, regardless of which proposals it claims to vote
        /// on, and the margins it already contributed are left untouched.
        #[test]
        fn second_admission_from_same_sender_never_counts_twice(
            weight in 1u64..=1_000_000,
            ids in proptest::collection::vec(proptest::collection::vec(proptest::prelude::any::<u8>(), 1..8), 1..5),
        ) {
            let mut ledger = VoteLedger::new();
            let sender = node(7);
            ledger.admit_first(&sender, weight, &ids, &[]).unwrap();
            let margins_before: Vec<BigInt> = ids.iter().map(|id| ledger.margin(id)).collect();

            let err = ledger.admit_first(&sender, weight, &ids, &[]).unwrap_err();
            proptest::prop_assert!(matches!(err, BeaconError::AlreadyVoted));

            let margins_after: Vec<BigInt> = ids.iter().map(|id| ledger.margin(id)).collect();
            proptest::prop_assert_eq!(margins_before, margins_after);
        }
    }
}
