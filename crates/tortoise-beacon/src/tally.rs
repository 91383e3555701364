//! Tally and per-round vote computation (C6, spec.md §4.6).

use num_bigint::BigInt;

use crate::ledger::VoteLedger;

/// The caller's own opinion set for the round about to start, derived from
/// the ledger as of the end of the previous round.
pub struct OwnOpinion {
    pub valid: Vec<Vec<u8>>,
    pub invalid: Vec<Vec<u8>>,
}

/// `calc_votes(E, r, previous_coin)`. Undecided proposals (margin strictly
/// between `-V(W)` and `V(W)`) are resolved by the previous round's weak
/// coin — its sole role in the protocol (spec.md §4.6).
///
/// `reference_order` must be the same fixed bit-vector reference order used
/// for the whole epoch (spec.md §9) — not re-derived from the ledger, whose
/// key set keeps growing as more votes are admitted.
pub fn calc_votes(ledger: &VoteLedger, voting_threshold: &BigInt, reference_order: &[Vec<u8>], previous_coin: bool) -> OwnOpinion {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    let neg_threshold = -voting_threshold.clone();
    for id in reference_order {
        let margin = ledger.margin(id);
        let goes_valid = if margin >= *voting_threshold {
            true
        } else if margin <= neg_threshold {
            false
        } else {
            previous_coin
        };
        if goes_valid {
            valid.push(id.clone());
        } else {
            invalid.push(id.clone());
        }
    }
    OwnOpinion { valid, invalid }
}

/// `beacon = sha256(concat(sort_lex(winning_set)))` (spec.md §4.6). An empty
/// winning set is legal and yields `sha256("")`.
pub fn derive_beacon(winning_set: &[Vec<u8>]) -> [u8; 32] {
    let mut sorted: Vec<&Vec<u8>> = winning_set.iter().collect();
    sorted.sort();
    let mut buf = Vec::new();
    for id in sorted {
        buf.extend_from_slice(id);
    }
    beacon_crypto::sha256(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::{NodeId, RoundId};

    #[test]
    fn decided_margins_ignore_the_coin() {
        let mut ledger = VoteLedger::new();
        ledger
            .admit_first(&NodeId::new(vec![1]), 100, &[vec![1u8]], &[])
            .unwrap();
        let opinion = calc_votes(&ledger, &BigInt::from(50), &[vec![1u8]], false);
        assert_eq!(opinion.valid, vec![vec![1u8]]);
    }

    #[test]
    fn undecided_margin_follows_the_coin() {
        let mut ledger = VoteLedger::new();
        ledger
            .admit_following(RoundId(2), &NodeId::new(vec![1]), 10, &[true], &[vec![1u8]])
            .unwrap();
        let with_true = calc_votes(&ledger, &BigInt::from(50), &[vec![1u8]], true);
        assert_eq!(with_true.valid, vec![vec![1u8]]);

        let with_false = calc_votes(&ledger, &BigInt::from(50), &[vec![1u8]], false);
        assert_eq!(with_false.invalid, vec![vec![1u8]]);
    }

    #[test]
    fn empty_winning_set_hashes_the_empty_string() {
        let beacon = derive_beacon(&[]);
        assert_eq!(
            hex::encode(beacon),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn winning_set_is_sorted_before_hashing() {
        let a = derive_beacon(&[vec![2u8], vec![1u8]]);
        let b = derive_beacon(&[vec![1u8], vec![2u8]]);
        assert_eq!(a, b);
    }

    proptest::proptest! {
        /// P4/P6: the beacon is a pure function of the winning set — any
        /// permutation of the same ids, fed through two independent calls,
        /// derives the identical 32 bytes.
        #[test]
        fn derive_beacon_is_order_independent(ids in proptest::collection::vec(proptest::collection::vec(proptest::prelude::any::<u8>(), 1..16), 0..10)) {
            let mut shuffled = ids.clone();
            shuffled.reverse();
            proptest::prop_assert_eq!(derive_beacon(&ids), derive_beacon(&shuffled));
        }
    }
}
