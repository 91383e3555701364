//! Weak-coin adapter (C8, spec.md §4.8).
//!
//! The spec deliberately treats the coin's internals as out of scope — only
//! its contract is load-bearing. `DeterministicWeakCoin` is a stand-in
//! collaborator that satisfies the contract without any of the security
//! properties a real weak-coin subprotocol would provide; it exists so the
//! round driver and the node binary have something concrete to run against.

use std::collections::HashMap;

use async_trait::async_trait;
use beacon_core::{EpochId, NodeId, RoundId};
use parking_lot::RwLock;

use crate::error::Result;
use crate::interfaces::WeakCoin;

pub struct DeterministicWeakCoin {
    seed: [u8; 32],
    values: RwLock<HashMap<(EpochId, RoundId), bool>>,
}

impl DeterministicWeakCoin {
    pub fn new(seed: [u8; 32]) -> Self {
        Self { seed, values: RwLock::new(HashMap::new()) }
    }
}

#[async_trait]
impl WeakCoin for DeterministicWeakCoin {
    async fn start_epoch(&self, _epoch: EpochId, _allowances: &[(NodeId, u64)]) {}

    async fn start_round(&self, epoch: EpochId, round: RoundId) -> Result<()> {
        let mut input = Vec::with_capacity(32 + 8);
        input.extend_from_slice(&self.seed);
        input.extend_from_slice(&epoch.0.to_be_bytes());
        input.extend_from_slice(&round.0.to_be_bytes());
        let digest = beacon_crypto::sha256(&input);
        let bit = digest[0] & 1 == 1;
        self.values.write().insert((epoch, round), bit);
        Ok(())
    }

    async fn finish_round(&self, _epoch: EpochId, _round: RoundId) {}

    fn get(&self, epoch: EpochId, round: RoundId) -> Option<bool> {
        self.values.read().get(&(epoch, round)).copied()
    }

    async fn finish_epoch(&self, epoch: EpochId) {
        self.values.write().retain(|(e, _), _| *e != epoch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn value_is_stable_once_round_started() {
        let coin = DeterministicWeakCoin::new([1u8; 32]);
        assert!(coin.get(EpochId(1), RoundId(1)).is_none());
        coin.start_round(EpochId(1), RoundId(1)).await.unwrap();
        let first = coin.get(EpochId(1), RoundId(1));
        assert!(first.is_some());
        assert_eq!(first, coin.get(EpochId(1), RoundId(1)));
    }

    #[tokio::test]
    async fn finish_epoch_releases_its_rounds() {
        let coin = DeterministicWeakCoin::new([1u8; 32]);
        coin.start_round(EpochId(1), RoundId(1)).await.unwrap();
        coin.finish_epoch(EpochId(1)).await;
        assert!(coin.get(EpochId(1), RoundId(1)).is_none());
    }
}
