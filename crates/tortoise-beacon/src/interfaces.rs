//! Capability traits for everything the engine treats as an external
//! collaborator (spec.md §6). Mirrors the pattern `luxtensor-consensus` uses
//! to keep the fork-choice core free of direct dependencies on storage,
//! networking, or the VRF implementation: depend on a trait object, not a
//! concrete type, and wire the real thing together in the binary crate.

use async_trait::async_trait;
use beacon_core::{EpochId, RoundId};

use crate::error::Result;

/// Layer tick source. A "layer" is the network's smallest time unit;
/// epochs are an integer number of layers.
#[async_trait]
pub trait LayerClock: Send + Sync {
    /// Blocks until the next layer tick and returns its id.
    async fn next_layer(&self) -> u64;

    fn layer_to_time(&self, layer: u64) -> std::time::SystemTime;
}

/// One ATX's relevant fields for this protocol (spec.md §3 "Eligibility
/// table").
#[derive(Debug, Clone)]
pub struct AtxHeader {
    pub node_id: beacon_core::NodeId,
    pub vrf_pub_key: Vec<u8>,
    pub num_units: u64,
}

/// Activation-transaction database: the source of per-epoch voting weight.
#[async_trait]
pub trait ActivationDb: Send + Sync {
    /// Total epoch weight and the ATX ids that compose it.
    async fn epoch_weight(&self, epoch: EpochId) -> Result<(u64, Vec<Vec<u8>>)>;

    async fn atx_header(&self, atx_id: &[u8]) -> Result<AtxHeader>;
}

/// Gossip publish sink. Channel names are the bit-exact strings in
/// `beacon_core::{TB_PROPOSAL_PROTOCOL, ..}`.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, channel: &str, bytes: Vec<u8>) -> Result<()>;
}

/// Whether the local node is caught up enough to participate. The protocol
/// is a no-op while this reports `false`.
#[async_trait]
pub trait SyncState: Send + Sync {
    async fn is_synced(&self) -> bool;
}

/// Optional persistent mirror for computed beacons (spec.md §4.7).
pub trait TortoiseBeaconDb: Send + Sync {
    fn get(&self, epoch: EpochId) -> Option<[u8; 32]>;
    fn set(&self, epoch: EpochId, value: [u8; 32]) -> Result<()>;
}

/// The weak-coin subprotocol's externally observable contract (spec.md
/// §4.8). The engine is agnostic to how the bit is actually produced.
#[async_trait]
pub trait WeakCoin: Send + Sync {
    async fn start_epoch(&self, epoch: EpochId, allowances: &[(beacon_core::NodeId, u64)]);
    async fn start_round(&self, epoch: EpochId, round: RoundId) -> Result<()>;
    async fn finish_round(&self, epoch: EpochId, round: RoundId);
    fn get(&self, epoch: EpochId, round: RoundId) -> Option<bool>;
    async fn finish_epoch(&self, epoch: EpochId);
}
