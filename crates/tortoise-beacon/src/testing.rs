//! Deterministic stand-ins for every collaborator interface in
//! [`crate::interfaces`]. Used by this crate's own integration tests and by
//! the node binary's demo mode — not gated behind `#[cfg(test)]` so both can
//! depend on it directly, the same way `luxtensor-consensus` ships a
//! `testing` module alongside its production fork-choice code.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use beacon_core::EpochId;
use parking_lot::RwLock;

use crate::error::{BeaconError, Result};
use crate::interfaces::{ActivationDb, AtxHeader, Broadcaster, LayerClock, SyncState, TortoiseBeaconDb};

/// Ticks once per `layer_duration`, counting monotonically from 1.
pub struct IntervalLayerClock {
    layer_duration: Duration,
    counter: AtomicU64,
}

impl IntervalLayerClock {
    pub fn new(layer_duration: Duration) -> Self {
        Self { layer_duration, counter: AtomicU64::new(0) }
    }
}

#[async_trait]
impl LayerClock for IntervalLayerClock {
    async fn next_layer(&self) -> u64 {
        tokio::time::sleep(self.layer_duration).await;
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn layer_to_time(&self, layer: u64) -> SystemTime {
        SystemTime::now() + self.layer_duration * layer as u32
    }
}

/// A fixed epoch weight and ATX set, the same for every epoch queried.
pub struct StaticActivationDb {
    weight: u64,
    atxs: Vec<(Vec<u8>, AtxHeader)>,
}

impl StaticActivationDb {
    pub fn new(weight: u64, atxs: Vec<(Vec<u8>, AtxHeader)>) -> Self {
        Self { weight, atxs }
    }
}

#[async_trait]
impl ActivationDb for StaticActivationDb {
    async fn epoch_weight(&self, _epoch: EpochId) -> Result<(u64, Vec<Vec<u8>>)> {
        Ok((self.weight, self.atxs.iter().map(|(id, _)| id.clone()).collect()))
    }

    async fn atx_header(&self, atx_id: &[u8]) -> Result<AtxHeader> {
        self.atxs
            .iter()
            .find(|(id, _)| id == atx_id)
            .map(|(_, header)| header.clone())
            .ok_or(BeaconError::AtxLoadFailed(EpochId(0)))
    }
}

/// Records every broadcast instead of sending it anywhere.
#[derive(Default)]
pub struct RecordingBroadcaster {
    sent: RwLock<Vec<(String, Vec<u8>)>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, Vec<u8>)> {
        self.sent.read().clone()
    }
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn broadcast(&self, channel: &str, bytes: Vec<u8>) -> Result<()> {
        self.sent.write().push((channel.to_string(), bytes));
        Ok(())
    }
}

pub struct AlwaysSynced;

#[async_trait]
impl SyncState for AlwaysSynced {
    async fn is_synced(&self) -> bool {
        true
    }
}

#[derive(Default)]
pub struct InMemoryBeaconMirror {
    map: RwLock<HashMap<EpochId, [u8; 32]>>,
}

impl InMemoryBeaconMirror {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TortoiseBeaconDb for InMemoryBeaconMirror {
    fn get(&self, epoch: EpochId) -> Option<[u8; 32]> {
        self.map.read().get(&epoch).copied()
    }

    fn set(&self, epoch: EpochId, value: [u8; 32]) -> Result<()> {
        self.map.write().insert(epoch, value);
        Ok(())
    }
}
