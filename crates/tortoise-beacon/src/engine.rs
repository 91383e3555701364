//! The top-level engine: `Start`/`Close`/`IsClosed`/`GetBeacon`/`SetSyncState`
//! (spec.md §6 "Exposed"). Wires the layer listener, the ATX lookup, and one
//! round driver task per epoch together; holds no business logic of its own
//! beyond that wiring and the epoch-boundary bookkeeping spec.md §5
//! describes (closing epoch E−1's inbound channel when E starts).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use beacon_core::{EpochId, NodeId, ProtocolConfig};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::driver::{self, EligibilityTable, Inbound, RoundDriverDeps};
use crate::error::{BeaconError, Result};
use crate::interfaces::{ActivationDb, LayerClock, SyncState};
use crate::store::BeaconStore;

pub struct TortoiseBeaconConfig {
    pub layers_per_epoch: u64,
    pub genesis_epochs: u32,
}

pub struct TortoiseBeacon {
    config: TortoiseBeaconConfig,
    driver_deps: RoundDriverDeps,
    activation_db: Arc<dyn ActivationDb>,
    layer_clock: Arc<dyn LayerClock>,
    beacon_store: Arc<BeaconStore>,
    sync_state: RwLock<Option<Arc<dyn SyncState>>>,
    started: AtomicBool,
    closed: AtomicBool,
    process_cancel: CancellationToken,
    listener_handle: Mutex<Option<JoinHandle<()>>>,
    epoch_task: Mutex<Option<JoinHandle<()>>>,
    current_epoch: RwLock<Option<(EpochId, mpsc::Sender<Inbound>, CancellationToken)>>,
}

impl TortoiseBeacon {
    pub fn new(
        config: TortoiseBeaconConfig,
        driver_deps: RoundDriverDeps,
        activation_db: Arc<dyn ActivationDb>,
        layer_clock: Arc<dyn LayerClock>,
        beacon_store: Arc<BeaconStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            driver_deps,
            activation_db,
            layer_clock,
            beacon_store,
            sync_state: RwLock::new(None),
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            process_cancel: CancellationToken::new(),
            listener_handle: Mutex::new(None),
            epoch_task: Mutex::new(None),
            current_epoch: RwLock::new(None),
        })
    }

    /// Must be called exactly once before [`Self::start`] (spec.md §6).
    pub fn set_sync_state(&self, sync_state: Arc<dyn SyncState>) {
        *self.sync_state.write() = Some(sync_state);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Idempotent-by-CAS; fails only if the sync provider was never
    /// installed (spec.md §6).
    pub fn start(self: &Arc<Self>) -> Result<()> {
        if self.sync_state.read().is_none() {
            return Err(BeaconError::SyncStateMissing);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move { engine.layer_listener_loop().await });
        *self.listener_handle.lock() = Some(handle);
        Ok(())
    }

    /// Cancels and joins all workers.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.process_cancel.cancel();
        if let Some((_, _, epoch_cancel)) = self.current_epoch.write().take() {
            epoch_cancel.cancel();
        }
        let listener_handle = self.listener_handle.lock().take();
        if let Some(handle) = listener_handle {
            let _ = handle.await;
        }
        let epoch_task = self.epoch_task.lock().take();
        if let Some(handle) = epoch_task {
            let _ = handle.await;
        }
    }

    /// See spec.md §4.7: returns the beacon computed during `target_epoch - 1`.
    pub fn get_beacon(&self, target_epoch: EpochId) -> Result<[u8; 32]> {
        self.beacon_store.get(target_epoch)
    }

    /// Routes an already-decoded inbound message to the currently running
    /// epoch, if any. Messages for any other epoch (late arrivals for a
    /// closed epoch, or messages for an epoch not yet started) are dropped
    /// silently — closing epoch E's channel when E+1 starts is exactly how
    /// spec.md §5 describes late-proposal rejection.
    pub fn submit(&self, epoch: EpochId, message: Inbound) {
        let current = self.current_epoch.read();
        match current.as_ref() {
            Some((current_epoch, sender, _)) if *current_epoch == epoch => {
                if sender.try_send(message).is_err() {
                    warn!(%epoch, "inbound channel full or closed, dropping message");
                }
            }
            _ => debug_dropped(epoch),
        }
    }

    async fn layer_listener_loop(self: Arc<Self>) {
        let mut last_epoch: Option<EpochId> = None;
        loop {
            tokio::select! {
                _ = self.process_cancel.cancelled() => return,
                layer = self.layer_clock.next_layer() => {
                    let layer = layer.saturating_sub(1);
                    let epoch = EpochId((layer / self.config.layers_per_epoch) as u32 + 1);
                    let is_first_layer = layer % self.config.layers_per_epoch == 0;
                    if !is_first_layer || last_epoch == Some(epoch) {
                        continue;
                    }
                    last_epoch = Some(epoch);
                    // Spawned, not awaited: the listener must keep ticking
                    // so it can observe E+1's first layer and replace/cancel
                    // E's still-running driver (spec.md §5 "starting epoch
                    // E first closes the proposal channel of E−1"). Awaiting
                    // `handle_epoch` here directly would make that
                    // replacement dead code — the loop could never see a
                    // new tick until the previous epoch had already
                    // returned on its own.
                    let engine = Arc::clone(&self);
                    let handle = tokio::spawn(async move { engine.handle_epoch(epoch).await });
                    *self.epoch_task.lock() = Some(handle);
                }
            }
        }
    }

    async fn handle_epoch(self: &Arc<Self>, epoch: EpochId) {
        if epoch.0 <= self.config.genesis_epochs {
            info!(%epoch, "genesis epoch, skipping round driver");
            return;
        }
        let synced = match self.sync_state.read().as_ref() {
            Some(s) => Arc::clone(s),
            None => return,
        };
        if !synced.is_synced().await {
            info!(%epoch, "not synced, skipping epoch");
            return;
        }

        let (epoch_weight, atx_ids) = match self.activation_db.epoch_weight(epoch).await {
            Ok(v) => v,
            Err(err) => {
                error!(%epoch, ?err, "failed to load ATX set, no beacon this epoch");
                return;
            }
        };

        let mut weights = HashMap::new();
        let mut vrf_pub_keys = HashMap::new();
        for atx_id in &atx_ids {
            if let Ok(header) = self.activation_db.atx_header(atx_id).await {
                weights.insert(header.node_id.as_bytes().to_vec(), header.num_units);
                vrf_pub_keys.insert(header.node_id.as_bytes().to_vec(), header.vrf_pub_key);
            }
        }
        let node_weight = *weights.get(self.driver_deps.node_id.as_bytes()).unwrap_or(&0);
        let table = EligibilityTable { weights, vrf_pub_keys };

        let (tx, rx) = mpsc::channel(1024);
        let epoch_cancel = self.process_cancel.child_token();
        if let Some((_, _, previous_cancel)) = self.current_epoch.write().replace((epoch, tx, epoch_cancel.clone())) {
            previous_cancel.cancel();
        }

        match driver::run_epoch(&self.driver_deps, epoch, epoch_weight, node_weight, &table, rx, epoch_cancel).await {
            Ok(outcome) => {
                if let Some(beacon) = outcome.beacon {
                    if let Err(err) = self.beacon_store.set(epoch, beacon) {
                        error!(%epoch, ?err, "invariant violation writing beacon");
                    }
                }
            }
            Err(err) => error!(%epoch, ?err, "round driver failed"),
        }
    }
}

fn debug_dropped(epoch: EpochId) {
    tracing::debug!(%epoch, "dropping inbound message for an epoch that is not currently running");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::{AtxHeader, Broadcaster};
    use crate::testing::{AlwaysSynced, InMemoryBeaconMirror, IntervalLayerClock, RecordingBroadcaster, StaticActivationDb};
    use crate::validator::MessageValidator;
    use crate::weak_coin::DeterministicWeakCoin;
    use beacon_crypto::{HashVrfVerifier, KeyPair, Secp256k1Extractor, Signer, VrfKeypair, VrfSigner, VrfVerifier};
    use std::time::Duration;

    fn fast_config() -> Arc<ProtocolConfig> {
        Arc::new(ProtocolConfig {
            rounds_per_epoch: 1,
            kappa: 400,
            q_numerator: 1,
            q_denominator: 3,
            theta_numerator: 1,
            theta_denominator: 4,
            wait_after_epoch_start_secs: 0,
            proposal_duration_secs: 0,
            first_voting_round_duration_secs: 0,
            voting_round_duration_secs: 0,
            weak_coin_round_duration_secs: 0,
            proposal_grace_secs: 0,
        })
    }

    fn build_engine() -> Arc<TortoiseBeacon> {
        let keys = Arc::new(KeyPair::generate());
        let vrf = Arc::new(VrfKeypair::from_seed(&[3u8; 32]));
        let node_id = NodeId::new(keys.public_key_bytes());

        let atx_id = vec![0xAAu8];
        let header = AtxHeader { node_id: node_id.clone(), vrf_pub_key: vrf.vrf_public_key(), num_units: 10_000 };
        let activation_db = Arc::new(StaticActivationDb::new(10_000, vec![(atx_id, header)]));

        let validator = Arc::new(MessageValidator::new(
            Arc::new(Secp256k1Extractor) as Arc<dyn beacon_crypto::VerifyExtractor>,
            Arc::new(HashVrfVerifier) as Arc<dyn VrfVerifier>,
        ));

        let driver_deps = RoundDriverDeps {
            config: fast_config(),
            node_id,
            signer: keys as Arc<dyn Signer>,
            vrf_signer: vrf as Arc<dyn VrfSigner>,
            broadcaster: Arc::new(RecordingBroadcaster::new()) as Arc<dyn Broadcaster>,
            weak_coin: Arc::new(DeterministicWeakCoin::new([9u8; 32])),
            validator,
        };

        let config = TortoiseBeaconConfig { layers_per_epoch: 1, genesis_epochs: 1 };
        let beacon_store = Arc::new(BeaconStore::new(1, Some(Box::new(InMemoryBeaconMirror::new()))));
        let layer_clock = Arc::new(IntervalLayerClock::new(Duration::from_millis(1)));

        TortoiseBeacon::new(config, driver_deps, activation_db, layer_clock, beacon_store)
    }

    #[test]
    fn start_without_sync_state_errors() {
        let engine = build_engine();
        assert!(matches!(engine.start(), Err(BeaconError::SyncStateMissing)));
    }

    #[test]
    fn get_beacon_for_genesis_epoch_does_not_require_start() {
        let engine = build_engine();
        assert_eq!(engine.get_beacon(EpochId(1)).unwrap(), crate::store::genesis_beacon());
    }

    #[tokio::test]
    async fn start_is_idempotent_after_sync_state_installed() {
        let engine = build_engine();
        engine.set_sync_state(Arc::new(AlwaysSynced));
        engine.start().unwrap();
        engine.start().unwrap();
        engine.close().await;
        assert!(engine.is_closed());
    }
}
