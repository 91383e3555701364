//! Round driver (C5, spec.md §4.5): `idle → wait_stabilise → proposing →
//! round(1..K) → tally → done`, driven by timers and by epoch cancellation.
//!
//! `ProposalStore` and `VoteLedger` are owned locally by the single task
//! running `run_epoch` rather than behind the shared lock spec.md §5
//! describes — with only one task ever touching them, a lock would protect
//! nothing. The shared `RwLock`/mutex boundary from §5 is realized instead
//! at [`crate::store::BeaconStore`] and the weak-coin adapter, which
//! `GetBeacon` and other epochs' tasks can reach concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use beacon_core::{EpochId, FirstVotingMessage, FollowingVotingMessage, NodeId, ProposalMessage, ProtocolConfig, RoundId};
use beacon_crypto::{Signer, VerifyExtractor, VrfSigner, VrfVerifier};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::interfaces::{Broadcaster, WeakCoin};
use crate::ledger::VoteLedger;
use crate::proposal_store::ProposalStore;
use crate::tally;
use crate::threshold::{atx_threshold, is_eligible, voting_threshold};
use crate::validator::{first_voting_body, following_voting_body, proposal_body, MessageValidator};

/// Collaborators the driver needs for every epoch it runs.
pub struct RoundDriverDeps {
    pub config: Arc<ProtocolConfig>,
    pub node_id: NodeId,
    pub signer: Arc<dyn Signer>,
    pub vrf_signer: Arc<dyn VrfSigner>,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub weak_coin: Arc<dyn WeakCoin>,
    pub validator: Arc<MessageValidator<Arc<dyn VerifyExtractor>, Arc<dyn VrfVerifier>>>,
}

/// One inbound gossip message, already wire-decoded (validator step 1).
pub enum Inbound {
    Proposal { msg: ProposalMessage, signature: Vec<u8> },
    FirstVote { sender: NodeId, msg: FirstVotingMessage },
    FollowingVote { sender: NodeId, msg: FollowingVotingMessage },
}

pub struct EpochOutcome {
    pub epoch: EpochId,
    pub beacon: Option<[u8; 32]>,
}

/// Per-epoch weight and VRF-key lookup, fixed at epoch start from the ATX
/// set (spec.md §3 "Eligibility table").
pub struct EligibilityTable {
    pub weights: HashMap<Vec<u8>, u64>,
    pub vrf_pub_keys: HashMap<Vec<u8>, Vec<u8>>,
}

async fn drain_until<F: FnMut(Inbound)>(deadline: Instant, inbound: &mut mpsc::Receiver<Inbound>, mut handle: F) {
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(remaining) => return,
            maybe = inbound.recv() => match maybe {
                Some(msg) => handle(msg),
                None => return,
            }
        }
    }
}

/// Runs one epoch to completion, or unwinds without a beacon on
/// cancellation (spec.md §4.5). `node_weight` is this node's own ATX
/// weight; `0` means it holds no eligibility this epoch but the epoch
/// still runs (spec.md §8 scenario 2, "zero-weight refusal").
#[allow(clippy::too_many_arguments)]
pub async fn run_epoch(
    deps: &RoundDriverDeps,
    epoch: EpochId,
    epoch_weight: u64,
    node_weight: u64,
    table: &EligibilityTable,
    mut inbound: mpsc::Receiver<Inbound>,
    cancel: CancellationToken,
) -> Result<EpochOutcome> {
    let cfg = &deps.config;

    tokio::select! {
        _ = tokio::time::sleep(cfg.wait_after_epoch_start()) => {}
        _ = cancel.cancelled() => return Ok(EpochOutcome { epoch, beacon: None }),
    }

    let eligibility_threshold = match atx_threshold(epoch_weight, cfg.kappa, cfg.q()) {
        Ok(t) => t,
        Err(_) => BigUint::zero(),
    };
    let voting_threshold = voting_threshold(epoch_weight, cfg.theta());

    let deadline = Instant::now() + cfg.proposal_duration();
    let mut proposal_store = ProposalStore::new(epoch, eligibility_threshold.clone(), deadline, cfg.proposal_grace());

    if node_weight > 0 {
        let alpha = beacon_core::Proposal::vrf_message(epoch);
        let vrf_signature = deps.vrf_signer.vrf_sign(&alpha);
        if let Ok(sig) = beacon_core::VrfSignature::from_bytes(vrf_signature.clone()) {
            if is_eligible(&sig.as_big_uint(), &eligibility_threshold) {
                let proposal = beacon_core::Proposal { epoch, node: deps.node_id.clone(), vrf_signature: sig };
                if proposal_store.insert_local(proposal).is_ok() {
                    let wire = ProposalMessage {
                        epoch,
                        node: deps.node_id.clone(),
                        vrf_signature: beacon_core::VrfSignature::from_bytes(vrf_signature)?,
                    };
                    let signature = deps.signer.sign(&proposal_body(&wire));
                    let bytes = encode_wire(&ProposalEnvelope { msg: wire, signature });
                    let _ = deps.broadcaster.broadcast(beacon_core::TB_PROPOSAL_PROTOCOL, bytes).await;
                }
            }
        }
    }

    drain_until(deadline, &mut inbound, |msg| {
        if let Inbound::Proposal { msg, signature } = msg {
            match table.vrf_pub_keys.get(msg.node.as_bytes()) {
                Some(vrf_pub_key) => {
                    if let Err(err) = deps
                        .validator
                        .validate_proposal(epoch, &msg, &signature, vrf_pub_key)
                        .and_then(|proposal| proposal_store.classify_and_insert(proposal, Instant::now()).map(|_| ()))
                    {
                        debug!(?err, "rejected inbound proposal");
                    }
                }
                None => debug!(node = %msg.node, "proposal from a node with no known ATX vrf key"),
            }
        }
    })
    .await;

    let snapshot = proposal_store.snapshot();
    // Fixed once, at the start of round 1, so every node that saw the same
    // proposal set derives the same bit order for every round of this
    // epoch (spec.md §9 "Bit-vector reference order"). Never recomputed
    // from the ledger afterwards: the ledger's key set keeps growing as
    // more votes are admitted, and re-deriving the order per-call would let
    // sender and receiver (or two receivers) disagree on what bit N means.
    let mut reference_order: Vec<Vec<u8>> = snapshot
        .valid
        .iter()
        .chain(snapshot.potentially_valid.iter())
        .map(|p| p.id().to_vec())
        .collect();
    reference_order.sort();
    reference_order.dedup();
    let mut ledger = VoteLedger::new();
    let mut previous_coin = false;

    for round in 1..=cfg.rounds_per_epoch {
        let round_id = RoundId(round);
        deps.weak_coin.start_round(epoch, round_id).await?;

        if round == 1 {
            let valid_ids: Vec<Vec<u8>> = snapshot.valid.iter().map(|p| p.id().to_vec()).collect();
            let potentially_valid_ids: Vec<Vec<u8>> =
                snapshot.potentially_valid.iter().map(|p| p.id().to_vec()).collect();
            let wire = FirstVotingMessage {
                epoch,
                valid_proposals: valid_ids.clone(),
                potentially_valid_proposals: potentially_valid_ids.clone(),
                signature: Vec::new(),
            };
            let signature = deps.signer.sign(&first_voting_body(&wire));
            let bytes = encode_wire(&FirstVotingMessage { signature, ..wire });
            let _ = deps.broadcaster.broadcast(beacon_core::TB_FIRST_VOTING_PROTOCOL, bytes).await;
            let _ = ledger.admit_first(&deps.node_id, node_weight, &valid_ids, &potentially_valid_ids);
        } else {
            let opinion = tally::calc_votes(&ledger, &voting_threshold, &reference_order, previous_coin);
            let bit_vector: Vec<bool> = reference_order.iter().map(|id| opinion.valid.contains(id)).collect();
            let wire = FollowingVotingMessage {
                epoch,
                round: round_id,
                votes_bit_vector: bit_vector.clone(),
                signature: Vec::new(),
            };
            let signature = deps.signer.sign(&following_voting_body(&wire));
            let bytes = encode_wire(&FollowingVotingMessage { signature, ..wire });
            let _ = deps.broadcaster.broadcast(beacon_core::TB_FOLLOWING_VOTING_PROTOCOL, bytes).await;
            let _ = ledger.admit_following(round_id, &deps.node_id, node_weight, &bit_vector, &reference_order);
        }

        let round_deadline = Instant::now() + cfg.round_duration(round);
        drain_until(round_deadline, &mut inbound, |msg| match msg {
            Inbound::FirstVote { sender, msg } => {
                if let Some(weight) = table.weights.get(sender.as_bytes()) {
                    if let Err(err) = deps
                        .validator
                        .validate_first_vote(epoch, &sender, &msg)
                        .and_then(|_| ledger.admit_first(&sender, *weight, &msg.valid_proposals, &msg.potentially_valid_proposals))
                    {
                        debug!(?err, "rejected first-round vote");
                    }
                }
            }
            Inbound::FollowingVote { sender, msg } => {
                if let Some(weight) = table.weights.get(sender.as_bytes()) {
                    if let Err(err) = deps
                        .validator
                        .validate_following_vote(epoch, round_id, &sender, &msg)
                        .and_then(|_| ledger.admit_following(round_id, &sender, *weight, &msg.votes_bit_vector, &reference_order))
                    {
                        debug!(?err, "rejected following-round vote");
                    }
                }
            }
            Inbound::Proposal { .. } => {}
        })
        .await;

        if cancel.is_cancelled() {
            deps.weak_coin.finish_epoch(epoch).await;
            return Ok(EpochOutcome { epoch, beacon: None });
        }

        deps.weak_coin.finish_round(epoch, round_id).await;
        previous_coin = deps.weak_coin.get(epoch, round_id).unwrap_or(false);
    }

    let last_opinion = tally::calc_votes(&ledger, &voting_threshold, &reference_order, previous_coin);
    let ledger_wide = ledger.final_classification(&voting_threshold);
    debug!(
        undecided_at_ledger_level = ledger_wide.undecided.len(),
        "round driver finished voting"
    );

    let beacon = tally::derive_beacon(&last_opinion.valid);
    deps.weak_coin.finish_epoch(epoch).await;
    info!(%epoch, "derived beacon");

    Ok(EpochOutcome { epoch, beacon: Some(beacon) })
}

/// `ProposalMessage` carries no signature field of its own (spec.md §6), so
/// the envelope pairs it with one for the wire.
#[derive(Serialize)]
struct ProposalEnvelope {
    msg: ProposalMessage,
    signature: Vec<u8>,
}

fn encode_wire<T: Serialize>(value: &T) -> Vec<u8> {
    bincode::serialize(value).unwrap_or_else(|err| {
        warn!(%err, "failed to encode outbound gossip message");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingBroadcaster;
    use crate::validator::MessageValidator;
    use crate::weak_coin::DeterministicWeakCoin;
    use beacon_crypto::{HashVrfVerifier, KeyPair, Secp256k1Extractor, VrfKeypair};

    fn single_node_config() -> ProtocolConfig {
        ProtocolConfig {
            rounds_per_epoch: 2,
            kappa: 200,
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
        }
    }

    #[tokio::test(start_paused = true)]
    async fn single_node_happy_path_derives_beacon_from_own_proposal() {
        let keys = Arc::new(KeyPair::generate());
        let vrf = Arc::new(VrfKeypair::from_seed(&[5u8; 32]));
        let node_id = NodeId::new(keys.public_key_bytes());

        let extractor: Arc<dyn VerifyExtractor> = Arc::new(Secp256k1Extractor);
        let vrf_verifier: Arc<dyn VrfVerifier> = Arc::new(HashVrfVerifier);
        let validator = Arc::new(MessageValidator::new(extractor, vrf_verifier));

        let deps = RoundDriverDeps {
            config: Arc::new(single_node_config()),
            node_id: node_id.clone(),
            signer: keys.clone() as Arc<dyn Signer>,
            vrf_signer: vrf.clone() as Arc<dyn VrfSigner>,
            broadcaster: Arc::new(RecordingBroadcaster::new()),
            weak_coin: Arc::new(DeterministicWeakCoin::new([1u8; 32])),
            validator,
        };

        let table = EligibilityTable {
            weights: HashMap::from([(node_id.as_bytes().to_vec(), 1_000u64)]),
            vrf_pub_keys: HashMap::from([(node_id.as_bytes().to_vec(), vrf.vrf_public_key())]),
        };

        let (_tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let outcome = run_epoch(&deps, EpochId(2), 1_000, 1_000, &table, rx, cancel)
            .await
            .unwrap();

        assert!(outcome.beacon.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_weight_epoch_still_derives_a_beacon() {
        let keys = Arc::new(KeyPair::generate());
        let vrf = Arc::new(VrfKeypair::from_seed(&[5u8; 32]));
        let node_id = NodeId::new(keys.public_key_bytes());

        let extractor: Arc<dyn VerifyExtractor> = Arc::new(Secp256k1Extractor);
        let vrf_verifier: Arc<dyn VrfVerifier> = Arc::new(HashVrfVerifier);
        let validator = Arc::new(MessageValidator::new(extractor, vrf_verifier));

        let deps = RoundDriverDeps {
            config: Arc::new(single_node_config()),
            node_id: node_id.clone(),
            signer: keys.clone() as Arc<dyn Signer>,
            vrf_signer: vrf.clone() as Arc<dyn VrfSigner>,
            broadcaster: Arc::new(RecordingBroadcaster::new()),
            weak_coin: Arc::new(DeterministicWeakCoin::new([1u8; 32])),
            validator,
        };

        let table = EligibilityTable { weights: HashMap::new(), vrf_pub_keys: HashMap::new() };
        let (_tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let outcome = run_epoch(&deps, EpochId(2), 0, 0, &table, rx, cancel).await.unwrap();
        assert_eq!(outcome.beacon, Some(tally::derive_beacon(&[])));
    }
}
