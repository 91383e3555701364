//! Per-epoch, publicly-verifiable randomness beacon for a permissionless
//! proof-of-space-time network: eligibility-gated proposals, K rounds of
//! weighted voting with a weak-coin tie-break, and a deterministic tally
//! into a 32-byte epoch beacon.

pub mod driver;
pub mod engine;
pub mod error;
pub mod interfaces;
pub mod ledger;
pub mod proposal_store;
pub mod store;
pub mod tally;
pub mod testing;
pub mod threshold;
pub mod validator;
pub mod weak_coin;

pub use driver::{EligibilityTable, EpochOutcome, Inbound, RoundDriverDeps};
pub use engine::{TortoiseBeacon, TortoiseBeaconConfig};
pub use error::{BeaconError, Result};
pub use store::{genesis_beacon, BeaconStore};
pub use weak_coin::DeterministicWeakCoin;
