//! Beacon store (C7, spec.md §4.7): in-memory map plus an optional
//! persistent mirror, with the at-most-once write guarantee (I1).

use std::collections::HashMap;

use beacon_core::EpochId;
use parking_lot::RwLock;
use tracing::warn;

use crate::error::{BeaconError, Result};
use crate::interfaces::TortoiseBeaconDb;

pub fn genesis_beacon() -> [u8; 32] {
    beacon_crypto::sha256(b"genesis")
}

pub struct BeaconStore {
    genesis_epochs: u32,
    memory: RwLock<HashMap<EpochId, [u8; 32]>>,
    mirror: Option<Box<dyn TortoiseBeaconDb>>,
}

impl BeaconStore {
    pub fn new(genesis_epochs: u32, mirror: Option<Box<dyn TortoiseBeaconDb>>) -> Self {
        Self { genesis_epochs, memory: RwLock::new(HashMap::new()), mirror }
    }

    /// Writes once in memory and, if attached, to the mirror. A repeat
    /// write of a *different* value is the invariant violation spec.md
    /// calls "panic-worthy"; the caller decides whether to treat this
    /// `Err` as process-fatal (spec.md §7).
    pub fn set(&self, epoch: EpochId, value: [u8; 32]) -> Result<()> {
        {
            let mut memory = self.memory.write();
            if let Some(existing) = memory.get(&epoch) {
                if *existing != value {
                    return Err(BeaconError::DuplicateBeaconWrite { epoch });
                }
                return Ok(());
            }
            memory.insert(epoch, value);
        }
        if let Some(mirror) = &self.mirror {
            if let Err(err) = mirror.set(epoch, value) {
                warn!(%epoch, error = %err, "beacon mirror write failed, continuing with in-memory copy");
            }
        }
        Ok(())
    }

    /// `GetBeacon(target_epoch)`: returns the beacon computed during
    /// `target_epoch - 1` (spec.md §4.7, §9 off-by-one note — preserved
    /// exactly as the source defines it).
    pub fn get(&self, target_epoch: EpochId) -> Result<[u8; 32]> {
        let lookup = target_epoch
            .prev()
            .ok_or(BeaconError::ErrZeroEpoch(target_epoch))?;
        if lookup.0 < self.genesis_epochs {
            return Ok(genesis_beacon());
        }
        if let Some(mirror) = &self.mirror {
            if let Some(value) = mirror.get(lookup) {
                return Ok(value);
            }
        }
        if let Some(value) = self.memory.read().get(&lookup) {
            return Ok(*value);
        }
        Err(BeaconError::ErrBeaconNotCalculated(lookup))
    }
}
