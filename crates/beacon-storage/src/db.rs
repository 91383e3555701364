//! RocksDB-backed beacon mirror, grounded on
//! `luxtensor-storage::db::BlockchainDB`'s single-column-family,
//! bincode-serialized value pattern.

use std::path::Path;
use std::sync::Arc;

use beacon_core::EpochId;
use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use tortoise_beacon::error::BeaconError;
use tortoise_beacon::interfaces::TortoiseBeaconDb;
use tracing::warn;

use crate::error::{Result, StorageError};

const CF_BEACONS: &str = "beacons";

/// Persists one 32-byte value per epoch, keyed by the epoch's big-endian
/// `u32`. A single column family is enough — unlike `BlockchainDB`, there is
/// no secondary index to maintain.
pub struct BeaconRocksDb {
    db: Arc<DB>,
}

impl BeaconRocksDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = vec![ColumnFamilyDescriptor::new(CF_BEACONS, Options::default())];
        let db = DB::open_cf_descriptors(&opts, path, cfs)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(CF_BEACONS)
            .ok_or(StorageError::MissingColumnFamily(CF_BEACONS))
    }
}

impl TortoiseBeaconDb for BeaconRocksDb {
    fn get(&self, epoch: EpochId) -> Option<[u8; 32]> {
        let cf = self.cf().ok()?;
        let bytes = self.db.get_cf(cf, epoch.0.to_be_bytes()).ok()??;
        bytes.as_slice().try_into().ok()
    }

    fn set(&self, epoch: EpochId, value: [u8; 32]) -> std::result::Result<(), BeaconError> {
        let cf = self.cf().map_err(storage_to_beacon)?;
        self.db
            .put_cf(cf, epoch.0.to_be_bytes(), value)
            .map_err(|err| storage_to_beacon(StorageError::from(err)))
    }
}

fn storage_to_beacon(err: StorageError) -> BeaconError {
    warn!(%err, "beacon storage operation failed");
    BeaconError::Storage(err.to_string())
}
