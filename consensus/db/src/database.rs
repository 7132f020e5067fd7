// Copyright (c) 2025 The Sia Foundation

//! Typed buckets over LMDB.
//!
//! `ConsensusDb` owns the environment and one named database per
//! sub-ledger. All mutation happens through a caller-held
//! [`RwTransaction`]; [`ConsensusDb::with_write_txn`] is the only commit
//! boundary, committing on success and aborting on any error or panic, so
//! no partial state is ever observable.
//!
//! Add/remove operations fail loudly when the key is in the wrong state:
//! adding an entry that exists or removing one that does not means the
//! diff machinery is broken, and the resulting errors are fatal.
//!
//! Delayed siacoin outputs live in a single database under composite
//! `big-endian-height ‖ output-id` keys. Which heights currently have a
//! bucket is recorded explicitly in a separate index database; writes
//! against a height with no index entry are rejected rather than
//! auto-creating the bucket, because bucket creation and deletion are
//! block-lifecycle decisions owned by the committer. File contract
//! expirations are indexed the same way.

use std::{fs, path::Path};

use lmdb::{
    Cursor, Database, DatabaseFlags, Environment, RoTransaction, RwTransaction, Transaction,
    WriteFlags,
};
use sia_blockchain_types::{
    BlockHeight, BlockId, Currency, FileContract, FileContractId, SiacoinOutput, SiacoinOutputId,
    SiafundOutput, SiafundOutputId,
};
use sia_util_serial::{decode, encode};

use crate::{
    error::{Error, Result},
    processed_block::ProcessedBlock,
};

// LMDB database names.
pub const BLOCK_MAP_DB_NAME: &str = "consensus:block_map";
pub const BLOCK_PATH_DB_NAME: &str = "consensus:block_path";
pub const SIACOIN_OUTPUTS_DB_NAME: &str = "consensus:siacoin_outputs";
pub const FILE_CONTRACTS_DB_NAME: &str = "consensus:file_contracts";
pub const FC_EXPIRATIONS_DB_NAME: &str = "consensus:file_contract_expirations";
pub const SIAFUND_OUTPUTS_DB_NAME: &str = "consensus:siafund_outputs";
pub const SIAFUND_POOL_DB_NAME: &str = "consensus:siafund_pool";
pub const DELAYED_OUTPUTS_DB_NAME: &str = "consensus:delayed_siacoin_outputs";
pub const DELAYED_INDEX_DB_NAME: &str = "consensus:delayed_bucket_index";
pub const META_DB_NAME: &str = "consensus:meta";

// Keys used by the `meta` database.
const TIP_HEIGHT_KEY: &str = "height";
const VERSION_KEY: &str = "version";

// Key used by the `siafund_pool` database.
const POOL_KEY: &str = "pool";

// Marker value for index entries that only need their key to exist.
const NO_VALUE: [u8; 0] = [];

/// On-disk format version.
const DB_VERSION: u64 = 1;

/// Convert a block height to big-endian database key bytes.
pub fn height_to_key_bytes(height: BlockHeight) -> [u8; 8] {
    height.to_be_bytes()
}

fn composite_key(height: BlockHeight, id: &[u8; 32]) -> [u8; 40] {
    let mut key = [0u8; 40];
    key[..8].copy_from_slice(&height_to_key_bytes(height));
    key[8..].copy_from_slice(id);
    key
}

/// The consensus database: typed buckets over one LMDB environment.
pub struct ConsensusDb {
    env: Environment,

    /// `block_id -> encode(ProcessedBlock)`
    block_map: Database,

    /// `be_height -> block_id`; the current best chain.
    block_path: Database,

    /// `siacoin_output_id -> encode(SiacoinOutput)`
    siacoin_outputs: Database,

    /// `file_contract_id -> encode(FileContract)`
    file_contracts: Database,

    /// `be_end_height ‖ file_contract_id -> []`
    fc_expirations: Database,

    /// `siafund_output_id -> encode(SiafundOutput)`
    siafund_outputs: Database,

    /// `"pool" -> encode(Currency)`
    siafund_pool: Database,

    /// `be_maturity_height ‖ siacoin_output_id -> encode(SiacoinOutput)`
    delayed_outputs: Database,

    /// `be_maturity_height -> []`; which delayed buckets exist.
    delayed_index: Database,

    /// `"height" -> encode(u64)`, `"version" -> encode(u64)`
    meta: Database,
}

impl ConsensusDb {
    /// Open (creating if necessary) the consensus database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path).map_err(|_| Error::Corrupt("cannot create database directory"))?;
        let env = Environment::new()
            .set_max_dbs(16)
            .set_map_size(1 << 30)
            .open(path)?;

        let db = Self {
            block_map: env.create_db(Some(BLOCK_MAP_DB_NAME), DatabaseFlags::empty())?,
            block_path: env.create_db(Some(BLOCK_PATH_DB_NAME), DatabaseFlags::empty())?,
            siacoin_outputs: env.create_db(Some(SIACOIN_OUTPUTS_DB_NAME), DatabaseFlags::empty())?,
            file_contracts: env.create_db(Some(FILE_CONTRACTS_DB_NAME), DatabaseFlags::empty())?,
            fc_expirations: env.create_db(Some(FC_EXPIRATIONS_DB_NAME), DatabaseFlags::empty())?,
            siafund_outputs: env.create_db(Some(SIAFUND_OUTPUTS_DB_NAME), DatabaseFlags::empty())?,
            siafund_pool: env.create_db(Some(SIAFUND_POOL_DB_NAME), DatabaseFlags::empty())?,
            delayed_outputs: env.create_db(Some(DELAYED_OUTPUTS_DB_NAME), DatabaseFlags::empty())?,
            delayed_index: env.create_db(Some(DELAYED_INDEX_DB_NAME), DatabaseFlags::empty())?,
            meta: env.create_db(Some(META_DB_NAME), DatabaseFlags::empty())?,
            env,
        };
        db.check_version()?;
        Ok(db)
    }

    fn check_version(&self) -> Result<()> {
        self.with_write_txn(|txn| {
            let stored = match get_optional(txn.get(self.meta, &VERSION_KEY))? {
                None => None,
                Some(bytes) => Some(decode::<u64>(bytes)?),
            };
            match stored {
                None => {
                    txn.put(self.meta, &VERSION_KEY, &encode(&DB_VERSION), WriteFlags::empty())?;
                    Ok(())
                }
                Some(version) if version != DB_VERSION => {
                    Err(Error::Corrupt("unsupported database version"))
                }
                Some(_) => Ok(()),
            }
        })
    }

    /// Begin a read-only snapshot transaction.
    pub fn read_txn(&self) -> Result<RoTransaction<'_>> {
        Ok(self.env.begin_ro_txn()?)
    }

    /// Run `f` inside a read-write transaction. The transaction commits
    /// if `f` returns `Ok` and aborts on `Err` or panic; there is no
    /// other way to mutate the database.
    pub fn with_write_txn<T>(
        &self,
        f: impl FnOnce(&mut RwTransaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut txn = self.env.begin_rw_txn()?;
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                txn.abort();
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Current path
    // ------------------------------------------------------------------

    /// The tip height, or `None` before genesis has been committed.
    pub fn current_height(&self, txn: &impl Transaction) -> Result<Option<BlockHeight>> {
        match get_optional(txn.get(self.meta, &TIP_HEIGHT_KEY))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(decode(bytes)?)),
        }
    }

    /// The block ID at `height` on the current path.
    pub fn path(&self, txn: &impl Transaction, height: BlockHeight) -> Result<Option<BlockId>> {
        match get_optional(txn.get(self.block_path, &height_to_key_bytes(height)))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(decode(bytes)?)),
        }
    }

    /// The block ID of the current tip.
    pub fn current_block_id(&self, txn: &impl Transaction) -> Result<BlockId> {
        let height = self
            .current_height(txn)?
            .ok_or(Error::Corrupt("current path is empty"))?;
        self.path(txn, height)?
            .ok_or(Error::Corrupt("tip height has no path entry"))
    }

    /// Record `id` at `height` on the path without moving the tip. Used
    /// while a block is being integrated, before the final push.
    pub(crate) fn store_path_entry(
        &self,
        txn: &mut RwTransaction<'_>,
        height: BlockHeight,
        id: &BlockId,
    ) -> Result<()> {
        txn.put(
            self.block_path,
            &height_to_key_bytes(height),
            &encode(id),
            WriteFlags::empty(),
        )?;
        Ok(())
    }

    /// Append `id` to the current path and advance the tip.
    pub fn push_path(&self, txn: &mut RwTransaction<'_>, id: &BlockId) -> Result<()> {
        let height = match self.current_height(txn)? {
            None => 0,
            Some(h) => h + 1,
        };
        self.store_path_entry(txn, height, id)?;
        txn.put(self.meta, &TIP_HEIGHT_KEY, &encode(&height), WriteFlags::empty())?;
        Ok(())
    }

    /// Remove the tip from the current path. Popping the genesis block is
    /// a programmer error.
    pub fn pop_path(&self, txn: &mut RwTransaction<'_>) -> Result<()> {
        let height = self
            .current_height(txn)?
            .ok_or(Error::Corrupt("popping an empty path"))?;
        if height == 0 {
            return Err(Error::PopGenesis);
        }
        txn.del(self.block_path, &height_to_key_bytes(height), None)
            .map_err(|e| match e {
                lmdb::Error::NotFound => Error::Corrupt("tip height has no path entry"),
                other => Error::Lmdb(other),
            })?;
        txn.put(
            self.meta,
            &TIP_HEIGHT_KEY,
            &encode(&(height - 1)),
            WriteFlags::empty(),
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Block map
    // ------------------------------------------------------------------

    /// Fetch a processed block by ID.
    pub fn processed_block(
        &self,
        txn: &impl Transaction,
        id: &BlockId,
    ) -> Result<Option<ProcessedBlock>> {
        match get_optional(txn.get(self.block_map, id.as_bytes()))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(decode(bytes)?)),
        }
    }

    /// Store a processed block, replacing any previous record.
    pub fn put_processed_block(
        &self,
        txn: &mut RwTransaction<'_>,
        pb: &ProcessedBlock,
    ) -> Result<()> {
        txn.put(
            self.block_map,
            pb.id().as_bytes(),
            &encode(pb),
            WriteFlags::empty(),
        )?;
        Ok(())
    }

    /// Remove a processed block from the block map.
    pub fn delete_processed_block(&self, txn: &mut RwTransaction<'_>, id: &BlockId) -> Result<()> {
        txn.del(self.block_map, id.as_bytes(), None).map_err(|e| match e {
            lmdb::Error::NotFound => Error::EntryMissing(BLOCK_MAP_DB_NAME),
            other => Error::Lmdb(other),
        })
    }

    // ------------------------------------------------------------------
    // Siacoin outputs
    // ------------------------------------------------------------------

    /// Look up a spendable siacoin output.
    pub fn siacoin_output(
        &self,
        txn: &impl Transaction,
        id: &SiacoinOutputId,
    ) -> Result<Option<SiacoinOutput>> {
        match get_optional(txn.get(self.siacoin_outputs, id.as_bytes()))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(decode(bytes)?)),
        }
    }

    /// Add a siacoin output. The ID must be fresh.
    pub fn add_siacoin_output(
        &self,
        txn: &mut RwTransaction<'_>,
        id: &SiacoinOutputId,
        output: &SiacoinOutput,
    ) -> Result<()> {
        put_new(txn, self.siacoin_outputs, id.as_bytes(), &encode(output), SIACOIN_OUTPUTS_DB_NAME)
    }

    /// Remove a siacoin output. The ID must exist.
    pub fn remove_siacoin_output(
        &self,
        txn: &mut RwTransaction<'_>,
        id: &SiacoinOutputId,
    ) -> Result<()> {
        del_existing(txn, self.siacoin_outputs, id.as_bytes(), SIACOIN_OUTPUTS_DB_NAME)
    }

    // ------------------------------------------------------------------
    // File contracts
    // ------------------------------------------------------------------

    /// Look up a file contract.
    pub fn file_contract(
        &self,
        txn: &impl Transaction,
        id: &FileContractId,
    ) -> Result<Option<FileContract>> {
        match get_optional(txn.get(self.file_contracts, id.as_bytes()))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(decode(bytes)?)),
        }
    }

    /// Add a file contract and index its expiration height.
    pub fn add_file_contract(
        &self,
        txn: &mut RwTransaction<'_>,
        id: &FileContractId,
        contract: &FileContract,
    ) -> Result<()> {
        put_new(txn, self.file_contracts, id.as_bytes(), &encode(contract), FILE_CONTRACTS_DB_NAME)?;
        put_new(
            txn,
            self.fc_expirations,
            &composite_key(contract.end, &id.0),
            &[],
            FC_EXPIRATIONS_DB_NAME,
        )
    }

    /// Remove a file contract and its expiration index entry.
    pub fn remove_file_contract(
        &self,
        txn: &mut RwTransaction<'_>,
        id: &FileContractId,
    ) -> Result<()> {
        let contract = self
            .file_contract(txn, id)?
            .ok_or(Error::EntryMissing(FILE_CONTRACTS_DB_NAME))?;
        del_existing(txn, self.file_contracts, id.as_bytes(), FILE_CONTRACTS_DB_NAME)?;
        del_existing(
            txn,
            self.fc_expirations,
            &composite_key(contract.end, &id.0),
            FC_EXPIRATIONS_DB_NAME,
        )
    }

    /// All file contracts whose window ends at `height`, in ID order.
    pub fn contracts_expiring_at(
        &self,
        txn: &impl Transaction,
        height: BlockHeight,
    ) -> Result<Vec<(FileContractId, FileContract)>> {
        let prefix = height_to_key_bytes(height);
        let mut expiring = Vec::new();
        let mut cursor = txn.open_ro_cursor(self.fc_expirations)?;
        for item in cursor.iter_from(prefix.as_slice()) {
            let (key, _) = item?;
            if key.len() != 40 || key[..8] != prefix {
                break;
            }
            let id = FileContractId(key[8..].try_into().expect("32 bytes"));
            let contract = self
                .file_contract(txn, &id)?
                .ok_or(Error::Corrupt("expiration index points at a missing contract"))?;
            expiring.push((id, contract));
        }
        Ok(expiring)
    }

    // ------------------------------------------------------------------
    // Siafund outputs and pool
    // ------------------------------------------------------------------

    /// Look up a siafund output.
    pub fn siafund_output(
        &self,
        txn: &impl Transaction,
        id: &SiafundOutputId,
    ) -> Result<Option<SiafundOutput>> {
        match get_optional(txn.get(self.siafund_outputs, id.as_bytes()))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(decode(bytes)?)),
        }
    }

    /// Add a siafund output. The ID must be fresh.
    pub fn add_siafund_output(
        &self,
        txn: &mut RwTransaction<'_>,
        id: &SiafundOutputId,
        output: &SiafundOutput,
    ) -> Result<()> {
        put_new(txn, self.siafund_outputs, id.as_bytes(), &encode(output), SIAFUND_OUTPUTS_DB_NAME)
    }

    /// Remove a siafund output. The ID must exist.
    pub fn remove_siafund_output(
        &self,
        txn: &mut RwTransaction<'_>,
        id: &SiafundOutputId,
    ) -> Result<()> {
        del_existing(txn, self.siafund_outputs, id.as_bytes(), SIAFUND_OUTPUTS_DB_NAME)
    }

    /// The current siafund pool value.
    pub fn siafund_pool(&self, txn: &impl Transaction) -> Result<Currency> {
        let bytes = get_optional(txn.get(self.siafund_pool, &POOL_KEY))?
            .ok_or(Error::Corrupt("siafund pool is missing"))?;
        Ok(decode(bytes)?)
    }

    /// Overwrite the siafund pool value.
    pub fn set_siafund_pool(&self, txn: &mut RwTransaction<'_>, pool: Currency) -> Result<()> {
        txn.put(self.siafund_pool, &POOL_KEY, &encode(&pool), WriteFlags::empty())?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delayed siacoin outputs
    // ------------------------------------------------------------------

    /// True when a delayed bucket exists for `height`.
    pub fn delayed_bucket_exists(
        &self,
        txn: &impl Transaction,
        height: BlockHeight,
    ) -> Result<bool> {
        Ok(get_optional(txn.get(self.delayed_index, &height_to_key_bytes(height)))?.is_some())
    }

    /// Create the delayed bucket for `height`. The bucket must not exist.
    pub fn create_delayed_bucket(
        &self,
        txn: &mut RwTransaction<'_>,
        height: BlockHeight,
    ) -> Result<()> {
        txn.put(
            self.delayed_index,
            &height_to_key_bytes(height),
            &NO_VALUE,
            WriteFlags::NO_OVERWRITE,
        )
        .map_err(|e| match e {
            lmdb::Error::KeyExist => Error::DelayedBucketExists(height),
            other => Error::Lmdb(other),
        })
    }

    /// Delete the delayed bucket for `height`. The bucket must exist and
    /// must be empty; a non-empty bucket at deletion time means outputs
    /// were never promoted and the ledger is inconsistent.
    pub fn delete_delayed_bucket(
        &self,
        txn: &mut RwTransaction<'_>,
        height: BlockHeight,
    ) -> Result<()> {
        if !self.delayed_bucket(txn, height)?.is_empty() {
            return Err(Error::DelayedBucketNotEmpty(height));
        }
        txn.del(self.delayed_index, &height_to_key_bytes(height), None)
            .map_err(|e| match e {
                lmdb::Error::NotFound => Error::DelayedBucketMissing(height),
                other => Error::Lmdb(other),
            })
    }

    /// Add a delayed output to the bucket for `height`. The bucket must
    /// exist and the ID must be fresh.
    pub fn add_delayed_output(
        &self,
        txn: &mut RwTransaction<'_>,
        height: BlockHeight,
        id: &SiacoinOutputId,
        output: &SiacoinOutput,
    ) -> Result<()> {
        if !self.delayed_bucket_exists(txn, height)? {
            return Err(Error::DelayedBucketMissing(height));
        }
        put_new(
            txn,
            self.delayed_outputs,
            &composite_key(height, &id.0),
            &encode(output),
            DELAYED_OUTPUTS_DB_NAME,
        )
    }

    /// Remove a delayed output from the bucket for `height`. The entry
    /// must exist.
    pub fn remove_delayed_output(
        &self,
        txn: &mut RwTransaction<'_>,
        height: BlockHeight,
        id: &SiacoinOutputId,
    ) -> Result<()> {
        if !self.delayed_bucket_exists(txn, height)? {
            return Err(Error::DelayedBucketMissing(height));
        }
        del_existing(
            txn,
            self.delayed_outputs,
            &composite_key(height, &id.0),
            DELAYED_OUTPUTS_DB_NAME,
        )
    }

    /// The contents of the delayed bucket for `height`, in ID order. The
    /// bucket must exist.
    pub fn delayed_bucket(
        &self,
        txn: &impl Transaction,
        height: BlockHeight,
    ) -> Result<Vec<(SiacoinOutputId, SiacoinOutput)>> {
        if !self.delayed_bucket_exists(txn, height)? {
            return Err(Error::DelayedBucketMissing(height));
        }
        let prefix = height_to_key_bytes(height);
        let mut outputs = Vec::new();
        let mut cursor = txn.open_ro_cursor(self.delayed_outputs)?;
        for item in cursor.iter_from(prefix.as_slice()) {
            let (key, value) = item?;
            if key.len() != 40 || key[..8] != prefix {
                break;
            }
            let id = SiacoinOutputId(key[8..].try_into().expect("32 bytes"));
            outputs.push((id, decode(value)?));
        }
        Ok(outputs)
    }

    /// Every database that contributes to the consensus checksum, paired
    /// with its name, in a fixed order.
    pub(crate) fn checksum_databases(&self) -> [(&'static str, Database); 8] {
        [
            (BLOCK_PATH_DB_NAME, self.block_path),
            (SIACOIN_OUTPUTS_DB_NAME, self.siacoin_outputs),
            (FILE_CONTRACTS_DB_NAME, self.file_contracts),
            (FC_EXPIRATIONS_DB_NAME, self.fc_expirations),
            (SIAFUND_OUTPUTS_DB_NAME, self.siafund_outputs),
            (SIAFUND_POOL_DB_NAME, self.siafund_pool),
            (DELAYED_OUTPUTS_DB_NAME, self.delayed_outputs),
            (DELAYED_INDEX_DB_NAME, self.delayed_index),
        ]
    }
}

/// Map `NotFound` to `None`, leaving other errors intact.
fn get_optional(res: lmdb::Result<&[u8]>) -> Result<Option<&[u8]>> {
    match res {
        Ok(bytes) => Ok(Some(bytes)),
        Err(lmdb::Error::NotFound) => Ok(None),
        Err(e) => Err(Error::Lmdb(e)),
    }
}

/// Insert a key that must not already exist.
fn put_new(
    txn: &mut RwTransaction<'_>,
    db: Database,
    key: &[u8],
    value: &[u8],
    bucket: &'static str,
) -> Result<()> {
    txn.put(db, &key, &value, WriteFlags::NO_OVERWRITE)
        .map_err(|e| match e {
            lmdb::Error::KeyExist => Error::EntryExists(bucket),
            other => Error::Lmdb(other),
        })
}

/// Delete a key that must exist.
fn del_existing(
    txn: &mut RwTransaction<'_>,
    db: Database,
    key: &[u8],
    bucket: &'static str,
) -> Result<()> {
    txn.del(db, &key, None).map_err(|e| match e {
        lmdb::Error::NotFound => Error::EntryMissing(bucket),
        other => Error::Lmdb(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sia_blockchain_types::UnlockHash;
    use tempfile::TempDir;

    fn create_test_db() -> (TempDir, ConsensusDb) {
        let temp_dir = TempDir::new().unwrap();
        let db = ConsensusDb::open(temp_dir.path()).unwrap();
        (temp_dir, db)
    }

    fn sample_output(value: u64) -> SiacoinOutput {
        SiacoinOutput {
            value: Currency::from(value),
            unlock_hash: UnlockHash([1u8; 32]),
        }
    }

    #[test]
    fn add_lookup_remove_siacoin_output() {
        let (_temp_dir, db) = create_test_db();
        let id = SiacoinOutputId([2u8; 32]);
        let output = sample_output(100);

        db.with_write_txn(|txn| {
            assert!(db.siacoin_output(txn, &id).unwrap().is_none());
            db.add_siacoin_output(txn, &id, &output)?;
            assert_eq!(db.siacoin_output(txn, &id).unwrap().unwrap(), output);
            db.remove_siacoin_output(txn, &id)?;
            assert!(db.siacoin_output(txn, &id).unwrap().is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn double_add_fails_loudly() {
        let (_temp_dir, db) = create_test_db();
        let id = SiacoinOutputId([2u8; 32]);
        let err = db
            .with_write_txn(|txn| {
                db.add_siacoin_output(txn, &id, &sample_output(1))?;
                db.add_siacoin_output(txn, &id, &sample_output(1))
            })
            .unwrap_err();
        assert!(matches!(err, Error::EntryExists(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn remove_absent_fails_loudly() {
        let (_temp_dir, db) = create_test_db();
        let err = db
            .with_write_txn(|txn| db.remove_siacoin_output(txn, &SiacoinOutputId([9u8; 32])))
            .unwrap_err();
        assert!(matches!(err, Error::EntryMissing(_)));
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let (_temp_dir, db) = create_test_db();
        let id = SiacoinOutputId([3u8; 32]);
        let res: Result<()> = db.with_write_txn(|txn| {
            db.add_siacoin_output(txn, &id, &sample_output(7))?;
            Err(Error::Corrupt("forced failure"))
        });
        assert!(res.is_err());

        let txn = db.read_txn().unwrap();
        assert!(db.siacoin_output(&txn, &id).unwrap().is_none());
    }

    #[test]
    fn path_push_and_pop() {
        let (_temp_dir, db) = create_test_db();
        let genesis = BlockId([0u8; 32]);
        let child = BlockId([1u8; 32]);

        db.with_write_txn(|txn| {
            assert_eq!(db.current_height(txn)?, None);
            db.push_path(txn, &genesis)?;
            assert_eq!(db.current_height(txn)?, Some(0));
            db.push_path(txn, &child)?;
            assert_eq!(db.current_height(txn)?, Some(1));
            assert_eq!(db.current_block_id(txn)?, child);
            db.pop_path(txn)?;
            assert_eq!(db.current_block_id(txn)?, genesis);
            assert_eq!(db.path(txn, 1)?, None);
            assert!(matches!(db.pop_path(txn), Err(Error::PopGenesis)));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn delayed_bucket_lifecycle() {
        let (_temp_dir, db) = create_test_db();
        let id = SiacoinOutputId([4u8; 32]);
        let output = sample_output(50);

        db.with_write_txn(|txn| {
            // Writes against a bucket that was never created fail.
            assert!(matches!(
                db.add_delayed_output(txn, 10, &id, &output),
                Err(Error::DelayedBucketMissing(10))
            ));

            db.create_delayed_bucket(txn, 10)?;
            assert!(matches!(
                db.create_delayed_bucket(txn, 10),
                Err(Error::DelayedBucketExists(10))
            ));

            db.add_delayed_output(txn, 10, &id, &output)?;
            assert_eq!(db.delayed_bucket(txn, 10)?, vec![(id, output.clone())]);

            // Deletion requires the bucket to be empty.
            assert!(matches!(
                db.delete_delayed_bucket(txn, 10),
                Err(Error::DelayedBucketNotEmpty(10))
            ));
            db.remove_delayed_output(txn, 10, &id)?;
            db.delete_delayed_bucket(txn, 10)?;
            assert!(!db.delayed_bucket_exists(txn, 10)?);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn delayed_buckets_are_isolated_by_height() {
        let (_temp_dir, db) = create_test_db();
        let id = SiacoinOutputId([5u8; 32]);

        db.with_write_txn(|txn| {
            db.create_delayed_bucket(txn, 7)?;
            db.create_delayed_bucket(txn, 8)?;
            db.add_delayed_output(txn, 7, &id, &sample_output(1))?;
            assert_eq!(db.delayed_bucket(txn, 8)?, vec![]);
            assert_eq!(db.delayed_bucket(txn, 7)?.len(), 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn contract_expiration_index() {
        let (_temp_dir, db) = create_test_db();
        let id = FileContractId([6u8; 32]);
        let contract = FileContract {
            start: 5,
            end: 20,
            payout: Currency::new(1000),
            missed_payout: Currency::new(961),
            unlock_hash: UnlockHash([7u8; 32]),
        };

        db.with_write_txn(|txn| {
            db.add_file_contract(txn, &id, &contract)?;
            assert_eq!(db.contracts_expiring_at(txn, 20)?, vec![(id, contract.clone())]);
            assert_eq!(db.contracts_expiring_at(txn, 19)?, vec![]);
            db.remove_file_contract(txn, &id)?;
            assert_eq!(db.contracts_expiring_at(txn, 20)?, vec![]);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn siafund_pool_roundtrip() {
        let (_temp_dir, db) = create_test_db();
        db.with_write_txn(|txn| {
            db.set_siafund_pool(txn, Currency::new(123))?;
            assert_eq!(db.siafund_pool(txn)?, Currency::new(123));
            Ok(())
        })
        .unwrap();
    }
}
