// Copyright (c) 2025 The Sia Foundation

//! Consensus set checksums.

use lmdb::{Cursor, Transaction as LmdbTransaction};
use sha2::{Digest, Sha256};
use sia_blockchain_types::Hash;

use crate::{database::ConsensusDb, error::Result};

/// A deterministic hash of the entire consensus set: the current path
/// and every ledger bucket, walked in key order. Two databases holding
/// the same chain state produce the same checksum, and any asymmetry
/// between apply and revert shows up as a checksum drift.
///
/// The block map is deliberately excluded: it caches checksums itself
/// and holds side-chain blocks that are not part of consensus state.
pub fn consensus_checksum(db: &ConsensusDb, txn: &impl LmdbTransaction) -> Result<Hash> {
    let mut hasher = Sha256::new();
    for (name, database) in db.checksum_databases() {
        hasher.update((name.len() as u64).to_le_bytes());
        hasher.update(name.as_bytes());
        let mut cursor = txn.open_ro_cursor(database)?;
        for item in cursor.iter_start() {
            let (key, value) = item?;
            hasher.update((key.len() as u64).to_le_bytes());
            hasher.update(key);
            hasher.update((value.len() as u64).to_le_bytes());
            hasher.update(value);
        }
    }
    Ok(hasher.finalize().into())
}
