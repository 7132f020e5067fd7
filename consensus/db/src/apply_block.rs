// Copyright (c) 2025 The Sia Foundation

//! First-time block integration.

use lmdb::RwTransaction;
use sia_blockchain_types::MATURITY_DELAY;

use crate::{
    apply_transaction::apply_transaction,
    checksum::consensus_checksum,
    commit::update_current_path,
    database::ConsensusDb,
    diff::DiffDirection,
    error::{Error, Result},
    maintenance::apply_maintenance,
    processed_block::ProcessedBlock,
    valid_transaction::valid_transaction,
};

/// Validate a block at the tip of the current path and integrate it,
/// generating its diffs as a side effect.
///
/// Transactions are validated and applied one at a time: a transaction
/// may spend an output created earlier in the same block, so validation
/// of transaction `n` is only meaningful against the ledger with
/// transactions `0..n` already applied. Any failure surfaces to the
/// enclosing write transaction, which rolls everything back.
///
/// `diffs_generated` flips to true only at the very end. If the chain
/// ever forks over a block whose integration was interrupted, the flag
/// stays false and the block is validated again from scratch rather than
/// replayed from half-recorded diffs.
pub fn generate_and_apply_diff(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    pb: &mut ProcessedBlock,
) -> Result<()> {
    if pb.diffs_generated {
        return Err(Error::Corrupt("generating diffs for an already-integrated block"));
    }
    if pb.parent_id() != db.current_block_id(txn)? {
        return Err(Error::InvalidSuccessor);
    }

    let id = pb.id();
    db.store_path_entry(txn, pb.height, &id)?;
    db.create_delayed_bucket(txn, pb.height + MATURITY_DELAY)?;

    let transactions = pb.block.transactions.clone();
    for t in &transactions {
        valid_transaction(db, txn, pb.height, t)?;
        apply_transaction(db, txn, pb, t)?;
    }

    apply_maintenance(db, txn, pb)?;
    update_current_path(db, txn, pb, DiffDirection::Apply)?;

    if cfg!(debug_assertions) {
        pb.consensus_checksum = Some(consensus_checksum(db, txn)?);
    }
    pb.diffs_generated = true;
    db.put_processed_block(txn, pb)
}
