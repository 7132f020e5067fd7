// Copyright (c) 2025 The Sia Foundation

//! Chain reorganization.
//!
//! When a block lands on a side chain whose cumulative work surpasses
//! the current chain, the coordinator walks parent links back to the
//! fork point, reverts the current chain to it block by block, and then
//! applies the fork's blocks oldest-first. A block that has been
//! integrated before replays its stored diffs; a block seen for the
//! first time is validated and has its diffs generated on the spot.
//!
//! If validation fails partway up the new fork, the fork blocks are
//! rewound, the entire fork history is deleted from the block map and
//! reported bad, and the original chain is re-applied from its stored
//! diffs. Re-application cannot legitimately fail: those diffs described
//! the ledger moments ago, so any error during recovery means the
//! database no longer matches its own records.

use lmdb::{RwTransaction, Transaction as LmdbTransaction};
use sia_blockchain_types::BlockId;
use tracing::error;

use crate::{
    apply_block::generate_and_apply_diff,
    checksum::consensus_checksum,
    commit::commit_diff_set,
    database::ConsensusDb,
    diff::DiffDirection,
    error::{Error, Result},
    processed_block::ProcessedBlock,
};

/// The outcome of a fork attempt.
pub(crate) struct ForkOutcome {
    /// IDs removed from the path, tip first.
    pub reverted: Vec<BlockId>,
    /// IDs added to the path, oldest first.
    pub applied: Vec<BlockId>,
    /// When the fork was rejected: the validation error and every fork
    /// block ID that was deleted from the block map.
    pub failed: Option<(Error, Vec<BlockId>)>,
}

/// Walk parent links from `pb` down to the first ancestor on the current
/// path. Returns the chain fork-point first, ending with `pb` itself.
fn backtrack_to_current_path(
    db: &ConsensusDb,
    txn: &RwTransaction<'_>,
    pb: &ProcessedBlock,
) -> Result<Vec<ProcessedBlock>> {
    let mut history = vec![pb.clone()];
    let mut current = pb.clone();
    while db.path(txn, current.height)? != Some(current.id()) {
        let parent_id = current.parent_id();
        current = db
            .processed_block(txn, &parent_id)?
            .ok_or(Error::MissingBlock(parent_id))?;
        history.push(current.clone());
    }
    history.reverse();
    Ok(history)
}

/// Revert the current path back to `target`, returning the reverted
/// blocks tip-first. After each step the recorded checksum of the new
/// tip, when present, is compared against the live consensus set.
fn revert_to_block(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    target: &BlockId,
) -> Result<Vec<ProcessedBlock>> {
    let mut reverted = Vec::new();
    while db.current_block_id(txn)? != *target {
        let tip_id = db.current_block_id(txn)?;
        let pb = db
            .processed_block(txn, &tip_id)?
            .ok_or(Error::MissingBlock(tip_id))?;
        commit_diff_set(db, txn, &pb, DiffDirection::Revert)?;

        let new_tip_id = db.current_block_id(txn)?;
        let new_tip = db
            .processed_block(txn, &new_tip_id)?
            .ok_or(Error::MissingBlock(new_tip_id))?;
        if let Some(recorded) = new_tip.consensus_checksum {
            if recorded != consensus_checksum(db, txn)? {
                return Err(Error::Corrupt("consensus checksum mismatch after revert"));
            }
        }
        reverted.push(pb);
    }
    Ok(reverted)
}

/// Switch the consensus set onto the fork ending at `new_pb`.
///
/// Each fork block is validated on its own merits as the walk proceeds;
/// the failure of block `n` condemns the whole fork, but the first `n`
/// blocks were already committed and must be rewound before the original
/// chain is restored.
pub(crate) fn fork_blockchain(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    new_pb: &ProcessedBlock,
) -> Result<ForkOutcome> {
    let history = backtrack_to_current_path(db, txn, new_pb)?;
    let fork_point = history[0].id();
    let fork_blocks = &history[1..];

    let rewound = revert_to_block(db, txn, &fork_point)?;

    let mut applied: Vec<ProcessedBlock> = Vec::new();
    for pb in fork_blocks {
        let result = apply_one_block(db, txn, pb);
        match result {
            Ok(pb) => applied.push(pb),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                let bad = recover_from_failed_fork(db, txn, fork_blocks, &applied, &rewound)?;
                return Ok(ForkOutcome {
                    reverted: rewound.iter().map(ProcessedBlock::id).collect(),
                    applied: Vec::new(),
                    failed: Some((e, bad)),
                });
            }
        }
    }

    Ok(ForkOutcome {
        reverted: rewound.iter().map(ProcessedBlock::id).collect(),
        applied: applied.iter().map(ProcessedBlock::id).collect(),
        failed: None,
    })
}

/// Apply one fork block inside a nested transaction, so that a
/// validation failure leaves no trace of the block's partial effects in
/// the outer transaction. Replays stored diffs when the block has them;
/// validates and generates otherwise.
fn apply_one_block(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    pb: &ProcessedBlock,
) -> Result<ProcessedBlock> {
    let mut child = txn.begin_nested_txn()?;
    let result = if pb.diffs_generated {
        commit_diff_set(db, &mut child, pb, DiffDirection::Apply).map(|()| pb.clone())
    } else {
        let mut generated = pb.clone();
        generate_and_apply_diff(db, &mut child, &mut generated).map(|()| generated)
    };
    match result {
        Ok(applied) => {
            child.commit()?;
            Ok(applied)
        }
        Err(e) => {
            child.abort();
            Err(e)
        }
    }
}

/// Undo a half-applied fork: rewind its applied blocks, delete the whole
/// fork from the block map, and re-apply the original chain from its
/// stored diffs. Returns the deleted block IDs.
fn recover_from_failed_fork(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    fork_blocks: &[ProcessedBlock],
    applied: &[ProcessedBlock],
    rewound: &[ProcessedBlock],
) -> Result<Vec<BlockId>> {
    for pb in applied.iter().rev() {
        commit_diff_set(db, txn, pb, DiffDirection::Revert)?;
    }

    let mut bad = Vec::new();
    for pb in fork_blocks {
        db.delete_processed_block(txn, &pb.id())?;
        bad.push(pb.id());
    }

    // The rewound list is tip-first; restore oldest-first.
    for pb in rewound.iter().rev() {
        if let Err(e) = commit_diff_set(db, txn, pb, DiffDirection::Apply) {
            error!(block = %pb.id(), error = %e, "re-applying the original chain failed");
            return Err(Error::Corrupt("re-applying the original chain failed"));
        }
    }
    Ok(bad)
}
