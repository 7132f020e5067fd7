// Copyright (c) 2025 The Sia Foundation

//! Committing diff sets.
//!
//! `commit_diff_set` is the single entry point that applies or reverts a
//! processed block's entire diff collection. The step ordering is
//! load-bearing: the destination delayed bucket must exist before any
//! delayed diff targets it, and the emptied bucket is deleted only after
//! every diff has landed. All steps run in the caller's write
//! transaction, so a failure at any point leaves no visible effect.

use lmdb::RwTransaction;

use sia_blockchain_types::MATURITY_DELAY;

use crate::{
    database::ConsensusDb,
    diff::{
        DelayedSiacoinOutputDiff, DiffDirection, FileContractDiff, SiacoinOutputDiff,
        SiafundOutputDiff, SiafundPoolDiff,
    },
    error::{Error, Result},
    processed_block::ProcessedBlock,
};

/// Sanity checks performed before committing a diff set: the diffs must
/// have been generated, and the block must sit in the right place
/// relative to the current tip for the requested direction.
fn commit_diff_set_sanity(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    pb: &ProcessedBlock,
    dir: DiffDirection,
) -> Result<()> {
    if !pb.diffs_generated {
        return Err(Error::DiffsNotGenerated);
    }
    match dir {
        DiffDirection::Apply => {
            if pb.parent_id() != db.current_block_id(txn)? {
                return Err(Error::WrongAppliedDiffSet);
            }
        }
        DiffDirection::Revert => {
            if pb.id() != db.current_block_id(txn)? {
                return Err(Error::WrongRevertDiffSet);
            }
        }
    }
    Ok(())
}

/// Apply or revert a siacoin output diff.
pub(crate) fn commit_siacoin_output_diff(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    diff: &SiacoinOutputDiff,
    dir: DiffDirection,
) -> Result<()> {
    if diff.direction == dir {
        db.add_siacoin_output(txn, &diff.id, &diff.siacoin_output)
    } else {
        db.remove_siacoin_output(txn, &diff.id)
    }
}

/// Apply or revert a file contract diff.
pub(crate) fn commit_file_contract_diff(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    diff: &FileContractDiff,
    dir: DiffDirection,
) -> Result<()> {
    if diff.direction == dir {
        db.add_file_contract(txn, &diff.id, &diff.file_contract)
    } else {
        db.remove_file_contract(txn, &diff.id)
    }
}

/// Apply or revert a siafund output diff.
pub(crate) fn commit_siafund_output_diff(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    diff: &SiafundOutputDiff,
    dir: DiffDirection,
) -> Result<()> {
    if diff.direction == dir {
        db.add_siafund_output(txn, &diff.id, &diff.siafund_output)
    } else {
        db.remove_siafund_output(txn, &diff.id)
    }
}

/// Apply or revert a delayed siacoin output diff against its maturity
/// bucket.
pub(crate) fn commit_delayed_siacoin_output_diff(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    diff: &DelayedSiacoinOutputDiff,
    dir: DiffDirection,
) -> Result<()> {
    if diff.direction == dir {
        db.add_delayed_output(txn, diff.maturity_height, &diff.id, &diff.siacoin_output)
    } else {
        db.remove_delayed_output(txn, diff.maturity_height, &diff.id)
    }
}

/// Apply or revert a siafund pool diff.
///
/// The pool only ever grows, so the diff must be authored in the apply
/// direction with `adjusted >= previous`, and the live pool value must
/// match the expected side for the commit direction. Any mismatch is
/// fatal: the stored diffs no longer describe the ledger they claim to.
pub(crate) fn commit_siafund_pool_diff(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    diff: &SiafundPoolDiff,
    dir: DiffDirection,
) -> Result<()> {
    if diff.adjusted < diff.previous {
        return Err(Error::NegativePoolAdjustment);
    }
    if diff.direction != DiffDirection::Apply {
        return Err(Error::NonApplySiafundPoolDiff);
    }
    let pool = db.siafund_pool(txn)?;
    match dir {
        DiffDirection::Apply => {
            if pool != diff.previous {
                return Err(Error::SiafundPoolApplyMismatch);
            }
            db.set_siafund_pool(txn, diff.adjusted)
        }
        DiffDirection::Revert => {
            if pool != diff.adjusted {
                return Err(Error::SiafundPoolRevertMismatch);
            }
            db.set_siafund_pool(txn, diff.previous)
        }
    }
}

/// Create the delayed bucket that the commit is about to fill: the
/// maturity bucket for this block's delayed outputs when applying, or
/// the bucket at this block's own height (which its diffs will
/// repopulate) when reverting.
fn create_upcoming_delayed_buckets(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    pb: &ProcessedBlock,
    dir: DiffDirection,
) -> Result<()> {
    match dir {
        DiffDirection::Apply => db.create_delayed_bucket(txn, pb.height + MATURITY_DELAY),
        DiffDirection::Revert => {
            // No outputs matured in the first MATURITY_DELAY blocks, so
            // there is no bucket to restore below that height.
            if pb.height > MATURITY_DELAY {
                db.create_delayed_bucket(txn, pb.height)?;
            }
            Ok(())
        }
    }
}

/// Commit every diff in the block. Forward commits walk each list in
/// authoring order; reverse commits walk each list backwards, within
/// each sub-ledger.
fn commit_node_diffs(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    pb: &ProcessedBlock,
    dir: DiffDirection,
) -> Result<()> {
    match dir {
        DiffDirection::Apply => {
            for scod in &pb.siacoin_output_diffs {
                commit_siacoin_output_diff(db, txn, scod, dir)?;
            }
            for fcd in &pb.file_contract_diffs {
                commit_file_contract_diff(db, txn, fcd, dir)?;
            }
            for sfod in &pb.siafund_output_diffs {
                commit_siafund_output_diff(db, txn, sfod, dir)?;
            }
            for dscod in &pb.delayed_siacoin_output_diffs {
                commit_delayed_siacoin_output_diff(db, txn, dscod, dir)?;
            }
            for sfpd in &pb.siafund_pool_diffs {
                commit_siafund_pool_diff(db, txn, sfpd, dir)?;
            }
        }
        DiffDirection::Revert => {
            for scod in pb.siacoin_output_diffs.iter().rev() {
                commit_siacoin_output_diff(db, txn, scod, dir)?;
            }
            for fcd in pb.file_contract_diffs.iter().rev() {
                commit_file_contract_diff(db, txn, fcd, dir)?;
            }
            for sfod in pb.siafund_output_diffs.iter().rev() {
                commit_siafund_output_diff(db, txn, sfod, dir)?;
            }
            for dscod in pb.delayed_siacoin_output_diffs.iter().rev() {
                commit_delayed_siacoin_output_diff(db, txn, dscod, dir)?;
            }
            for sfpd in pb.siafund_pool_diffs.iter().rev() {
                commit_siafund_pool_diff(db, txn, sfpd, dir)?;
            }
        }
    }
    Ok(())
}

/// Delete the delayed bucket the commit has emptied: the bucket at this
/// block's height after applying (its contents were just promoted), or
/// the maturity bucket after reverting (its contents were just
/// un-created).
fn delete_obsolete_delayed_buckets(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    pb: &ProcessedBlock,
    dir: DiffDirection,
) -> Result<()> {
    match dir {
        DiffDirection::Apply => {
            if pb.height > MATURITY_DELAY {
                db.delete_delayed_bucket(txn, pb.height)?;
            }
            Ok(())
        }
        DiffDirection::Revert => db.delete_delayed_bucket(txn, pb.height + MATURITY_DELAY),
    }
}

/// Move the current path: push the block when applying, pop it when
/// reverting.
pub(crate) fn update_current_path(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    pb: &ProcessedBlock,
    dir: DiffDirection,
) -> Result<()> {
    match dir {
        DiffDirection::Apply => db.push_path(txn, &pb.id()),
        DiffDirection::Revert => db.pop_path(txn),
    }
}

/// Atomically apply or revert a processed block's entire diff set.
pub fn commit_diff_set(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    pb: &ProcessedBlock,
    dir: DiffDirection,
) -> Result<()> {
    commit_diff_set_sanity(db, txn, pb, dir)?;
    create_upcoming_delayed_buckets(db, txn, pb, dir)?;
    commit_node_diffs(db, txn, pb, dir)?;
    delete_obsolete_delayed_buckets(db, txn, pb, dir)?;
    update_current_path(db, txn, pb, dir)
}
