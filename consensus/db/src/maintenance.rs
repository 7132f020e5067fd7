// Copyright (c) 2025 The Sia Foundation

//! Block-level maintenance.
//!
//! After a block's transactions have been applied, three bookkeeping
//! passes run: the miner payouts are enqueued as delayed outputs, the
//! delayed outputs maturing at this height are promoted to spendable
//! siacoin outputs, and file contracts whose window closes at this
//! height are resolved with their missed payout. Every effect is
//! expressed as a diff appended to the processed block, so maintenance
//! reverts exactly like transaction effects do.

use lmdb::RwTransaction;
use sia_blockchain_types::{SiacoinOutput, MATURITY_DELAY};

use crate::{
    commit::{
        commit_delayed_siacoin_output_diff, commit_file_contract_diff, commit_siacoin_output_diff,
    },
    database::ConsensusDb,
    diff::{DelayedSiacoinOutputDiff, DiffDirection, FileContractDiff, SiacoinOutputDiff},
    error::Result,
    processed_block::ProcessedBlock,
};

/// Run all maintenance for `pb`.
pub fn apply_maintenance(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    pb: &mut ProcessedBlock,
) -> Result<()> {
    apply_miner_payouts(db, txn, pb)?;
    apply_matured_siacoin_outputs(db, txn, pb)?;
    apply_file_contract_maintenance(db, txn, pb)
}

/// Enqueue the block's miner payouts as delayed outputs maturing
/// `MATURITY_DELAY` blocks from now.
fn apply_miner_payouts(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    pb: &mut ProcessedBlock,
) -> Result<()> {
    for i in 0..pb.block.miner_payouts.len() {
        let dscod = DelayedSiacoinOutputDiff {
            direction: DiffDirection::Apply,
            id: pb.block.miner_payout_id(i as u64),
            siacoin_output: pb.block.miner_payouts[i].clone(),
            maturity_height: pb.height + MATURITY_DELAY,
        };
        pb.delayed_siacoin_output_diffs.push(dscod.clone());
        commit_delayed_siacoin_output_diff(db, txn, &dscod, DiffDirection::Apply)?;
    }
    Ok(())
}

/// Promote every delayed output maturing at this height into a spendable
/// siacoin output. Each promotion is a paired removal from the bucket
/// and creation in the siacoin ledger.
fn apply_matured_siacoin_outputs(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    pb: &mut ProcessedBlock,
) -> Result<()> {
    // Nothing can mature during the first MATURITY_DELAY blocks; the
    // bucket for those heights was never created.
    if pb.height <= MATURITY_DELAY {
        return Ok(());
    }
    for (id, output) in db.delayed_bucket(txn, pb.height)? {
        let dscod = DelayedSiacoinOutputDiff {
            direction: DiffDirection::Revert,
            id,
            siacoin_output: output.clone(),
            maturity_height: pb.height,
        };
        pb.delayed_siacoin_output_diffs.push(dscod.clone());
        commit_delayed_siacoin_output_diff(db, txn, &dscod, DiffDirection::Apply)?;

        let scod = SiacoinOutputDiff {
            direction: DiffDirection::Apply,
            id,
            siacoin_output: output,
        };
        pb.siacoin_output_diffs.push(scod.clone());
        commit_siacoin_output_diff(db, txn, &scod, DiffDirection::Apply)?;
    }
    Ok(())
}

/// Resolve file contracts whose window closes at this height: the
/// contract leaves the ledger and its missed payout joins the delayed
/// outputs.
fn apply_file_contract_maintenance(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    pb: &mut ProcessedBlock,
) -> Result<()> {
    for (id, contract) in db.contracts_expiring_at(txn, pb.height)? {
        let dscod = DelayedSiacoinOutputDiff {
            direction: DiffDirection::Apply,
            id: id.missed_output_id(),
            siacoin_output: SiacoinOutput {
                value: contract.missed_payout,
                unlock_hash: contract.unlock_hash,
            },
            maturity_height: pb.height + MATURITY_DELAY,
        };
        pb.delayed_siacoin_output_diffs.push(dscod.clone());
        commit_delayed_siacoin_output_diff(db, txn, &dscod, DiffDirection::Apply)?;

        let fcd = FileContractDiff {
            direction: DiffDirection::Revert,
            id,
            file_contract: contract,
        };
        pb.file_contract_diffs.push(fcd.clone());
        commit_file_contract_diff(db, txn, &fcd, DiffDirection::Apply)?;
    }
    Ok(())
}
