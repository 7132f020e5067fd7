// Copyright (c) 2025 The Sia Foundation

//! Applying validated transactions.
//!
//! Each helper mutates the ledger and appends the diff describing the
//! mutation to the processed block, in the order the effects occur. The
//! diff is committed through the same primitive the committer uses, so a
//! freshly generated block and a replayed one take the identical code
//! path through the store.

use lmdb::RwTransaction;
use sia_blockchain_types::{
    tax, Currency, SiacoinOutput, SiafundOutput, Transaction, MATURITY_DELAY, SIAFUND_COUNT,
};

use crate::{
    commit::{
        commit_delayed_siacoin_output_diff, commit_file_contract_diff, commit_siacoin_output_diff,
        commit_siafund_output_diff, commit_siafund_pool_diff,
    },
    database::ConsensusDb,
    diff::{
        DelayedSiacoinOutputDiff, DiffDirection, FileContractDiff, SiacoinOutputDiff,
        SiafundOutputDiff, SiafundPoolDiff,
    },
    error::{Error, Result},
    processed_block::ProcessedBlock,
};

/// Apply a validated transaction to the ledger, recording its diffs in
/// `pb`.
pub fn apply_transaction(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    pb: &mut ProcessedBlock,
    t: &Transaction,
) -> Result<()> {
    apply_siacoin_inputs(db, txn, pb, t)?;
    apply_siacoin_outputs(db, txn, pb, t)?;
    apply_file_contracts(db, txn, pb, t)?;
    apply_siafund_inputs(db, txn, pb, t)?;
    apply_siafund_outputs(db, txn, pb, t)
}

/// Consume the transaction's siacoin inputs. The removal diff carries
/// the consumed output so a revert restores it exactly.
fn apply_siacoin_inputs(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    pb: &mut ProcessedBlock,
    t: &Transaction,
) -> Result<()> {
    for input in &t.siacoin_inputs {
        let output = db
            .siacoin_output(txn, &input.parent_id)?
            .ok_or(Error::MissingSiacoinOutput(input.parent_id))?;
        let scod = SiacoinOutputDiff {
            direction: DiffDirection::Revert,
            id: input.parent_id,
            siacoin_output: output,
        };
        pb.siacoin_output_diffs.push(scod.clone());
        commit_siacoin_output_diff(db, txn, &scod, DiffDirection::Apply)?;
    }
    Ok(())
}

/// Create the transaction's siacoin outputs.
fn apply_siacoin_outputs(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    pb: &mut ProcessedBlock,
    t: &Transaction,
) -> Result<()> {
    for (i, output) in t.siacoin_outputs.iter().enumerate() {
        let scod = SiacoinOutputDiff {
            direction: DiffDirection::Apply,
            id: t.siacoin_output_id(i as u64),
            siacoin_output: output.clone(),
        };
        pb.siacoin_output_diffs.push(scod.clone());
        commit_siacoin_output_diff(db, txn, &scod, DiffDirection::Apply)?;
    }
    Ok(())
}

/// Create the transaction's file contracts and skim the siafund tax on
/// each payout into the pool.
fn apply_file_contracts(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    pb: &mut ProcessedBlock,
    t: &Transaction,
) -> Result<()> {
    for (i, contract) in t.file_contracts.iter().enumerate() {
        let fcd = FileContractDiff {
            direction: DiffDirection::Apply,
            id: t.file_contract_id(i as u64),
            file_contract: contract.clone(),
        };
        pb.file_contract_diffs.push(fcd.clone());
        commit_file_contract_diff(db, txn, &fcd, DiffDirection::Apply)?;

        let previous = db.siafund_pool(txn)?;
        let adjusted = previous.checked_add(tax(pb.height, contract.payout))?;
        let sfpd = SiafundPoolDiff {
            direction: DiffDirection::Apply,
            previous,
            adjusted,
        };
        pb.siafund_pool_diffs.push(sfpd.clone());
        commit_siafund_pool_diff(db, txn, &sfpd, DiffDirection::Apply)?;
    }
    Ok(())
}

/// Consume the transaction's siafund inputs, harvesting the pool claim
/// accrued since each output's `claim_start` into a delayed siacoin
/// output.
fn apply_siafund_inputs(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    pb: &mut ProcessedBlock,
    t: &Transaction,
) -> Result<()> {
    for input in &t.siafund_inputs {
        let output = db
            .siafund_output(txn, &input.parent_id)?
            .ok_or(Error::MissingSiafundOutput(input.parent_id))?;

        let pool = db.siafund_pool(txn)?;
        let claim = pool
            .checked_sub(output.claim_start)?
            .checked_mul(output.value.value())?
            .div_floor(SIAFUND_COUNT as u128);
        let dscod = DelayedSiacoinOutputDiff {
            direction: DiffDirection::Apply,
            id: input.parent_id.claim_output_id(),
            siacoin_output: SiacoinOutput {
                value: claim,
                unlock_hash: input.claim_unlock_hash,
            },
            maturity_height: pb.height + MATURITY_DELAY,
        };
        pb.delayed_siacoin_output_diffs.push(dscod.clone());
        commit_delayed_siacoin_output_diff(db, txn, &dscod, DiffDirection::Apply)?;

        let sfod = SiafundOutputDiff {
            direction: DiffDirection::Revert,
            id: input.parent_id,
            siafund_output: output,
        };
        pb.siafund_output_diffs.push(sfod.clone());
        commit_siafund_output_diff(db, txn, &sfod, DiffDirection::Apply)?;
    }
    Ok(())
}

/// Create the transaction's siafund outputs. `claim_start` is assigned
/// here: whatever the pool holds right now is the baseline for the new
/// output's future claim.
fn apply_siafund_outputs(
    db: &ConsensusDb,
    txn: &mut RwTransaction<'_>,
    pb: &mut ProcessedBlock,
    t: &Transaction,
) -> Result<()> {
    for (i, output) in t.siafund_outputs.iter().enumerate() {
        let pool = db.siafund_pool(txn)?;
        let sfod = SiafundOutputDiff {
            direction: DiffDirection::Apply,
            id: t.siafund_output_id(i as u64),
            siafund_output: SiafundOutput {
                value: output.value,
                unlock_hash: output.unlock_hash,
                claim_start: pool,
            },
        };
        pb.siafund_output_diffs.push(sfod.clone());
        commit_siafund_output_diff(db, txn, &sfod, DiffDirection::Apply)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processed_block::ProcessedBlock;
    use sia_blockchain_types::{
        Block, BlockId, Currency, SiacoinInput, SiacoinOutputId, UnlockHash,
    };
    use sia_consensus_pow::Target;
    use tempfile::TempDir;

    fn create_test_db() -> (TempDir, ConsensusDb) {
        let temp_dir = TempDir::new().unwrap();
        let db = ConsensusDb::open(temp_dir.path()).unwrap();
        (temp_dir, db)
    }

    fn empty_pb(height: u64) -> ProcessedBlock {
        let mut pb = ProcessedBlock::genesis(
            Block {
                parent_id: BlockId::ZERO,
                nonce: 0,
                timestamp: 0,
                miner_payouts: vec![],
                transactions: vec![],
            },
            Target::MAX,
        );
        pb.height = height;
        pb
    }

    #[test]
    fn spend_emits_paired_diffs_in_order() {
        let (_temp_dir, db) = create_test_db();
        let parent = SiacoinOutputId([1u8; 32]);
        let t = Transaction {
            siacoin_inputs: vec![SiacoinInput { parent_id: parent }],
            siacoin_outputs: vec![
                SiacoinOutput {
                    value: Currency::new(60),
                    unlock_hash: UnlockHash([2u8; 32]),
                },
                SiacoinOutput {
                    value: Currency::new(40),
                    unlock_hash: UnlockHash([2u8; 32]),
                },
            ],
            ..Default::default()
        };

        let mut pb = empty_pb(1);
        db.with_write_txn(|txn| {
            db.set_siafund_pool(txn, Currency::ZERO)?;
            db.add_siacoin_output(
                txn,
                &parent,
                &SiacoinOutput {
                    value: Currency::new(100),
                    unlock_hash: UnlockHash([3u8; 32]),
                },
            )?;
            apply_transaction(&db, txn, &mut pb, &t)?;

            // Ledger: input consumed, outputs live.
            assert!(db.siacoin_output(txn, &parent)?.is_none());
            assert!(db.siacoin_output(txn, &t.siacoin_output_id(0))?.is_some());
            assert!(db.siacoin_output(txn, &t.siacoin_output_id(1))?.is_some());
            Ok(())
        })
        .unwrap();

        // Diffs: removal first (authored as Revert), then the two
        // creations in output order.
        assert_eq!(pb.siacoin_output_diffs.len(), 3);
        assert_eq!(pb.siacoin_output_diffs[0].direction, DiffDirection::Revert);
        assert_eq!(pb.siacoin_output_diffs[0].id, parent);
        assert_eq!(pb.siacoin_output_diffs[1].id, t.siacoin_output_id(0));
        assert_eq!(pb.siacoin_output_diffs[2].id, t.siacoin_output_id(1));
    }

    #[test]
    fn file_contract_grows_the_pool() {
        let (_temp_dir, db) = create_test_db();
        let parent = SiacoinOutputId([1u8; 32]);
        let payout = Currency::new(100_000);
        let t = Transaction {
            siacoin_inputs: vec![SiacoinInput { parent_id: parent }],
            file_contracts: vec![sia_blockchain_types::FileContract {
                start: 10,
                end: 20,
                payout,
                missed_payout: payout.checked_sub(tax(1, payout)).unwrap(),
                unlock_hash: UnlockHash([4u8; 32]),
            }],
            ..Default::default()
        };

        let mut pb = empty_pb(1);
        db.with_write_txn(|txn| {
            db.set_siafund_pool(txn, Currency::ZERO)?;
            db.add_siacoin_output(
                txn,
                &parent,
                &SiacoinOutput {
                    value: payout,
                    unlock_hash: UnlockHash([3u8; 32]),
                },
            )?;
            apply_transaction(&db, txn, &mut pb, &t)?;
            assert_eq!(db.siafund_pool(txn)?, tax(1, payout));
            assert!(db.file_contract(txn, &t.file_contract_id(0))?.is_some());
            Ok(())
        })
        .unwrap();

        assert_eq!(pb.siafund_pool_diffs.len(), 1);
        assert_eq!(pb.siafund_pool_diffs[0].previous, Currency::ZERO);
        assert_eq!(pb.siafund_pool_diffs[0].adjusted, tax(1, payout));
    }

    #[test]
    fn siafund_spend_harvests_the_claim() {
        let (_temp_dir, db) = create_test_db();
        let parent = sia_blockchain_types::SiafundOutputId([5u8; 32]);
        let claim_address = UnlockHash([6u8; 32]);
        let t = Transaction {
            siafund_inputs: vec![sia_blockchain_types::SiafundInput {
                parent_id: parent,
                claim_unlock_hash: claim_address,
            }],
            siafund_outputs: vec![SiafundOutput {
                value: Currency::new(500),
                unlock_hash: UnlockHash([7u8; 32]),
                claim_start: Currency::ZERO,
            }],
            ..Default::default()
        };

        let mut pb = empty_pb(10);
        db.with_write_txn(|txn| {
            // Pool has grown by 20_000 since the output's claim_start.
            db.set_siafund_pool(txn, Currency::new(20_000))?;
            db.add_siafund_output(
                txn,
                &parent,
                &SiafundOutput {
                    value: Currency::new(500),
                    unlock_hash: UnlockHash([7u8; 32]),
                    claim_start: Currency::ZERO,
                },
            )?;
            db.create_delayed_bucket(txn, 10 + MATURITY_DELAY)?;
            apply_transaction(&db, txn, &mut pb, &t)?;

            // claim = 20_000 * 500 / SIAFUND_COUNT = 1_000
            let bucket = db.delayed_bucket(txn, 10 + MATURITY_DELAY)?;
            assert_eq!(bucket.len(), 1);
            assert_eq!(bucket[0].0, parent.claim_output_id());
            assert_eq!(bucket[0].1.value, Currency::new(1_000));
            assert_eq!(bucket[0].1.unlock_hash, claim_address);

            // The replacement output's claim starts at the current pool.
            let new_output = db.siafund_output(txn, &t.siafund_output_id(0))?.unwrap();
            assert_eq!(new_output.claim_start, Currency::new(20_000));
            assert!(db.siafund_output(txn, &parent)?.is_none());
            Ok(())
        })
        .unwrap();
    }
}
