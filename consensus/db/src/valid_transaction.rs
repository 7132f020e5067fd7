// Copyright (c) 2025 The Sia Foundation

//! Ledger-level transaction validation.
//!
//! These checks are the ones that need the consensus database: spent
//! outputs must exist, nothing is spent twice, and value is conserved.
//! Signature, script, and well-formedness checking belong to the
//! transaction-syntax layer and are not repeated here.
//!
//! Validation runs against the ledger as mutated by the earlier
//! transactions of the same block, so it cannot be batched ahead of
//! application: a transaction may legitimately spend an output created
//! two entries earlier.

use std::collections::HashSet;

use lmdb::Transaction as LmdbTransaction;
use sia_blockchain_types::{tax, BlockHeight, Currency, Transaction};

use crate::{
    database::ConsensusDb,
    error::{Error, Result},
};

/// Check that `t` can be applied to the current ledger state at
/// `height`. The `claim_start` field of new siafund outputs is ignored;
/// it is assigned by consensus during application.
pub fn valid_transaction(
    db: &ConsensusDb,
    txn: &impl LmdbTransaction,
    height: BlockHeight,
    t: &Transaction,
) -> Result<()> {
    // Siacoin conservation: inputs fund outputs, miner fees, and file
    // contract payouts exactly.
    let mut spent = HashSet::new();
    let mut siacoin_in = Currency::ZERO;
    for input in &t.siacoin_inputs {
        if !spent.insert(input.parent_id) {
            return Err(Error::DoubleSpend);
        }
        let output = db
            .siacoin_output(txn, &input.parent_id)?
            .ok_or(Error::MissingSiacoinOutput(input.parent_id))?;
        siacoin_in = siacoin_in.checked_add(output.value)?;
    }

    let mut siacoin_out = Currency::ZERO;
    for output in &t.siacoin_outputs {
        siacoin_out = siacoin_out.checked_add(output.value)?;
    }
    for fee in &t.miner_fees {
        siacoin_out = siacoin_out.checked_add(*fee)?;
    }
    for contract in &t.file_contracts {
        siacoin_out = siacoin_out.checked_add(contract.payout)?;
    }
    if siacoin_in != siacoin_out {
        return Err(Error::SiacoinInputOutputMismatch);
    }

    // File contract sanity: the window must open in the future and close
    // after it opens, and the missed payout must be the payout net of
    // the siafund tax.
    for contract in &t.file_contracts {
        if contract.start <= height || contract.end <= contract.start {
            return Err(Error::InvalidContractWindow);
        }
        let expected = contract.payout.checked_sub(tax(height, contract.payout))?;
        if contract.missed_payout != expected {
            return Err(Error::InvalidContractPayout);
        }
    }

    // Siafund conservation: fund values pass through unchanged; claims
    // are minted on the siacoin side and do not enter this sum.
    let mut spent_funds = HashSet::new();
    let mut siafund_in = Currency::ZERO;
    for input in &t.siafund_inputs {
        if !spent_funds.insert(input.parent_id) {
            return Err(Error::DoubleSpend);
        }
        let output = db
            .siafund_output(txn, &input.parent_id)?
            .ok_or(Error::MissingSiafundOutput(input.parent_id))?;
        siafund_in = siafund_in.checked_add(output.value)?;
    }
    let mut siafund_out = Currency::ZERO;
    for output in &t.siafund_outputs {
        siafund_out = siafund_out.checked_add(output.value)?;
    }
    if siafund_in != siafund_out {
        return Err(Error::SiafundInputOutputMismatch);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sia_blockchain_types::{
        FileContract, SiacoinInput, SiacoinOutput, SiacoinOutputId, UnlockHash,
    };
    use tempfile::TempDir;

    fn create_test_db() -> (TempDir, ConsensusDb) {
        let temp_dir = TempDir::new().unwrap();
        let db = ConsensusDb::open(temp_dir.path()).unwrap();
        (temp_dir, db)
    }

    fn seed_output(db: &ConsensusDb, id: SiacoinOutputId, value: u64) {
        db.with_write_txn(|txn| {
            db.add_siacoin_output(
                txn,
                &id,
                &SiacoinOutput {
                    value: Currency::from(value),
                    unlock_hash: UnlockHash([1u8; 32]),
                },
            )
        })
        .unwrap();
    }

    fn spend(id: SiacoinOutputId, values: &[u64]) -> Transaction {
        Transaction {
            siacoin_inputs: vec![SiacoinInput { parent_id: id }],
            siacoin_outputs: values
                .iter()
                .map(|&v| SiacoinOutput {
                    value: Currency::from(v),
                    unlock_hash: UnlockHash([2u8; 32]),
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn balanced_spend_is_valid() {
        let (_temp_dir, db) = create_test_db();
        let id = SiacoinOutputId([1u8; 32]);
        seed_output(&db, id, 100);

        let txn = db.read_txn().unwrap();
        valid_transaction(&db, &txn, 5, &spend(id, &[60, 40])).unwrap();
    }

    #[test]
    fn unbalanced_spend_is_rejected() {
        let (_temp_dir, db) = create_test_db();
        let id = SiacoinOutputId([1u8; 32]);
        seed_output(&db, id, 100);

        let txn = db.read_txn().unwrap();
        let err = valid_transaction(&db, &txn, 5, &spend(id, &[60, 41])).unwrap_err();
        assert!(matches!(err, Error::SiacoinInputOutputMismatch));
    }

    #[test]
    fn missing_output_is_rejected() {
        let (_temp_dir, db) = create_test_db();
        let id = SiacoinOutputId([9u8; 32]);
        let txn = db.read_txn().unwrap();
        let err = valid_transaction(&db, &txn, 5, &spend(id, &[1])).unwrap_err();
        assert!(matches!(err, Error::MissingSiacoinOutput(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn intra_transaction_double_spend_is_rejected() {
        let (_temp_dir, db) = create_test_db();
        let id = SiacoinOutputId([1u8; 32]);
        seed_output(&db, id, 100);

        let mut t = spend(id, &[200]);
        t.siacoin_inputs.push(SiacoinInput { parent_id: id });
        let txn = db.read_txn().unwrap();
        assert!(matches!(
            valid_transaction(&db, &txn, 5, &t).unwrap_err(),
            Error::DoubleSpend
        ));
    }

    #[test]
    fn contract_window_must_be_in_the_future() {
        let (_temp_dir, db) = create_test_db();
        let id = SiacoinOutputId([1u8; 32]);
        seed_output(&db, id, 1000);

        let contract = FileContract {
            start: 5,
            end: 10,
            payout: Currency::new(1000),
            missed_payout: Currency::new(961),
            unlock_hash: UnlockHash([3u8; 32]),
        };
        let mut t = spend(id, &[]);
        t.file_contracts.push(contract);

        let txn = db.read_txn().unwrap();
        // Height 5: the window no longer starts in the future.
        assert!(matches!(
            valid_transaction(&db, &txn, 5, &t).unwrap_err(),
            Error::InvalidContractWindow
        ));
        // Height 4: acceptable.
        valid_transaction(&db, &txn, 4, &t).unwrap();
    }

    #[test]
    fn contract_missed_payout_must_net_out_the_tax() {
        let (_temp_dir, db) = create_test_db();
        let id = SiacoinOutputId([1u8; 32]);
        seed_output(&db, id, 1000);

        let contract = FileContract {
            start: 10,
            end: 20,
            payout: Currency::new(1000),
            missed_payout: Currency::new(1000),
            unlock_hash: UnlockHash([3u8; 32]),
        };
        let mut t = spend(id, &[]);
        t.file_contracts.push(contract);

        let txn = db.read_txn().unwrap();
        assert!(matches!(
            valid_transaction(&db, &txn, 4, &t).unwrap_err(),
            Error::InvalidContractPayout
        ));
    }
}
