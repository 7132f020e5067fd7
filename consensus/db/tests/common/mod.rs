// Copyright (c) 2025 The Sia Foundation

//! Test harness: a consensus set over a temporary directory with a
//! permissive root target, plus helpers for building valid blocks.

// Each integration test crate compiles its own copy; not every test
// uses every helper.
#![allow(dead_code)]

use sia_blockchain_types::{
    calculate_coinbase, Block, BlockId, Currency, SiacoinInput, SiacoinOutput, SiacoinOutputId,
    SiafundOutput, Transaction, UnlockHash, TARGET_SECONDS_PER_BLOCK,
};
use sia_consensus_db::{AcceptOutcome, ConsensusSet, GenesisConfig};
use sia_consensus_pow::Target;
use tempfile::TempDir;

/// Address used for all test outputs.
pub const TEST_ADDRESS: UnlockHash = UnlockHash([0x11; 32]);

/// Address paid the miner payouts of harness-built blocks.
pub const MINER_ADDRESS: UnlockHash = UnlockHash([0xaa; 32]);

pub struct TestChain {
    _dir: TempDir,
    pub cs: ConsensusSet,
    pub genesis: GenesisConfig,
}

impl TestChain {
    /// A chain whose genesis premines one siacoin output per value in
    /// `siacoin_values`.
    pub fn new(siacoin_values: &[u64]) -> Self {
        Self::with_allocations(siacoin_values, &[])
    }

    pub fn with_allocations(siacoin_values: &[u64], siafund_values: &[u64]) -> Self {
        let genesis = GenesisConfig {
            timestamp: 1_000_000,
            root_target: Target::MAX,
            siacoin_allocation: siacoin_values
                .iter()
                .map(|&value| SiacoinOutput {
                    value: Currency::from(value),
                    unlock_hash: TEST_ADDRESS,
                })
                .collect(),
            siafund_allocation: siafund_values
                .iter()
                .map(|&value| SiafundOutput {
                    value: Currency::from(value),
                    unlock_hash: TEST_ADDRESS,
                    claim_start: Currency::ZERO,
                })
                .collect(),
        };
        let dir = TempDir::new().unwrap();
        let cs = ConsensusSet::open(dir.path(), &genesis).unwrap();
        TestChain {
            _dir: dir,
            cs,
            genesis,
        }
    }

    /// The ID of the `index`th premined siacoin output.
    pub fn genesis_output_id(&self, index: u64) -> SiacoinOutputId {
        self.genesis.genesis_block().genesis_siacoin_allocation_id(index)
    }

    /// Build a block extending `parent_id`, paying the miner the subsidy
    /// plus fees. Distinct `nonce` values let tests build competing
    /// siblings with distinct IDs.
    pub fn block_on(&self, parent_id: BlockId, nonce: u64, transactions: Vec<Transaction>) -> Block {
        let parent = self.cs.block(&parent_id).unwrap().expect("parent must be known");
        let height = parent.height + 1;
        let mut payout = calculate_coinbase(height);
        for t in &transactions {
            for fee in &t.miner_fees {
                payout = payout.checked_add(*fee).unwrap();
            }
        }
        Block {
            parent_id,
            nonce,
            timestamp: parent.block.timestamp + TARGET_SECONDS_PER_BLOCK,
            miner_payouts: vec![SiacoinOutput {
                value: payout,
                unlock_hash: MINER_ADDRESS,
            }],
            transactions,
        }
    }

    /// Build a block extending the current tip.
    pub fn next_block(&self, transactions: Vec<Transaction>) -> Block {
        self.block_on(self.cs.current_block_id().unwrap(), 0, transactions)
    }

    /// Mine one block extending the tip and require it to be accepted.
    pub fn mine(&mut self, transactions: Vec<Transaction>) -> Block {
        let block = self.next_block(transactions);
        let outcome = self.cs.process_block(block.clone()).unwrap();
        assert_eq!(outcome, AcceptOutcome::Extended);
        block
    }

    /// Mine `n` empty blocks.
    pub fn mine_empty(&mut self, n: u64) -> Vec<Block> {
        (0..n).map(|_| self.mine(vec![])).collect()
    }
}

/// A transaction spending `parent` (worth `value`) into one output per
/// entry of `splits`, with the remainder as a miner fee.
pub fn spend(parent: SiacoinOutputId, value: u64, splits: &[u64]) -> Transaction {
    let spent: u64 = splits.iter().sum();
    assert!(spent <= value, "spend helper misused");
    let fee = value - spent;
    Transaction {
        siacoin_inputs: vec![SiacoinInput { parent_id: parent }],
        siacoin_outputs: splits
            .iter()
            .map(|&v| SiacoinOutput {
                value: Currency::from(v),
                unlock_hash: TEST_ADDRESS,
            })
            .collect(),
        miner_fees: if fee > 0 {
            vec![Currency::from(fee)]
        } else {
            vec![]
        },
        ..Default::default()
    }
}
