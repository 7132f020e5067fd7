// Copyright (c) 2025 The Sia Foundation

//! Property-based tests for the diff engine.
//!
//! These drive small random chains through the consensus set and check
//! the structural invariants that make reorganization safe: apply and
//! revert are exact inverses, the siafund pool never shrinks, and the
//! current path always resolves to fully integrated blocks.

mod common;

use common::{spend, TestChain, TEST_ADDRESS};
use proptest::prelude::*;
use sia_blockchain_types::{tax, Currency, FileContract, SiacoinInput, Transaction};
use sia_consensus_db::{commit_diff_set, DiffDirection};

/// One step of a generated chain: mine an empty block, or split the
/// wallet output at a percentage, or lock part of the wallet into a file
/// contract.
#[derive(Clone, Debug)]
enum Step {
    Empty,
    Split(u8),
    Contract(u8),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Empty),
        (1u8..100).prop_map(Step::Split),
        (1u8..100).prop_map(Step::Contract),
    ]
}

/// Drive the chain through `plan`, tracking the wallet output. Returns
/// the checksum after every block.
fn run_plan(chain: &mut TestChain, plan: &[Step]) -> Vec<[u8; 32]> {
    let mut wallet = (chain.genesis_output_id(0), 1_000_000u64);
    let mut checksums = Vec::new();
    for step in plan {
        let height = chain.cs.current_height().unwrap() + 1;
        let transactions = match step {
            Step::Empty => vec![],
            Step::Split(pct) if wallet.1 >= 2 => {
                let a = (wallet.1 * *pct as u64 / 100).clamp(1, wallet.1 - 1);
                let t = spend(wallet.0, wallet.1, &[a, wallet.1 - a]);
                wallet = (t.siacoin_output_id(0), a);
                vec![t]
            }
            Step::Contract(pct) if wallet.1 >= 2 => {
                let payout = (wallet.1 * *pct as u64 / 100).clamp(1, wallet.1 - 1);
                let keep = wallet.1 - payout;
                let payout = Currency::from(payout);
                let contract = FileContract {
                    start: height + 1,
                    end: height + 2,
                    payout,
                    missed_payout: payout.checked_sub(tax(height, payout)).unwrap(),
                    unlock_hash: TEST_ADDRESS,
                };
                let mut t = Transaction {
                    siacoin_inputs: vec![SiacoinInput { parent_id: wallet.0 }],
                    siacoin_outputs: vec![sia_blockchain_types::SiacoinOutput {
                        value: Currency::from(keep),
                        unlock_hash: TEST_ADDRESS,
                    }],
                    ..Default::default()
                };
                t.file_contracts.push(contract);
                wallet = (t.siacoin_output_id(0), keep);
                vec![t]
            }
            // Wallet too small to split further.
            _ => vec![],
        };
        chain.mine(transactions);
        checksums.push(chain.cs.checksum().unwrap());
    }
    checksums
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Applying a chain and then reverting every block restores the
    /// genesis ledger bit for bit.
    #[test]
    fn prop_apply_revert_roundtrip(plan in proptest::collection::vec(step_strategy(), 1..6)) {
        let mut chain = TestChain::new(&[1_000_000]);
        let initial = chain.cs.checksum().unwrap();
        run_plan(&mut chain, &plan);

        let db = chain.cs.db();
        while chain.cs.current_height().unwrap() > 0 {
            let tip = chain.cs.current_block_id().unwrap();
            let pb = chain.cs.block(&tip).unwrap().unwrap();
            db.with_write_txn(|txn| commit_diff_set(db, txn, &pb, DiffDirection::Revert)).unwrap();
        }
        prop_assert_eq!(chain.cs.checksum().unwrap(), initial);
    }

    /// Apply-then-revert of a single block is a no-op at any point in
    /// the chain, and re-applying lands on the recorded state.
    #[test]
    fn prop_diff_symmetry(plan in proptest::collection::vec(step_strategy(), 1..6)) {
        let mut chain = TestChain::new(&[1_000_000]);
        let checksums = run_plan(&mut chain, &plan);

        let tip = chain.cs.current_block_id().unwrap();
        let pb = chain.cs.block(&tip).unwrap().unwrap();
        let before = chain.cs.checksum().unwrap();

        let db = chain.cs.db();
        db.with_write_txn(|txn| {
            commit_diff_set(db, txn, &pb, DiffDirection::Revert)?;
            commit_diff_set(db, txn, &pb, DiffDirection::Apply)
        }).unwrap();

        prop_assert_eq!(chain.cs.checksum().unwrap(), before);
        prop_assert_eq!(*checksums.last().unwrap(), before);
    }

    /// The siafund pool never decreases along a chain.
    #[test]
    fn prop_siafund_pool_monotonic(plan in proptest::collection::vec(step_strategy(), 1..8)) {
        let mut chain = TestChain::new(&[1_000_000]);
        let mut pool = chain.cs.siafund_pool().unwrap();
        for step in &plan {
            run_plan(&mut chain, std::slice::from_ref(step));
            let next = chain.cs.siafund_pool().unwrap();
            prop_assert!(next >= pool, "pool shrank from {} to {}", pool, next);
            pool = next;
        }
    }

    /// Every height on the path resolves to an integrated block whose
    /// parent is the previous path entry.
    #[test]
    fn prop_path_consistency(plan in proptest::collection::vec(step_strategy(), 1..8)) {
        let mut chain = TestChain::new(&[1_000_000]);
        run_plan(&mut chain, &plan);

        let tip_height = chain.cs.current_height().unwrap();
        let mut previous = None;
        for height in 0..=tip_height {
            let id = chain.cs.path(height).unwrap().expect("path entry must exist");
            let pb = chain.cs.block(&id).unwrap().expect("path entry must resolve");
            prop_assert_eq!(pb.height, height);
            prop_assert!(pb.diffs_generated);
            if let Some(parent) = previous {
                prop_assert_eq!(pb.parent_id(), parent);
            }
            previous = Some(id);
        }
    }
}
