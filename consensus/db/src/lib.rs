// Copyright (c) 2025 The Sia Foundation

//! The persistent consensus set.
//!
//! This crate maintains the best-chain view of the ledger in LMDB and
//! keeps it exactly reversible: every block's effect on the five
//! sub-ledgers (siacoin outputs, file contracts, siafund outputs,
//! delayed siacoin outputs, and the siafund pool) is recorded as an
//! ordered diff set, and forks are handled by replaying stored diffs
//! backward to the fork point and forward up the new chain.
//!
//! The modules map onto the lifecycle of a block:
//!
//! - [`database`]: typed buckets and the write-transaction boundary;
//! - [`diff`]: the diff records and their direction semantics;
//! - [`processed_block`]: a block plus its recorded diffs;
//! - [`valid_transaction`] / [`apply_transaction`] / [`maintenance`] /
//!   [`apply_block`]: first-time validation and integration;
//! - [`commit`]: atomic apply/revert of a recorded diff set;
//! - `forks`: fork-point discovery, rewind, replay, and recovery;
//! - [`checksum`]: whole-ledger checksums used to catch asymmetric
//!   diffs;
//! - [`consensus_set`]: the public entry point.

pub mod apply_block;
pub mod apply_transaction;
pub mod checksum;
pub mod commit;
pub mod consensus_set;
pub mod database;
pub mod diff;
pub mod error;
mod forks;
pub mod maintenance;
pub mod processed_block;
pub mod valid_transaction;

pub use crate::{
    apply_block::generate_and_apply_diff,
    apply_transaction::apply_transaction,
    checksum::consensus_checksum,
    commit::commit_diff_set,
    consensus_set::{
        AcceptOutcome, BadBlocks, ConsensusSet, GenesisConfig, HeaderValidator,
        TargetHeaderValidator,
    },
    database::ConsensusDb,
    diff::{
        DelayedSiacoinOutputDiff, DiffDirection, FileContractDiff, SiacoinOutputDiff,
        SiafundOutputDiff, SiafundPoolDiff,
    },
    error::{Error, Result},
    maintenance::apply_maintenance,
    processed_block::ProcessedBlock,
    valid_transaction::valid_transaction,
};
