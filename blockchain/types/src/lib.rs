// Copyright (c) 2025 The Sia Foundation

//! Blockchain data structures.
//!
//! This crate defines the passive data model shared by the consensus
//! engine: identifiers, the currency type, transactions and their outputs,
//! file contracts, blocks, chain constants, and the siafund tax
//! arithmetic. It contains no state and no I/O; the consensus database
//! crate owns all persistence.

#![deny(missing_docs)]

mod block;
mod constants;
mod currency;
mod ids;
mod tax;
mod transaction;

pub use crate::{
    block::{Block, BlockHeight},
    constants::{
        calculate_coinbase, INITIAL_COINBASE, MATURITY_DELAY, MINIMUM_COINBASE, SIAFUND_COUNT,
        TARGET_SECONDS_PER_BLOCK, TAX_HARDFORK_HEIGHT,
    },
    currency::{Currency, CurrencyError},
    ids::{BlockId, FileContractId, Hash, SiacoinOutputId, SiafundOutputId, UnlockHash},
    tax::tax,
    transaction::{
        FileContract, SiacoinInput, SiacoinOutput, SiafundInput, SiafundOutput, Transaction,
    },
};
