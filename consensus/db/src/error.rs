// Copyright (c) 2025 The Sia Foundation

//! Consensus database errors.

use displaydoc::Display;
use sia_blockchain_types::{
    BlockHeight, BlockId, CurrencyError, SiacoinOutputId, SiafundOutputId,
};
use sia_util_serial::DecodeError;

/// A convenience wrapper for a [std::result::Result] containing a
/// consensus [Error].
pub type Result<T> = std::result::Result<T, Error>;

/// An error returned by the consensus database.
///
/// Validation variants describe why a block or transaction was rejected;
/// the enclosing write transaction rolls back and the chain is unchanged.
/// Variants for which [`Error::is_fatal`] returns true indicate a
/// corrupted database or a bug in the diff machinery; the transaction
/// still rolls back, but callers must treat the database as suspect.
#[derive(Debug, Display)]
pub enum Error {
    /// LMDB failure: {0}
    Lmdb(lmdb::Error),
    /// decoding a stored object failed: {0}
    Decode(DecodeError),
    /// block {0} is already in the block map
    BlockKnown(BlockId),
    /// block's parent {0} is not in the block map
    Orphan(BlockId),
    /// block does not meet its target
    InvalidHeader,
    /// transaction spends a nonexistent siacoin output {0}
    MissingSiacoinOutput(SiacoinOutputId),
    /// transaction spends a nonexistent siafund output {0}
    MissingSiafundOutput(SiafundOutputId),
    /// output spent twice in the same transaction
    DoubleSpend,
    /// siacoin inputs do not equal siacoin outputs plus fees and contract payouts
    SiacoinInputOutputMismatch,
    /// siafund inputs do not equal siafund outputs
    SiafundInputOutputMismatch,
    /// file contract window starts in the past or ends before it starts
    InvalidContractWindow,
    /// file contract missed payout does not equal payout minus tax
    InvalidContractPayout,
    /// currency arithmetic failed: {0}
    Currency(CurrencyError),

    /// adding an entry to {0} that already exists
    EntryExists(&'static str),
    /// removing an entry from {0} that does not exist
    EntryMissing(&'static str),
    /// creating a delayed output bucket for height {0} that already exists
    DelayedBucketExists(BlockHeight),
    /// delayed output bucket for height {0} does not exist
    DelayedBucketMissing(BlockHeight),
    /// deleting a delayed output bucket for height {0} that is not empty
    DelayedBucketNotEmpty(BlockHeight),
    /// popping the genesis block off the current path
    PopGenesis,
    /// block {0} missing from the block map
    MissingBlock(BlockId),

    /// committing a siafund pool diff with an invalid previous value
    SiafundPoolApplyMismatch,
    /// reverting a siafund pool diff with an invalid adjusted value
    SiafundPoolRevertMismatch,
    /// committing a siafund pool diff with a negative adjustment
    NegativePoolAdjustment,
    /// committing a siafund pool diff that does not have the apply direction
    NonApplySiafundPoolDiff,
    /// applying a diff set before its diffs have been generated
    DiffsNotGenerated,
    /// applying a diff set that is not a child of the current block
    WrongAppliedDiffSet,
    /// reverting a diff set that is not the current block
    WrongRevertDiffSet,
    /// generating diffs for a block that is not a child of the current block
    InvalidSuccessor,
    /// consensus database is corrupt: {0}
    Corrupt(&'static str),
}

impl Error {
    /// True when the error indicates database corruption or a bug in the
    /// diff machinery rather than a rejectable block.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::EntryExists(_)
                | Error::EntryMissing(_)
                | Error::DelayedBucketExists(_)
                | Error::DelayedBucketMissing(_)
                | Error::DelayedBucketNotEmpty(_)
                | Error::PopGenesis
                | Error::MissingBlock(_)
                | Error::SiafundPoolApplyMismatch
                | Error::SiafundPoolRevertMismatch
                | Error::NegativePoolAdjustment
                | Error::NonApplySiafundPoolDiff
                | Error::DiffsNotGenerated
                | Error::WrongAppliedDiffSet
                | Error::WrongRevertDiffSet
                | Error::InvalidSuccessor
                | Error::Corrupt(_)
        )
    }
}

impl From<lmdb::Error> for Error {
    fn from(src: lmdb::Error) -> Self {
        Error::Lmdb(src)
    }
}

impl From<DecodeError> for Error {
    fn from(src: DecodeError) -> Self {
        Error::Decode(src)
    }
}

impl From<CurrencyError> for Error {
    fn from(src: CurrencyError) -> Self {
        Error::Currency(src)
    }
}

impl std::error::Error for Error {}
