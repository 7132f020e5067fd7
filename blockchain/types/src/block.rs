// Copyright (c) 2025 The Sia Foundation

//! Blocks.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sia_util_serial::{Reader, Result as SerialResult, SiaDecodable, SiaEncodable};

use crate::{
    ids::{BlockId, SiacoinOutputId, SiafundOutputId},
    transaction::{derive_id, specifier, SiacoinOutput, Specifier, Transaction},
};

/// The height of a block: the number of blocks between it and the genesis
/// block.
pub type BlockHeight = u64;

pub(crate) const SPECIFIER_MINER_PAYOUT: Specifier = specifier(b"miner payout");
pub(crate) const SPECIFIER_GENESIS_SIACOIN: Specifier = specifier(b"genesis siacoin");
pub(crate) const SPECIFIER_GENESIS_SIAFUND: Specifier = specifier(b"genesis siafund");

/// A block: a header's worth of fields plus the transactions it commits.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Block {
    /// The ID of the parent block.
    pub parent_id: BlockId,
    /// Proof-of-work nonce.
    pub nonce: u64,
    /// Unix timestamp claimed by the miner.
    pub timestamp: u64,
    /// Subsidy and fee payouts. These become delayed siacoin outputs that
    /// mature `MATURITY_DELAY` blocks later.
    pub miner_payouts: Vec<SiacoinOutput>,
    /// The transactions committed by this block.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// The block's ID: the hash of its encoding. The ID doubles as the
    /// proof-of-work attempt; a block is valid work when its ID is at or
    /// below the target inherited from its parent.
    pub fn id(&self) -> BlockId {
        let mut hasher = Sha256::new();
        hasher.update(sia_util_serial::encode(self));
        BlockId(hasher.finalize().into())
    }

    /// The ID of the delayed output created by the `index`th miner payout.
    pub fn miner_payout_id(&self, index: u64) -> SiacoinOutputId {
        SiacoinOutputId(derive_id(&self.id().0, &SPECIFIER_MINER_PAYOUT, index))
    }

    /// The ID of the `index`th siacoin output premined by a genesis
    /// block's allocation.
    pub fn genesis_siacoin_allocation_id(&self, index: u64) -> SiacoinOutputId {
        SiacoinOutputId(derive_id(&self.id().0, &SPECIFIER_GENESIS_SIACOIN, index))
    }

    /// The ID of the `index`th siafund output premined by a genesis
    /// block's allocation.
    pub fn genesis_siafund_allocation_id(&self, index: u64) -> SiafundOutputId {
        SiafundOutputId(derive_id(&self.id().0, &SPECIFIER_GENESIS_SIAFUND, index))
    }
}

impl SiaEncodable for Block {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.parent_id.encode_to(buf);
        self.nonce.encode_to(buf);
        self.timestamp.encode_to(buf);
        self.miner_payouts.encode_to(buf);
        self.transactions.encode_to(buf);
    }
}

impl SiaDecodable for Block {
    fn decode_from(r: &mut Reader<'_>) -> SerialResult<Self> {
        Ok(Self {
            parent_id: BlockId::decode_from(r)?,
            nonce: u64::decode_from(r)?,
            timestamp: u64::decode_from(r)?,
            miner_payouts: Vec::decode_from(r)?,
            transactions: Vec::decode_from(r)?,
        })
    }
}
