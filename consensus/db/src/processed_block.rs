// Copyright (c) 2025 The Sia Foundation

//! Processed blocks.
//!
//! A `ProcessedBlock` is a block plus everything consensus learned by
//! integrating it: its height and cumulative work, the target its
//! children must meet, and the five ordered diff lists describing its
//! exact effect on the ledger. Once `diffs_generated` is true the diffs
//! are replayed from this record and never recomputed, which is what
//! makes apply and revert bitwise-exact inverses even across upgrades to
//! the validation logic.

use serde::{Deserialize, Serialize};
use sia_blockchain_types::{Block, BlockHeight, BlockId, Hash};
use sia_consensus_pow::Target;
use sia_util_serial::{Reader, Result as SerialResult, SiaDecodable, SiaEncodable};

use crate::diff::{
    DelayedSiacoinOutputDiff, FileContractDiff, SiacoinOutputDiff, SiafundOutputDiff,
    SiafundPoolDiff,
};

/// A block and its precomputed consensus effects.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ProcessedBlock {
    /// The block itself.
    pub block: Block,
    /// The block's height.
    pub height: BlockHeight,
    /// Cumulative work of the chain ending at this block.
    pub depth: u128,
    /// The target this block's children must meet.
    pub child_target: Target,
    /// True once the block has been fully validated and its diffs
    /// recorded. Diffs of a block with `diffs_generated == false` must
    /// never be committed.
    pub diffs_generated: bool,

    /// Siacoin output diffs, in authoring order.
    pub siacoin_output_diffs: Vec<SiacoinOutputDiff>,
    /// File contract diffs, in authoring order.
    pub file_contract_diffs: Vec<FileContractDiff>,
    /// Siafund output diffs, in authoring order.
    pub siafund_output_diffs: Vec<SiafundOutputDiff>,
    /// Delayed siacoin output diffs, in authoring order.
    pub delayed_siacoin_output_diffs: Vec<DelayedSiacoinOutputDiff>,
    /// Siafund pool diffs, in authoring order.
    pub siafund_pool_diffs: Vec<SiafundPoolDiff>,

    /// Checksum of the whole consensus set at the moment the diffs were
    /// generated. Recorded in debug builds and checked when the chain is
    /// rewound back to this block, catching asymmetric diffs.
    pub consensus_checksum: Option<Hash>,
}

impl ProcessedBlock {
    /// Start a record for a block extending `parent`, with empty diff
    /// lists and `diffs_generated == false`.
    pub fn new(block: Block, parent: &ProcessedBlock, child_target: Target) -> Self {
        let depth = parent.depth.saturating_add(parent.child_target.work());
        Self {
            block,
            height: parent.height + 1,
            depth,
            child_target,
            diffs_generated: false,
            siacoin_output_diffs: Vec::new(),
            file_contract_diffs: Vec::new(),
            siafund_output_diffs: Vec::new(),
            delayed_siacoin_output_diffs: Vec::new(),
            siafund_pool_diffs: Vec::new(),
            consensus_checksum: None,
        }
    }

    /// The record for a genesis block: height zero, no parent work.
    pub fn genesis(block: Block, child_target: Target) -> Self {
        Self {
            block,
            height: 0,
            depth: 0,
            child_target,
            diffs_generated: false,
            siacoin_output_diffs: Vec::new(),
            file_contract_diffs: Vec::new(),
            siafund_output_diffs: Vec::new(),
            delayed_siacoin_output_diffs: Vec::new(),
            siafund_pool_diffs: Vec::new(),
            consensus_checksum: None,
        }
    }

    /// The block's ID.
    pub fn id(&self) -> BlockId {
        self.block.id()
    }

    /// The parent block's ID.
    pub fn parent_id(&self) -> BlockId {
        self.block.parent_id
    }
}

impl SiaEncodable for ProcessedBlock {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.block.encode_to(buf);
        self.height.encode_to(buf);
        sia_util_serial::write_big_uint(buf, self.depth);
        self.child_target.encode_to(buf);
        self.diffs_generated.encode_to(buf);
        self.siacoin_output_diffs.encode_to(buf);
        self.file_contract_diffs.encode_to(buf);
        self.siafund_output_diffs.encode_to(buf);
        self.delayed_siacoin_output_diffs.encode_to(buf);
        self.siafund_pool_diffs.encode_to(buf);
        self.consensus_checksum.encode_to(buf);
    }
}

impl SiaDecodable for ProcessedBlock {
    fn decode_from(r: &mut Reader<'_>) -> SerialResult<Self> {
        Ok(Self {
            block: Block::decode_from(r)?,
            height: BlockHeight::decode_from(r)?,
            depth: r.read_big_uint()?,
            child_target: Target::decode_from(r)?,
            diffs_generated: bool::decode_from(r)?,
            siacoin_output_diffs: Vec::decode_from(r)?,
            file_contract_diffs: Vec::decode_from(r)?,
            siafund_output_diffs: Vec::decode_from(r)?,
            delayed_siacoin_output_diffs: Vec::decode_from(r)?,
            siafund_pool_diffs: Vec::decode_from(r)?,
            consensus_checksum: Option::decode_from(r)?,
        })
    }
}
