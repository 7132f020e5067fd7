// Copyright (c) 2025 The Sia Foundation

//! The consensus set.
//!
//! `ConsensusSet` is the one public mutation surface: it owns the
//! database, the bad-block set, and the header validator, and exposes
//! `process_block`. Discovery-layer concerns (orphan pools, timestamp
//! windows, future-block queues) live with the caller; this type only
//! decides whether a parented, header-valid block extends the chain,
//! parks on a side chain, or triggers a reorganization.

use std::{collections::HashSet, path::Path};

use lmdb::{RwTransaction, Transaction as LmdbTransaction};
use sia_blockchain_types::{
    Block, BlockHeight, BlockId, Currency, FileContract, FileContractId, Hash, SiacoinOutput,
    SiacoinOutputId, SiafundOutput, SiafundOutputId,
};
use sia_consensus_pow::{meets_target, next_target, surpasses, Target, DIFFICULTY_WINDOW};
use tracing::{info, warn};

use crate::{
    apply_block::generate_and_apply_diff,
    checksum::consensus_checksum,
    commit::{commit_siacoin_output_diff, commit_siafund_output_diff},
    database::ConsensusDb,
    diff::{DiffDirection, SiacoinOutputDiff, SiafundOutputDiff},
    error::{Error, Result},
    forks::fork_blockchain,
    processed_block::ProcessedBlock,
};

/// Decides whether a block's proof of work is acceptable. Consensus
/// consumes this as a capability so tests and simulations can substitute
/// a permissive check.
pub trait HeaderValidator {
    /// True when `block` is valid work on top of `parent`.
    fn valid_header(&self, parent: &ProcessedBlock, block: &Block) -> bool;
}

/// The production header check: the block ID must meet the parent's
/// child target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TargetHeaderValidator;

impl HeaderValidator for TargetHeaderValidator {
    fn valid_header(&self, parent: &ProcessedBlock, block: &Block) -> bool {
        meets_target(&block.id(), parent.child_target)
    }
}

/// Block IDs that failed validation. Consensus only writes to this set;
/// the discovery layer consults it to refuse re-downloads.
#[derive(Debug, Default)]
pub struct BadBlocks(HashSet<BlockId>);

impl BadBlocks {
    /// Record a bad block.
    pub fn insert(&mut self, id: BlockId) {
        self.0.insert(id);
    }

    /// Whether a block has been recorded bad.
    pub fn contains(&self, id: &BlockId) -> bool {
        self.0.contains(id)
    }

    /// Number of recorded bad blocks.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no bad blocks have been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The ledger state a chain starts from.
#[derive(Clone, Debug)]
pub struct GenesisConfig {
    /// Timestamp of the genesis block.
    pub timestamp: u64,
    /// Target the first mined block must meet.
    pub root_target: Target,
    /// Premined spendable siacoin outputs.
    pub siacoin_allocation: Vec<SiacoinOutput>,
    /// Premined siafund outputs. Their `claim_start` is forced to zero.
    pub siafund_allocation: Vec<SiafundOutput>,
}

impl GenesisConfig {
    /// The genesis block this configuration describes.
    pub fn genesis_block(&self) -> Block {
        Block {
            parent_id: BlockId::ZERO,
            nonce: 0,
            timestamp: self.timestamp,
            miner_payouts: vec![],
            transactions: vec![],
        }
    }
}

/// How `process_block` changed the consensus set.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AcceptOutcome {
    /// The block extended the current chain.
    Extended,
    /// The block completed a heavier fork and the chain switched to it.
    Reorged {
        /// IDs removed from the path, tip first.
        reverted: Vec<BlockId>,
        /// IDs added to the path, oldest first.
        applied: Vec<BlockId>,
    },
    /// The block was recorded on a side chain that does not (yet)
    /// surpass the current chain.
    SideChain,
}

enum Inner {
    Extended,
    SideChain,
    Reorged {
        reverted: Vec<BlockId>,
        applied: Vec<BlockId>,
    },
    Rejected {
        error: Error,
        bad: Vec<BlockId>,
    },
}

/// A persistent consensus set.
pub struct ConsensusSet<H: HeaderValidator = TargetHeaderValidator> {
    db: ConsensusDb,
    validator: H,
    bad_blocks: BadBlocks,
    genesis_id: BlockId,
}

impl ConsensusSet<TargetHeaderValidator> {
    /// Open a consensus set with the production header validator.
    pub fn open(path: &Path, genesis: &GenesisConfig) -> Result<Self> {
        Self::open_with_validator(path, genesis, TargetHeaderValidator)
    }
}

impl<H: HeaderValidator> ConsensusSet<H> {
    /// Open a consensus set at `path`, bootstrapping the genesis state
    /// if the database is empty.
    pub fn open_with_validator(path: &Path, genesis: &GenesisConfig, validator: H) -> Result<Self> {
        let db = ConsensusDb::open(path)?;
        let genesis_block = genesis.genesis_block();
        let genesis_id = genesis_block.id();

        let initialized = {
            let txn = db.read_txn()?;
            db.current_height(&txn)?.is_some()
        };
        if initialized {
            let txn = db.read_txn()?;
            if db.path(&txn, 0)? != Some(genesis_id) {
                return Err(Error::Corrupt("database belongs to a different genesis"));
            }
        } else {
            init_genesis(&db, genesis, genesis_block)?;
            info!(genesis = %genesis_id, "initialized consensus database");
        }

        Ok(Self {
            db,
            validator,
            bad_blocks: BadBlocks::default(),
            genesis_id,
        })
    }

    /// The underlying database. Intended for read-only consumers; all
    /// mutation goes through [`ConsensusSet::process_block`].
    pub fn db(&self) -> &ConsensusDb {
        &self.db
    }

    /// The genesis block's ID.
    pub fn genesis_id(&self) -> BlockId {
        self.genesis_id
    }

    /// The bad-block set populated by failed validations.
    pub fn bad_blocks(&self) -> &BadBlocks {
        &self.bad_blocks
    }

    /// Ingest one block.
    pub fn process_block(&mut self, block: Block) -> Result<AcceptOutcome> {
        let id = block.id();
        let result = self.db.with_write_txn(|txn| self.process_block_txn(txn, &block, id));

        match result {
            Ok(Inner::Extended) => {
                info!(block = %id, "extended the current chain");
                Ok(AcceptOutcome::Extended)
            }
            Ok(Inner::SideChain) => Ok(AcceptOutcome::SideChain),
            Ok(Inner::Reorged { reverted, applied }) => {
                warn!(
                    block = %id,
                    reverted = reverted.len(),
                    applied = applied.len(),
                    "switched to a heavier fork"
                );
                Ok(AcceptOutcome::Reorged { reverted, applied })
            }
            Ok(Inner::Rejected { error, bad }) => {
                warn!(block = %id, error = %error, "rejected a fork during replay");
                for b in bad {
                    self.bad_blocks.insert(b);
                }
                Err(error)
            }
            Err(e) => {
                if is_blameworthy(&e) {
                    self.bad_blocks.insert(id);
                }
                Err(e)
            }
        }
    }

    fn process_block_txn(
        &self,
        txn: &mut RwTransaction<'_>,
        block: &Block,
        id: BlockId,
    ) -> Result<Inner> {
        if self.db.processed_block(txn, &id)?.is_some() {
            return Err(Error::BlockKnown(id));
        }
        let parent = self
            .db
            .processed_block(txn, &block.parent_id)?
            .ok_or(Error::Orphan(block.parent_id))?;
        if !self.validator.valid_header(&parent, block) {
            return Err(Error::InvalidHeader);
        }

        let target = child_target(&self.db, txn, &parent, block)?;
        let mut pb = ProcessedBlock::new(block.clone(), &parent, target);
        self.db.put_processed_block(txn, &pb)?;

        let tip_id = self.db.current_block_id(txn)?;
        if pb.parent_id() == tip_id {
            generate_and_apply_diff(&self.db, txn, &mut pb)?;
            return Ok(Inner::Extended);
        }

        let tip = self
            .db
            .processed_block(txn, &tip_id)?
            .ok_or(Error::MissingBlock(tip_id))?;
        if !surpasses(pb.depth, tip.depth, tip.child_target) {
            return Ok(Inner::SideChain);
        }

        let outcome = fork_blockchain(&self.db, txn, &pb)?;
        match outcome.failed {
            None => Ok(Inner::Reorged {
                reverted: outcome.reverted,
                applied: outcome.applied,
            }),
            Some((error, bad)) => Ok(Inner::Rejected { error, bad }),
        }
    }

    // ------------------------------------------------------------------
    // Read surface
    // ------------------------------------------------------------------

    /// The current tip height.
    pub fn current_height(&self) -> Result<BlockHeight> {
        let txn = self.db.read_txn()?;
        self.db
            .current_height(&txn)?
            .ok_or(Error::Corrupt("current path is empty"))
    }

    /// The current tip block ID.
    pub fn current_block_id(&self) -> Result<BlockId> {
        let txn = self.db.read_txn()?;
        self.db.current_block_id(&txn)
    }

    /// The block ID at `height` on the current path.
    pub fn path(&self, height: BlockHeight) -> Result<Option<BlockId>> {
        let txn = self.db.read_txn()?;
        self.db.path(&txn, height)
    }

    /// A processed block by ID, whether on the path or a side chain.
    pub fn block(&self, id: &BlockId) -> Result<Option<ProcessedBlock>> {
        let txn = self.db.read_txn()?;
        self.db.processed_block(&txn, id)
    }

    /// A spendable siacoin output by ID.
    pub fn siacoin_output(&self, id: &SiacoinOutputId) -> Result<Option<SiacoinOutput>> {
        let txn = self.db.read_txn()?;
        self.db.siacoin_output(&txn, id)
    }

    /// A siafund output by ID.
    pub fn siafund_output(&self, id: &SiafundOutputId) -> Result<Option<SiafundOutput>> {
        let txn = self.db.read_txn()?;
        self.db.siafund_output(&txn, id)
    }

    /// A file contract by ID.
    pub fn file_contract(&self, id: &FileContractId) -> Result<Option<FileContract>> {
        let txn = self.db.read_txn()?;
        self.db.file_contract(&txn, id)
    }

    /// The current siafund pool value.
    pub fn siafund_pool(&self) -> Result<Currency> {
        let txn = self.db.read_txn()?;
        self.db.siafund_pool(&txn)
    }

    /// The delayed bucket for `height`: `None` when the bucket does not
    /// exist, otherwise its contents in ID order.
    pub fn delayed_bucket(
        &self,
        height: BlockHeight,
    ) -> Result<Option<Vec<(SiacoinOutputId, SiacoinOutput)>>> {
        let txn = self.db.read_txn()?;
        if !self.db.delayed_bucket_exists(&txn, height)? {
            return Ok(None);
        }
        self.db.delayed_bucket(&txn, height).map(Some)
    }

    /// A checksum of the entire consensus set.
    pub fn checksum(&self) -> Result<Hash> {
        let txn = self.db.read_txn()?;
        consensus_checksum(&self.db, &txn)
    }
}

/// Whether a rejection should condemn the block in the bad-block set.
/// Store-level failures and duplicate submissions are not the block's
/// fault.
fn is_blameworthy(e: &Error) -> bool {
    !e.is_fatal()
        && !matches!(e, Error::BlockKnown(_) | Error::Lmdb(_) | Error::Decode(_))
}

/// Compute the target for a block extending `parent`, from the
/// timestamps of up to [`DIFFICULTY_WINDOW`] ancestors. The window is
/// gathered by walking parent links so that side-chain blocks retarget
/// against their own history, not the current path's.
fn child_target(
    db: &ConsensusDb,
    txn: &impl LmdbTransaction,
    parent: &ProcessedBlock,
    block: &Block,
) -> Result<Target> {
    let new_height = parent.height + 1;
    let window = new_height.min(DIFFICULTY_WINDOW);
    let mut ancestor = parent.clone();
    for _ in 0..window - 1 {
        let parent_id = ancestor.parent_id();
        ancestor = db
            .processed_block(txn, &parent_id)?
            .ok_or(Error::MissingBlock(parent_id))?;
    }
    Ok(next_target(
        parent.child_target,
        ancestor.block.timestamp,
        block.timestamp,
        window,
    ))
}

/// Write the genesis state: the premined allocations, a zero siafund
/// pool, and the genesis block on the path with its diffs generated.
fn init_genesis(db: &ConsensusDb, genesis: &GenesisConfig, block: Block) -> Result<()> {
    db.with_write_txn(|txn| {
        let mut pb = ProcessedBlock::genesis(block, genesis.root_target);
        db.set_siafund_pool(txn, Currency::ZERO)?;

        for (i, output) in genesis.siacoin_allocation.iter().enumerate() {
            let scod = SiacoinOutputDiff {
                direction: DiffDirection::Apply,
                id: pb.block.genesis_siacoin_allocation_id(i as u64),
                siacoin_output: output.clone(),
            };
            pb.siacoin_output_diffs.push(scod.clone());
            commit_siacoin_output_diff(db, txn, &scod, DiffDirection::Apply)?;
        }
        for (i, output) in genesis.siafund_allocation.iter().enumerate() {
            let sfod = SiafundOutputDiff {
                direction: DiffDirection::Apply,
                id: pb.block.genesis_siafund_allocation_id(i as u64),
                siafund_output: SiafundOutput {
                    value: output.value,
                    unlock_hash: output.unlock_hash,
                    claim_start: Currency::ZERO,
                },
            };
            pb.siafund_output_diffs.push(sfod.clone());
            commit_siafund_output_diff(db, txn, &sfod, DiffDirection::Apply)?;
        }

        db.push_path(txn, &pb.id())?;
        if cfg!(debug_assertions) {
            pb.consensus_checksum = Some(consensus_checksum(db, txn)?);
        }
        pb.diffs_generated = true;
        db.put_processed_block(txn, &pb)
    })
}
