// Copyright (c) 2025 The Sia Foundation

//! Transactions and the objects they create.
//!
//! Object identifiers are derived by hashing the parent identifier with a
//! 16-byte specifier and an index, so the IDs of the outputs of a
//! transaction are fixed the moment the transaction is. Signature and
//! script data are checked by the transaction-syntax layer and play no
//! role in the consensus data model.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sia_util_serial::{
    write_prefixed_bytes, Reader, Result as SerialResult, SiaDecodable, SiaEncodable,
};

use crate::{
    block::BlockHeight,
    currency::Currency,
    ids::{FileContractId, SiacoinOutputId, SiafundOutputId, UnlockHash},
};

/// A 16-byte tag that namespaces derived identifiers.
pub(crate) type Specifier = [u8; 16];

pub(crate) const SPECIFIER_SIACOIN_OUTPUT: Specifier = specifier(b"siacoin output");
pub(crate) const SPECIFIER_FILE_CONTRACT: Specifier = specifier(b"file contract");
pub(crate) const SPECIFIER_SIAFUND_OUTPUT: Specifier = specifier(b"siafund output");
pub(crate) const SPECIFIER_CLAIM_OUTPUT: Specifier = specifier(b"claim output");
pub(crate) const SPECIFIER_MISSED_PAYOUT: Specifier = specifier(b"missed payout");

/// Build a specifier from an ASCII tag, zero-padded to 16 bytes.
pub(crate) const fn specifier(tag: &[u8]) -> Specifier {
    let mut out = [0u8; 16];
    let mut i = 0;
    while i < tag.len() {
        out[i] = tag[i];
        i += 1;
    }
    out
}

/// Hash a parent identifier, a specifier, and an index into a child
/// identifier.
pub(crate) fn derive_id(parent: &[u8; 32], spec: &Specifier, index: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(parent);
    hasher.update(spec);
    hasher.update(index.to_le_bytes());
    hasher.finalize().into()
}

/// A spendable siacoin output.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SiacoinOutput {
    /// The number of siacoins the output is worth.
    pub value: Currency,
    /// The address that may spend the output.
    pub unlock_hash: UnlockHash,
}

/// A siafund output. Siafunds entitle their holder to a share of the
/// siafund pool; `claim_start` records the pool value at creation so the
/// accrued share can be computed when the output is spent.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SiafundOutput {
    /// The number of siafunds the output is worth.
    pub value: Currency,
    /// The address that may spend the output.
    pub unlock_hash: UnlockHash,
    /// The siafund pool value at the moment this output was created.
    pub claim_start: Currency,
}

/// An agreement to store data between two window heights.
///
/// Consensus only tracks the funding lifecycle: the contract locks
/// `payout` siacoins at creation (of which the siafund tax is skimmed into
/// the pool), and if it survives untouched to its `end` height the
/// remaining `missed_payout` is returned as a delayed output to
/// `unlock_hash`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FileContract {
    /// First height of the proof window; must be in the future at
    /// acceptance time.
    pub start: BlockHeight,
    /// Height at which the contract expires.
    pub end: BlockHeight,
    /// Siacoins locked into the contract.
    pub payout: Currency,
    /// Siacoins returned on expiry: `payout` minus the siafund tax.
    pub missed_payout: Currency,
    /// The address paid on expiry.
    pub unlock_hash: UnlockHash,
}

/// A siacoin input, consuming a prior output whole.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SiacoinInput {
    /// The output being spent.
    pub parent_id: SiacoinOutputId,
}

/// A siafund input, consuming a prior siafund output whole and harvesting
/// its pool claim.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SiafundInput {
    /// The output being spent.
    pub parent_id: SiafundOutputId,
    /// The address paid the harvested siacoin claim.
    pub claim_unlock_hash: UnlockHash,
}

/// A transaction.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Transaction {
    /// Siacoin outputs consumed.
    pub siacoin_inputs: Vec<SiacoinInput>,
    /// Siacoin outputs created.
    pub siacoin_outputs: Vec<SiacoinOutput>,
    /// File contracts created.
    pub file_contracts: Vec<FileContract>,
    /// Siafund outputs consumed.
    pub siafund_inputs: Vec<SiafundInput>,
    /// Siafund outputs created.
    pub siafund_outputs: Vec<SiafundOutput>,
    /// Fees paid to the miner of the containing block.
    pub miner_fees: Vec<Currency>,
    /// Uninterpreted data carried along with the transaction.
    pub arbitrary_data: Vec<Vec<u8>>,
}

impl Transaction {
    /// The transaction's identifier: the hash of its encoding.
    pub fn id(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(sia_util_serial::encode(self));
        hasher.finalize().into()
    }

    /// The ID of the `index`th siacoin output created by this transaction.
    pub fn siacoin_output_id(&self, index: u64) -> SiacoinOutputId {
        SiacoinOutputId(derive_id(&self.id(), &SPECIFIER_SIACOIN_OUTPUT, index))
    }

    /// The ID of the `index`th file contract created by this transaction.
    pub fn file_contract_id(&self, index: u64) -> FileContractId {
        FileContractId(derive_id(&self.id(), &SPECIFIER_FILE_CONTRACT, index))
    }

    /// The ID of the `index`th siafund output created by this transaction.
    pub fn siafund_output_id(&self, index: u64) -> SiafundOutputId {
        SiafundOutputId(derive_id(&self.id(), &SPECIFIER_SIAFUND_OUTPUT, index))
    }
}

impl SiafundOutputId {
    /// The ID of the delayed siacoin output minted when this siafund
    /// output harvests its pool claim.
    pub fn claim_output_id(&self) -> SiacoinOutputId {
        SiacoinOutputId(derive_id(&self.0, &SPECIFIER_CLAIM_OUTPUT, 0))
    }
}

impl FileContractId {
    /// The ID of the delayed siacoin output minted when this contract
    /// expires with a missed payout.
    pub fn missed_output_id(&self) -> SiacoinOutputId {
        SiacoinOutputId(derive_id(&self.0, &SPECIFIER_MISSED_PAYOUT, 0))
    }
}

impl SiaEncodable for SiacoinOutput {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.value.encode_to(buf);
        self.unlock_hash.encode_to(buf);
    }
}

impl SiaDecodable for SiacoinOutput {
    fn decode_from(r: &mut Reader<'_>) -> SerialResult<Self> {
        Ok(Self {
            value: Currency::decode_from(r)?,
            unlock_hash: UnlockHash::decode_from(r)?,
        })
    }
}

impl SiaEncodable for SiafundOutput {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.value.encode_to(buf);
        self.unlock_hash.encode_to(buf);
        self.claim_start.encode_to(buf);
    }
}

impl SiaDecodable for SiafundOutput {
    fn decode_from(r: &mut Reader<'_>) -> SerialResult<Self> {
        Ok(Self {
            value: Currency::decode_from(r)?,
            unlock_hash: UnlockHash::decode_from(r)?,
            claim_start: Currency::decode_from(r)?,
        })
    }
}

impl SiaEncodable for FileContract {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.start.encode_to(buf);
        self.end.encode_to(buf);
        self.payout.encode_to(buf);
        self.missed_payout.encode_to(buf);
        self.unlock_hash.encode_to(buf);
    }
}

impl SiaDecodable for FileContract {
    fn decode_from(r: &mut Reader<'_>) -> SerialResult<Self> {
        Ok(Self {
            start: BlockHeight::decode_from(r)?,
            end: BlockHeight::decode_from(r)?,
            payout: Currency::decode_from(r)?,
            missed_payout: Currency::decode_from(r)?,
            unlock_hash: UnlockHash::decode_from(r)?,
        })
    }
}

impl SiaEncodable for SiacoinInput {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.parent_id.encode_to(buf);
    }
}

impl SiaDecodable for SiacoinInput {
    fn decode_from(r: &mut Reader<'_>) -> SerialResult<Self> {
        Ok(Self {
            parent_id: SiacoinOutputId::decode_from(r)?,
        })
    }
}

impl SiaEncodable for SiafundInput {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.parent_id.encode_to(buf);
        self.claim_unlock_hash.encode_to(buf);
    }
}

impl SiaDecodable for SiafundInput {
    fn decode_from(r: &mut Reader<'_>) -> SerialResult<Self> {
        Ok(Self {
            parent_id: SiafundOutputId::decode_from(r)?,
            claim_unlock_hash: UnlockHash::decode_from(r)?,
        })
    }
}

impl SiaEncodable for Transaction {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.siacoin_inputs.encode_to(buf);
        self.siacoin_outputs.encode_to(buf);
        self.file_contracts.encode_to(buf);
        self.siafund_inputs.encode_to(buf);
        self.siafund_outputs.encode_to(buf);
        self.miner_fees.encode_to(buf);
        sia_util_serial::write_u64(buf, self.arbitrary_data.len() as u64);
        for item in &self.arbitrary_data {
            write_prefixed_bytes(buf, item);
        }
    }
}

impl SiaDecodable for Transaction {
    fn decode_from(r: &mut Reader<'_>) -> SerialResult<Self> {
        let siacoin_inputs = Vec::decode_from(r)?;
        let siacoin_outputs = Vec::decode_from(r)?;
        let file_contracts = Vec::decode_from(r)?;
        let siafund_inputs = Vec::decode_from(r)?;
        let siafund_outputs = Vec::decode_from(r)?;
        let miner_fees = Vec::decode_from(r)?;
        let count = r.read_len()?;
        let mut arbitrary_data = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            arbitrary_data.push(r.read_prefixed_bytes()?);
        }
        Ok(Self {
            siacoin_inputs,
            siacoin_outputs,
            file_contracts,
            siafund_inputs,
            siafund_outputs,
            miner_fees,
            arbitrary_data,
        })
    }
}
