// Copyright (c) 2025 The Sia Foundation

//! Diff primitives.
//!
//! A diff records one add-or-remove against one sub-ledger, tagged with
//! the direction in which it was authored. At commit time the authoring
//! direction is combined with an independent commit direction: equal
//! directions add the object, unequal directions remove it. Spending an
//! output during forward application is therefore authored as a
//! `Revert`-direction diff carrying the consumed output, so that
//! reverting the block re-adds it with the exact original payload.
//!
//! The siafund pool diff is the one asymmetric case: the pool is a
//! monotone scalar, so its diff always has the `Apply` direction and
//! carries the before/after pair, checked against the live pool value in
//! both commit directions.

use serde::{Deserialize, Serialize};
use sia_blockchain_types::{
    BlockHeight, Currency, FileContract, FileContractId, SiacoinOutput, SiacoinOutputId,
    SiafundOutput, SiafundOutputId,
};
use sia_util_serial::{Reader, Result as SerialResult, SiaDecodable, SiaEncodable};

/// The direction in which a diff was authored, or in which a diff set is
/// being committed.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum DiffDirection {
    /// Forward application.
    Apply,
    /// Reverse application.
    Revert,
}

impl DiffDirection {
    /// The opposite direction.
    pub fn inverse(self) -> Self {
        match self {
            DiffDirection::Apply => DiffDirection::Revert,
            DiffDirection::Revert => DiffDirection::Apply,
        }
    }
}

impl SiaEncodable for DiffDirection {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        sia_util_serial::write_u8(buf, matches!(self, DiffDirection::Apply) as u8);
    }
}

impl SiaDecodable for DiffDirection {
    fn decode_from(r: &mut Reader<'_>) -> SerialResult<Self> {
        match r.read_u8()? {
            1 => Ok(DiffDirection::Apply),
            0 => Ok(DiffDirection::Revert),
            other => Err(sia_util_serial::DecodeError::InvalidDiscriminant(other as u64)),
        }
    }
}

/// A diff against the siacoin output ledger.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SiacoinOutputDiff {
    /// Authoring direction.
    pub direction: DiffDirection,
    /// The output's ID.
    pub id: SiacoinOutputId,
    /// The output payload; carried even for removals so the inverse
    /// commit can restore it byte-for-byte.
    pub siacoin_output: SiacoinOutput,
}

/// A diff against the file contract ledger.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FileContractDiff {
    /// Authoring direction.
    pub direction: DiffDirection,
    /// The contract's ID.
    pub id: FileContractId,
    /// The contract payload.
    pub file_contract: FileContract,
}

/// A diff against the siafund output ledger.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SiafundOutputDiff {
    /// Authoring direction.
    pub direction: DiffDirection,
    /// The output's ID.
    pub id: SiafundOutputId,
    /// The output payload.
    pub siafund_output: SiafundOutput,
}

/// A diff against one height bucket of the delayed siacoin output ledger.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DelayedSiacoinOutputDiff {
    /// Authoring direction.
    pub direction: DiffDirection,
    /// The output's ID.
    pub id: SiacoinOutputId,
    /// The output payload.
    pub siacoin_output: SiacoinOutput,
    /// The height bucket this diff operates on.
    pub maturity_height: BlockHeight,
}

/// A diff against the siafund pool scalar. Always authored with the
/// `Apply` direction, and `adjusted` is never less than `previous`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SiafundPoolDiff {
    /// Authoring direction; anything but `Apply` is rejected at commit.
    pub direction: DiffDirection,
    /// The pool value before this diff.
    pub previous: Currency,
    /// The pool value after this diff.
    pub adjusted: Currency,
}

impl SiaEncodable for SiacoinOutputDiff {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.direction.encode_to(buf);
        self.id.encode_to(buf);
        self.siacoin_output.encode_to(buf);
    }
}

impl SiaDecodable for SiacoinOutputDiff {
    fn decode_from(r: &mut Reader<'_>) -> SerialResult<Self> {
        Ok(Self {
            direction: DiffDirection::decode_from(r)?,
            id: SiacoinOutputId::decode_from(r)?,
            siacoin_output: SiacoinOutput::decode_from(r)?,
        })
    }
}

impl SiaEncodable for FileContractDiff {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.direction.encode_to(buf);
        self.id.encode_to(buf);
        self.file_contract.encode_to(buf);
    }
}

impl SiaDecodable for FileContractDiff {
    fn decode_from(r: &mut Reader<'_>) -> SerialResult<Self> {
        Ok(Self {
            direction: DiffDirection::decode_from(r)?,
            id: FileContractId::decode_from(r)?,
            file_contract: FileContract::decode_from(r)?,
        })
    }
}

impl SiaEncodable for SiafundOutputDiff {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.direction.encode_to(buf);
        self.id.encode_to(buf);
        self.siafund_output.encode_to(buf);
    }
}

impl SiaDecodable for SiafundOutputDiff {
    fn decode_from(r: &mut Reader<'_>) -> SerialResult<Self> {
        Ok(Self {
            direction: DiffDirection::decode_from(r)?,
            id: SiafundOutputId::decode_from(r)?,
            siafund_output: SiafundOutput::decode_from(r)?,
        })
    }
}

impl SiaEncodable for DelayedSiacoinOutputDiff {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.direction.encode_to(buf);
        self.id.encode_to(buf);
        self.siacoin_output.encode_to(buf);
        self.maturity_height.encode_to(buf);
    }
}

impl SiaDecodable for DelayedSiacoinOutputDiff {
    fn decode_from(r: &mut Reader<'_>) -> SerialResult<Self> {
        Ok(Self {
            direction: DiffDirection::decode_from(r)?,
            id: SiacoinOutputId::decode_from(r)?,
            siacoin_output: SiacoinOutput::decode_from(r)?,
            maturity_height: BlockHeight::decode_from(r)?,
        })
    }
}

impl SiaEncodable for SiafundPoolDiff {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.direction.encode_to(buf);
        self.previous.encode_to(buf);
        self.adjusted.encode_to(buf);
    }
}

impl SiaDecodable for SiafundPoolDiff {
    fn decode_from(r: &mut Reader<'_>) -> SerialResult<Self> {
        Ok(Self {
            direction: DiffDirection::decode_from(r)?,
            previous: Currency::decode_from(r)?,
            adjusted: Currency::decode_from(r)?,
        })
    }
}
