// Copyright (c) 2025 The Sia Foundation

//! Identifier newtypes.
//!
//! Every persistent object is addressed by a 32-byte hash. Each kind of
//! object gets its own newtype so the store cannot confuse, say, a siafund
//! output ID with the siacoin output ID minted by spending it.

use serde::{Deserialize, Serialize};
use sia_util_serial::{Reader, Result as SerialResult, SiaDecodable, SiaEncodable};

/// A raw 32-byte digest.
pub type Hash = [u8; 32];

macro_rules! hash_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd,
            Serialize,
        )]
        pub struct $name(pub Hash);

        impl $name {
            /// The all-zero identifier.
            pub const ZERO: Self = Self([0u8; 32]);

            /// View the identifier as raw bytes.
            pub fn as_bytes(&self) -> &Hash {
                &self.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<Hash> for $name {
            fn from(hash: Hash) -> Self {
                Self(hash)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl SiaEncodable for $name {
            fn encode_to(&self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.0);
            }
        }

        impl SiaDecodable for $name {
            fn decode_from(r: &mut Reader<'_>) -> SerialResult<Self> {
                Ok(Self(r.read_array()?))
            }
        }
    };
}

hash_id! {
    /// The identifier of a block: the hash of its header fields.
    BlockId
}

hash_id! {
    /// The identifier of a siacoin output, delayed or spendable.
    SiacoinOutputId
}

hash_id! {
    /// The identifier of a file contract.
    FileContractId
}

hash_id! {
    /// The identifier of a siafund output.
    SiafundOutputId
}

hash_id! {
    /// The address that may spend an output. Opaque to consensus; the
    /// conditions behind it are checked by the transaction-syntax layer.
    UnlockHash
}

#[cfg(test)]
mod tests {
    use super::*;
    use sia_util_serial::{decode, encode};

    #[test]
    fn display_is_hex() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        assert!(BlockId(bytes).to_string().starts_with("ab00"));
    }

    #[test]
    fn encoding_is_raw_bytes() {
        let id = SiacoinOutputId([7u8; 32]);
        let buf = encode(&id);
        assert_eq!(buf, [7u8; 32]);
        assert_eq!(decode::<SiacoinOutputId>(&buf).unwrap(), id);
    }
}
