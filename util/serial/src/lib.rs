// Copyright (c) 2025 The Sia Foundation

//! Canonical binary encoding for consensus objects.
//!
//! Everything that touches the consensus database goes through this
//! encoding, and the byte layout is part of the on-disk format: two nodes
//! with the same chain history must produce bitwise-identical databases.
//! The rules are deliberately minimal:
//!
//! - fixed-width integers are little-endian;
//! - variable-length byte strings carry an 8-byte little-endian length
//!   prefix;
//! - sequences carry an 8-byte element count followed by the elements;
//! - unsigned big integers are encoded as an 8-byte byte-count followed by
//!   the minimal big-endian representation (zero encodes as a bare zero
//!   count).
//!
//! Types implement [`SiaEncodable`] and [`SiaDecodable`]; the free
//! [`encode`] and [`decode`] functions are the entry points used by the
//! database layer.

#![deny(missing_docs)]

use displaydoc::Display;

/// The maximum length prefix this decoder will accept, as a hedge against
/// corrupt or hostile input asking us to allocate the universe.
const MAX_DECODE_LEN: u64 = 64 * 1024 * 1024;

/// An error produced while decoding.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum DecodeError {
    /// input ended before the object was fully decoded
    UnexpectedEof,
    /// declared length {0} exceeds the decoder limit
    LengthTooLarge(u64),
    /// big integer is wider than 16 bytes
    IntegerTooWide,
    /// big integer has a non-minimal encoding
    NonMinimalInteger,
    /// invalid discriminant {0}
    InvalidDiscriminant(u64),
    /// {0} trailing bytes after decoding
    TrailingBytes(usize),
}

/// Convenience result alias for decode operations.
pub type Result<T> = core::result::Result<T, DecodeError>;

/// A type that can append its canonical encoding to a byte buffer.
pub trait SiaEncodable {
    /// Append the canonical encoding of `self` to `buf`.
    fn encode_to(&self, buf: &mut Vec<u8>);
}

/// A type that can be reconstructed from its canonical encoding.
pub trait SiaDecodable: Sized {
    /// Decode one value from the front of the reader.
    fn decode_from(r: &mut Reader<'_>) -> Result<Self>;
}

/// Encode a value to a fresh byte vector.
pub fn encode<T: SiaEncodable + ?Sized>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    value.encode_to(&mut buf);
    buf
}

/// Decode a value from a byte slice, requiring the whole slice to be
/// consumed.
pub fn decode<T: SiaDecodable>(bytes: &[u8]) -> Result<T> {
    let mut r = Reader::new(bytes);
    let value = T::decode_from(&mut r)?;
    if !r.is_empty() {
        return Err(DecodeError::TrailingBytes(r.remaining()));
    }
    Ok(value)
}

/// A cursor over a byte slice being decoded.
pub struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    /// Wrap a byte slice for decoding.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// True when every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() < n {
            return Err(DecodeError::UnexpectedEof);
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a little-endian u64.
    pub fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("8 bytes")))
    }

    /// Read a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.take(N)?;
        Ok(bytes.try_into().expect("N bytes"))
    }

    /// Read an 8-byte length prefix, bounded by the decoder limit.
    pub fn read_len(&mut self) -> Result<usize> {
        let len = self.read_u64()?;
        if len > MAX_DECODE_LEN {
            return Err(DecodeError::LengthTooLarge(len));
        }
        Ok(len as usize)
    }

    /// Read a length-prefixed byte string.
    pub fn read_prefixed_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len()?;
        Ok(self.take(len)?.to_vec())
    }

    /// Read a byte-count-prefixed unsigned big integer into a u128.
    ///
    /// The encoding is minimal big-endian: no leading zero bytes, and zero
    /// itself is a bare zero count.
    pub fn read_big_uint(&mut self) -> Result<u128> {
        let len = self.read_len()?;
        if len > 16 {
            return Err(DecodeError::IntegerTooWide);
        }
        let bytes = self.take(len)?;
        if !bytes.is_empty() && bytes[0] == 0 {
            return Err(DecodeError::NonMinimalInteger);
        }
        let mut value = 0u128;
        for &b in bytes {
            value = value << 8 | b as u128;
        }
        Ok(value)
    }
}

/// Append one byte.
pub fn write_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

/// Append a little-endian u64.
pub fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Append a length-prefixed byte string.
pub fn write_prefixed_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_u64(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Append a byte-count-prefixed minimal big-endian unsigned integer.
pub fn write_big_uint(buf: &mut Vec<u8>, v: u128) {
    let bytes = v.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    let minimal = &bytes[skip..];
    write_u64(buf, minimal.len() as u64);
    buf.extend_from_slice(minimal);
}

impl SiaEncodable for u64 {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        write_u64(buf, *self);
    }
}

impl SiaDecodable for u64 {
    fn decode_from(r: &mut Reader<'_>) -> Result<Self> {
        r.read_u64()
    }
}

impl SiaEncodable for bool {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        write_u8(buf, *self as u8);
    }
}

impl SiaDecodable for bool {
    fn decode_from(r: &mut Reader<'_>) -> Result<Self> {
        match r.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::InvalidDiscriminant(other as u64)),
        }
    }
}

impl<T: SiaEncodable> SiaEncodable for Vec<T> {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        write_u64(buf, self.len() as u64);
        for item in self {
            item.encode_to(buf);
        }
    }
}

impl<T: SiaDecodable> SiaDecodable for Vec<T> {
    fn decode_from(r: &mut Reader<'_>) -> Result<Self> {
        let len = r.read_len()?;
        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            items.push(T::decode_from(r)?);
        }
        Ok(items)
    }
}

impl<T: SiaEncodable> SiaEncodable for Option<T> {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        match self {
            None => write_u8(buf, 0),
            Some(v) => {
                write_u8(buf, 1);
                v.encode_to(buf);
            }
        }
    }
}

impl<T: SiaDecodable> SiaDecodable for Option<T> {
    fn decode_from(r: &mut Reader<'_>) -> Result<Self> {
        match r.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(T::decode_from(r)?)),
            other => Err(DecodeError::InvalidDiscriminant(other as u64)),
        }
    }
}

impl<const N: usize> SiaEncodable for [u8; N] {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self);
    }
}

impl<const N: usize> SiaDecodable for [u8; N] {
    fn decode_from(r: &mut Reader<'_>) -> Result<Self> {
        r.read_array()
    }
}
