//! Key/value record codec.
//!
//! A record is a 4 byte header (`flags: u8`, `key_len: u8`,
//! `value_len: u16`) followed by the raw key bytes and the raw value bytes.
//! The flags describe how key and value should be interpreted; they are not
//! enforced beyond the typed accessors.

use crate::storage::error::{StorageError, StorageResult};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

pub const RECORD_HEADER_SIZE: usize = 4;
pub const MAX_KEY_LEN: usize = u8::MAX as usize;
pub const MAX_VALUE_LEN: usize = u16::MAX as usize;

// Record flags
pub const R_NUM_KEY: u8 = 0x01;
pub const R_STR_KEY: u8 = 0x02;
pub const R_NUM_VAL: u8 = 0x04;
pub const R_STR_VAL: u8 = 0x08;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    data: Vec<u8>,
}

impl Record {
    /// Create a record with string-typed key and value.
    pub fn new(key: &[u8], value: &[u8]) -> StorageResult<Self> {
        Self::with_flags(R_STR_KEY | R_STR_VAL, key, value)
    }

    /// Create a record with a numeric key. The key is stored big-endian so
    /// byte-wise ordering matches numeric ordering.
    pub fn with_numeric_key(key: u64, value: &[u8]) -> StorageResult<Self> {
        Self::with_flags(R_NUM_KEY | R_STR_VAL, &key.to_be_bytes(), value)
    }

    /// Create a record with numeric key and value.
    pub fn with_numeric_value(key: u64, value: u64) -> StorageResult<Self> {
        Self::with_flags(R_NUM_KEY | R_NUM_VAL, &key.to_be_bytes(), &value.to_be_bytes())
    }

    pub fn with_flags(flags: u8, key: &[u8], value: &[u8]) -> StorageResult<Self> {
        if key.len() > MAX_KEY_LEN || value.len() > MAX_VALUE_LEN {
            return Err(StorageError::RecordTooLarge {
                key_len: key.len(),
                value_len: value.len(),
            });
        }

        let mut data = Vec::with_capacity(RECORD_HEADER_SIZE + key.len() + value.len());
        data.push(flags);
        data.push(key.len() as u8);
        data.extend_from_slice(&(value.len() as u16).to_le_bytes());
        data.extend_from_slice(key);
        data.extend_from_slice(value);

        Ok(Self { data })
    }

    /// Decode a record from its on-page bytes.
    pub fn from_bytes(bytes: &[u8]) -> StorageResult<Self> {
        if bytes.len() < RECORD_HEADER_SIZE {
            return Err(StorageError::InvalidRecord(format!(
                "{} bytes is shorter than the record header",
                bytes.len()
            )));
        }

        let expected = RECORD_HEADER_SIZE + encoded_key(bytes).len() + value_len(bytes);
        if bytes.len() != expected {
            return Err(StorageError::InvalidRecord(format!(
                "header describes {} bytes, got {}",
                expected,
                bytes.len()
            )));
        }

        Ok(Self {
            data: bytes.to_vec(),
        })
    }

    pub fn flags(&self) -> u8 {
        self.data[0]
    }

    pub fn key(&self) -> &[u8] {
        encoded_key(&self.data)
    }

    pub fn value(&self) -> &[u8] {
        let start = RECORD_HEADER_SIZE + self.data[1] as usize;
        &self.data[start..]
    }

    pub fn is_numeric_key(&self) -> bool {
        self.flags() & R_NUM_KEY != 0
    }

    pub fn is_numeric_value(&self) -> bool {
        self.flags() & R_NUM_VAL != 0
    }

    pub fn numeric_key(&self) -> Option<u64> {
        if !self.is_numeric_key() || self.key().len() != 8 {
            return None;
        }
        Some(BigEndian::read_u64(self.key()))
    }

    pub fn numeric_value(&self) -> Option<u64> {
        if !self.is_numeric_value() || self.value().len() != 8 {
            return None;
        }
        Some(BigEndian::read_u64(self.value()))
    }

    /// Encoded length including the header.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Key slice of an encoded record. Zeroed bytes decode to an empty key.
pub(crate) fn encoded_key(bytes: &[u8]) -> &[u8] {
    let key_len = bytes[1] as usize;
    let end = (RECORD_HEADER_SIZE + key_len).min(bytes.len());
    &bytes[RECORD_HEADER_SIZE.min(end)..end]
}

fn value_len(bytes: &[u8]) -> usize {
    LittleEndian::read_u16(&bytes[2..4]) as usize
}
