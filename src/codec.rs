//! Value Codecs
//!
//! The store persists opaque bytes; a `Serializer<T>` turns `T` into those
//! bytes and back. Decoding must fail loudly rather than produce a wrong value.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{KvlError, Result};

/// Encode/decode contract between a value type and its stored bytes
pub trait Serializer<T> {
    /// Encode a value into bytes
    fn encode(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode bytes produced by `encode`
    ///
    /// Returns `KvlError::Decode` if the bytes do not describe a `T`.
    fn decode(&self, bytes: &[u8]) -> Result<T>;
}

/// bincode codec for any serde type
pub struct BincodeSerializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> BincodeSerializer<T> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> Default for BincodeSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for BincodeSerializer<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BincodeSerializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BincodeSerializer")
    }
}

impl<T: Serialize + DeserializeOwned> Serializer<T> for BincodeSerializer<T> {
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| KvlError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(|e| KvlError::Decode(e.to_string()))
    }
}

/// Identity codec for raw byte values
#[derive(Debug, Clone, Copy, Default)]
pub struct RawSerializer;

impl Serializer<Vec<u8>> for RawSerializer {
    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

/// UTF-8 codec for string values
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Serializer;

impl Serializer<String> for Utf8Serializer {
    fn encode(&self, value: &String) -> Result<Vec<u8>> {
        Ok(value.as_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| KvlError::Decode(e.to_string()))
    }
}
