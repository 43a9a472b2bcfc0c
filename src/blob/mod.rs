//! Blob storage abstraction
//!
//! Defines the BlobStore trait implemented by storage backends and by the
//! RPC proxies, plus the optional ContentAddressable extension.

pub mod cas;
pub mod memory;

use std::ops::ControlFlow;
use thiserror::Error;

/// Blob storage errors
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("key not found")]
    KeyNotFound,

    #[error("key exists")]
    KeyExists,

    #[error("store does not implement content addressing")]
    CasUnsupported,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Failure reported by the RPC layer without a stable code.
    #[error("{message}")]
    Rpc { code: Option<i64>, message: String },

    #[error("backend error: {0}")]
    Backend(String),
}

impl BlobError {
    /// Report whether this error denotes a missing key.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, BlobError::KeyNotFound)
    }

    /// Report whether this error denotes an existing key.
    pub fn is_key_exists(&self) -> bool {
        matches!(self, BlobError::KeyExists)
    }
}

/// Result type for blob operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Callback invoked once per key by [`BlobStore::list`].
///
/// Returning `Break(())` ends the listing without error.
pub type ListFn<'a> = dyn FnMut(&[u8]) -> BlobResult<ControlFlow<()>> + 'a;

/// Arguments to [`BlobStore::put`].
#[derive(Debug, Clone, Copy)]
pub struct PutOptions<'a> {
    pub key: &'a [u8],
    pub data: &'a [u8],
    /// Overwrite an existing value instead of failing with `KeyExists`.
    pub replace: bool,
}

/// Arguments to the content-addressed operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CasPutOptions<'a> {
    pub data: &'a [u8],
    /// Bytes prepended to the derived digest to form the storage key.
    pub prefix: &'a [u8],
    /// Bytes appended after the digest.
    pub suffix: &'a [u8],
}

impl<'a> CasPutOptions<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            prefix: &[],
            suffix: &[],
        }
    }

    pub fn with_prefix(mut self, prefix: &'a [u8]) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn with_suffix(mut self, suffix: &'a [u8]) -> Self {
        self.suffix = suffix;
        self
    }
}

/// Blob store trait - key/value interface for opaque byte payloads
pub trait BlobStore: Send + Sync {
    /// Fetch the contents of key.
    fn get(&self, key: &[u8]) -> BlobResult<Vec<u8>>;

    /// Write a blob. Fails with `KeyExists` if the key is present and
    /// `replace` is false.
    fn put(&self, opts: PutOptions<'_>) -> BlobResult<()>;

    /// Remove key, failing with `KeyNotFound` if it is absent.
    fn delete(&self, key: &[u8]) -> BlobResult<()>;

    /// Size in bytes of the blob stored under key.
    fn size(&self, key: &[u8]) -> BlobResult<u64>;

    /// Call f with each key greater than or equal to start, in ascending
    /// lexicographic order.
    fn list(&self, start: &[u8], f: &mut ListFn<'_>) -> BlobResult<()>;

    /// Number of keys in the store.
    fn len(&self) -> BlobResult<u64>;

    /// Release any resources held by the store.
    fn close(&self) -> BlobResult<()> {
        Ok(())
    }
}

/// Extension for stores that derive keys from content.
pub trait ContentAddressable: BlobStore {
    /// Store data under its derived key and return that key.
    fn cas_put(&self, opts: CasPutOptions<'_>) -> BlobResult<Vec<u8>>;

    /// Compute the key data would be stored under, without storing it.
    fn cas_key(&self, opts: CasPutOptions<'_>) -> BlobResult<Vec<u8>>;
}

// Re-export implementations
pub use cas::HashCas;
pub use memory::MemStore;
