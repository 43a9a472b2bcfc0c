//! Stable error codes
//!
//! A transport reduces errors to a code and a message. Key-not-found and
//! key-exists are assigned reserved codes here so callers on the far side
//! can still tell them apart from other failures.

use crate::blob::BlobError;
use crate::rpc::RpcError;

/// Code for [`BlobError::KeyNotFound`]
pub const CODE_KEY_NOT_FOUND: i64 = -100;

/// Code for [`BlobError::KeyExists`]
pub const CODE_KEY_EXISTS: i64 = -101;

impl BlobError {
    /// Stable wire code, if this error has one
    pub fn to_error_code(&self) -> Option<i64> {
        match self {
            BlobError::KeyNotFound => Some(CODE_KEY_NOT_FOUND),
            BlobError::KeyExists => Some(CODE_KEY_EXISTS),
            _ => None,
        }
    }
}

/// Convert a storage error into a reply error for the wire.
pub fn filter_err(err: BlobError) -> RpcError {
    match err.to_error_code() {
        Some(code) => RpcError::new(code, err.to_string()),
        None => RpcError::opaque(err.to_string()),
    }
}

/// Convert a reply error back into a storage error.
pub fn unfilter_err(err: RpcError) -> BlobError {
    match err.code {
        Some(CODE_KEY_NOT_FOUND) => BlobError::KeyNotFound,
        Some(CODE_KEY_EXISTS) => BlobError::KeyExists,
        code => BlobError::Rpc {
            code,
            message: err.message,
        },
    }
}

impl From<BlobError> for RpcError {
    fn from(err: BlobError) -> Self {
        filter_err(err)
    }
}

impl From<RpcError> for BlobError {
    fn from(err: RpcError) -> Self {
        unfilter_err(err)
    }
}
