//! Backend reference held by a service
//!
//! Whether the backend supports content addressing is decided once, when
//! the reference is built.

use crate::blob::{BlobResult, BlobStore, ContentAddressable, ListFn, PutOptions};
use std::fmt;
use std::sync::Arc;

/// Storage backend wrapped by a [`StoreService`](super::StoreService)
#[derive(Clone)]
pub enum Backend {
    /// Key/value operations only
    Plain(Arc<dyn BlobStore>),
    /// Key/value operations plus content addressing
    ContentAddressable {
        store: Arc<dyn BlobStore>,
        cas: Arc<dyn ContentAddressable>,
    },
}

impl Backend {
    /// Wrap a store without content addressing
    pub fn plain<S: BlobStore + 'static>(store: Arc<S>) -> Self {
        Backend::Plain(store)
    }

    /// Wrap a store that also supports content addressing
    pub fn content_addressable<C: ContentAddressable + 'static>(cas: Arc<C>) -> Self {
        Backend::ContentAddressable {
            store: cas.clone(),
            cas,
        }
    }

    /// Key/value view of the backend
    pub fn store(&self) -> &dyn BlobStore {
        match self {
            Backend::Plain(store) => &**store,
            Backend::ContentAddressable { store, .. } => &**store,
        }
    }

    /// Content-addressing view, if the backend has one
    pub fn cas(&self) -> Option<&dyn ContentAddressable> {
        match self {
            Backend::Plain(_) => None,
            Backend::ContentAddressable { cas, .. } => Some(&**cas),
        }
    }

    pub fn has_cas(&self) -> bool {
        self.cas().is_some()
    }
}

impl From<Arc<dyn BlobStore>> for Backend {
    fn from(store: Arc<dyn BlobStore>) -> Self {
        Backend::Plain(store)
    }
}

impl From<Arc<dyn ContentAddressable>> for Backend {
    fn from(cas: Arc<dyn ContentAddressable>) -> Self {
        Backend::ContentAddressable {
            store: Arc::new(Upcast(cas.clone())),
            cas,
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Plain(_) => write!(f, "Backend::Plain"),
            Backend::ContentAddressable { .. } => write!(f, "Backend::ContentAddressable"),
        }
    }
}

/// Key/value view over a type-erased content-addressable store
struct Upcast(Arc<dyn ContentAddressable>);

impl BlobStore for Upcast {
    fn get(&self, key: &[u8]) -> BlobResult<Vec<u8>> {
        self.0.get(key)
    }

    fn put(&self, opts: PutOptions<'_>) -> BlobResult<()> {
        self.0.put(opts)
    }

    fn delete(&self, key: &[u8]) -> BlobResult<()> {
        self.0.delete(key)
    }

    fn size(&self, key: &[u8]) -> BlobResult<u64> {
        self.0.size(key)
    }

    fn list(&self, start: &[u8], f: &mut ListFn<'_>) -> BlobResult<()> {
        self.0.list(start, f)
    }

    fn len(&self) -> BlobResult<u64> {
        self.0.len()
    }

    fn close(&self) -> BlobResult<()> {
        self.0.close()
    }
}
