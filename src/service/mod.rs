//! Store service
//!
//! Adapts RPC requests to a local blob store. Each storage operation is
//! exported as one method; see [`crate::protocol`] for the message shapes.
//!
//! The `cas.put` and `cas.key` methods are always exported. When the
//! backend does not support content addressing they fail with
//! [`BlobError::CasUnsupported`] without touching the backend, so clients
//! see the same method set from every instance of a replicated service.

mod backend;

pub use backend::Backend;

use crate::blob::{BlobError, BlobResult, CasPutOptions, PutOptions};
use crate::config::ServiceOptions;
use crate::protocol::{
    Bytes, DataRequest, KeyRequest, ListReply, ListRequest, PutRequest, DEFAULT_PAGE_LIMIT,
    METHOD_CAS_KEY, METHOD_CAS_PUT, METHOD_DELETE, METHOD_GET, METHOD_LEN, METHOD_LIST,
    METHOD_PUT, METHOD_SIZE,
};
use crate::rpc::{handler, MethodMap};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ops::ControlFlow;

/// Service that exports a blob store over RPC
#[derive(Debug, Clone)]
pub struct StoreService {
    backend: Backend,
    options: ServiceOptions,
}

impl StoreService {
    /// Create a service delegating to backend
    ///
    /// A zero page limit is replaced by [`DEFAULT_PAGE_LIMIT`].
    pub fn new(backend: Backend, mut options: ServiceOptions) -> Self {
        if options.page_limit == 0 {
            log::warn!(
                "Service page limit 0 is unusable, using {}",
                DEFAULT_PAGE_LIMIT
            );
            options.page_limit = DEFAULT_PAGE_LIMIT;
        }
        log::info!(
            "Store service created (content addressing: {}, page limit: {})",
            backend.has_cas(),
            options.page_limit
        );
        Self { backend, options }
    }

    /// Whether the backend supports content addressing
    pub fn has_cas(&self) -> bool {
        self.backend.has_cas()
    }

    /// Method table for this service
    pub fn methods(&self) -> MethodMap {
        let mut methods = MethodMap::new();
        self.route(&mut methods, METHOD_GET, Self::get);
        self.route(&mut methods, METHOD_PUT, Self::put);
        self.route(&mut methods, METHOD_DELETE, Self::delete);
        self.route(&mut methods, METHOD_SIZE, Self::size);
        self.route(&mut methods, METHOD_LEN, |svc: &Self, _: ()| svc.len());
        self.route(&mut methods, METHOD_LIST, Self::list);
        self.route(&mut methods, METHOD_CAS_PUT, Self::cas_put);
        self.route(&mut methods, METHOD_CAS_KEY, Self::cas_key);
        methods
    }

    fn route<Req, Rep, F>(&self, methods: &mut MethodMap, name: &'static str, f: F)
    where
        Req: DeserializeOwned + 'static,
        Rep: Serialize + 'static,
        F: Fn(&Self, Req) -> BlobResult<Rep> + Send + Sync + 'static,
    {
        let svc = self.clone();
        methods.insert(
            name,
            handler(move |req: Req| f(&svc, req).map_err(|e| log_failure(name, e))),
        );
    }

    /// Handle get
    pub fn get(&self, req: KeyRequest) -> BlobResult<Bytes> {
        log::debug!("get key={}", hex::encode(&*req.key));
        self.backend.store().get(&req.key).map(Bytes::from)
    }

    /// Handle put
    pub fn put(&self, req: PutRequest) -> BlobResult<()> {
        log::debug!(
            "put key={} size={} replace={}",
            hex::encode(&*req.key),
            req.data.len(),
            req.replace
        );
        self.backend.store().put(PutOptions {
            key: &req.key,
            data: &req.data,
            replace: req.replace,
        })
    }

    /// Handle delete
    pub fn delete(&self, req: KeyRequest) -> BlobResult<()> {
        log::debug!("delete key={}", hex::encode(&*req.key));
        self.backend.store().delete(&req.key)
    }

    /// Handle size
    pub fn size(&self, req: KeyRequest) -> BlobResult<u64> {
        log::debug!("size key={}", hex::encode(&*req.key));
        self.backend.store().size(&req.key)
    }

    /// Handle len
    pub fn len(&self) -> BlobResult<u64> {
        log::debug!("len");
        self.backend.store().len()
    }

    /// Handle list
    ///
    /// Returns up to `count` keys starting at `start`. If more keys remain,
    /// the first one not returned is reported as `next`.
    pub fn list(&self, req: ListRequest) -> BlobResult<ListReply> {
        let limit = if req.count <= 0 {
            self.options.page_limit
        } else {
            usize::try_from(req.count).unwrap_or(usize::MAX)
        };
        log::debug!("list start={} limit={}", hex::encode(&*req.start), limit);

        let mut reply = ListReply::default();
        self.backend.store().list(&req.start, &mut |key| {
            if reply.keys.len() == limit {
                reply.next = Some(Bytes::from(key));
                return Ok(ControlFlow::Break(()));
            }
            reply.keys.push(Bytes::from(key));
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(reply)
    }

    /// Handle cas.put
    pub fn cas_put(&self, req: DataRequest) -> BlobResult<Bytes> {
        let cas = self.backend.cas().ok_or(BlobError::CasUnsupported)?;
        log::debug!("cas.put size={}", req.data.len());
        let opts = CasPutOptions::new(&req.data)
            .with_prefix(&req.prefix)
            .with_suffix(&req.suffix);
        cas.cas_put(opts).map(Bytes::from)
    }

    /// Handle cas.key
    pub fn cas_key(&self, req: DataRequest) -> BlobResult<Bytes> {
        let cas = self.backend.cas().ok_or(BlobError::CasUnsupported)?;
        log::debug!("cas.key size={}", req.data.len());
        let opts = CasPutOptions::new(&req.data)
            .with_prefix(&req.prefix)
            .with_suffix(&req.suffix);
        cas.cas_key(opts).map(Bytes::from)
    }
}

fn log_failure(method: &str, err: BlobError) -> BlobError {
    match err {
        BlobError::KeyNotFound | BlobError::KeyExists | BlobError::CasUnsupported => {
            log::debug!("{} failed: {}", method, err)
        }
        _ => log::warn!("{} failed: {}", method, err),
    }
    err
}
