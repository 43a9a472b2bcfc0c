//! RPC client stores
//!
//! [`RpcStore`] implements BlobStore by calling a [`StoreService`] through a
//! [`Caller`]. [`RpcCas`] adds the content-addressed methods.
//!
//! [`StoreService`]: crate::service::StoreService

use crate::blob::{
    BlobError, BlobResult, BlobStore, CasPutOptions, ContentAddressable, ListFn, PutOptions,
};
use crate::config::StoreOptions;
use crate::errcode::unfilter_err;
use crate::protocol::{
    Bytes, DataRequest, KeyRequest, ListReply, ListRequest, PutRequest, ServerInfo,
    METHOD_CAS_KEY, METHOD_CAS_PUT, METHOD_DELETE, METHOD_GET, METHOD_LEN, METHOD_LIST,
    METHOD_PUT, METHOD_SIZE,
};
use crate::rpc::{call_result, Caller, METHOD_SERVER_INFO};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ops::{ControlFlow, Deref};
use std::sync::Arc;

/// Blob store backed by a remote service
#[derive(Clone)]
pub struct RpcStore {
    client: Arc<dyn Caller>,
    options: StoreOptions,
}

impl RpcStore {
    /// Create a store that delegates through client
    pub fn new(client: Arc<dyn Caller>, options: StoreOptions) -> Self {
        Self { client, options }
    }

    /// Ask the server which methods it exports.
    pub fn server_info(&self) -> BlobResult<ServerInfo> {
        call_result(self.client.as_ref(), METHOD_SERVER_INFO, &()).map_err(unfilter_err)
    }

    fn method(&self, name: &str) -> String {
        format!("{}{}", self.options.method_prefix, name)
    }

    fn call<P, R>(&self, name: &str, params: &P) -> BlobResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        call_result(self.client.as_ref(), &self.method(name), params).map_err(unfilter_err)
    }

    fn key_prefix(&self) -> &[u8] {
        self.options.key_prefix.as_bytes()
    }

    /// Storage key for a caller's key
    fn wire_key(&self, key: &[u8]) -> Bytes {
        let mut wire = self.key_prefix().to_vec();
        wire.extend_from_slice(key);
        Bytes(wire)
    }

    /// Caller's key for a storage key returned by the service
    fn logical_key(&self, key: Bytes) -> BlobResult<Vec<u8>> {
        let prefix = self.key_prefix();
        if !key.starts_with(prefix) {
            return Err(BlobError::InvalidKey(format!(
                "{} lacks prefix {:?}",
                hex::encode(&*key),
                self.options.key_prefix
            )));
        }
        let mut key = key.into_inner();
        key.drain(..prefix.len());
        Ok(key)
    }

    fn page_count(&self) -> i64 {
        i64::try_from(self.options.page_limit).unwrap_or(i64::MAX)
    }
}

impl BlobStore for RpcStore {
    fn get(&self, key: &[u8]) -> BlobResult<Vec<u8>> {
        let data: Bytes = self.call(METHOD_GET, &KeyRequest { key: self.wire_key(key) })?;
        Ok(data.into_inner())
    }

    fn put(&self, opts: PutOptions<'_>) -> BlobResult<()> {
        self.call(
            METHOD_PUT,
            &PutRequest {
                key: self.wire_key(opts.key),
                data: Bytes::from(opts.data),
                replace: opts.replace,
            },
        )
    }

    fn delete(&self, key: &[u8]) -> BlobResult<()> {
        self.call(METHOD_DELETE, &KeyRequest { key: self.wire_key(key) })
    }

    fn size(&self, key: &[u8]) -> BlobResult<u64> {
        self.call(METHOD_SIZE, &KeyRequest { key: self.wire_key(key) })
    }

    fn list(&self, start: &[u8], f: &mut ListFn<'_>) -> BlobResult<()> {
        let prefix = self.key_prefix();
        let mut next = self.wire_key(start);
        loop {
            // Fetch another batch of keys.
            let rsp: ListReply = self.call(
                METHOD_LIST,
                &ListRequest {
                    start: next,
                    count: self.page_count(),
                },
            )?;
            if rsp.keys.is_empty() {
                return Ok(());
            }

            // Deliver keys to the callback, stopping at the end of the namespace.
            for key in &rsp.keys {
                let Some(logical) = key.strip_prefix(prefix) else {
                    return Ok(());
                };
                if let ControlFlow::Break(()) = f(logical)? {
                    return Ok(());
                }
            }

            match rsp.next {
                Some(key) if !key.is_empty() => next = key,
                _ => return Ok(()),
            }
        }
    }

    fn len(&self) -> BlobResult<u64> {
        if self.key_prefix().is_empty() {
            return self.call(METHOD_LEN, &());
        }

        // The service counts every key; count only this namespace.
        let mut count = 0u64;
        self.list(&[], &mut |_| {
            count += 1;
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(count)
    }

    fn close(&self) -> BlobResult<()> {
        self.client.close().map_err(unfilter_err)
    }
}

/// Content-addressable store backed by a remote service
///
/// The content-addressed calls fail with an opaque error if the service's
/// backend does not support content addressing.
#[derive(Clone)]
pub struct RpcCas {
    store: RpcStore,
}

impl RpcCas {
    /// Create a store that delegates through client
    pub fn new(client: Arc<dyn Caller>, options: StoreOptions) -> Self {
        Self {
            store: RpcStore::new(client, options),
        }
    }

    fn derive(&self, method: &str, opts: CasPutOptions<'_>) -> BlobResult<Vec<u8>> {
        let mut prefix = self.store.key_prefix().to_vec();
        prefix.extend_from_slice(opts.prefix);

        let key: Bytes = self.store.call(
            method,
            &DataRequest {
                data: Bytes::from(opts.data),
                prefix: Bytes(prefix),
                suffix: Bytes::from(opts.suffix),
            },
        )?;
        self.store.logical_key(key)
    }
}

impl Deref for RpcCas {
    type Target = RpcStore;

    fn deref(&self) -> &RpcStore {
        &self.store
    }
}

impl From<RpcStore> for RpcCas {
    fn from(store: RpcStore) -> Self {
        Self { store }
    }
}

impl BlobStore for RpcCas {
    fn get(&self, key: &[u8]) -> BlobResult<Vec<u8>> {
        self.store.get(key)
    }

    fn put(&self, opts: PutOptions<'_>) -> BlobResult<()> {
        self.store.put(opts)
    }

    fn delete(&self, key: &[u8]) -> BlobResult<()> {
        self.store.delete(key)
    }

    fn size(&self, key: &[u8]) -> BlobResult<u64> {
        self.store.size(key)
    }

    fn list(&self, start: &[u8], f: &mut ListFn<'_>) -> BlobResult<()> {
        self.store.list(start, f)
    }

    fn len(&self) -> BlobResult<u64> {
        self.store.len()
    }

    fn close(&self) -> BlobResult<()> {
        self.store.close()
    }
}

impl ContentAddressable for RpcCas {
    fn cas_put(&self, opts: CasPutOptions<'_>) -> BlobResult<Vec<u8>> {
        self.derive(METHOD_CAS_PUT, opts)
    }

    fn cas_key(&self, opts: CasPutOptions<'_>) -> BlobResult<Vec<u8>> {
        self.derive(METHOD_CAS_KEY, opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{HashCas, MemStore};
    use crate::config::ServiceOptions;
    use crate::rpc::{LocalClient, RpcError};
    use crate::service::{Backend, StoreService};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Caller that counts calls before forwarding them
    struct Counting {
        inner: LocalClient,
        calls: AtomicUsize,
    }

    impl Caller for Counting {
        fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.call(method, params)
        }
    }

    fn connect(mem: &MemStore, options: StoreOptions) -> RpcStore {
        let svc = StoreService::new(
            Backend::plain(Arc::new(mem.clone())),
            ServiceOptions::default(),
        );
        let client = LocalClient::new(Arc::new(svc.methods()));
        RpcStore::new(Arc::new(client), options)
    }

    fn put(store: &dyn BlobStore, key: &str, data: &str) {
        store
            .put(PutOptions {
                key: key.as_bytes(),
                data: data.as_bytes(),
                replace: false,
            })
            .unwrap();
    }

    fn keys(store: &dyn BlobStore, start: &str) -> Vec<String> {
        let mut seen = Vec::new();
        store
            .list(start.as_bytes(), &mut |key| {
                seen.push(String::from_utf8_lossy(key).into_owned());
                Ok(ControlFlow::Continue(()))
            })
            .unwrap();
        seen
    }

    #[test]
    fn test_round_trip() {
        let store = connect(&MemStore::new(), StoreOptions::default());
        put(&store, "greeting", "hello");

        assert_eq!(store.get(b"greeting").unwrap(), b"hello");
        assert_eq!(store.size(b"greeting").unwrap(), 5);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_errors_survive_the_wire() {
        let store = connect(&MemStore::new(), StoreOptions::default());
        assert!(store.get(b"missing").unwrap_err().is_key_not_found());
        assert!(store.size(b"missing").unwrap_err().is_key_not_found());
        assert!(store.delete(b"missing").unwrap_err().is_key_not_found());

        put(&store, "k", "v");
        let err = store
            .put(PutOptions {
                key: b"k",
                data: b"w",
                replace: false,
            })
            .unwrap_err();
        assert!(err.is_key_exists());
    }

    #[test]
    fn test_list_with_small_pages() {
        let store = connect(
            &MemStore::new(),
            StoreOptions::default().with_page_limit(2),
        );
        for key in ["c", "a", "e", "b", "d"] {
            put(&store, key, "x");
        }
        assert_eq!(keys(&store, ""), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(keys(&store, "c"), vec!["c", "d", "e"]);
        assert!(keys(&store, "f").is_empty());
    }

    #[test]
    fn test_list_stop_issues_no_more_calls() {
        let mem = MemStore::new();
        for key in ["a", "b", "c", "d"] {
            put(&mem, key, "x");
        }
        let svc = StoreService::new(
            Backend::plain(Arc::new(mem.clone())),
            ServiceOptions::default(),
        );
        let counting = Arc::new(Counting {
            inner: LocalClient::new(Arc::new(svc.methods())),
            calls: AtomicUsize::new(0),
        });
        let store = RpcStore::new(counting.clone(), StoreOptions::default().with_page_limit(1));

        let mut seen = Vec::new();
        store
            .list(b"", &mut |key| {
                seen.push(key.to_vec());
                Ok(ControlFlow::Break(()))
            })
            .unwrap();
        assert_eq!(seen, vec![b"a".to_vec()]);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_list_callback_error_propagates() {
        let store = connect(&MemStore::new(), StoreOptions::default());
        put(&store, "a", "x");

        let result = store.list(b"", &mut |_| Err(BlobError::Backend("stop here".to_string())));
        assert!(matches!(result, Err(BlobError::Backend(msg)) if msg == "stop here"));
    }

    #[test]
    fn test_key_prefix_namespaces() {
        let mem = MemStore::new();
        put(&mem, "aaa", "outside");
        put(&mem, "zzz", "outside");

        let store = connect(&mem, StoreOptions::default().with_key_prefix("foo/"));
        put(&store, "one", "1");
        put(&store, "two", "2");

        assert!(mem.snapshot().contains_key(b"foo/one".as_slice()));
        assert_eq!(store.get(b"one").unwrap(), b"1");
        assert!(store.get(b"aaa").unwrap_err().is_key_not_found());
        assert_eq!(keys(&store, ""), vec!["one", "two"]);
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(mem.len().unwrap(), 4);
    }

    #[test]
    fn test_cas_through_proxy() {
        let mem = MemStore::new();
        let svc = StoreService::new(
            Backend::content_addressable(Arc::new(HashCas::blake3(mem.clone()))),
            ServiceOptions::default(),
        );
        let client = LocalClient::new(Arc::new(svc.methods()));
        let cas = RpcCas::new(Arc::new(client), StoreOptions::default());

        let data = b"abcde\n";
        let key = cas.cas_put(CasPutOptions::new(data)).unwrap();
        assert_eq!(key, cas.cas_key(CasPutOptions::new(data)).unwrap());
        assert_eq!(key, blake3::hash(data).as_bytes().to_vec());
        assert_eq!(cas.get(&key).unwrap(), data);
    }

    #[test]
    fn test_cas_unsupported_through_proxy() {
        let mem = MemStore::new();
        let svc = StoreService::new(
            Backend::plain(Arc::new(mem.clone())),
            ServiceOptions::default(),
        );
        let client = LocalClient::new(Arc::new(svc.methods()));
        let cas = RpcCas::new(Arc::new(client), StoreOptions::default());

        for result in [
            cas.cas_put(CasPutOptions::new(b"data")),
            cas.cas_key(CasPutOptions::new(b"data")),
        ] {
            match result {
                Err(BlobError::Rpc { code: None, message }) => {
                    assert_eq!(message, BlobError::CasUnsupported.to_string())
                }
                other => panic!("unexpected result: {:?}", other),
            }
        }
        assert_eq!(mem.len().unwrap(), 0);
    }

    #[test]
    fn test_logical_key_rejects_foreign_prefix() {
        let store = connect(&MemStore::new(), StoreOptions::default().with_key_prefix("ns/"));
        let err = store.logical_key(Bytes::from(b"other/key".as_slice())).unwrap_err();
        assert!(matches!(err, BlobError::InvalidKey(_)));
        assert_eq!(
            store.logical_key(Bytes::from(b"ns/key".as_slice())).unwrap(),
            b"key"
        );
    }

    #[test]
    fn test_close_passes_through() {
        let store = connect(&MemStore::new(), StoreOptions::default());
        store.close().unwrap();
        assert!(matches!(
            store.get(b"anything"),
            Err(BlobError::Rpc { code: None, .. })
        ));
    }
}
