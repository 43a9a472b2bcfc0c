//! Content addressing over any blob store
//!
//! Wraps a BlobStore so that keys are derived from the data they hold.

use super::{BlobError, BlobResult, BlobStore, CasPutOptions, ContentAddressable, ListFn, PutOptions};

/// Digest function used to derive keys from content
pub type Digest = fn(&[u8]) -> Vec<u8>;

/// BLAKE3 digest (32 bytes)
pub fn blake3_digest(data: &[u8]) -> Vec<u8> {
    blake3::hash(data).as_bytes().to_vec()
}

/// Content-addressable store
///
/// The key for a blob is `prefix || digest(data) || suffix`. Writing the
/// same content twice is not an error: the second write finds the key
/// already present and returns it.
pub struct HashCas<S> {
    store: S,
    digest: Digest,
}

impl<S: BlobStore> HashCas<S> {
    /// Wrap store, deriving keys with digest
    pub fn new(store: S, digest: Digest) -> Self {
        Self { store, digest }
    }

    /// Wrap store, deriving keys with BLAKE3
    pub fn blake3(store: S) -> Self {
        Self::new(store, blake3_digest)
    }

    fn key_for(&self, opts: &CasPutOptions<'_>) -> Vec<u8> {
        let mut key = opts.prefix.to_vec();
        key.extend_from_slice(&(self.digest)(opts.data));
        key.extend_from_slice(opts.suffix);
        key
    }
}

impl<S: BlobStore> BlobStore for HashCas<S> {
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

impl<S: BlobStore> ContentAddressable for HashCas<S> {
    fn cas_put(&self, opts: CasPutOptions<'_>) -> BlobResult<Vec<u8>> {
        let key = self.key_for(&opts);
        match self.store.put(PutOptions {
            key: &key,
            data: opts.data,
            replace: false,
        }) {
            Ok(()) => {
                log::debug!("Stored CAS blob {}", hex::encode(&key));
                Ok(key)
            }
            Err(BlobError::KeyExists) => Ok(key),
            Err(e) => Err(e),
        }
    }

    fn cas_key(&self, opts: CasPutOptions<'_>) -> BlobResult<Vec<u8>> {
        Ok(self.key_for(&opts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemStore;

    #[test]
    fn test_cas_put_matches_key() {
        let cas = HashCas::blake3(MemStore::new());

        let data = b"hello world";
        let key = cas.cas_put(CasPutOptions::new(data)).unwrap();
        assert_eq!(key, cas.cas_key(CasPutOptions::new(data)).unwrap());
        assert_eq!(key, blake3::hash(data).as_bytes().to_vec());
        assert_eq!(cas.get(&key).unwrap(), data);
    }

    #[test]
    fn test_cas_key_does_not_store() {
        let cas = HashCas::blake3(MemStore::new());
        cas.cas_key(CasPutOptions::new(b"only hashing")).unwrap();
        assert_eq!(cas.len().unwrap(), 0);
    }

    #[test]
    fn test_duplicate_cas_put() {
        let cas = HashCas::blake3(MemStore::new());

        let data = b"duplicate test";
        let key1 = cas.cas_put(CasPutOptions::new(data)).unwrap();
        let key2 = cas.cas_put(CasPutOptions::new(data)).unwrap();

        // Same data = same key
        assert_eq!(key1, key2);
        assert_eq!(cas.len().unwrap(), 1);
    }

    #[test]
    fn test_prefixed_key() {
        let mem = MemStore::new();
        let cas = HashCas::blake3(mem.clone());

        let key = cas
            .cas_put(CasPutOptions::new(b"test2").with_prefix(b"foo/"))
            .unwrap();
        let digest = blake3::hash(b"test2");
        assert_eq!(&key[..4], b"foo/");
        assert_eq!(&key[4..], digest.as_bytes());
        assert!(mem.snapshot().contains_key(&key));
    }

    #[test]
    fn test_prefix_and_suffix() {
        let mem = MemStore::new();
        let cas = HashCas::blake3(mem.clone());

        let opts = CasPutOptions::new(b"layer")
            .with_prefix(b"sha/")
            .with_suffix(b".tar");
        let key = cas.cas_put(opts).unwrap();
        assert_eq!(key, cas.cas_key(opts).unwrap());

        let mut expected = b"sha/".to_vec();
        expected.extend_from_slice(blake3::hash(b"layer").as_bytes());
        expected.extend_from_slice(b".tar");
        assert_eq!(key, expected);
        assert_eq!(mem.get(&key).unwrap(), b"layer");
    }

    #[test]
    fn test_custom_digest() {
        fn reverse(data: &[u8]) -> Vec<u8> {
            data.iter().rev().copied().collect()
        }

        let cas = HashCas::new(MemStore::new(), reverse);
        let key = cas.cas_key(CasPutOptions::new(b"abc")).unwrap();
        assert_eq!(key, b"cba");
    }
}
