//! Fixtures shared by unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use certqueue_core::{CoreError, CoreResult, MemoryStorage, Storage, StorageEntry};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, SerialNumber};

/// Self-signed DER certificate with the given subject CN and serial.
pub fn der_for(cn: &str, serial: u8) -> Vec<u8> {
    let mut params = CertificateParams::default();
    params.distinguished_name = DistinguishedName::new();
    params.distinguished_name.push(DnType::CommonName, cn);
    params.serial_number = Some(SerialNumber::from(vec![serial]));
    let key = KeyPair::generate().unwrap();
    params.self_signed(&key).unwrap().der().to_vec()
}

/// Memory storage that counts every call and can be told to fail listings.
#[derive(Default)]
pub struct ProbeStorage {
    pub inner: MemoryStorage,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    pub fail_list: AtomicBool,
}

impl ProbeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst) + self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for ProbeStorage {
    async fn list(&self, prefix: &str) -> CoreResult<Vec<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(CoreError::Storage("listing disabled".to_string()));
        }
        self.inner.list(prefix).await
    }

    async fn get(&self, key: &str) -> CoreResult<Option<StorageEntry>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put(&self, entry: StorageEntry) -> CoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.put(entry).await
    }

    async fn delete(&self, key: &str) -> CoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }
}
