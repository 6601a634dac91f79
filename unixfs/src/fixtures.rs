use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use lazy_static::lazy_static;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::address::{AddressConfig, HashAlgorithm};
use crate::blockservice::{BlockService, MemoryBlockService};
use crate::Error;

lazy_static! {
    // 2 bytes
    pub static ref BLOB_A: Bytes = vec![0x00, 0x01].into();
    pub static ref BLOB_A_CID: Cid = AddressConfig::raw(HashAlgorithm::Sha2_256)
        .address(&BLOB_A)
        .expect("valid config");

    // 1MB
    pub static ref BLOB_B: Bytes = (0..255).collect::<Vec<u8>>().repeat(4 * 1024).into();
    pub static ref BLOB_B_CID: Cid = AddressConfig::raw(HashAlgorithm::Sha2_256)
        .address(&BLOB_B)
        .expect("valid config");
}

/// A [MemoryBlockService] counting the writes that reach it.
#[derive(Clone, Default)]
pub struct CountingBlockService {
    inner: MemoryBlockService,
    puts: Arc<AtomicUsize>,
}

impl CountingBlockService {
    /// Number of calls to [BlockService::put] so far.
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockService for CountingBlockService {
    async fn has(&self, cid: &Cid) -> Result<bool, Error> {
        self.inner.has(cid).await
    }

    async fn get(&self, cid: &Cid) -> Result<Option<Bytes>, Error> {
        self.inner.get(cid).await
    }

    async fn put(&self, cid: &Cid, data: Bytes) -> Result<(), Error> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(cid, data).await
    }
}

/// A [BlockService] that is never reachable.
#[derive(Clone, Default)]
pub struct FailingBlockService;

#[async_trait]
impl BlockService for FailingBlockService {
    async fn has(&self, _cid: &Cid) -> Result<bool, Error> {
        Err(Error::Store("unreachable".to_string()))
    }

    async fn get(&self, _cid: &Cid) -> Result<Option<Bytes>, Error> {
        Err(Error::Store("unreachable".to_string()))
    }

    async fn put(&self, _cid: &Cid, _data: Bytes) -> Result<(), Error> {
        Err(Error::Store("unreachable".to_string()))
    }
}
