use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;

use crate::Error;

mod from_addr;
mod memory;
mod sled;

#[cfg(test)]
pub mod tests;

pub use self::from_addr::{from_addr, BlockServiceConfig};
pub use self::memory::MemoryBlockService;
pub use self::sled::SledBlockService;

/// The base trait all BlockService services need to implement.
/// It provides functions to check whether a block exists, to retrieve the
/// bytes of a block and to store bytes under a given [Cid].
///
/// Implementations must tolerate concurrent `put`s of the same or different
/// blocks. Putting a block that is already present must be a no-op.
#[async_trait]
pub trait BlockService: Send + Sync {
    /// Check if the service has the block with the given address.
    async fn has(&self, cid: &Cid) -> Result<bool, Error>;

    /// Request a block from the store, by its address.
    /// Returns Ok(None) if the block is not present.
    async fn get(&self, cid: &Cid) -> Result<Option<Bytes>, Error>;

    /// Stores `data` as the block addressed by `cid`.
    /// The caller is responsible for `cid` actually addressing `data`.
    async fn put(&self, cid: &Cid, data: Bytes) -> Result<(), Error>;
}

#[async_trait]
impl<A> BlockService for A
where
    A: AsRef<dyn BlockService> + Send + Sync,
{
    async fn has(&self, cid: &Cid) -> Result<bool, Error> {
        self.as_ref().has(cid).await
    }

    async fn get(&self, cid: &Cid) -> Result<Option<Bytes>, Error> {
        self.as_ref().get(cid).await
    }

    async fn put(&self, cid: &Cid, data: Bytes) -> Result<(), Error> {
        self.as_ref().put(cid, data).await
    }
}
