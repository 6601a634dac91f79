use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use std::path::Path;
use tracing::{instrument, trace};

use super::BlockService;
use crate::Error;

/// A [BlockService] persisting blocks in a [sled::Db], keyed by the binary
/// representation of their [Cid].
#[derive(Clone)]
pub struct SledBlockService {
    db: sled::Db,
}

impl SledBlockService {
    pub fn new<P: AsRef<Path>>(p: P) -> Result<Self, sled::Error> {
        let config = sled::Config::default()
            .use_compression(false) // is a required parameter
            .path(p);
        let db = config.open()?;

        Ok(Self { db })
    }

    pub fn new_temporary() -> Result<Self, sled::Error> {
        let config = sled::Config::default().temporary(true);
        let db = config.open()?;

        Ok(Self { db })
    }
}

#[async_trait]
impl BlockService for SledBlockService {
    #[instrument(skip(self, cid), fields(block.cid=%cid))]
    async fn has(&self, cid: &Cid) -> Result<bool, Error> {
        self.db
            .contains_key(cid.to_bytes())
            .map_err(|e| Error::Store(format!("unable to check for block {}: {}", cid, e)))
    }

    #[instrument(skip(self, cid), fields(block.cid=%cid))]
    async fn get(&self, cid: &Cid) -> Result<Option<Bytes>, Error> {
        match self.db.get(cid.to_bytes()) {
            Ok(None) => Ok(None),
            Ok(Some(data)) => Ok(Some(Bytes::copy_from_slice(&data[..]))),
            Err(e) => Err(Error::Store(format!("unable to read block {}: {}", cid, e))),
        }
    }

    #[instrument(skip(self, cid, data), fields(block.cid=%cid, block.size=data.len()))]
    async fn put(&self, cid: &Cid, data: Bytes) -> Result<(), Error> {
        // Compare-and-swap against an absent key, so concurrent writers of the
        // same block don't overwrite each other.
        match self
            .db
            .compare_and_swap(cid.to_bytes(), None as Option<&[u8]>, Some(&data[..]))
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => {
                trace!("block already present");
                Ok(())
            }
            Err(e) => Err(Error::Store(format!("unable to insert block {}: {}", cid, e))),
        }
    }
}
