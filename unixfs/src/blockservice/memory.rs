use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};
use tracing::{instrument, trace};

use super::BlockService;
use crate::Error;

#[derive(Clone, Default)]
pub struct MemoryBlockService {
    db: Arc<RwLock<HashMap<Cid, Bytes>>>,
}

impl MemoryBlockService {
    /// Returns the number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.db.read().map(|db| db.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlockService for MemoryBlockService {
    #[instrument(skip(self, cid), fields(block.cid=%cid))]
    async fn has(&self, cid: &Cid) -> Result<bool, Error> {
        let db = self
            .db
            .read()
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(db.contains_key(cid))
    }

    #[instrument(skip(self, cid), fields(block.cid=%cid))]
    async fn get(&self, cid: &Cid) -> Result<Option<Bytes>, Error> {
        let db = self
            .db
            .read()
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(db.get(cid).cloned())
    }

    #[instrument(skip(self, cid, data), fields(block.cid=%cid, block.size=data.len()))]
    async fn put(&self, cid: &Cid, data: Bytes) -> Result<(), Error> {
        let mut db = self
            .db
            .write()
            .map_err(|e| Error::Store(e.to_string()))?;

        // Only insert if the block doesn't already exist.
        if db.contains_key(cid) {
            trace!("block already present");
        } else {
            db.insert(*cid, data);
        }

        Ok(())
    }
}
