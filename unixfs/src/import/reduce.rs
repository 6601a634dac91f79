use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, instrument, trace, Level};

use super::FileMetadata;
use crate::address::{AddressConfig, HashAlgorithm};
use crate::blockservice::BlockService;
use crate::nodes::{NodeDescriptor, UnixFs};
use crate::persist::persist;
use crate::proto::{DataType, PbLink, PbNode};
use crate::Error;

/// Turns a group of children into their parent node.
///
/// This is the only way tree building strategies create nodes.
#[async_trait]
pub trait Reduce: Send + Sync {
    /// `children` must not be empty, and is in content order.
    async fn reduce(&self, children: Vec<NodeDescriptor>) -> Result<NodeDescriptor, Error>;
}

/// Builds and persists the intermediate nodes of a single file.
pub struct FileReducer {
    block_service: Arc<dyn BlockService>,
    file: FileMetadata,
    address_config: AddressConfig,
    only_hash: bool,
    reduce_single_leaf_to_self: bool,
}

impl FileReducer {
    pub fn new(
        block_service: Arc<dyn BlockService>,
        file: FileMetadata,
        address_config: AddressConfig,
        only_hash: bool,
        reduce_single_leaf_to_self: bool,
    ) -> Self {
        Self {
            block_service,
            file,
            address_config,
            only_hash,
            reduce_single_leaf_to_self,
        }
    }

    /// Uses the only leaf of a file as its root.
    ///
    /// A bare leaf can't carry a modification time or mode, so if the file
    /// has one of those, the leaf contents are reframed (and re-addressed).
    #[instrument(level = "trace", skip_all, fields(leaf.cid = %leaf.cid), err)]
    async fn reduce_single_leaf(&self, leaf: NodeDescriptor) -> Result<NodeDescriptor, Error> {
        let needs_metadata = self.file.mtime.is_some() || self.file.mode.is_some();

        if !(leaf.is_raw() && needs_metadata) {
            debug!(cid = %leaf.cid, "promoting single leaf to file root");
            return Ok(NodeDescriptor {
                path: self.file.path.clone(),
                single: false,
                content: None,
                ..leaf
            });
        }

        let content = match leaf.content {
            Some(content) => content,
            None => {
                let content = self
                    .block_service
                    .get(&leaf.cid)
                    .await?
                    .ok_or_else(|| Error::Store(format!("leaf block {} not found", leaf.cid)))?;

                let hasher = HashAlgorithm::from_code(leaf.cid.hash().code())?;
                if AddressConfig::raw(hasher).address(&content)? != leaf.cid {
                    return Err(Error::Store(format!(
                        "leaf block {} doesn't match its address",
                        leaf.cid
                    )));
                }
                content
            }
        };

        let unixfs = UnixFs::new(DataType::File)
            .with_data(content)
            .with_metadata(self.file.mtime, self.file.mode);
        let block = PbNode {
            links: vec![],
            data: Some(unixfs.marshal()),
        }
        .encode_canonical();
        let size = block.len() as u64;

        let cid = persist(
            self.block_service.as_ref(),
            block,
            &self.address_config,
            self.only_hash,
        )
        .await?;

        debug!(old_cid = %leaf.cid, %cid, "reframed single raw leaf to carry file metadata");

        Ok(NodeDescriptor {
            cid,
            path: self.file.path.clone(),
            unixfs: Some(unixfs),
            size,
            single: false,
            content: None,
        })
    }
}

/// Returns the number of content bytes `child` contributes to its parent,
/// or None if it doesn't contribute anything and must not be linked.
fn logical_contribution(child: &NodeDescriptor) -> Result<Option<u64>, Error> {
    match (&child.unixfs, child.is_raw()) {
        (None, true) => Ok((child.size > 0).then_some(child.size)),
        (Some(unixfs), false) => {
            if unixfs.has_data() {
                Ok(Some(unixfs.data.as_ref().map_or(0, Bytes::len) as u64))
            } else if unixfs.data.is_none() {
                let file_size = unixfs.file_size();
                Ok((file_size > 0).then_some(file_size))
            } else {
                Ok(None)
            }
        }
        (Some(_), true) => Err(Error::Accounting(format!(
            "raw block {} carries file metadata",
            child.cid
        ))),
        (None, false) => Err(Error::Accounting(format!(
            "framed block {} has no file metadata",
            child.cid
        ))),
    }
}

#[async_trait]
impl Reduce for FileReducer {
    #[instrument(skip_all, fields(children = children.len(), file.path = ?self.file.path), ret(level = Level::TRACE), err)]
    async fn reduce(&self, mut children: Vec<NodeDescriptor>) -> Result<NodeDescriptor, Error> {
        if children.is_empty() {
            return Err(Error::Accounting("nothing to reduce".to_string()));
        }

        if self.reduce_single_leaf_to_self && children.len() == 1 && children[0].single {
            if let Some(leaf) = children.pop() {
                return self.reduce_single_leaf(leaf).await;
            }
        }

        let mut unixfs =
            UnixFs::new(DataType::File).with_metadata(self.file.mtime, self.file.mode);
        let mut links = Vec::with_capacity(children.len());
        let mut children_size: u64 = 0;

        for child in &children {
            let Some(contribution) = logical_contribution(child)? else {
                trace!(cid = %child.cid, "dropping child without content");
                continue;
            };

            unixfs.add_block_size(contribution);
            links.push(PbLink {
                hash: Some(child.cid.to_bytes().into()),
                name: Some(String::new()),
                tsize: Some(child.size),
            });
            children_size = children_size.checked_add(child.size).ok_or_else(|| {
                Error::Accounting("sum of children sizes overflows".to_string())
            })?;
        }

        // Block sizes must sum to a representable file size.
        if unixfs
            .block_sizes
            .iter()
            .try_fold(0u64, |acc, s| acc.checked_add(*s))
            .is_none()
        {
            return Err(Error::Accounting(
                "sum of block sizes overflows".to_string(),
            ));
        }

        let block = PbNode {
            links,
            data: Some(unixfs.marshal()),
        }
        .encode_canonical();
        let size = children_size
            .checked_add(block.len() as u64)
            .ok_or_else(|| Error::Accounting("node size overflows".to_string()))?;

        let cid = persist(
            self.block_service.as_ref(),
            block,
            &self.address_config,
            self.only_hash,
        )
        .await?;

        Ok(NodeDescriptor {
            cid,
            path: self.file.path.clone(),
            unixfs: Some(unixfs),
            size,
            single: false,
            content: None,
        })
    }
}
