//! The main library function here is [build_file], turning a stream of
//! chunks into a DAG of content-addressed blocks, and returning the
//! descriptor of its root.
//!
//! Building happens in three stages:
//! - every chunk is turned into a leaf by a [BufferImporter],
//! - leaves are built concurrently, but handed on in chunk order,
//! - a [Strategy] groups them into a tree, asking a [Reduce] implementation
//!   to build every parent node.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::io;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::blockservice::BlockService;
use crate::nodes::{Mtime, NodeDescriptor};
use crate::Error;

mod batch;
mod leaves;
mod options;
mod reduce;
mod strategy;

pub use batch::batch_leaves;
pub use leaves::{leaf_tasks, BufferImporter, DefaultBufferImporter, LeafContext};
pub use options::{ImportOptions, LeafType, ProgressFn};
pub use reduce::{FileReducer, Reduce};
pub use strategy::{Strategy, TreeOptions};

/// The properties of a file that end up in its metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMetadata {
    pub path: Option<String>,
    pub mtime: Option<Mtime>,
    pub mode: Option<u32>,
}

/// A file to import. `content` yields its chunks, in order.
pub struct File<S> {
    pub path: Option<String>,
    pub mtime: Option<Mtime>,
    pub mode: Option<u32>,
    pub content: S,
}

impl<S> File<S> {
    pub fn new(content: S) -> Self {
        Self {
            path: None,
            mtime: None,
            mode: None,
            content,
        }
    }

    pub fn with_path(self, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..self
        }
    }

    pub fn with_metadata(self, mtime: Option<Mtime>, mode: Option<u32>) -> Self {
        Self {
            mtime,
            mode,
            ..self
        }
    }
}

/// Imports a file into the passed [BlockService] (or only computes its
/// addresses, if [ImportOptions::only_hash] is set).
///
/// On success, returns the descriptor of the file root. On error, blocks
/// written so far are left in the block service.
#[instrument(skip_all, fields(file.path = ?file.path, strategy = %options.strategy), err)]
pub async fn build_file<BS, S>(
    file: File<S>,
    block_service: BS,
    options: &ImportOptions,
) -> Result<NodeDescriptor, Error>
where
    BS: BlockService + 'static,
    S: Stream<Item = io::Result<Bytes>> + Send + 'static,
{
    options.validate()?;

    let block_service: Arc<dyn BlockService> = Arc::new(block_service);
    let metadata = FileMetadata {
        path: file.path,
        mtime: file.mtime,
        mode: file.mode,
    };

    let ctx = Arc::new(LeafContext {
        block_service: block_service.clone(),
        file: metadata.clone(),
        raw_leaves: options.raw_leaves,
        leaf_type: options.leaf_type,
        hasher: options.hasher,
        cid_version: options.cid_version,
        only_hash: options.only_hash,
        progress: options.progress.clone(),
    });
    let importer: Arc<dyn BufferImporter> = match &options.buffer_importer {
        Some(importer) => importer.clone(),
        None => Arc::new(DefaultBufferImporter),
    };

    let leaves = batch_leaves(
        leaf_tasks(non_empty(file.content), importer, ctx),
        options.block_write_concurrency,
    );

    let reducer = FileReducer::new(
        block_service,
        metadata,
        options.framed_address_config(),
        options.only_hash,
        options.reduce_single_leaf_to_self,
    );
    let root = options
        .strategy
        .build_tree(leaves, &reducer, &options.tree_options())
        .await?;

    debug!(cid = %root.cid, size = root.size, "imported file");

    Ok(root)
}

/// Yields a single empty chunk if `chunks` doesn't yield anything, so every
/// file has at least one leaf.
fn non_empty<S>(chunks: S) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static
where
    S: Stream<Item = io::Result<Bytes>> + Send + 'static,
{
    async_stream::stream! {
        let mut chunks = Box::pin(chunks);
        let mut empty = true;

        while let Some(chunk) = chunks.next().await {
            empty = false;
            yield chunk;
        }

        if empty {
            yield Ok(Bytes::new());
        }
    }
}
