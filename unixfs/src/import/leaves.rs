use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{FutureExt, Stream, StreamExt};
use std::io;
use std::sync::Arc;
use tracing::instrument;

use super::{FileMetadata, LeafType, ProgressFn};
use crate::address::{AddressConfig, CidVersion, HashAlgorithm};
use crate::blockservice::BlockService;
use crate::nodes::{NodeDescriptor, UnixFs};
use crate::persist::persist;
use crate::proto::PbNode;
use crate::Error;

/// Everything a [BufferImporter] needs to know about the file a chunk
/// belongs to, and how leaves should be built.
#[derive(Clone)]
pub struct LeafContext {
    pub block_service: Arc<dyn BlockService>,
    pub file: FileMetadata,
    pub raw_leaves: bool,
    pub leaf_type: LeafType,
    pub hasher: HashAlgorithm,
    pub cid_version: CidVersion,
    pub only_hash: bool,
    pub progress: Option<ProgressFn>,
}

impl LeafContext {
    /// The addressing parameters of framed leaves.
    pub fn framed_address_config(&self) -> AddressConfig {
        AddressConfig::framed(self.hasher, self.cid_version)
    }
}

/// Turns one chunk of a file into a persisted leaf.
#[async_trait]
pub trait BufferImporter: Send + Sync {
    async fn import_buffer(&self, chunk: Bytes, ctx: &LeafContext)
        -> Result<NodeDescriptor, Error>;
}

/// Stores chunks either as bare blocks, or framed with file metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBufferImporter;

#[async_trait]
impl BufferImporter for DefaultBufferImporter {
    #[instrument(level = "trace", skip_all, fields(chunk.len = chunk.len(), raw_leaves = ctx.raw_leaves), err)]
    async fn import_buffer(
        &self,
        chunk: Bytes,
        ctx: &LeafContext,
    ) -> Result<NodeDescriptor, Error> {
        if let Some(progress) = &ctx.progress {
            progress.report(chunk.len() as u64, ctx.file.path.as_deref());
        }

        if ctx.raw_leaves {
            // Bare leaves are always addressed with cid version 1.
            let size = chunk.len() as u64;
            let cid = persist(
                ctx.block_service.as_ref(),
                chunk.clone(),
                &AddressConfig::raw(ctx.hasher),
                ctx.only_hash,
            )
            .await?;

            return Ok(NodeDescriptor::new(cid, None, size).with_content(chunk));
        }

        let unixfs = UnixFs::new(ctx.leaf_type.into())
            .with_data(chunk)
            .with_metadata(ctx.file.mtime, ctx.file.mode);
        let block = PbNode {
            links: vec![],
            data: Some(unixfs.marshal()),
        }
        .encode_canonical();
        let size = block.len() as u64;

        let cid = persist(
            ctx.block_service.as_ref(),
            block,
            &ctx.framed_address_config(),
            ctx.only_hash,
        )
        .await?;

        Ok(NodeDescriptor::new(cid, Some(unixfs), size))
    }
}

/// Maps every chunk of `chunks` to a task building its leaf.
///
/// Nothing happens until a task is polled, so the caller decides how many
/// run at once.
pub fn leaf_tasks<S>(
    chunks: S,
    importer: Arc<dyn BufferImporter>,
    ctx: Arc<LeafContext>,
) -> impl Stream<Item = BoxFuture<'static, Result<NodeDescriptor, Error>>> + Send
where
    S: Stream<Item = io::Result<Bytes>> + Send + 'static,
{
    chunks.map(move |chunk| {
        let importer = importer.clone();
        let ctx = ctx.clone();
        async move {
            let chunk =
                chunk.map_err(|e| Error::Encoding(format!("failed to read chunk: {}", e)))?;
            importer.import_buffer(chunk, &ctx).await
        }
        .boxed()
    })
}
