use bytes::Bytes;
use cid::Cid;
use tracing::{instrument, trace};

use crate::address::AddressConfig;
use crate::blockservice::BlockService;
use crate::Error;

/// Computes the address of `data` and makes sure the block service holds it.
///
/// Blocks already present are not written again. If `only_hash` is set, the
/// block service is not touched at all.
#[instrument(level = "trace", skip_all, fields(block.size = data.len(), codec = ?config.codec), ret(Display), err)]
pub async fn persist<BS>(
    block_service: &BS,
    data: Bytes,
    config: &AddressConfig,
    only_hash: bool,
) -> Result<Cid, Error>
where
    BS: BlockService + ?Sized,
{
    let cid = config.address(&data)?;

    if only_hash {
        return Ok(cid);
    }

    if block_service.has(&cid).await? {
        trace!(block.cid = %cid, "block already present, skipping write");
        return Ok(cid);
    }

    block_service.put(&cid, data).await?;

    Ok(cid)
}
