use futures::stream::BoxStream;
use futures::TryStreamExt;

use super::no_leaves;
use crate::import::reduce::Reduce;
use crate::nodes::NodeDescriptor;
use crate::Error;

/// Every leaf becomes a direct child of the root.
pub(super) async fn build<R>(
    leaves: BoxStream<'_, Result<NodeDescriptor, Error>>,
    reducer: &R,
) -> Result<NodeDescriptor, Error>
where
    R: Reduce + ?Sized,
{
    let children: Vec<NodeDescriptor> = leaves.try_collect().await?;
    if children.is_empty() {
        return Err(no_leaves());
    }

    reducer.reduce(children).await
}
