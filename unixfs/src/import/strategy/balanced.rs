use futures::stream::BoxStream;
use futures::TryStreamExt;
use tracing::trace;

use super::no_leaves;
use crate::import::reduce::Reduce;
use crate::nodes::NodeDescriptor;
use crate::Error;

/// Groups consecutive runs of `max_children` leaves under a parent, then
/// does the same with the parents, until a single root is left.
pub(super) async fn build<R>(
    mut leaves: BoxStream<'_, Result<NodeDescriptor, Error>>,
    reducer: &R,
    max_children: usize,
) -> Result<NodeDescriptor, Error>
where
    R: Reduce + ?Sized,
{
    let mut parents = Vec::new();
    let mut batch = Vec::with_capacity(max_children);

    while let Some(leaf) = leaves.try_next().await? {
        batch.push(leaf);
        if batch.len() == max_children {
            parents.push(reducer.reduce(std::mem::take(&mut batch)).await?);
        }
    }
    if !batch.is_empty() {
        parents.push(reducer.reduce(batch).await?);
    }

    let mut depth = 1;
    while parents.len() > 1 {
        trace!(depth, nodes = parents.len(), "reducing layer");

        let mut next = Vec::with_capacity(parents.len().div_ceil(max_children));
        let mut parents_iter = parents.into_iter().peekable();
        while parents_iter.peek().is_some() {
            let group: Vec<NodeDescriptor> = parents_iter.by_ref().take(max_children).collect();
            next.push(reducer.reduce(group).await?);
        }

        parents = next;
        depth += 1;
    }

    parents.pop().ok_or_else(no_leaves)
}
