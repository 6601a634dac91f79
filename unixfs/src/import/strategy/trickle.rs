use futures::future::BoxFuture;
use futures::stream::{BoxStream, Peekable};
use futures::{FutureExt, StreamExt, TryStreamExt};
use std::pin::Pin;

use super::{no_leaves, TreeOptions};
use crate::import::reduce::Reduce;
use crate::nodes::NodeDescriptor;
use crate::Error;

/// Builds a trickle DAG.
///
/// Every node first takes up to `max_children_per_node` leaves as direct
/// children. While leaves remain, it then gets `layer_repeat` subtrees of
/// depth 1, then `layer_repeat` subtrees of depth 2, and so on. A subtree of
/// depth `d` only contains subtrees shallower than `d`.
pub(super) async fn build<R>(
    leaves: BoxStream<'_, Result<NodeDescriptor, Error>>,
    reducer: &R,
    options: &TreeOptions,
) -> Result<NodeDescriptor, Error>
where
    R: Reduce + ?Sized,
{
    let mut builder = TrickleBuilder {
        leaves: leaves.peekable(),
        reducer,
        max_children: options.max_children_per_node,
        layer_repeat: options.layer_repeat,
    };

    if builder.is_done().await {
        return Err(no_leaves());
    }

    builder.fill(None).await
}

struct TrickleBuilder<'s, 'r, R: ?Sized> {
    leaves: Peekable<BoxStream<'s, Result<NodeDescriptor, Error>>>,
    reducer: &'r R,
    max_children: usize,
    layer_repeat: usize,
}

impl<R> TrickleBuilder<'_, '_, R>
where
    R: Reduce + ?Sized,
{
    async fn is_done(&mut self) -> bool {
        Pin::new(&mut self.leaves).peek().await.is_none()
    }

    /// Builds one node, and everything below it, consuming leaves.
    /// `max_depth` of None means unbounded (the root).
    fn fill(&mut self, max_depth: Option<usize>) -> BoxFuture<'_, Result<NodeDescriptor, Error>> {
        async move {
            let mut children = Vec::with_capacity(self.max_children);
            while children.len() < self.max_children {
                match self.leaves.try_next().await? {
                    Some(leaf) => children.push(leaf),
                    None => break,
                }
            }

            let mut depth = 1;
            while max_depth.map_or(true, |max| depth < max) && !self.is_done().await {
                for _ in 0..self.layer_repeat {
                    if self.is_done().await {
                        break;
                    }
                    children.push(self.fill(Some(depth)).await?);
                }
                depth += 1;
            }

            self.reducer.reduce(children).await
        }
        .boxed()
    }
}
