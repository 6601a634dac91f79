use futures::stream::BoxStream;
use futures::{Future, Stream, StreamExt, TryStreamExt};
use tracing::trace;

use crate::nodes::NodeDescriptor;
use crate::Error;

/// Runs up to `concurrency` leaf tasks at once, yielding their results in
/// task order.
///
/// The first leaf is held back until it's known whether a second one
/// exists. If it doesn't, the leaf is yielded with [NodeDescriptor::single]
/// set. Leaf contents are only kept on a single leaf.
///
/// The first failing task ends the stream with its error. Tasks still in
/// flight at that point are dropped.
pub fn batch_leaves<S, F>(
    tasks: S,
    concurrency: usize,
) -> BoxStream<'static, Result<NodeDescriptor, Error>>
where
    S: Stream<Item = F> + Send + 'static,
    F: Future<Output = Result<NodeDescriptor, Error>> + Send + 'static,
{
    let mut results = Box::pin(tasks.buffered(concurrency.max(1)));

    async_stream::try_stream! {
        if let Some(mut first) = results.try_next().await? {
            match results.try_next().await? {
                None => {
                    trace!(cid = %first.cid, "file consists of a single leaf");
                    first.single = true;
                    yield first;
                }
                Some(second) => {
                    yield strip(first);
                    yield strip(second);

                    while let Some(leaf) = results.try_next().await? {
                        yield strip(leaf);
                    }
                }
            }
        }
    }
    .boxed()
}

fn strip(leaf: NodeDescriptor) -> NodeDescriptor {
    NodeDescriptor {
        single: false,
        content: None,
        ..leaf
    }
}
