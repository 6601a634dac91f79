//! Tree shapes a file DAG can be built in.
//!
//! A strategy only decides which nodes get grouped under a common parent.
//! Building (and persisting) the parent is always left to a [Reduce]
//! implementation.
use futures::stream::BoxStream;
use std::str::FromStr;
use tracing::{instrument, Level};

use super::reduce::Reduce;
use crate::nodes::NodeDescriptor;
use crate::Error;

mod balanced;
mod flat;
mod trickle;

/// Fan-out parameters handed to a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeOptions {
    pub max_children_per_node: usize,
    pub layer_repeat: usize,
}

impl TreeOptions {
    /// Checks every strategy can make progress with these parameters.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_children_per_node < 2 {
            return Err(Error::Config(format!(
                "max_children_per_node must be at least 2, got {}",
                self.max_children_per_node
            )));
        }
        if self.layer_repeat == 0 {
            return Err(Error::Config("layer_repeat must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Deserialize)]
#[serde(try_from = "String")]
pub enum Strategy {
    /// All leaves are direct children of the root.
    Flat,
    /// Leaves are grouped into a balanced tree of bounded fan-out.
    #[default]
    Balanced,
    /// Leaves are grouped into a tree favouring sequential reads.
    Trickle,
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(Strategy::Flat),
            "balanced" => Ok(Strategy::Balanced),
            "trickle" => Ok(Strategy::Trickle),
            other => Err(Error::UnknownStrategy(other.to_string())),
        }
    }
}

impl TryFrom<String> for Strategy {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Flat => write!(f, "flat"),
            Strategy::Balanced => write!(f, "balanced"),
            Strategy::Trickle => write!(f, "trickle"),
        }
    }
}

impl Strategy {
    /// Consumes the (ordered) leaves, repeatedly asking the reducer to build
    /// parents, until a single root remains.
    ///
    /// Leaves are consumed lazily and in order. Fails if `options` are out
    /// of bounds, if the stream yields an error, or yields no leaves at all.
    #[instrument(skip_all, fields(strategy = %self), ret(level = Level::TRACE), err)]
    pub async fn build_tree<R>(
        &self,
        leaves: BoxStream<'_, Result<NodeDescriptor, Error>>,
        reducer: &R,
        options: &TreeOptions,
    ) -> Result<NodeDescriptor, Error>
    where
        R: Reduce + ?Sized,
    {
        options.validate()?;

        match self {
            Strategy::Flat => flat::build(leaves, reducer).await,
            Strategy::Balanced => {
                balanced::build(leaves, reducer, options.max_children_per_node).await
            }
            Strategy::Trickle => trickle::build(leaves, reducer, options).await,
        }
    }
}

fn no_leaves() -> Error {
    Error::Accounting("no leaves to build a tree from".to_string())
}
