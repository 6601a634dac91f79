use std::sync::Arc;

use super::leaves::BufferImporter;
use super::strategy::{Strategy, TreeOptions};
use crate::address::{AddressConfig, CidVersion, HashAlgorithm};
use crate::proto::DataType;
use crate::Error;

/// Which metadata type framed leaves are declared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeafType {
    #[default]
    File,
    Raw,
}

impl From<LeafType> for DataType {
    fn from(value: LeafType) -> Self {
        match value {
            LeafType::File => DataType::File,
            LeafType::Raw => DataType::Raw,
        }
    }
}

/// Receives the number of bytes of each chunk read, and the path of the
/// file it belongs to.
#[derive(Clone)]
pub struct ProgressFn(Arc<dyn Fn(u64, Option<&str>) + Send + Sync>);

impl ProgressFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(u64, Option<&str>) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn report(&self, bytes: u64, path: Option<&str>) {
        (self.0)(bytes, path)
    }
}

impl std::fmt::Debug for ProgressFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ProgressFn")
    }
}

fn default_reduce_single_leaf_to_self() -> bool {
    true
}

fn default_block_write_concurrency() -> usize {
    10
}

fn default_max_children_per_node() -> usize {
    174
}

fn default_layer_repeat() -> usize {
    4
}

/// Options controlling how a file is turned into a DAG.
///
/// They can be deserialized (every field is optional), for example from an
/// URL query string with [ImportOptions::from_query]. `progress` and
/// `buffer_importer` can only be set programmatically.
#[derive(Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportOptions {
    #[serde(default)]
    pub strategy: Strategy,

    /// Store leaves as bare blocks, without any framing.
    #[serde(default)]
    pub raw_leaves: bool,

    /// Use the only leaf of a single-chunk file as the file root.
    #[serde(default = "default_reduce_single_leaf_to_self")]
    pub reduce_single_leaf_to_self: bool,

    /// How many leaves are built concurrently.
    #[serde(default = "default_block_write_concurrency")]
    pub block_write_concurrency: usize,

    #[serde(default)]
    pub hasher: HashAlgorithm,

    /// The cid version of framed nodes. Bare leaves always use version 1.
    #[serde(default)]
    pub cid_version: CidVersion,

    /// Compute addresses without writing anything to the block service.
    #[serde(default)]
    pub only_hash: bool,

    #[serde(default)]
    pub leaf_type: LeafType,

    #[serde(default = "default_max_children_per_node")]
    pub max_children_per_node: usize,

    /// Number of subtrees of the same depth the trickle strategy adds to a
    /// node before going one level deeper.
    #[serde(default = "default_layer_repeat")]
    pub layer_repeat: usize,

    #[serde(skip)]
    pub progress: Option<ProgressFn>,

    /// Replaces the way leaves are built from chunks.
    #[serde(skip)]
    pub buffer_importer: Option<Arc<dyn BufferImporter>>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            raw_leaves: false,
            reduce_single_leaf_to_self: default_reduce_single_leaf_to_self(),
            block_write_concurrency: default_block_write_concurrency(),
            hasher: HashAlgorithm::default(),
            cid_version: CidVersion::default(),
            only_hash: false,
            leaf_type: LeafType::default(),
            max_children_per_node: default_max_children_per_node(),
            layer_repeat: default_layer_repeat(),
            progress: None,
            buffer_importer: None,
        }
    }
}

impl std::fmt::Debug for ImportOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportOptions")
            .field("strategy", &self.strategy)
            .field("raw_leaves", &self.raw_leaves)
            .field(
                "reduce_single_leaf_to_self",
                &self.reduce_single_leaf_to_self,
            )
            .field("block_write_concurrency", &self.block_write_concurrency)
            .field("hasher", &self.hasher)
            .field("cid_version", &self.cid_version)
            .field("only_hash", &self.only_hash)
            .field("leaf_type", &self.leaf_type)
            .field("max_children_per_node", &self.max_children_per_node)
            .field("layer_repeat", &self.layer_repeat)
            .field("progress", &self.progress)
            .field("buffer_importer", &self.buffer_importer.is_some())
            .finish()
    }
}

impl ImportOptions {
    /// Parses options from an URL query string, like
    /// `strategy=trickle&raw_leaves=true&cid_version=1`.
    pub fn from_query(query: &str) -> Result<Self, Error> {
        let options: ImportOptions = serde_qs::from_str(query)
            .map_err(|e| Error::Config(format!("failed to parse import options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_url(url: &url::Url) -> Result<Self, Error> {
        Self::from_query(url.query().unwrap_or_default())
    }

    /// The addressing parameters of framed nodes.
    pub fn framed_address_config(&self) -> AddressConfig {
        AddressConfig::framed(self.hasher, self.cid_version)
    }

    /// The fan-out parameters handed to the tree building strategy.
    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            max_children_per_node: self.max_children_per_node,
            layer_repeat: self.layer_repeat,
        }
    }

    /// Checks the options describe something that can be built.
    pub fn validate(&self) -> Result<(), Error> {
        if self.block_write_concurrency == 0 {
            return Err(Error::Config(
                "block_write_concurrency must be at least 1".to_string(),
            ));
        }
        self.tree_options().validate()?;

        self.framed_address_config().validate()?;
        AddressConfig::raw(self.hasher).validate()
    }
}
