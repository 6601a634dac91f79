use bytes::Bytes;
use cid::Cid;

use super::UnixFs;
use crate::address::RAW_CODEC;

/// Describes a node that has been built (and persisted, unless hashing
/// only) while importing a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    /// The address of the serialized block.
    pub cid: Cid,

    /// The logical path of the file this node belongs to.
    pub path: Option<String>,

    /// File metadata of framed nodes. Bare leaves have none.
    pub unixfs: Option<UnixFs>,

    /// The serialized size of this node plus the serialized sizes of all
    /// blocks below it. This is not the logical length of the content.
    pub size: u64,

    /// Set by the leaf batcher on a leaf that turned out to be the only one
    /// of its file.
    pub single: bool,

    /// Contents of a bare leaf, kept so a single leaf can be reframed
    /// without reading it back from the block store.
    pub(crate) content: Option<Bytes>,
}

impl NodeDescriptor {
    pub fn new(cid: Cid, unixfs: Option<UnixFs>, size: u64) -> Self {
        Self {
            cid,
            path: None,
            unixfs,
            size,
            single: false,
            content: None,
        }
    }

    pub(crate) fn with_content(self, content: Bytes) -> Self {
        Self {
            content: Some(content),
            ..self
        }
    }

    /// Whether this is a bare leaf, holding uninterpreted bytes.
    pub fn is_raw(&self) -> bool {
        self.cid.codec() == RAW_CODEC
    }
}
