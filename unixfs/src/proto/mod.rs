//! Protobuf messages of the block format.
//!
//! [PbNode] and [PbLink] describe a single block in the DAG. [Data] is the
//! file metadata carried inside [PbNode::data].
//!
//! The messages are declared with the prost derive macros directly, there's
//! no .proto compilation step.
use bytes::{Bytes, BytesMut};
use prost::Message;

/// A link from one node to a child block.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct PbLink {
    /// The binary representation of the child's address.
    #[prost(bytes = "bytes", optional, tag = "1")]
    pub hash: Option<Bytes>,
    #[prost(string, optional, tag = "2")]
    pub name: Option<String>,
    /// The total serialized size of the child's subtree.
    #[prost(uint64, optional, tag = "3")]
    pub tsize: Option<u64>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct PbNode {
    #[prost(message, repeated, tag = "2")]
    pub links: Vec<PbLink>,
    #[prost(bytes = "bytes", optional, tag = "1")]
    pub data: Option<Bytes>,
}

impl PbNode {
    /// Serializes the node in its canonical form.
    ///
    /// Links (field 2) are emitted before data (field 1), and in the order
    /// they appear in [PbNode::links]. prost itself would emit fields in tag
    /// order, which is why this is done by hand.
    pub fn encode_canonical(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        for link in &self.links {
            prost::encoding::message::encode(2, link, &mut buf);
        }
        if let Some(data) = &self.data {
            prost::encoding::bytes::encode(1, data, &mut buf);
        }
        buf.freeze()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum DataType {
    Raw = 0,
    Directory = 1,
    File = 2,
    Metadata = 3,
    Symlink = 4,
    HamtShard = 5,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Data {
    #[prost(enumeration = "DataType", required, tag = "1")]
    pub r#type: i32,
    #[prost(bytes = "bytes", optional, tag = "2")]
    pub data: Option<Bytes>,
    #[prost(uint64, optional, tag = "3")]
    pub filesize: Option<u64>,
    #[prost(uint64, repeated, packed = "false", tag = "4")]
    pub blocksizes: Vec<u64>,
    #[prost(uint64, optional, tag = "5")]
    pub hash_type: Option<u64>,
    #[prost(uint64, optional, tag = "6")]
    pub fanout: Option<u64>,
    #[prost(uint32, optional, tag = "7")]
    pub mode: Option<u32>,
    #[prost(message, optional, tag = "8")]
    pub mtime: Option<UnixTime>,
}

#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct UnixTime {
    #[prost(int64, required, tag = "1")]
    pub seconds: i64,
    #[prost(fixed32, optional, tag = "2")]
    pub fractional_nanoseconds: Option<u32>,
}
