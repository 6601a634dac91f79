use bytes::Bytes;
use prost::Message;

use crate::proto::{self, DataType};
use crate::Error;

/// The default permission bits of a file, omitted when serializing.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// A modification time, in seconds (and optional nanoseconds) since the
/// unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mtime {
    secs: i64,
    nsecs: Option<u32>,
}

impl Mtime {
    pub fn new(secs: i64, nsecs: Option<u32>) -> Result<Self, Error> {
        if let Some(nsecs) = nsecs {
            if nsecs >= 1_000_000_000 {
                return Err(Error::Encoding(format!(
                    "fractional nanoseconds out of range: {}",
                    nsecs
                )));
            }
        }

        Ok(Self { secs, nsecs })
    }

    pub fn from_secs(secs: i64) -> Self {
        Self { secs, nsecs: None }
    }

    pub fn secs(&self) -> i64 {
        self.secs
    }

    pub fn nsecs(&self) -> Option<u32> {
        self.nsecs
    }
}

impl From<Mtime> for proto::UnixTime {
    fn from(value: Mtime) -> Self {
        proto::UnixTime {
            seconds: value.secs,
            fractional_nanoseconds: value.nsecs,
        }
    }
}

impl TryFrom<proto::UnixTime> for Mtime {
    type Error = Error;

    fn try_from(value: proto::UnixTime) -> Result<Self, Self::Error> {
        Mtime::new(value.seconds, value.fractional_nanoseconds)
    }
}

/// File metadata carried by framed nodes.
///
/// Leaves carry their content inline in [UnixFs::data], intermediate nodes
/// carry the logical length of each of their children in
/// [UnixFs::block_sizes].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnixFs {
    pub kind: DataType,
    pub data: Option<Bytes>,
    pub block_sizes: Vec<u64>,
    pub mtime: Option<Mtime>,
    pub mode: Option<u32>,
}

impl UnixFs {
    pub fn new(kind: DataType) -> Self {
        Self {
            kind,
            data: None,
            block_sizes: vec![],
            mtime: None,
            mode: None,
        }
    }

    pub fn with_data(self, data: Bytes) -> Self {
        Self {
            data: Some(data),
            ..self
        }
    }

    pub fn with_metadata(self, mtime: Option<Mtime>, mode: Option<u32>) -> Self {
        Self {
            mtime,
            mode: mode.map(|m| m & 0o7777),
            ..self
        }
    }

    /// Whether inline content is present (and not empty).
    pub fn has_data(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_empty())
    }

    /// The logical length of the content described by this node: inline
    /// data plus the sum of all children's block sizes.
    pub fn file_size(&self) -> u64 {
        if self.kind == DataType::Directory || self.kind == DataType::HamtShard {
            return 0;
        }

        let data_len = self.data.as_ref().map_or(0, |d| d.len() as u64);
        self.block_sizes
            .iter()
            .fold(data_len, |acc, size| acc.saturating_add(*size))
    }

    pub fn add_block_size(&mut self, size: u64) {
        self.block_sizes.push(size);
    }

    /// Serializes the metadata into the [proto::Data] wire format.
    pub fn marshal(&self) -> Bytes {
        let filesize = match self.kind {
            DataType::Directory | DataType::HamtShard => None,
            _ => Some(self.file_size()),
        };

        let data = proto::Data {
            r#type: self.kind.into(),
            data: self.data.clone().filter(|d| !d.is_empty()),
            filesize,
            blocksizes: self.block_sizes.clone(),
            hash_type: None,
            fanout: None,
            mode: self
                .mode
                .map(|m| m & 0o7777)
                .filter(|m| *m != DEFAULT_FILE_MODE),
            mtime: self.mtime.map(Into::into),
        };

        data.encode_to_vec().into()
    }

    /// Parses metadata previously produced by [UnixFs::marshal].
    pub fn unmarshal(buf: &[u8]) -> Result<Self, Error> {
        let data = proto::Data::decode(buf)?;

        let kind = DataType::try_from(data.r#type)
            .map_err(|e| Error::Encoding(format!("invalid data type: {}", e)))?;

        Ok(Self {
            kind,
            data: data.data,
            block_sizes: data.blocksizes,
            mtime: data.mtime.map(Mtime::try_from).transpose()?,
            mode: data.mode,
        })
    }
}
