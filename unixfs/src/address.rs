//! Deriving content addresses from block bytes.
//!
//! A block is addressed by a [Cid], built from a multihash of its bytes, the
//! [Codec] describing how to interpret the bytes and a [CidVersion].
use cid::Cid;
use multihash::Multihash;
use sha2::Digest;

use crate::Error;

/// Multicodec of blocks holding uninterpreted bytes (bare leaves).
pub const RAW_CODEC: u64 = 0x55;

/// Multicodec of protobuf-framed nodes.
pub const DAG_PB_CODEC: u64 = 0x70;

const SHA2_256: u64 = 0x12;
const SHA2_512: u64 = 0x13;
const BLAKE3: u64 = 0x1e;

/// The hash function used to derive the multihash of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Deserialize)]
pub enum HashAlgorithm {
    #[default]
    #[serde(rename = "sha2-256")]
    Sha2_256,
    #[serde(rename = "sha2-512")]
    Sha2_512,
    #[serde(rename = "blake3")]
    Blake3,
}

impl HashAlgorithm {
    /// The multihash code identifying this algorithm.
    pub fn code(&self) -> u64 {
        match self {
            HashAlgorithm::Sha2_256 => SHA2_256,
            HashAlgorithm::Sha2_512 => SHA2_512,
            HashAlgorithm::Blake3 => BLAKE3,
        }
    }

    /// Looks up a hash algorithm by its multihash code.
    pub fn from_code(code: u64) -> Result<Self, Error> {
        match code {
            SHA2_256 => Ok(HashAlgorithm::Sha2_256),
            SHA2_512 => Ok(HashAlgorithm::Sha2_512),
            BLAKE3 => Ok(HashAlgorithm::Blake3),
            code => Err(Error::Config(format!(
                "unsupported hash algorithm: 0x{:x}",
                code
            ))),
        }
    }

    /// Hashes `data`, returning the multihash.
    pub fn digest(&self, data: &[u8]) -> Result<Multihash<64>, Error> {
        let mh = match self {
            HashAlgorithm::Sha2_256 => Multihash::wrap(SHA2_256, &sha2::Sha256::digest(data))?,
            HashAlgorithm::Sha2_512 => Multihash::wrap(SHA2_512, &sha2::Sha512::digest(data))?,
            HashAlgorithm::Blake3 => Multihash::wrap(BLAKE3, blake3::hash(data).as_bytes())?,
        };

        Ok(mh)
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithm::Sha2_256 => write!(f, "sha2-256"),
            HashAlgorithm::Sha2_512 => write!(f, "sha2-512"),
            HashAlgorithm::Blake3 => write!(f, "blake3"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Deserialize)]
#[serde(try_from = "u64")]
pub enum CidVersion {
    #[default]
    V0,
    V1,
}

impl TryFrom<u64> for CidVersion {
    type Error = Error;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CidVersion::V0),
            1 => Ok(CidVersion::V1),
            v => Err(Error::Config(format!("unsupported cid version: {}", v))),
        }
    }
}

/// Describes how the bytes of a block are to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    Raw,
    DagPb,
}

impl Codec {
    pub fn code(&self) -> u64 {
        match self {
            Codec::Raw => RAW_CODEC,
            Codec::DagPb => DAG_PB_CODEC,
        }
    }
}

/// All parameters needed to derive the address of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressConfig {
    pub hasher: HashAlgorithm,
    pub cid_version: CidVersion,
    pub codec: Codec,
}

impl AddressConfig {
    /// Config for framed nodes, using the caller's cid version.
    pub fn framed(hasher: HashAlgorithm, cid_version: CidVersion) -> Self {
        Self {
            hasher,
            cid_version,
            codec: Codec::DagPb,
        }
    }

    /// Config for bare leaves.
    /// Bare leaves are always addressed with CIDv1, as CIDv0 can not carry
    /// the raw codec.
    pub fn raw(hasher: HashAlgorithm) -> Self {
        Self {
            hasher,
            cid_version: CidVersion::V1,
            codec: Codec::Raw,
        }
    }

    /// Checks whether this combination of parameters can produce an address.
    pub fn validate(&self) -> Result<(), Error> {
        if self.cid_version == CidVersion::V0 {
            if self.codec != Codec::DagPb {
                return Err(Error::Config(
                    "cid version 0 only supports the dag-pb codec".to_string(),
                ));
            }
            if self.hasher != HashAlgorithm::Sha2_256 {
                return Err(Error::Config(format!(
                    "cid version 0 only supports sha2-256, not {}",
                    self.hasher
                )));
            }
        }
        Ok(())
    }

    /// Computes the content address of `data`.
    pub fn address(&self, data: &[u8]) -> Result<Cid, Error> {
        self.validate()?;

        let mh = self.hasher.digest(data)?;
        Ok(match self.cid_version {
            CidVersion::V0 => Cid::new_v0(mh)?,
            CidVersion::V1 => Cid::new_v1(self.codec.code(), mh),
        })
    }
}
