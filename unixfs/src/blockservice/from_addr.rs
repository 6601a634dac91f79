use std::path::PathBuf;
use url::Url;

use super::{BlockService, MemoryBlockService, SledBlockService};
use crate::Error;

/// Where blocks are kept, as described by an URL.
///
/// - `memory://` keeps blocks in a [MemoryBlockService].
/// - `sled://` keeps blocks in a temporary [SledBlockService].
/// - `sled:///path/to/db` keeps blocks in a [SledBlockService] at that path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockServiceConfig {
    Memory,
    Sled { path: Option<PathBuf> },
}

impl TryFrom<&Url> for BlockServiceConfig {
    type Error = Error;

    fn try_from(url: &Url) -> Result<Self, Self::Error> {
        if url.has_host() {
            return Err(Error::Store(format!("{}: no host allowed", url)));
        }
        if url.query().is_some() {
            return Err(Error::Store(format!("{}: no query allowed", url)));
        }

        match (url.scheme(), url.path()) {
            ("memory", "") => Ok(BlockServiceConfig::Memory),
            ("memory", _) => Err(Error::Store(format!("{}: no path allowed", url))),
            ("sled", "") => Ok(BlockServiceConfig::Sled { path: None }),
            ("sled", "/") => Err(Error::Store(
                "cowardly refusing to open / with sled".to_string(),
            )),
            ("sled", path) => Ok(BlockServiceConfig::Sled {
                path: Some(path.into()),
            }),
            (scheme, _) => Err(Error::Store(format!("unknown scheme: {}", scheme))),
        }
    }
}

impl BlockServiceConfig {
    pub fn build(&self) -> Result<Box<dyn BlockService>, Error> {
        Ok(match self {
            BlockServiceConfig::Memory => Box::<MemoryBlockService>::default(),
            BlockServiceConfig::Sled { path: None } => Box::new(SledBlockService::new_temporary()?),
            BlockServiceConfig::Sled { path: Some(path) } => {
                Box::new(SledBlockService::new(path)?)
            }
        })
    }
}

/// Constructs a new instance of a [BlockService] from an URI, see
/// [BlockServiceConfig] for the supported ones.
pub async fn from_addr(uri: &str) -> Result<Box<dyn BlockService>, Error> {
    let url = Url::parse(uri).map_err(|e| Error::Store(format!("unable to parse url: {}", e)))?;

    BlockServiceConfig::try_from(&url)?.build()
}
