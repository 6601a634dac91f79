use thiserror::Error;

/// Errors emitted while turning file contents into a DAG of blocks.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// Unsupported addressing parameters or invalid import options.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown tree building strategy: {0}")]
    UnknownStrategy(String),

    /// The block store could not be reached, or rejected a read or write.
    #[error("storage error: {0}")]
    Store(String),

    /// A chunk or a piece of node metadata could not be (de)serialized.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A child descriptor handed to the reducer is inconsistent.
    /// This always indicates a bug in the caller or in a strategy.
    #[error("accounting error: {0}")]
    Accounting(String),
}

impl From<sled::Error> for Error {
    fn from(value: sled::Error) -> Self {
        Error::Store(value.to_string())
    }
}

impl From<prost::DecodeError> for Error {
    fn from(value: prost::DecodeError) -> Self {
        Error::Encoding(value.to_string())
    }
}

impl From<cid::Error> for Error {
    fn from(value: cid::Error) -> Self {
        Error::Config(value.to_string())
    }
}

impl From<multihash::Error> for Error {
    fn from(value: multihash::Error) -> Self {
        Error::Config(value.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        if value.kind() == std::io::ErrorKind::InvalidInput {
            Error::Config(value.to_string())
        } else {
            Error::Store(value.to_string())
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::Config(msg) | Error::UnknownStrategy(msg) => {
                Self::new(std::io::ErrorKind::InvalidInput, msg)
            }
            Error::Encoding(msg) => Self::new(std::io::ErrorKind::InvalidData, msg),
            Error::Store(msg) | Error::Accounting(msg) => {
                Self::new(std::io::ErrorKind::Other, msg)
            }
        }
    }
}
