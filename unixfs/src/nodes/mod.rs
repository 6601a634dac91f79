//! This holds types describing nodes of a file DAG.
mod descriptor;
mod unixfs;

pub use descriptor::NodeDescriptor;
pub use unixfs::{Mtime, UnixFs, DEFAULT_FILE_MODE};
