mod errors;

#[cfg(test)]
use rstest_reuse;

pub mod address;
pub mod blockservice;
pub mod fixtures;
pub mod import;
pub mod nodes;
pub mod persist;
pub mod proto;

pub use errors::Error;
pub use import::{build_file, File, ImportOptions};
pub use nodes::NodeDescriptor;

#[cfg(test)]
mod tests;
