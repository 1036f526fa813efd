//! Filesystem layer for the Osprey validation worker
//!
//! Provides content digests, format-agnostic config loading, delivery-tree
//! walking, free-space probes and per-task scratch directories.

pub mod checksum;
pub mod config;
pub mod error;
pub mod path;
pub mod scratch;
pub mod space;
pub mod walk;

pub use checksum::{DigestAlgorithm, compute_content_digest, compute_file_digest};
pub use config::ConfigStore;
pub use error::{Error, Result};
pub use path::{extension_lower, file_name, file_stem, find_disallowed};
pub use scratch::ScratchDir;
pub use space::{available_space, free_ratio};
pub use walk::walk_files;
