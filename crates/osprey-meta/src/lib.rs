//! Configuration and check vocabulary for the Osprey validation worker
//!
//! A single [`OspreyConfig`] is loaded once at startup and handed to every
//! component by reference. [`CheckName`] is the shared vocabulary between
//! the project's enabled-check list in the ledger and the file pipeline.

pub mod checks;
pub mod config;
pub mod error;
pub mod loader;
pub mod validation;

pub use checks::{CheckName, CheckSet};
pub use config::{
    ChecksConfig, LayoutConfig, LedgerConfig, OspreyConfig, PreviewConfig, ProjectConfig,
    RuntimeConfig, SequenceSpec, ToolsConfig,
};
pub use error::{Error, Result};
pub use loader::ConfigLoader;
pub use validation::validate;
