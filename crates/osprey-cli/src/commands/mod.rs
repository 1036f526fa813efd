//! Command implementations

pub mod check_config;
pub mod run;

pub use check_config::run_check_config;
pub use run::{resolve_shard, run_worker};
