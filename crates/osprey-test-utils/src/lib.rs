//! Shared test utilities for the Osprey workspace.
//!
//! Dev-dependency only, never published.
//!
//! - [`ledger`]: [`MemoryLedger`], an in-memory ledger service with failure injection
//! - [`tools`]: [`FakeTools`], scripted stand-ins for the external programs
//! - [`fixtures`]: delivery-folder trees and matching configurations

pub mod fixtures;
pub mod ledger;
pub mod tools;

pub use fixtures::{DeliveryFolder, TestWorkspace};
pub use ledger::{MemoryFile, MemoryFolder, MemoryLedger};
pub use tools::FakeTools;
