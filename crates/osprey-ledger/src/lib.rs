//! Ledger client for Osprey
//!
//! The ledger is the authoritative record of projects, folders, files and
//! per-file check results. Every state mutation the worker makes goes
//! through the [`Ledger`] trait; [`HttpLedger`] speaks the form-encoded
//! HTTP protocol of the ledger service.

pub mod error;
pub mod http;
pub mod types;
pub mod update;
pub mod version;

pub use error::{Error, Result};
pub use http::{HttpConnector, HttpLedger};
pub use types::{CheckResult, Delivery, FileRecord, FolderInfo, FolderSummary, NewFile, NewFolder, ProjectInfo};
pub use update::{FolderFlag, FolderStatus, ManifestScope, Update};
pub use version::check_compatible;

/// One session with the ledger service.
///
/// Implementations are owned by a single worker and never shared across
/// threads; create one per worker via a [`LedgerConnector`].
pub trait Ledger: Send {
    /// Server software version reported by the handshake endpoint.
    fn server_version(&self) -> Result<String>;

    /// Clear stale "under verification" marks left by a previous run.
    fn startup_reset(&self) -> Result<()>;

    /// Project record with enabled checks and known folders.
    fn fetch_project(&self) -> Result<ProjectInfo>;

    /// Create a folder record, returning its id.
    fn create_folder(&self, folder: &NewFolder) -> Result<i64>;

    /// Folder record with its files and QC state.
    fn fetch_folder(&self, folder_id: i64) -> Result<FolderInfo>;

    /// Create a file record, returning its id.
    fn create_file(&self, file: &NewFile) -> Result<i64>;

    /// Record the size of one representation of a file.
    fn create_filesize(&self, file_id: i64, filetype: &str, size: u64) -> Result<()>;

    fn update(&self, update: &Update) -> Result<()>;

    /// Every file registered under the project, across folders.
    fn fetch_project_files(&self) -> Result<Vec<FileRecord>>;
}

/// Opens ledger sessions; shared by all workers.
pub trait LedgerConnector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn Ledger>>;
}
