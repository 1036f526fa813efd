//! Ledger records as returned by the service

use std::time::SystemTime;

use chrono::{DateTime, Local};
use osprey_meta::CheckSet;
use serde::{Deserialize, Deserializer, Serialize};

/// Outcome code of one check: `0` pass, `1` fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckResult {
    Pass,
    Fail,
}

impl CheckResult {
    pub fn code(self) -> u8 {
        match self {
            Self::Pass => 0,
            Self::Fail => 1,
        }
    }

    pub fn from_pass(pass: bool) -> Self {
        if pass { Self::Pass } else { Self::Fail }
    }

    pub fn is_pass(self) -> bool {
        self == Self::Pass
    }
}

/// Delivery state of a folder, decoded from `delivered_to_dams`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Pending,
    /// Approved and queued for delivery
    Ready,
    Delivered,
}

impl Delivery {
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(0) => Self::Ready,
            Some(1) => Self::Delivered,
            _ => Self::Pending,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Delivered)
    }
}

/// `POST /api/projects/{alias}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub project_id: i64,
    pub project_alias: String,
    #[serde(default, deserialize_with = "check_names")]
    pub project_checks: Vec<String>,
    #[serde(default)]
    pub folders: Vec<FolderSummary>,
}

impl ProjectInfo {
    pub fn checks(&self) -> CheckSet {
        CheckSet::from_names(&self.project_checks)
    }

    /// Folder matching both display name and path.
    pub fn find_folder(&self, name: &str, path: &str) -> Option<&FolderSummary> {
        self.folders
            .iter()
            .find(|f| f.folder == name && f.folder_path == path)
    }
}

/// The service reports enabled checks either as a list or as one
/// comma-separated string.
fn check_names<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::List(names) => names,
        Raw::Text(text) => text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
    })
}

/// Folder entry inside [`ProjectInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderSummary {
    pub folder_id: i64,
    pub folder: String,
    pub folder_path: String,
    #[serde(default)]
    pub delivered_to_dams: Option<i64>,
}

impl FolderSummary {
    pub fn delivery(&self) -> Delivery {
        Delivery::from_code(self.delivered_to_dams)
    }
}

/// Status value of a folder whose QC has not been performed.
pub const QC_PENDING: &str = "QC Pending";

/// `POST /api/folders/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderInfo {
    #[serde(default)]
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub qc_status: String,
    #[serde(default)]
    pub file_errors: i64,
    #[serde(default, alias = "pending")]
    pub file_pending: i64,
    #[serde(default)]
    pub delivered_to_dams: Option<i64>,
}

impl FolderInfo {
    pub fn qc_pending(&self) -> bool {
        self.qc_status == QC_PENDING
    }

    pub fn find_file(&self, stem: &str) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.file_name == stem)
    }
}

/// A file as known to the ledger, keyed by stem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: i64,
    pub file_name: String,
}

/// Payload for `create_folder`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFolder {
    pub folder: String,
    pub folder_path: String,
    pub folder_date: Option<String>,
    pub project_id: i64,
}

/// Payload for `create_file`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFile {
    pub folder_id: i64,
    pub stem: String,
    /// Modification time as `%Y-%m-%d %H:%M:%S`, local time
    pub timestamp: String,
    /// Lower-case extension of the main file
    pub filetype: String,
}

impl NewFile {
    pub fn new(folder_id: i64, stem: &str, modified: SystemTime, filetype: &str) -> Self {
        Self {
            folder_id,
            stem: stem.to_string(),
            timestamp: format_timestamp(modified),
            filetype: filetype.to_lowercase(),
        }
    }
}

pub fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
