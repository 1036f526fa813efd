//! Typed `update` requests
//!
//! The service exposes one generic update endpoint taking
//! `type`/`property`/`value` plus optional ids. [`Update`] enumerates the
//! mutations the worker performs and renders each as form fields.

use osprey_meta::CheckName;

use crate::types::CheckResult;

/// Folder status codes: clear, error, hard failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderStatus {
    Clear,
    Error,
    Failed,
}

impl FolderStatus {
    fn property(self) -> &'static str {
        match self {
            Self::Clear => "status0",
            Self::Error => "status1",
            Self::Failed => "status9",
        }
    }
}

/// Which subfolder a manifest covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestScope {
    Main,
    Raw,
}

impl ManifestScope {
    fn prefix(self) -> &'static str {
        match self {
            Self::Main => "tif",
            Self::Raw => "raw",
        }
    }
}

/// Integer-valued folder flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderFlag {
    /// Advisory "under verification" mark
    CheckingFolder,
    /// A filename contains a disallowed character
    FilenameSpaces,
    /// More than one local file shares a ledger stem
    DuplicateFiles,
    /// Manifest presence; the service expects `0` when present, `1` when missing
    ManifestExists(ManifestScope),
}

impl FolderFlag {
    fn property(self) -> String {
        match self {
            Self::CheckingFolder => "checking_folder".into(),
            Self::FilenameSpaces => "filename_spaces".into(),
            Self::DuplicateFiles => "duplicate_files".into(),
            Self::ManifestExists(scope) => format!("{}_md5_exists", scope.prefix()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Startup,
    FolderStatus {
        folder_id: i64,
        status: FolderStatus,
        message: String,
    },
    FolderFlag {
        folder_id: i64,
        flag: FolderFlag,
        value: i64,
    },
    ManifestResult {
        folder_id: i64,
        scope: ManifestScope,
        valid: bool,
        message: String,
    },
    FolderStats {
        folder_id: i64,
    },
    DeleteFile {
        file_id: i64,
    },
    FileCheck {
        folder_id: i64,
        file_id: i64,
        check: CheckName,
        result: CheckResult,
        info: String,
    },
    /// Ask the service to evaluate stem uniqueness within the project
    UniqueFile {
        folder_id: i64,
        file_id: i64,
    },
    /// Ask the service to evaluate stem uniqueness across other projects
    UniqueOther {
        folder_id: i64,
        file_id: i64,
    },
    FileDigest {
        file_id: i64,
        filetype: String,
        digest: String,
    },
    Exif {
        file_id: i64,
        filetype: String,
        tags: String,
    },
}

impl Update {
    /// Value of the `property` field.
    pub fn property(&self) -> String {
        match self {
            Self::Startup => "startup".into(),
            Self::FolderStatus { status, .. } => status.property().into(),
            Self::FolderFlag { flag, .. } => flag.property(),
            Self::ManifestResult { scope, valid, .. } => {
                let outcome = if *valid { "ok" } else { "error" };
                format!("{}_md5_matches_{outcome}", scope.prefix())
            }
            Self::FolderStats { .. } => "stats".into(),
            Self::DeleteFile { .. } => "delete".into(),
            Self::FileCheck { .. } => "filechecks".into(),
            Self::UniqueFile { .. } => "unique".into(),
            Self::UniqueOther { .. } => "unique_other".into(),
            Self::FileDigest { .. } => "filemd5".into(),
            Self::Exif { .. } => "exif".into(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::FolderStatus { .. }
            | Self::FolderFlag { .. }
            | Self::ManifestResult { .. }
            | Self::FolderStats { .. } => "folder",
            _ => "file",
        }
    }

    /// Form fields, excluding the API key.
    pub fn form(&self) -> Vec<(&'static str, String)> {
        let mut form = vec![("type", self.kind().to_string()), ("property", self.property())];
        match self {
            Self::Startup => form.push(("value", "True".into())),
            Self::FolderStatus {
                folder_id, message, ..
            } => {
                form.push(("folder_id", folder_id.to_string()));
                form.push(("value", message.clone()));
            }
            Self::FolderFlag {
                folder_id, value, ..
            } => {
                form.push(("folder_id", folder_id.to_string()));
                form.push(("value", value.to_string()));
            }
            Self::ManifestResult {
                folder_id, message, ..
            } => {
                form.push(("folder_id", folder_id.to_string()));
                form.push(("value", message.clone()));
            }
            Self::FolderStats { folder_id } => {
                form.push(("folder_id", folder_id.to_string()));
                form.push(("value", "0".into()));
            }
            Self::DeleteFile { file_id } => {
                form.push(("file_id", file_id.to_string()));
                form.push(("value", "True".into()));
            }
            Self::FileCheck {
                folder_id,
                file_id,
                check,
                result,
                info,
            } => {
                form.push(("folder_id", folder_id.to_string()));
                form.push(("file_id", file_id.to_string()));
                form.push(("file_check", check.as_str().into()));
                form.push(("value", result.code().to_string()));
                form.push(("check_info", info.clone()));
            }
            Self::UniqueFile { folder_id, file_id } | Self::UniqueOther { folder_id, file_id } => {
                let check = match self {
                    Self::UniqueFile { .. } => CheckName::UniqueFile,
                    _ => CheckName::UniqueOther,
                };
                form.push(("folder_id", folder_id.to_string()));
                form.push(("file_id", file_id.to_string()));
                form.push(("file_check", check.as_str().into()));
                form.push(("value", "True".into()));
                form.push(("check_info", "True".into()));
            }
            Self::FileDigest {
                file_id,
                filetype,
                digest,
            } => {
                form.push(("file_id", file_id.to_string()));
                form.push(("filetype", filetype.clone()));
                form.push(("value", digest.clone()));
            }
            Self::Exif {
                file_id,
                filetype,
                tags,
            } => {
                form.push(("file_id", file_id.to_string()));
                form.push(("filetype", filetype.clone()));
                form.push(("value", tags.clone()));
            }
        }
        form
    }
}
