//! In-memory ledger service.
//!
//! Applies [`Update`]s to a small model of the service so tests can assert
//! on resulting state instead of request logs. Clones share state, and the
//! ledger is its own [`LedgerConnector`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use osprey_ledger::{
    CheckResult, Error, FileRecord, FolderInfo, FolderStatus, FolderSummary, Ledger,
    LedgerConnector, ManifestScope, NewFile, NewFolder, ProjectInfo, Result, Update,
};
use osprey_ledger::types::QC_PENDING;
use osprey_meta::CheckName;

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryFolder {
    pub summary: FolderSummary,
    pub folder_date: Option<String>,
    pub qc_status: String,
    pub status: Option<(FolderStatus, String)>,
    /// Integer flags by property name
    pub flags: BTreeMap<String, i64>,
    pub manifest_results: Vec<(ManifestScope, bool, String)>,
    pub stats_posts: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryFile {
    pub file_id: i64,
    pub folder_id: i64,
    pub stem: String,
    pub filetype: String,
    pub timestamp: String,
    pub checks: BTreeMap<CheckName, (CheckResult, String)>,
    /// Digest by filetype
    pub digests: BTreeMap<String, String>,
    /// Sizes by filetype
    pub sizes: BTreeMap<String, u64>,
    pub exif: Option<String>,
}

#[derive(Debug)]
struct State {
    project_id: i64,
    alias: String,
    checks: Vec<String>,
    version: String,
    next_id: i64,
    folders: BTreeMap<i64, MemoryFolder>,
    files: BTreeMap<i64, MemoryFile>,
    updates: Vec<Update>,
    startup_resets: usize,
    connections: usize,
    failing_property: Option<String>,
    offline: bool,
}

impl State {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn folder_mut(&mut self, folder_id: i64) -> Result<&mut MemoryFolder> {
        self.folders.get_mut(&folder_id).ok_or_else(|| Error::Status {
            endpoint: format!("folders/{folder_id}"),
            code: 404,
            body: "folder not found".into(),
        })
    }

    fn file_mut(&mut self, file_id: i64) -> Result<&mut MemoryFile> {
        self.files.get_mut(&file_id).ok_or_else(|| Error::Rejected {
            endpoint: format!("update/{}", self.alias),
            body: format!("file {file_id} not found"),
        })
    }

    fn apply(&mut self, update: &Update) -> Result<()> {
        match update {
            Update::Startup => {
                for folder in self.folders.values_mut() {
                    folder.flags.insert("checking_folder".into(), 0);
                }
            }
            Update::FolderStatus {
                folder_id,
                status,
                message,
            } => self.folder_mut(*folder_id)?.status = Some((*status, message.clone())),
            Update::FolderFlag { folder_id, value, .. } => {
                let property = update.property();
                self.folder_mut(*folder_id)?.flags.insert(property, *value);
            }
            Update::ManifestResult {
                folder_id,
                scope,
                valid,
                message,
            } => self
                .folder_mut(*folder_id)?
                .manifest_results
                .push((*scope, *valid, message.clone())),
            Update::FolderStats { folder_id } => self.folder_mut(*folder_id)?.stats_posts += 1,
            Update::DeleteFile { file_id } => {
                self.files.remove(file_id);
            }
            Update::FileCheck {
                file_id,
                check,
                result,
                info,
                ..
            } => {
                self.file_mut(*file_id)?
                    .checks
                    .insert(*check, (*result, info.clone()));
            }
            Update::UniqueFile { file_id, .. } => {
                let stem = self.file_mut(*file_id)?.stem.clone();
                let unique = self.files.values().filter(|f| f.stem == stem).count() == 1;
                let info = if unique { "Unique" } else { "Duplicate stem in project" };
                self.file_mut(*file_id)?.checks.insert(
                    CheckName::UniqueFile,
                    (CheckResult::from_pass(unique), info.into()),
                );
            }
            Update::UniqueOther { file_id, .. } => {
                self.file_mut(*file_id)?
                    .checks
                    .insert(CheckName::UniqueOther, (CheckResult::Pass, "Unique".into()));
            }
            Update::FileDigest {
                file_id,
                filetype,
                digest,
            } => {
                self.file_mut(*file_id)?
                    .digests
                    .insert(filetype.clone(), digest.clone());
            }
            Update::Exif { file_id, tags, .. } => self.file_mut(*file_id)?.exif = Some(tags.clone()),
        }
        Ok(())
    }

    fn folder_info(&self, folder_id: i64) -> Option<FolderInfo> {
        let folder = self.folders.get(&folder_id)?;
        let files: Vec<&MemoryFile> = self.files.values().filter(|f| f.folder_id == folder_id).collect();
        Some(FolderInfo {
            files: files
                .iter()
                .map(|f| FileRecord {
                    file_id: f.file_id,
                    file_name: f.stem.clone(),
                })
                .collect(),
            qc_status: folder.qc_status.clone(),
            file_errors: files
                .iter()
                .filter(|f| f.checks.values().any(|(r, _)| !r.is_pass()))
                .count() as i64,
            file_pending: files.iter().filter(|f| f.checks.is_empty()).count() as i64,
            delivered_to_dams: folder.summary.delivered_to_dams,
        })
    }
}

/// Shared in-memory ledger.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    state: Arc<Mutex<State>>,
}

impl MemoryLedger {
    /// Empty project `alias` with `checks` enabled.
    pub fn new(alias: &str, checks: &[CheckName]) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                project_id: 100,
                alias: alias.to_string(),
                checks: checks.iter().map(|c| c.as_str().to_string()).collect(),
                version: "2.8.0".into(),
                next_id: 0,
                folders: BTreeMap::new(),
                files: BTreeMap::new(),
                updates: Vec::new(),
                startup_resets: 0,
                connections: 0,
                failing_property: None,
                offline: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn guard(&self, endpoint: &str) -> Result<MutexGuard<'_, State>> {
        let state = self.lock();
        if state.offline {
            return Err(Error::Status {
                endpoint: endpoint.to_string(),
                code: 503,
                body: "service unavailable".into(),
            });
        }
        Ok(state)
    }

    pub fn set_version(&self, version: &str) {
        self.lock().version = version.to_string();
    }

    /// Every request fails with HTTP 503 while set.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Updates with this `property` are rejected.
    pub fn fail_property(&self, property: Option<&str>) {
        self.lock().failing_property = property.map(str::to_string);
    }

    /// Pre-register a folder.
    pub fn add_folder(&self, name: &str, path: &str, delivered: Option<i64>, qc_status: &str) -> i64 {
        let mut state = self.lock();
        let folder_id = state.id();
        state.folders.insert(
            folder_id,
            MemoryFolder {
                summary: FolderSummary {
                    folder_id,
                    folder: name.to_string(),
                    folder_path: path.to_string(),
                    delivered_to_dams: delivered,
                },
                folder_date: None,
                qc_status: qc_status.to_string(),
                status: None,
                flags: BTreeMap::new(),
                manifest_results: Vec::new(),
                stats_posts: 0,
            },
        );
        folder_id
    }

    /// Pre-register a file without any check results.
    pub fn add_file(&self, folder_id: i64, stem: &str, filetype: &str) -> i64 {
        let mut state = self.lock();
        let file_id = state.id();
        state.files.insert(
            file_id,
            MemoryFile {
                file_id,
                folder_id,
                stem: stem.to_string(),
                filetype: filetype.to_string(),
                timestamp: String::new(),
                checks: BTreeMap::new(),
                digests: BTreeMap::new(),
                sizes: BTreeMap::new(),
                exif: None,
            },
        );
        file_id
    }

    pub fn folder_id(&self, name: &str) -> Option<i64> {
        self.lock()
            .folders
            .values()
            .find(|f| f.summary.folder == name)
            .map(|f| f.summary.folder_id)
    }

    /// Panics when the folder does not exist.
    pub fn folder(&self, folder_id: i64) -> MemoryFolder {
        self.lock().folders[&folder_id].clone()
    }

    pub fn files(&self, folder_id: i64) -> Vec<MemoryFile> {
        self.lock()
            .files
            .values()
            .filter(|f| f.folder_id == folder_id)
            .cloned()
            .collect()
    }

    pub fn file(&self, folder_id: i64, stem: &str) -> Option<MemoryFile> {
        self.files(folder_id).into_iter().find(|f| f.stem == stem)
    }

    pub fn check(&self, folder_id: i64, stem: &str, check: CheckName) -> Option<(CheckResult, String)> {
        self.file(folder_id, stem)?.checks.get(&check).cloned()
    }

    pub fn updates(&self) -> Vec<Update> {
        self.lock().updates.clone()
    }

    pub fn startup_resets(&self) -> usize {
        self.lock().startup_resets
    }

    pub fn connections(&self) -> usize {
        self.lock().connections
    }
}

impl Ledger for MemoryLedger {
    fn server_version(&self) -> Result<String> {
        Ok(self.guard("")?.version.clone())
    }

    fn startup_reset(&self) -> Result<()> {
        self.update(&Update::Startup)?;
        self.lock().startup_resets += 1;
        Ok(())
    }

    fn fetch_project(&self) -> Result<ProjectInfo> {
        let state = self.guard("projects")?;
        Ok(ProjectInfo {
            project_id: state.project_id,
            project_alias: state.alias.clone(),
            project_checks: state.checks.clone(),
            folders: state.folders.values().map(|f| f.summary.clone()).collect(),
        })
    }

    fn create_folder(&self, folder: &NewFolder) -> Result<i64> {
        let folder_id = {
            drop(self.guard("new")?);
            self.add_folder(&folder.folder, &folder.folder_path, None, QC_PENDING)
        };
        self.lock()
            .folder_mut(folder_id)?
            .folder_date
            .clone_from(&folder.folder_date);
        Ok(folder_id)
    }

    fn fetch_folder(&self, folder_id: i64) -> Result<FolderInfo> {
        let state = self.guard("folders")?;
        state.folder_info(folder_id).ok_or_else(|| Error::Status {
            endpoint: format!("folders/{folder_id}"),
            code: 404,
            body: "folder not found".into(),
        })
    }

    fn create_file(&self, file: &NewFile) -> Result<i64> {
        drop(self.guard("new")?);
        let file_id = self.add_file(file.folder_id, &file.stem, &file.filetype);
        self.lock().file_mut(file_id)?.timestamp.clone_from(&file.timestamp);
        Ok(file_id)
    }

    fn create_filesize(&self, file_id: i64, filetype: &str, size: u64) -> Result<()> {
        let mut state = self.guard("new")?;
        state.file_mut(file_id)?.sizes.insert(filetype.to_string(), size);
        Ok(())
    }

    fn update(&self, update: &Update) -> Result<()> {
        let mut state = self.guard("update")?;
        let property = update.property();
        if state.failing_property.as_deref() == Some(property.as_str()) {
            return Err(Error::Rejected {
                endpoint: format!("update/{}", state.alias),
                body: format!("{{\"result\": false, \"property\": \"{property}\"}}"),
            });
        }
        state.apply(update)?;
        state.updates.push(update.clone());
        Ok(())
    }

    fn fetch_project_files(&self) -> Result<Vec<FileRecord>> {
        let state = self.guard("projects/files")?;
        Ok(state
            .files
            .values()
            .map(|f| FileRecord {
                file_id: f.file_id,
                file_name: f.stem.clone(),
            })
            .collect())
    }
}

impl LedgerConnector for MemoryLedger {
    fn connect(&self) -> Result<Box<dyn Ledger>> {
        let mut state = self.guard("")?;
        state.connections += 1;
        drop(state);
        Ok(Box::new(self.clone()))
    }
}
