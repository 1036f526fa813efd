//! Folder orchestration
//!
//! ```text
//! New -> Created
//! {Ready, Delivered}  -> skip
//! QC already done     -> skip
//! clean (optional)    -> skip
//! otherwise -> under verification -> {halted | completed}
//! ```
//!
//! Structural anomalies halt the folder with a recorded status; ledger
//! failures abort it with `Err` and the folder is retried on the next pass.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use osprey_fs::{extension_lower, file_name, file_stem, find_disallowed, walk_files};
use osprey_ledger::{
    Delivery, FolderFlag, FolderInfo, FolderStatus, Ledger, LedgerConnector, ManifestScope,
    NewFolder, Update,
};
use osprey_meta::{CheckName, CheckSet, LayoutConfig, OspreyConfig};
use osprey_tools::Toolkit;
use regex::Regex;

use crate::manifest::ManifestValidator;
use crate::pipeline::{FileOutcome, FilePipeline, FolderContext};
use crate::scheduler::WorkerPool;
use crate::sequence::{FileRegistry, check_sequence};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Ready for or already delivered to the repository
    Delivered,
    /// QC has been performed
    QcDone,
    /// Ledger reports no errors or pending files and the count is unchanged
    Clean,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderOutcome {
    Skipped {
        folder_id: i64,
        reason: SkipReason,
    },
    /// Structural anomaly; no per-file checks ran
    Halted { folder_id: i64, reason: String },
    Completed {
        folder_id: i64,
        files: usize,
        /// Files that errored or aborted before their checks ran
        failed_files: usize,
        counts_match: bool,
    },
}

impl FolderOutcome {
    pub fn folder_id(&self) -> i64 {
        match self {
            Self::Skipped { folder_id, .. }
            | Self::Halted { folder_id, .. }
            | Self::Completed { folder_id, .. } => *folder_id,
        }
    }
}

/// A delivery folder's files, classified by location and extension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderScan {
    pub main_dir_exists: bool,
    pub main: Vec<PathBuf>,
    pub raw: Vec<PathBuf>,
    pub manifests: Vec<(ManifestScope, PathBuf)>,
    pub aux: Vec<PathBuf>,
    /// Unrecognized files; any entry halts the folder
    pub extraneous: Vec<PathBuf>,
    /// Every scanned file except manifests and ignored names
    pub files: Vec<PathBuf>,
}

impl FolderScan {
    pub fn manifests_for(&self, scope: ManifestScope) -> Vec<PathBuf> {
        self.manifests
            .iter()
            .filter(|(s, _)| *s == scope)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Files a manifest in `dir` is expected to cover.
    pub fn files_under(&self, dir: &Path) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter(|p| p.starts_with(dir))
            .cloned()
            .collect()
    }
}

/// Walk `folder` and classify every file.
pub fn classify_tree(folder: &Path, layout: &LayoutConfig) -> Result<FolderScan> {
    let main_dir = layout.main_path(folder);
    let raw_dir = layout.raw_path(folder);
    let has_ext = |list: &[String], ext: &Option<String>| {
        ext.as_deref()
            .is_some_and(|e| list.iter().any(|l| l.eq_ignore_ascii_case(e)))
    };

    let mut scan = FolderScan {
        main_dir_exists: main_dir.is_dir(),
        ..Default::default()
    };
    for path in walk_files(folder)? {
        let name = file_name(&path);
        if layout.ignored_names.iter().any(|n| *n == name) {
            continue;
        }
        let ext = extension_lower(&path);

        if has_ext(&layout.manifest_extensions, &ext) {
            let scope = if path.starts_with(&raw_dir) {
                ManifestScope::Raw
            } else {
                ManifestScope::Main
            };
            scan.manifests.push((scope, path));
            continue;
        }

        if path.starts_with(&main_dir) && has_ext(&layout.main_extensions, &ext) {
            scan.main.push(path.clone());
        } else if path.starts_with(&raw_dir) && has_ext(&layout.raw_extensions, &ext) {
            scan.raw.push(path.clone());
        } else if has_ext(&layout.aux_extensions, &ext) {
            scan.aux.push(path.clone());
        } else {
            scan.extraneous.push(path.clone());
        }
        scan.files.push(path);
    }

    tracing::debug!(
        main = scan.main.len(),
        raw = scan.raw.len(),
        manifests = scan.manifests.len(),
        aux = scan.aux.len(),
        extraneous = scan.extraneous.len(),
        "classified folder"
    );
    Ok(scan)
}

/// What [`reconcile_deletions`] changed or found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Stems deleted from the ledger
    pub deleted: Vec<String>,
    /// Stems shared by more than one local main file
    pub duplicates: Vec<String>,
}

/// Delete ledger files with no local main file and find duplicate stems.
pub fn reconcile_deletions(ledger: &dyn Ledger, folder: &FolderInfo, main: &[PathBuf]) -> Result<Reconciliation> {
    let mut local: BTreeMap<String, usize> = BTreeMap::new();
    for path in main {
        *local.entry(file_stem(path)).or_default() += 1;
    }

    let mut result = Reconciliation::default();
    for record in &folder.files {
        if !local.contains_key(&record.file_name) {
            ledger.update(&Update::DeleteFile {
                file_id: record.file_id,
            })?;
            tracing::info!(stem = %record.file_name, file_id = record.file_id, "deleted from ledger");
            result.deleted.push(record.file_name.clone());
        }
    }
    result.duplicates = local
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(stem, _)| stem)
        .collect();
    Ok(result)
}

pub struct FolderOrchestrator<'a> {
    config: &'a OspreyConfig,
    connector: &'a dyn LedgerConnector,
    tools: &'a Toolkit,
    pool: WorkerPool,
}

impl<'a> FolderOrchestrator<'a> {
    pub fn new(config: &'a OspreyConfig, connector: &'a dyn LedgerConnector, tools: &'a Toolkit) -> Self {
        Self {
            config,
            connector,
            tools,
            pool: WorkerPool::new(config.runtime.workers),
        }
    }

    /// Reconcile and validate one delivery folder.
    pub fn process(&self, folder_path: &Path) -> Result<FolderOutcome> {
        let name = file_name(folder_path);
        let span = tracing::info_span!("folder", folder = %name);
        let _guard = span.enter();

        let ledger = self.connector.connect()?;
        let project = ledger.fetch_project()?;
        let checks = project.checks();
        let path_text = folder_path.to_string_lossy().into_owned();

        let (folder_id, delivery) = match project.find_folder(&name, &path_text) {
            Some(folder) => (folder.folder_id, folder.delivery()),
            None => {
                let folder_id = ledger.create_folder(&NewFolder {
                    folder: name.clone(),
                    folder_path: path_text.clone(),
                    folder_date: self.config.project.folder_date(&name),
                    project_id: project.project_id,
                })?;
                tracing::info!(folder_id, "created folder record");
                (folder_id, Delivery::Pending)
            }
        };

        if delivery.is_terminal() {
            tracing::info!(folder_id, ?delivery, "folder ready for or in delivery, skipping");
            return Ok(FolderOutcome::Skipped {
                folder_id,
                reason: SkipReason::Delivered,
            });
        }

        let info = ledger.fetch_folder(folder_id)?;
        if !info.qc_pending() {
            tracing::info!(folder_id, qc_status = %info.qc_status, "QC completed, skipping");
            return Ok(FolderOutcome::Skipped {
                folder_id,
                reason: SkipReason::QcDone,
            });
        }

        let scan = classify_tree(folder_path, &self.config.layout)?;
        if self.config.runtime.skip_clean_folders && is_clean(&info, &scan) {
            tracing::info!(folder_id, "folder already clean, skipping");
            return Ok(FolderOutcome::Skipped {
                folder_id,
                reason: SkipReason::Clean,
            });
        }

        ledger.update(&Update::FolderFlag {
            folder_id,
            flag: FolderFlag::CheckingFolder,
            value: 1,
        })?;

        let outcome = self.verify(ledger.as_ref(), folder_id, folder_path, &checks, &info, &scan);

        if !matches!(outcome, Err(Error::Ledger(_)))
            && let Err(e) = ledger.update(&Update::FolderStats { folder_id })
        {
            tracing::warn!(folder_id, error = %e, "could not update folder stats");
        }
        if let Ok(outcome) = &outcome {
            tracing::info!(folder_id, ?outcome, "folder done");
        }
        outcome
    }

    fn verify(
        &self,
        ledger: &dyn Ledger,
        folder_id: i64,
        folder_path: &Path,
        checks: &CheckSet,
        info: &FolderInfo,
        scan: &FolderScan,
    ) -> Result<FolderOutcome> {
        let set_status = |status: FolderStatus, message: &str| -> Result<()> {
            ledger.update(&Update::FolderStatus {
                folder_id,
                status,
                message: message.to_string(),
            })?;
            Ok(())
        };
        let halted = |reason: String| -> Result<FolderOutcome> {
            tracing::warn!(folder_id, %reason, "folder halted");
            Ok(FolderOutcome::Halted { folder_id, reason })
        };

        if !scan.extraneous.is_empty() {
            let names: Vec<String> = scan
                .extraneous
                .iter()
                .map(|p| p.strip_prefix(folder_path).unwrap_or(p).display().to_string())
                .collect();
            let message = format!("Extraneous files: {}", names.join(", "));
            set_status(FolderStatus::Error, &message)?;
            return halted(message);
        }

        if !scan.main_dir_exists {
            let message = self.config.redact(&format!(
                "Missing MAIN folder in {}",
                folder_path.display()
            ));
            set_status(FolderStatus::Failed, &message)?;
            return halted(message);
        }

        let reconciled = reconcile_deletions(ledger, info, &scan.main)?;
        if !reconciled.duplicates.is_empty() {
            tracing::warn!(folder_id, duplicates = ?reconciled.duplicates, "duplicate stems");
            ledger.update(&Update::FolderFlag {
                folder_id,
                flag: FolderFlag::DuplicateFiles,
                value: 1,
            })?;
        }

        let pairing = checks.contains(CheckName::RawPair);
        let named: Vec<&PathBuf> = if pairing {
            scan.main.iter().chain(scan.raw.iter()).collect()
        } else {
            scan.main.iter().collect()
        };
        let disallowed = &self.config.layout.disallowed_chars;
        if let Some(bad) = named
            .iter()
            .find(|p| find_disallowed(&file_name(p), disallowed).is_some())
        {
            ledger.update(&Update::FolderFlag {
                folder_id,
                flag: FolderFlag::FilenameSpaces,
                value: 1,
            })?;
            return halted(format!("Disallowed character in filename {:?}", file_name(bad)));
        }

        let mut scopes = vec![ManifestScope::Main];
        if pairing {
            scopes.push(ManifestScope::Raw);
        }
        for scope in scopes {
            if let Some(reason) = self.manifest_step(ledger, folder_id, folder_path, scope, scan)? {
                set_status(FolderStatus::Error, &reason)?;
                return halted(reason);
            }
        }

        set_status(FolderStatus::Clear, "")?;
        let mut status_flagged = false;
        if pairing && scan.main.len() != scan.raw.len() {
            let message = format!(
                "No. of files do not match (main: {}, raws: {})",
                scan.main.len(),
                scan.raw.len()
            );
            tracing::warn!(folder_id, %message);
            set_status(FolderStatus::Error, &message)?;
            status_flagged = true;
        }

        let failed_files = self.dispatch(folder_id, folder_path, scan)?;

        if checks.contains(CheckName::Sequence) {
            self.sequence_pass(ledger, folder_id, scan)?;
        }

        let after = ledger.fetch_folder(folder_id)?;
        let counts_match = after.files.len() == scan.main.len();
        if !counts_match {
            tracing::error!(
                folder_id,
                local = scan.main.len(),
                ledger = after.files.len(),
                "file counts diverge"
            );
            set_status(FolderStatus::Error, "System error")?;
        } else if !status_flagged {
            set_status(FolderStatus::Clear, "")?;
        }

        Ok(FolderOutcome::Completed {
            folder_id,
            files: scan.main.len(),
            failed_files,
            counts_match,
        })
    }

    /// Manifest flags and validation for one subfolder; `Some(reason)` halts.
    fn manifest_step(
        &self,
        ledger: &dyn Ledger,
        folder_id: i64,
        folder_path: &Path,
        scope: ManifestScope,
        scan: &FolderScan,
    ) -> Result<Option<String>> {
        let layout = &self.config.layout;
        let (dir, dir_name) = match scope {
            ManifestScope::Main => (layout.main_path(folder_path), &layout.main_dir),
            ManifestScope::Raw => (layout.raw_path(folder_path), &layout.raw_dir),
        };
        let manifests = scan.manifests_for(scope);

        ledger.update(&Update::FolderFlag {
            folder_id,
            flag: FolderFlag::ManifestExists(scope),
            value: if manifests.is_empty() { 1 } else { 0 },
        })?;

        if manifests.is_empty() {
            if self.config.checks.manifest_required {
                return Ok(Some(format!("Manifest missing in {dir_name}")));
            }
            return Ok(None);
        }

        let validator = ManifestValidator::new(self.pool, self.config.checks.digest);
        let verdict = validator.validate(&manifests, &scan.files_under(&dir))?;
        tracing::info!(folder_id, ?scope, message = %verdict.message, "manifest checked");
        ledger.update(&Update::ManifestResult {
            folder_id,
            scope,
            valid: verdict.result.is_pass(),
            message: verdict.message,
        })?;
        Ok(None)
    }

    /// Run the file pipeline over every main file; returns how many failed.
    fn dispatch(&self, folder_id: i64, folder_path: &Path, scan: &FolderScan) -> Result<usize> {
        let ctx = FolderContext {
            folder_id,
            folder_path: folder_path.to_path_buf(),
            raw_files: scan.raw.clone(),
            filename_pattern: self.filename_pattern()?,
        };
        if let Some(previews) = &self.config.previews
            && !scan.main.is_empty()
        {
            let dir = previews.folder_dir(folder_id);
            fs::create_dir_all(&dir).map_err(|e| osprey_fs::Error::io(&dir, e))?;
        }
        tracing::info!(
            folder_id,
            tasks = scan.main.len(),
            workers = self.pool.workers(),
            "checking files"
        );

        let results = self.pool.run_all(
            scan.main.clone(),
            |_| Ok(FilePipeline::new(self.config, self.connector.connect()?, self.tools)),
            |pipeline, file: PathBuf| {
                let result = pipeline.process(&file, &ctx);
                (file, result)
            },
        )?;

        let mut failed = 0;
        for (file, result) in results {
            match result {
                Ok(report) => {
                    if matches!(report.outcome, FileOutcome::Aborted { .. }) {
                        failed += 1;
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::error!(file = %file.display(), error = %e, "file aborted");
                    failed += 1;
                }
            }
        }
        Ok(failed)
    }

    /// Sequence check for every main file against the refreshed project registry.
    fn sequence_pass(&self, ledger: &dyn Ledger, folder_id: i64, scan: &FolderScan) -> Result<()> {
        let Some(spec) = &self.config.sequence else {
            tracing::warn!(folder_id, "sequence check enabled without a [sequence] definition");
            return Ok(());
        };
        let registry = FileRegistry::new(ledger.fetch_project_files()?);
        let own = ledger.fetch_folder(folder_id)?;
        tracing::info!(folder_id, registry = registry.len(), "checking sequences");

        let results = self.pool.run_all(
            scan.main.clone(),
            |_| Ok(self.connector.connect()?),
            |session, file: PathBuf| -> Result<()> {
                let verdict = check_sequence(&file_name(&file), &registry, spec);
                let own_id = own.find_file(&file_stem(&file)).map(|record| record.file_id);
                match (verdict.file_id, own_id) {
                    (Some(_), Some(file_id)) => session.update(&Update::FileCheck {
                        folder_id,
                        file_id,
                        check: CheckName::Sequence,
                        result: verdict.result,
                        info: verdict.message,
                    })?,
                    (Some(_), None) => {
                        tracing::warn!(file = %file.display(), "file_id not found in folder {folder_id}")
                    }
                    (None, _) => tracing::warn!(file = %file.display(), "{}", verdict.message),
                }
                Ok(())
            },
        )?;
        for result in results {
            if let Err(e) = result {
                tracing::error!(folder_id, error = %e, "sequence result not recorded");
            }
        }
        Ok(())
    }

    fn filename_pattern(&self) -> Result<Option<Regex>> {
        self.config
            .checks
            .filename_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| Error::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .transpose()
    }
}

fn is_clean(info: &FolderInfo, scan: &FolderScan) -> bool {
    let ledger_stems: HashSet<&str> = info.files.iter().map(|f| f.file_name.as_str()).collect();
    info.file_errors == 0
        && info.file_pending == 0
        && !info.files.is_empty()
        && info.files.len() == scan.main.len()
        && scan.main.iter().all(|p| ledger_stems.contains(file_stem(p).as_str()))
}
