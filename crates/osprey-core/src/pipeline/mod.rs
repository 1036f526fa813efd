//! Per-file check pipeline
//!
//! One [`FilePipeline`] lives in each pool worker and owns that worker's
//! ledger session. For every main file it upserts the ledger record,
//! produces access derivatives, reports digest and metadata, and runs the
//! project's enabled checks, posting each result as soon as it is known.

mod checks;

use std::fs;
use std::path::{Path, PathBuf};

use osprey_fs::{ScratchDir, compute_file_digest, extension_lower, file_name, file_stem, free_ratio};
use osprey_ledger::{CheckResult, Ledger, NewFile, Update};
use osprey_meta::{CheckName, OspreyConfig, PreviewConfig};
use osprey_tools::Toolkit;
use regex::Regex;

use crate::{Error, Result};

pub use checks::{
    CheckOutcome, check_compression, check_filename, check_pages, check_pairing, check_probe,
    check_structure,
};

/// Read-only inputs shared by every file of one folder run.
#[derive(Debug, Clone)]
pub struct FolderContext {
    pub folder_id: i64,
    pub folder_path: PathBuf,
    /// Raw counterparts found by the folder scan
    pub raw_files: Vec<PathBuf>,
    pub filename_pattern: Option<Regex>,
}

/// How far a file got through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Completed,
    /// Stopped before the checks ran; nothing further was posted
    Aborted { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub stem: String,
    pub file_id: i64,
    pub outcome: FileOutcome,
    pub checks: Vec<(CheckName, CheckOutcome)>,
}

impl FileReport {
    pub fn failed_checks(&self) -> usize {
        self.checks.iter().filter(|(_, o)| !o.is_pass()).count()
    }
}

pub struct FilePipeline<'a> {
    config: &'a OspreyConfig,
    ledger: Box<dyn Ledger>,
    tools: &'a Toolkit,
}

impl<'a> FilePipeline<'a> {
    pub fn new(config: &'a OspreyConfig, ledger: Box<dyn Ledger>, tools: &'a Toolkit) -> Self {
        Self {
            config,
            ledger,
            tools,
        }
    }

    /// Run every step for one main file.
    ///
    /// A ledger failure aborts this file with `Err`; scratch exhaustion is
    /// returned as the fatal [`Error::StorageExhausted`].
    pub fn process(&self, file: &Path, ctx: &FolderContext) -> Result<FileReport> {
        let stem = file_stem(file);
        let filetype = extension_lower(file).unwrap_or_default();
        let folder_id = ctx.folder_id;

        let folder = self.ledger.fetch_folder(folder_id)?;
        let checks = self.ledger.fetch_project()?.checks();

        let file_id = match folder.find_file(&stem) {
            Some(record) => record.file_id,
            None => self.register(file, folder_id, &stem, &filetype)?,
        };
        tracing::debug!(%stem, file_id, "processing");

        self.ledger.update(&Update::UniqueFile { folder_id, file_id })?;
        if checks.contains(CheckName::UniqueOther) {
            self.ledger.update(&Update::UniqueOther { folder_id, file_id })?;
        }

        if let Some(previews) = &self.config.previews
            && let Some(reason) = preview_space_shortfall(previews)?
        {
            tracing::error!(%stem, file_id, "{reason}");
            return Ok(FileReport {
                stem,
                file_id,
                outcome: FileOutcome::Aborted { reason },
                checks: Vec::new(),
            });
        }

        let scratch = ScratchDir::create(&self.config.runtime.scratch_dir)?;
        let staged = scratch.stage(file).map_err(Error::from_staging)?;

        if let Some(previews) = &self.config.previews
            && let Err(reason) = self.derivatives(previews, &staged, folder_id, file_id)
        {
            tracing::error!(%stem, file_id, "{reason}");
            return Ok(FileReport {
                stem,
                file_id,
                outcome: FileOutcome::Aborted { reason },
                checks: Vec::new(),
            });
        }

        let digest = compute_file_digest(&staged, self.config.checks.digest)?;
        self.ledger.update(&Update::FileDigest {
            file_id,
            filetype: filetype.clone(),
            digest,
        })?;

        match self.tools.prober.probe(&staged) {
            Ok(tags) => self.ledger.update(&Update::Exif {
                file_id,
                filetype: filetype.clone(),
                tags: tags.to_string(),
            })?,
            Err(e) => tracing::warn!(%stem, file_id, error = %e, "metadata probe failed"),
        }

        let mut report = FileReport {
            stem,
            file_id,
            outcome: FileOutcome::Completed,
            checks: Vec::new(),
        };
        for check in checks.pipeline_checks() {
            let outcome = match check {
                CheckName::RawPair => self.pairing(file, &scratch, ctx, file_id)?,
                CheckName::Jhove => check_structure(
                    self.tools.validator.as_ref(),
                    &staged,
                    &self.config.checks.benign_diagnostics,
                ),
                CheckName::Filename => check_filename(
                    file,
                    &self.config.layout.disallowed_chars,
                    ctx.filename_pattern.as_ref(),
                ),
                CheckName::TifPages => check_pages(self.tools.inspector.as_ref(), &staged),
                CheckName::Magick => check_probe(self.tools.inspector.as_ref(), &staged),
                CheckName::TifCompression => check_compression(
                    self.tools.inspector.as_ref(),
                    &staged,
                    &self.config.checks.required_compression,
                ),
                _ => continue,
            };
            self.post_check(folder_id, file_id, check, &outcome)?;
            report.checks.push((check, outcome));
        }

        tracing::info!(
            stem = %report.stem,
            file_id,
            failed = report.failed_checks(),
            "file checked"
        );
        Ok(report)
    }

    fn register(&self, file: &Path, folder_id: i64, stem: &str, filetype: &str) -> Result<i64> {
        let meta = fs::metadata(file).map_err(|e| osprey_fs::Error::io(file, e))?;
        let modified = meta.modified().map_err(|e| osprey_fs::Error::io(file, e))?;
        let file_id = self
            .ledger
            .create_file(&NewFile::new(folder_id, stem, modified, filetype))?;
        self.ledger.create_filesize(file_id, filetype, meta.len())?;
        tracing::info!(%stem, file_id, "registered new file");
        Ok(file_id)
    }

    fn post_check(&self, folder_id: i64, file_id: i64, check: CheckName, outcome: &CheckOutcome) -> Result<()> {
        self.ledger.update(&Update::FileCheck {
            folder_id,
            file_id,
            check,
            result: outcome.result,
            info: self.config.redact(&outcome.info),
        })?;
        Ok(())
    }

    /// Thumbnail then tiles; a thumbnail failure stops the file, a tile
    /// failure is only logged.
    fn derivatives(
        &self,
        previews: &PreviewConfig,
        staged: &Path,
        folder_id: i64,
        file_id: i64,
    ) -> std::result::Result<(), String> {
        let folder_dir = previews.folder_dir(folder_id);
        let thumb_dir = folder_dir.join(previews.width.to_string());
        fs::create_dir_all(&thumb_dir)
            .map_err(|e| format!("Could not create {}: {e}", thumb_dir.display()))?;

        let thumb = thumb_dir.join(format!("{file_id}.jpg"));
        self.tools
            .previews
            .thumbnail(staged, &thumb, previews.width)
            .map_err(|e| format!("Preview failed: {e}"))?;

        let tiles_dir = folder_dir.join(format!("{file_id}_files"));
        if tiles_dir.exists()
            && let Err(e) = fs::remove_dir_all(&tiles_dir)
        {
            tracing::warn!(file_id, path = %tiles_dir.display(), error = %e, "stale tiles not removed");
        }
        if let Err(e) = self.tools.previews.tiles(
            staged,
            &folder_dir.join(file_id.to_string()),
            previews.tile_size,
            previews.archive,
        ) {
            tracing::warn!(file_id, error = %e, "tile pyramid failed");
        }
        Ok(())
    }

    /// Pairing check; on success the raw copy is validated and its digest
    /// and size are reported.
    fn pairing(&self, file: &Path, scratch: &ScratchDir, ctx: &FolderContext, file_id: i64) -> Result<CheckOutcome> {
        let (found, raw) = check_pairing(file, file_id, &ctx.raw_files);
        let Some(raw) = raw else {
            return Ok(found);
        };

        let staged = scratch.stage(&raw).map_err(Error::from_staging)?;
        let raw_type = extension_lower(&raw).unwrap_or_default();

        let structure = check_structure(
            self.tools.validator.as_ref(),
            &staged,
            &self.config.checks.benign_diagnostics,
        );
        let structure_line = if structure.is_pass() {
            format!("Validator accepted the file: {}", structure.info)
        } else {
            format!("Validator could not validate: {}", structure.info)
        };

        let probe = check_probe(self.tools.inspector.as_ref(), &staged);
        let exempt = self
            .config
            .checks
            .raw_inspector_exempt
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&raw_type));
        let (probe_pass, probe_line) = if probe.is_pass() {
            (true, format!("Inspector accepted the file: {}", probe.info))
        } else if exempt {
            (true, String::new())
        } else {
            (false, format!("Inspector could not validate: {}", probe.info))
        };

        let outcome = CheckOutcome {
            result: CheckResult::from_pass(structure.is_pass() && probe_pass),
            info: format!("{}\n{structure_line}\n{probe_line}", found.info),
        };

        if outcome.is_pass() {
            let digest = compute_file_digest(&staged, self.config.checks.digest)?;
            self.ledger.update(&Update::FileDigest {
                file_id,
                filetype: "raw".into(),
                digest,
            })?;
            let size = fs::metadata(&staged)
                .map_err(|e| osprey_fs::Error::io(&staged, e))?
                .len();
            self.ledger.create_filesize(file_id, &raw_type, size)?;
            tracing::debug!(file_id, raw = %file_name(&raw), "raw counterpart reported");
        }
        Ok(outcome)
    }
}

/// `Some(reason)` when the preview device is below its free-space floor.
fn preview_space_shortfall(previews: &PreviewConfig) -> Result<Option<String>> {
    let Some(min) = previews.min_free_ratio else {
        return Ok(None);
    };
    let ratio = free_ratio(&previews.root)?;
    if ratio < min {
        Ok(Some(format!(
            "Preview storage {} is running out of space ({:.2}% free)",
            previews.root.display(),
            ratio * 100.0
        )))
    } else {
        Ok(None)
    }
}
