//! Checksum manifest validation
//!
//! A manifest lists `<digest> <filename>` rows, one per line, in the format
//! written by `md5sum`/`sha256sum`. Several manifests in one subfolder are
//! concatenated into a single table.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use osprey_fs::{DigestAlgorithm, compute_file_digest, file_name};
use osprey_ledger::CheckResult;

use crate::scheduler::WorkerPool;
use crate::{Error, Result};

/// One parsed manifest row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub digest: String,
    pub filename: String,
}

/// Parse manifest text.
///
/// Blank lines are skipped. A leading `*` (binary-mode marker) and any
/// directory components are stripped from the filename. Lines without a
/// filename are skipped with a warning.
pub fn parse_manifest(text: &str) -> Vec<ManifestEntry> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let Some((digest, rest)) = line.split_once(char::is_whitespace) else {
                tracing::warn!(line, "manifest row without filename");
                return None;
            };
            let name = rest.trim().trim_start_matches('*');
            let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
            if name.is_empty() {
                tracing::warn!(line, "manifest row without filename");
                return None;
            }
            Some(ManifestEntry {
                digest: digest.to_string(),
                filename: name.to_string(),
            })
        })
        .collect()
}

/// Digests keyed by filename, concatenated from one or more manifests.
#[derive(Debug, Clone, Default)]
pub struct ManifestTable {
    digests: HashMap<String, String>,
    rows: usize,
}

impl ManifestTable {
    pub fn load(paths: &[PathBuf]) -> Result<Self> {
        let mut table = Self::default();
        for path in paths {
            let text = fs::read_to_string(path).map_err(|e| osprey_fs::Error::io(path, e))?;
            table.extend(parse_manifest(&text));
        }
        Ok(table)
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = ManifestEntry>) {
        for entry in entries {
            self.rows += 1;
            self.digests.insert(entry.filename, entry.digest);
        }
    }

    /// Number of rows across all manifests, duplicates included.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn digest_for(&self, filename: &str) -> Option<&str> {
        self.digests.get(filename).map(String::as_str)
    }
}

/// Aggregate manifest result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestVerdict {
    pub result: CheckResult,
    pub message: String,
    /// Files hashed to reach the verdict
    pub digests_computed: usize,
}

pub struct ManifestValidator {
    pool: WorkerPool,
    algorithm: DigestAlgorithm,
}

impl ManifestValidator {
    pub fn new(pool: WorkerPool, algorithm: DigestAlgorithm) -> Self {
        Self { pool, algorithm }
    }

    /// Verify `candidates` against the concatenated `manifests`.
    ///
    /// A count mismatch fails without hashing anything.
    pub fn validate(&self, manifests: &[PathBuf], candidates: &[PathBuf]) -> Result<ManifestVerdict> {
        let table = ManifestTable::load(manifests)?;
        if candidates.len() != table.rows() {
            return Ok(ManifestVerdict {
                result: CheckResult::Fail,
                message: format!(
                    "No. of files ({}) mismatch manifest ({})",
                    candidates.len(),
                    table.rows()
                ),
                digests_computed: 0,
            });
        }

        let algorithm = self.algorithm;
        let table = &table;
        let outcomes = self.pool.run_all(
            candidates.to_vec(),
            |_| Ok(()),
            |_, path: PathBuf| -> Result<bool> { matches_manifest(table, &path, algorithm) },
        )?;

        let mut bad = 0;
        for outcome in outcomes {
            if !outcome? {
                bad += 1;
            }
        }

        let (result, message) = if bad == 0 {
            (CheckResult::Pass, "Valid".to_string())
        } else {
            (CheckResult::Fail, format!("{bad} files don't match the manifest"))
        };
        Ok(ManifestVerdict {
            result,
            message,
            digests_computed: candidates.len(),
        })
    }
}

fn matches_manifest(table: &ManifestTable, path: &Path, algorithm: DigestAlgorithm) -> Result<bool> {
    let name = file_name(path);
    let digest = compute_file_digest(path, algorithm).map_err(Error::from)?;
    let ok = table
        .digest_for(&name)
        .is_some_and(|expected| expected.eq_ignore_ascii_case(&digest));
    if !ok {
        tracing::info!(file = %name, "manifest mismatch");
    }
    Ok(ok)
}
