//! Configuration types for the Osprey worker
//!
//! Loaded from `osprey.toml` (or JSON/YAML). Every section except
//! `[project]` and `[ledger]` has defaults matching a TIFF + camera-raw
//! digitization project.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use osprey_fs::DigestAlgorithm;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Root configuration object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OspreyConfig {
    pub project: ProjectConfig,
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub checks: ChecksConfig,
    /// Multi-part sequence definition, required when the `sequence` check is enabled
    #[serde(default)]
    pub sequence: Option<SequenceSpec>,
    /// Preview derivatives; no derivatives are produced when absent
    #[serde(default)]
    pub previews: Option<PreviewConfig>,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl OspreyConfig {
    /// Strip the storage-root prefix from a diagnostic text.
    pub fn redact(&self, text: &str) -> String {
        let root = self.project.storage.to_string_lossy();
        if root.is_empty() {
            return text.to_string();
        }
        text.replace(root.as_ref(), "")
    }
}

/// `[project]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project alias used in every ledger endpoint
    pub alias: String,
    /// Root directory holding one subdirectory per delivery folder
    pub storage: PathBuf,
    /// Regex with `year`, `month` and `day` groups used to derive the folder date
    #[serde(default = "default_folder_date_pattern")]
    pub folder_date_pattern: String,
}

fn default_folder_date_pattern() -> String {
    r"(?P<year>\d{4})-?(?P<month>\d{2})-?(?P<day>\d{2})".to_string()
}

impl ProjectConfig {
    /// Derive the `YYYY-MM-DD` folder date from a folder name.
    ///
    /// Returns `None` when the pattern does not match or the match is not a
    /// calendar date.
    pub fn folder_date(&self, folder_name: &str) -> Option<String> {
        let re = Regex::new(&self.folder_date_pattern).ok()?;
        let caps = re.captures(folder_name)?;
        let year = caps.name("year")?.as_str().parse().ok()?;
        let month = caps.name("month")?.as_str().parse().ok()?;
        let day = caps.name("day")?.as_str().parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
    }
}

/// `[ledger]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Base URL of the ledger service, without the `/api` suffix
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Server version this worker is built against; checked at startup when set
    #[serde(default)]
    pub expected_version: Option<String>,
}

fn default_timeout_secs() -> u64 {
    60
}

/// `[layout]`: how a delivery folder is organised on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub main_dir: String,
    pub raw_dir: String,
    pub aux_dir: String,
    pub main_extensions: Vec<String>,
    pub raw_extensions: Vec<String>,
    pub manifest_extensions: Vec<String>,
    pub aux_extensions: Vec<String>,
    /// File names skipped entirely by the scanner
    pub ignored_names: Vec<String>,
    pub disallowed_chars: Vec<char>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            main_dir: "tifs".into(),
            raw_dir: "raws".into(),
            aux_dir: "data".into(),
            main_extensions: vec!["tif".into(), "tiff".into()],
            raw_extensions: vec!["iiq".into(), "eip".into()],
            manifest_extensions: vec!["md5".into()],
            aux_extensions: vec!["csv".into(), "xml".into(), "txt".into(), "json".into()],
            ignored_names: vec![".DS_Store".into(), "Thumbs.db".into()],
            disallowed_chars: vec![' '],
        }
    }
}

impl LayoutConfig {
    pub fn main_path(&self, folder: &Path) -> PathBuf {
        folder.join(&self.main_dir)
    }

    pub fn raw_path(&self, folder: &Path) -> PathBuf {
        folder.join(&self.raw_dir)
    }

    pub fn aux_path(&self, folder: &Path) -> PathBuf {
        folder.join(&self.aux_dir)
    }
}

/// `[checks]`: parameters of the individual checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    /// A folder without a digest manifest is not processed
    pub manifest_required: bool,
    /// Compression scheme every main file must use (compared case-insensitively)
    pub required_compression: String,
    /// Validator messages that do not fail the structural check, matched as prefixes
    pub benign_diagnostics: Vec<String>,
    /// Raw extensions whose inspector failures are tolerated
    pub raw_inspector_exempt: Vec<String>,
    /// Optional regex every main-file stem must match
    pub filename_pattern: Option<String>,
    pub digest: DigestAlgorithm,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            manifest_required: false,
            required_compression: "LZW".into(),
            benign_diagnostics: vec![
                "WhiteBalance value out of range".into(),
                "Unknown TIFF IFD tag".into(),
            ],
            raw_inspector_exempt: vec!["eip".into()],
            filename_pattern: None,
            digest: DigestAlgorithm::Md5,
        }
    }
}

/// `[sequence]`: the expected run of a multi-part sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSpec {
    /// Position tokens in order, e.g. `["a", "b", "c"]`
    pub tokens: Vec<String>,
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_separator() -> String {
    "_".to_string()
}

impl SequenceSpec {
    pub fn new(tokens: &[&str], separator: &str) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            separator: separator.to_string(),
        }
    }

    pub fn is_last(&self, token: &str) -> bool {
        self.tokens.last().is_some_and(|t| t == token)
    }

    /// Token following `token`, if `token` is a non-final member of the sequence.
    pub fn next_after(&self, token: &str) -> Option<&str> {
        let idx = self.tokens.iter().position(|t| t == token)?;
        self.tokens.get(idx + 1).map(String::as_str)
    }
}

/// `[previews]`: access derivatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    pub root: PathBuf,
    #[serde(default = "default_preview_width")]
    pub width: u32,
    /// Minimum free fraction of the preview device; files are skipped below it
    #[serde(default)]
    pub min_free_ratio: Option<f64>,
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    /// Bundle the tile pyramid into a single archive
    #[serde(default)]
    pub archive: bool,
}

fn default_preview_width() -> u32 {
    160
}

fn default_tile_size() -> u32 {
    254
}

impl PreviewConfig {
    pub fn folder_dir(&self, folder_id: i64) -> PathBuf {
        self.root.join(format!("folder{folder_id}"))
    }
}

/// `[tools]`: external programs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub jhove: PathBuf,
    pub exiftool: PathBuf,
    pub magick: PathBuf,
    pub vips: PathBuf,
    /// Value for `MAGICK_THREAD_LIMIT`
    pub magick_thread_limit: Option<u32>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            jhove: "jhove".into(),
            exiftool: "exiftool".into(),
            magick: "magick".into(),
            vips: "vips".into(),
            magick_thread_limit: Some(1),
        }
    }
}

/// `[runtime]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker pool size; `1` runs every task in the calling thread
    pub workers: usize,
    /// Pause between passes in service mode
    pub sleep_secs: u64,
    pub scratch_dir: PathBuf,
    /// Skip folders the ledger already reports clean and whose file count is unchanged
    pub skip_clean_folders: bool,
    /// How long non-first shards wait for the startup reset
    pub startup_grace_secs: u64,
    pub pre_script: Option<PathBuf>,
    pub post_script: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            sleep_secs: 180,
            scratch_dir: std::env::temp_dir(),
            skip_clean_folders: false,
            startup_grace_secs: 20,
            pre_script: None,
            post_script: None,
            log_dir: None,
        }
    }
}
