//! Delivery-folder trees and matching configurations.

use std::fs;
use std::path::{Path, PathBuf};

use osprey_fs::{DigestAlgorithm, compute_file_digest};
use osprey_meta::{OspreyConfig, PreviewConfig};
use tempfile::TempDir;

/// A temporary storage root, scratch area and preview root.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        for dir in ["storage", "scratch", "previews"] {
            fs::create_dir_all(temp_dir.path().join(dir)).unwrap();
        }
        Self { temp_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn storage(&self) -> PathBuf {
        self.root().join("storage")
    }

    pub fn scratch(&self) -> PathBuf {
        self.root().join("scratch")
    }

    pub fn previews(&self) -> PathBuf {
        self.root().join("previews")
    }

    /// Create an empty delivery folder under the storage root.
    pub fn folder(&self, name: &str) -> DeliveryFolder {
        DeliveryFolder::create(&self.storage(), name)
    }

    /// Single-worker configuration pointing at this workspace, no previews.
    pub fn config(&self) -> OspreyConfig {
        serde_json::from_value(serde_json::json!({
            "project": {
                "alias": "test_project",
                "storage": self.storage().display().to_string(),
            },
            "ledger": { "url": "http://ledger.invalid" },
            "runtime": {
                "workers": 1,
                "sleep_secs": 0,
                "startup_grace_secs": 0,
                "scratch_dir": self.scratch().display().to_string(),
            },
        }))
        .unwrap()
    }

    /// [`config`](Self::config) with previews written to this workspace.
    pub fn config_with_previews(&self, min_free_ratio: Option<f64>) -> OspreyConfig {
        let mut config = self.config();
        config.previews = Some(PreviewConfig {
            root: self.previews(),
            width: 160,
            min_free_ratio,
            tile_size: 254,
            archive: false,
        });
        config
    }
}

/// One delivery folder using the default `tifs`/`raws` layout.
pub struct DeliveryFolder {
    root: PathBuf,
}

impl DeliveryFolder {
    pub fn create(storage: &Path, name: &str) -> Self {
        let root = storage.join(name);
        fs::create_dir_all(&root).unwrap();
        Self { root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Write `rel` with `content`, creating parent directories.
    pub fn file(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// `tifs/<stem>.tif` with content unique to the stem.
    pub fn main(&self, stem: &str) -> PathBuf {
        self.file(&format!("tifs/{stem}.tif"), &format!("main image {stem}"))
    }

    /// `raws/<stem>.iiq`.
    pub fn raw(&self, stem: &str) -> PathBuf {
        self.file(&format!("raws/{stem}.iiq"), &format!("raw capture {stem}"))
    }

    /// MD5 manifest in `subdir` covering every file currently in it.
    pub fn manifest(&self, subdir: &str) -> PathBuf {
        let dir = self.root.join(subdir);
        let mut entries: Vec<PathBuf> = fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.is_file() && p.extension().is_none_or(|e| e != "md5"))
            .collect();
        entries.sort();

        let mut text = String::new();
        for path in entries {
            let digest = compute_file_digest(&path, DigestAlgorithm::Md5).unwrap();
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            text.push_str(&format!("{digest}  {name}\n"));
        }
        self.file(&format!("{subdir}/{}.md5", self.name()), &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_lists_existing_files() {
        let ws = TestWorkspace::new();
        let folder = ws.folder("f1");
        folder.main("a");
        folder.main("b");
        let manifest = folder.manifest("tifs");
        let text = fs::read_to_string(manifest).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("  a.tif"));
        assert!(lines[1].ends_with("  b.tif"));
    }

    #[test]
    fn config_points_at_workspace() {
        let ws = TestWorkspace::new();
        let config = ws.config();
        assert_eq!(config.project.storage, ws.storage());
        assert_eq!(config.runtime.workers, 1);
        assert!(config.previews.is_none());
    }
}
