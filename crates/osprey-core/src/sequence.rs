//! Multi-part sequence completeness
//!
//! A stem like `vol12_b` has prefix `vol12` and position token `b`. Every
//! file except the last in the configured sequence needs its successor
//! (`vol12_c`) registered in the project.

use std::collections::HashMap;
use std::path::Path;

use osprey_fs::file_stem;
use osprey_ledger::{CheckResult, FileRecord};
use osprey_meta::SequenceSpec;

/// Project file registry keyed by stem.
///
/// Stems repeated across folders keep the first record listed.
#[derive(Debug, Clone, Default)]
pub struct FileRegistry {
    ids: HashMap<String, i64>,
}

impl FileRegistry {
    pub fn new(files: Vec<FileRecord>) -> Self {
        let mut ids = HashMap::with_capacity(files.len());
        for file in files {
            ids.entry(file.file_name).or_insert(file.file_id);
        }
        Self { ids }
    }

    pub fn file_id(&self, stem: &str) -> Option<i64> {
        self.ids.get(stem).copied()
    }

    pub fn contains(&self, stem: &str) -> bool {
        self.ids.contains_key(stem)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceVerdict {
    /// `None` when the file is not registered; nothing can be posted then
    pub file_id: Option<i64>,
    pub result: CheckResult,
    pub message: String,
}

impl SequenceVerdict {
    fn new(file_id: Option<i64>, pass: bool, message: String) -> Self {
        Self {
            file_id,
            result: CheckResult::from_pass(pass),
            message,
        }
    }
}

/// Check that the successor of `filename` in `spec` is registered.
///
/// A position token that is not part of the sequence fails with the same
/// "not found" message as a missing successor.
pub fn check_sequence(filename: &str, registry: &FileRegistry, spec: &SequenceSpec) -> SequenceVerdict {
    let stem = file_stem(Path::new(filename));
    let Some(file_id) = registry.file_id(&stem) else {
        return SequenceVerdict::new(None, false, format!("file_id not found for {filename}"));
    };

    let Some((prefix, token)) = stem.rsplit_once(spec.separator.as_str()) else {
        return SequenceVerdict::new(
            Some(file_id),
            false,
            format!("No sequence separator {:?} in {stem}", spec.separator),
        );
    };

    if spec.is_last(token) {
        return SequenceVerdict::new(
            Some(file_id),
            true,
            "File is the last one in the sequence".to_string(),
        );
    }

    if let Some(next) = spec.next_after(token) {
        let next_stem = format!("{prefix}{}{next}", spec.separator);
        if registry.contains(&next_stem) {
            return SequenceVerdict::new(
                Some(file_id),
                true,
                format!("Next file in sequence ({next_stem}) found"),
            );
        }
    }

    SequenceVerdict::new(
        Some(file_id),
        false,
        "Next file in sequence was not found".to_string(),
    )
}
