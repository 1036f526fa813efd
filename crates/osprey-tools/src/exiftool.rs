//! exiftool metadata prober

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::process;
use crate::MetadataProber;

pub struct ExifTool {
    program: PathBuf,
}

impl ExifTool {
    pub fn new(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
        }
    }
}

impl MetadataProber for ExifTool {
    fn probe(&self, path: &Path) -> Result<Value> {
        // JSON, Latin-1, all duplicate tags, unknown tags, tag ids, family-1 groups
        let captured = process::run(
            &self.program,
            [
                OsStr::new("-j"),
                OsStr::new("-L"),
                OsStr::new("-a"),
                OsStr::new("-U"),
                OsStr::new("-u"),
                OsStr::new("-D"),
                OsStr::new("-G1"),
                path.as_os_str(),
            ],
            &[],
        )?;
        // exiftool exits 1 on minor warnings but still prints tags
        if captured.stdout.trim().is_empty() {
            captured.require_success(&self.program)?;
            return Ok(Value::Array(Vec::new()));
        }
        serde_json::from_str(&captured.stdout).map_err(|e| Error::ParseError {
            program: self.program.clone(),
            message: e.to_string(),
        })
    }
}
