//! JHOVE format validator

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::process;
use crate::types::ValidationReport;
use crate::FormatValidator;

const WELL_FORMED_AND_VALID: &str = "Well-Formed and valid";

pub struct Jhove {
    program: PathBuf,
}

impl Jhove {
    pub fn new(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
        }
    }
}

impl FormatValidator for Jhove {
    fn validate(&self, path: &Path) -> Result<ValidationReport> {
        let captured = process::run(
            &self.program,
            [OsStr::new("-h"), OsStr::new("json"), path.as_os_str()],
            &[],
        )?
        .require_success(&self.program)?;
        parse_report(&self.program, &captured.stdout)
    }
}

/// Parse the JSON handler output of a single-file run.
pub fn parse_report(program: &Path, output: &str) -> Result<ValidationReport> {
    let parse_error = |message: &str| Error::ParseError {
        program: program.to_path_buf(),
        message: message.to_string(),
    };

    let doc: Value = serde_json::from_str(output).map_err(|e| parse_error(&e.to_string()))?;
    let rep_info = match &doc["jhove"]["repInfo"] {
        Value::Array(items) => items.first().cloned(),
        Value::Object(_) => Some(doc["jhove"]["repInfo"].clone()),
        _ => None,
    }
    .ok_or_else(|| parse_error("missing jhove.repInfo"))?;

    let status = rep_info["status"]
        .as_str()
        .ok_or_else(|| parse_error("missing repInfo.status"))?
        .to_string();

    let messages = match &rep_info["messages"] {
        Value::Array(items) => items.iter().filter_map(message_text).collect(),
        Value::Object(_) => message_text(&rep_info["messages"]).into_iter().collect(),
        _ => Vec::new(),
    };

    Ok(ValidationReport {
        well_formed: status == WELL_FORMED_AND_VALID,
        status,
        messages,
        output: output.to_string(),
    })
}

fn message_text(item: &Value) -> Option<String> {
    item.get("message")
        .and_then(Value::as_str)
        .map(String::from)
}
