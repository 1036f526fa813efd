//! Individual file checks
//!
//! Each check computes its own outcome; a tool that cannot run is a failed
//! check with the error as diagnostic, never an abort.

use std::path::{Path, PathBuf};

use osprey_fs::{file_name, file_stem, find_disallowed};
use osprey_ledger::CheckResult;
use osprey_tools::{FormatValidator, ImageInspector};
use regex::Regex;

/// Result code plus diagnostic text for one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub result: CheckResult,
    pub info: String,
}

impl CheckOutcome {
    pub fn pass(info: impl Into<String>) -> Self {
        Self {
            result: CheckResult::Pass,
            info: info.into(),
        }
    }

    pub fn fail(info: impl Into<String>) -> Self {
        Self {
            result: CheckResult::Fail,
            info: info.into(),
        }
    }

    pub fn is_pass(&self) -> bool {
        self.result.is_pass()
    }
}

/// Exactly one same-stem file must exist among `raws`.
///
/// Returns the matched raw file on success.
pub fn check_pairing(main: &Path, file_id: i64, raws: &[PathBuf]) -> (CheckOutcome, Option<PathBuf>) {
    let name = file_name(main);
    let stem = file_stem(main);
    let matches: Vec<&PathBuf> = raws.iter().filter(|r| file_stem(r) == stem).collect();
    match matches.as_slice() {
        [raw] => (
            CheckOutcome::pass(format!(
                "Raw file {} found for {name} ({file_id})",
                file_name(raw)
            )),
            Some((*raw).clone()),
        ),
        [] => (
            CheckOutcome::fail(format!("Missing raw file for {name} ({file_id})")),
            None,
        ),
        _ => (
            CheckOutcome::fail(format!("Multiple raw files for {name} ({file_id})")),
            None,
        ),
    }
}

/// Structural validity; failures consisting only of `benign` diagnostics pass.
pub fn check_structure(validator: &dyn FormatValidator, path: &Path, benign: &[String]) -> CheckOutcome {
    match validator.validate(path) {
        Ok(report) if report.well_formed => CheckOutcome::pass(report.status),
        Ok(report) => {
            let info = format!("{}: {}", report.status, report.messages.join("; "));
            if report.only_benign(benign) {
                CheckOutcome::pass(info)
            } else {
                CheckOutcome::fail(info)
            }
        }
        Err(e) => CheckOutcome::fail(format!("Validator could not run: {e}")),
    }
}

pub fn check_pages(inspector: &dyn ImageInspector, path: &Path) -> CheckOutcome {
    match inspector.page_count(path) {
        Ok(pages) => {
            let info = format!("No. of pages: {pages}");
            if pages == 1 {
                CheckOutcome::pass(info)
            } else {
                CheckOutcome::fail(info)
            }
        }
        Err(e) => CheckOutcome::fail(format!("Could not count pages: {e}")),
    }
}

/// Compression scheme must equal `required`, ignoring case.
pub fn check_compression(inspector: &dyn ImageInspector, path: &Path, required: &str) -> CheckOutcome {
    match inspector.compression(path) {
        Ok(scheme) if scheme.eq_ignore_ascii_case(required) => CheckOutcome::pass(scheme),
        Ok(scheme) => CheckOutcome::fail(format!("{scheme} (expected {required})")),
        Err(e) => CheckOutcome::fail(format!("Could not read compression: {e}")),
    }
}

pub fn check_probe(inspector: &dyn ImageInspector, path: &Path) -> CheckOutcome {
    match inspector.inspect(path) {
        Ok(inspection) if inspection.success => CheckOutcome::pass(inspection.output),
        Ok(inspection) => CheckOutcome::fail(inspection.output),
        Err(e) => CheckOutcome::fail(format!("Inspector could not run: {e}")),
    }
}

pub fn check_filename(path: &Path, disallowed: &[char], pattern: Option<&Regex>) -> CheckOutcome {
    let name = file_name(path);
    if let Some(c) = find_disallowed(&name, disallowed) {
        return CheckOutcome::fail(format!("Filename {name:?} contains disallowed character {c:?}"));
    }
    if let Some(re) = pattern {
        let stem = file_stem(path);
        if !re.is_match(&stem) {
            return CheckOutcome::fail(format!("Filename {name:?} does not match {}", re.as_str()));
        }
    }
    CheckOutcome::pass(format!("Filename {name:?} is valid"))
}
