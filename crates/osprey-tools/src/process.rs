//! Subprocess execution shared by the adapters

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};

/// Captured output of one program run.
#[derive(Debug)]
pub(crate) struct Captured {
    pub success: bool,
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    /// stdout followed by stderr
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        text.push_str(&self.stderr);
        text
    }

    /// Turn a non-zero exit into [`Error::CommandFailed`].
    pub fn require_success(self, program: &Path) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(Error::CommandFailed {
                program: program.to_path_buf(),
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Run `program` with `args` and extra environment variables.
pub(crate) fn run<I, S>(program: &Path, args: I, envs: &[(&str, String)]) -> Result<Captured>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args);
    for (key, value) in envs {
        cmd.env(key, value);
    }
    tracing::trace!(command = ?cmd, "running");

    let output = cmd.output().map_err(|source| Error::Spawn {
        program: program.to_path_buf(),
        source,
    })?;

    // Tool output is not guaranteed to be UTF-8
    Ok(Captured {
        success: output.status.success(),
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}
