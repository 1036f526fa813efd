//! Pre- and post-pass scripts
//!
//! Configured as `runtime.pre_script` and `runtime.post_script` and run as
//! subprocesses around every pass. A script that cannot be started or exits
//! non-zero stops the worker.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::process::Command;

use osprey_meta::OspreyConfig;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookStage {
    PrePass,
    PostPass,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrePass => write!(f, "pre-pass"),
            Self::PostPass => write!(f, "post-pass"),
        }
    }
}

/// Environment handed to a script.
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    pub vars: HashMap<String, String>,
}

impl HookContext {
    pub fn for_pass(config: &OspreyConfig, stage: HookStage) -> Self {
        let mut vars = HashMap::new();
        vars.insert("OSPREY_STAGE".to_string(), stage.to_string());
        vars.insert("OSPREY_PROJECT".to_string(), config.project.alias.clone());
        vars.insert(
            "OSPREY_STORAGE".to_string(),
            config.project.storage.display().to_string(),
        );
        Self { vars }
    }
}

#[derive(Debug)]
pub struct HookResult {
    pub stage: HookStage,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Run `script` for `stage`, failing on a non-zero exit.
pub fn run_hook(script: &Path, stage: HookStage, context: &HookContext) -> Result<HookResult> {
    tracing::info!(%stage, script = %script.display(), "running hook");

    let output = Command::new(script)
        .envs(&context.vars)
        .output()
        .map_err(|e| Error::HookFailed {
            stage: stage.to_string(),
            script: script.to_path_buf(),
            message: format!("could not start: {e}"),
        })?;

    let result = HookResult {
        stage,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code(),
    };

    if !output.status.success() {
        let stderr = result.stderr.trim();
        let message = if stderr.is_empty() {
            format!("exited with non-zero status (exit code: {:?})", result.exit_code)
        } else {
            format!(
                "exited with non-zero status (exit code: {:?}): {stderr}",
                result.exit_code
            )
        };
        return Err(Error::HookFailed {
            stage: stage.to_string(),
            script: script.to_path_buf(),
            message,
        });
    }

    tracing::debug!(%stage, stdout = %result.stdout.trim(), "hook finished");
    Ok(result)
}
