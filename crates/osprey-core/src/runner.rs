//! Passes over the storage root

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use osprey_ledger::{LedgerConnector, check_compatible};
use osprey_meta::OspreyConfig;
use osprey_tools::Toolkit;
use uuid::Uuid;

use crate::hooks::{HookContext, HookStage, run_hook};
use crate::orchestrator::{FolderOrchestrator, FolderOutcome};
use crate::{Error, Result};

/// One slice of the folder list when several workers share a storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shard {
    pub index: usize,
    pub count: usize,
}

impl Shard {
    /// `None` unless `index < count`.
    pub fn new(index: usize, count: usize) -> Option<Self> {
        (index < count).then_some(Self { index, count })
    }

    /// The first shard performs the startup reset.
    pub fn is_first(&self) -> bool {
        self.index == 0
    }
}

/// Split `items` into `shard.count` contiguous near-equal chunks and return
/// chunk `shard.index`; the first `len % count` chunks hold one extra item.
pub fn partition_shard<T>(items: &[T], shard: Shard) -> &[T] {
    let count = shard.count.max(1);
    let base = items.len() / count;
    let extra = items.len() % count;
    let start = shard.index * base + shard.index.min(extra);
    let len = base + usize::from(shard.index < extra);
    let start = start.min(items.len());
    let end = (start + len).min(items.len());
    &items[start..end]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// A single pass
    Once,
    /// Pass, sleep, repeat
    Service,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub folders: usize,
    pub skipped: usize,
    pub halted: usize,
    pub completed: usize,
    /// Folders aborted by a ledger or filesystem error
    pub errors: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &FolderOutcome) {
        self.folders += 1;
        match outcome {
            FolderOutcome::Skipped { .. } => self.skipped += 1,
            FolderOutcome::Halted { .. } => self.halted += 1,
            FolderOutcome::Completed { .. } => self.completed += 1,
        }
    }
}

pub struct Runner<'a> {
    config: &'a OspreyConfig,
    connector: &'a dyn LedgerConnector,
    tools: &'a Toolkit,
    shard: Option<Shard>,
}

impl<'a> Runner<'a> {
    pub fn new(config: &'a OspreyConfig, connector: &'a dyn LedgerConnector, tools: &'a Toolkit) -> Self {
        Self {
            config,
            connector,
            tools,
            shard: None,
        }
    }

    pub fn with_shard(mut self, shard: Option<Shard>) -> Self {
        self.shard = shard;
        self
    }

    /// Handshake with the ledger and clear stale verification marks.
    pub fn startup(&self) -> Result<()> {
        let ledger = self.connector.connect()?;
        let version = ledger.server_version()?;
        if let Some(expected) = &self.config.ledger.expected_version {
            check_compatible(expected, &version)?;
        }
        tracing::info!(%version, "ledger reachable");

        if self.shard.is_none_or(|s| s.is_first()) {
            ledger.startup_reset()?;
            tracing::info!("cleared stale verification marks");
        } else {
            let grace = self.config.runtime.startup_grace_secs;
            tracing::info!(grace_secs = grace, "waiting for the first shard to reset");
            thread::sleep(Duration::from_secs(grace));
        }
        Ok(())
    }

    /// Process every delivery folder in this shard once.
    pub fn run_once(&self) -> Result<RunSummary> {
        let span = tracing::info_span!("pass", id = %Uuid::new_v4());
        let _guard = span.enter();

        if let Some(script) = &self.config.runtime.pre_script {
            let context = HookContext::for_pass(self.config, HookStage::PrePass);
            run_hook(script, HookStage::PrePass, &context)?;
        }

        let folders = self.list_folders()?;
        let selected = match self.shard {
            Some(shard) => partition_shard(&folders, shard),
            None => &folders[..],
        };
        tracing::info!(total = folders.len(), selected = selected.len(), "starting pass");

        let orchestrator = FolderOrchestrator::new(self.config, self.connector, self.tools);
        let mut summary = RunSummary::default();
        for folder in selected {
            match orchestrator.process(folder) {
                Ok(outcome) => summary.record(&outcome),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::error!(folder = %folder.display(), error = %e, "folder aborted, retrying next pass");
                    summary.folders += 1;
                    summary.errors += 1;
                }
            }
        }

        if let Some(script) = &self.config.runtime.post_script {
            let context = HookContext::for_pass(self.config, HookStage::PostPass);
            run_hook(script, HookStage::PostPass, &context)?;
        }

        tracing::info!(?summary, "pass complete");
        Ok(summary)
    }

    /// Start up, then run passes according to `mode`.
    ///
    /// Returns after one pass in [`RunMode::Once`]; in service mode it only
    /// returns on a fatal error.
    pub fn run(&self, mode: RunMode) -> Result<RunSummary> {
        self.startup()?;
        loop {
            match self.run_once() {
                Ok(summary) if mode == RunMode::Once => return Ok(summary),
                Ok(_) => {}
                Err(e) if mode == RunMode::Service && !e.is_fatal() => {
                    tracing::error!(error = %e, "pass failed");
                }
                Err(e) => return Err(e),
            }
            let secs = self.config.runtime.sleep_secs;
            tracing::info!(secs, "sleeping until next pass");
            thread::sleep(Duration::from_secs(secs));
        }
    }

    /// Direct subdirectories of the storage root, sorted.
    fn list_folders(&self) -> Result<Vec<PathBuf>> {
        let root = &self.config.project.storage;
        if !root.is_dir() {
            return Err(Error::StorageRootMissing { path: root.clone() });
        }

        let mut folders = Vec::new();
        let entries = fs::read_dir(root).map_err(|e| osprey_fs::Error::io(root, e))?;
        for entry in entries {
            let path = entry.map_err(|e| osprey_fs::Error::io(root, e))?.path();
            if path.is_dir() {
                folders.push(path);
            } else {
                tracing::warn!(path = %path.display(), "skipping non-folder entry in storage root");
            }
        }
        folders.sort();
        Ok(folders)
    }
}
