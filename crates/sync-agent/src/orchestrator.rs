//! Push and pull runs.

use crate::config::{AgentConfig, RetentionPolicy, SyncTarget};
use crate::restore;
use crate::retention::{self, RetentionReport};
use crate::{AgentError, Result};
use chrono::{Local, NaiveDateTime};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::thread;
use std::time::Duration;
use sync_archive::{ArchiveBuilder, NamingScheme};
use sync_remote::webdav::{ConnectionDescriptor, WebDavSession};
use sync_remote::{ensure_dir, RemoteStore};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Connecting,
    PushArchiving,
    PushUploading,
    PushCleanup,
    PullSelecting,
    PullDownloading,
    PullExtracting,
    Done,
    Failed,
}

/// Result of a push that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PushOutcome {
    /// A new snapshot is on the remote store.
    Uploaded {
        snapshot: String,
        remote_path: String,
        files: usize,
        /// `None` when cleanup could not list the directory.
        retention: Option<RetentionReport>,
    },
    /// The data root had no eligible files; the remote side was not touched.
    NothingToArchive,
}

/// Result of a pull that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PullOutcome {
    /// The newest snapshot was unpacked over the local path.
    Restored { snapshot: String, entries: usize },
    /// No snapshot exists yet; the local path was not touched.
    NothingToRestore,
}

type Clock = Box<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Runs pushes and pulls with one configuration.
pub struct Agent {
    config: AgentConfig,
    naming: NamingScheme,
    retention: RetentionPolicy,
    clock: Clock,
}

/// Phase bookkeeping for a single run.
struct Run {
    action: &'static str,
    phase: Phase,
}

impl Run {
    fn new(action: &'static str) -> Self {
        Self {
            action,
            phase: Phase::Idle,
        }
    }

    fn enter(&mut self, next: Phase) {
        debug!("{}: {:?} -> {:?}", self.action, self.phase, next);
        self.phase = next;
    }

    fn fail(&mut self, err: AgentError) -> AgentError {
        error!("{} failed during {:?}: {}", self.action, self.phase, err);
        self.phase = Phase::Failed;
        err
    }
}

impl Agent {
    /// Validate `config` and build an agent that stamps snapshots with the
    /// local wall clock.
    pub fn new(config: AgentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            naming: config.naming()?,
            retention: config.retention()?,
            config,
            clock: Box::new(|| Local::now().naive_local()),
        })
    }

    /// Replace the clock used for snapshot names.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn naming(&self) -> &NamingScheme {
        &self.naming
    }

    /// Open a verified session to the endpoint.
    pub fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<WebDavSession> {
        if descriptor.base_url.trim().is_empty() {
            return Err(AgentError::Config("base URL is required".to_string()));
        }
        Ok(WebDavSession::connect(
            descriptor,
            self.config.session_config(),
        )?)
    }

    /// Connect, then archive the local data root and upload it.
    pub fn push(&self, descriptor: &ConnectionDescriptor, target: &SyncTarget) -> Result<PushOutcome> {
        let mut run = Run::new("push");
        run.enter(Phase::Connecting);
        let session = self.connect(descriptor).map_err(|e| run.fail(e))?;
        self.push_run(&mut run, &session, target)
    }

    /// Archive and upload through an already connected store.
    pub fn push_to<S: RemoteStore + ?Sized>(
        &self,
        store: &S,
        target: &SyncTarget,
    ) -> Result<PushOutcome> {
        self.push_run(&mut Run::new("push"), store, target)
    }

    fn push_run<S: RemoteStore + ?Sized>(
        &self,
        run: &mut Run,
        store: &S,
        target: &SyncTarget,
    ) -> Result<PushOutcome> {
        run.enter(Phase::PushArchiving);
        let name = self.naming.current_name((self.clock)());
        let scratch = restore::scratch_dir(&self.config.scratch_dir).map_err(|e| run.fail(e))?;
        let summary = ArchiveBuilder::new(&target.local_path)
            .exclude_dirs(self.config.exclude_dirs.iter().cloned())
            .write_to(scratch.path().join(&name))
            .map_err(|e| run.fail(e.into()))?;

        if summary.is_empty() {
            info!(
                "Nothing to archive under {}; skipping upload",
                target.local_path.display()
            );
            run.enter(Phase::Done);
            return Ok(PushOutcome::NothingToArchive);
        }
        info!("Archived {} files into {}", summary.file_count, name);

        run.enter(Phase::PushUploading);
        ensure_dir(store, &target.remote_dir);
        let remote_path = target.remote_dir.file_path(&name);
        match store.exists(&remote_path) {
            Ok(true) => warn!(
                "{} already exists remotely (two pushes within one second); overwriting",
                name
            ),
            Ok(false) => {}
            Err(e) => debug!("Could not check for {}: {}", remote_path, e),
        }
        store
            .upload(&summary.path, &remote_path, true)
            .map_err(|e| run.fail(AgentError::Transfer(e)))?;
        info!("Snapshot uploaded: {}", remote_path);
        drop(scratch);

        run.enter(Phase::PushCleanup);
        let retention = match retention::enforce(
            store,
            &target.remote_dir,
            &self.naming,
            self.retention,
        ) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Cleanup skipped, could not list {}: {}", target.remote_dir, e);
                None
            }
        };

        run.enter(Phase::Done);
        Ok(PushOutcome::Uploaded {
            snapshot: name,
            remote_path,
            files: summary.file_count,
            retention,
        })
    }

    /// Connect, then restore the newest snapshot over the local data root.
    pub fn pull(&self, descriptor: &ConnectionDescriptor, target: &SyncTarget) -> Result<PullOutcome> {
        let mut run = Run::new("pull");
        run.enter(Phase::Connecting);
        let session = self.connect(descriptor).map_err(|e| run.fail(e))?;
        self.pull_run(&mut run, &session, target)
    }

    /// Restore through an already connected store.
    pub fn pull_from<S: RemoteStore + ?Sized>(
        &self,
        store: &S,
        target: &SyncTarget,
    ) -> Result<PullOutcome> {
        self.pull_run(&mut Run::new("pull"), store, target)
    }

    fn pull_run<S: RemoteStore + ?Sized>(
        &self,
        run: &mut Run,
        store: &S,
        target: &SyncTarget,
    ) -> Result<PullOutcome> {
        run.enter(Phase::PullSelecting);
        restore::extraction_dir(&target.local_path).map_err(|e| run.fail(e))?;
        let selected = restore::select_latest(store, &target.remote_dir, &self.naming)
            .map_err(|e| run.fail(AgentError::Transfer(e)))?;
        let Some(snapshot) = selected else {
            info!("No remote snapshot found. Starting fresh.");
            run.enter(Phase::Done);
            return Ok(PullOutcome::NothingToRestore);
        };
        info!("Latest snapshot: {}", snapshot.file_name());

        run.enter(Phase::PullDownloading);
        let scratch = restore::scratch_dir(&self.config.scratch_dir).map_err(|e| run.fail(e))?;
        let archive =
            restore::download(store, &snapshot, scratch.path()).map_err(|e| run.fail(e))?;

        run.enter(Phase::PullExtracting);
        let entries = restore::unpack(&archive, &target.local_path).map_err(|e| run.fail(e))?;
        info!(
            "Restored {} ({} entries) into {}",
            snapshot.file_name(),
            entries,
            target.local_path.display()
        );

        run.enter(Phase::Done);
        Ok(PullOutcome::Restored {
            snapshot: snapshot.file_name().to_string(),
            entries,
        })
    }

    /// Push every `interval`, one run after another, connecting afresh each
    /// time. A failed run is logged and the next one still happens; only a
    /// configuration error stops the loop. With `max_runs` set, returns
    /// after that many runs.
    pub fn run_periodic(
        &self,
        descriptor: &ConnectionDescriptor,
        target: &SyncTarget,
        interval: Duration,
        max_runs: Option<usize>,
    ) -> Result<usize> {
        let mut runs = 0;
        loop {
            match self.push(descriptor, target) {
                Ok(PushOutcome::Uploaded { snapshot, .. }) => {
                    info!("Periodic push {} uploaded {}", runs + 1, snapshot)
                }
                Ok(PushOutcome::NothingToArchive) => {
                    info!("Periodic push {} had nothing to archive", runs + 1)
                }
                Err(e @ AgentError::Config(_)) => return Err(e),
                Err(e) => warn!("Periodic push {} failed: {}", runs + 1, e),
            }
            runs += 1;
            if max_runs.is_some_and(|max| runs >= max) {
                return Ok(runs);
            }
            debug!("Next push in {:?}", interval);
            thread::sleep(interval);
        }
    }
}
