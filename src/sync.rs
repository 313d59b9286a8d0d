//! The sync loop
//!
//! Each cycle walks a fixed sequence of stages:
//!
//! ```text
//! Idle -> Pulling -> Detecting -> Staging -> Committing -> Pushing -> Sleeping
//!                                    |                                  ^
//!                                    +------- no pending changes -------+
//! ```
//!
//! Any error moves the loop to `Terminated` and is returned to the caller.
//! There is no retry: a half-finished cycle (say, staged but not committed)
//! is left for an operator or supervisor to look at.

use std::fmt;

use git2::Oid;

use crate::auth::Credential;
use crate::changes::{ChangeKind, ChangeSet, WorktreeState};
use crate::config::Config;
use crate::error::Result;
use crate::git::{PullOutcome, Repository};
use crate::schedule::{Clock, Scheduler, SystemClock, TokioScheduler};

/// Where the loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Pulling,
    Detecting,
    Staging,
    Committing,
    Pushing,
    Sleeping,
    Terminated,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Pulling => "pulling",
            Stage::Detecting => "detecting",
            Stage::Staging => "staging",
            Stage::Committing => "committing",
            Stage::Pushing => "pushing",
            Stage::Sleeping => "sleeping",
            Stage::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Whether a cycle changed anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleOutcome {
    /// Nothing was pulled or committed
    #[default]
    NoOp,
    /// A pull moved the branch or a commit was created
    Synced,
}

/// What one successful cycle did
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Result of the pull, if one ran against a remote
    pub pulled: Option<PullOutcome>,
    /// Changes staged into the commit
    pub changes: ChangeSet,
    pub commit: Option<Oid>,
    pub pushed: bool,
}

impl CycleReport {
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }
}

/// Keeps one working tree in sync with its remote
pub struct SyncLoop<R, S = TokioScheduler, C = SystemClock> {
    config: Config,
    credential: Credential,
    repo: R,
    scheduler: S,
    clock: C,
    stage: Stage,
}

impl<R: Repository> SyncLoop<R> {
    pub fn new(config: Config, credential: Credential, repo: R) -> Self {
        Self {
            config,
            credential,
            repo,
            scheduler: TokioScheduler,
            clock: SystemClock,
            stage: Stage::Idle,
        }
    }
}

impl<R: Repository, S: Scheduler, C: Clock> SyncLoop<R, S, C> {
    pub fn with_scheduler<S2: Scheduler>(self, scheduler: S2) -> SyncLoop<R, S2, C> {
        SyncLoop {
            config: self.config,
            credential: self.credential,
            repo: self.repo,
            scheduler,
            clock: self.clock,
            stage: self.stage,
        }
    }

    pub fn with_clock<C2: Clock>(self, clock: C2) -> SyncLoop<R, S, C2> {
        SyncLoop {
            config: self.config,
            credential: self.credential,
            repo: self.repo,
            scheduler: self.scheduler,
            clock,
            stage: self.stage,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Run cycles until one fails. Only ever returns an error.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.run_once().await?;
        }
    }

    /// Run one cycle, then sleep for the configured interval
    pub async fn run_once(&mut self) -> Result<CycleReport> {
        let report = self.run_cycle()?;

        self.enter(Stage::Sleeping);
        tracing::info!(
            "Sleeping until next check in {:?}...",
            self.config.interval
        );
        self.scheduler.sleep(self.config.interval).await;

        Ok(report)
    }

    /// Run one cycle without sleeping afterwards
    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        self.enter(Stage::Idle);
        tracing::info!("Checking repository: {}", self.repo.root().display());

        let result = self.cycle();
        match &result {
            Ok(report) => tracing::info!(
                "Cycle finished: {:?}, {} change(s)",
                report.outcome,
                report.change_count()
            ),
            Err(_) => {
                tracing::error!("Cycle aborted while {}", self.stage);
                self.enter(Stage::Terminated);
            }
        }
        result
    }

    fn cycle(&mut self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        if self.config.pull {
            self.enter(Stage::Pulling);
            report.pulled = self.pull()?;
            if report.pulled == Some(PullOutcome::FastForwarded) {
                report.outcome = CycleOutcome::Synced;
            }
        }

        if !self.config.push {
            tracing::info!("Not checking for changes: pushing is disabled.");
            return Ok(report);
        }

        self.enter(Stage::Detecting);
        let state = self.repo.status()?;

        self.enter(Stage::Staging);
        let changes = self.stage_changes(&state)?;
        if changes.is_empty() {
            tracing::info!("No changes detected.");
            return Ok(report);
        }

        self.enter(Stage::Committing);
        let message = changes.message();
        tracing::info!("Creating commit: {}", message.trim_end());
        let commit = self
            .repo
            .commit(&message, &self.config.identity, self.clock.now())?;
        report.commit = Some(commit);
        report.changes = changes;
        report.outcome = CycleOutcome::Synced;

        self.enter(Stage::Pushing);
        report.pushed = self.push()?;

        Ok(report)
    }

    /// Stage every untracked, modified and deleted path in the snapshot
    fn stage_changes(&mut self, state: &WorktreeState) -> Result<ChangeSet> {
        let mut changes = ChangeSet::new();

        for (path, kind) in state.iter() {
            tracing::debug!("{} {}", kind, path);
            match kind {
                ChangeKind::Untracked => {
                    tracing::info!("New file detected: {}", path);
                    self.repo.add(path)?;
                }
                ChangeKind::Modified => {
                    tracing::info!("Modified file detected: {}", path);
                    self.repo.add(path)?;
                }
                ChangeKind::Deleted => {
                    tracing::info!("Deleted file detected: {}", path);
                    self.repo.remove(path)?;
                }
                ChangeKind::Other => {
                    tracing::info!("Ignoring {} with unsupported change", path);
                    continue;
                }
            }
            changes.push(path, kind);
        }

        Ok(changes)
    }

    fn pull(&mut self) -> Result<Option<PullOutcome>> {
        let Some(remote) = self.default_remote()? else {
            tracing::info!("Not pulling: no remotes configured.");
            return Ok(None);
        };

        tracing::info!("Pulling changes from {}...", remote);
        let outcome = self.repo.pull(&remote, &self.credential)?;
        match outcome {
            PullOutcome::FastForwarded => tracing::info!("Pulled new changes from {}.", remote),
            PullOutcome::UpToDate => tracing::info!("Already up to date."),
            PullOutcome::EmptyRemote => tracing::info!("Remote {} has no history yet.", remote),
        }

        Ok(Some(outcome))
    }

    fn push(&mut self) -> Result<bool> {
        let Some(remote) = self.default_remote()? else {
            tracing::info!("Not pushing: no remotes configured.");
            return Ok(false);
        };

        tracing::info!("Pushing changes to {}...", remote);
        self.repo.push(&remote, &self.credential)?;
        Ok(true)
    }

    /// Configured remote if present, otherwise the first one in name order
    fn default_remote(&self) -> Result<Option<String>> {
        let remotes = self.repo.remotes()?;

        if remotes.iter().any(|name| *name == self.config.remote) {
            return Ok(Some(self.config.remote.clone()));
        }

        let fallback = remotes.into_iter().next();
        if let Some(name) = &fallback {
            tracing::warn!(
                "Remote '{}' is not configured, using '{}' instead",
                self.config.remote,
                name
            );
        }
        Ok(fallback)
    }

    fn enter(&mut self, stage: Stage) {
        tracing::debug!("{} -> {}", self.stage, stage);
        self.stage = stage;
    }
}
