//! The merge/resolution state machine.
//!
//! Runs strictly sequentially after analysis: one merge (or squash, or
//! rebase) attempt in the fork checkout, automatic conflict resolution from
//! the per-file merge actions, a blocking operator confirmation loop for
//! whatever remains, then commit and push. An operator abort stops before
//! any commit or push and leaves the repository in its conflicted,
//! recoverable state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::SyncError;
use crate::models::{FileAnalysis, MergeAction, MergeActionKind, SyncResult, SyncStatus};
use crate::settings::SyncSettings;
use crate::vcs::{MergeReport, VersionControl};

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Where a sync run currently is. Transitions are logged, never skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    MergeAttempted,
    Clean,
    ConflictPending,
    ResolvingConflicts,
    Resolved,
    AwaitingHuman,
    Finalizing,
    Done,
    Aborted,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::MergeAttempted => "merge_attempted",
            Self::Clean => "clean",
            Self::ConflictPending => "conflict_pending",
            Self::ResolvingConflicts => "resolving_conflicts",
            Self::Resolved => "resolved",
            Self::AwaitingHuman => "awaiting_human",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// Human confirmation gate
// ---------------------------------------------------------------------------

/// Blocking operator decision point for conflicts no rule could resolve.
///
/// `true` means "I have resolved these by hand, re-scan"; `false` aborts the
/// run. There is no timeout: the run waits as long as the operator does.
pub trait ConfirmGate: Send + Sync {
    fn confirm_resolved(&self, unresolved: &[String]) -> Result<bool, SyncError>;
}

/// A gate with a fixed answer, for non-interactive runs.
#[derive(Debug, Clone, Copy)]
pub struct AutoGate {
    pub answer: bool,
}

impl ConfirmGate for AutoGate {
    fn confirm_resolved(&self, unresolved: &[String]) -> Result<bool, SyncError> {
        info!(
            unresolved = unresolved.len(),
            answer = self.answer,
            "non-interactive gate"
        );
        Ok(self.answer)
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// Which merge primitive the run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncWorkflow {
    /// A regular `--no-commit` merge.
    Merge,
    /// A squash merge: upstream changes staged as one commit.
    Squash,
    /// A rebase of the fork branch onto the upstream ref; may stop on
    /// conflicts repeatedly.
    Rebase,
}

impl std::fmt::Display for SyncWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Merge => write!(f, "merge"),
            Self::Squash => write!(f, "squash"),
            Self::Rebase => write!(f, "rebase"),
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives one sync run in the fork checkout.
pub struct SyncOrchestrator {
    vcs: Arc<dyn VersionControl>,
    gate: Arc<dyn ConfirmGate>,
    settings: SyncSettings,
}

impl SyncOrchestrator {
    pub fn new(
        vcs: Arc<dyn VersionControl>,
        gate: Arc<dyn ConfirmGate>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            vcs,
            gate,
            settings,
        }
    }

    /// Merge-based sync: the default workflow.
    pub async fn run_sync(&self, analyses: &[FileAnalysis]) -> Result<SyncResult, SyncError> {
        self.run(SyncWorkflow::Merge, analyses).await
    }

    /// Squash workflow: upstream changes land as a single fork commit.
    pub async fn run_squash(&self, analyses: &[FileAnalysis]) -> Result<SyncResult, SyncError> {
        self.run(SyncWorkflow::Squash, analyses).await
    }

    /// Rebase workflow: replay fork commits on top of the upstream ref.
    pub async fn run_rebase(&self, analyses: &[FileAnalysis]) -> Result<SyncResult, SyncError> {
        self.run(SyncWorkflow::Rebase, analyses).await
    }

    async fn run(
        &self,
        workflow: SyncWorkflow,
        analyses: &[FileAnalysis],
    ) -> Result<SyncResult, SyncError> {
        let fork = self.settings.repos.fork_path.clone();
        let source = self.settings.merge_source();
        let actions: HashMap<&str, &MergeAction> = analyses
            .iter()
            .map(|a| (a.path.as_str(), &a.action))
            .collect();

        let mut phase = SyncPhase::Idle;
        let mut auto_resolved = 0usize;
        let mut resolved_paths: HashSet<String> = HashSet::new();

        advance(&mut phase, SyncPhase::MergeAttempted);
        info!(%workflow, %source, "starting sync run");
        let mut report = match workflow {
            SyncWorkflow::Merge => self.vcs.attempt_merge(&fork, &source).await,
            SyncWorkflow::Squash => self.vcs.attempt_squash_merge(&fork, &source).await,
            SyncWorkflow::Rebase => self.vcs.attempt_rebase(&fork, &source).await,
        }
        .map_err(|e| SyncError::MergeFailed(e.to_string()))?;

        // A rebase can stop on conflicts once per replayed commit, so the
        // resolution phase runs in a loop; merge and squash pass through it
        // at most once.
        while report.conflicted {
            advance(&mut phase, SyncPhase::ConflictPending);
            match self
                .resolve_conflicts(&mut phase, &actions, &mut auto_resolved, &mut resolved_paths)
                .await?
            {
                ResolutionOutcome::Resolved => {}
                ResolutionOutcome::Aborted(unresolved) => {
                    advance(&mut phase, SyncPhase::Aborted);
                    warn!(
                        unresolved = unresolved.len(),
                        "operator aborted; nothing committed or pushed"
                    );
                    return Ok(SyncResult {
                        status: SyncStatus::Aborted,
                        unresolved_paths: unresolved,
                        auto_resolved,
                        pushed: false,
                    });
                }
            }
            report = match workflow {
                SyncWorkflow::Rebase => self
                    .vcs
                    .continue_rebase(&fork)
                    .await
                    .map_err(|e| SyncError::MergeFailed(e.to_string()))?,
                _ => MergeReport::clean(),
            };
        }

        if phase == SyncPhase::MergeAttempted {
            advance(&mut phase, SyncPhase::Clean);
        }
        // Files that merged without conflict carry the merge's default
        // outcome either way; paths already resolved from their action above
        // must not be touched again.
        self.enforce_non_default_actions(analyses, &resolved_paths)
            .await?;

        advance(&mut phase, SyncPhase::Finalizing);
        // A rebase rewrites commits as it goes; merge and squash leave the
        // result staged and need an explicit commit.
        if workflow != SyncWorkflow::Rebase {
            let committed = self
                .vcs
                .commit(&fork, &self.settings.sync.commit_message)
                .await
                .map_err(|e| SyncError::CommitFailed(e.to_string()))?;
            debug!(committed, "finalize commit");
        }
        let pushed = if self.settings.sync.push {
            let branch = &self.settings.repos.fork_branch;
            self.vcs.push(&fork, branch).await.map_err(|e| {
                SyncError::PushFailed {
                    branch: branch.clone(),
                    detail: e.to_string(),
                }
            })?;
            true
        } else {
            info!("push disabled, leaving result local");
            false
        };

        advance(&mut phase, SyncPhase::Done);
        Ok(SyncResult {
            status: SyncStatus::Done,
            unresolved_paths: Vec::new(),
            auto_resolved,
            pushed,
        })
    }

    /// Resolve the current conflict set from the merge actions, then loop
    /// through the operator gate until nothing is left or the run is
    /// aborted.
    async fn resolve_conflicts(
        &self,
        phase: &mut SyncPhase,
        actions: &HashMap<&str, &MergeAction>,
        auto_resolved: &mut usize,
        resolved_paths: &mut HashSet<String>,
    ) -> Result<ResolutionOutcome, SyncError> {
        let fork = &self.settings.repos.fork_path;
        loop {
            advance(phase, SyncPhase::ResolvingConflicts);
            for path in self.vcs.list_conflicts(fork).await? {
                let Some(action) = actions.get(path.as_str()) else {
                    debug!(%path, "conflicted path has no analysis, leaving for operator");
                    continue;
                };
                match action.kind {
                    MergeActionKind::KeepFork => {
                        self.vcs.resolve_conflict_as_ours(fork, &path).await?;
                        *auto_resolved += 1;
                    }
                    MergeActionKind::KeepBoilerplate => {
                        self.vcs.resolve_conflict_as_theirs(fork, &path).await?;
                        *auto_resolved += 1;
                    }
                    MergeActionKind::DropFromFork => {
                        self.vcs.unstage_and_remove(fork, &path).await?;
                        *auto_resolved += 1;
                    }
                    // The fork deliberately replaced this content; keeping
                    // the fork side drops the boilerplate's version.
                    MergeActionKind::DropFromBoilerplate => {
                        self.vcs.resolve_conflict_as_ours(fork, &path).await?;
                        *auto_resolved += 1;
                    }
                    MergeActionKind::Manual | MergeActionKind::Undetermined => {
                        debug!(%path, action = %action.kind, "left for operator");
                        continue;
                    }
                }
                resolved_paths.insert(path);
            }

            let remaining = self.vcs.list_conflicts(fork).await?;
            if remaining.is_empty() {
                advance(phase, SyncPhase::Resolved);
                return Ok(ResolutionOutcome::Resolved);
            }

            advance(phase, SyncPhase::AwaitingHuman);
            info!(unresolved = remaining.len(), "waiting for operator");
            if !self.gate.confirm_resolved(&remaining)? {
                return Ok(ResolutionOutcome::Aborted(remaining));
            }
            // Operator claims the remaining paths are handled; re-scan.
        }
    }

    /// Staged files still carry the merge's default outcome, even when other
    /// paths conflicted. Actions a merge does not produce by itself are
    /// applied here; paths in `resolved_paths` already got their action
    /// during conflict resolution and are no longer in a conflicted index
    /// state.
    async fn enforce_non_default_actions(
        &self,
        analyses: &[FileAnalysis],
        resolved_paths: &HashSet<String>,
    ) -> Result<(), SyncError> {
        let fork = &self.settings.repos.fork_path;
        let staged: HashSet<String> =
            self.vcs.staged_files(fork).await?.into_iter().collect();

        for analysis in analyses {
            if !analysis.action.is_non_default()
                || !staged.contains(&analysis.path)
                || resolved_paths.contains(&analysis.path)
            {
                continue;
            }
            info!(
                path = %analysis.path,
                action = %analysis.action.kind,
                "enforcing action on staged file"
            );
            match analysis.action.kind {
                MergeActionKind::KeepBoilerplate => {
                    self.vcs
                        .resolve_conflict_as_theirs(fork, &analysis.path)
                        .await?;
                }
                MergeActionKind::DropFromFork => {
                    self.vcs.unstage_and_remove(fork, &analysis.path).await?;
                }
                MergeActionKind::DropFromBoilerplate => {
                    self.vcs
                        .resolve_conflict_as_ours(fork, &analysis.path)
                        .await?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

enum ResolutionOutcome {
    Resolved,
    Aborted(Vec<String>),
}

fn advance(phase: &mut SyncPhase, next: SyncPhase) {
    debug!(from = %phase, to = %next, "phase transition");
    *phase = next;
}
