//! The per-file analysis phase.
//!
//! Walks every file tracked by the boilerplate branch and produces one
//! [`FileAnalysis`] each: divergence, blob status, merge risk, customization
//! state, the optional three-way content probe and the binding merge action.
//! Files are analysed concurrently under a bounded semaphore; one file's
//! version-control failure never aborts the run.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::blob::compare_blobs;
use crate::errors::VcsError;
use crate::history::compare_histories;
use crate::models::{
    FileAnalysis, FileIdentity, MergeAction, MergeActionKind, MergeRisk, RecommendedCheck,
    ThreeWayOutcome,
};
use crate::risk;
use crate::settings::SyncSettings;
use crate::strategy::{self, RuleInput};
use crate::swizzle::{CustomizationRecord, SwizzleStore, SwizzleTracker};
use crate::threeway::{attempt_three_way_content_merge, is_binary_path};
use crate::vcs::VersionControl;

/// Everything one analysis pass produced.
#[derive(Debug)]
pub struct AnalysisOutcome {
    /// Per-file results, ordered by path.
    pub files: Vec<FileAnalysis>,
    /// Customizations detected this run, to be merged into the store.
    pub detected: Vec<CustomizationRecord>,
}

/// Runs the analysis phase for one boilerplate/fork pair.
pub struct Analyzer {
    vcs: Arc<dyn VersionControl>,
    tracker: SwizzleTracker,
    settings: SyncSettings,
}

impl Analyzer {
    pub fn new(vcs: Arc<dyn VersionControl>, tracker: SwizzleTracker, settings: SyncSettings) -> Self {
        Self {
            vcs,
            tracker,
            settings,
        }
    }

    /// Analyse every file tracked on the boilerplate branch.
    ///
    /// The store is read-only here; freshly detected customizations are
    /// returned in the outcome so the caller can merge and flush them once
    /// the run is over.
    pub async fn analyze(&self, store: &SwizzleStore) -> Result<AnalysisOutcome, VcsError> {
        let boiler_files = self
            .vcs
            .list_tracked_files(
                &self.settings.repos.boilerplate_path,
                &self.settings.repos.boilerplate_branch,
            )
            .await?;
        let fork_files = self
            .vcs
            .list_tracked_files(
                &self.settings.repos.fork_path,
                &self.settings.repos.fork_branch,
            )
            .await?;

        let fork_by_path: HashMap<String, FileIdentity> = fork_files
            .into_iter()
            .map(|f| (f.path.clone(), f))
            .collect();
        let fork_by_path = Arc::new(fork_by_path);
        let store = Arc::new(store.clone());
        let semaphore = Arc::new(Semaphore::new(self.settings.analysis.concurrency));

        info!(
            files = boiler_files.len(),
            concurrency = self.settings.analysis.concurrency,
            "starting analysis"
        );

        let mut handles = Vec::with_capacity(boiler_files.len());
        let mut identities = Vec::with_capacity(boiler_files.len());
        for boilerplate in boiler_files {
            let fork = fork_by_path.get(&boilerplate.path).cloned();
            identities.push((boilerplate.clone(), fork.clone()));

            let task = FileTask {
                vcs: Arc::clone(&self.vcs),
                tracker: self.tracker.clone(),
                store: Arc::clone(&store),
                boilerplate_path: self.settings.repos.boilerplate_path.clone(),
                boilerplate_branch: self.settings.repos.boilerplate_branch.clone(),
                fork_path: self.settings.repos.fork_path.clone(),
                fork_branch: self.settings.repos.fork_branch.clone(),
                binary_extensions: self.settings.analysis.binary_extensions.clone(),
            };
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                // Holding the permit for the task's whole body bounds how
                // many files are in flight at once. The semaphore is never
                // closed.
                let _permit = semaphore.acquire_owned().await.ok();
                task.analyze_file(boilerplate, fork).await
            }));
        }

        let mut files = Vec::with_capacity(handles.len());
        let mut detected = Vec::new();
        for (handle, (boilerplate, fork)) in handles.into_iter().zip(identities) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(VcsError::ParseError(format!("analysis task failed: {e}"))),
            };
            match result {
                Ok((analysis, new_record)) => {
                    detected.extend(new_record);
                    files.push(analysis);
                }
                Err(e) => {
                    // One file's failure never aborts the run; the file is
                    // surfaced as undetermined instead.
                    warn!(path = %boilerplate.path, error = %e, "file analysis failed");
                    files.push(failed_analysis(boilerplate, fork, &e));
                }
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        info!(
            analysed = files.len(),
            detected = detected.len(),
            "analysis complete"
        );
        Ok(AnalysisOutcome { files, detected })
    }
}

/// The per-file work unit, owning clones of everything it touches.
struct FileTask {
    vcs: Arc<dyn VersionControl>,
    tracker: SwizzleTracker,
    store: Arc<SwizzleStore>,
    boilerplate_path: PathBuf,
    boilerplate_branch: String,
    fork_path: PathBuf,
    fork_branch: String,
    binary_extensions: Vec<String>,
}

impl FileTask {
    async fn analyze_file(
        &self,
        boilerplate: FileIdentity,
        fork: Option<FileIdentity>,
    ) -> Result<(FileAnalysis, Option<CustomizationRecord>), VcsError> {
        let path = boilerplate.path.clone();

        let boiler_history = self
            .vcs
            .file_history(&self.boilerplate_path, &self.boilerplate_branch, &path)
            .await?;
        let fork_history = self
            .vcs
            .file_history(&self.fork_path, &self.fork_branch, &path)
            .await?;

        let divergence = compare_histories(&boiler_history, &fork_history);
        let blob = compare_blobs(&boilerplate, fork.as_ref());
        let risk = risk::classify(divergence.status, blob);

        let (swizzle, new_record) =
            self.tracker
                .evaluate(&self.store, &boilerplate, fork.as_ref(), &divergence, blob);

        let three_way = if risk.recommended_check == RecommendedCheck::ThreeWayMergeCheck {
            self.run_three_way_check(&boilerplate, fork.as_ref(), &divergence)
                .await?
        } else {
            ThreeWayOutcome::NotApplicable
        };

        let action = strategy::resolve(&RuleInput {
            boilerplate: &boilerplate,
            fork: fork.as_ref(),
            divergence: &divergence,
            blob,
            swizzle: &swizzle,
        });

        debug!(
            %path,
            status = %divergence.status,
            %blob,
            action = %action.kind,
            "file analysed"
        );

        Ok((
            FileAnalysis {
                path,
                boilerplate,
                fork,
                divergence,
                blob,
                risk,
                three_way,
                swizzle,
                action,
            },
            new_record,
        ))
    }

    /// The empirical content probe, run only when the classifier asked for
    /// it. Binary files and files without a shared ancestor are not
    /// checkable and come back `NotApplicable`.
    async fn run_three_way_check(
        &self,
        boilerplate: &FileIdentity,
        fork: Option<&FileIdentity>,
        divergence: &crate::models::DivergenceSummary,
    ) -> Result<ThreeWayOutcome, VcsError> {
        if is_binary_path(&boilerplate.path, &self.binary_extensions) {
            debug!(path = %boilerplate.path, "binary file, skipping content check");
            return Ok(ThreeWayOutcome::NotApplicable);
        }
        let (Some(ancestor_id), Some(fork)) = (&divergence.shared_ancestor_id, fork) else {
            return Ok(ThreeWayOutcome::NotApplicable);
        };

        let base = match self
            .vcs
            .read_file_at_commit(&self.boilerplate_path, ancestor_id, &boilerplate.path)
            .await
        {
            Ok(bytes) => bytes,
            Err(VcsError::PathNotFound { .. }) => return Ok(ThreeWayOutcome::NotApplicable),
            Err(e) => return Err(e),
        };
        let theirs = self
            .vcs
            .read_file_at_commit(
                &self.boilerplate_path,
                &boilerplate.last_commit_id,
                &boilerplate.path,
            )
            .await?;
        let ours = self
            .vcs
            .read_file_at_commit(&self.fork_path, &fork.last_commit_id, &fork.path)
            .await?;

        let check = attempt_three_way_content_merge(
            &String::from_utf8_lossy(&base),
            &String::from_utf8_lossy(&ours),
            &String::from_utf8_lossy(&theirs),
        );
        Ok(if check.clean {
            ThreeWayOutcome::Clean
        } else {
            ThreeWayOutcome::Conflicted
        })
    }
}

/// Placeholder analysis for a file whose version-control reads failed.
fn failed_analysis(
    boilerplate: FileIdentity,
    fork: Option<FileIdentity>,
    error: &VcsError,
) -> FileAnalysis {
    let blob = compare_blobs(&boilerplate, fork.as_ref());
    FileAnalysis {
        path: boilerplate.path.clone(),
        boilerplate,
        fork,
        // Histories are unknown; recorded as unrelated with unknown coverage.
        divergence: crate::models::DivergenceSummary {
            status: crate::models::DivergenceStatus::Unrelated,
            commits_ahead: 0,
            commits_behind: 0,
            shared_ancestor_id: None,
            last_synced_at: None,
            history_coverage: crate::models::HistoryCoverage::Unknown,
        },
        blob,
        risk: MergeRisk::unknown(),
        three_way: ThreeWayOutcome::NotApplicable,
        swizzle: crate::swizzle::SwizzleLookup::None,
        action: MergeAction::new(
            MergeActionKind::Undetermined,
            format!("analysis failed: {error}"),
        ),
    }
}
