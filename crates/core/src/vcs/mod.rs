//! Version-control access.
//!
//! The decision engine never embeds subprocess details; everything it needs
//! from a repository goes through the narrow [`VersionControl`] trait. The
//! production implementation ([`git::GitVcs`]) shells out to `git` one query
//! at a time; [`memory::MemoryVcs`] is an in-memory fake that makes the
//! whole pipeline testable without a real repository.

pub mod git;
pub mod memory;

use std::path::Path;

use async_trait::async_trait;

use crate::errors::VcsError;
use crate::models::{CommitHistory, FileIdentity};

pub use git::GitVcs;
pub use memory::MemoryVcs;

/// Outcome of a merge/squash/rebase attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub conflicted: bool,
    pub conflicted_paths: Vec<String>,
}

impl MergeReport {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn conflicted(paths: Vec<String>) -> Self {
        Self {
            conflicted: true,
            conflicted_paths: paths,
        }
    }
}

/// The operations the core consumes from version control.
///
/// `repo` is the repository's working-directory path (or an arbitrary key
/// for fakes). Implementations must be safe to share across the bounded
/// analysis worker pool.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// All tracked files on `branch`, with content hash and last commit id.
    async fn list_tracked_files(
        &self,
        repo: &Path,
        branch: &str,
    ) -> Result<Vec<FileIdentity>, VcsError>;

    /// The commit history touching `path` on `branch`, newest first.
    async fn file_history(
        &self,
        repo: &Path,
        branch: &str,
        path: &str,
    ) -> Result<CommitHistory, VcsError>;

    /// Raw file content at a specific commit.
    async fn read_file_at_commit(
        &self,
        repo: &Path,
        commit_id: &str,
        path: &str,
    ) -> Result<Vec<u8>, VcsError>;

    /// Merge `branch` into the current working branch without committing.
    async fn attempt_merge(&self, repo: &Path, branch: &str) -> Result<MergeReport, VcsError>;

    /// Squash-merge `branch` into the current working branch (staged, not
    /// committed).
    async fn attempt_squash_merge(
        &self,
        repo: &Path,
        branch: &str,
    ) -> Result<MergeReport, VcsError>;

    /// Rebase the current working branch onto `branch`.
    async fn attempt_rebase(&self, repo: &Path, branch: &str) -> Result<MergeReport, VcsError>;

    /// Continue an in-progress rebase after conflicts were resolved.
    async fn continue_rebase(&self, repo: &Path) -> Result<MergeReport, VcsError>;

    /// Paths currently in conflicted (unmerged) state.
    async fn list_conflicts(&self, repo: &Path) -> Result<Vec<String>, VcsError>;

    /// Paths with staged (index) changes.
    async fn staged_files(&self, repo: &Path) -> Result<Vec<String>, VcsError>;

    /// Resolve a conflicted path by taking the working branch's side.
    async fn resolve_conflict_as_ours(&self, repo: &Path, path: &str) -> Result<(), VcsError>;

    /// Resolve a conflicted path by taking the incoming side.
    async fn resolve_conflict_as_theirs(&self, repo: &Path, path: &str) -> Result<(), VcsError>;

    /// Unstage `path` and remove it from the working tree.
    async fn unstage_and_remove(&self, repo: &Path, path: &str) -> Result<(), VcsError>;

    /// Commit staged changes. Returns `false` when nothing was staged.
    async fn commit(&self, repo: &Path, message: &str) -> Result<bool, VcsError>;

    /// Push the branch to its remote counterpart.
    async fn push(&self, repo: &Path, branch: &str) -> Result<(), VcsError>;
}
