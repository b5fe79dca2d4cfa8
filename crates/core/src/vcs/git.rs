//! Subprocess-per-query `git` access.
//!
//! Each trait operation maps to one or two `git` invocations via
//! `tokio::process`. Exit codes and stderr are surfaced verbatim in
//! [`VcsError::CommandFailed`]; a merge/rebase that stops on conflicts is a
//! normal [`MergeReport`], not an error.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use super::{MergeReport, VersionControl};
use crate::errors::VcsError;
use crate::models::{CommitHistory, CommitRecord, FileIdentity};

/// Version-control access backed by the `git` CLI.
#[derive(Debug, Clone)]
pub struct GitVcs {
    remote: String,
}

impl GitVcs {
    /// Create a client pushing to `remote` (usually `origin`).
    pub fn new(remote: impl Into<String>) -> Self {
        let client = Self {
            remote: remote.into(),
        };
        info!(remote = %client.remote, "created GitVcs");
        client
    }

    async fn run_git_raw(
        &self,
        repo: &Path,
        args: &[&str],
    ) -> Result<(i32, Vec<u8>, String), VcsError> {
        let mut cmd = Command::new("git");
        cmd.current_dir(repo)
            .args(args)
            .env("GIT_EDITOR", "true")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(cmd = %format!("git {}", args.join(" ")), repo = %repo.display(), "running git");
        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VcsError::BinaryNotFound("git".into())
            } else {
                VcsError::IoError(e)
            }
        })?;

        let exit_code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        Ok((exit_code, output.stdout, stderr))
    }

    /// Run git and fail on any non-zero exit.
    async fn run_git(&self, repo: &Path, args: &[&str]) -> Result<Vec<u8>, VcsError> {
        let (exit_code, stdout, stderr) = self.run_git_raw(repo, args).await?;
        if exit_code != 0 {
            warn!(exit_code, %stderr, "git command failed");
            return Err(VcsError::CommandFailed { exit_code, stderr });
        }
        Ok(stdout)
    }

    async fn run_git_text(&self, repo: &Path, args: &[&str]) -> Result<String, VcsError> {
        let stdout = self.run_git(repo, args).await?;
        Ok(String::from_utf8_lossy(&stdout).to_string())
    }

    /// Run a merge-family command where a conflicted stop is expected: a
    /// non-zero exit with unmerged paths is a conflict report, anything else
    /// non-zero is a real failure.
    async fn run_merge_family(&self, repo: &Path, args: &[&str]) -> Result<MergeReport, VcsError> {
        let (exit_code, _stdout, stderr) = self.run_git_raw(repo, args).await?;
        if exit_code == 0 {
            return Ok(MergeReport::clean());
        }
        let conflicts = self.list_conflicts(repo).await?;
        if conflicts.is_empty() {
            warn!(exit_code, %stderr, "merge-family command failed without conflicts");
            return Err(VcsError::CommandFailed { exit_code, stderr });
        }
        Ok(MergeReport::conflicted(conflicts))
    }

    /// First commit (newest-first) that touched each path on `branch`, from
    /// a single whole-branch log walk.
    async fn last_commit_by_path(
        &self,
        repo: &Path,
        branch: &str,
    ) -> Result<HashMap<String, String>, VcsError> {
        let output = self
            .run_git_text(repo, &["log", branch, "--pretty=format:%H", "--name-only"])
            .await?;

        let mut map: HashMap<String, String> = HashMap::new();
        let mut current: Option<String> = None;
        for line in output.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            if is_commit_id(line) {
                current = Some(line.to_string());
            } else if let Some(commit) = &current {
                map.entry(line.to_string()).or_insert_with(|| commit.clone());
            }
        }
        Ok(map)
    }
}

/// A full hex object id on a line of its own.
fn is_commit_id(line: &str) -> bool {
    (line.len() == 40 || line.len() == 64) && line.bytes().all(|b| b.is_ascii_hexdigit())
}

fn parse_history_line(line: &str) -> Result<CommitRecord, VcsError> {
    let (commit_id, epoch) = line
        .split_once(' ')
        .ok_or_else(|| VcsError::ParseError(format!("malformed log line: {line:?}")))?;
    let secs: i64 = epoch
        .trim()
        .parse()
        .map_err(|_| VcsError::ParseError(format!("bad commit timestamp: {line:?}")))?;
    let timestamp = Utc
        .timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| VcsError::ParseError(format!("timestamp out of range: {line:?}")))?;
    Ok(CommitRecord {
        commit_id: commit_id.to_string(),
        timestamp,
    })
}

#[async_trait]
impl VersionControl for GitVcs {
    #[instrument(skip(self), fields(repo = %repo.display()))]
    async fn list_tracked_files(
        &self,
        repo: &Path,
        branch: &str,
    ) -> Result<Vec<FileIdentity>, VcsError> {
        let tree = self
            .run_git_text(repo, &["ls-tree", "-r", "--full-tree", branch])
            .await?;
        let last_commits = self.last_commit_by_path(repo, branch).await?;
        let head = self
            .run_git_text(repo, &["rev-parse", branch])
            .await?
            .trim()
            .to_string();

        let mut files = Vec::new();
        for line in tree.lines() {
            // "<mode> <type> <oid>\t<path>"
            let Some((meta, path)) = line.split_once('\t') else {
                return Err(VcsError::ParseError(format!("malformed ls-tree line: {line:?}")));
            };
            let mut fields = meta.split_whitespace();
            let _mode = fields.next();
            let obj_type = fields.next().unwrap_or_default();
            let oid = fields
                .next()
                .ok_or_else(|| VcsError::ParseError(format!("malformed ls-tree line: {line:?}")))?;
            if obj_type != "blob" {
                continue;
            }
            let last_commit_id = last_commits.get(path).cloned().unwrap_or_else(|| head.clone());
            files.push(FileIdentity {
                path: path.to_string(),
                content_hash: oid.to_string(),
                last_commit_id,
            });
        }
        debug!(count = files.len(), "listed tracked files");
        Ok(files)
    }

    async fn file_history(
        &self,
        repo: &Path,
        branch: &str,
        path: &str,
    ) -> Result<CommitHistory, VcsError> {
        let output = self
            .run_git_text(repo, &["log", branch, "--pretty=format:%H %ct", "--", path])
            .await?;
        output
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(parse_history_line)
            .collect()
    }

    async fn read_file_at_commit(
        &self,
        repo: &Path,
        commit_id: &str,
        path: &str,
    ) -> Result<Vec<u8>, VcsError> {
        let spec = format!("{commit_id}:{path}");
        match self.run_git(repo, &["show", &spec]).await {
            Ok(bytes) => Ok(bytes),
            Err(VcsError::CommandFailed { stderr, .. })
                if stderr.contains("does not exist") || stderr.contains("exists on disk, but not in") =>
            {
                Err(VcsError::PathNotFound {
                    commit_id: commit_id.to_string(),
                    path: path.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(repo = %repo.display()))]
    async fn attempt_merge(&self, repo: &Path, branch: &str) -> Result<MergeReport, VcsError> {
        info!(branch, "attempting merge without auto-commit");
        self.run_merge_family(repo, &["merge", "--no-commit", "--no-ff", branch])
            .await
    }

    #[instrument(skip(self), fields(repo = %repo.display()))]
    async fn attempt_squash_merge(
        &self,
        repo: &Path,
        branch: &str,
    ) -> Result<MergeReport, VcsError> {
        info!(branch, "attempting squash merge");
        self.run_merge_family(repo, &["merge", "--squash", branch]).await
    }

    #[instrument(skip(self), fields(repo = %repo.display()))]
    async fn attempt_rebase(&self, repo: &Path, branch: &str) -> Result<MergeReport, VcsError> {
        info!(branch, "attempting rebase");
        self.run_merge_family(repo, &["rebase", branch]).await
    }

    async fn continue_rebase(&self, repo: &Path) -> Result<MergeReport, VcsError> {
        self.run_merge_family(repo, &["rebase", "--continue"]).await
    }

    async fn list_conflicts(&self, repo: &Path) -> Result<Vec<String>, VcsError> {
        let output = self
            .run_git_text(repo, &["diff", "--name-only", "--diff-filter=U"])
            .await?;
        Ok(output.lines().filter(|l| !l.is_empty()).map(String::from).collect())
    }

    async fn staged_files(&self, repo: &Path) -> Result<Vec<String>, VcsError> {
        let output = self
            .run_git_text(repo, &["diff", "--cached", "--name-only"])
            .await?;
        Ok(output.lines().filter(|l| !l.is_empty()).map(String::from).collect())
    }

    async fn resolve_conflict_as_ours(&self, repo: &Path, path: &str) -> Result<(), VcsError> {
        self.run_git(repo, &["checkout", "--ours", "--", path]).await?;
        self.run_git(repo, &["add", "--", path]).await?;
        debug!(path, "resolved conflict as ours");
        Ok(())
    }

    async fn resolve_conflict_as_theirs(&self, repo: &Path, path: &str) -> Result<(), VcsError> {
        self.run_git(repo, &["checkout", "--theirs", "--", path]).await?;
        self.run_git(repo, &["add", "--", path]).await?;
        debug!(path, "resolved conflict as theirs");
        Ok(())
    }

    async fn unstage_and_remove(&self, repo: &Path, path: &str) -> Result<(), VcsError> {
        self.run_git(repo, &["rm", "--force", "--", path]).await?;
        debug!(path, "unstaged and removed");
        Ok(())
    }

    async fn commit(&self, repo: &Path, message: &str) -> Result<bool, VcsError> {
        // Exit 0 means the index matches HEAD: nothing to commit.
        let (exit_code, _, _) = self
            .run_git_raw(repo, &["diff", "--cached", "--quiet"])
            .await?;
        if exit_code == 0 {
            debug!("nothing staged, skipping commit");
            return Ok(false);
        }
        self.run_git(repo, &["commit", "-m", message]).await?;
        info!("created commit");
        Ok(true)
    }

    #[instrument(skip(self), fields(repo = %repo.display()))]
    async fn push(&self, repo: &Path, branch: &str) -> Result<(), VcsError> {
        self.run_git(repo, &["push", &self.remote, branch]).await?;
        info!(branch, remote = %self.remote, "pushed");
        Ok(())
    }
}
