//! In-memory fake version-control backend.
//!
//! Lets the analysis pipeline and the orchestrator run against scripted
//! repository state: files with histories and hashes, canned merge reports,
//! and per-path failure injection. Every mutating call is appended to an
//! operation log so tests can assert exactly what the orchestrator did.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use super::{MergeReport, VersionControl};
use crate::errors::VcsError;
use crate::models::{CommitHistory, CommitRecord, FileIdentity};

#[derive(Debug, Default)]
struct FakeFile {
    content_hash: String,
    history: CommitHistory,
    /// Deleted files keep their log but leave the tree listing, as git does.
    deleted: bool,
}

#[derive(Debug, Default)]
struct FakeRepo {
    /// branch -> path -> file state.
    branches: HashMap<String, BTreeMap<String, FakeFile>>,
    /// (commit, path) -> content.
    contents: HashMap<(String, String), Vec<u8>>,
    /// Reports handed out by merge-family calls, in order. Empty = clean.
    scripted_reports: VecDeque<MergeReport>,
    current_conflicts: BTreeSet<String>,
    staged: Vec<String>,
    /// Paths whose history reads fail, for isolation tests.
    fail_history: HashSet<String>,
    /// Fail merge/squash/rebase attempts outright (not a conflicted stop).
    fail_merge: bool,
    /// Fail pushes.
    fail_push: bool,
}

/// Scripted in-memory implementation of [`VersionControl`].
#[derive(Debug, Default)]
pub struct MemoryVcs {
    repos: Mutex<HashMap<PathBuf, FakeRepo>>,
    ops: Mutex<Vec<String>>,
}

impl MemoryVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with its newest-first history given as `(commit_id,
    /// epoch_secs)` pairs.
    pub fn add_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        content_hash: &str,
        history: &[(&str, i64)],
    ) {
        let mut repos = self.repos.lock().unwrap();
        let file = FakeFile {
            content_hash: content_hash.to_string(),
            history: history
                .iter()
                .map(|(id, secs)| CommitRecord {
                    commit_id: id.to_string(),
                    timestamp: Utc.timestamp_opt(*secs, 0).unwrap(),
                })
                .collect(),
            deleted: false,
        };
        repos
            .entry(PathBuf::from(repo))
            .or_default()
            .branches
            .entry(branch.to_string())
            .or_default()
            .insert(path.to_string(), file);
    }

    /// Mark `path` as deleted on `branch`: gone from the tree listing, log
    /// preserved.
    pub fn delete_file(&self, repo: &str, branch: &str, path: &str) {
        let mut repos = self.repos.lock().unwrap();
        if let Some(file) = repos
            .entry(PathBuf::from(repo))
            .or_default()
            .branches
            .entry(branch.to_string())
            .or_default()
            .get_mut(path)
        {
            file.deleted = true;
        }
    }

    /// Script the content of `path` at `commit`.
    pub fn set_content(&self, repo: &str, commit: &str, path: &str, content: &[u8]) {
        let mut repos = self.repos.lock().unwrap();
        repos
            .entry(PathBuf::from(repo))
            .or_default()
            .contents
            .insert((commit.to_string(), path.to_string()), content.to_vec());
    }

    /// Queue the report the next merge/squash/rebase attempt returns.
    pub fn script_report(&self, repo: &str, report: MergeReport) {
        let mut repos = self.repos.lock().unwrap();
        repos
            .entry(PathBuf::from(repo))
            .or_default()
            .scripted_reports
            .push_back(report);
    }

    /// Script the set of staged paths (as after a clean merge).
    pub fn script_staged(&self, repo: &str, paths: &[&str]) {
        let mut repos = self.repos.lock().unwrap();
        repos.entry(PathBuf::from(repo)).or_default().staged =
            paths.iter().map(|p| p.to_string()).collect();
    }

    /// Clear a conflict without going through the trait, as if the operator
    /// fixed the file by hand.
    pub fn resolve_externally(&self, repo: &str, path: &str) {
        let mut repos = self.repos.lock().unwrap();
        let r = repos.entry(PathBuf::from(repo)).or_default();
        r.current_conflicts.remove(path);
        r.staged.push(path.to_string());
    }

    /// Make merge/squash/rebase attempts fail outright, as opposed to
    /// stopping on conflicts.
    pub fn fail_merge(&self, repo: &str) {
        let mut repos = self.repos.lock().unwrap();
        repos.entry(PathBuf::from(repo)).or_default().fail_merge = true;
    }

    /// Make pushes fail.
    pub fn fail_push(&self, repo: &str) {
        let mut repos = self.repos.lock().unwrap();
        repos.entry(PathBuf::from(repo)).or_default().fail_push = true;
    }

    /// Make history reads for `path` fail.
    pub fn fail_history(&self, repo: &str, path: &str) {
        let mut repos = self.repos.lock().unwrap();
        repos
            .entry(PathBuf::from(repo))
            .or_default()
            .fail_history
            .insert(path.to_string());
    }

    /// Everything mutating the fake has done, in call order.
    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn log(&self, op: String) {
        self.ops.lock().unwrap().push(op);
    }

    fn with_repo<T>(
        &self,
        repo: &Path,
        f: impl FnOnce(&mut FakeRepo) -> T,
    ) -> T {
        let mut repos = self.repos.lock().unwrap();
        f(repos.entry(repo.to_path_buf()).or_default())
    }

    fn next_report(&self, repo: &Path) -> Result<MergeReport, VcsError> {
        self.with_repo(repo, |r| {
            if r.fail_merge {
                return Err(VcsError::CommandFailed {
                    exit_code: 128,
                    stderr: "scripted merge failure".into(),
                });
            }
            let report = r.scripted_reports.pop_front().unwrap_or_default();
            r.current_conflicts = report.conflicted_paths.iter().cloned().collect();
            Ok(report)
        })
    }
}

#[async_trait]
impl VersionControl for MemoryVcs {
    async fn list_tracked_files(
        &self,
        repo: &Path,
        branch: &str,
    ) -> Result<Vec<FileIdentity>, VcsError> {
        Ok(self.with_repo(repo, |r| {
            r.branches
                .get(branch)
                .map(|files| {
                    files
                        .iter()
                        .filter(|(_, f)| !f.deleted)
                        .map(|(path, f)| FileIdentity {
                            path: path.clone(),
                            content_hash: f.content_hash.clone(),
                            last_commit_id: f
                                .history
                                .first()
                                .map(|c| c.commit_id.clone())
                                .unwrap_or_default(),
                        })
                        .collect()
                })
                .unwrap_or_default()
        }))
    }

    async fn file_history(
        &self,
        repo: &Path,
        branch: &str,
        path: &str,
    ) -> Result<CommitHistory, VcsError> {
        self.with_repo(repo, |r| {
            if r.fail_history.contains(path) {
                return Err(VcsError::CommandFailed {
                    exit_code: 128,
                    stderr: format!("scripted failure reading history of {path}"),
                });
            }
            Ok(r.branches
                .get(branch)
                .and_then(|files| files.get(path))
                .map(|f| f.history.clone())
                .unwrap_or_default())
        })
    }

    async fn read_file_at_commit(
        &self,
        repo: &Path,
        commit_id: &str,
        path: &str,
    ) -> Result<Vec<u8>, VcsError> {
        self.with_repo(repo, |r| {
            r.contents
                .get(&(commit_id.to_string(), path.to_string()))
                .cloned()
                .ok_or_else(|| VcsError::PathNotFound {
                    commit_id: commit_id.to_string(),
                    path: path.to_string(),
                })
        })
    }

    async fn attempt_merge(&self, repo: &Path, branch: &str) -> Result<MergeReport, VcsError> {
        self.log(format!("merge:{branch}"));
        self.next_report(repo)
    }

    async fn attempt_squash_merge(
        &self,
        repo: &Path,
        branch: &str,
    ) -> Result<MergeReport, VcsError> {
        self.log(format!("squash:{branch}"));
        self.next_report(repo)
    }

    async fn attempt_rebase(&self, repo: &Path, branch: &str) -> Result<MergeReport, VcsError> {
        self.log(format!("rebase:{branch}"));
        self.next_report(repo)
    }

    async fn continue_rebase(&self, repo: &Path) -> Result<MergeReport, VcsError> {
        self.log("rebase-continue".into());
        self.next_report(repo)
    }

    async fn list_conflicts(&self, repo: &Path) -> Result<Vec<String>, VcsError> {
        Ok(self.with_repo(repo, |r| r.current_conflicts.iter().cloned().collect()))
    }

    async fn staged_files(&self, repo: &Path) -> Result<Vec<String>, VcsError> {
        Ok(self.with_repo(repo, |r| r.staged.clone()))
    }

    async fn resolve_conflict_as_ours(&self, repo: &Path, path: &str) -> Result<(), VcsError> {
        self.log(format!("resolve-ours:{path}"));
        self.with_repo(repo, |r| {
            r.current_conflicts.remove(path);
            r.staged.push(path.to_string());
        });
        Ok(())
    }

    async fn resolve_conflict_as_theirs(&self, repo: &Path, path: &str) -> Result<(), VcsError> {
        self.log(format!("resolve-theirs:{path}"));
        self.with_repo(repo, |r| {
            r.current_conflicts.remove(path);
            r.staged.push(path.to_string());
        });
        Ok(())
    }

    async fn unstage_and_remove(&self, repo: &Path, path: &str) -> Result<(), VcsError> {
        self.log(format!("remove:{path}"));
        self.with_repo(repo, |r| {
            r.current_conflicts.remove(path);
            r.staged.retain(|p| p != path);
        });
        Ok(())
    }

    async fn commit(&self, repo: &Path, message: &str) -> Result<bool, VcsError> {
        let committed = self.with_repo(repo, |r| {
            let committed = !r.staged.is_empty();
            r.staged.clear();
            committed
        });
        if committed {
            self.log(format!("commit:{message}"));
        }
        Ok(committed)
    }

    async fn push(&self, repo: &Path, branch: &str) -> Result<(), VcsError> {
        self.with_repo(repo, |r| {
            if r.fail_push {
                return Err(VcsError::CommandFailed {
                    exit_code: 1,
                    stderr: "scripted push failure".into(),
                });
            }
            Ok(())
        })?;
        self.log(format!("push:{branch}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_and_history() {
        let vcs = MemoryVcs::new();
        vcs.add_file("boiler", "main", "src/a.rs", "h1", &[("c2", 200), ("c1", 100)]);

        let files = vcs
            .list_tracked_files(Path::new("boiler"), "main")
            .await
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].last_commit_id, "c2");

        let history = vcs
            .file_history(Path::new("boiler"), "main", "src/a.rs")
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].commit_id, "c2");
    }

    #[tokio::test]
    async fn test_scripted_merge_and_resolution() {
        let vcs = MemoryVcs::new();
        vcs.script_report(
            "fork",
            MergeReport::conflicted(vec!["a.rs".into(), "b.rs".into()]),
        );

        let repo = Path::new("fork");
        let report = vcs.attempt_merge(repo, "upstream").await.unwrap();
        assert!(report.conflicted);

        vcs.resolve_conflict_as_ours(repo, "a.rs").await.unwrap();
        assert_eq!(vcs.list_conflicts(repo).await.unwrap(), vec!["b.rs"]);

        vcs.unstage_and_remove(repo, "b.rs").await.unwrap();
        assert!(vcs.list_conflicts(repo).await.unwrap().is_empty());

        assert!(vcs.commit(repo, "sync").await.unwrap());
        assert_eq!(
            vcs.ops(),
            vec!["merge:upstream", "resolve-ours:a.rs", "remove:b.rs", "commit:sync"]
        );
    }

    #[tokio::test]
    async fn test_history_failure_injection() {
        let vcs = MemoryVcs::new();
        vcs.add_file("boiler", "main", "bad.rs", "h1", &[("c1", 100)]);
        vcs.fail_history("boiler", "bad.rs");

        let result = vcs.file_history(Path::new("boiler"), "main", "bad.rs").await;
        assert!(matches!(result, Err(VcsError::CommandFailed { .. })));
    }
}
