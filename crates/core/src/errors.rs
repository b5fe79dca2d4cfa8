//! Error types for the boilersync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.
//!
//! Two conditions deliberately do *not* appear here: missing data (no fork
//! file, no shared ancestor) is a classification input carried in the data
//! model, and unresolved conflicts drive the orchestrator's awaiting-human
//! state instead of failing.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error(transparent)]
    Swizzle(#[from] SwizzleError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

// ---------------------------------------------------------------------------
// Version-control errors
// ---------------------------------------------------------------------------

/// Errors from version-control access (subprocess `git` or a fake).
///
/// During the analysis phase these are isolated per file: one file's failure
/// marks that file `undetermined` and the run continues.
#[derive(Debug, Error)]
pub enum VcsError {
    /// The `git` binary was not found on `$PATH`.
    #[error("git binary not found: {0}")]
    BinaryNotFound(String),

    /// A `git` command exited with a non-zero status.
    #[error("git command failed (exit {exit_code}): {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    /// Command output was not in the expected shape.
    #[error("failed to parse git output: {0}")]
    ParseError(String),

    /// The requested path does not exist at the given commit.
    #[error("path '{path}' not found at commit {commit_id}")]
    PathNotFound { commit_id: String, path: String },

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Customization store errors
// ---------------------------------------------------------------------------

/// Errors from the persisted customization (swizzle) store.
#[derive(Debug, Error)]
pub enum SwizzleError {
    /// The store document could not be parsed.
    #[error("swizzle store parse error at '{path}': {detail}")]
    ParseError { path: String, detail: String },

    /// The store document carries a schema version this build cannot read.
    #[error("unsupported swizzle store schema version {found} (supported: {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },

    /// Serialization failure when writing the store.
    #[error("swizzle store serialize error: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Generic I/O wrapper.
    #[error("swizzle store I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from settings loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings file not found.
    #[error("settings file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("settings parse error: {0}")]
    ParseError(String),

    /// A settings value is invalid.
    #[error("invalid settings value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the settings file.
    #[error("settings I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Sync orchestration errors
// ---------------------------------------------------------------------------

/// Errors from the sync orchestrator.
///
/// Orchestration failures are fatal to the current run and leave the
/// repository in an inspectable state; they are never silently retried.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The merge/squash/rebase invocation itself failed (not a conflict).
    #[error("merge attempt failed: {0}")]
    MergeFailed(String),

    /// Committing the staged result failed.
    #[error("commit failed: {0}")]
    CommitFailed(String),

    /// Pushing to the remote failed.
    #[error("push to '{branch}' failed: {detail}")]
    PushFailed { branch: String, detail: String },

    /// Underlying version-control error during orchestration.
    #[error("sync VCS error: {0}")]
    Vcs(#[from] VcsError),

    /// The human-confirmation gate itself failed (I/O on the prompt).
    #[error("confirmation gate error: {0}")]
    GateFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = VcsError::CommandFailed {
            exit_code: 128,
            stderr: "not a git repository".into(),
        };
        assert_eq!(
            err.to_string(),
            "git command failed (exit 128): not a git repository"
        );

        let err = SwizzleError::UnsupportedSchema {
            found: 9,
            supported: 1,
        };
        assert!(err.to_string().contains("schema version 9"));

        let err = ConfigError::InvalidValue {
            field: "analysis.concurrency".into(),
            detail: "must be > 0".into(),
        };
        assert!(err.to_string().contains("analysis.concurrency"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let vcs_err = VcsError::BinaryNotFound("git".into());
        let core_err: CoreError = vcs_err.into();
        assert!(matches!(core_err, CoreError::Vcs(_)));

        let sync_err = SyncError::MergeFailed("boom".into());
        let core_err: CoreError = sync_err.into();
        assert!(matches!(core_err, CoreError::Sync(_)));
    }
}
