//! Run configuration.
//!
//! A single TOML file describes the boilerplate/fork pair, the analysis
//! options and the customization overrides. Settings are loaded and
//! validated once at startup; nothing here changes during a run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;
use crate::threeway::default_binary_extensions;

// ---------------------------------------------------------------------------
// Top-level settings
// ---------------------------------------------------------------------------

/// Configuration for one boilerplate/fork pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// The two repositories being reconciled.
    pub repos: ReposSection,

    /// Analysis phase options.
    #[serde(default)]
    pub analysis: AnalysisSection,

    /// Customization tracking options.
    #[serde(default)]
    pub swizzle: SwizzleSection,

    /// Merge/push behaviour options.
    #[serde(default)]
    pub sync: SyncSection,
}

// ---------------------------------------------------------------------------
// Repos
// ---------------------------------------------------------------------------

/// Locations and branches of the two repositories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReposSection {
    /// Working directory of the boilerplate (upstream) checkout.
    pub boilerplate_path: PathBuf,

    /// Working directory of the fork checkout. Merges run here.
    pub fork_path: PathBuf,

    /// Branch to read on the boilerplate side (default `main`).
    #[serde(default = "default_branch")]
    pub boilerplate_branch: String,

    /// Branch to read and merge into on the fork side (default `main`).
    #[serde(default = "default_branch")]
    pub fork_branch: String,

    /// Remote the fork pushes to (default `origin`).
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Ref merged into the fork branch during sync. Defaults to
    /// `upstream/<boilerplate_branch>`, assuming the boilerplate is wired up
    /// as the fork's `upstream` remote.
    #[serde(default)]
    pub merge_ref: Option<String>,
}

fn default_branch() -> String {
    "main".into()
}

fn default_remote() -> String {
    "origin".into()
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Options for the per-file analysis phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSection {
    /// Maximum number of files analysed concurrently (default 10).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// File extensions treated as binary (no content-merge check).
    #[serde(default = "default_binary_extensions")]
    pub binary_extensions: Vec<String>,

    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_concurrency() -> usize {
    10
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            binary_extensions: default_binary_extensions(),
            log_level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Customization tracking
// ---------------------------------------------------------------------------

/// Options for the customization (swizzle) tracker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwizzleSection {
    /// Location of the persisted customization store. Defaults to
    /// `.boilersync/swizzles.json` under the fork checkout.
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Glob patterns always classified as deliberate edits.
    #[serde(default)]
    pub treat_as_edited: Vec<String>,

    /// Glob patterns always classified as deliberate removals.
    #[serde(default)]
    pub treat_as_removed: Vec<String>,
}

// ---------------------------------------------------------------------------
// Sync behaviour
// ---------------------------------------------------------------------------

/// Options for the merge/resolution phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSection {
    /// Push the fork branch after a successful sync (default true).
    #[serde(default = "default_true")]
    pub push: bool,

    /// Commit message used when finalizing a sync.
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
}

fn default_true() -> bool {
    true
}

fn default_commit_message() -> String {
    "Sync boilerplate changes".into()
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            push: default_true(),
            commit_message: default_commit_message(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl SyncSettings {
    /// Load settings from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading settings");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: SyncSettings =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("settings parsed successfully");
        Ok(settings)
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repos.boilerplate_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "repos.boilerplate_path".into(),
                detail: "boilerplate path must not be empty".into(),
            });
        }
        if self.repos.fork_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "repos.fork_path".into(),
                detail: "fork path must not be empty".into(),
            });
        }
        if self.repos.boilerplate_path == self.repos.fork_path {
            return Err(ConfigError::InvalidValue {
                field: "repos.fork_path".into(),
                detail: "fork and boilerplate must be distinct checkouts".into(),
            });
        }
        if self.repos.boilerplate_branch.is_empty() || self.repos.fork_branch.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "repos.*_branch".into(),
                detail: "branch names must not be empty".into(),
            });
        }
        if self.analysis.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "analysis.concurrency".into(),
                detail: "concurrency must be > 0".into(),
            });
        }
        Ok(())
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Self::load_from_file(path)?;
        settings.validate()?;
        Ok(settings)
    }

    /// The ref the sync phase merges into the fork branch.
    pub fn merge_source(&self) -> String {
        self.repos
            .merge_ref
            .clone()
            .unwrap_or_else(|| format!("upstream/{}", self.repos.boilerplate_branch))
    }

    /// Resolved location of the customization store.
    pub fn store_path(&self) -> PathBuf {
        self.swizzle
            .store_path
            .clone()
            .unwrap_or_else(|| self.repos.fork_path.join(".boilersync/swizzles.json"))
    }

    /// Generate a default TOML settings template string.
    pub fn default_template() -> &'static str {
        r#"# boilersync configuration

[repos]
boilerplate_path = "/path/to/boilerplate"
fork_path = "/path/to/fork"
boilerplate_branch = "main"
fork_branch = "main"
remote = "origin"
# merge_ref = "upstream/main"  # defaults to upstream/<boilerplate_branch>

[analysis]
concurrency = 10
log_level = "info"
# binary_extensions = ["png", "jpg", ...]  # uses sensible defaults

[swizzle]
# store_path = "/path/to/fork/.boilersync/swizzles.json"  # auto-detected
treat_as_edited = []
treat_as_removed = []

[sync]
push = true
commit_message = "Sync boilerplate changes"
"#
    }
}
