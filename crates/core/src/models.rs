//! Domain model types used throughout boilersync.
//!
//! These types flow from the version-control access layer through the
//! analysis pipeline into the sync orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// File identity & history
// ---------------------------------------------------------------------------

/// A file's state within one repository at one branch snapshot.
///
/// Produced fresh each run from version-control access; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIdentity {
    /// Repository-relative path, forward-slash separated.
    pub path: String,
    /// Content identity of the blob at the branch head.
    pub content_hash: String,
    /// The most recent commit that touched this file.
    pub last_commit_id: String,
}

/// One historical commit that touched a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub commit_id: String,
    pub timestamp: DateTime<Utc>,
}

/// A file's commit history, newest first.
pub type CommitHistory = Vec<CommitRecord>;

// ---------------------------------------------------------------------------
// Divergence
// ---------------------------------------------------------------------------

/// Relationship between the boilerplate's and the fork's per-file histories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceStatus {
    UpToDate,
    Ahead,
    Behind,
    Diverged,
    Unrelated,
}

impl std::fmt::Display for DivergenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UpToDate => write!(f, "up_to_date"),
            Self::Ahead => write!(f, "ahead"),
            Self::Behind => write!(f, "behind"),
            Self::Diverged => write!(f, "diverged"),
            Self::Unrelated => write!(f, "unrelated"),
        }
    }
}

/// How much of the boilerplate's history is reachable from the fork side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryCoverage {
    Complete,
    Partial,
    Unknown,
}

/// The outcome of comparing two per-file commit histories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivergenceSummary {
    pub status: DivergenceStatus,
    /// Fork-only commits newer than the shared ancestor. Always >= 0; zero
    /// whenever no shared ancestor exists.
    pub commits_ahead: usize,
    /// Boilerplate-only commits newer than the shared ancestor.
    pub commits_behind: usize,
    /// Most recent commit id visible in both per-file logs. Absent for
    /// `Unrelated`. Not a guaranteed true merge-base if history was
    /// rewritten; see the history module docs.
    pub shared_ancestor_id: Option<String>,
    /// Timestamp of the shared ancestor commit, when known.
    pub last_synced_at: Option<DateTime<Utc>>,
    pub history_coverage: HistoryCoverage,
}

// ---------------------------------------------------------------------------
// Blob status
// ---------------------------------------------------------------------------

/// Content identity between the two repository states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlobStatus {
    Identical,
    Different,
    /// The fork lacks the file entirely.
    Missing,
}

impl std::fmt::Display for BlobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identical => write!(f, "identical"),
            Self::Different => write!(f, "different"),
            Self::Missing => write!(f, "missing"),
        }
    }
}

// ---------------------------------------------------------------------------
// Merge risk
// ---------------------------------------------------------------------------

/// How likely a merge of this file is to go wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLikelihood {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLikelihood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Why the classifier reached its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskReason {
    Identical,
    BlobMismatch,
    MissingInFork,
    DivergedContent,
    UnrelatedHistories,
    Unknown,
}

/// The deeper check the classifier recommends before merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedCheck {
    None,
    VerifyHead,
    VerifyAncestor,
    AddedOrRemoved,
    ThreeWayMergeCheck,
    GenericMergeAttempt,
}

/// The risk verdict for merging one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRisk {
    pub likelihood: RiskLikelihood,
    pub reason: RiskReason,
    /// Whether a generic merge tool is expected to resolve this file
    /// correctly without deeper inspection.
    pub safe_by_git: bool,
    pub recommended_check: RecommendedCheck,
}

impl MergeRisk {
    /// Verdict used when a file's analysis failed and nothing is known.
    pub fn unknown() -> Self {
        Self {
            likelihood: RiskLikelihood::High,
            reason: RiskReason::Unknown,
            safe_by_git: false,
            recommended_check: RecommendedCheck::GenericMergeAttempt,
        }
    }
}

// ---------------------------------------------------------------------------
// Three-way check outcome
// ---------------------------------------------------------------------------

/// Result of the empirical three-way content merge check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreeWayOutcome {
    /// A generic merge tool combines both change-sets cleanly.
    Clean,
    /// The change-sets collide.
    Conflicted,
    /// Binary file or no shared ancestor: the check does not apply.
    NotApplicable,
}

// ---------------------------------------------------------------------------
// Merge action
// ---------------------------------------------------------------------------

/// The concrete resolution the orchestrator must apply to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeActionKind {
    KeepFork,
    KeepBoilerplate,
    DropFromFork,
    DropFromBoilerplate,
    Manual,
    Undetermined,
}

impl std::fmt::Display for MergeActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeepFork => write!(f, "keep-fork"),
            Self::KeepBoilerplate => write!(f, "keep-boilerplate"),
            Self::DropFromFork => write!(f, "drop-from-fork"),
            Self::DropFromBoilerplate => write!(f, "drop-from-boilerplate"),
            Self::Manual => write!(f, "manual"),
            Self::Undetermined => write!(f, "undetermined"),
        }
    }
}

/// A resolved action plus the rule (or failure) that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeAction {
    pub kind: MergeActionKind,
    pub reason: String,
}

impl MergeAction {
    pub fn new(kind: MergeActionKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    /// `true` for actions a clean merge does not already produce by itself.
    pub fn is_non_default(&self) -> bool {
        matches!(
            self.kind,
            MergeActionKind::KeepBoilerplate
                | MergeActionKind::DropFromFork
                | MergeActionKind::DropFromBoilerplate
        )
    }
}

// ---------------------------------------------------------------------------
// Per-file aggregate
// ---------------------------------------------------------------------------

/// Everything the pipeline learned about one file during one run.
///
/// Ephemeral: rebuilt every run, owned by a single analysis pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub path: String,
    pub boilerplate: FileIdentity,
    pub fork: Option<FileIdentity>,
    pub divergence: DivergenceSummary,
    pub blob: BlobStatus,
    pub risk: MergeRisk,
    pub three_way: ThreeWayOutcome,
    pub swizzle: crate::swizzle::SwizzleLookup,
    pub action: MergeAction,
}

// ---------------------------------------------------------------------------
// Sync result
// ---------------------------------------------------------------------------

/// Terminal status of one orchestrator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Done,
    Aborted,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Done => write!(f, "done"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Outcome of `run_sync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub status: SyncStatus,
    /// Paths still conflicted when the run ended (non-empty only for
    /// `Aborted`).
    pub unresolved_paths: Vec<String>,
    /// Conflicted paths resolved automatically from their merge actions.
    pub auto_resolved: usize,
    /// Whether the finalize step pushed to the remote.
    pub pushed: bool,
}
