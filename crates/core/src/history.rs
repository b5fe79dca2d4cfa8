//! Per-file history comparison.
//!
//! Classifies the relationship between the boilerplate's and the fork's
//! commit histories for a single file. The shared ancestor found here is the
//! most recent commit id visible in *both* per-file logs — a fast
//! approximation of a merge-base, not a guaranteed one if either history was
//! rewritten. A true commit-graph merge-base would be strictly more correct
//! and may be substituted where available.

use std::collections::HashSet;

use tracing::debug;

use crate::models::{CommitHistory, DivergenceStatus, DivergenceSummary, HistoryCoverage};

/// Compare two per-file commit histories (newest first) and summarize their
/// divergence.
pub fn compare_histories(boilerplate: &CommitHistory, fork: &CommitHistory) -> DivergenceSummary {
    let boilerplate_ids: HashSet<&str> = boilerplate
        .iter()
        .map(|c| c.commit_id.as_str())
        .collect();
    let fork_ids: HashSet<&str> = fork.iter().map(|c| c.commit_id.as_str()).collect();

    // First fork commit also present in the boilerplate log, scanning newest
    // to oldest, is the shared ancestor.
    let ancestor = fork
        .iter()
        .enumerate()
        .find(|(_, c)| boilerplate_ids.contains(c.commit_id.as_str()));

    let coverage = history_coverage(boilerplate, &fork_ids);

    let Some((ahead, ancestor_commit)) = ancestor else {
        debug!("no shared ancestor between per-file histories");
        return DivergenceSummary {
            status: DivergenceStatus::Unrelated,
            commits_ahead: 0,
            commits_behind: 0,
            shared_ancestor_id: None,
            last_synced_at: None,
            history_coverage: coverage,
        };
    };

    let behind = boilerplate
        .iter()
        .position(|c| c.commit_id == ancestor_commit.commit_id)
        .unwrap_or(0);

    let status = match (ahead, behind) {
        (0, 0) => DivergenceStatus::UpToDate,
        (_, 0) => DivergenceStatus::Ahead,
        (0, _) => DivergenceStatus::Behind,
        (_, _) => DivergenceStatus::Diverged,
    };

    debug!(
        ancestor = %ancestor_commit.commit_id,
        ahead,
        behind,
        %status,
        "compared per-file histories"
    );

    DivergenceSummary {
        status,
        commits_ahead: ahead,
        commits_behind: behind,
        shared_ancestor_id: Some(ancestor_commit.commit_id.clone()),
        last_synced_at: Some(ancestor_commit.timestamp),
        history_coverage: coverage,
    }
}

/// Fraction of the boilerplate's commits reachable from the fork side,
/// bucketed into coverage classes.
fn history_coverage(boilerplate: &CommitHistory, fork_ids: &HashSet<&str>) -> HistoryCoverage {
    if boilerplate.is_empty() {
        return HistoryCoverage::Unknown;
    }
    let seen = boilerplate
        .iter()
        .filter(|c| fork_ids.contains(c.commit_id.as_str()))
        .count();
    if seen == 0 {
        HistoryCoverage::Unknown
    } else if seen == boilerplate.len() {
        HistoryCoverage::Complete
    } else {
        HistoryCoverage::Partial
    }
}
