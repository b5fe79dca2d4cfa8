//! Customization detection and validity checking.
//!
//! Detection runs only when no stored record exists for a path, as an
//! ordered list of named rules evaluated top to bottom — first match wins.
//! Operator glob overrides take precedence over both stored records and
//! detection.

use chrono::Utc;
use tracing::{debug, info};

use super::{CustomizationRecord, SwizzleEvent, SwizzleLookup, SwizzleStore};
use crate::models::{BlobStatus, DivergenceStatus, DivergenceSummary, FileIdentity};

// ---------------------------------------------------------------------------
// Operator overrides
// ---------------------------------------------------------------------------

/// Path-glob settings that force a path to a fixed customization event.
#[derive(Debug, Clone, Default)]
pub struct OverridePatterns {
    pub treat_as_edited: Vec<String>,
    pub treat_as_removed: Vec<String>,
}

impl OverridePatterns {
    /// The forced event for `path`, if any glob matches. `removed` globs are
    /// consulted first: a path matching both is a removal.
    pub fn event_for(&self, path: &str) -> Option<SwizzleEvent> {
        if self.matches_any(&self.treat_as_removed, path) {
            return Some(SwizzleEvent::Removed);
        }
        if self.matches_any(&self.treat_as_edited, path) {
            return Some(SwizzleEvent::Edited);
        }
        None
    }

    fn matches_any(&self, patterns: &[String], path: &str) -> bool {
        patterns.iter().any(|p| glob_match::glob_match(p, path))
    }
}

// ---------------------------------------------------------------------------
// Detection rules
// ---------------------------------------------------------------------------

/// Inputs a detection rule may consult.
struct DetectInput<'a> {
    divergence: &'a DivergenceSummary,
    blob: BlobStatus,
}

/// One entry in the ordered detection chain.
struct DetectionRule {
    name: &'static str,
    event: SwizzleEvent,
    matches: fn(&DetectInput<'_>) -> bool,
}

/// The detection chain, in priority order. First match wins; order is part
/// of the contract and must stay auditable here, not buried in conditionals.
const DETECTION_RULES: &[DetectionRule] = &[
    DetectionRule {
        name: "removed",
        event: SwizzleEvent::Removed,
        matches: |input| {
            input.blob == BlobStatus::Missing
                && input.divergence.status != DivergenceStatus::Unrelated
        },
    },
    DetectionRule {
        name: "edited",
        event: SwizzleEvent::Edited,
        matches: |input| {
            matches!(
                input.divergence.status,
                DivergenceStatus::Ahead | DivergenceStatus::Diverged
            ) && input.blob != BlobStatus::Missing
        },
    },
];

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Evaluates customization state for one file at a time.
///
/// Holds only the operator override patterns; the store is passed in
/// explicitly per call so its lifecycle stays scoped to the run.
#[derive(Debug, Clone, Default)]
pub struct SwizzleTracker {
    overrides: OverridePatterns,
}

impl SwizzleTracker {
    pub fn new(overrides: OverridePatterns) -> Self {
        Self { overrides }
    }

    /// Resolve the customization state for one file.
    ///
    /// Returns the lookup outcome plus a freshly detected record, if any.
    /// Detection results are returned rather than written so callers can
    /// accumulate them across a concurrent run and merge once at the end.
    pub fn evaluate(
        &self,
        store: &SwizzleStore,
        boilerplate: &FileIdentity,
        fork: Option<&FileIdentity>,
        divergence: &DivergenceSummary,
        blob: BlobStatus,
    ) -> (SwizzleLookup, Option<CustomizationRecord>) {
        // Operator overrides take precedence wherever customization state is
        // consulted.
        if let Some(event) = self.overrides.event_for(&boilerplate.path) {
            debug!(path = %boilerplate.path, %event, "path-glob override");
            return (SwizzleLookup::Overridden(event), None);
        }

        if let Some(record) = store.get(&boilerplate.path) {
            let lookup = if record_is_valid(record, boilerplate) {
                if record.active {
                    SwizzleLookup::Active(record.clone())
                } else {
                    SwizzleLookup::Inactive(record.clone())
                }
            } else {
                // The boilerplate moved on since detection. The record is
                // surfaced for operator attention and not applied.
                info!(
                    path = %boilerplate.path,
                    recorded_commit = %record.boilerplate_last_commit_id,
                    current_commit = %boilerplate.last_commit_id,
                    "swizzle record is stale"
                );
                SwizzleLookup::Stale(record.clone())
            };
            return (lookup, None);
        }

        let input = DetectInput { divergence, blob };
        for rule in DETECTION_RULES {
            if (rule.matches)(&input) {
                let record = CustomizationRecord {
                    path: boilerplate.path.clone(),
                    event: rule.event,
                    active: true,
                    shared_ancestor_id: divergence.shared_ancestor_id.clone(),
                    fork_last_commit_id: fork.map(|f| f.last_commit_id.clone()),
                    boilerplate_last_commit_id: boilerplate.last_commit_id.clone(),
                    boilerplate_content_hash: boilerplate.content_hash.clone(),
                    recorded_at: Utc::now(),
                };
                info!(path = %boilerplate.path, rule = rule.name, "detected customization");
                return (SwizzleLookup::Active(record.clone()), Some(record));
            }
        }

        (SwizzleLookup::None, None)
    }
}

/// A record remains valid while the *current* boilerplate still matches what
/// was recorded at detection time: same last commit id or same content hash.
pub fn record_is_valid(record: &CustomizationRecord, boilerplate: &FileIdentity) -> bool {
    record.boilerplate_last_commit_id == boilerplate.last_commit_id
        || record.boilerplate_content_hash == boilerplate.content_hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HistoryCoverage;

    fn identity(path: &str, hash: &str, commit: &str) -> FileIdentity {
        FileIdentity {
            path: path.into(),
            content_hash: hash.into(),
            last_commit_id: commit.into(),
        }
    }

    fn divergence(status: DivergenceStatus) -> DivergenceSummary {
        let related = status != DivergenceStatus::Unrelated;
        DivergenceSummary {
            status,
            commits_ahead: 0,
            commits_behind: 0,
            shared_ancestor_id: related.then(|| "a1".to_string()),
            last_synced_at: None,
            history_coverage: HistoryCoverage::Partial,
        }
    }

    fn stored(path: &str, event: SwizzleEvent, active: bool) -> CustomizationRecord {
        CustomizationRecord {
            path: path.into(),
            event,
            active,
            shared_ancestor_id: Some("a1".into()),
            fork_last_commit_id: Some("f1".into()),
            boilerplate_last_commit_id: "b1".into(),
            boilerplate_content_hash: "h1".into(),
            recorded_at: Utc::now(),
        }
    }

    fn empty_store() -> SwizzleStore {
        SwizzleStore::empty("/tmp/unused-swizzles.json")
    }

    #[test]
    fn test_detects_removed() {
        let tracker = SwizzleTracker::default();
        let boilerplate = identity("docs/setup.md", "h1", "b1");
        let (lookup, detected) = tracker.evaluate(
            &empty_store(),
            &boilerplate,
            None,
            &divergence(DivergenceStatus::Ahead),
            BlobStatus::Missing,
        );
        let record = detected.expect("removal should be detected");
        assert_eq!(record.event, SwizzleEvent::Removed);
        assert!(record.active);
        assert_eq!(lookup.effective_event(), Some(SwizzleEvent::Removed));
    }

    #[test]
    fn test_removed_requires_related_history() {
        let tracker = SwizzleTracker::default();
        let boilerplate = identity("docs/setup.md", "h1", "b1");
        let (lookup, detected) = tracker.evaluate(
            &empty_store(),
            &boilerplate,
            None,
            &divergence(DivergenceStatus::Unrelated),
            BlobStatus::Missing,
        );
        assert!(detected.is_none());
        assert_eq!(lookup, SwizzleLookup::None);
    }

    #[test]
    fn test_detects_edited() {
        let tracker = SwizzleTracker::default();
        let boilerplate = identity("src/app.rs", "h1", "b1");
        let fork = identity("src/app.rs", "h2", "f1");
        for status in [DivergenceStatus::Ahead, DivergenceStatus::Diverged] {
            let (_, detected) = tracker.evaluate(
                &empty_store(),
                &boilerplate,
                Some(&fork),
                &divergence(status),
                BlobStatus::Different,
            );
            assert_eq!(detected.unwrap().event, SwizzleEvent::Edited, "{status}");
        }
    }

    #[test]
    fn test_removed_rule_wins_over_edited() {
        // Ahead + missing satisfies both shapes; the removal rule is first.
        let tracker = SwizzleTracker::default();
        let boilerplate = identity("src/app.rs", "h1", "b1");
        let (_, detected) = tracker.evaluate(
            &empty_store(),
            &boilerplate,
            None,
            &divergence(DivergenceStatus::Ahead),
            BlobStatus::Missing,
        );
        assert_eq!(detected.unwrap().event, SwizzleEvent::Removed);
    }

    #[test]
    fn test_no_detection_when_behind() {
        let tracker = SwizzleTracker::default();
        let boilerplate = identity("src/app.rs", "h1", "b1");
        let fork = identity("src/app.rs", "h2", "f1");
        let (lookup, detected) = tracker.evaluate(
            &empty_store(),
            &boilerplate,
            Some(&fork),
            &divergence(DivergenceStatus::Behind),
            BlobStatus::Different,
        );
        assert!(detected.is_none());
        assert_eq!(lookup, SwizzleLookup::None);
    }

    #[test]
    fn test_stored_record_skips_detection() {
        let mut store = empty_store();
        store.merge([stored("src/app.rs", SwizzleEvent::Edited, true)]);

        let tracker = SwizzleTracker::default();
        // Boilerplate unchanged since detection (same commit id).
        let boilerplate = identity("src/app.rs", "h-other", "b1");
        let fork = identity("src/app.rs", "h2", "f2");
        let (lookup, detected) = tracker.evaluate(
            &store,
            &boilerplate,
            Some(&fork),
            &divergence(DivergenceStatus::Diverged),
            BlobStatus::Different,
        );
        assert!(detected.is_none(), "no re-detection over a stored record");
        assert!(matches!(lookup, SwizzleLookup::Active(_)));
    }

    #[test]
    fn test_validity_by_content_hash_alone() {
        let mut store = empty_store();
        store.merge([stored("src/app.rs", SwizzleEvent::Edited, true)]);

        let tracker = SwizzleTracker::default();
        // Commit id moved but the content hash still matches the record.
        let boilerplate = identity("src/app.rs", "h1", "b99");
        let (lookup, _) = tracker.evaluate(
            &store,
            &boilerplate,
            None,
            &divergence(DivergenceStatus::Ahead),
            BlobStatus::Missing,
        );
        assert!(matches!(lookup, SwizzleLookup::Active(_)));
    }

    #[test]
    fn test_stale_record_surfaced_not_applied() {
        let mut store = empty_store();
        store.merge([stored("src/app.rs", SwizzleEvent::Removed, true)]);

        let tracker = SwizzleTracker::default();
        // Both commit id and content hash moved on.
        let boilerplate = identity("src/app.rs", "h99", "b99");
        let (lookup, detected) = tracker.evaluate(
            &store,
            &boilerplate,
            None,
            &divergence(DivergenceStatus::Ahead),
            BlobStatus::Missing,
        );
        assert!(detected.is_none());
        assert!(matches!(lookup, SwizzleLookup::Stale(_)));
        assert_eq!(lookup.effective_event(), None);
    }

    #[test]
    fn test_inactive_record_reported_but_not_effective() {
        let mut store = empty_store();
        store.merge([stored("src/app.rs", SwizzleEvent::Removed, false)]);

        let tracker = SwizzleTracker::default();
        let boilerplate = identity("src/app.rs", "h1", "b1");
        let (lookup, _) = tracker.evaluate(
            &store,
            &boilerplate,
            None,
            &divergence(DivergenceStatus::Ahead),
            BlobStatus::Missing,
        );
        assert!(matches!(lookup, SwizzleLookup::Inactive(_)));
        assert_eq!(lookup.effective_event(), None);
    }

    #[test]
    fn test_override_beats_store_and_detection() {
        let mut store = empty_store();
        store.merge([stored("vendor/theme.css", SwizzleEvent::Edited, true)]);

        let tracker = SwizzleTracker::new(OverridePatterns {
            treat_as_edited: vec![],
            treat_as_removed: vec!["vendor/**".into()],
        });
        let boilerplate = identity("vendor/theme.css", "h1", "b1");
        let fork = identity("vendor/theme.css", "h2", "f1");
        let (lookup, detected) = tracker.evaluate(
            &store,
            &boilerplate,
            Some(&fork),
            &divergence(DivergenceStatus::Diverged),
            BlobStatus::Different,
        );
        assert!(detected.is_none());
        assert_eq!(lookup, SwizzleLookup::Overridden(SwizzleEvent::Removed));
    }

    #[test]
    fn test_override_precedence_removed_over_edited() {
        let tracker = SwizzleTracker::new(OverridePatterns {
            treat_as_edited: vec!["config/*".into()],
            treat_as_removed: vec!["config/secrets.toml".into()],
        });
        assert_eq!(
            tracker.overrides.event_for("config/secrets.toml"),
            Some(SwizzleEvent::Removed)
        );
        assert_eq!(
            tracker.overrides.event_for("config/app.toml"),
            Some(SwizzleEvent::Edited)
        );
        assert_eq!(tracker.overrides.event_for("src/main.rs"), None);
    }
}
