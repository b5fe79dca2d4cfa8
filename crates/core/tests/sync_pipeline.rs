//! End-to-end tests for the analyze -> sync pipeline.
//!
//! These tests exercise the real `Analyzer` and `SyncOrchestrator` against
//! the in-memory version-control fake: scripted repositories, scripted merge
//! reports, and a real swizzle store on a temp directory. No subprocesses.

use std::sync::Arc;

use tempfile::TempDir;

use boilersync_core::models::{
    BlobStatus, DivergenceStatus, MergeActionKind, SyncStatus, ThreeWayOutcome,
};
use boilersync_core::orchestrator::{AutoGate, SyncOrchestrator};
use boilersync_core::settings::SyncSettings;
use boilersync_core::swizzle::{
    OverridePatterns, SwizzleEvent, SwizzleLookup, SwizzleStore, SwizzleTracker,
};
use boilersync_core::vcs::{MemoryVcs, MergeReport};
use boilersync_core::Analyzer;

// ===========================================================================
// Helpers
// ===========================================================================

fn settings() -> SyncSettings {
    toml::from_str(
        r#"
[repos]
boilerplate_path = "boiler"
fork_path = "fork"
"#,
    )
    .unwrap()
}

/// A fork three files deep: one untouched, one hand-edited, one deleted.
fn scripted_pair() -> MemoryVcs {
    let vcs = MemoryVcs::new();

    // Untouched: same content, same last commit.
    vcs.add_file("boiler", "main", "src/lib.rs", "h-lib", &[("c1", 100)]);
    vcs.add_file("fork", "main", "src/lib.rs", "h-lib", &[("c1", 100)]);

    // Hand-edited in the fork after the last sync.
    vcs.add_file("boiler", "main", "config/app.toml", "h-cfg", &[("c2", 150)]);
    vcs.add_file(
        "fork",
        "main",
        "config/app.toml",
        "h-cfg-local",
        &[("f1", 300), ("c2", 150)],
    );

    // Deleted by the fork owner.
    vcs.add_file("boiler", "main", "docs/README.md", "h-doc", &[("c1", 100)]);
    vcs.add_file(
        "fork",
        "main",
        "docs/README.md",
        "h-doc",
        &[("fdel", 200), ("c1", 100)],
    );
    vcs.delete_file("fork", "main", "docs/README.md");

    vcs
}

fn analyzer(vcs: Arc<MemoryVcs>) -> Analyzer {
    Analyzer::new(vcs, SwizzleTracker::default(), settings())
}

// ===========================================================================
// Analysis end-to-end
// ===========================================================================

#[tokio::test]
async fn analysis_classifies_the_whole_pair() {
    let vcs = Arc::new(scripted_pair());
    let store = SwizzleStore::empty("unused.json");

    let outcome = analyzer(Arc::clone(&vcs)).analyze(&store).await.unwrap();
    assert_eq!(outcome.files.len(), 3);

    // Results come back ordered by path.
    let paths: Vec<&str> = outcome.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, ["config/app.toml", "docs/README.md", "src/lib.rs"]);

    let edited = &outcome.files[0];
    assert_eq!(edited.divergence.status, DivergenceStatus::Ahead);
    assert_eq!(edited.blob, BlobStatus::Different);
    assert_eq!(edited.action.kind, MergeActionKind::KeepFork);
    assert!(matches!(edited.swizzle, SwizzleLookup::Active(_)));

    let removed = &outcome.files[1];
    assert_eq!(removed.blob, BlobStatus::Missing);
    assert_eq!(removed.action.kind, MergeActionKind::DropFromFork);

    let untouched = &outcome.files[2];
    assert_eq!(untouched.divergence.status, DivergenceStatus::UpToDate);
    assert_eq!(untouched.blob, BlobStatus::Identical);
    assert_eq!(untouched.action.kind, MergeActionKind::KeepFork);
    assert_eq!(untouched.three_way, ThreeWayOutcome::NotApplicable);

    // Both deviations were detected as customizations.
    assert_eq!(outcome.detected.len(), 2);
}

#[tokio::test]
async fn detections_survive_a_store_round_trip() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("swizzles.json");
    let vcs = Arc::new(scripted_pair());

    let mut store = SwizzleStore::load(&store_path).unwrap();
    let outcome = analyzer(Arc::clone(&vcs)).analyze(&store).await.unwrap();
    store.merge(outcome.detected);
    store.flush().unwrap();

    // Second run: the stored records are found valid, nothing re-detected.
    let store = SwizzleStore::load(&store_path).unwrap();
    assert_eq!(store.len(), 2);
    let outcome = analyzer(Arc::clone(&vcs)).analyze(&store).await.unwrap();
    assert!(outcome.detected.is_empty());

    let edited = &outcome.files[0];
    assert!(matches!(edited.swizzle, SwizzleLookup::Active(_)));
    // And the actions do not change between runs.
    assert_eq!(edited.action.kind, MergeActionKind::KeepFork);
}

#[tokio::test]
async fn removal_override_beats_detection() {
    let vcs = Arc::new(scripted_pair());
    let overrides = OverridePatterns {
        treat_as_edited: Vec::new(),
        treat_as_removed: vec!["config/**".into()],
    };
    let analyzer = Analyzer::new(
        vcs.clone(),
        SwizzleTracker::new(overrides),
        settings(),
    );

    let outcome = analyzer
        .analyze(&SwizzleStore::empty("unused.json"))
        .await
        .unwrap();

    // Without the override this file is an edited customization kept in the
    // fork; the operator glob turns it into a removal.
    let edited = &outcome.files[0];
    assert_eq!(edited.path, "config/app.toml");
    assert_eq!(
        edited.swizzle,
        SwizzleLookup::Overridden(SwizzleEvent::Removed)
    );
    assert_eq!(edited.action.kind, MergeActionKind::DropFromFork);
}

// ===========================================================================
// Analyze -> sync end-to-end
// ===========================================================================

#[tokio::test]
async fn clean_sync_runs_to_done_and_pushes() {
    let vcs = Arc::new(scripted_pair());
    let outcome = analyzer(Arc::clone(&vcs))
        .analyze(&SwizzleStore::empty("unused.json"))
        .await
        .unwrap();

    let orchestrator = SyncOrchestrator::new(
        vcs.clone(),
        Arc::new(AutoGate { answer: false }),
        settings(),
    );
    let result = orchestrator.run_sync(&outcome.files).await.unwrap();

    assert_eq!(result.status, SyncStatus::Done);
    assert!(result.unresolved_paths.is_empty());
    assert!(result.pushed);
    let ops = vcs.ops();
    assert_eq!(ops.first().map(String::as_str), Some("merge:upstream/main"));
    assert_eq!(ops.last().map(String::as_str), Some("push:main"));
}

#[tokio::test]
async fn conflicted_sync_applies_analysis_actions() {
    let vcs = Arc::new(scripted_pair());
    // The merge stops on the hand-edited file and the deleted one.
    vcs.script_report(
        "fork",
        MergeReport::conflicted(vec!["config/app.toml".into(), "docs/README.md".into()]),
    );

    let outcome = analyzer(Arc::clone(&vcs))
        .analyze(&SwizzleStore::empty("unused.json"))
        .await
        .unwrap();
    let orchestrator = SyncOrchestrator::new(
        vcs.clone(),
        Arc::new(AutoGate { answer: false }),
        settings(),
    );
    let result = orchestrator.run_sync(&outcome.files).await.unwrap();

    assert_eq!(result.status, SyncStatus::Done);
    assert_eq!(result.auto_resolved, 2);
    let ops = vcs.ops();
    // keep-fork keeps the fork's edit, drop-from-fork removes the file.
    assert!(ops.contains(&"resolve-ours:config/app.toml".to_string()));
    assert!(ops.contains(&"remove:docs/README.md".to_string()));
}

#[tokio::test]
async fn unresolvable_conflict_aborts_without_push() {
    let vcs = Arc::new(MemoryVcs::new());
    // Unrelated histories: no shared ancestor, the resolver goes manual.
    vcs.add_file("boiler", "main", "src/app.rs", "hb", &[("b1", 100)]);
    vcs.add_file("fork", "main", "src/app.rs", "hf", &[("x1", 90)]);
    vcs.script_report("fork", MergeReport::conflicted(vec!["src/app.rs".into()]));

    let outcome = analyzer(Arc::clone(&vcs))
        .analyze(&SwizzleStore::empty("unused.json"))
        .await
        .unwrap();
    assert_eq!(outcome.files[0].divergence.status, DivergenceStatus::Unrelated);
    assert_eq!(outcome.files[0].action.kind, MergeActionKind::Manual);

    let orchestrator = SyncOrchestrator::new(
        vcs.clone(),
        Arc::new(AutoGate { answer: false }),
        settings(),
    );
    let result = orchestrator.run_sync(&outcome.files).await.unwrap();

    assert_eq!(result.status, SyncStatus::Aborted);
    assert_eq!(result.unresolved_paths, vec!["src/app.rs"]);
    assert!(!result.pushed);
    assert!(!vcs.ops().iter().any(|op| op.starts_with("push:")));
}
