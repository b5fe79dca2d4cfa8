//! Merge-strategy resolution.
//!
//! Turns everything the pipeline learned about one file into a single
//! binding [`MergeAction`]. The rules form an explicit priority-ordered
//! chain evaluated top to bottom — first match wins — so individual rules
//! can be tested in isolation and the ordering audited in one place.
//!
//! This runs independently of the risk classifier: risk is advisory (it
//! gates the expensive three-way check), the action resolved here is the
//! instruction the orchestrator executes.

use tracing::debug;

use crate::models::{
    BlobStatus, DivergenceStatus, DivergenceSummary, FileIdentity, MergeAction, MergeActionKind,
};
use crate::swizzle::{SwizzleEvent, SwizzleLookup};

/// Everything a strategy rule may consult.
pub struct RuleInput<'a> {
    pub boilerplate: &'a FileIdentity,
    pub fork: Option<&'a FileIdentity>,
    pub divergence: &'a DivergenceSummary,
    pub blob: BlobStatus,
    pub swizzle: &'a SwizzleLookup,
}

/// One entry in the resolution chain.
struct StrategyRule {
    name: &'static str,
    apply: fn(&RuleInput<'_>) -> Option<MergeActionKind>,
}

/// The resolution chain, in priority order.
const STRATEGY_RULES: &[StrategyRule] = &[
    // An active removal customization (stored record or operator override)
    // always wins: the fork deliberately dropped this file.
    StrategyRule {
        name: "customized-removal",
        apply: |input| {
            (input.swizzle.effective_event() == Some(SwizzleEvent::Removed))
                .then_some(MergeActionKind::DropFromFork)
        },
    },
    // Same last commit on both sides: nothing to reconcile.
    StrategyRule {
        name: "same-last-commit",
        apply: |input| {
            input
                .fork
                .is_some_and(|f| f.last_commit_id == input.boilerplate.last_commit_id)
                .then_some(MergeActionKind::KeepFork)
        },
    },
    StrategyRule {
        name: "identical-content",
        apply: |input| {
            (input.blob == BlobStatus::Identical).then_some(MergeActionKind::KeepFork)
        },
    },
    // Fork is current or ahead: its content already reflects an intentional
    // state, so differing content stays and a missing file stays gone.
    StrategyRule {
        name: "fork-owns-content",
        apply: |input| {
            (fork_is_current(input) && input.blob == BlobStatus::Different)
                .then_some(MergeActionKind::KeepFork)
        },
    },
    StrategyRule {
        name: "fork-dropped-file",
        apply: |input| {
            (fork_is_current(input) && input.blob == BlobStatus::Missing)
                .then_some(MergeActionKind::DropFromFork)
        },
    },
    // Fork is behind with differing content: it has not yet received an
    // upstream change it should have.
    StrategyRule {
        name: "behind-upstream",
        apply: |input| {
            (input.divergence.status == DivergenceStatus::Behind
                && input.blob == BlobStatus::Different)
                .then_some(MergeActionKind::KeepBoilerplate)
        },
    },
    StrategyRule {
        name: "cannot-auto-resolve",
        apply: |input| {
            matches!(
                input.divergence.status,
                DivergenceStatus::Diverged | DivergenceStatus::Unrelated
            )
            .then_some(MergeActionKind::Manual)
        },
    },
];

fn fork_is_current(input: &RuleInput<'_>) -> bool {
    matches!(
        input.divergence.status,
        DivergenceStatus::UpToDate | DivergenceStatus::Ahead
    )
}

/// Resolve the binding merge action for one file.
pub fn resolve(input: &RuleInput<'_>) -> MergeAction {
    for rule in STRATEGY_RULES {
        if let Some(kind) = (rule.apply)(input) {
            debug!(path = %input.boilerplate.path, rule = rule.name, action = %kind, "resolved");
            return MergeAction::new(kind, rule.name);
        }
    }
    MergeAction::new(MergeActionKind::Undetermined, "no rule matched")
}
