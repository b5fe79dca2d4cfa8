//! Customization ("swizzle") tracking.
//!
//! A swizzle is a deliberate fork-side deviation from the boilerplate — a
//! hand-edited file, a removed file — that future syncs must respect instead
//! of overwriting. Detection and the validity check live in [`tracker`], the
//! persisted store in [`store`].

pub mod store;
pub mod tracker;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use store::SwizzleStore;
pub use tracker::{OverridePatterns, SwizzleTracker};

/// What kind of deviation the fork owner made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwizzleEvent {
    Edited,
    Removed,
    Renamed,
    BinaryReplaced,
}

impl std::fmt::Display for SwizzleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Edited => write!(f, "edited"),
            Self::Removed => write!(f, "removed"),
            Self::Renamed => write!(f, "renamed"),
            Self::BinaryReplaced => write!(f, "binary_replaced"),
        }
    }
}

/// A persisted record of one intentional fork-side deviation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomizationRecord {
    pub path: String,
    pub event: SwizzleEvent,
    /// An inactive record is kept for the operator's reference but never
    /// overrides the strategy resolver's other rules.
    pub active: bool,
    pub shared_ancestor_id: Option<String>,
    pub fork_last_commit_id: Option<String>,
    /// Boilerplate state at detection time; the validity check compares the
    /// current boilerplate against these.
    pub boilerplate_last_commit_id: String,
    pub boilerplate_content_hash: String,
    pub recorded_at: DateTime<Utc>,
}

/// The customization lookup outcome for one file in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum SwizzleLookup {
    /// No record, no override, nothing detected.
    None,
    /// An operator glob forces this path to a fixed event.
    Overridden(SwizzleEvent),
    /// A stored (or freshly detected) record that is still valid and active.
    Active(CustomizationRecord),
    /// A valid record the operator has switched off.
    Inactive(CustomizationRecord),
    /// The boilerplate has materially moved since the record was taken; the
    /// record needs operator attention and is not applied.
    Stale(CustomizationRecord),
}

impl SwizzleLookup {
    /// The event that should steer the strategy resolver, if any.
    ///
    /// Only overrides and valid active records count; inactive and stale
    /// records never drive resolution.
    pub fn effective_event(&self) -> Option<SwizzleEvent> {
        match self {
            Self::Overridden(event) => Some(*event),
            Self::Active(record) => Some(record.event),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(event: SwizzleEvent, active: bool) -> CustomizationRecord {
        CustomizationRecord {
            path: "config/app.toml".into(),
            event,
            active,
            shared_ancestor_id: Some("a1".into()),
            fork_last_commit_id: Some("f1".into()),
            boilerplate_last_commit_id: "b1".into(),
            boilerplate_content_hash: "h1".into(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_effective_event() {
        assert_eq!(SwizzleLookup::None.effective_event(), None);
        assert_eq!(
            SwizzleLookup::Overridden(SwizzleEvent::Removed).effective_event(),
            Some(SwizzleEvent::Removed)
        );
        assert_eq!(
            SwizzleLookup::Active(record(SwizzleEvent::Edited, true)).effective_event(),
            Some(SwizzleEvent::Edited)
        );
        // Inactive and stale records must never steer resolution.
        assert_eq!(
            SwizzleLookup::Inactive(record(SwizzleEvent::Removed, false)).effective_event(),
            None
        );
        assert_eq!(
            SwizzleLookup::Stale(record(SwizzleEvent::Removed, true)).effective_event(),
            None
        );
    }
}
