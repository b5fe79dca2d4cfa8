//! Offline three-way content merge check.
//!
//! Uses the `diffy` crate to test whether the boilerplate's and the fork's
//! change-sets against their shared ancestor can be combined by a generic
//! line-based merge tool without conflict. This is an empirical probe, not a
//! merge that gets written anywhere.

use tracing::debug;

/// Result of the content-level merge probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeCheck {
    pub clean: bool,
}

/// Attempt a three-way content merge of `base`, `ours` (fork head) and
/// `theirs` (boilerplate head).
///
/// Returns `clean: true` when a generic merge tool is expected to combine
/// both change-sets without conflict.
pub fn attempt_three_way_content_merge(base: &str, ours: &str, theirs: &str) -> MergeCheck {
    // Fast paths: if either side left the base untouched, the other side
    // wins cleanly; identical edits on both sides also merge trivially.
    if ours == base || theirs == base || ours == theirs {
        return MergeCheck { clean: true };
    }

    // Apply each side's patch to the other side's content. Either direction
    // succeeding means the change-sets do not collide.
    let patch_theirs = diffy::create_patch(base, theirs);
    if diffy::apply(ours, &patch_theirs).is_ok() {
        debug!("clean merge via applying theirs-patch to ours");
        return MergeCheck { clean: true };
    }

    let patch_ours = diffy::create_patch(base, ours);
    if diffy::apply(theirs, &patch_ours).is_ok() {
        debug!("clean merge via applying ours-patch to theirs");
        return MergeCheck { clean: true };
    }

    MergeCheck { clean: false }
}

/// Extension heuristic for files excluded from content-level checks.
///
/// `extensions` entries are compared case-insensitively, without the dot.
pub fn is_binary_path(path: &str, extensions: &[String]) -> bool {
    let ext = match path.rsplit_once('.') {
        Some((_, ext)) if !ext.contains('/') => ext.to_ascii_lowercase(),
        _ => return false,
    };
    extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
}

/// Default extension list for the binary heuristic.
pub fn default_binary_extensions() -> Vec<String> {
    [
        "png", "jpg", "jpeg", "gif", "ico", "pdf", "zip", "gz", "jar", "exe", "dll", "so",
        "dylib", "bin", "psd", "ttf", "woff", "woff2",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
