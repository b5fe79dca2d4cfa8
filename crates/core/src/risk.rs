//! Merge-risk classification.
//!
//! Combines the history divergence status and the blob status into a risk
//! verdict via a fixed decision table. The table is authoritative: it is
//! spelled out combination by combination rather than derived from weights
//! or heuristics, so a reviewer can audit every cell.
//!
//! | status       | blob              | likelihood | reason             | safe_by_git   | check              |
//! |--------------|-------------------|------------|--------------------|---------------|--------------------|
//! | up_to_date   | identical         | low        | identical          | true          | none               |
//! | up_to_date   | different         | medium     | blob_mismatch      | false         | verify_head        |
//! | up_to_date   | missing           | high       | missing_in_fork    | false         | added_or_removed   |
//! | ahead/behind | identical         | low        | identical          | true          | none               |
//! | ahead/behind | different         | medium     | blob_mismatch      | ahead only    | verify_ancestor    |
//! | ahead/behind | missing           | high       | missing_in_fork    | false         | added_or_removed   |
//! | diverged     | identical         | medium     | identical          | true          | none               |
//! | diverged     | different/missing | high       | diverged_content   | false         | three_way_merge    |
//! | unrelated    | identical         | medium     | unrelated          | true          | none               |
//! | unrelated    | different/missing | high       | unrelated          | false         | three_way_merge    |
//!
//! Anything outside the enumerated combinations (e.g. a file whose analysis
//! failed) gets [`MergeRisk::unknown`]: high likelihood, not safe, generic
//! merge attempt recommended.
//!
//! The verdict is advisory. It decides whether the expensive three-way
//! content check runs; the binding per-file instruction comes from the
//! strategy resolver, which operates independently.

use crate::models::{
    BlobStatus, DivergenceStatus, MergeRisk, RecommendedCheck, RiskLikelihood, RiskReason,
};

/// Classify the merge risk for one (divergence, blob) combination.
pub fn classify(status: DivergenceStatus, blob: BlobStatus) -> MergeRisk {
    use BlobStatus as B;
    use DivergenceStatus as D;

    let (likelihood, reason, safe_by_git, recommended_check) = match (status, blob) {
        (D::UpToDate, B::Identical) => (
            RiskLikelihood::Low,
            RiskReason::Identical,
            true,
            RecommendedCheck::None,
        ),
        (D::UpToDate, B::Different) => (
            RiskLikelihood::Medium,
            RiskReason::BlobMismatch,
            false,
            RecommendedCheck::VerifyHead,
        ),
        (D::UpToDate, B::Missing) => (
            RiskLikelihood::High,
            RiskReason::MissingInFork,
            false,
            RecommendedCheck::AddedOrRemoved,
        ),

        (D::Ahead | D::Behind, B::Identical) => (
            RiskLikelihood::Low,
            RiskReason::Identical,
            true,
            RecommendedCheck::None,
        ),
        (D::Ahead, B::Different) => (
            RiskLikelihood::Medium,
            RiskReason::BlobMismatch,
            true,
            RecommendedCheck::VerifyAncestor,
        ),
        (D::Behind, B::Different) => (
            RiskLikelihood::Medium,
            RiskReason::BlobMismatch,
            false,
            RecommendedCheck::VerifyAncestor,
        ),
        (D::Ahead | D::Behind, B::Missing) => (
            RiskLikelihood::High,
            RiskReason::MissingInFork,
            false,
            RecommendedCheck::AddedOrRemoved,
        ),

        (D::Diverged, B::Identical) => (
            RiskLikelihood::Medium,
            RiskReason::Identical,
            true,
            RecommendedCheck::None,
        ),
        (D::Diverged, B::Different | B::Missing) => (
            RiskLikelihood::High,
            RiskReason::DivergedContent,
            false,
            RecommendedCheck::ThreeWayMergeCheck,
        ),

        (D::Unrelated, B::Identical) => (
            RiskLikelihood::Medium,
            RiskReason::UnrelatedHistories,
            true,
            RecommendedCheck::None,
        ),
        (D::Unrelated, B::Different | B::Missing) => (
            RiskLikelihood::High,
            RiskReason::UnrelatedHistories,
            false,
            RecommendedCheck::ThreeWayMergeCheck,
        ),
    };

    MergeRisk {
        likelihood,
        reason,
        safe_by_git,
        recommended_check,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BlobStatus as B;
    use DivergenceStatus as D;
    use RecommendedCheck as C;
    use RiskLikelihood as L;
    use RiskReason as R;

    /// One case per table row; the table is the contract.
    #[test]
    fn test_decision_table() {
        #[rustfmt::skip]
        let table: &[(D, B, L, R, bool, C)] = &[
            (D::UpToDate,  B::Identical, L::Low,    R::Identical,          true,  C::None),
            (D::UpToDate,  B::Different, L::Medium, R::BlobMismatch,       false, C::VerifyHead),
            (D::UpToDate,  B::Missing,   L::High,   R::MissingInFork,      false, C::AddedOrRemoved),
            (D::Ahead,     B::Identical, L::Low,    R::Identical,          true,  C::None),
            (D::Behind,    B::Identical, L::Low,    R::Identical,          true,  C::None),
            (D::Ahead,     B::Different, L::Medium, R::BlobMismatch,       true,  C::VerifyAncestor),
            (D::Behind,    B::Different, L::Medium, R::BlobMismatch,       false, C::VerifyAncestor),
            (D::Ahead,     B::Missing,   L::High,   R::MissingInFork,      false, C::AddedOrRemoved),
            (D::Behind,    B::Missing,   L::High,   R::MissingInFork,      false, C::AddedOrRemoved),
            (D::Diverged,  B::Identical, L::Medium, R::Identical,          true,  C::None),
            (D::Diverged,  B::Different, L::High,   R::DivergedContent,    false, C::ThreeWayMergeCheck),
            (D::Diverged,  B::Missing,   L::High,   R::DivergedContent,    false, C::ThreeWayMergeCheck),
            (D::Unrelated, B::Identical, L::Medium, R::UnrelatedHistories, true,  C::None),
            (D::Unrelated, B::Different, L::High,   R::UnrelatedHistories, false, C::ThreeWayMergeCheck),
            (D::Unrelated, B::Missing,   L::High,   R::UnrelatedHistories, false, C::ThreeWayMergeCheck),
        ];

        for (status, blob, likelihood, reason, safe, check) in table {
            let risk = classify(*status, *blob);
            assert_eq!(risk.likelihood, *likelihood, "{status}/{blob} likelihood");
            assert_eq!(risk.reason, *reason, "{status}/{blob} reason");
            assert_eq!(risk.safe_by_git, *safe, "{status}/{blob} safe_by_git");
            assert_eq!(risk.recommended_check, *check, "{status}/{blob} check");
        }
    }

    #[test]
    fn test_safe_by_git_true_iff_ahead_for_different_blobs() {
        assert!(classify(D::Ahead, B::Different).safe_by_git);
        assert!(!classify(D::Behind, B::Different).safe_by_git);
    }
}
