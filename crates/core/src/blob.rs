//! Blob-level content comparison between repository states.

use crate::models::{BlobStatus, FileIdentity};

/// Compare content identity between the boilerplate's file and the fork's
/// (possibly absent) counterpart. Pure, O(1).
pub fn compare_blobs(boilerplate: &FileIdentity, fork: Option<&FileIdentity>) -> BlobStatus {
    match fork {
        None => BlobStatus::Missing,
        Some(f) if f.content_hash == boilerplate.content_hash => BlobStatus::Identical,
        Some(_) => BlobStatus::Different,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(path: &str, hash: &str) -> FileIdentity {
        FileIdentity {
            path: path.into(),
            content_hash: hash.into(),
            last_commit_id: "c0".into(),
        }
    }

    #[test]
    fn test_identical() {
        let b = identity("src/main.rs", "h1");
        let f = identity("src/main.rs", "h1");
        assert_eq!(compare_blobs(&b, Some(&f)), BlobStatus::Identical);
    }

    #[test]
    fn test_different() {
        let b = identity("src/main.rs", "h1");
        let f = identity("src/main.rs", "h2");
        assert_eq!(compare_blobs(&b, Some(&f)), BlobStatus::Different);
    }

    #[test]
    fn test_missing() {
        let b = identity("src/main.rs", "h1");
        assert_eq!(compare_blobs(&b, None), BlobStatus::Missing);
    }
}
