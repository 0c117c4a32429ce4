//! # Force Pruning
//!
//! Removes local files that the remote listing no longer contains. Only
//! immediate, non-directory entries of the destination are candidates.

use super::types::{FailureKind, ObjectFailure};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, error, info};

/// Outcome of one pruning pass
#[derive(Debug, Default)]
pub struct PruneOutcome {
    pub deleted: Vec<String>,
    pub failures: Vec<ObjectFailure>,
}

/// Delete every file in `dir` whose name is not in `observed`.
///
/// A failure to remove one file is recorded and the pass continues.
pub async fn prune_unlisted(dir: &Path, observed: &HashSet<String>) -> PruneOutcome {
    let mut outcome = PruneOutcome::default();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            error!("Could not list {}: {}", dir.display(), e);
            outcome.failures.push(ObjectFailure {
                key: dir.display().to_string(),
                kind: FailureKind::Delete,
                message: e.to_string(),
            });
            return outcome;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                error!("Could not read entry of {}: {}", dir.display(), e);
                outcome.failures.push(ObjectFailure {
                    key: dir.display().to_string(),
                    kind: FailureKind::Delete,
                    message: e.to_string(),
                });
                break;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        if observed.contains(&name) {
            continue;
        }

        match entry.file_type().await {
            Ok(file_type) if file_type.is_dir() => {
                debug!("Leaving directory {} in place", name);
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                error!("Could not inspect {}: {}", entry.path().display(), e);
                outcome.failures.push(ObjectFailure {
                    key: name,
                    kind: FailureKind::Delete,
                    message: e.to_string(),
                });
                continue;
            }
        }

        info!("File {} is not present in s3, removing it", name);
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => outcome.deleted.push(name),
            Err(e) => {
                error!("Could not remove {}: {}", entry.path().display(), e);
                outcome.failures.push(ObjectFailure {
                    key: name,
                    kind: FailureKind::Delete,
                    message: e.to_string(),
                });
            }
        }
    }

    outcome.deleted.sort();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prune_removes_only_unlisted_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["keep.crt", "keep.key", "stale.crt", "stale.key"] {
            std::fs::write(dir.path().join(name), name).unwrap();
        }
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let observed: HashSet<String> = ["keep.crt", "keep.key", "gone-remote.crt"]
            .into_iter()
            .map(String::from)
            .collect();
        let outcome = prune_unlisted(dir.path(), &observed).await;

        assert_eq!(outcome.deleted, vec!["stale.crt", "stale.key"]);
        assert!(outcome.failures.is_empty());
        assert!(dir.path().join("keep.crt").exists());
        assert!(dir.path().join("keep.key").exists());
        assert!(!dir.path().join("stale.crt").exists());
        assert!(dir.path().join("nested").is_dir());
    }

    #[tokio::test]
    async fn test_prune_missing_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = prune_unlisted(&dir.path().join("absent"), &HashSet::new()).await;

        assert!(outcome.deleted.is_empty());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].kind, FailureKind::Delete);
    }
}
