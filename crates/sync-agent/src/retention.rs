//! Bounded retention of remote snapshots.

use crate::catalog;
use crate::config::RetentionPolicy;
use log::{debug, info, warn};
use serde::Serialize;
use sync_archive::NamingScheme;
use sync_remote::{RemoteDir, RemoteStore};

/// A snapshot retention tried and failed to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupFailure {
    pub name: String,
    pub error: String,
}

/// What a cleanup pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetentionReport {
    /// Snapshots inside the retention window, newest first.
    pub kept: Vec<String>,
    /// Snapshots deleted, newest first.
    pub deleted: Vec<String>,
    /// Snapshots that should have been deleted but are still there.
    pub failed: Vec<CleanupFailure>,
}

impl RetentionReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delete every recognized snapshot in `dir` beyond the newest
/// `policy.max_backups()`, across all prefix generations.
///
/// Only the listing can fail the pass. Each deletion is attempted once; a
/// failed deletion is logged, recorded, and the pass moves on. A snapshot
/// that vanished before its deletion counts as deleted.
pub fn enforce<S: RemoteStore + ?Sized>(
    store: &S,
    dir: &RemoteDir,
    naming: &NamingScheme,
    policy: RetentionPolicy,
) -> sync_remote::Result<RetentionReport> {
    let snapshots = catalog::discover(store, dir, naming)?;
    let keep = policy.max_backups().min(snapshots.len());
    let (kept, evicted) = snapshots.split_at(keep);

    let mut report = RetentionReport {
        kept: kept.iter().map(|s| s.file_name().to_string()).collect(),
        ..RetentionReport::default()
    };

    if evicted.is_empty() {
        debug!(
            "Cleanup: {} snapshots, limit {}, nothing to delete",
            snapshots.len(),
            policy.max_backups()
        );
        return Ok(report);
    }

    info!(
        "Cleanup: found {} snapshots, keeping {}, deleting {}",
        snapshots.len(),
        kept.len(),
        evicted.len()
    );

    for snapshot in evicted {
        let name = snapshot.file_name().to_string();
        match store.remove(&snapshot.remote_path) {
            Ok(()) => {
                info!("Deleted old snapshot: {}", name);
                report.deleted.push(name);
            }
            Err(sync_remote::Error::NotFound(_)) => {
                debug!("Snapshot {} was already gone", name);
                report.deleted.push(name);
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", name, e);
                report.failed.push(CleanupFailure {
                    name,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}
