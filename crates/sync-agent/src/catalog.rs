//! Snapshot discovery in a remote directory.

use log::debug;
use serde::Serialize;
use sync_archive::{NamingScheme, SnapshotName};
use sync_remote::{RemoteDir, RemoteEntry, RemoteStore};

/// A snapshot present on the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub name: SnapshotName,
    /// Absolute path of the file below the base URL.
    pub remote_path: String,
}

impl Snapshot {
    pub fn file_name(&self) -> &str {
        self.name.as_str()
    }
}

/// Recognize `entry` as a snapshot of this deployment.
pub fn recognize(entry: &RemoteEntry, dir: &RemoteDir, naming: &NamingScheme) -> Option<Snapshot> {
    if !naming.is_snapshot(&entry.name, entry.is_file()) {
        return None;
    }
    let name = naming.parse(&entry.name)?;
    Some(Snapshot {
        remote_path: dir.file_path(name.as_str()),
        name,
    })
}

/// All snapshots directly in `dir`, newest first.
///
/// Entries whose names carry a recognized prefix but no parseable timestamp
/// sort after every timestamped one.
pub fn discover<S: RemoteStore + ?Sized>(
    store: &S,
    dir: &RemoteDir,
    naming: &NamingScheme,
) -> sync_remote::Result<Vec<Snapshot>> {
    let entries = store.list(&dir.relative())?;
    let total = entries.len();

    let mut snapshots: Vec<Snapshot> = entries
        .iter()
        .filter_map(|entry| recognize(entry, dir, naming))
        .collect();
    snapshots.sort_by(|a, b| b.name.cmp(&a.name));

    debug!(
        "{}: {} of {} entries are snapshots",
        dir,
        snapshots.len(),
        total
    );
    Ok(snapshots)
}
