//! Selecting and unpacking the newest snapshot.

use crate::catalog::{self, Snapshot};
use crate::{AgentError, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use sync_archive::NamingScheme;
use sync_remote::{RemoteDir, RemoteStore};
use tempfile::TempDir;

/// What a restore unpacked, and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    pub snapshot: String,
    pub entries: usize,
    pub extracted_into: PathBuf,
}

/// The newest recognized snapshot in `dir`.
///
/// A directory that does not exist yet holds no snapshots; that is a fresh
/// deployment, not an error.
pub fn select_latest<S: RemoteStore + ?Sized>(
    store: &S,
    dir: &RemoteDir,
    naming: &NamingScheme,
) -> sync_remote::Result<Option<Snapshot>> {
    if !store.exists(&dir.relative())? {
        debug!("Remote directory {} does not exist", dir);
        return Ok(None);
    }
    match catalog::discover(store, dir, naming) {
        Ok(snapshots) => Ok(snapshots.into_iter().next()),
        Err(sync_remote::Error::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Directory a snapshot of `local_path` is unpacked into.
///
/// Archive entries are anchored on the data root's own name, so they land
/// in its parent. A bare name unpacks into the working directory.
pub fn extraction_dir(local_path: &Path) -> Result<PathBuf> {
    if local_path.file_name().is_none() {
        return Err(AgentError::Config(format!(
            "local path {} does not name a directory",
            local_path.display()
        )));
    }
    Ok(match local_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    })
}

/// Create a private scratch directory under `scratch_root`.
pub fn scratch_dir(scratch_root: &Path) -> Result<TempDir> {
    fs::create_dir_all(scratch_root)?;
    let dir = tempfile::Builder::new()
        .prefix(".sync-agent-")
        .tempdir_in(scratch_root)?;
    Ok(dir)
}

/// Download `snapshot` into `scratch`, returning the local copy.
pub fn download<S: RemoteStore + ?Sized>(
    store: &S,
    snapshot: &Snapshot,
    scratch: &Path,
) -> Result<PathBuf> {
    let local = scratch.join(snapshot.file_name());
    store
        .download(&snapshot.remote_path, &local)
        .map_err(AgentError::Transfer)?;
    debug!("Downloaded {} to {}", snapshot.file_name(), local.display());
    Ok(local)
}

/// Unpack a downloaded snapshot over `local_path`.
///
/// Entries land where packing found them, through `local_path` even when
/// it is a symlink. Existing files are overwritten; files absent from the
/// snapshot are left alone. Returns the number of entries unpacked.
pub fn unpack(archive: &Path, local_path: &Path) -> Result<usize> {
    extraction_dir(local_path)?;
    let entries = sync_archive::extract_root(archive, local_path)?;
    if entries == 0 {
        warn!(
            "Snapshot {} had no entries for {}",
            archive.display(),
            local_path.display()
        );
    }
    Ok(entries)
}

/// Download and unpack `snapshot` over `local_path`, using a scratch
/// directory under `scratch_root` that is removed afterwards.
pub fn restore<S: RemoteStore + ?Sized>(
    store: &S,
    snapshot: &Snapshot,
    local_path: &Path,
    scratch_root: &Path,
) -> Result<RestoreSummary> {
    let extracted_into = extraction_dir(local_path)?;
    let scratch = scratch_dir(scratch_root)?;
    let archive = download(store, snapshot, scratch.path())?;
    let entries = unpack(&archive, local_path)?;
    info!(
        "Restored {} ({} entries) into {}",
        snapshot.file_name(),
        entries,
        local_path.display()
    );
    Ok(RestoreSummary {
        snapshot: snapshot.file_name().to_string(),
        entries,
        extracted_into,
    })
}
