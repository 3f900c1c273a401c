use crate::path::RemoteDir;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::path::Path;

/// Kind of a listed remote entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// File name, without any directory part.
    pub name: String,
    pub kind: EntryKind,
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl RemoteEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Outcome of a directory creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MkdirStatus {
    Created,
    AlreadyExists,
}

/// Remote storage primitives the snapshot engine is written against.
///
/// Paths are interpreted relative to the store's base location; a leading
/// `/` does not escape it.
pub trait RemoteStore {
    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &str) -> Result<bool>;

    /// Direct children of the directory at `path`.
    fn list(&self, path: &str) -> Result<Vec<RemoteEntry>>;

    /// Create the directory at `path`; its parent must exist.
    fn mkdir(&self, path: &str) -> Result<MkdirStatus>;

    /// Store `local` under `remote_path`.
    fn upload(&self, local: &Path, remote_path: &str, overwrite: bool) -> Result<()>;

    /// Fetch `remote_path` into `local`, replacing it.
    fn download(&self, remote_path: &str, local: &Path) -> Result<()>;

    /// Delete the file at `remote_path`.
    fn remove(&self, remote_path: &str) -> Result<()>;
}

impl<S: RemoteStore + ?Sized> RemoteStore for &S {
    fn exists(&self, path: &str) -> Result<bool> {
        (**self).exists(path)
    }

    fn list(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        (**self).list(path)
    }

    fn mkdir(&self, path: &str) -> Result<MkdirStatus> {
        (**self).mkdir(path)
    }

    fn upload(&self, local: &Path, remote_path: &str, overwrite: bool) -> Result<()> {
        (**self).upload(local, remote_path, overwrite)
    }

    fn download(&self, remote_path: &str, local: &Path) -> Result<()> {
        (**self).download(remote_path, local)
    }

    fn remove(&self, remote_path: &str) -> Result<()> {
        (**self).remove(remote_path)
    }
}

/// Create `dir` and any missing ancestors.
///
/// Best effort: an ancestor that already exists is fine, and a failure on
/// one level is logged and the next level is still attempted. Returns the
/// number of directories created. A directory that could not be created
/// surfaces on the following upload.
pub fn ensure_dir<S: RemoteStore + ?Sized>(store: &S, dir: &RemoteDir) -> usize {
    let mut created = 0;
    for path in dir.ancestry() {
        // Collection form, so servers do not answer with a redirect.
        let path = format!("{}/", path);
        match store.exists(&path) {
            Ok(true) => continue,
            Ok(false) => {}
            Err(e) => {
                warn!("Could not check remote directory {}: {}", path, e);
            }
        }

        match store.mkdir(&path) {
            Ok(MkdirStatus::Created) => {
                debug!("Created remote directory {}", path);
                created += 1;
            }
            Ok(MkdirStatus::AlreadyExists) => {}
            Err(Error::AlreadyExists(_)) => {}
            Err(e) => warn!("Could not create remote directory {}: {}", path, e),
        }
    }
    created
}
