//! In-memory [`RemoteStore`] with fault injection.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use sync_remote::{EntryKind, Error, MkdirStatus, RemoteEntry, RemoteStore, Result};

#[derive(Default)]
pub struct MemoryStore {
    // Absolute path -> file contents, `None` for directories.
    nodes: RefCell<BTreeMap<String, Option<Vec<u8>>>>,
    failing_removals: RefCell<BTreeSet<String>>,
    fail_listing: Cell<bool>,
    fail_uploads: Cell<bool>,
    mutations: Cell<usize>,
}

fn key(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}

fn parent(key: &str) -> String {
    match key.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => key[..i].to_string(),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_dir(&self, path: &str) {
        let key = key(path);
        self.put_parents(&key);
        self.nodes.borrow_mut().insert(key, None);
    }

    pub fn put_file(&self, path: &str) {
        self.put_bytes(path, path.as_bytes());
    }

    pub fn put_bytes(&self, path: &str, bytes: &[u8]) {
        let key = key(path);
        self.put_parents(&key);
        self.nodes.borrow_mut().insert(key, Some(bytes.to_vec()));
    }

    fn put_parents(&self, key: &str) {
        let mut dir = parent(key);
        while dir != "/" {
            let next = parent(&dir);
            self.nodes.borrow_mut().entry(dir).or_insert(None);
            dir = next;
        }
    }

    pub fn fail_removal_of(&self, name: &str) {
        self.failing_removals.borrow_mut().insert(name.to_string());
    }

    pub fn fail_listing(&self) {
        self.fail_listing.set(true);
    }

    pub fn fail_uploads(&self) {
        self.fail_uploads.set(true);
    }

    /// Number of mkdir, upload and remove calls that changed something.
    pub fn mutations(&self) -> usize {
        self.mutations.get()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.borrow().contains_key(&key(path))
    }

    pub fn bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.nodes.borrow().get(&key(path)).cloned().flatten()
    }

    /// File names directly below `dir`, sorted.
    pub fn file_names(&self, dir: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .list(dir)
            .unwrap_or_default()
            .into_iter()
            .filter(|e| e.is_file())
            .map(|e| e.name)
            .collect();
        names.sort();
        names
    }

    fn is_dir(&self, key: &str) -> bool {
        key == "/" || matches!(self.nodes.borrow().get(key), Some(None))
    }

    fn status(method: &str, path: &str, status: u16) -> Error {
        Error::Status {
            method: method.to_string(),
            path: path.to_string(),
            status,
        }
    }
}

impl RemoteStore for MemoryStore {
    fn exists(&self, path: &str) -> Result<bool> {
        let key = key(path);
        Ok(key == "/" || self.nodes.borrow().contains_key(&key))
    }

    fn list(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        if self.fail_listing.get() {
            return Err(Self::status("PROPFIND", path, 500));
        }
        let dir = key(path);
        if !self.is_dir(&dir) {
            return Err(Error::NotFound(path.to_string()));
        }

        let mut entries: Vec<RemoteEntry> = self
            .nodes
            .borrow()
            .iter()
            .filter(|(k, _)| k.as_str() != "/" && parent(k) == dir)
            .map(|(k, node)| RemoteEntry {
                name: k.rsplit('/').next().unwrap_or_default().to_string(),
                kind: if node.is_some() {
                    EntryKind::File
                } else {
                    EntryKind::Directory
                },
                size: node.as_ref().map(|b| b.len() as u64),
                last_modified: None,
            })
            .collect();
        // Listing order is not something callers may rely on.
        entries.reverse();
        Ok(entries)
    }

    fn mkdir(&self, path: &str) -> Result<MkdirStatus> {
        let key = key(path);
        if self.exists(&key)? {
            return Ok(MkdirStatus::AlreadyExists);
        }
        if !self.is_dir(&parent(&key)) {
            return Err(Self::status("MKCOL", path, 409));
        }
        self.nodes.borrow_mut().insert(key, None);
        self.mutations.set(self.mutations.get() + 1);
        Ok(MkdirStatus::Created)
    }

    fn upload(&self, local: &Path, remote_path: &str, overwrite: bool) -> Result<()> {
        if self.fail_uploads.get() {
            return Err(Self::status("PUT", remote_path, 507));
        }
        let key = key(remote_path);
        if !self.is_dir(&parent(&key)) {
            return Err(Self::status("PUT", remote_path, 409));
        }
        if !overwrite && self.nodes.borrow().contains_key(&key) {
            return Err(Error::AlreadyExists(remote_path.to_string()));
        }
        let bytes = fs::read(local)?;
        self.nodes.borrow_mut().insert(key, Some(bytes));
        self.mutations.set(self.mutations.get() + 1);
        Ok(())
    }

    fn download(&self, remote_path: &str, local: &Path) -> Result<()> {
        let bytes = self
            .bytes(remote_path)
            .ok_or_else(|| Error::NotFound(remote_path.to_string()))?;
        fs::write(local, bytes)?;
        Ok(())
    }

    fn remove(&self, remote_path: &str) -> Result<()> {
        let key = key(remote_path);
        let name = key.rsplit('/').next().unwrap_or_default();
        if self.failing_removals.borrow().contains(name) {
            return Err(Self::status("DELETE", remote_path, 403));
        }
        if self.nodes.borrow_mut().remove(&key).is_none() {
            return Err(Error::NotFound(remote_path.to_string()));
        }
        self.mutations.set(self.mutations.get() + 1);
        Ok(())
    }
}
