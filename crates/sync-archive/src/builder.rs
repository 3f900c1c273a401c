use crate::{Error, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, trace};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Result of packing a data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Location of the written archive.
    pub path: PathBuf,
    /// Number of non-directory entries added.
    pub file_count: usize,
}

impl ArchiveSummary {
    /// True when the data root had nothing eligible to archive.
    pub fn is_empty(&self) -> bool {
        self.file_count == 0
    }
}

/// Builder for gzip-compressed tar snapshots of a data root.
///
/// Entry names are `<root name>/<path below root>`, so unpacking the archive
/// in the parent of the root recreates the root in place.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    root: PathBuf,
    exclude_dirs: BTreeSet<String>,
    compression: Compression,
}

impl ArchiveBuilder {
    /// Create a builder for the given data root.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            exclude_dirs: BTreeSet::new(),
            compression: Compression::default(),
        }
    }

    /// Prune every directory with this name from the walk.
    pub fn exclude_dir(mut self, name: impl Into<String>) -> Self {
        self.exclude_dirs.insert(name.into());
        self
    }

    /// Prune every directory whose name is in `names` from the walk.
    pub fn exclude_dirs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_dirs.extend(names.into_iter().map(Into::into));
        self
    }

    /// Set the gzip level (0-9).
    pub fn with_compression(mut self, level: u32) -> Self {
        self.compression = Compression::new(level.min(9));
        self
    }

    /// Walk the data root and write the archive to `path`.
    ///
    /// The archive file is always written; callers check
    /// [`ArchiveSummary::is_empty`] before doing anything with it.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<ArchiveSummary> {
        let root = self.resolve_root()?;
        let anchor = self.anchor(&root)?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(path)?;
        let encoder = GzEncoder::new(BufWriter::new(file), self.compression);
        let mut tar = tar::Builder::new(encoder);
        tar.follow_symlinks(false);

        let mut file_count = 0;
        let walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(entry));

        for entry in walker {
            let entry = entry?;
            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if !file_type.is_file() && !file_type.is_symlink() {
                debug!("Skipping special file: {}", entry.path().display());
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&root)
                .map_err(|_| Error::EntryPath(entry.path().display().to_string()))?;
            let name = anchor.join(relative);
            trace!("Adding {}", name.display());
            tar.append_path_with_name(entry.path(), &name)?;
            file_count += 1;
        }

        let encoder = tar.into_inner()?;
        let mut writer = encoder.finish()?;
        writer.flush()?;

        debug!(
            "Packed {} entries from {} into {}",
            file_count,
            root.display(),
            path.display()
        );

        Ok(ArchiveSummary {
            path: path.to_path_buf(),
            file_count,
        })
    }

    fn resolve_root(&self) -> Result<PathBuf> {
        let root = fs::canonicalize(&self.root)
            .map_err(|e| Error::InvalidRoot(format!("{}: {}", self.root.display(), e)))?;
        if !root.is_dir() {
            return Err(Error::InvalidRoot(format!(
                "{}: not a directory",
                self.root.display()
            )));
        }
        Ok(root)
    }

    /// Name every entry is stored under.
    ///
    /// Taken from the root as given, so a symlinked root is stored under
    /// the link's name and unpacks back into the same place. Only a root
    /// ending in `.` or `..` falls back to the resolved directory's name.
    fn anchor(&self, resolved: &Path) -> Result<PathBuf> {
        self.root
            .file_name()
            .or_else(|| resolved.file_name())
            .map(PathBuf::from)
            .ok_or_else(|| Error::InvalidRoot(self.root.display().to_string()))
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.exclude_dirs.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_root_is_rejected() {
        let temp = TempDir::new().unwrap();
        let err = ArchiveBuilder::new(temp.path().join("absent"))
            .write_to(temp.path().join("out.tar.gz"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRoot(_)));
    }

    #[test]
    fn file_root_is_rejected() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain");
        fs::write(&file, b"x").unwrap();

        let err = ArchiveBuilder::new(&file)
            .write_to(temp.path().join("out.tar.gz"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRoot(_)));
    }

    #[test]
    fn empty_root_reports_zero_files() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("data");
        fs::create_dir_all(root.join("nested/empty")).unwrap();

        let summary = ArchiveBuilder::new(&root)
            .write_to(temp.path().join("out.tar.gz"))
            .unwrap();
        assert!(summary.is_empty());
    }

    #[test]
    fn excluded_directories_do_not_count() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("data");
        fs::create_dir_all(root.join("cache")).unwrap();
        fs::write(root.join("cache/blob"), b"transient").unwrap();

        let summary = ArchiveBuilder::new(&root)
            .exclude_dir("cache")
            .write_to(temp.path().join("out.tar.gz"))
            .unwrap();
        assert_eq!(summary.file_count, 0);
    }

    #[test]
    fn dot_root_uses_the_resolved_name() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("data");
        fs::create_dir_all(root.join("inner")).unwrap();
        fs::write(root.join("state.db"), b"s").unwrap();

        let summary = ArchiveBuilder::new(root.join("inner/.."))
            .write_to(temp.path().join("out.tar.gz"))
            .unwrap();
        let paths = crate::entry_paths(&summary.path).unwrap();
        assert_eq!(paths, [PathBuf::from("data/state.db")]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_root_is_stored_under_the_link_name() {
        let temp = TempDir::new().unwrap();
        let real = temp.path().join("volume_real");
        fs::create_dir_all(&real).unwrap();
        fs::write(real.join("state.db"), b"state").unwrap();
        let app = temp.path().join("app");
        fs::create_dir_all(&app).unwrap();
        std::os::unix::fs::symlink(&real, app.join("data")).unwrap();

        let summary = ArchiveBuilder::new(app.join("data"))
            .write_to(temp.path().join("out.tar.gz"))
            .unwrap();
        let paths = crate::entry_paths(&summary.path).unwrap();
        assert_eq!(paths, [PathBuf::from("data/state.db")]);
    }

    #[test]
    fn compression_level_changes_the_output() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("data");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("zeros.bin"), vec![0u8; 256 * 1024]).unwrap();

        let stored = ArchiveBuilder::new(&root)
            .with_compression(0)
            .write_to(temp.path().join("stored.tar.gz"))
            .unwrap();
        let packed = ArchiveBuilder::new(&root)
            .with_compression(9)
            .write_to(temp.path().join("packed.tar.gz"))
            .unwrap();

        let size = |p: &Path| fs::metadata(p).unwrap().len();
        assert!(size(&packed.path) < size(&stored.path) / 10);
        assert_eq!(crate::entry_paths(&stored.path).unwrap().len(), 1);
    }

    #[test]
    fn root_named_like_excluded_dir_is_still_walked() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("cache");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("keep.txt"), b"kept").unwrap();

        let summary = ArchiveBuilder::new(&root)
            .exclude_dir("cache")
            .write_to(temp.path().join("out.tar.gz"))
            .unwrap();
        assert_eq!(summary.file_count, 1);
    }
}
