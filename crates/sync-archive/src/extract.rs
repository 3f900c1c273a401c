use crate::{Error, Result};
use flate2::read::GzDecoder;
use log::{debug, warn};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

/// Unpack a `.tar.gz` snapshot into `dest_dir`.
///
/// Existing files are overwritten and modification times restored. Entries
/// whose path would land outside `dest_dir` are skipped. Returns the number
/// of entries written.
pub fn extract<P: AsRef<Path>, Q: AsRef<Path>>(archive_path: P, dest_dir: Q) -> Result<usize> {
    let dest_dir = dest_dir.as_ref();
    fs::create_dir_all(dest_dir)?;

    let file = File::open(archive_path.as_ref())?;
    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    archive.set_overwrite(true);
    archive.set_preserve_mtime(true);

    let mut unpacked = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        if entry.unpack_in(dest_dir)? {
            unpacked += 1;
        } else {
            warn!("Skipping entry outside destination: {}", path.display());
        }
    }

    debug!("Unpacked {} entries into {}", unpacked, dest_dir.display());
    Ok(unpacked)
}

/// Unpack a snapshot of a data root back over `root`.
///
/// Entries are stored as `<root name>/<path below root>`. Each one is
/// written below `root` with the first component removed, so a root that
/// is a symlink is restored through the link instead of beside it. Entries
/// under another name, or that would land outside `root`, are skipped.
/// Returns the number of entries written.
pub fn extract_root<P: AsRef<Path>, Q: AsRef<Path>>(archive_path: P, root: Q) -> Result<usize> {
    let root = root.as_ref();
    let anchor = root
        .file_name()
        .ok_or_else(|| Error::InvalidRoot(root.display().to_string()))?;
    fs::create_dir_all(root)?;
    let dest = fs::canonicalize(root)?;

    let file = File::open(archive_path.as_ref())?;
    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    archive.set_overwrite(true);
    archive.set_preserve_mtime(true);

    let mut unpacked = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();

        let mut components = path.components();
        let relative = match components.next() {
            Some(Component::Normal(first)) if first == anchor => components.as_path(),
            _ => {
                warn!(
                    "Skipping entry not under {}: {}",
                    anchor.to_string_lossy(),
                    path.display()
                );
                continue;
            }
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            warn!("Skipping entry outside destination: {}", path.display());
            continue;
        }

        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
            // A symlink unpacked earlier must not redirect later entries.
            if !fs::canonicalize(parent)?.starts_with(&dest) {
                warn!("Skipping entry outside destination: {}", path.display());
                continue;
            }
        }
        entry.unpack(&target)?;
        unpacked += 1;
    }

    debug!("Unpacked {} entries into {}", unpacked, dest.display());
    Ok(unpacked)
}

/// List entry paths stored in a `.tar.gz` snapshot without unpacking it.
pub fn entry_paths<P: AsRef<Path>>(archive_path: P) -> Result<Vec<PathBuf>> {
    let file = File::open(archive_path.as_ref())?;
    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

    let mut paths = Vec::new();
    for entry in archive.entries()? {
        paths.push(entry?.path()?.into_owned());
    }
    Ok(paths)
}
