use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use sync_archive::{entry_paths, extract, extract_root, ArchiveBuilder};
use tempfile::TempDir;
use walkdir::WalkDir;

fn create_data_root(parent: &Path) -> PathBuf {
    let root = parent.join("data");
    fs::create_dir_all(root.join("db/wal")).unwrap();
    fs::create_dir_all(root.join("cache/models")).unwrap();
    fs::create_dir_all(root.join("users/cache")).unwrap();

    fs::write(root.join("settings.json"), br#"{"theme":"dark"}"#).unwrap();
    fs::write(root.join("db/main.sqlite"), vec![7u8; 64 * 1024]).unwrap();
    fs::write(root.join("db/wal/000001.log"), b"wal entry").unwrap();
    fs::write(root.join("cache/models/blob.bin"), b"transient").unwrap();
    fs::write(root.join("users/cache/avatar.png"), b"transient too").unwrap();
    fs::write(root.join("users/alice.toml"), b"name = \"alice\"").unwrap();
    root
}

fn snapshot_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let rel = entry.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, fs::read(entry.path()).unwrap())
        })
        .collect()
}

#[test]
fn round_trip_restores_tree_without_excluded_dirs() {
    let source = TempDir::new().unwrap();
    let root = create_data_root(source.path());
    let scratch = TempDir::new().unwrap();

    let summary = ArchiveBuilder::new(&root)
        .exclude_dir("cache")
        .write_to(scratch.path().join("snap.tar.gz"))
        .unwrap();
    assert_eq!(summary.file_count, 4);

    let target = TempDir::new().unwrap();
    let unpacked = extract(&summary.path, target.path()).unwrap();
    assert_eq!(unpacked, 4);

    let restored = snapshot_tree(&target.path().join("data"));
    let mut expected = snapshot_tree(&root);
    expected.retain(|path, _| !path.components().any(|c| c.as_os_str() == "cache"));

    assert_eq!(restored, expected);
    assert!(!target.path().join("data/cache").exists());
    assert!(!target.path().join("data/users/cache").exists());
}

#[test]
fn entries_are_anchored_on_root_name() {
    let source = TempDir::new().unwrap();
    let root = create_data_root(source.path());
    let scratch = TempDir::new().unwrap();

    let summary = ArchiveBuilder::new(&root)
        .exclude_dirs(["cache"])
        .write_to(scratch.path().join("snap.tar.gz"))
        .unwrap();

    let paths = entry_paths(&summary.path).unwrap();
    assert!(paths.iter().all(|p| p.starts_with("data")));
    assert!(paths
        .iter()
        .all(|p| !p.components().any(|c| c.as_os_str() == "cache")));
    assert!(paths.contains(&PathBuf::from("data/db/wal/000001.log")));
}

#[test]
fn entry_order_is_deterministic() {
    let source = TempDir::new().unwrap();
    let root = create_data_root(source.path());
    let scratch = TempDir::new().unwrap();

    let builder = ArchiveBuilder::new(&root).exclude_dir("cache");
    let first = builder.write_to(scratch.path().join("a.tar.gz")).unwrap();
    let second = builder.write_to(scratch.path().join("b.tar.gz")).unwrap();

    assert_eq!(
        entry_paths(&first.path).unwrap(),
        entry_paths(&second.path).unwrap()
    );
}

#[test]
fn extract_overwrites_existing_files() {
    let source = TempDir::new().unwrap();
    let root = create_data_root(source.path());
    let scratch = TempDir::new().unwrap();

    let summary = ArchiveBuilder::new(&root)
        .exclude_dir("cache")
        .write_to(scratch.path().join("snap.tar.gz"))
        .unwrap();

    let target = TempDir::new().unwrap();
    fs::create_dir_all(target.path().join("data")).unwrap();
    fs::write(target.path().join("data/settings.json"), b"stale").unwrap();

    extract(&summary.path, target.path()).unwrap();
    assert_eq!(
        fs::read(target.path().join("data/settings.json")).unwrap(),
        br#"{"theme":"dark"}"#
    );
}

#[cfg(unix)]
#[test]
fn symlinks_are_stored_as_links() {
    let source = TempDir::new().unwrap();
    let root = create_data_root(source.path());
    std::os::unix::fs::symlink("settings.json", root.join("current.json")).unwrap();
    let scratch = TempDir::new().unwrap();

    let summary = ArchiveBuilder::new(&root)
        .exclude_dir("cache")
        .write_to(scratch.path().join("snap.tar.gz"))
        .unwrap();
    assert_eq!(summary.file_count, 5);

    let target = TempDir::new().unwrap();
    extract(&summary.path, target.path()).unwrap();

    let link = target.path().join("data/current.json");
    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("settings.json"));
}

#[test]
fn extract_root_matches_extract_at_the_parent() {
    let source = TempDir::new().unwrap();
    let root = create_data_root(source.path());
    let scratch = TempDir::new().unwrap();
    let summary = ArchiveBuilder::new(&root)
        .exclude_dir("cache")
        .write_to(scratch.path().join("snap.tar.gz"))
        .unwrap();

    let restored = TempDir::new().unwrap();
    let written = extract_root(&summary.path, restored.path().join("data")).unwrap();

    assert_eq!(written, summary.file_count);
    let mut expected = snapshot_tree(&root);
    expected.retain(|path, _| !path.components().any(|c| c.as_os_str() == "cache"));
    assert_eq!(snapshot_tree(&restored.path().join("data")), expected);
}

#[cfg(unix)]
#[test]
fn symlinked_root_round_trips_through_the_link() {
    let base = TempDir::new().unwrap();
    let volume = base.path().join("volume_real");
    fs::create_dir_all(volume.join("db")).unwrap();
    fs::write(volume.join("db/state.json"), b"{\"gen\":1}").unwrap();
    let app = base.path().join("app");
    fs::create_dir_all(&app).unwrap();
    std::os::unix::fs::symlink(&volume, app.join("data")).unwrap();

    let scratch = TempDir::new().unwrap();
    let summary = ArchiveBuilder::new(app.join("data"))
        .write_to(scratch.path().join("snap.tar.gz"))
        .unwrap();
    assert_eq!(
        entry_paths(&summary.path).unwrap(),
        [PathBuf::from("data/db/state.json")]
    );

    fs::write(volume.join("db/state.json"), b"{\"gen\":2}").unwrap();
    extract_root(&summary.path, app.join("data")).unwrap();

    assert_eq!(
        fs::read(volume.join("db/state.json")).unwrap(),
        b"{\"gen\":1}"
    );
    assert!(!app.join("volume_real").exists());
}

#[test]
fn extract_root_skips_entries_for_another_root() {
    let source = TempDir::new().unwrap();
    let root = create_data_root(source.path());
    let scratch = TempDir::new().unwrap();
    let summary = ArchiveBuilder::new(&root)
        .write_to(scratch.path().join("snap.tar.gz"))
        .unwrap();

    let restored = TempDir::new().unwrap();
    let written = extract_root(&summary.path, restored.path().join("other")).unwrap();

    assert_eq!(written, 0);
    assert!(snapshot_tree(&restored.path().join("other")).is_empty());
}
