//! Snapshot file naming.
//!
//! A snapshot is stored as `<prefix><YYYYMMDD_HHMMSS>.tar.gz`. The prefix has
//! changed across deployments, so discovery accepts the current prefix plus
//! every legacy one.

use crate::{Error, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::cmp::Ordering;

/// Suffix shared by every snapshot file.
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// `strftime` pattern of the embedded timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const TIMESTAMP_LEN: usize = 15;

/// A recognized snapshot file name.
///
/// Ordering is chronological: a greater value is a newer snapshot. Names
/// with a parseable timestamp compare by that timestamp, ties fall back to
/// the full name. Names without one are older than any timestamped name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotName {
    name: String,
    prefix: String,
    timestamp: Option<NaiveDateTime>,
}

impl SnapshotName {
    /// The full file name.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The recognized prefix the name was matched against.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The embedded timestamp, if the name carries a well-formed one.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }
}

impl Ord for SnapshotName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for SnapshotName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Sort snapshot names newest first.
pub fn sort_newest_first(names: &mut [SnapshotName]) {
    names.sort_by(|a, b| b.cmp(a));
}

/// The prefix epochs of one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingScheme {
    current_prefix: String,
    legacy_prefixes: Vec<String>,
}

impl NamingScheme {
    /// Create a scheme from the prefix used for new snapshots and the
    /// prefixes used by earlier generations.
    pub fn new<I, S>(current_prefix: impl Into<String>, legacy_prefixes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let current_prefix = current_prefix.into();
        validate_prefix(&current_prefix)?;

        let mut legacy: Vec<String> = Vec::new();
        for prefix in legacy_prefixes.into_iter().map(Into::into) {
            validate_prefix(&prefix)?;
            if prefix != current_prefix && !legacy.contains(&prefix) {
                legacy.push(prefix);
            }
        }

        Ok(Self {
            current_prefix,
            legacy_prefixes: legacy,
        })
    }

    /// Prefix given to newly created snapshots.
    pub fn current_prefix(&self) -> &str {
        &self.current_prefix
    }

    /// Prefixes of earlier generations.
    pub fn legacy_prefixes(&self) -> &[String] {
        &self.legacy_prefixes
    }

    /// Every prefix discovery accepts, current first.
    pub fn recognized_prefixes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.current_prefix.as_str())
            .chain(self.legacy_prefixes.iter().map(String::as_str))
    }

    /// Name for a snapshot taken at `now`.
    pub fn current_name(&self, now: NaiveDateTime) -> String {
        format!(
            "{}{}{}",
            self.current_prefix,
            now.format(TIMESTAMP_FORMAT),
            ARCHIVE_SUFFIX
        )
    }

    /// Whether a remote entry is a snapshot of this deployment.
    pub fn is_snapshot(&self, name: &str, is_file: bool) -> bool {
        is_file && self.parse(name).is_some()
    }

    /// Match `name` against the recognized prefixes.
    ///
    /// When several prefixes match, one that leaves a well-formed timestamp
    /// wins over one that does not, then the longest prefix wins.
    pub fn parse(&self, name: &str) -> Option<SnapshotName> {
        let stem = name.strip_suffix(ARCHIVE_SUFFIX)?;

        let mut best: Option<SnapshotName> = None;
        for prefix in self.recognized_prefixes() {
            let Some(middle) = stem.strip_prefix(prefix) else {
                continue;
            };
            let candidate = SnapshotName {
                name: name.to_string(),
                prefix: prefix.to_string(),
                timestamp: parse_timestamp(middle),
            };
            best = match best {
                Some(current) if rank(&current) >= rank(&candidate) => Some(current),
                _ => Some(candidate),
            };
        }
        best
    }
}

fn rank(name: &SnapshotName) -> (bool, usize) {
    (name.timestamp.is_some(), name.prefix.len())
}

fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.trim().is_empty() {
        return Err(Error::InvalidNaming("prefix cannot be empty".to_string()));
    }
    if prefix.contains('/') {
        return Err(Error::InvalidNaming(format!(
            "prefix cannot contain '/': {}",
            prefix
        )));
    }
    Ok(())
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let well_formed = text.len() == TIMESTAMP_LEN
        && text
            .bytes()
            .enumerate()
            .all(|(i, b)| if i == 8 { b == b'_' } else { b.is_ascii_digit() });
    if !well_formed {
        return None;
    }
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok()
}
