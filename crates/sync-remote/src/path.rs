//! Base URL and remote directory normalization.
//!
//! Upload, download and delete address files through the absolute form
//! (`/a/b/file`). Listing and existence checks address the directory through
//! the relative form (`a/b/`), whose trailing slash avoids the redirect some
//! servers issue for collection URLs. Both forms are rendered from the same
//! segment list so they cannot drift apart.

use crate::{Error, Result};
use url::Url;

/// Normalize a base URL to end in exactly one `/`.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("base URL cannot be empty".to_string()));
    }

    let url = Url::parse(trimmed).map_err(|e| Error::InvalidUrl(format!("{}: {}", trimmed, e)))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Error::InvalidUrl(format!(
                "unsupported scheme '{}' in {}",
                other, trimmed
            )))
        }
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(Error::InvalidUrl(format!(
            "base URL cannot carry a query or fragment: {}",
            trimmed
        )));
    }

    Ok(format!("{}/", trimmed.trim_end_matches('/')))
}

/// A remote directory, held as normalized path segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDir {
    segments: Vec<String>,
}

impl RemoteDir {
    /// Parse a raw directory string such as `backups/app/`, `/backups//app`
    /// or `/`.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut segments = Vec::new();
        for segment in raw.trim().split('/') {
            match segment {
                "" => {}
                "." | ".." => {
                    return Err(Error::InvalidPath(format!(
                        "relative segment '{}' in {}",
                        segment, raw
                    )))
                }
                _ => segments.push(segment.to_string()),
            }
        }
        Ok(Self { segments })
    }

    /// The base directory of the endpoint.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Whether this is the base directory of the endpoint.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Leading `/`, no trailing `/` (`/` for the root).
    pub fn absolute(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// No leading `/`, trailing `/` (empty for the root).
    pub fn relative(&self) -> String {
        if self.is_root() {
            String::new()
        } else {
            format!("{}/", self.segments.join("/"))
        }
    }

    /// Absolute path of a file stored directly in this directory.
    pub fn file_path(&self, name: &str) -> String {
        if self.is_root() {
            format!("/{}", name)
        } else {
            format!("{}/{}", self.absolute(), name)
        }
    }

    /// Absolute paths of this directory and each of its ancestors, outermost
    /// first. Empty for the root.
    pub fn ancestry(&self) -> Vec<String> {
        (1..=self.segments.len())
            .map(|depth| format!("/{}", self.segments[..depth].join("/")))
            .collect()
    }
}

impl std::fmt::Display for RemoteDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.absolute())
    }
}
