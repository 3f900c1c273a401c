//! Agent configuration.
//!
//! Every tunable of a run lives in [`AgentConfig`]; there is no global
//! state. Values come from [`AgentConfig::default`], optionally a TOML file,
//! then command-line overrides.

use crate::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sync_archive::NamingScheme;
use sync_remote::webdav::SessionConfig;
use sync_remote::RemoteDir;

/// Settings shared by push and pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Prefix of newly created snapshots.
    pub current_prefix: String,
    /// Prefixes of earlier generations, still discovered and pruned.
    pub legacy_prefixes: Vec<String>,
    /// Number of snapshots retention keeps.
    pub max_backups: usize,
    /// Directory names pruned from every archive.
    pub exclude_dirs: Vec<String>,
    /// Where archives are built and snapshots downloaded.
    pub scratch_dir: PathBuf,
    /// Bound on the reachability probe.
    pub probe_timeout_secs: u64,
    /// Bound on every metadata request after the probe.
    pub request_timeout_secs: u64,
    /// Bound on a whole snapshot upload or download.
    pub transfer_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            current_prefix: "sys_dat_".to_string(),
            legacy_prefixes: vec!["sys_data_".to_string(), "sys_backup_".to_string()],
            max_backups: 5,
            exclude_dirs: vec!["cache".to_string()],
            scratch_dir: std::env::temp_dir(),
            probe_timeout_secs: 15,
            request_timeout_secs: 30,
            transfer_timeout_secs: 3600,
        }
    }
}

impl AgentConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| AgentError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| AgentError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Check every value that can make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        self.naming()?;
        self.retention()?;
        if self.probe_timeout_secs == 0
            || self.request_timeout_secs == 0
            || self.transfer_timeout_secs == 0
        {
            return Err(AgentError::Config(
                "timeouts must be at least one second".to_string(),
            ));
        }
        if self.exclude_dirs.iter().any(|d| d.trim().is_empty()) {
            return Err(AgentError::Config(
                "excluded directory names cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The naming scheme built from the configured prefixes.
    pub fn naming(&self) -> Result<NamingScheme> {
        NamingScheme::new(self.current_prefix.clone(), self.legacy_prefixes.iter().cloned())
            .map_err(|e| AgentError::Config(e.to_string()))
    }

    pub fn retention(&self) -> Result<RetentionPolicy> {
        RetentionPolicy::new(self.max_backups)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            transfer_timeout: Duration::from_secs(self.transfer_timeout_secs),
        }
    }
}

/// How many snapshots survive cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetentionPolicy {
    max_backups: usize,
}

impl RetentionPolicy {
    /// At least one snapshot is always kept.
    pub fn new(max_backups: usize) -> Result<Self> {
        if max_backups == 0 {
            return Err(AgentError::Config(
                "max_backups must be at least 1".to_string(),
            ));
        }
        Ok(Self { max_backups })
    }

    pub fn max_backups(&self) -> usize {
        self.max_backups
    }
}

/// The remote directory and local data root a run works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub remote_dir: RemoteDir,
    pub local_path: PathBuf,
}

impl SyncTarget {
    /// Validate both locations. `/` names the root of the WebDAV base.
    pub fn new(remote_dir: &str, local_path: impl Into<PathBuf>) -> Result<Self> {
        if remote_dir.trim().is_empty() {
            return Err(AgentError::Config(
                "remote directory is required (use / for the root)".to_string(),
            ));
        }
        let local_path = local_path.into();
        if local_path.as_os_str().is_empty() {
            return Err(AgentError::Config("local path is required".to_string()));
        }
        let remote_dir = RemoteDir::parse(remote_dir.trim())?;
        Ok(Self {
            remote_dir,
            local_path,
        })
    }
}
