//! # sync-agent
//!
//! Snapshot push/pull agent for WebDAV storage.
//!
//! This crate provides:
//! - [`Agent`]: push (archive, upload, prune) and pull (select, download,
//!   unpack) runs over a verified WebDAV session
//! - [`AgentConfig`]: every tunable, loadable from TOML
//! - Retention across prefix generations ([`retention::enforce`])
//! - The `sync-agent` binary (with the `cli` feature, on by default)
//!
//! ## Example
//!
//! ```ignore
//! use sync_agent::{Agent, AgentConfig, PullOutcome, SyncTarget};
//! use sync_remote::webdav::ConnectionDescriptor;
//!
//! let agent = Agent::new(AgentConfig::default())?;
//! let descriptor = ConnectionDescriptor::new("https://dav.example.com/dav", "alice", "s3cret");
//! let target = SyncTarget::new("backups/app", "/srv/app/data")?;
//!
//! match agent.pull(&descriptor, &target)? {
//!     PullOutcome::Restored { snapshot, .. } => println!("restored {snapshot}"),
//!     PullOutcome::NothingToRestore => println!("starting fresh"),
//! }
//! ```

pub mod catalog;
mod config;
mod error;
mod orchestrator;
pub mod restore;
pub mod retention;

#[cfg(test)]
mod testing;

pub use catalog::Snapshot;
pub use config::{AgentConfig, RetentionPolicy, SyncTarget};
pub use error::{AgentError, Result};
pub use orchestrator::{Agent, PullOutcome, PushOutcome};
pub use restore::RestoreSummary;
pub use retention::{CleanupFailure, RetentionReport};

// Re-export the connection types callers need to drive an agent
pub use sync_remote::webdav::ConnectionDescriptor;
pub use sync_remote::ConnectionError;
