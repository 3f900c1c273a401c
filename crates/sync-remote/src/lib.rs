//! # sync-remote
//!
//! Remote side of the snapshot lifecycle.
//!
//! This crate provides:
//! - [`RemoteStore`]: the storage primitives (exists, list, mkdir, upload,
//!   download, remove) the snapshot engine is written against
//! - [`RemoteDir`] and [`normalize_base_url`]: path normalization
//! - [`webdav::WebDavSession`]: a blocking WebDAV implementation of
//!   [`RemoteStore`] with a classified reachability probe
//! - **Local WebDAV endpoint** (with the `server` feature, on by default)
//!
//! ## Example
//!
//! ```ignore
//! use sync_remote::webdav::{ConnectionDescriptor, SessionConfig, WebDavSession};
//! use sync_remote::{ensure_dir, RemoteDir, RemoteStore};
//! use std::path::Path;
//!
//! let dir = RemoteDir::parse("/backups/app/")?;
//! let session = WebDavSession::connect(
//!     &ConnectionDescriptor::new("https://dav.example.com/dav", "alice", "s3cret"),
//!     SessionConfig::default(),
//! )?;
//!
//! ensure_dir(&session, &dir);
//! session.upload(Path::new("/tmp/snap.tar.gz"), &dir.file_path("snap.tar.gz"), true)?;
//! ```

mod error;
pub mod path;
mod store;
pub mod webdav;

pub use error::{ConnectionError, Error, Result};
pub use path::{normalize_base_url, RemoteDir};
pub use store::{ensure_dir, EntryKind, MkdirStatus, RemoteEntry, RemoteStore};
