//! WebDAV transport for snapshot storage.
//!
//! [`WebDavSession`] is a blocking client implementing
//! [`RemoteStore`](crate::RemoteStore) with `PROPFIND`, `MKCOL`, `PUT`,
//! `GET` and `DELETE`. With the `server` feature, [`server`] starts a local
//! endpoint speaking the same protocol.
//!
//! # Example
//!
//! ```ignore
//! use sync_remote::webdav::{ConnectionDescriptor, SessionConfig, WebDavSession};
//! use sync_remote::RemoteStore;
//!
//! let descriptor = ConnectionDescriptor::new("https://dav.example.com/dav", "alice", "s3cret");
//! let session = WebDavSession::connect(&descriptor, SessionConfig::default())?;
//! for entry in session.list("backups/")? {
//!     println!("{} ({:?})", entry.name, entry.kind);
//! }
//! ```

mod propfind;
mod session;

#[cfg(feature = "server")]
pub mod server;

pub use session::{classify_probe, ConnectionDescriptor, SessionConfig, WebDavSession};
