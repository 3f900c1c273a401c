//! # sync-archive
//!
//! Local side of the snapshot lifecycle.
//!
//! This crate provides:
//! - [`ArchiveBuilder`]: packs a data root into a `.tar.gz` snapshot whose
//!   entries are relative to the root's parent
//! - [`extract`] and [`extract_root`]: unpack a snapshot back into place
//! - [`NamingScheme`]: snapshot file names across prefix epochs
//!
//! ## Example
//!
//! ```ignore
//! use sync_archive::{extract, ArchiveBuilder, NamingScheme};
//!
//! let scheme = NamingScheme::new("sys_dat_", ["sys_data_", "sys_backup_"])?;
//! let name = scheme.current_name(chrono::Local::now().naive_local());
//!
//! let summary = ArchiveBuilder::new("/srv/app/data")
//!     .exclude_dir("cache")
//!     .write_to(format!("/tmp/{name}"))?;
//!
//! // Recreates /srv/app/data from the snapshot.
//! extract(&summary.path, "/srv/app")?;
//! ```

mod builder;
mod error;
mod extract;
pub mod naming;

pub use builder::{ArchiveBuilder, ArchiveSummary};
pub use error::{Error, Result};
pub use extract::{entry_paths, extract, extract_root};
pub use naming::{sort_newest_first, NamingScheme, SnapshotName, ARCHIVE_SUFFIX};
