//! Filesystem backend for itemstore.
//!
//! A workspace is a directory with:
//! - `.itemstore/config.yml`: workspace and server settings
//! - `items/<type>/<name>.json`: one JSON document per item

pub mod config;
pub mod error;
pub mod workspace;

pub use config::{ServerSettings, WorkspaceConfig};
pub use error::{FsError, Result};
pub use workspace::Workspace;
