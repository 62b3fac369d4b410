//! core
//!
//! Domain types shared by the git, forge and CLI layers.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid
//! - [`url`] - Repository URL parsing (host, org/repo, sub-path, revision)
//! - [`fs`] - Rooted working-tree filesystem with chroot and glob
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Parsing is pure; nothing here touches the network

pub mod config;
pub mod fs;
pub mod types;
pub mod url;
