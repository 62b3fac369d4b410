//! gitprov - provision and persist git-backed working trees
//!
//! Given a repository URL (optionally with a sub-path and a revision),
//! gitprov produces a local working tree in whatever state the remote is:
//! it clones an existing repository, initializes an empty one, or creates a
//! missing one through the hosting provider's API. Changes are persisted by
//! committing and pushing back to the remote.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to git)
//! - [`git`] - Provisioning orchestrator and repository handle (libgit2)
//! - [`forge`] - Hosting provider adapters (GitHub, GitLab, Gitea)
//! - [`core`] - URL parsing, filesystem, validated types, configuration
//!
//! # Guarantees
//!
//! 1. A failed provisioning never hands back a repository
//! 2. Only "remote not found" is retried, a bounded number of times
//! 3. A remote is created at most once per provisioning call

pub mod cli;
pub mod core;
pub mod forge;
pub mod git;
