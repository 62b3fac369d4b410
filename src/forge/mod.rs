//! forge
//!
//! Abstraction for git hosting providers (GitHub, GitLab, Gitea).
//!
//! # Architecture
//!
//! The `Forge` trait defines the one operation provisioning needs from a
//! provider: create an empty repository. The orchestrator obtains forges
//! through a [`ForgeFactory`] rather than importing implementations directly.
//!
//! A forge is only consulted when a clone found no remote and creation was
//! requested. A provider failure never leaves local state behind.
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait, request type and `ForgeError`
//! - [`github`]: GitHub and GitHub Enterprise
//! - [`gitlab`]: GitLab, including nested groups
//! - [`gitea`]: Gitea
//! - [`mock`]: Mock implementation for deterministic testing
//! - `factory`: Provider registry, inference and creation
//!
//! # Example
//!
//! ```ignore
//! use gitprov::forge::{create_forge, CreateRepoRequest};
//!
//! let forge = create_forge("github", "https://github.com/", token)?;
//! let clone_url = forge.create_repository(CreateRepoRequest {
//!     owner: "my-org".to_string(),
//!     name: "gitops".to_string(),
//!     private: true,
//! }).await?;
//! ```

mod factory;
pub mod gitea;
pub mod github;
pub mod gitlab;
mod http;
pub mod mock;
mod traits;

pub use factory::{
    create_forge, infer_provider, valid_forge_names, ForgeFactory, ForgeProvider,
    RegistryForgeFactory,
};
pub use mock::{FailOn, MockForge, MockOperation};
pub use traits::*;
