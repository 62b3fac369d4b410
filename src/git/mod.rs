//! git
//!
//! Repository provisioning and persistence on top of `git2`.
//!
//! # Architecture
//!
//! This module is the only place that imports `git2`. We use libgit2
//! exclusively (no shelling out to the git CLI).
//!
//! - [`provision`] - [`Provisioner::get_repo`]: clone, or create + init
//! - [`repository`] - [`Repo`]: persist, current branch, checkout
//! - [`backend`] - injectable clone/init/config capabilities
//! - [`auth`] - credential resolution and transport callbacks
//! - [`retry`] - bounded retry with cancellable backoff
//! - [`options`] - clone and push options, progress sink
//! - [`error`] - [`GitError`]
//!
//! # Invariants
//!
//! - A failed provisioning never returns a handle
//! - The returned working tree tracks exactly one remote, `origin`
//! - Only a missing remote is retried, and never past the policy's attempts
//!
//! # Example
//!
//! ```no_run
//! use gitprov::git::{Auth, CloneOptions, Provisioner, PushOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), gitprov::git::GitError> {
//! let cancel = CancellationToken::new();
//! let mut opts = CloneOptions::new("github.com/owner/repo", "/tmp/work")
//!     .with_auth(Auth::new("", "ghp_token"));
//! opts.parse()?;
//!
//! let (mut repo, fs) = Provisioner::new().get_repo(&cancel, &opts).await?;
//! fs.write("hello.txt", "hello\n")?;
//! repo.persist(&cancel, &PushOptions::new("add hello")).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod backend;
pub mod error;
pub mod options;
pub mod provision;
pub mod repository;
pub mod retry;

pub use auth::{Auth, BasicAuth};
pub use backend::{
    CloneRequest, Cloner, Git2Cloner, Git2Initializer, GitConfig, Identity, Initializer,
    StaticGitConfig, SystemGitConfig,
};
pub use error::GitError;
pub use options::{CloneOptions, Progress, PushOptions};
pub use provision::{transition, Provisioner, RemoteState, Transition};
pub use repository::Repo;
pub use retry::RetryPolicy;
