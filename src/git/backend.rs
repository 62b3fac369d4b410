//! git::backend
//!
//! Capabilities injected into the provisioning orchestrator.
//!
//! # Design
//!
//! The orchestrator never calls libgit2 directly for the operations that
//! touch the network or the user's global configuration. Instead it goes
//! through three small traits so tests can substitute them:
//!
//! - [`Cloner`] - ls-remote plus clone; the git2 implementation is [`Git2Cloner`]
//! - [`Initializer`] - create an empty repository; [`Git2Initializer`]
//! - [`GitConfig`] - default branch and commit identity; [`SystemGitConfig`]
//!   reads the merged git configuration, [`StaticGitConfig`] is fixed values

use std::path::Path;

use git2::build::RepoBuilder;
use git2::{Direction, FetchOptions, Remote, Repository, RepositoryInitOptions};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::auth::{remote_callbacks, BasicAuth};
use super::error::GitError;
use super::options::Progress;
use crate::core::types::BranchName;

/// Branch used when neither a revision nor `init.defaultBranch` is set.
pub const FALLBACK_BRANCH: &str = "main";

/// Everything a [`Cloner`] needs to fetch a remote.
#[derive(Debug, Clone, Copy)]
pub struct CloneRequest<'a> {
    /// Clone URL
    pub url: &'a str,
    /// Directory the working tree is created in
    pub workdir: &'a Path,
    /// Credential, if any
    pub auth: Option<&'a BasicAuth>,
    /// Remote progress sink
    pub progress: &'a Progress,
}

/// Clones a remote into a local working tree.
pub trait Cloner: Send + Sync {
    /// Clone the remote.
    ///
    /// # Errors
    ///
    /// - `GitError::RemoteNotFound` when the remote does not exist
    /// - `GitError::RemoteEmpty` when the remote has no refs
    /// - `GitError::Cancelled` when `cancel` fired during the transfer
    fn clone_repo(
        &self,
        cancel: &CancellationToken,
        request: &CloneRequest<'_>,
    ) -> Result<Repository, GitError>;
}

/// Creates an empty local repository.
pub trait Initializer: Send + Sync {
    /// Initialize `workdir` with `initial_branch` as the unborn HEAD.
    fn init_repo(&self, workdir: &Path, initial_branch: &BranchName)
        -> Result<Repository, GitError>;
}

/// Commit author and committer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Git configuration values the orchestrator depends on.
pub trait GitConfig: Send + Sync {
    /// Branch for a freshly initialized repository.
    fn default_branch(&self) -> String;

    /// Identity for commits in `repo`.
    ///
    /// # Errors
    ///
    /// `GitError::MissingIdentity` when name or email is not configured.
    fn identity(&self, repo: &Repository) -> Result<Identity, GitError>;
}

// =============================================================================
// git2 implementations
// =============================================================================

/// [`Cloner`] backed by libgit2.
#[derive(Debug, Clone, Copy, Default)]
pub struct Git2Cloner;

impl Git2Cloner {
    /// libgit2's local transport rejects shallow fetches.
    fn supports_depth(url: &str) -> bool {
        url.contains("://") && !url.starts_with("file://")
    }
}

impl Cloner for Git2Cloner {
    fn clone_repo(
        &self,
        cancel: &CancellationToken,
        request: &CloneRequest<'_>,
    ) -> Result<Repository, GitError> {
        let url = request.url;
        let transport_err = |e: git2::Error| GitError::from_transport(e, url, cancel);

        // libgit2 clones an empty remote without complaint, so list refs first.
        let mut remote = Remote::create_detached(url).map_err(transport_err)?;
        let callbacks = remote_callbacks(request.auth, request.progress, cancel);
        let advertised = {
            let connection = remote
                .connect_auth(Direction::Fetch, Some(callbacks), None)
                .map_err(transport_err)?;
            connection.list().map_err(transport_err)?.len()
        };
        if advertised == 0 {
            return Err(GitError::RemoteEmpty {
                url: url.to_string(),
            });
        }

        debug!(url, workdir = %request.workdir.display(), advertised, "cloning");

        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(remote_callbacks(request.auth, request.progress, cancel));
        if Self::supports_depth(url) {
            fetch.depth(1);
        }

        RepoBuilder::new()
            .fetch_options(fetch)
            .clone(url, request.workdir)
            .map_err(transport_err)
    }
}

/// [`Initializer`] backed by libgit2.
#[derive(Debug, Clone, Copy, Default)]
pub struct Git2Initializer;

impl Initializer for Git2Initializer {
    fn init_repo(
        &self,
        workdir: &Path,
        initial_branch: &BranchName,
    ) -> Result<Repository, GitError> {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head(initial_branch.as_str()).mkpath(true);
        Repository::init_opts(workdir, &opts)
            .map_err(|e| GitError::from_git2(e, &workdir.display().to_string()))
    }
}

/// [`GitConfig`] reading the user's merged git configuration.
#[derive(Debug, Clone, Default)]
pub struct SystemGitConfig {
    default_branch: Option<String>,
}

impl SystemGitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `branch` instead of `init.defaultBranch`.
    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = Some(branch.into());
        self
    }
}

impl GitConfig for SystemGitConfig {
    fn default_branch(&self) -> String {
        if let Some(branch) = &self.default_branch {
            return branch.clone();
        }

        git2::Config::open_default()
            .and_then(|config| config.get_string("init.defaultBranch"))
            .ok()
            .filter(|branch| !branch.is_empty())
            .unwrap_or_else(|| FALLBACK_BRANCH.to_string())
    }

    fn identity(&self, repo: &Repository) -> Result<Identity, GitError> {
        let config = repo.config().map_err(|e| GitError::Internal {
            message: format!("failed to load git config: {}", e.message()),
        })?;
        let read = |key: &str| config.get_string(key).ok().filter(|v| !v.is_empty());

        match (read("user.name"), read("user.email")) {
            (Some(name), Some(email)) => Ok(Identity { name, email }),
            _ => Err(GitError::MissingIdentity),
        }
    }
}

/// [`GitConfig`] with fixed values, independent of the environment.
#[derive(Debug, Clone)]
pub struct StaticGitConfig {
    pub default_branch: String,
    pub identity: Option<Identity>,
}

impl StaticGitConfig {
    pub fn new(default_branch: impl Into<String>, identity: Option<Identity>) -> Self {
        Self {
            default_branch: default_branch.into(),
            identity,
        }
    }
}

impl GitConfig for StaticGitConfig {
    fn default_branch(&self) -> String {
        self.default_branch.clone()
    }

    fn identity(&self, _repo: &Repository) -> Result<Identity, GitError> {
        self.identity.clone().ok_or(GitError::MissingIdentity)
    }
}
