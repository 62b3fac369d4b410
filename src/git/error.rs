//! git::error
//!
//! Typed failure categories for provisioning and persistence.
//!
//! libgit2 reports most transport failures as a class plus a free-form
//! message. The helpers here normalize them into [`GitError`] variants that
//! callers can branch on: the orchestrator treats [`GitError::RemoteNotFound`]
//! and [`GitError::RemoteEmpty`] as recoverable states and the retry loop only
//! ever retries [`GitError::RemoteNotFound`].

use std::path::PathBuf;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::core::fs::FsError;
use crate::core::types::Oid;
use crate::forge::ForgeError;

/// Errors from repository provisioning and persistence.
#[derive(Debug, Error)]
pub enum GitError {
    /// Clone options were used before `CloneOptions::parse`.
    #[error("must call parse before using clone options")]
    NotParsed,

    /// The remote repository does not exist (or is not visible with the
    /// given credentials).
    #[error("git repository not found: {url}")]
    RemoteNotFound {
        /// Clone URL
        url: String,
    },

    /// The remote exists but advertises no refs.
    #[error("remote repository is empty: {url}")]
    RemoteEmpty {
        /// Clone URL
        url: String,
    },

    /// A revision could not be resolved locally or on the first remote.
    #[error("failed to resolve ref: {refname}")]
    ReferenceNotFound {
        /// The revision that was requested
        refname: String,
    },

    /// Remote-tracking fallback needed but no remote is configured.
    #[error("no remotes in repository")]
    NoRemotes,

    /// `user.name` / `user.email` are not configured.
    #[error("failed to commit. Please make sure your gitconfig contains a name and an email")]
    MissingIdentity,

    /// A non-default add pattern matched nothing.
    #[error("glob pattern '{pattern}' matched no files")]
    GlobNoMatches {
        /// The pattern that was given
        pattern: String,
    },

    /// The provider refused to create the remote.
    #[error("failed to create the repository, you can try to manually create it before trying again: {0}")]
    ProviderCreation(#[source] ForgeError),

    /// org/repo has fewer than two segments.
    #[error("failed parsing organization and repo from '{org_repo}'")]
    InvalidOrgRepo {
        /// The org/repo path that could not be split
        org_repo: String,
    },

    /// The repository URL could not be parsed.
    #[error("invalid repository url: {message}")]
    InvalidUrl {
        /// Description of the problem
        message: String,
    },

    /// A branch name derived from a revision or config is invalid.
    #[error("invalid branch name: {message}")]
    InvalidBranch {
        /// Description of the problem
        message: String,
    },

    /// HEAD cannot be resolved to a branch or commit.
    #[error("failed to resolve HEAD: {message}")]
    HeadUnresolvable {
        /// Underlying error
        message: String,
    },

    /// Local initialization of an empty remote failed.
    #[error("failed to initialize repository: {0}")]
    Init(#[source] Box<GitError>),

    /// The commit was created but could not be pushed.
    #[error("created commit {commit} but failed to push: {source}")]
    PushFailed {
        /// The local commit that was not pushed
        commit: Oid,
        /// Why the push failed
        #[source]
        source: Box<GitError>,
    },

    /// HEAD is detached, so the commit is on no branch that could be pushed.
    #[error("HEAD is detached at a tag or commit; check out a branch to publish changes")]
    DetachedHead,

    /// The remote rejected a pushed reference.
    #[error("remote rejected {refname}: {message}")]
    PushRejected {
        /// Rejected reference
        refname: String,
        /// Server status message
        message: String,
    },

    /// Any other network or transport failure.
    #[error("transport error for {url}: {message}")]
    Transport {
        /// Remote URL
        url: String,
        /// libgit2 message
        message: String,
    },

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Working-tree filesystem error.
    #[error(transparent)]
    Fs(#[from] FsError),

    /// The working tree is not a repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was opened
        path: PathBuf,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Whether the retry loop should try again after this error.
    ///
    /// Only a missing remote is considered transient: hosted providers may
    /// take a moment before a freshly created repository becomes reachable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GitError::RemoteNotFound { .. })
    }

    /// Create a GitError from a local (non-transport) git2 error with context.
    pub fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound
                if context.starts_with("refs/") || context.contains("ref") =>
            {
                GitError::ReferenceNotFound {
                    refname: context.to_string(),
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidBranch {
                message: format!("{}: {}", context, err.message()),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }

    /// Classify an error raised while talking to a remote.
    ///
    /// Cancellation wins over everything else because a callback that returns
    /// `false` surfaces as a generic user error.
    pub fn from_transport(err: git2::Error, url: &str, cancel: &CancellationToken) -> Self {
        if cancel.is_cancelled() {
            return GitError::Cancelled;
        }
        if is_not_found(&err) {
            return GitError::RemoteNotFound {
                url: url.to_string(),
            };
        }
        GitError::Transport {
            url: url.to_string(),
            message: err.message().to_string(),
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

/// Whether a transport error means "repository does not exist".
///
/// libgit2 has no dedicated code for this; HTTP transports report the status
/// and the local transport reports a path resolution failure.
fn is_not_found(err: &git2::Error) -> bool {
    let message = err.message().to_ascii_lowercase();
    if message.contains("unsupported url protocol") {
        return false;
    }
    if err.code() == git2::ErrorCode::NotFound {
        return true;
    }

    const PATTERNS: &[&str] = &[
        "repository not found",
        "could not find repository",
        "failed to resolve path",
        "status code: 404",
    ];
    PATTERNS.iter().any(|p| message.contains(p))
}
