//! git::repository
//!
//! The repository handle returned by provisioning.
//!
//! A [`Repo`] owns its `git2::Repository` together with the credential,
//! progress sink, retry policy and git configuration it was provisioned
//! with. Callers only get the narrow surface they need: persist generated
//! files, read the current branch, and check out a revision.
//!
//! # Example
//!
//! ```no_run
//! use gitprov::git::{Auth, PushOptions, Repo};
//! use std::path::Path;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), gitprov::git::GitError> {
//! let mut repo = Repo::open(Path::new("/tmp/work"), &Auth::new("git", "token"))?;
//! let hash = repo
//!     .persist(&CancellationToken::new(), &PushOptions::new("update manifests"))
//!     .await?;
//! println!("pushed {}", hash.short(7));
//! # Ok(())
//! # }
//! ```

use std::cell::RefCell;
use std::path::Path;
use std::sync::Arc;

use git2::build::CheckoutBuilder;
use git2::{BranchType, ErrorCode, IndexAddOption, Repository, Signature};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::auth::{remote_callbacks, resolve, Auth, BasicAuth};
use super::backend::{GitConfig, SystemGitConfig};
use super::error::GitError;
use super::options::{Progress, PushOptions};
use super::retry::{with_retry, RetryPolicy};
use crate::core::fs::{Filesystem, ALL_PATTERN};
use crate::core::types::{BranchName, Oid};

/// Name of the single remote a provisioned repository tracks.
pub const ORIGIN: &str = "origin";

/// Message of the base commit created when initializing an empty remote.
pub const INITIAL_COMMIT_MSG: &str = "initial commit";

/// A provisioned repository.
pub struct Repo {
    repo: Repository,
    auth: Option<BasicAuth>,
    progress: Progress,
    retry: RetryPolicy,
    git_config: Arc<dyn GitConfig>,
    /// Branch a detached HEAD was checked out from.
    detached_branch: RefCell<Option<String>>,
}

impl std::fmt::Debug for Repo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repo")
            .field("workdir", &self.repo.workdir())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Repo {
    pub(crate) fn new(
        repo: Repository,
        auth: &Auth,
        progress: Progress,
        retry: RetryPolicy,
        git_config: Arc<dyn GitConfig>,
    ) -> Self {
        Self {
            repo,
            auth: resolve(auth),
            progress,
            retry,
            git_config,
            detached_branch: RefCell::new(None),
        }
    }

    /// Open an existing working tree (for example one provisioned earlier).
    ///
    /// `path` may be any directory inside the working tree. Uses the system
    /// git configuration, the default retry policy and stderr for progress.
    pub fn open(path: &Path, auth: &Auth) -> Result<Self, GitError> {
        let repo = Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        Ok(Self::new(
            repo,
            auth,
            Progress::default(),
            RetryPolicy::default(),
            Arc::new(SystemGitConfig::new()),
        ))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_git_config(mut self, git_config: Arc<dyn GitConfig>) -> Self {
        self.git_config = git_config;
        self
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Root of the working tree.
    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// Commit HEAD points at.
    pub fn head_oid(&self) -> Result<Oid, GitError> {
        let commit = self
            .repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(|e| GitError::HeadUnresolvable {
                message: e.message().to_string(),
            })?;
        to_oid(commit.id())
    }

    /// Short name of HEAD: the branch name, or `HEAD` when detached.
    pub fn current_branch(&self) -> Result<String, GitError> {
        let head = self.repo.head().map_err(|e| GitError::HeadUnresolvable {
            message: e.message().to_string(),
        })?;
        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| GitError::HeadUnresolvable {
                message: "HEAD name is not valid UTF-8".to_string(),
            })
    }

    /// Check out `refname` as a detached HEAD.
    ///
    /// `refname` is resolved locally first (any git revision syntax). When
    /// it is not found locally it is resolved as a remote-tracking ref of the
    /// first configured remote. When `refname` names a local or remote
    /// branch, later pushes publish the detached HEAD to that branch.
    ///
    /// # Errors
    ///
    /// - `GitError::NoRemotes` when the fallback is needed and no remote exists
    /// - `GitError::ReferenceNotFound` when neither resolution succeeds
    pub fn checkout_ref(&self, refname: &str) -> Result<(), GitError> {
        let (object, is_branch) = match self.repo.revparse_single(refname) {
            Ok(object) => {
                let is_branch = self.repo.find_branch(refname, BranchType::Local).is_ok();
                (object, is_branch)
            }
            Err(e) if e.code() == ErrorCode::NotFound => {
                debug!(refname, "failed resolving ref, trying remote branch");
                let remote = self.first_remote()?;
                let remote_ref = format!("{remote}/{refname}");
                let object = self.repo.revparse_single(&remote_ref).map_err(|_| {
                    GitError::ReferenceNotFound {
                        refname: refname.to_string(),
                    }
                })?;
                let is_branch = self.repo.find_branch(&remote_ref, BranchType::Remote).is_ok();
                (object, is_branch)
            }
            Err(e) => return Err(GitError::from_git2(e, refname)),
        };

        let commit = object
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, refname))?;
        debug!(refname, hash = %commit.id(), is_branch, "checking out commit");

        self.repo
            .checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().safe()))
            .map_err(|e| GitError::from_git2(e, refname))?;
        self.repo
            .set_head_detached(commit.id())
            .map_err(|e| GitError::from_git2(e, refname))?;
        *self.detached_branch.borrow_mut() = is_branch.then(|| refname.to_string());
        Ok(())
    }

    /// Stage, commit and push.
    ///
    /// Returns the hash of the new commit. When the commit succeeds but the
    /// push does not, the error is `GitError::PushFailed` carrying the hash.
    /// On a detached HEAD checked out from a branch, HEAD is pushed to that
    /// branch. Any other detached HEAD fails with `GitError::DetachedHead` as
    /// the source.
    #[instrument(skip_all, fields(glob = %opts.add_glob_pattern))]
    pub async fn persist(
        &mut self,
        cancel: &CancellationToken,
        opts: &PushOptions,
    ) -> Result<Oid, GitError> {
        if cancel.is_cancelled() {
            return Err(GitError::Cancelled);
        }

        let commit = self.commit(&opts.add_glob_pattern, &opts.commit_msg)?;
        let head_branch = if self.repo.head_detached()? {
            match self.detached_branch.borrow().clone() {
                Some(branch) => Some(branch),
                None => {
                    return Err(GitError::PushFailed {
                        commit,
                        source: Box::new(GitError::DetachedHead),
                    })
                }
            }
        } else {
            None
        };
        let progress = opts.progress.clone().unwrap_or_else(|| self.progress.clone());

        debug!(hash = %commit, head_branch = ?head_branch, "pushing");
        let this = &*self;
        let head_branch = head_branch.as_deref();
        with_retry(this.retry, cancel, "push", || this.push(cancel, &progress, head_branch))
            .await
            .map_err(|source| GitError::PushFailed {
                commit: commit.clone(),
                source: Box::new(source),
            })?;

        Ok(commit)
    }

    /// Stage files matching `pattern` plus changes to tracked files, and
    /// commit them on HEAD.
    pub(crate) fn commit(&self, pattern: &str, message: &str) -> Result<Oid, GitError> {
        let identity = self.git_config.identity(&self.repo)?;

        let workdir = self.repo.workdir().ok_or_else(|| GitError::Internal {
            message: "repository has no working tree".to_string(),
        })?;
        let matches = Filesystem::new(workdir).glob(pattern)?;
        if matches.is_empty() && pattern != ALL_PATTERN {
            return Err(GitError::GlobNoMatches {
                pattern: pattern.to_string(),
            });
        }

        let mut index = self.repo.index()?;
        if !matches.is_empty() {
            index.add_all(matches.iter().map(|p| p.as_path()), IndexAddOption::DEFAULT, None)?;
        }
        index.update_all(["*"], None)?;
        index.write()?;
        let tree = self.repo.find_tree(index.write_tree()?)?;

        let signature = Signature::now(&identity.name, &identity.email)?;
        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None,
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        debug!(hash = %oid, files = matches.len(), "committed");
        to_oid(oid)
    }

    pub(crate) fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        self.repo
            .remote(name, url)
            .map_err(|e| GitError::from_git2(e, &format!("remote {name}")))?;
        Ok(())
    }

    /// Check out `branch`, creating it at HEAD when it does not exist.
    pub(crate) fn init_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        let refname = branch.ref_name();
        if self.repo.find_reference(&refname).is_err() {
            debug!(branch = %branch, "creating branch");
            let head = self.repo.head()?.peel_to_commit()?;
            self.repo.branch(branch.as_str(), &head, false)?;
        }

        self.repo
            .set_head(&refname)
            .map_err(|e| GitError::from_git2(e, &refname))?;
        self.repo
            .checkout_head(Some(CheckoutBuilder::new().safe()))
            .map_err(|e| GitError::from_git2(e, &refname))?;
        Ok(())
    }

    fn first_remote(&self) -> Result<String, GitError> {
        let remotes = self.repo.remotes()?;
        remotes
            .iter()
            .flatten()
            .next()
            .map(str::to_string)
            .ok_or(GitError::NoRemotes)
    }

    /// Push every local branch to origin, once. With `head_branch`, HEAD is
    /// pushed to that branch in place of the local one.
    fn push(
        &self,
        cancel: &CancellationToken,
        progress: &Progress,
        head_branch: Option<&str>,
    ) -> Result<(), GitError> {
        let mut remote = self.repo.find_remote(ORIGIN).map_err(|e| match e.code() {
            ErrorCode::NotFound => GitError::NoRemotes,
            _ => GitError::from_git2(e, ORIGIN),
        })?;
        let url = remote.url().unwrap_or_default().to_string();

        let refspecs = self.refspecs(head_branch)?;
        if refspecs.is_empty() {
            debug!("no local branches to push");
            return Ok(());
        }

        let rejected = RefCell::new(Vec::new());
        let mut callbacks = remote_callbacks(self.auth.as_ref(), progress, cancel);
        callbacks.push_update_reference(|refname, status| {
            if let Some(message) = status {
                rejected
                    .borrow_mut()
                    .push((refname.to_string(), message.to_string()));
            }
            Ok(())
        });

        let mut opts = git2::PushOptions::new();
        opts.remote_callbacks(callbacks);
        remote
            .push(&refspecs, Some(&mut opts))
            .map_err(|e| GitError::from_transport(e, &url, cancel))?;

        if let Some((refname, message)) = rejected.take().into_iter().next() {
            return Err(GitError::PushRejected { refname, message });
        }
        Ok(())
    }

    fn refspecs(&self, head_branch: Option<&str>) -> Result<Vec<String>, GitError> {
        let mut refspecs = Vec::new();
        for entry in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = entry?;
            match branch.name()? {
                Some(name) if Some(name) != head_branch => {
                    refspecs.push(format!("refs/heads/{name}:refs/heads/{name}"));
                }
                _ => {}
            }
        }
        if let Some(name) = head_branch {
            refspecs.push(format!("HEAD:refs/heads/{name}"));
        }
        Ok(refspecs)
    }
}

fn to_oid(oid: git2::Oid) -> Result<Oid, GitError> {
    Oid::new(oid.to_string()).map_err(|e| GitError::Internal {
        message: e.to_string(),
    })
}
