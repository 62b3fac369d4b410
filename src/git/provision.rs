//! git::provision
//!
//! Provisioning orchestrator: turn a repository URL into a checked-out
//! working tree, whatever state the remote is in.
//!
//! # Remote states
//!
//! The first clone attempt classifies the remote, and [`transition`] decides
//! what happens next:
//!
//! | State | `create_if_not_exist` | Next step |
//! |---|---|---|
//! | `Found` | any | `Ready`: check out the revision, done |
//! | `NotFound` | false | `Fail`: the clone error is returned |
//! | `NotFound` | true | `CreateRemote`, then the remote is `Empty` |
//! | `Empty` | any | `InitLocal`: init, base commit, branch |
//!
//! A created remote is never cloned a second time; it is known to be empty.
//!
//! # Example
//!
//! ```no_run
//! use gitprov::git::{Auth, CloneOptions, Provisioner};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), gitprov::git::GitError> {
//! let mut opts = CloneOptions::new("github.com/owner/repo/apps", "/tmp/work")
//!     .with_auth(Auth::new("", "ghp_token"))
//!     .create_if_not_exist(true);
//! opts.parse()?;
//!
//! let (repo, fs) = Provisioner::new()
//!     .get_repo(&CancellationToken::new(), &opts)
//!     .await?;
//! println!("{} on {}", fs.root().display(), repo.current_branch()?);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::auth::resolve;
use super::backend::{
    CloneRequest, Cloner, Git2Cloner, Git2Initializer, GitConfig, Initializer, SystemGitConfig,
};
use super::error::GitError;
use super::options::CloneOptions;
use super::repository::{Repo, INITIAL_COMMIT_MSG, ORIGIN};
use super::retry::{with_retry, RetryPolicy};
use crate::core::fs::{Filesystem, ALL_PATTERN};
use crate::core::types::BranchName;
use crate::core::url::RepoUrl;
use crate::forge::{infer_provider, CreateRepoRequest, ForgeFactory, RegistryForgeFactory};

/// What the first clone attempt learned about the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteState {
    /// The remote has history and was cloned
    Found,
    /// The remote does not exist
    NotFound,
    /// The remote exists without any refs
    Empty,
}

/// Next step of provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Use the clone as is
    Ready,
    /// Create the remote through the provider
    CreateRemote,
    /// Initialize a local repository that will be pushed later
    InitLocal,
    /// Give up and return the clone error
    Fail,
}

/// Decide the next step for a remote in `state`.
pub fn transition(state: RemoteState, create_if_not_exist: bool) -> Transition {
    match (state, create_if_not_exist) {
        (RemoteState::Found, _) => Transition::Ready,
        (RemoteState::NotFound, false) => Transition::Fail,
        (RemoteState::NotFound, true) => Transition::CreateRemote,
        (RemoteState::Empty, _) => Transition::InitLocal,
    }
}

/// Provisions repositories using injected capabilities.
#[derive(Clone)]
pub struct Provisioner {
    cloner: Arc<dyn Cloner>,
    initializer: Arc<dyn Initializer>,
    forges: Arc<dyn ForgeFactory>,
    git_config: Arc<dyn GitConfig>,
    retry: RetryPolicy,
}

impl Default for Provisioner {
    fn default() -> Self {
        Self {
            cloner: Arc::new(Git2Cloner),
            initializer: Arc::new(Git2Initializer),
            forges: Arc::new(RegistryForgeFactory),
            git_config: Arc::new(SystemGitConfig::new()),
            retry: RetryPolicy::default(),
        }
    }
}

impl std::fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Provisioner {
    /// Provisioner backed by libgit2, the provider registry and the system
    /// git configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cloner(mut self, cloner: impl Cloner + 'static) -> Self {
        self.cloner = Arc::new(cloner);
        self
    }

    pub fn with_initializer(mut self, initializer: impl Initializer + 'static) -> Self {
        self.initializer = Arc::new(initializer);
        self
    }

    pub fn with_forges(mut self, forges: impl ForgeFactory + 'static) -> Self {
        self.forges = Arc::new(forges);
        self
    }

    pub fn with_git_config(mut self, git_config: impl GitConfig + 'static) -> Self {
        self.git_config = Arc::new(git_config);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Produce a working tree for `opts`.
    ///
    /// Returns the repository handle and a filesystem rooted at the URL's
    /// sub-path.
    ///
    /// # Errors
    ///
    /// - `GitError::NotParsed` when `opts` were not parsed
    /// - `GitError::RemoteNotFound` when the remote is missing and creation
    ///   was not requested
    /// - `GitError::ProviderCreation` when the provider refused to create it
    /// - `GitError::Init` when initializing an empty remote failed
    /// - any other clone or checkout error unchanged
    #[instrument(skip_all, fields(url = %opts.url()))]
    pub async fn get_repo(
        &self,
        cancel: &CancellationToken,
        opts: &CloneOptions,
    ) -> Result<(Repo, Filesystem), GitError> {
        let parsed = opts.parsed().ok_or(GitError::NotParsed)?;
        let url = parsed.url();
        let auth = resolve(&opts.auth);
        let request = CloneRequest {
            url: &url,
            workdir: opts.fs.root(),
            auth: auth.as_ref(),
            progress: &opts.progress,
        };

        let policy = if opts.create_if_not_exist {
            RetryPolicy::once()
        } else {
            self.retry
        };

        debug!(url = %url, "cloning git repo");
        let cloned = with_retry(policy, cancel, "clone", || {
            self.cloner.clone_repo(cancel, &request)
        })
        .await;

        let (mut state, cloned) = match cloned {
            Ok(repository) => (RemoteState::Found, Ok(repository)),
            Err(err @ GitError::RemoteNotFound { .. }) => (RemoteState::NotFound, Err(err)),
            Err(err @ GitError::RemoteEmpty { .. }) => (RemoteState::Empty, Err(err)),
            Err(err) => return Err(err),
        };

        let repo = loop {
            match transition(state, opts.create_if_not_exist) {
                Transition::Ready => {
                    let repo = self.wrap(cloned?, opts);
                    let revision = opts.revision();
                    if !revision.is_empty() {
                        repo.checkout_ref(revision)?;
                    }
                    break repo;
                }
                Transition::Fail => {
                    return Err(cloned.err().unwrap_or(GitError::RemoteNotFound { url }));
                }
                Transition::CreateRemote => {
                    info!("repository not found, creating it");
                    self.create_remote(cancel, opts, parsed).await?;
                    state = RemoteState::Empty;
                }
                Transition::InitLocal => {
                    info!("repository is empty, initializing a new one");
                    break self
                        .init_local(opts, parsed)
                        .map_err(|e| GitError::Init(Box::new(e)))?;
                }
            }
        };

        let fs = opts.fs.chroot(opts.path())?;
        Ok((repo, fs))
    }

    fn wrap(&self, repository: git2::Repository, opts: &CloneOptions) -> Repo {
        Repo::new(
            repository,
            &opts.auth,
            opts.progress.clone(),
            self.retry,
            Arc::clone(&self.git_config),
        )
    }

    /// Ask the provider to create the remote.
    async fn create_remote(
        &self,
        cancel: &CancellationToken,
        opts: &CloneOptions,
        parsed: &RepoUrl,
    ) -> Result<String, GitError> {
        let provider = if opts.provider.is_empty() {
            let guessed = infer_provider(parsed.host());
            warn!(
                provider = %guessed,
                "--provider not specified, assuming provider from url"
            );
            guessed
        } else {
            opts.provider.clone()
        };

        let forge = self
            .forges
            .create(&provider, parsed.host(), &opts.auth.password)
            .map_err(GitError::ProviderCreation)?;

        let (owner, name) = parsed
            .owner_and_name()
            .ok_or_else(|| GitError::InvalidOrgRepo {
                org_repo: parsed.org_repo().to_string(),
            })?;

        let request = CreateRepoRequest {
            owner,
            name,
            private: true,
        };
        let created = tokio::select! {
            _ = cancel.cancelled() => return Err(GitError::Cancelled),
            created = forge.create_repository(request) => {
                created.map_err(GitError::ProviderCreation)?
            }
        };

        info!(forge = forge.name(), url = %created, "created repository");
        Ok(created)
    }

    /// Initialize a local repository for an empty remote.
    fn init_local(&self, opts: &CloneOptions, parsed: &RepoUrl) -> Result<Repo, GitError> {
        let branch_name = match opts.revision() {
            "" => self.git_config.default_branch(),
            revision => revision.to_string(),
        };
        let branch = BranchName::new(branch_name).map_err(|e| GitError::InvalidBranch {
            message: e.to_string(),
        })?;

        let repository = self.initializer.init_repo(opts.fs.root(), &branch)?;
        let repo = self.wrap(repository, opts);
        repo.add_remote(ORIGIN, &parsed.url())?;

        repo.commit(ALL_PATTERN, INITIAL_COMMIT_MSG)?;
        repo.init_branch(&branch)?;
        debug!(branch = %branch, "initialized repository");
        Ok(repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::{FailOn, ForgeError, MockForge, MockOperation};
    use crate::git::backend::{Identity, StaticGitConfig};
    use crate::git::{Auth, Progress};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Cloner that always fails the same way and counts calls.
    struct FailingCloner {
        empty: bool,
        calls: Arc<AtomicUsize>,
    }

    impl Cloner for FailingCloner {
        fn clone_repo(
            &self,
            _cancel: &CancellationToken,
            request: &CloneRequest<'_>,
        ) -> Result<git2::Repository, GitError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let url = request.url.to_string();
            if self.empty {
                Err(GitError::RemoteEmpty { url })
            } else {
                Err(GitError::RemoteNotFound { url })
            }
        }
    }

    fn provisioner(empty: bool) -> (Provisioner, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provisioner = Provisioner::new()
            .with_cloner(FailingCloner {
                empty,
                calls: Arc::clone(&calls),
            })
            .with_git_config(StaticGitConfig::new(
                "main",
                Some(Identity::new("Test User", "test@example.com")),
            ));
        (provisioner, calls)
    }

    fn options(repo: &str, dir: &Path, create: bool) -> CloneOptions {
        let mut opts = CloneOptions::new(repo, dir)
            .with_auth(Auth::new("", "token"))
            .with_progress(Progress::sink())
            .create_if_not_exist(create);
        opts.parse().unwrap();
        opts
    }

    // ========================================================================
    // transition table
    // ========================================================================

    #[test]
    fn transition_table() {
        use RemoteState::*;
        assert_eq!(transition(Found, false), Transition::Ready);
        assert_eq!(transition(Found, true), Transition::Ready);
        assert_eq!(transition(NotFound, false), Transition::Fail);
        assert_eq!(transition(NotFound, true), Transition::CreateRemote);
        assert_eq!(transition(Empty, false), Transition::InitLocal);
        assert_eq!(transition(Empty, true), Transition::InitLocal);
    }

    // ========================================================================
    // get_repo
    // ========================================================================

    #[tokio::test]
    async fn unparsed_options_rejected() {
        let dir = TempDir::new().unwrap();
        let (provisioner, calls) = provisioner(false);
        let opts = CloneOptions::new("github.com/owner/repo", dir.path());

        let result = provisioner.get_repo(&CancellationToken::new(), &opts).await;

        assert!(matches!(result, Err(GitError::NotParsed)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_without_create_fails_after_retries() {
        let dir = TempDir::new().unwrap();
        let (provisioner, calls) = provisioner(false);
        let forge = MockForge::new();
        let provisioner = provisioner.with_forges(forge.clone());
        let opts = options("github.com/owner/repo", dir.path(), false);

        let result = provisioner.get_repo(&CancellationToken::new(), &opts).await;

        assert!(matches!(result, Err(GitError::RemoteNotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(forge.operations().is_empty());
    }

    #[tokio::test]
    async fn not_found_with_create_creates_then_inits() {
        let dir = TempDir::new().unwrap();
        let (provisioner, calls) = provisioner(false);
        let forge = MockForge::new();
        let provisioner = provisioner.with_forges(forge.clone());
        let opts = options("github.com/org/sub/repo.git/apps", dir.path(), true);

        let (repo, fs) = provisioner
            .get_repo(&CancellationToken::new(), &opts)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1, "no second clone");
        assert_eq!(
            forge.operations(),
            vec![MockOperation::CreateRepository {
                owner: "org/sub".to_string(),
                name: "repo".to_string(),
                private: true,
            }]
        );
        assert_eq!(repo.current_branch().unwrap(), "main");
        assert_eq!(fs.root(), dir.path().join("apps"));
    }

    #[tokio::test]
    async fn provider_failure_is_wrapped() {
        let dir = TempDir::new().unwrap();
        let (provisioner, _) = provisioner(false);
        let forge = MockForge::new().fail_on(FailOn::CreateRepository(ForgeError::ApiError {
            status: 422,
            message: "name already exists on this account".into(),
        }));
        let provisioner = provisioner.with_forges(forge);
        let opts = options("github.com/owner/repo", dir.path(), true);

        let result = provisioner.get_repo(&CancellationToken::new(), &opts).await;

        match result {
            Err(GitError::ProviderCreation(ForgeError::ApiError { .. })) => {}
            other => panic!("expected provider creation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_remote_uses_revision_branch() {
        let dir = TempDir::new().unwrap();
        let (provisioner, _) = provisioner(true);
        let opts = options("github.com/owner/repo?ref=feature", dir.path(), false);

        let (repo, _) = provisioner
            .get_repo(&CancellationToken::new(), &opts)
            .await
            .unwrap();

        assert_eq!(repo.current_branch().unwrap(), "feature");
    }

    #[tokio::test]
    async fn empty_remote_without_identity_is_init_error() {
        let dir = TempDir::new().unwrap();
        let (provisioner, _) = provisioner(true);
        let provisioner = provisioner.with_git_config(StaticGitConfig::new("main", None));
        let opts = options("github.com/owner/repo", dir.path(), false);

        let result = provisioner.get_repo(&CancellationToken::new(), &opts).await;

        match result {
            Err(GitError::Init(inner)) => assert!(matches!(*inner, GitError::MissingIdentity)),
            other => panic!("expected init failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_revision_branch_is_init_error() {
        let dir = TempDir::new().unwrap();
        let (provisioner, _) = provisioner(true);
        let opts = options("github.com/owner/repo?ref=bad..name", dir.path(), false);

        let result = provisioner.get_repo(&CancellationToken::new(), &opts).await;

        assert!(matches!(result, Err(GitError::Init(_))));
    }

    #[tokio::test]
    async fn provider_inferred_from_host() {
        let dir = TempDir::new().unwrap();
        let (provisioner, _) = provisioner(false);
        let forge = MockForge::new();
        let provisioner = provisioner.with_forges(forge.clone());
        let opts = options("gitlab.com/group/repo", dir.path(), true);

        provisioner
            .get_repo(&CancellationToken::new(), &opts)
            .await
            .unwrap();

        assert_eq!(
            forge.connections(),
            vec![("gitlab".to_string(), "https://gitlab.com/".to_string())]
        );
    }

    #[tokio::test]
    async fn explicit_provider_wins() {
        let dir = TempDir::new().unwrap();
        let (provisioner, _) = provisioner(false);
        let forge = MockForge::new();
        let provisioner = provisioner.with_forges(forge.clone());
        let opts = options("git.example.org/owner/repo", dir.path(), true).with_provider("gitea");

        provisioner
            .get_repo(&CancellationToken::new(), &opts)
            .await
            .unwrap();

        assert_eq!(forge.connections()[0].0, "gitea");
    }

    #[tokio::test]
    async fn factory_failure_is_wrapped() {
        let dir = TempDir::new().unwrap();
        let (provisioner, _) = provisioner(false);
        let forge = MockForge::new().fail_on(FailOn::Connect(ForgeError::NotFound(
            "provider bitbucket is not a valid provider name".into(),
        )));
        let provisioner = provisioner.with_forges(forge.clone());
        let opts = options("bitbucket.org/owner/repo", dir.path(), true);

        let result = provisioner.get_repo(&CancellationToken::new(), &opts).await;

        assert!(matches!(
            result,
            Err(GitError::ProviderCreation(ForgeError::NotFound(_)))
        ));
        assert!(forge.operations().is_empty());
        assert!(!dir.path().join(".git").exists(), "nothing initialized");
    }
}
