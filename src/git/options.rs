//! git::options
//!
//! Options for provisioning ([`CloneOptions`]) and persisting
//! ([`PushOptions`]), plus the [`Progress`] sink that receives remote
//! progress output.
//!
//! # Example
//!
//! ```
//! use gitprov::git::{Auth, CloneOptions};
//!
//! let mut opts = CloneOptions::new("github.com/owner/repo/apps?ref=v1.0", "/tmp/work")
//!     .with_auth(Auth::new("", "token"))
//!     .create_if_not_exist(true);
//! opts.parse().unwrap();
//!
//! assert_eq!(opts.url(), "https://github.com/owner/repo");
//! assert_eq!(opts.path(), "apps");
//! assert_eq!(opts.revision(), "v1.0");
//! assert_eq!(opts.auth.username, "git");
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::core::fs::{Filesystem, ALL_PATTERN};
use crate::core::url::RepoUrl;

use super::auth::{Auth, DEFAULT_USERNAME};
use super::error::GitError;

/// Where remote progress output goes.
///
/// Cloning the handle shares the underlying writer.
#[derive(Clone)]
pub struct Progress(Arc<Mutex<Box<dyn Write + Send>>>);

impl Progress {
    /// Wrap a writer.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(Box::new(writer))))
    }

    /// Write progress to standard error.
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }

    /// Discard progress output.
    pub fn sink() -> Self {
        Self::new(std::io::sink())
    }

    /// Forward a chunk of progress output. Failures are ignored; progress is
    /// informational only.
    pub fn write(&self, data: &[u8]) {
        if let Ok(mut writer) = self.0.lock() {
            let _ = writer.write_all(data);
            let _ = writer.flush();
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::stderr()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Progress(..)")
    }
}

/// Options for [`Provisioner::get_repo`](super::Provisioner::get_repo).
///
/// Must be parsed with [`CloneOptions::parse`] before use.
#[derive(Debug, Clone)]
pub struct CloneOptions {
    /// Provider name used to create a missing remote; inferred from the host
    /// when empty
    pub provider: String,
    /// Repository URL, possibly with a sub-path and `?ref=`
    pub repo: String,
    /// Credential for clone, push and provider calls
    pub auth: Auth,
    /// Local working-tree root
    pub fs: Filesystem,
    /// Remote progress sink
    pub progress: Progress,
    /// Create the remote through the provider when it does not exist
    pub create_if_not_exist: bool,
    parsed: Option<RepoUrl>,
}

impl CloneOptions {
    /// Options for cloning `repo` into `dir`.
    pub fn new(repo: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            provider: String::new(),
            repo: repo.into(),
            auth: Auth::default(),
            fs: Filesystem::new(dir),
            progress: Progress::default(),
            create_if_not_exist: false,
            parsed: None,
        }
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn create_if_not_exist(mut self, create: bool) -> Self {
        self.create_if_not_exist = create;
        self
    }

    /// Parse the repository URL into its components.
    ///
    /// Fills in the credential from the URL userinfo when no password was
    /// given, and defaults an empty username to `"git"`. Calling it again is
    /// harmless.
    pub fn parse(&mut self) -> Result<(), GitError> {
        let parsed = RepoUrl::parse(&self.repo).map_err(|e| GitError::InvalidUrl {
            message: e.to_string(),
        })?;

        if self.auth.password.is_empty() {
            if let (user, Some(password)) = parsed.credentials() {
                self.auth.password = password.to_string();
                if self.auth.username.is_empty() {
                    self.auth.username = user.unwrap_or_default().to_string();
                }
            }
        }
        if self.auth.username.is_empty() {
            self.auth.username = DEFAULT_USERNAME.to_string();
        }

        self.parsed = Some(parsed);
        Ok(())
    }

    /// Parsed URL, if [`parse`](Self::parse) has run.
    pub fn parsed(&self) -> Option<&RepoUrl> {
        self.parsed.as_ref()
    }

    /// Clone URL; empty before parsing.
    pub fn url(&self) -> String {
        self.parsed.as_ref().map(RepoUrl::url).unwrap_or_default()
    }

    /// Requested revision; empty before parsing or when none was given.
    pub fn revision(&self) -> &str {
        self.parsed.as_ref().map(RepoUrl::revision).unwrap_or_default()
    }

    /// Sub-path inside the repository; empty before parsing or for the root.
    pub fn path(&self) -> &str {
        self.parsed.as_ref().map(RepoUrl::path).unwrap_or_default()
    }
}

/// Options for [`Repo::persist`](super::Repo::persist).
#[derive(Debug, Clone)]
pub struct PushOptions {
    /// Files to stage; `"."` stages the whole working tree
    pub add_glob_pattern: String,
    /// Commit message
    pub commit_msg: String,
    /// Progress sink; the repository's sink is used when `None`
    pub progress: Option<Progress>,
}

impl PushOptions {
    /// Stage everything and commit with `commit_msg`.
    pub fn new(commit_msg: impl Into<String>) -> Self {
        Self {
            add_glob_pattern: ALL_PATTERN.to_string(),
            commit_msg: commit_msg.into(),
            progress: None,
        }
    }

    pub fn with_glob(mut self, pattern: impl Into<String>) -> Self {
        self.add_glob_pattern = pattern.into();
        self
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = Some(progress);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod clone_options {
        use super::*;

        #[test]
        fn accessors_empty_before_parse() {
            let opts = CloneOptions::new("github.com/owner/repo/apps?ref=v1", "/tmp/x");
            assert!(opts.parsed().is_none());
            assert_eq!(opts.url(), "");
            assert_eq!(opts.path(), "");
            assert_eq!(opts.revision(), "");
        }

        #[test]
        fn parse_fills_components() {
            let mut opts = CloneOptions::new("github.com/owner/repo/apps?ref=v1", "/tmp/x");
            opts.parse().unwrap();
            assert_eq!(opts.url(), "https://github.com/owner/repo");
            assert_eq!(opts.path(), "apps");
            assert_eq!(opts.revision(), "v1");
        }

        #[test]
        fn parse_defaults_username() {
            let mut opts = CloneOptions::new("github.com/owner/repo", "/tmp/x")
                .with_auth(Auth::new("", "token"));
            opts.parse().unwrap();
            assert_eq!(opts.auth.username, "git");
            assert_eq!(opts.auth.password, "token");
        }

        #[test]
        fn parse_keeps_explicit_username() {
            let mut opts = CloneOptions::new("github.com/owner/repo", "/tmp/x")
                .with_auth(Auth::new("bot", "token"));
            opts.parse().unwrap();
            assert_eq!(opts.auth.username, "bot");
        }

        #[test]
        fn parse_takes_url_credentials_without_token() {
            let mut opts = CloneOptions::new("https://ci:pw@github.com/owner/repo", "/tmp/x");
            opts.parse().unwrap();
            assert_eq!(opts.auth, Auth::new("ci", "pw"));
            assert!(!opts.url().contains("pw"));
        }

        #[test]
        fn explicit_token_wins_over_url() {
            let mut opts = CloneOptions::new("https://ci:pw@github.com/owner/repo", "/tmp/x")
                .with_auth(Auth::new("", "token"));
            opts.parse().unwrap();
            assert_eq!(opts.auth.password, "token");
        }

        #[test]
        fn parse_is_idempotent() {
            let mut opts = CloneOptions::new("github.com/owner/repo?ref=main", "/tmp/x");
            opts.parse().unwrap();
            let first = opts.parsed().cloned();
            opts.parse().unwrap();
            assert_eq!(opts.parsed().cloned(), first);
            assert_eq!(opts.auth.username, "git");
        }

        #[test]
        fn invalid_url_is_error() {
            let mut opts = CloneOptions::new("github.com/owner", "/tmp/x");
            assert!(matches!(opts.parse(), Err(GitError::InvalidUrl { .. })));
        }
    }

    mod push_options {
        use super::*;

        #[test]
        fn defaults_to_everything() {
            let opts = PushOptions::new("msg");
            assert_eq!(opts.add_glob_pattern, ".");
            assert!(opts.progress.is_none());
        }

        #[test]
        fn explicit_glob() {
            let opts = PushOptions::new("msg").with_glob("apps/*");
            assert_eq!(opts.add_glob_pattern, "apps/*");
        }
    }

    mod progress {
        use super::*;

        #[derive(Clone, Default)]
        struct Shared(Arc<Mutex<Vec<u8>>>);

        impl Write for Shared {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        #[test]
        fn clones_share_writer() {
            let buf = Shared::default();
            let progress = Progress::new(buf.clone());
            progress.clone().write(b"Counting objects\n");
            progress.write(b"done\n");
            assert_eq!(&*buf.0.lock().unwrap(), b"Counting objects\ndone\n");
        }
    }
}
