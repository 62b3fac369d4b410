//! Shared fixtures for integration tests.
//!
//! Remotes are bare repositories under a temp dir, addressed with `file://`
//! URLs ending in `.git` so the whole path is taken as `owner/repo`.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use git2::{Repository, RepositoryInitOptions, Signature};
use tempfile::TempDir;

use gitprov::git::{Identity, Provisioner, RetryPolicy, StaticGitConfig};

/// Identity used for every commit made by tests.
pub fn tester() -> Identity {
    Identity::new("Test User", "test@example.com")
}

/// Git configuration independent of the machine running the tests.
pub fn git_config() -> StaticGitConfig {
    StaticGitConfig::new("main", Some(tester()))
}

/// Retry policy with the production attempt count and a short delay.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(10))
}

/// Provisioner with deterministic configuration and fast retries.
pub fn provisioner() -> Provisioner {
    Provisioner::new()
        .with_git_config(git_config())
        .with_retry(fast_retry())
}

/// A temp dir holding bare remotes and working trees.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the bare remote `owner/name.git`.
    pub fn remote_path(&self, owner: &str, name: &str) -> PathBuf {
        self.path().join("remotes").join(owner).join(format!("{name}.git"))
    }

    /// `file://` URL of the bare remote `owner/name.git`.
    pub fn remote_url(&self, owner: &str, name: &str) -> String {
        format!("file://{}", self.remote_path(owner, name).display())
    }

    /// Working-tree directory `name` (not created).
    pub fn workdir(&self, name: &str) -> PathBuf {
        self.path().join("work").join(name)
    }

    /// Create an empty bare remote with `main` as its unborn HEAD.
    pub fn empty_remote(&self, owner: &str, name: &str) -> Repository {
        init_bare(&self.remote_path(owner, name))
    }
}

/// Initialize a bare repository whose HEAD points at `main`.
pub fn init_bare(path: &Path) -> Repository {
    let mut opts = RepositoryInitOptions::new();
    opts.bare(true).initial_head("main").mkpath(true);
    Repository::init_opts(path, &opts).expect("failed to init bare repo")
}

/// Commit `files` on top of `branch` directly in a bare repository.
///
/// The tree of the new commit is the parent's tree plus `files`.
pub fn commit_files(repo: &Repository, branch: &str, files: &[(&str, &str)], message: &str) -> git2::Oid {
    let refname = format!("refs/heads/{branch}");
    let parent = repo
        .find_reference(&refname)
        .ok()
        .and_then(|r| r.peel_to_commit().ok());

    let mut builder = repo
        .treebuilder(parent.as_ref().map(|c| c.tree().unwrap()).as_ref())
        .unwrap();
    for (name, contents) in files {
        let blob = repo.blob(contents.as_bytes()).unwrap();
        builder.insert(name, blob, 0o100644).unwrap();
    }
    let tree = repo.find_tree(builder.write().unwrap()).unwrap();

    let signature = Signature::now("Fixture", "fixture@example.com").unwrap();
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
    repo.commit(Some(&refname), &signature, &signature, message, &tree, &parents)
        .unwrap()
}

/// Read `path` from the tip of `branch` in `repo`.
pub fn read_blob(repo: &Repository, branch: &str, path: &str) -> Option<String> {
    let commit = repo
        .find_reference(&format!("refs/heads/{branch}"))
        .ok()?
        .peel_to_commit()
        .ok()?;
    let entry = commit.tree().ok()?.get_path(Path::new(path)).ok()?;
    let blob = repo.find_blob(entry.id()).ok()?;
    Some(String::from_utf8_lossy(blob.content()).into_owned())
}
