//! core::fs
//!
//! Rooted view of a working-tree directory.
//!
//! Provisioning hands callers a [`Filesystem`] rooted at the requested
//! sub-path of the clone, so that generated files land in the right place
//! without callers having to know where the repository lives on disk.
//!
//! # Design
//!
//! - Every relative path is resolved against the root; absolute paths and
//!   `..` components are rejected so a view never escapes its root
//! - [`Filesystem::glob`] returns matches relative to the root and never
//!   reports anything under `.git`
//!
//! # Example
//!
//! ```
//! use gitprov::core::fs::Filesystem;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let fs = Filesystem::new(dir.path());
//! let apps = fs.chroot("apps/prod").unwrap();
//! apps.write("kustomization.yaml", "resources: []\n").unwrap();
//!
//! assert!(fs.exists("apps/prod/kustomization.yaml"));
//! ```

use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

const GIT_DIR: &str = ".git";

/// Glob pattern meaning "everything in the working tree".
pub const ALL_PATTERN: &str = ".";

/// Errors from filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("i/o error at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid path '{0}': must be relative and stay inside the root")]
    InvalidPath(String),

    #[error("invalid glob pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },
}

/// A directory-rooted filesystem view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filesystem {
    root: PathBuf,
}

impl Filesystem {
    /// Create a view rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute root of this view.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Narrow the view to a sub-directory. An empty path returns the same view.
    ///
    /// The directory does not have to exist yet.
    pub fn chroot(&self, sub: &str) -> Result<Self, FsError> {
        if sub.is_empty() {
            return Ok(self.clone());
        }
        Ok(Self {
            root: self.join(sub)?,
        })
    }

    /// Resolve a relative path against the root.
    pub fn join(&self, rel: impl AsRef<Path>) -> Result<PathBuf, FsError> {
        let rel = rel.as_ref();
        let escapes = rel.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(FsError::InvalidPath(rel.display().to_string()));
        }
        Ok(self.root.join(rel))
    }

    /// Whether a relative path exists. Invalid paths never exist.
    pub fn exists(&self, rel: impl AsRef<Path>) -> bool {
        self.join(rel).map(|p| p.exists()).unwrap_or(false)
    }

    /// Read a file to a string.
    pub fn read_to_string(&self, rel: impl AsRef<Path>) -> Result<String, FsError> {
        let path = self.join(rel)?;
        fs::read_to_string(&path).map_err(|source| FsError::Io { path, source })
    }

    /// Write a file, creating parent directories as needed.
    pub fn write(&self, rel: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<(), FsError> {
        let path = self.join(rel)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| FsError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, contents).map_err(|source| FsError::Io { path, source })
    }

    /// Expand a glob pattern relative to the root.
    ///
    /// [`ALL_PATTERN`] (`"."`) expands to every top-level entry. Matches are
    /// sorted, relative to the root and never include `.git`.
    pub fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>, FsError> {
        let mut matches = if pattern == ALL_PATTERN {
            self.top_level_entries()?
        } else {
            self.expand(pattern)?
        };

        matches.retain(|p| {
            p.components()
                .next()
                .map(|c| c.as_os_str() != GIT_DIR)
                .unwrap_or(false)
        });
        matches.sort();
        Ok(matches)
    }

    fn top_level_entries(&self) -> Result<Vec<PathBuf>, FsError> {
        let io_err = |source: std::io::Error| FsError::Io {
            path: self.root.clone(),
            source,
        };
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(io_err)? {
            entries.push(PathBuf::from(entry.map_err(io_err)?.file_name()));
        }
        Ok(entries)
    }

    fn expand(&self, pattern: &str) -> Result<Vec<PathBuf>, FsError> {
        self.join(pattern)?;
        let full = format!(
            "{}/{}",
            glob::Pattern::escape(&self.root.to_string_lossy()),
            pattern
        );
        let paths = glob::glob(&full).map_err(|e| FsError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        let mut matches = Vec::new();
        for entry in paths {
            let path = entry.map_err(|e| FsError::Io {
                path: e.path().to_path_buf(),
                source: e.into_error(),
            })?;
            if let Ok(rel) = path.strip_prefix(&self.root) {
                if !rel.as_os_str().is_empty() {
                    matches.push(rel.to_path_buf());
                }
            }
        }
        Ok(matches)
    }
}
