//! core::url
//!
//! Repository URL parsing.
//!
//! A repository URL names more than a remote: it also carries the sub-path of
//! the repository that should be used as the working-tree root and, optionally,
//! the revision to check out.
//!
//! # Accepted shapes
//!
//! ```text
//! github.com/owner/repo
//! https://github.com/owner/repo/apps/prod
//! https://github.com/owner/repo?ref=v1.0
//! https://gitlab.com/group/subgroup/repo.git/apps/prod?ref=release
//! file:///srv/git/owner/repo.git
//! ```
//!
//! A missing scheme defaults to `https://`. When a path segment ends in `.git`
//! every segment up to it belongs to the repository (nested groups are
//! allowed) and the rest is the sub-path. Without a `.git` marker the first two
//! segments are `owner/repo`.
//!
//! # Example
//!
//! ```
//! use gitprov::core::url::RepoUrl;
//!
//! let url = RepoUrl::parse("github.com/owner/repo/apps/prod?ref=v1.0").unwrap();
//! assert_eq!(url.url(), "https://github.com/owner/repo");
//! assert_eq!(url.path(), "apps/prod");
//! assert_eq!(url.revision(), "v1.0");
//! ```

use reqwest::Url;
use thiserror::Error;

const GIT_SUFFIX: &str = ".git";
const REF_QUERY_KEY: &str = "ref";

/// Errors from repository URL parsing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("invalid repository url '{url}': {message}")]
    Invalid { url: String, message: String },
}

/// A parsed repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUrl {
    /// `scheme://host[:port]/`
    host: String,
    /// Repository path below the host, without the `.git` suffix
    org_repo: String,
    /// `.git` when the input carried it, empty otherwise
    suffix: &'static str,
    /// Sub-path inside the repository, no leading slash
    path: String,
    /// Value of the `ref` query parameter
    revision: String,
    username: Option<String>,
    password: Option<String>,
}

impl RepoUrl {
    /// Parse a repository URL.
    ///
    /// Parsing is side-effect free; parsing the same input twice yields equal
    /// values.
    ///
    /// # Errors
    ///
    /// Returns `UrlError::Invalid` when the input is not a URL or its path does
    /// not name an `owner/repo` pair.
    pub fn parse(raw: &str) -> Result<Self, UrlError> {
        let invalid = |message: &str| UrlError::Invalid {
            url: raw.to_string(),
            message: message.to_string(),
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid("url is empty"));
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };
        let parsed = Url::parse(&with_scheme).map_err(|e| invalid(&e.to_string()))?;

        let mut host = format!("{}://", parsed.scheme());
        if let Some(name) = parsed.host_str() {
            host.push_str(name);
        }
        if let Some(port) = parsed.port() {
            host.push_str(&format!(":{port}"));
        }
        host.push('/');

        let segments: Vec<&str> = parsed
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();

        let (org_repo, suffix, rest) = match segments.iter().position(|s| s.ends_with(GIT_SUFFIX)) {
            Some(idx) => {
                let name = segments[idx].strip_suffix(GIT_SUFFIX).unwrap_or_default();
                if name.is_empty() || idx == 0 {
                    return Err(invalid("expected <owner>/<repo>.git in path"));
                }
                let mut parts = segments[..idx].to_vec();
                parts.push(name);
                (parts.join("/"), GIT_SUFFIX, &segments[idx + 1..])
            }
            None if segments.len() >= 2 => (segments[..2].join("/"), "", &segments[2..]),
            None => return Err(invalid("expected <owner>/<repo> in path")),
        };

        let revision = parsed
            .query_pairs()
            .find(|(key, _)| key == REF_QUERY_KEY)
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();

        Ok(Self {
            host,
            org_repo,
            suffix,
            path: rest.join("/"),
            revision,
            username: Some(parsed.username())
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            password: parsed.password().map(str::to_string),
        })
    }

    /// Clone URL of the repository: host, org/repo and suffix.
    pub fn url(&self) -> String {
        format!("{}{}{}", self.host, self.org_repo, self.suffix)
    }

    /// `scheme://host[:port]/`, used to locate the provider API.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Repository path below the host (`owner/repo`, `group/sub/repo`).
    pub fn org_repo(&self) -> &str {
        &self.org_repo
    }

    /// Sub-path used as the working-tree root; empty for the repository root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Requested revision; empty when none was given.
    pub fn revision(&self) -> &str {
        &self.revision
    }

    /// Split org/repo into `(owner, name)`.
    ///
    /// The last segment is the name, everything before it is the owner.
    /// Returns `None` when there are fewer than two segments.
    pub fn owner_and_name(&self) -> Option<(String, String)> {
        let (owner, name) = self.org_repo.rsplit_once('/')?;
        if owner.is_empty() || name.is_empty() {
            return None;
        }
        Some((owner.to_string(), name.to_string()))
    }

    /// Credentials embedded in the URL userinfo, if any.
    pub fn credentials(&self) -> (Option<&str>, Option<&str>) {
        (self.username.as_deref(), self.password.as_deref())
    }
}

impl std::fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url())
    }
}
