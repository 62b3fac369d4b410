//! forge::factory
//!
//! Forge selection and creation.
//!
//! # Design
//!
//! This module is the only place that knows about concrete forge types.
//! The provisioning orchestrator goes through [`ForgeFactory`] so tests can
//! hand it a mock instead of a real REST client.
//!
//! # Provider Inference
//!
//! When no provider is given, the host name is used as the provider name
//! with a `.com` suffix removed: `https://github.com/` → `github`,
//! `https://gitlab.com/` → `gitlab`. Self-hosted instances on other domains
//! need an explicit provider.
//!
//! # Example
//!
//! ```ignore
//! use gitprov::forge::{create_forge, infer_provider};
//!
//! let provider = infer_provider("https://github.com/");
//! let forge = create_forge(&provider, "https://github.com/", "ghp_token")?;
//! assert_eq!(forge.name(), "github");
//! ```

use super::gitea::GiteaForge;
use super::github::GitHubForge;
use super::gitlab::GitLabForge;
use super::traits::{Forge, ForgeError};

/// Supported forge providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgeProvider {
    GitHub,
    GitLab,
    Gitea,
}

impl ForgeProvider {
    /// Get all available providers.
    ///
    /// # Example
    ///
    /// ```
    /// use gitprov::forge::ForgeProvider;
    ///
    /// let providers = ForgeProvider::all();
    /// assert!(providers.contains(&ForgeProvider::GitHub));
    /// ```
    pub fn all() -> &'static [ForgeProvider] {
        &[ForgeProvider::GitHub, ForgeProvider::GitLab, ForgeProvider::Gitea]
    }

    /// Get the provider name as a string.
    ///
    /// This matches the name used on the command line and in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            ForgeProvider::GitHub => "github",
            ForgeProvider::GitLab => "gitlab",
            ForgeProvider::Gitea => "gitea",
        }
    }

    /// Parse a provider from a string (case-insensitive).
    ///
    /// # Example
    ///
    /// ```
    /// use gitprov::forge::ForgeProvider;
    ///
    /// assert_eq!(ForgeProvider::parse("GitLab"), Some(ForgeProvider::GitLab));
    /// assert_eq!(ForgeProvider::parse("unknown"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(s))
    }
}

impl std::fmt::Display for ForgeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Guess the provider name from a `scheme://host[:port]/` prefix.
///
/// The result is not checked against the registry; an unknown guess fails
/// later in [`create_forge`] with the list of supported names.
///
/// # Example
///
/// ```
/// use gitprov::forge::infer_provider;
///
/// assert_eq!(infer_provider("https://github.com/"), "github");
/// assert_eq!(infer_provider("https://gitea.example.org:3000/"), "gitea.example.org");
/// ```
pub fn infer_provider(host: &str) -> String {
    let name = host.split_once("://").map_or(host, |(_, rest)| rest);
    let name = name.trim_end_matches('/');
    let name = name.split_once(':').map_or(name, |(name, _port)| name);
    name.strip_suffix(".com").unwrap_or(name).to_string()
}

/// Create a forge for `provider` talking to `host` with `token`.
///
/// # Errors
///
/// - `ForgeError::NotFound` if the provider is unknown; the message lists
///   the supported names
/// - `ForgeError::AuthRequired` if `token` is empty
pub fn create_forge(provider: &str, host: &str, token: &str) -> Result<Box<dyn Forge>, ForgeError> {
    let provider = ForgeProvider::parse(provider).ok_or_else(|| {
        ForgeError::NotFound(format!(
            "provider {} is not a valid provider name, possible values are: {}",
            provider,
            available_providers_string()
        ))
    })?;

    if token.is_empty() {
        return Err(ForgeError::AuthRequired);
    }

    Ok(match provider {
        ForgeProvider::GitHub => Box::new(GitHubForge::new(host, token)),
        ForgeProvider::GitLab => Box::new(GitLabForge::new(host, token)),
        ForgeProvider::Gitea => Box::new(GiteaForge::new(host, token)),
    })
}

/// Get a comma-separated string of available providers.
fn available_providers_string() -> String {
    ForgeProvider::all()
        .iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Get list of valid forge names for configuration validation.
pub fn valid_forge_names() -> &'static [&'static str] {
    &["github", "gitlab", "gitea"]
}

/// Builds forges on demand.
///
/// Injected into [`crate::git::Provisioner`] so the create path can be
/// exercised without network access.
pub trait ForgeFactory: Send + Sync {
    /// Create a forge for `provider` at `host`, authenticated with `token`.
    fn create(&self, provider: &str, host: &str, token: &str)
        -> Result<Box<dyn Forge>, ForgeError>;
}

/// [`ForgeFactory`] backed by the static provider registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryForgeFactory;

impl ForgeFactory for RegistryForgeFactory {
    fn create(
        &self,
        provider: &str,
        host: &str,
        token: &str,
    ) -> Result<Box<dyn Forge>, ForgeError> {
        create_forge(provider, host, token)
    }
}
