//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! [git]
//! user = "ci-bot"
//! provider = "gitlab"
//! default_branch = "trunk"
//!
//! [retry]
//! attempts = 5
//! backoff_secs = 2
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing: the provider must be a supported forge,
//! the default branch must be a valid branch name and at least one retry
//! attempt is required.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Git identity and provider defaults
    pub git: Option<GitSection>,

    /// Transport retry settings
    pub retry: Option<RetrySection>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(git) = &self.git {
            git.validate()?;
        }
        if let Some(retry) = &self.retry {
            retry.validate()?;
        }
        Ok(())
    }
}

/// `[git]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GitSection {
    /// Username used for HTTP basic auth
    pub user: Option<String>,

    /// Provider name used when a remote has to be created
    pub provider: Option<String>,

    /// Branch for freshly initialized repositories (overrides `init.defaultBranch`)
    pub default_branch: Option<String>,
}

impl GitSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(provider) = &self.provider {
            let valid = crate::forge::valid_forge_names();
            if !valid.contains(&provider.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid provider '{}', must be one of: {}",
                    provider,
                    valid.join(", ")
                )));
            }
        }

        if let Some(branch) = &self.default_branch {
            BranchName::new(branch.as_str()).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid default branch: {}", e))
            })?;
        }

        Ok(())
    }
}

/// `[retry]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    /// Total attempts for clone and push (>= 1)
    pub attempts: Option<u32>,

    /// Delay between attempts, in seconds
    pub backoff_secs: Option<u64>,
}

impl RetrySection {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.attempts == Some(0) {
            return Err(ConfigError::InvalidValue(
                "retry.attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
