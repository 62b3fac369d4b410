//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Merges flags with configuration defaults
//! 2. Calls into [`crate::git`]
//! 3. Prints the result on stdout
//!
//! Diagnostics go to the tracing subscriber on stderr, so stdout stays
//! machine-readable.

mod persist;
mod provision;

pub use persist::persist;
pub use provision::provision;

use super::args::{Command, GitAuthArgs};
use super::Context;
use crate::core::config::Config;
use crate::git::{Auth, RetryPolicy, SystemGitConfig};
use anyhow::Result;

/// Dispatch a parsed command to its handler.
pub async fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Provision {
            repo,
            dir,
            auth,
            provider,
            create_if_not_exist,
        } => provision(ctx, repo, dir, auth, provider, create_if_not_exist).await,
        Command::Persist {
            dir,
            message,
            glob,
            auth,
        } => persist(ctx, dir, message, glob, auth).await,
    }
}

/// Credentials from flags, with the configured user as fallback.
pub(crate) fn resolve_auth(args: GitAuthArgs, config: &Config) -> Auth {
    let username = args
        .git_user
        .or_else(|| config.git_user().map(str::to_string))
        .unwrap_or_default();
    Auth::new(username, args.git_token.unwrap_or_default())
}

pub(crate) fn retry_policy(config: &Config) -> RetryPolicy {
    RetryPolicy::new(config.retry_attempts(), config.retry_backoff())
}

pub(crate) fn git_config(config: &Config) -> SystemGitConfig {
    match config.default_branch() {
        Some(branch) => SystemGitConfig::new().with_default_branch(branch),
        None => SystemGitConfig::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::schema::{FileConfig, GitSection};
    use crate::git::GitConfig;

    fn config_with_user(user: &str) -> Config {
        let mut config = Config::default();
        config.file = FileConfig {
            git: Some(GitSection {
                user: Some(user.to_string()),
                default_branch: Some("trunk".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        config
    }

    #[test]
    fn flag_user_wins_over_config() {
        let auth = resolve_auth(
            GitAuthArgs {
                git_user: Some("flag-user".into()),
                git_token: Some("token".into()),
            },
            &config_with_user("config-user"),
        );
        assert_eq!(auth.username, "flag-user");
        assert_eq!(auth.password, "token");
    }

    #[test]
    fn config_user_is_fallback() {
        let auth = resolve_auth(GitAuthArgs::default(), &config_with_user("config-user"));
        assert_eq!(auth.username, "config-user");
        assert_eq!(auth.password, "");
    }

    #[test]
    fn configured_default_branch() {
        assert_eq!(git_config(&config_with_user("u")).default_branch(), "trunk");
    }
}
