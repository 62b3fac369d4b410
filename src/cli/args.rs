//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug logging
//! - `--config <path>`: Read configuration from this file
//!
//! # Environment
//!
//! `--repo`, `--git-token` and `--git-user` fall back to `GIT_REPO`,
//! `GIT_TOKEN` and `GIT_USER`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// gitprov - provision and persist git-backed working trees
#[derive(Parser, Debug)]
#[command(name = "gitprov")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Configuration file (defaults to $GITPROV_CONFIG, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Credentials for the remote.
#[derive(Args, Debug, Clone, Default)]
pub struct GitAuthArgs {
    /// Username for the git remote (defaults to `git`)
    #[arg(long, env = "GIT_USER")]
    pub git_user: Option<String>,

    /// Token for the git remote and the provider API
    #[arg(long, env = "GIT_TOKEN", hide_env_values = true)]
    pub git_token: Option<String>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Clone a repository, creating or initializing it when needed
    #[command(
        name = "provision",
        long_about = "Clone a repository into a local working tree.\n\n\
            The repository URL may carry a sub-path and a revision:\n\
            github.com/owner/repo/apps?ref=v1.0 clones owner/repo, checks out v1.0 \
            and roots the working tree at apps/.\n\n\
            A remote that exists but is empty is initialized locally with an \
            initial commit. A remote that does not exist is created through the \
            provider API when --create-if-not-exist is given.",
        after_help = "\
EXAMPLES:
    # Clone, retrying while the remote is not reachable yet
    gitprov provision --repo github.com/owner/gitops --dir ./work

    # Create the repository on GitLab if it is missing
    gitprov provision --repo gitlab.com/group/sub/gitops --dir ./work \\
        --git-token $TOKEN --create-if-not-exist"
    )]
    Provision {
        /// Repository URL: host/owner/repo[.git][/path][?ref=revision]
        #[arg(long, env = "GIT_REPO")]
        repo: String,

        /// Directory the working tree is created in
        #[arg(long, value_name = "PATH")]
        dir: PathBuf,

        #[command(flatten)]
        auth: GitAuthArgs,

        /// Provider used to create the repository (github, gitlab, gitea)
        #[arg(long)]
        provider: Option<String>,

        /// Create the remote repository if it does not exist
        #[arg(long)]
        create_if_not_exist: bool,
    },

    /// Commit working-tree changes and push every local branch to origin
    #[command(name = "persist")]
    Persist {
        /// Directory inside the working tree
        #[arg(long, value_name = "PATH")]
        dir: PathBuf,

        /// Commit message
        #[arg(short = 'm', long = "message")]
        message: String,

        /// Glob of files to stage, relative to the working-tree root
        #[arg(long, default_value = ".")]
        glob: String,

        #[command(flatten)]
        auth: GitAuthArgs,
    },
}
