//! provision command - Produce a working tree for a repository URL

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::{git_config, resolve_auth, retry_policy};
use crate::cli::args::GitAuthArgs;
use crate::cli::Context;
use crate::git::{CloneOptions, Provisioner};

/// Clone, create or initialize the repository at `repo` into `dir`.
///
/// Prints the working-tree root and the checked-out branch, one per line.
pub async fn provision(
    ctx: &Context,
    repo: String,
    dir: PathBuf,
    auth: GitAuthArgs,
    provider: Option<String>,
    create_if_not_exist: bool,
) -> Result<()> {
    let provider = provider
        .or_else(|| ctx.config.provider().map(str::to_string))
        .unwrap_or_default();

    let mut opts = CloneOptions::new(repo, dir)
        .with_auth(resolve_auth(auth, &ctx.config))
        .with_provider(provider)
        .create_if_not_exist(create_if_not_exist);
    opts.parse().context("Invalid repository URL")?;

    let provisioner = Provisioner::new()
        .with_git_config(git_config(&ctx.config))
        .with_retry(retry_policy(&ctx.config));

    let (repo, fs) = provisioner
        .get_repo(&ctx.cancel, &opts)
        .await
        .with_context(|| format!("Failed to provision {}", opts.url()))?;

    println!("{}", fs.root().display());
    println!("{}", repo.current_branch()?);
    Ok(())
}
