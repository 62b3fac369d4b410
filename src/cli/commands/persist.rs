//! persist command - Commit and push a working tree

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::{git_config, resolve_auth, retry_policy};
use crate::cli::args::GitAuthArgs;
use crate::cli::Context;
use crate::git::{PushOptions, Repo};

/// Commit files matching `glob` with `message` and push to origin.
///
/// Prints the new commit hash.
pub async fn persist(
    ctx: &Context,
    dir: PathBuf,
    message: String,
    glob: String,
    auth: GitAuthArgs,
) -> Result<()> {
    let auth = resolve_auth(auth, &ctx.config);
    let mut repo = Repo::open(&dir, &auth)
        .context("Failed to open repository")?
        .with_git_config(Arc::new(git_config(&ctx.config)))
        .with_retry(retry_policy(&ctx.config));

    let opts = PushOptions::new(message).with_glob(glob);
    let oid = repo.persist(&ctx.cancel, &opts).await?;

    println!("{oid}");
    Ok(())
}
