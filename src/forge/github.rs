//! forge::github
//!
//! GitHub forge implementation using the REST API.
//!
//! # Design
//!
//! Creating a repository takes two calls:
//! - `GET /user` to learn the token owner's login
//! - `POST /user/repos` when the target owner is that login, otherwise
//!   `POST /orgs/{owner}/repos`
//!
//! The created repository's `clone_url` is returned.
//!
//! # GitHub Enterprise
//!
//! For `github.com` the API lives at `https://api.github.com`. Any other
//! host is treated as an Enterprise server with the API under `/api/v3`.
//!
//! # Rate Limiting
//!
//! Returns `ForgeError::RateLimited` when limits are hit. No automatic
//! retry; that is the caller's responsibility.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::{handle_response, json_headers, network_error};
use super::traits::{CreateRepoRequest, Forge, ForgeError};

/// Default GitHub API base URL.
const DEFAULT_API_BASE: &str = "https://api.github.com";

const ACCEPT_VALUE: &str = "application/vnd.github+json";

/// GitHub forge implementation.
pub struct GitHubForge {
    /// HTTP client for making requests
    client: Client,
    /// Personal access token
    token: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl GitHubForge {
    /// Create a forge for `host` (`scheme://host[:port]/`).
    pub fn new(host: &str, token: impl Into<String>) -> Self {
        Self::with_api_base(api_base_for(host), token)
    }

    /// Create a forge against an explicit API base URL.
    pub fn with_api_base(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// API base URL requests are sent to.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    async fn login(&self) -> Result<String, ForgeError> {
        let response = self
            .client
            .get(format!("{}/user", self.api_base))
            .headers(json_headers(&self.token, ACCEPT_VALUE)?)
            .send()
            .await
            .map_err(network_error)?;

        let user: GitHubUser = handle_response(response).await?;
        Ok(user.login)
    }
}

/// Map a host prefix to its API base.
fn api_base_for(host: &str) -> String {
    let authority = host.split_once("://").map_or(host, |(_, rest)| rest);
    if authority.trim_end_matches('/') == "github.com" {
        DEFAULT_API_BASE.to_string()
    } else {
        format!("{}/api/v3", host.trim_end_matches('/'))
    }
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn create_repository(&self, request: CreateRepoRequest) -> Result<String, ForgeError> {
        let login = self.login().await?;
        let url = if login == request.owner {
            format!("{}/user/repos", self.api_base)
        } else {
            format!("{}/orgs/{}/repos", self.api_base, request.owner)
        };
        debug!(owner = %request.owner, name = %request.name, "creating GitHub repository");

        let body = CreateRepoBody {
            name: &request.name,
            private: request.private,
        };
        let response = self
            .client
            .post(&url)
            .headers(json_headers(&self.token, ACCEPT_VALUE)?)
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let repo: GitHubRepository = handle_response(response).await?;
        Ok(repo.clone_url)
    }
}

// =============================================================================
// GitHub API types
// =============================================================================

#[derive(Serialize)]
struct CreateRepoBody<'a> {
    name: &'a str,
    private: bool,
}

#[derive(Deserialize)]
struct GitHubUser {
    login: String,
}

#[derive(Deserialize)]
struct GitHubRepository {
    clone_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod api_base {
        use super::*;

        #[test]
        fn public_github() {
            assert_eq!(api_base_for("https://github.com/"), DEFAULT_API_BASE);
        }

        #[test]
        fn enterprise_host() {
            assert_eq!(
                api_base_for("https://github.example.com/"),
                "https://github.example.com/api/v3"
            );
        }

        #[test]
        fn enterprise_host_with_port() {
            assert_eq!(
                api_base_for("http://ghe.local:8080/"),
                "http://ghe.local:8080/api/v3"
            );
        }

        #[test]
        fn explicit_base_trims_slash() {
            let forge = GitHubForge::with_api_base("http://127.0.0.1:1234/", "token");
            assert_eq!(forge.api_base(), "http://127.0.0.1:1234");
        }
    }

    #[test]
    fn debug_redacts_token() {
        let forge = GitHubForge::new("https://github.com/", "ghp_secret_token_12345");
        let debug = format!("{forge:?}");
        assert!(!debug.contains("ghp_secret_token_12345"));
        assert!(debug.contains("api.github.com"));
    }

    #[test]
    fn name() {
        assert_eq!(GitHubForge::new("https://github.com/", "t").name(), "github");
    }
}
