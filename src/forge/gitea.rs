//! forge::gitea
//!
//! Gitea forge implementation. Gitea's repository API mirrors GitHub's:
//! `GET /user`, then `POST /user/repos` or `POST /orgs/{owner}/repos`, all
//! under `{host}api/v1`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::{handle_response, json_headers, network_error};
use super::traits::{CreateRepoRequest, Forge, ForgeError};

const ACCEPT_VALUE: &str = "application/json";

/// Gitea forge implementation.
pub struct GiteaForge {
    client: Client,
    token: String,
    api_base: String,
}

impl std::fmt::Debug for GiteaForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GiteaForge")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl GiteaForge {
    pub fn new(host: &str, token: impl Into<String>) -> Self {
        Self::with_api_base(format!("{}/api/v1", host.trim_end_matches('/')), token)
    }

    pub fn with_api_base(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

#[async_trait]
impl Forge for GiteaForge {
    fn name(&self) -> &'static str {
        "gitea"
    }

    async fn create_repository(&self, request: CreateRepoRequest) -> Result<String, ForgeError> {
        let response = self
            .client
            .get(format!("{}/user", self.api_base))
            .headers(json_headers(&self.token, ACCEPT_VALUE)?)
            .send()
            .await
            .map_err(network_error)?;
        let user: GiteaUser = handle_response(response).await?;

        let url = if user.login == request.owner {
            format!("{}/user/repos", self.api_base)
        } else {
            format!("{}/orgs/{}/repos", self.api_base, request.owner)
        };
        debug!(owner = %request.owner, name = %request.name, "creating Gitea repository");

        let response = self
            .client
            .post(&url)
            .headers(json_headers(&self.token, ACCEPT_VALUE)?)
            .json(&CreateRepoBody {
                name: &request.name,
                private: request.private,
            })
            .send()
            .await
            .map_err(network_error)?;

        let repo: GiteaRepository = handle_response(response).await?;
        Ok(repo.clone_url)
    }
}

#[derive(Serialize)]
struct CreateRepoBody<'a> {
    name: &'a str,
    private: bool,
}

#[derive(Deserialize)]
struct GiteaUser {
    login: String,
}

#[derive(Deserialize)]
struct GiteaRepository {
    clone_url: String,
}
