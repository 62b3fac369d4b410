//! forge::gitlab
//!
//! GitLab forge implementation using the REST API (v4).
//!
//! # Design
//!
//! GitLab places projects in namespaces. A project for the token owner goes
//! into the personal namespace (no `namespace_id`); a project under a group,
//! including nested subgroups like `org/team`, needs the group id first:
//!
//! - `GET /user` for the username
//! - `GET /groups/{url-encoded path}` for the namespace id, unless the owner
//!   is the user
//! - `POST /projects` with `visibility`
//!
//! The project's `http_url_to_repo` is returned.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::{handle_response, json_headers, network_error};
use super::traits::{CreateRepoRequest, Forge, ForgeError};

const ACCEPT_VALUE: &str = "application/json";

/// GitLab forge implementation.
pub struct GitLabForge {
    client: Client,
    token: String,
    /// API base URL (`{host}api/v4`)
    api_base: String,
}

impl std::fmt::Debug for GitLabForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabForge")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl GitLabForge {
    /// Create a forge for `host` (`scheme://host[:port]/`).
    pub fn new(host: &str, token: impl Into<String>) -> Self {
        Self::with_api_base(format!("{}/api/v4", host.trim_end_matches('/')), token)
    }

    /// Create a forge against an explicit API base URL.
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

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ForgeError> {
        let response = self
            .client
            .get(format!("{}/{}", self.api_base, path))
            .headers(json_headers(&self.token, ACCEPT_VALUE)?)
            .send()
            .await
            .map_err(network_error)?;
        handle_response(response).await
    }

    /// Namespace id for `owner`, or `None` for the token owner's namespace.
    async fn namespace_id(&self, owner: &str) -> Result<Option<u64>, ForgeError> {
        let user: GitLabUser = self.get("user").await?;
        if user.username == owner {
            return Ok(None);
        }

        let group: GitLabGroup = self.get(&format!("groups/{}", encode_path(owner))).await?;
        Ok(Some(group.id))
    }
}

/// Encode a group path for use as a single URL segment.
fn encode_path(path: &str) -> String {
    path.replace('/', "%2F")
}

#[async_trait]
impl Forge for GitLabForge {
    fn name(&self) -> &'static str {
        "gitlab"
    }

    async fn create_repository(&self, request: CreateRepoRequest) -> Result<String, ForgeError> {
        let namespace_id = self.namespace_id(&request.owner).await?;
        debug!(owner = %request.owner, name = %request.name, ?namespace_id, "creating GitLab project");

        let body = CreateProjectBody {
            name: &request.name,
            path: &request.name,
            namespace_id,
            visibility: if request.private { "private" } else { "public" },
        };
        let response = self
            .client
            .post(format!("{}/projects", self.api_base))
            .headers(json_headers(&self.token, ACCEPT_VALUE)?)
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let project: GitLabProject = handle_response(response).await?;
        Ok(project.http_url_to_repo)
    }
}

// =============================================================================
// GitLab API types
// =============================================================================

#[derive(Serialize)]
struct CreateProjectBody<'a> {
    name: &'a str,
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace_id: Option<u64>,
    visibility: &'static str,
}

#[derive(Deserialize)]
struct GitLabUser {
    username: String,
}

#[derive(Deserialize)]
struct GitLabGroup {
    id: u64,
}

#[derive(Deserialize)]
struct GitLabProject {
    http_url_to_repo: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_base_from_host() {
        let forge = GitLabForge::new("https://gitlab.com/", "token");
        assert_eq!(forge.api_base(), "https://gitlab.com/api/v4");
    }

    #[test]
    fn self_hosted_api_base() {
        let forge = GitLabForge::new("http://gitlab.internal:8929/", "token");
        assert_eq!(forge.api_base(), "http://gitlab.internal:8929/api/v4");
    }

    #[test]
    fn nested_group_path_is_one_segment() {
        assert_eq!(encode_path("org"), "org");
        assert_eq!(encode_path("org/team/sub"), "org%2Fteam%2Fsub");
    }

    #[test]
    fn personal_namespace_omits_id() {
        let body = CreateProjectBody {
            name: "repo",
            path: "repo",
            namespace_id: None,
            visibility: "private",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("namespace_id").is_none());
        assert_eq!(json["visibility"], "private");
    }

    #[test]
    fn debug_redacts_token() {
        let forge = GitLabForge::new("https://gitlab.com/", "glpat-secret");
        assert!(!format!("{forge:?}").contains("glpat-secret"));
    }
}
