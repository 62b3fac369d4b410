//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge provides a deterministic implementation of the `Forge` trait
//! for use in tests. It keeps created repositories in memory, records every
//! call, and allows configuring failure scenarios. It is also a
//! [`ForgeFactory`] that hands out handles to itself, so it can be injected
//! straight into a provisioner.
//!
//! # Example
//!
//! ```
//! use gitprov::forge::mock::MockForge;
//! use gitprov::forge::{CreateRepoRequest, Forge};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let forge = MockForge::new();
//!
//! let url = forge.create_repository(CreateRepoRequest {
//!     owner: "org".to_string(),
//!     name: "gitops".to_string(),
//!     private: true,
//! }).await.unwrap();
//!
//! assert_eq!(url, "https://mock.example.com/org/gitops.git");
//! assert_eq!(forge.operations().len(), 1);
//! # });
//! ```

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::factory::ForgeFactory;
use super::traits::{CreateRepoRequest, Forge, ForgeError};

/// Host of returned clone URLs.
const CLONE_BASE: &str = "https://mock.example.com/";

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockForge {
    inner: Arc<Mutex<MockForgeInner>>,
}

#[derive(Debug)]
struct MockForgeInner {
    /// Existing repositories as `owner/name`.
    repos: BTreeSet<String>,
    /// Method to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
    /// `(provider, host)` pairs the factory was asked for.
    connections: Vec<(String, String)>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail `create_repository` with the given error.
    CreateRepository(ForgeError),
    /// Fail `ForgeFactory::create` with the given error.
    Connect(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    CreateRepository {
        owner: String,
        name: String,
        private: bool,
    },
}

impl MockForge {
    /// Create a new empty mock forge.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner {
                repos: BTreeSet::new(),
                fail_on: None,
                operations: Vec::new(),
                connections: Vec::new(),
            })),
        }
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use gitprov::forge::mock::{FailOn, MockForge};
    /// use gitprov::forge::ForgeError;
    ///
    /// let forge = MockForge::new()
    ///     .fail_on(FailOn::CreateRepository(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.lock().fail_on = Some(fail_on);
        self
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    /// Get the `(provider, host)` pairs requested through [`ForgeFactory`].
    pub fn connections(&self) -> Vec<(String, String)> {
        self.lock().connections.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockForgeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_repository(&self, request: CreateRepoRequest) -> Result<String, ForgeError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::CreateRepository {
            owner: request.owner.clone(),
            name: request.name.clone(),
            private: request.private,
        });

        if let Some(FailOn::CreateRepository(err)) = &inner.fail_on {
            return Err(err.clone());
        }

        let full_name = format!("{}/{}", request.owner, request.name);
        if !inner.repos.insert(full_name.clone()) {
            return Err(ForgeError::ApiError {
                status: 422,
                message: "name already exists on this account".into(),
            });
        }

        Ok(format!("{CLONE_BASE}{full_name}.git"))
    }
}

impl ForgeFactory for MockForge {
    fn create(
        &self,
        provider: &str,
        host: &str,
        _token: &str,
    ) -> Result<Box<dyn Forge>, ForgeError> {
        let mut inner = self.lock();
        inner
            .connections
            .push((provider.to_string(), host.to_string()));

        if let Some(FailOn::Connect(err)) = &inner.fail_on {
            return Err(err.clone());
        }
        drop(inner);

        Ok(Box::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(owner: &str, name: &str) -> CreateRepoRequest {
        CreateRepoRequest {
            owner: owner.to_string(),
            name: name.to_string(),
            private: true,
        }
    }

    #[tokio::test]
    async fn create_returns_clone_url() {
        let forge = MockForge::new();
        let url = forge.create_repository(request("org/sub", "repo")).await.unwrap();
        assert_eq!(url, "https://mock.example.com/org/sub/repo.git");
    }

    #[tokio::test]
    async fn duplicate_is_rejected() {
        let forge = MockForge::new();
        forge.create_repository(request("org", "repo")).await.unwrap();

        let result = forge.create_repository(request("org", "repo")).await;

        assert!(matches!(result, Err(ForgeError::ApiError { status: 422, .. })));
        assert_eq!(forge.operations().len(), 2);
    }

    #[tokio::test]
    async fn fail_on_create_records_then_fails() {
        let forge = MockForge::new().fail_on(FailOn::CreateRepository(ForgeError::RateLimited));
        let result = forge.create_repository(request("o", "r")).await;

        assert!(matches!(result, Err(ForgeError::RateLimited)));
        assert_eq!(
            forge.operations(),
            vec![MockOperation::CreateRepository {
                owner: "o".to_string(),
                name: "r".to_string(),
                private: true,
            }]
        );
    }

    #[tokio::test]
    async fn factory_shares_state() {
        let forge = MockForge::new();
        let handle = forge.create("github", "https://github.com/", "token").unwrap();
        handle.create_repository(request("o", "r")).await.unwrap();

        assert_eq!(
            forge.connections(),
            vec![("github".to_string(), "https://github.com/".to_string())]
        );
        assert_eq!(forge.operations().len(), 1);
    }

    #[test]
    fn factory_failure() {
        let forge = MockForge::new().fail_on(FailOn::Connect(ForgeError::AuthRequired));
        let result = forge.create("github", "https://github.com/", "");
        assert!(matches!(result, Err(ForgeError::AuthRequired)));
        assert_eq!(forge.connections().len(), 1);
    }
}
