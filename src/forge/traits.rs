//! forge::traits
//!
//! Forge trait definition for creating repositories on hosting services.
//!
//! # Design
//!
//! The `Forge` trait is async because forge operations involve network I/O.
//! Provisioning only ever needs one operation from a provider: create an
//! empty repository and report where to clone it from. Payloads are kept
//! minimal (owner, name, visibility).
//!
//! # Example
//!
//! ```ignore
//! use gitprov::forge::{CreateRepoRequest, Forge, ForgeError};
//!
//! async fn create(forge: &dyn Forge) -> Result<(), ForgeError> {
//!     let url = forge
//!         .create_repository(CreateRepoRequest {
//!             owner: "my-org".to_string(),
//!             name: "gitops".to_string(),
//!             private: true,
//!         })
//!         .await?;
//!     println!("created {url}");
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors from forge operations.
///
/// These error types map to common failure modes when interacting
/// with remote hosting services.
#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource (or provider) was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ForgeError {
    /// Map a non-success HTTP status to an error.
    ///
    /// `message` is the provider's error text, if the body carried one.
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("invalid or expired token".into()),
            StatusCode::FORBIDDEN => ForgeError::AuthFailed(format!("permission denied: {message}")),
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("server error: {message}"),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// Request to create a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRepoRequest {
    /// User, organization or (nested) group that will own the repository
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Create the repository as private
    pub private: bool,
}

/// The Forge trait for interacting with remote hosting services.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// Callers should handle:
/// - `AuthRequired` / `AuthFailed`: the token is missing or lacks permissions
/// - `NotFound`: the owner does not exist
/// - `RateLimited`: back off and retry
/// - `ApiError`: display the message to the user (e.g. name already taken)
/// - `NetworkError`: check connectivity
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github", "gitlab").
    fn name(&self) -> &'static str;

    /// Create an empty repository.
    ///
    /// # Returns
    ///
    /// The HTTPS clone URL of the new repository.
    ///
    /// # Errors
    ///
    /// - `AuthRequired` if no token is configured
    /// - `AuthFailed` if the token is invalid or lacks permissions
    /// - `ApiError` with status 422 or 409 if the repository already exists
    async fn create_repository(&self, request: CreateRepoRequest) -> Result<String, ForgeError>;
}
