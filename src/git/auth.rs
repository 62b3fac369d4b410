//! git::auth
//!
//! Credential resolution and libgit2 transport callbacks.
//!
//! Only HTTP basic auth is supported: a username plus a password or token.
//! An empty password means anonymous access.
//!
//! # Example
//!
//! ```
//! use gitprov::git::auth::{resolve, Auth};
//!
//! assert!(resolve(&Auth::default()).is_none());
//!
//! let auth = Auth::new("bot", "ghp_token");
//! let basic = resolve(&auth).unwrap();
//! assert_eq!(basic.password, "ghp_token");
//! ```

use std::cell::Cell;

use git2::{Cred, CredentialType, RemoteCallbacks};
use tokio_util::sync::CancellationToken;

use super::options::Progress;

/// Fallback username when neither the options nor the URL carry one.
pub const DEFAULT_USERNAME: &str = "git";

/// Credential supplied by the caller.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Auth {
    /// HTTP username
    pub username: String,
    /// Password or access token
    pub password: String,
}

impl Auth {
    /// Create a credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Tokens must never end up in logs.
impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .finish()
    }
}

/// Transport-level credential.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    /// Username, if one was given
    pub username: Option<String>,
    /// Password or token
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Resolve a caller credential into a transport credential.
///
/// Returns `None` when the password is empty.
pub fn resolve(auth: &Auth) -> Option<BasicAuth> {
    if auth.password.is_empty() {
        return None;
    }
    Some(BasicAuth {
        username: Some(auth.username.clone()).filter(|u| !u.is_empty()),
        password: auth.password.clone(),
    })
}

/// Build the callbacks used for every network operation.
///
/// The credential is offered once per connection. libgit2 keeps invoking the
/// credentials callback while the server rejects it, so a second request
/// fails instead of looping. Progress callbacks write to `progress` and abort
/// the transfer once `cancel` fires.
pub fn remote_callbacks<'a>(
    auth: Option<&'a BasicAuth>,
    progress: &'a Progress,
    cancel: &'a CancellationToken,
) -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    let tried = Cell::new(false);

    callbacks.credentials(move |_url, username_from_url, allowed| {
        let Some(auth) = auth else {
            return Err(git2::Error::from_str("remote requires authentication"));
        };
        if tried.replace(true) {
            return Err(git2::Error::from_str("credentials rejected by remote"));
        }
        if !allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            return Err(git2::Error::from_str(
                "remote does not accept username/password authentication",
            ));
        }
        let username = auth
            .username
            .as_deref()
            .or(username_from_url)
            .unwrap_or(DEFAULT_USERNAME);
        Cred::userpass_plaintext(username, &auth.password)
    });

    callbacks.sideband_progress(move |data| {
        progress.write(data);
        !cancel.is_cancelled()
    });
    callbacks.transfer_progress(move |_stats| !cancel.is_cancelled());

    callbacks
}
