//! forge::http
//!
//! Response handling shared by the REST adapters.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Response;
use serde::de::DeserializeOwned;

use super::traits::ForgeError;

/// User-Agent header value for API requests.
pub(super) const USER_AGENT_VALUE: &str = "gitprov";

/// Headers common to every adapter: bearer token, JSON accept, user agent.
pub(super) fn json_headers(token: &str, accept: &'static str) -> Result<HeaderMap, ForgeError> {
    let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| ForgeError::AuthFailed("token contains invalid header characters".into()))?;

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
    Ok(headers)
}

/// Map a transport failure.
pub(super) fn network_error(err: reqwest::Error) -> ForgeError {
    ForgeError::NetworkError(err.to_string())
}

/// Decode a success body, or map the error status.
pub(super) async fn handle_response<T: DeserializeOwned>(
    response: Response,
) -> Result<T, ForgeError> {
    let status = response.status();

    if status.is_success() {
        response.json().await.map_err(|e| ForgeError::ApiError {
            status: status.as_u16(),
            message: format!("failed to parse response: {e}"),
        })
    } else {
        let message = match response.json::<serde_json::Value>().await {
            Ok(body) => error_message(&body),
            Err(_) => "unknown error".to_string(),
        };
        Err(ForgeError::from_status(status, message))
    }
}

/// Extract a human-readable message from an error body.
///
/// GitHub and Gitea send `{"message": "..."}`; GitLab sends either a
/// string or an object of field errors under `message`, or `{"error": "..."}`.
fn error_message(body: &serde_json::Value) -> String {
    match body.get("message").or_else(|| body.get("error")) {
        Some(serde_json::Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => "unknown error".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_field() {
        assert_eq!(
            error_message(&json!({"message": "Repository creation failed."})),
            "Repository creation failed."
        );
    }

    #[test]
    fn gitlab_field_errors() {
        let body = json!({"message": {"name": ["has already been taken"]}});
        assert_eq!(
            error_message(&body),
            r#"{"name":["has already been taken"]}"#
        );
    }

    #[test]
    fn error_field() {
        assert_eq!(error_message(&json!({"error": "invalid_token"})), "invalid_token");
    }

    #[test]
    fn missing_message() {
        assert_eq!(error_message(&json!({})), "unknown error");
    }

    #[test]
    fn headers_carry_bearer_token() {
        let headers = json_headers("secret", "application/json").unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer secret");
        assert_eq!(headers[USER_AGENT], USER_AGENT_VALUE);
    }

    #[test]
    fn invalid_token_characters() {
        assert!(matches!(
            json_headers("bad\ntoken", "application/json"),
            Err(ForgeError::AuthFailed(_))
        ));
    }
}
