//! Access-key check for every route.
//!
//! The key is presented either as the `access_key` query parameter or the
//! `X-Access-Key` header. It is compared with the `key` field of a flat JSON
//! file, re-read on every request so the key can be rotated without a
//! restart.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;

/// Header carrying the access key.
pub const ACCESS_KEY_HEADER: &str = "x-access-key";

/// Where the expected access key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStore {
    /// A JSON file `{"key": "..."}`, read on every check.
    File(PathBuf),
    /// A fixed key.
    Static(String),
}

#[derive(Deserialize)]
struct CredentialFile {
    key: String,
}

impl CredentialStore {
    /// The currently valid key.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if the credential file cannot be read
    /// or has no `key` field.
    pub async fn current_key(&self) -> Result<String, ApiError> {
        match self {
            Self::Static(key) => Ok(key.clone()),
            Self::File(path) => {
                let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
                    ApiError::Internal(format!("credential file {}: {e}", path.display()))
                })?;
                let file: CredentialFile = serde_json::from_str(&contents).map_err(|e| {
                    ApiError::Internal(format!("credential file {}: {e}", path.display()))
                })?;
                Ok(file.key)
            }
        }
    }

    /// Check a presented key. An empty expected key matches nothing.
    ///
    /// # Errors
    ///
    /// See [`CredentialStore::current_key`].
    pub async fn verify(&self, presented: &str) -> Result<bool, ApiError> {
        let expected = self.current_key().await?;
        Ok(!expected.is_empty() && expected == presented)
    }
}

#[derive(Deserialize)]
struct AccessKeyQuery {
    access_key: Option<String>,
}

fn presented_key(request: &Request) -> Option<String> {
    if let Some(value) = request.headers().get(ACCESS_KEY_HEADER)
        && let Ok(key) = value.to_str()
    {
        return Some(key.to_owned());
    }
    Query::<AccessKeyQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(query)| query.access_key)
}

/// Middleware rejecting requests without the right access key.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] for a missing or wrong key and
/// [`ApiError::Internal`] if the key cannot be loaded.
pub async fn require_access_key(
    State(credentials): State<Arc<CredentialStore>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(key) = presented_key(&request) else {
        debug!(path = %request.uri().path(), "request without access key");
        return Err(ApiError::Unauthorized(String::from("access key required")));
    };
    if !credentials.verify(&key).await? {
        debug!(path = %request.uri().path(), "request with wrong access key");
        return Err(ApiError::Unauthorized(String::from("invalid access key")));
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_key_matches_exactly() {
        let store = CredentialStore::Static(String::from("abc123"));
        assert!(store.verify("abc123").await.unwrap());
        assert!(!store.verify("abc12").await.unwrap());
        assert!(!store.verify("").await.unwrap());
    }

    #[tokio::test]
    async fn empty_key_matches_nothing() {
        let store = CredentialStore::Static(String::new());
        assert!(!store.verify("").await.unwrap());
    }

    #[tokio::test]
    async fn file_is_reread_on_every_check() {
        let path = std::env::temp_dir().join(format!("callstats-auth-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"key": "first"}"#).unwrap();
        let store = CredentialStore::File(path.clone());
        assert!(store.verify("first").await.unwrap());

        std::fs::write(&path, r#"{"key": "second"}"#).unwrap();
        assert!(!store.verify("first").await.unwrap());
        assert!(store.verify("second").await.unwrap());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn missing_file_is_an_internal_error() {
        let store = CredentialStore::File(PathBuf::from("/nonexistent/callstats/auth.json"));
        assert!(matches!(
            store.verify("anything").await,
            Err(ApiError::Internal(_))
        ));
    }
}
