//! Credential lifecycle for the calendar provider.
//!
//! `CredentialManager` is the only way the service obtains an access token.
//! It hands out the token it holds while that is valid and otherwise asks
//! its `Authorizer`, which resumes from the token cache, refreshes, or runs
//! the installed-app consent flow.

mod flow;
pub mod token;

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

pub use flow::{Authorizer, GoogleAuthorizer, InstalledFlowOptions};
use token::CALENDAR_SCOPE;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to read OAuth client secret {path}: {source}")]
    ClientSecret {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to set up the OAuth authenticator: {0}")]
    Build(std::io::Error),

    #[error("Authorization failed: {0}")]
    Provider(#[from] yup_oauth2::Error),

    #[error("Authorization was not completed within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Authorization server returned no access token")]
    MissingToken,
}

/// Tokens this close to expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Clone)]
pub struct GrantedToken {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl GrantedToken {
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|at| at - Duration::seconds(EXPIRY_SKEW_SECS) <= Utc::now())
            .unwrap_or(false)
    }
}

impl fmt::Debug for GrantedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrantedToken")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl TryFrom<yup_oauth2::AccessToken> for GrantedToken {
    type Error = AuthError;

    fn try_from(token: yup_oauth2::AccessToken) -> Result<Self, Self::Error> {
        let access_token = token.token().ok_or(AuthError::MissingToken)?.to_string();
        let expires_at = token
            .expiration_time()
            .and_then(|at| Utc.timestamp_opt(at.unix_timestamp(), 0).single());

        Ok(Self {
            access_token,
            expires_at,
        })
    }
}

pub struct CredentialManager {
    authorizer: Box<dyn Authorizer>,
    /// The lock is held while the authorizer works, so concurrent callers
    /// that find an expired token wait for a single renewal and reuse it.
    token: Mutex<Option<GrantedToken>>,
}

impl CredentialManager {
    pub fn new(authorizer: Box<dyn Authorizer>) -> Self {
        Self {
            authorizer,
            token: Mutex::new(None),
        }
    }

    /// Build a manager around the installed-app flow, using the client
    /// secret JSON downloaded from the Google Cloud console.
    pub async fn installed_flow(
        secret_path: &Path,
        cache_path: impl Into<PathBuf>,
        options: InstalledFlowOptions,
    ) -> Result<Self, AuthError> {
        let secret = yup_oauth2::read_application_secret(secret_path)
            .await
            .map_err(|source| AuthError::ClientSecret {
                path: secret_path.to_path_buf(),
                source,
            })?;

        let authorizer = GoogleAuthorizer::new(secret, cache_path, options).await?;
        Ok(Self::new(Box::new(authorizer)))
    }

    /// A currently valid access token.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let mut current = self.token.lock().await;

        if let Some(token) = current.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.access_token.clone());
        }

        tracing::debug!("Requesting calendar access token");
        let fresh = self.authorizer.token(&[CALENDAR_SCOPE]).await?;
        let access_token = fresh.access_token.clone();
        *current = Some(fresh);
        Ok(access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::flow::tests::{options, seed};
    use crate::test_support::{self, ScriptedFlow};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_token_is_reused_while_valid() {
        let flow = ScriptedFlow::granting("granted");
        let calls = flow.calls.clone();
        let manager = CredentialManager::new(Box::new(flow));

        assert_eq!(manager.access_token().await.unwrap(), "granted");
        assert_eq!(manager.access_token().await.unwrap(), "granted");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_token_near_expiry_is_renewed() {
        let flow = ScriptedFlow::expiring("short-lived", 30);
        let calls = flow.calls.clone();
        let manager = CredentialManager::new(Box::new(flow));

        manager.access_token().await.unwrap();
        manager.access_token().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_flow_is_provider_error() {
        let manager = CredentialManager::new(Box::new(ScriptedFlow::failing()));

        let err = manager.access_token().await.unwrap_err();
        assert!(matches!(err, AuthError::Provider(_)));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let mut server = mockito::Server::new_async().await;
        let refresh_mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::UrlEncoded(
                "grant_type".into(),
                "refresh_token".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "refreshed", "token_type": "Bearer", "expires_in": 3600}"#)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        seed(&path, "stale", -10).await;

        let authorizer = GoogleAuthorizer::new(
            test_support::secret(&server.url()),
            &path,
            options(std::time::Duration::from_secs(10)),
        )
        .await
        .unwrap();
        let manager = Arc::new(CredentialManager::new(Box::new(authorizer)));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.access_token().await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "refreshed");
        }
        refresh_mock.assert_async().await;

        let persisted = token::TokenCache::new(&path);
        let persisted = yup_oauth2::storage::TokenStorage::get(&persisted, &[CALENDAR_SCOPE])
            .await
            .unwrap();
        assert_eq!(persisted.access_token.as_deref(), Some("refreshed"));
        assert_eq!(persisted.refresh_token.as_deref(), Some("test-refresh"));
    }

    #[tokio::test]
    async fn test_missing_client_secret_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = CredentialManager::installed_flow(
            &dir.path().join("credentials.json"),
            dir.path().join("token.json"),
            options(std::time::Duration::from_secs(1)),
        )
        .await;

        assert!(matches!(result, Err(AuthError::ClientSecret { .. })));
    }

    #[test]
    fn test_debug_redacts_access_token() {
        let token = GrantedToken {
            access_token: "secret-value".to_string(),
            expires_at: None,
        };
        assert!(!format!("{:?}", token).contains("secret-value"));
        assert!(!token.is_expired());
    }
}
