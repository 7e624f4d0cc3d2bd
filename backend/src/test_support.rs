//! Fixtures shared by the unit tests.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use yup_oauth2::storage::TokenInfo;
use yup_oauth2::ApplicationSecret;

use crate::auth::{AuthError, Authorizer, CredentialManager, GrantedToken};
use crate::calendar::CalendarClient;

pub const ACCESS_TOKEN: &str = "test-access-token";
pub const BEARER: &str = "Bearer test-access-token";

/// Installed-app client secret whose endpoints live under `base_url`.
pub fn secret(base_url: &str) -> ApplicationSecret {
    let json = serde_json::json!({
        "installed": {
            "client_id": "test-client.apps.googleusercontent.com",
            "client_secret": "test-secret",
            "auth_uri": format!("{}/auth", base_url),
            "token_uri": format!("{}/token", base_url),
            "redirect_uris": ["http://localhost"]
        }
    });
    yup_oauth2::parse_application_secret(json.to_string()).expect("valid test secret")
}

/// A cache entry as the authenticator stores it.
pub fn token_info(access_token: &str, expires_in_secs: Option<i64>) -> TokenInfo {
    TokenInfo {
        access_token: Some(access_token.to_string()),
        refresh_token: Some("test-refresh".to_string()),
        expires_at: expires_in_secs
            .map(|secs| time::OffsetDateTime::now_utc() + time::Duration::seconds(secs)),
        id_token: None,
    }
}

/// Stand-in for the Google authenticator.
pub struct ScriptedFlow {
    pub calls: Arc<AtomicUsize>,
    grant: Option<String>,
    lifetime: Duration,
}

impl ScriptedFlow {
    pub fn granting(access_token: &str) -> Self {
        Self::expiring(access_token, 3600)
    }

    pub fn expiring(access_token: &str, lifetime_secs: i64) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            grant: Some(access_token.to_string()),
            lifetime: Duration::seconds(lifetime_secs),
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            grant: None,
            lifetime: Duration::zero(),
        }
    }
}

#[async_trait]
impl Authorizer for ScriptedFlow {
    async fn token(&self, _scopes: &[&str]) -> Result<GrantedToken, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.grant {
            Some(access) => Ok(GrantedToken {
                access_token: access.clone(),
                expires_at: Some(Utc::now() + self.lifetime),
            }),
            None => Err(yup_oauth2::Error::UserError("access_denied".to_string()).into()),
        }
    }
}

/// A credential manager that always grants `ACCESS_TOKEN`, so no token
/// endpoint or consent flow is touched.
pub fn credentials() -> Arc<CredentialManager> {
    Arc::new(CredentialManager::new(Box::new(ScriptedFlow::granting(
        ACCESS_TOKEN,
    ))))
}

pub fn calendar_client(server: &mockito::ServerGuard) -> CalendarClient {
    CalendarClient::new(&server.url(), "primary", credentials())
}
