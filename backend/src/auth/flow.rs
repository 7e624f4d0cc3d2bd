//! Installed-app consent flow built on yup-oauth2.
//!
//! The authenticator owns the loopback redirect server, the code exchange
//! and refresh. This module only decides how the consent URL reaches the
//! user and how long to wait for them.

use async_trait::async_trait;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;
use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::authenticator_delegate::InstalledFlowDelegate;
use yup_oauth2::{ApplicationSecret, InstalledFlowAuthenticator, InstalledFlowReturnMethod};

use super::token::TokenCache;
use super::{AuthError, GrantedToken};

/// Source of access tokens for the credential manager.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn token(&self, scopes: &[&str]) -> Result<GrantedToken, AuthError>;
}

#[derive(Debug, Clone)]
pub struct InstalledFlowOptions {
    /// Loopback port for the redirect; 0 picks a free one
    pub redirect_port: u16,
    pub timeout: Duration,
    pub open_browser: bool,
}

/// Presents the consent URL in the desktop browser, or logs it for the
/// operator when no browser can be opened.
pub struct BrowserDelegate {
    pub open_browser: bool,
}

impl InstalledFlowDelegate for BrowserDelegate {
    fn present_user_url<'a>(
        &'a self,
        url: &'a str,
        need_code: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>> {
        Box::pin(async move {
            if need_code {
                return Err("Interactive code entry is not supported".to_string());
            }

            if self.open_browser && webbrowser::open(url).is_ok() {
                tracing::info!("Opened browser for Google authorization");
            } else {
                tracing::warn!("Open this URL to authorize calendar access: {}", url);
            }
            Ok(String::new())
        })
    }
}

pub struct GoogleAuthorizer {
    authenticator: DefaultAuthenticator,
    timeout: Duration,
}

impl GoogleAuthorizer {
    pub async fn new(
        secret: ApplicationSecret,
        cache_path: impl Into<PathBuf>,
        options: InstalledFlowOptions,
    ) -> Result<Self, AuthError> {
        let delegate = BrowserDelegate {
            open_browser: options.open_browser,
        };
        Self::with_delegate(secret, cache_path, options, Box::new(delegate)).await
    }

    pub(crate) async fn with_delegate(
        secret: ApplicationSecret,
        cache_path: impl Into<PathBuf>,
        options: InstalledFlowOptions,
        delegate: Box<dyn InstalledFlowDelegate>,
    ) -> Result<Self, AuthError> {
        let method = match options.redirect_port {
            0 => InstalledFlowReturnMethod::HTTPRedirect,
            port => InstalledFlowReturnMethod::HTTPPortRedirect(port),
        };

        let authenticator = InstalledFlowAuthenticator::builder(secret, method)
            .flow_delegate(delegate)
            .with_storage(Box::new(TokenCache::new(cache_path)))
            .build()
            .await
            .map_err(AuthError::Build)?;

        Ok(Self {
            authenticator,
            timeout: options.timeout,
        })
    }
}

#[async_trait]
impl Authorizer for GoogleAuthorizer {
    async fn token(&self, scopes: &[&str]) -> Result<GrantedToken, AuthError> {
        let token = tokio::time::timeout(self.timeout, self.authenticator.token(scopes))
            .await
            .map_err(|_| AuthError::Timeout(self.timeout))??;

        GrantedToken::try_from(token)
    }
}
