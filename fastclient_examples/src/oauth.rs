//! Bearer-token middleware with single-flight refresh.
//!
//! Every call checks the cached access token before it goes out. When the
//! token has expired, the first call to notice takes the refresh lock and
//! renews it; calls arriving meanwhile queue on the same lock and find a
//! fresh token once it is released, so one expiry costs one refresh.

use fastclient_core::prelude::*;
use http::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

pub const SIGN_IN: &str = "signin";
pub const REFRESH: &str = "refreshToken";

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token_type: String,
    pub access_token: String,
    /// Seconds.
    pub expires_in: u64,
    pub refresh_token: String,
}

#[derive(Serialize)]
struct SignInBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

/// The auth endpoints. Bind them to a client that does not run
/// [`OAuth`] itself.
pub fn auth_registry() -> EndpointRegistry<TokenResponse> {
    EndpointRegistry::new()
        .with(SIGN_IN, EndpointDescriptor::post("/api/auth/signin").json())
        .with(REFRESH, EndpointDescriptor::post("/api/auth/refresh").json())
}

#[derive(Default)]
struct Tokens {
    access: SecretString,
    refresh: Option<SecretString>,
    expires_at: Option<Instant>,
}

/// Current credentials. Readers never wait on a refresh in progress unless
/// the token they would read has expired.
#[derive(Default)]
pub struct TokenCache {
    tokens: RwLock<Tokens>,
    refresh_lock: tokio::sync::Mutex<()>,
    refreshes: AtomicU32,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, t: &TokenResponse) {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.access = SecretString::new(t.access_token.as_str());
        tokens.refresh = Some(SecretString::new(t.refresh_token.as_str()));
        tokens.expires_at = Some(Instant::now() + Duration::from_secs(t.expires_in));
    }

    pub fn access(&self) -> SecretString {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access
            .clone()
    }

    fn refresh_token(&self) -> Option<SecretString> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh
            .clone()
    }

    /// A token without an expiry (never signed in) is not considered expired.
    pub fn is_expired(&self) -> bool {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        tokens.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    /// Forces the next call to refresh.
    pub fn expire(&self) {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.expires_at = Some(Instant::now());
    }

    /// How many refreshes completed.
    pub fn refreshes(&self) -> u32 {
        self.refreshes.load(Ordering::Acquire)
    }
}

/// Attaches `Authorization: Bearer <token>` to every request, refreshing the
/// token first when it has expired.
pub struct OAuth {
    cache: TokenCache,
    auth: Endpoints<TokenResponse>,
}

impl OAuth {
    pub fn new(auth: Endpoints<TokenResponse>) -> Self {
        Self {
            cache: TokenCache::new(),
            auth,
        }
    }

    #[inline]
    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<(), ApiClientError> {
        let body = SignInBody {
            email,
            password: password.expose(),
        };
        let args = CallArgs::new().json(&body).map_err(ApiClientError::middleware)?;
        let tokens = self.auth.call(SIGN_IN, args).await?;
        self.cache.store(&tokens);
        Ok(())
    }

    async fn ensure_fresh(&self) -> Result<(), ApiClientError> {
        if !self.cache.is_expired() {
            return Ok(());
        }
        tracing::debug!(target: "fastclient::oauth", "awaiting refresh");
        let _guard = self.cache.refresh_lock.lock().await;
        // Whoever held the lock before us may already have refreshed.
        if !self.cache.is_expired() {
            return Ok(());
        }

        tracing::info!(target: "fastclient::oauth", "refreshing token");
        let refresh = self
            .cache
            .refresh_token()
            .ok_or_else(|| ApiClientError::middleware("token expired and no refresh token is held"))?;
        let body = RefreshBody {
            refresh_token: refresh.expose(),
        };
        let args = CallArgs::new().json(&body).map_err(ApiClientError::middleware)?;
        let tokens = self.auth.call(REFRESH, args).await?;
        self.cache.store(&tokens);
        self.cache.refreshes.fetch_add(1, Ordering::AcqRel);
        tracing::info!(target: "fastclient::oauth", "token refreshed");
        Ok(())
    }
}

impl Middleware for OAuth {
    fn handle<'a>(&'a self, mut req: Request, next: Next) -> BoxFuture<'a, Result<Response, ApiClientError>> {
        Box::pin(async move {
            self.ensure_fresh().await?;
            let bearer = self
                .cache
                .access()
                .bearer()
                .map_err(ApiClientError::middleware)?;
            req.headers.insert(AUTHORIZATION, bearer);

            let resp = next.run(req).await?;
            tracing::debug!(
                target: "fastclient::oauth",
                url = %resp.url,
                status = resp.status.as_u16(),
                "request completed"
            );
            Ok(resp)
        })
    }
}
