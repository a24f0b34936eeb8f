//! The authenticated request path
//!
//! `request` = expiry check → (single-flight refresh) → send with bearer
//! header → on 401, one refresh + replay → normalize. Requests flagged
//! `skip_auth` bypass everything except sending and normalizing.
//!
//! The refresh itself runs on a spawned task driven by the cycle's leader, so
//! a caller that stops waiting (timeout, dropped future) never cancels a
//! refresh other requests are queued on. If that task dies, a supervisor
//! fails its cycle so the queue never stays stuck.

use std::sync::Arc;

use admin_auth::{RefreshResponse, TokenStore, claims};
use bytes::Bytes;
use common::Secret;
use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{COOKIE, HeaderMap, SET_COOKIE};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{Error, RefreshError, Result, extract_message};
use crate::metrics;
use crate::refresh::RefreshCoordinator;
use crate::request::{RequestOptions, with_auth_header};

/// Correlation header sent on every request.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Cheap to clone; all clones share the token store, the refresh state and
/// the cookie jar.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    config: ClientConfig,
    store: Arc<dyn TokenStore>,
    refresh: RefreshCoordinator,
    cookies: Arc<Jar>,
}

/// Retry bookkeeping for one logical request. Never shared between requests.
#[derive(Debug, Default)]
struct Attempt {
    retried: bool,
}

impl Attempt {
    /// Claim the single replay this request is allowed. `false` once used.
    fn take_retry(&mut self) -> bool {
        !std::mem::replace(&mut self.retried, true)
    }
}

/// Why a refresh cycle was opened.
#[derive(Debug)]
enum Trigger {
    /// The pre-send check found this token (or none) unusable.
    Stale(Option<Secret<String>>),
    /// The backend answered 401; always ask the backend for a new token.
    Unauthorized,
}

impl ApiClient {
    pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("building HTTP client: {e}")))?;
        Self::with_http_client(config, store, http)
    }

    /// Use a caller-built `reqwest::Client` (its own timeout, proxy, TLS).
    pub fn with_http_client(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        http: reqwest::Client,
    ) -> Result<Self> {
        config.validate()?;
        info!(base_url = %config.base_url, refresh_path = %config.refresh_path, skew_secs = config.token_skew.as_secs(), "api client initialized");
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                config,
                store,
                refresh: RefreshCoordinator::new(),
                cookies: Arc::new(Jar::default()),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.store
    }

    /// Cookie jar used by `with_credentials` requests.
    pub fn cookie_jar(&self) -> &Arc<Jar> {
        &self.inner.cookies
    }

    pub async fn is_refreshing(&self) -> bool {
        self.inner.refresh.is_in_flight().await
    }

    /// Number of refresh cycles this client has started.
    pub async fn refresh_cycles(&self) -> u64 {
        self.inner.refresh.cycles().await
    }

    /// Resolve `path` against the base URL. Absolute URLs pass through.
    pub fn url(&self, path: &str) -> Result<Url> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_owned()
        } else {
            format!(
                "{}/{}",
                self.inner.config.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        };
        Url::parse(&raw).map_err(|e| Error::InvalidRequest(format!("invalid URL {raw}: {e}")))
    }

    /// Send one logical request and decode its JSON body into `T`.
    ///
    /// An empty body decodes as JSON `null`, so `()`, `Option<_>` and
    /// `serde_json::Value` work for 204 responses.
    #[instrument(skip_all, fields(request_id, method = %options.method, path = %path))]
    pub async fn request<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T> {
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        let body = if options.skip_auth {
            self.execute(path, &options, options.headers.clone(), &request_id)
                .await?
        } else {
            self.send_authenticated(path, &options, &request_id).await?
        };
        decode_body(&body)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(path, RequestOptions::get()).await
    }

    async fn send_authenticated(
        &self,
        path: &str,
        options: &RequestOptions,
        request_id: &str,
    ) -> Result<Bytes> {
        let mut attempt = Attempt::default();
        let mut token = self.valid_token().await?;

        loop {
            let headers = with_auth_header(&options.headers, &token)?;
            match self.execute(path, options, headers, request_id).await {
                Err(err) if err.is_unauthorized() && attempt.take_retry() => {
                    debug!(request_id, "401 received, refreshing and replaying once");
                    metrics::record_auth_retry();
                    token = self.refresh_token().await?;
                }
                result => return result,
            }
        }
    }

    /// The stored token if it is not about to expire, otherwise a fresh one.
    async fn valid_token(&self) -> Result<Secret<String>> {
        let current = self.inner.store.access_token().await;
        let expired = claims::is_expired(
            current.as_ref().map(|t| t.expose_str()),
            self.inner.config.token_skew,
        );
        match current {
            Some(token) if !expired => Ok(token),
            seen @ Some(_) => {
                debug!("access token expired or expiring within skew, refreshing first");
                self.refresh_with(Trigger::Stale(seen)).await
            }
            None => {
                debug!("no access token, refreshing first");
                self.refresh_with(Trigger::Stale(None)).await
            }
        }
    }

    /// Obtain a new access token through the single-flight refresh.
    ///
    /// Joins the cycle in flight if there is one; otherwise starts it. Every
    /// caller of a cycle gets the same token or the same error.
    pub async fn refresh_token(&self) -> Result<Secret<String>> {
        self.refresh_with(Trigger::Unauthorized).await
    }

    async fn refresh_with(&self, trigger: Trigger) -> Result<Secret<String>> {
        let ticket = self.inner.refresh.join().await;
        if ticket.leader {
            self.spawn_refresh(ticket.cycle, trigger);
        }
        Ok(ticket.wait().await?)
    }

    /// Run the cycle on its own task, supervised: if the driver dies before
    /// closing the cycle, its waiters get `Abandoned` and the next caller
    /// opens a new cycle.
    fn spawn_refresh(&self, cycle: u64, trigger: Trigger) {
        let client = self.clone();
        let driver = tokio::spawn(async move { client.run_refresh(cycle, trigger).await });

        let client = self.clone();
        tokio::spawn(async move {
            if let Err(e) = driver.await {
                warn!(cycle, error = %e, "refresh task ended without closing its cycle");
                metrics::record_refresh("failure");
                let delivered = client
                    .inner
                    .refresh
                    .complete(cycle, Err(RefreshError::Abandoned))
                    .await;
                debug!(cycle, waiters = delivered, "abandoned refresh cycle closed");
            }
        });
    }

    /// Drive one refresh cycle to completion and fan the outcome out.
    ///
    /// The store is updated (new token, or logout) before any waiter is
    /// woken, so waiters always observe the post-refresh store.
    async fn run_refresh(&self, cycle: u64, trigger: Trigger) {
        if let Trigger::Stale(seen) = &trigger {
            if let Some(token) = self.newer_stored_token(seen.as_ref()).await {
                debug!(cycle, "store already holds a newer valid token, skipping refresh call");
                let delivered = self.inner.refresh.complete(cycle, Ok(token)).await;
                debug!(cycle, waiters = delivered, "refresh cycle closed");
                return;
            }
        }

        let outcome = self.fetch_new_token().await;
        match &outcome {
            Ok(token) => {
                if let Err(e) = self.inner.store.set_access_token(Some(token.clone())).await {
                    warn!(error = %e, "failed to persist refreshed token");
                }
                metrics::record_refresh("success");
                info!("token refresh succeeded");
            }
            Err(e) => {
                warn!(error = ?e, "token refresh failed, logging out");
                if let Err(e) = self.inner.store.logout().await {
                    warn!(error = %e, "failed to clear credential store after refresh failure");
                }
                metrics::record_refresh("failure");
            }
        }
        let delivered = self.inner.refresh.complete(cycle, outcome).await;
        debug!(cycle, waiters = delivered, "refresh cycle closed");
    }

    /// A stored token that differs from `seen` and is not expiring. Set when
    /// an earlier cycle finished between the caller's expiry check and its
    /// join.
    async fn newer_stored_token(&self, seen: Option<&Secret<String>>) -> Option<Secret<String>> {
        let current = self.inner.store.access_token().await?;
        if seen == Some(&current)
            || claims::is_expired(Some(current.expose_str()), self.inner.config.token_skew)
        {
            return None;
        }
        Some(current)
    }

    /// `POST <refresh_path>` with cookies and without any auth handling.
    async fn fetch_new_token(&self) -> std::result::Result<Secret<String>, RefreshError> {
        let options = RequestOptions::post().skip_auth().with_credentials();
        let request_id = Uuid::new_v4().to_string();
        let body = self
            .execute(
                &self.inner.config.refresh_path,
                &options,
                HeaderMap::new(),
                &request_id,
            )
            .await
            .map_err(|e| match e {
                Error::Status { status, message } => RefreshError::Rejected { status, message },
                Error::Network(detail) => RefreshError::Network(detail),
                other => RefreshError::InvalidResponse(other.to_string()),
            })?;

        let response: RefreshResponse = serde_json::from_slice(&body)
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;
        if response.token.is_empty() {
            return Err(RefreshError::InvalidResponse("empty token".into()));
        }
        Ok(Secret::new(response.token))
    }

    /// Send exactly once and normalize the result. No auth logic here.
    async fn execute(
        &self,
        path: &str,
        options: &RequestOptions,
        headers: HeaderMap,
        request_id: &str,
    ) -> Result<Bytes> {
        let url = self.url(path)?;
        let method = options.method.clone();

        let mut builder = self
            .inner
            .http
            .request(method.clone(), url.clone())
            .headers(headers)
            .header(REQUEST_ID_HEADER, request_id);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }
        if options.with_credentials {
            if let Some(cookie) = self.inner.cookies.cookies(&url) {
                builder = builder.header(COOKIE, cookie);
            }
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_network_error(method.as_str());
                warn!(request_id, error = %e, "no response from backend");
                return Err(Error::Network(e.to_string()));
            }
        };

        let status = response.status();
        metrics::record_request(method.as_str(), status.as_u16());

        if options.with_credentials {
            let mut set_cookies = response.headers().get_all(SET_COOKIE).iter();
            self.inner.cookies.set_cookies(&mut set_cookies, &url);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("reading response body: {e}")))?;
        debug!(request_id, status = status.as_u16(), bytes = body.len(), "response received");

        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                message: extract_message(&body),
            });
        }
        Ok(body)
    }
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_value(Value::Null).map_err(|e| Error::Decode(e.to_string()));
    }
    serde_json::from_slice(body).map_err(|e| Error::Decode(e.to_string()))
}
