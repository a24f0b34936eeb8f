//! Sign-in state on top of `ApiClient`
//!
//! Login and register go out unauthenticated with cookies included so the
//! backend can set its refresh cookie; their token and user land in the
//! client's store. Logout tells the backend (best effort) and always clears
//! the local session.

use admin_auth::{
    LOGIN_PATH, LOGOUT_PATH, LoginPayload, LoginResponse, ME_PATH, MeResponse, REGISTER_PATH,
    RegisterPayload, User,
};
use common::Secret;
use serde_json::Value;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::request::RequestOptions;

#[derive(Clone)]
pub struct AuthSession {
    client: ApiClient,
}

impl AuthSession {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn login(&self, email: &str, password: Secret<String>) -> Result<Option<User>> {
        let payload = LoginPayload {
            email: email.to_owned(),
            password,
        };
        let options = RequestOptions::post()
            .json(&payload)?
            .skip_auth()
            .with_credentials();
        let response: LoginResponse = self.client.request(LOGIN_PATH, options).await?;
        self.establish(response).await
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: Secret<String>,
    ) -> Result<Option<User>> {
        let payload = RegisterPayload {
            name: name.to_owned(),
            email: email.to_owned(),
            password,
        };
        let options = RequestOptions::post()
            .json(&payload)?
            .skip_auth()
            .with_credentials();
        let response: LoginResponse = self.client.request(REGISTER_PATH, options).await?;
        self.establish(response).await
    }

    async fn establish(&self, response: LoginResponse) -> Result<Option<User>> {
        if response.token.is_empty() {
            return Err(Error::Decode("auth response carried an empty token".into()));
        }
        let store = self.client.store();
        store
            .set_access_token(Some(Secret::new(response.token)))
            .await?;
        if let Some(user) = &response.user {
            store.set_current_user(Some(user.clone())).await?;
        }
        info!(
            user = response.user.as_ref().map(|u| u.email.as_str()),
            "signed in"
        );
        Ok(response.user)
    }

    /// Best-effort backend logout, then clear the local session.
    ///
    /// The backend call is always authenticated: without a usable access
    /// token it refreshes first, so the server still revokes the refresh
    /// cookie. Only a failure to clear the local store is returned.
    pub async fn logout(&self) -> Result<()> {
        let store = self.client.store();
        let options = RequestOptions::post().with_credentials();
        if let Err(e) = self.client.request::<Value>(LOGOUT_PATH, options).await {
            warn!(error = ?e, "backend logout failed, clearing local session anyway");
        }
        store.logout().await?;
        info!("signed out");
        Ok(())
    }

    /// Load the signed-in user from the backend and cache it.
    ///
    /// Without a token this clears the cached user and returns `None`
    /// without a network call.
    pub async fn fetch_me(&self) -> Result<Option<User>> {
        let store = self.client.store();
        if !store.is_authenticated().await {
            store.set_current_user(None).await?;
            return Ok(None);
        }
        let MeResponse { user } = self.client.get(ME_PATH).await?;
        store.set_current_user(Some(user.clone())).await?;
        Ok(Some(user))
    }

    /// Cached user from the last login or `fetch_me`.
    pub async fn current_user(&self) -> Option<User> {
        self.client.store().current_user().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.client.store().is_authenticated().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use admin_auth::{MemoryTokenStore, TokenStore};

    use crate::client::tests::{Backend, CountingStore, jwt_expiring_in, start_backend};
    use crate::config::ClientConfig;

    async fn session_with(store: Arc<dyn TokenStore>) -> (AuthSession, Arc<Backend>) {
        let backend = Arc::new(Backend::default());
        let url = start_backend(backend.clone()).await;
        let client = ApiClient::new(ClientConfig::new(url), store).unwrap();
        (AuthSession::new(client), backend)
    }

    #[tokio::test]
    async fn login_stores_token_and_user() {
        let store = Arc::new(MemoryTokenStore::new());
        let (session, backend) = session_with(store.clone()).await;

        let user = session
            .login("mona@example.com", Secret::from("hunter2"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(user.email, "mona@example.com");
        assert!(session.is_authenticated().await);
        assert_eq!(session.current_user().await, Some(user));
        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn login_keeps_refresh_cookie_for_later_refreshes() {
        let (session, backend) = session_with(Arc::new(MemoryTokenStore::new())).await;
        session
            .login("mona@example.com", Secret::from("pw"))
            .await
            .unwrap();

        session.client().refresh_token().await.unwrap();

        assert!(backend.refresh_saw_cookie.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn register_signs_in() {
        let (session, _backend) = session_with(Arc::new(MemoryTokenStore::new())).await;
        let user = session
            .register("Mona", "mona@example.com", Secret::from("pw"))
            .await
            .unwrap();
        assert!(user.is_some());
        assert!(session.is_authenticated().await);
    }

    #[tokio::test]
    async fn fetch_me_without_token_skips_network() {
        let (session, backend) = session_with(Arc::new(MemoryTokenStore::new())).await;

        assert!(session.fetch_me().await.unwrap().is_none());
        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 0);
        assert!(session.current_user().await.is_none());
    }

    #[tokio::test]
    async fn fetch_me_caches_user() {
        let store = Arc::new(MemoryTokenStore::with_token(jwt_expiring_in(3600, 0)));
        let (session, _backend) = session_with(store).await;

        let me = session.fetch_me().await.unwrap().unwrap();

        assert_eq!(me.role, "admin");
        assert_eq!(session.current_user().await, Some(me));
    }

    #[tokio::test]
    async fn logout_clears_local_session() {
        let store = Arc::new(CountingStore::with_token(&jwt_expiring_in(3600, 0)));
        let (session, _backend) = session_with(store.clone()).await;

        session.logout().await.unwrap();

        assert!(!session.is_authenticated().await);
        assert_eq!(store.logouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn logout_clears_local_session_even_when_backend_is_down() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let store = Arc::new(MemoryTokenStore::with_token(jwt_expiring_in(3600, 0)));
        let client = ApiClient::new(ClientConfig::new(url), store.clone()).unwrap();
        let session = AuthSession::new(client);

        session.logout().await.unwrap();

        assert!(!store.is_authenticated().await);
    }

    #[tokio::test]
    async fn logout_without_access_token_refreshes_then_revokes() {
        let store = Arc::new(CountingStore::default());
        let (session, backend) = session_with(store.clone()).await;
        session
            .login("mona@example.com", Secret::from("pw"))
            .await
            .unwrap();
        store.set_access_token(None).await.unwrap();

        session.logout().await.unwrap();

        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
        assert!(backend.refresh_saw_cookie.load(Ordering::SeqCst));
        assert!(backend.logout_saw_auth.load(Ordering::SeqCst));
        assert!(!session.is_authenticated().await);
        assert_eq!(store.logouts.load(Ordering::SeqCst), 1);
    }
}
