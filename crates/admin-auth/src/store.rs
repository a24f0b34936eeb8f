//! Credential-store boundary
//!
//! The client never owns the access token; it reads it from, and writes it
//! back through, a `TokenStore`. Uses `Pin<Box<dyn Future>>` return types so
//! the store stays dyn-compatible (`Arc<dyn TokenStore>`).

use std::future::Future;
use std::pin::Pin;

use common::Secret;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::identity::User;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Holder of the current access token and cached identity.
pub trait TokenStore: Send + Sync {
    /// Current access token, if any.
    fn access_token(&self) -> StoreFuture<'_, Option<Secret<String>>>;

    /// Replace (or clear, with `None`) the access token.
    fn set_access_token(&self, token: Option<Secret<String>>) -> StoreFuture<'_, Result<()>>;

    fn current_user(&self) -> StoreFuture<'_, Option<User>>;

    fn set_current_user(&self, user: Option<User>) -> StoreFuture<'_, Result<()>>;

    /// Clear the token and any cached identity.
    ///
    /// Local only: telling the backend about the logout is the session's job.
    fn logout(&self) -> StoreFuture<'_, Result<()>>;

    /// Derived from token presence; says nothing about expiry.
    fn is_authenticated(&self) -> StoreFuture<'_, bool> {
        Box::pin(async move { self.access_token().await.is_some() })
    }
}

#[derive(Debug, Default)]
struct Session {
    token: Option<Secret<String>>,
    user: Option<User>,
}

/// Process-lifetime store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    session: RwLock<Session>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a token already present (e.g. from the environment).
    pub fn with_token(token: impl Into<Secret<String>>) -> Self {
        Self {
            session: RwLock::new(Session {
                token: Some(token.into()),
                user: None,
            }),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> StoreFuture<'_, Option<Secret<String>>> {
        Box::pin(async move { self.session.read().await.token.clone() })
    }

    fn set_access_token(&self, token: Option<Secret<String>>) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            debug!(present = token.is_some(), "access token updated");
            self.session.write().await.token = token;
            Ok(())
        })
    }

    fn current_user(&self) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move { self.session.read().await.user.clone() })
    }

    fn set_current_user(&self, user: Option<User>) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            self.session.write().await.user = user;
            Ok(())
        })
    }

    fn logout(&self) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut session = self.session.write().await;
            session.token = None;
            session.user = None;
            debug!("session cleared");
            Ok(())
        })
    }
}
