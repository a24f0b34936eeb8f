//! File-backed session storage
//!
//! Persists the access token and cached user as JSON so a terminal session
//! survives between invocations. All writes use atomic temp-file + rename to
//! prevent corruption on crash, and the file is 0600 since it holds a bearer
//! token. A tokio Mutex serializes concurrent writes from request-time
//! refresh and explicit login/logout.
//!
//! A stored token older than the configured max age is discarded on load,
//! mirroring the backend's short-lived access-token cookie.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use common::Secret;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identity::User;
use crate::store::{StoreFuture, TokenStore};

/// On-disk shape. `stored_at` is a unix timestamp in milliseconds.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedSession {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    stored_at: u64,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<Secret<String>>,
    stored_at: u64,
    user: Option<User>,
}

impl SessionState {
    fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            access_token: self.token.as_ref().map(|t| t.expose().clone()),
            stored_at: self.stored_at,
            user: self.user.clone(),
        }
    }
}

pub struct FileTokenStore {
    path: PathBuf,
    state: Mutex<SessionState>,
}

impl FileTokenStore {
    /// Load the session from `path`.
    ///
    /// A missing file is a cold start with no session. A token stored more
    /// than `max_age` ago is dropped (the cached user is kept until logout).
    pub async fn load(path: PathBuf, max_age: Duration) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading session file: {e}")))?;
            let persisted: PersistedSession = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing session file: {e}")))?;

            let age_millis = now_millis().saturating_sub(persisted.stored_at);
            let token = match persisted.access_token {
                Some(_) if age_millis > max_age.as_millis() as u64 => {
                    info!(path = %path.display(), age_secs = age_millis / 1000, "stored access token past max age, discarding");
                    None
                }
                Some(token) => Some(Secret::new(token)),
                None => None,
            };
            info!(path = %path.display(), token = token.is_some(), "loaded session");
            SessionState {
                token,
                stored_at: persisted.stored_at,
                user: persisted.user,
            }
        } else {
            info!(path = %path.display(), "session file not found, starting signed out");
            SessionState::default()
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> StoreFuture<'_, Option<Secret<String>>> {
        Box::pin(async move { self.state.lock().await.token.clone() })
    }

    fn set_access_token(&self, token: Option<Secret<String>>) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.stored_at = if token.is_some() { now_millis() } else { 0 };
            state.token = token;
            write_atomic(&self.path, &state.to_persisted()).await
        })
    }

    fn current_user(&self) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move { self.state.lock().await.user.clone() })
    }

    fn set_current_user(&self, user: Option<User>) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.user = user;
            write_atomic(&self.path, &state.to_persisted()).await
        })
    }

    fn logout(&self) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            *state = SessionState::default();
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => {
                    debug!(path = %self.path.display(), "removed session file");
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Error::Io(format!("removing session file: {e}"))),
            }
        })
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Write the session to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Permissions are set to 0600 before the rename.
async fn write_atomic(path: &Path, data: &PersistedSession) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing session: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("session path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".session.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), "persisted session");
    Ok(())
}
