//! Request and response bodies of the auth endpoints
//!
//! The refresh endpoint answers `{"token": "<jwt>"}`; login and register
//! answer the same plus the signed-in user. Passwords stay wrapped in
//! `Secret` and are only exposed while serializing the request body.

use common::Secret;
use serde::{Deserialize, Serialize, Serializer};

use crate::identity::User;

/// Body of a successful `POST /auth/refresh`.
#[derive(Debug, Deserialize, Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginPayload {
    pub email: String,
    #[serde(serialize_with = "expose_secret")]
    pub password: Secret<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterPayload {
    pub name: String,
    pub email: String,
    #[serde(serialize_with = "expose_secret")]
    pub password: Secret<String>,
}

/// Body of a successful login or register call.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
}

/// Body of `GET /auth/me`.
#[derive(Debug, Deserialize)]
pub struct MeResponse {
    pub user: User,
}

fn expose_secret<S: Serializer>(secret: &Secret<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_str())
}
