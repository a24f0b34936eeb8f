//! Authenticated client for the admin dashboard's REST backend
//!
//! `ApiClient::request` attaches the bearer token from the credential store,
//! refreshes it before sending when it is missing or about to expire, and on
//! a 401 refreshes and replays the request exactly once. Refreshes are
//! single-flight: however many requests notice the expiry at the same time,
//! one `POST /auth/refresh` goes out and every waiter receives its outcome.
//!
//! Request lifecycle:
//! 1. Caller builds `RequestOptions` (method, headers, query, body, flags)
//! 2. Unless `skip_auth`, the token is checked and refreshed if needed
//! 3. The request is sent; a 401 triggers one refresh + replay
//! 4. Failures come back as one normalized `Error` whose `message()` is
//!    what a notification should display
//!
//! `AuthSession` (login/register/logout/me) and `Resource` (CRUD wrapper
//! with loading/error state and notifications) are built on top.

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod refresh;
pub mod request;
pub mod resource;
pub mod session;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{Error, FALLBACK_MESSAGE, RefreshError, Result, extract_message};
pub use refresh::RefreshCoordinator;
pub use request::{RequestOptions, query_pairs, with_auth_header};
pub use resource::{ItemResponse, ListResponse, Resource};
pub use session::AuthSession;
